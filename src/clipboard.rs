/// Write-only text sink a swatch tap copies its hex code into.
/// Front ends plug in the platform clipboard.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Keeps the last copied text in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    text: Option<String>,
    writes: usize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.text = Some(text.to_owned());
        self.writes += 1;
        Ok(())
    }
}
