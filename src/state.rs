//! Application state behind the picker screen.
//!
//! The state only changes through [`PaletteStore::select_image`],
//! [`PaletteStore::clear_image`] and [`PaletteStore::palette_computed`].
//! Subscribers get a snapshot after every change. Each selection bumps the
//! generation; a computed palette is only accepted for the current generation,
//! so the last submitted image always wins over slower, older extractions.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::JoinHandle,
};

use anyhow::Context;
use log::{debug, info};
use thiserror::Error;

use crate::{
    clipboard::Clipboard,
    extract::{extract_image, ExtractError, ExtractOptions},
    loader::{LoadImageError, SourceImage},
    swatch::Palette,
};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("no image selected")]
    NoImageSelected,
    #[error("swatch index out of range: {0}")]
    SwatchIndexOutOfRange(usize),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl From<LoadImageError> for StateError {
    fn from(e: LoadImageError) -> Self {
        StateError::Extract(e.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PickerState {
    pub image: Option<Arc<SourceImage>>,
    pub palette: Palette,
    /// Bumped by every selection and clear
    pub generation: u64,
    /// Set while an extraction for the current image hasn't reported back
    pub pending: bool,
    pub last_error: Option<String>,
}

/// Identifies the selection an extraction was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTicket {
    generation: u64,
}

impl ExtractionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

type Listener = Box<dyn Fn(&PickerState) + Send + Sync>;

pub struct PaletteStore {
    state: Mutex<PickerState>,
    listeners: Mutex<Vec<Listener>>,
    options: ExtractOptions,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for PaletteStore {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl PaletteStore {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            state: Mutex::new(PickerState::default()),
            listeners: Mutex::new(Vec::new()),
            options,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn snapshot(&self) -> PickerState {
        lock(&self.state).clone()
    }

    pub fn palette(&self) -> Palette {
        lock(&self.state).palette.clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&PickerState) + Send + Sync + 'static) {
        lock(&self.listeners).push(Box::new(listener));
    }

    /// Hand a snapshot of `state` to the subscribers.
    ///
    /// The listener lock is taken before the state lock is released, so
    /// subscribers receive snapshots in the order the changes were made.
    /// Listeners may read the store but must not subscribe from the callback.
    fn publish(&self, state: MutexGuard<'_, PickerState>) {
        let snapshot = state.clone();
        let listeners = lock(&self.listeners);
        drop(state);

        for listener in listeners.iter() {
            listener(&snapshot);
        }
    }

    /// Apply `f` to the state and notify subscribers.
    fn transition<R>(&self, f: impl FnOnce(&mut PickerState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = f(&mut state);
        self.publish(state);
        result
    }

    /// Decode and show a newly picked image. The old palette is dropped right away.
    ///
    /// Empty input leaves the state untouched. An undecodable image clears the
    /// selection and records the error.
    pub fn select_image(&self, image_bytes: &[u8]) -> Result<ExtractionTicket, StateError> {
        let image = match SourceImage::from_bytes(image_bytes) {
            Ok(image) => image,
            Err(LoadImageError::EmptyInput) => return Err(LoadImageError::EmptyInput.into()),
            Err(e) => {
                let message = e.to_string();
                debug!("image selection failed: {message}");
                self.transition(|s| {
                    s.generation += 1;
                    s.image = None;
                    s.palette = Palette::empty();
                    s.pending = false;
                    s.last_error = Some(message);
                });
                return Err(e.into());
            }
        };

        info!("selected {}x{} image", image.width(), image.height());
        let image = Arc::new(image);
        Ok(self.transition(|s| {
            s.generation += 1;
            s.image = Some(image);
            s.palette = Palette::empty();
            s.pending = true;
            s.last_error = None;
            ExtractionTicket {
                generation: s.generation,
            }
        }))
    }

    pub fn clear_image(&self) {
        debug!("clearing selected image");
        self.transition(|s| {
            s.generation += 1;
            s.image = None;
            s.palette = Palette::empty();
            s.pending = false;
            s.last_error = None;
        });
    }

    /// Report the outcome of an extraction. Returns false, changing nothing,
    /// when the ticket belongs to a selection that has since been replaced.
    pub fn palette_computed(&self, ticket: ExtractionTicket, result: Result<Palette, ExtractError>) -> bool {
        let mut state = lock(&self.state);
        if state.generation != ticket.generation {
            debug!("discarding stale palette for generation {}", ticket.generation);
            return false;
        }
        state.pending = false;
        match result {
            Ok(palette) => {
                info!("palette ready: {} colors", palette.len());
                state.palette = palette;
                state.last_error = None;
            }
            Err(e) => {
                debug!("palette extraction failed: {e}");
                state.palette = Palette::empty();
                state.last_error = Some(e.to_string());
            }
        }
        self.publish(state);
        true
    }

    /// Extract the palette of the image `ticket` was issued for and report it.
    /// Returns whether the result was applied.
    pub fn run_extraction(&self, ticket: ExtractionTicket) -> bool {
        let image = {
            let state = lock(&self.state);
            match (&state.image, state.generation == ticket.generation) {
                (Some(image), true) => Arc::clone(image),
                _ => return false,
            }
        };
        let result = extract_image(&image, &self.options);
        self.palette_computed(ticket, result)
    }

    /// Re-run extraction for the current selection.
    pub fn extract_current(&self) -> Result<bool, StateError> {
        let ticket = {
            let state = lock(&self.state);
            if state.image.is_none() {
                return Err(StateError::NoImageSelected);
            }
            ExtractionTicket {
                generation: state.generation,
            }
        };
        Ok(self.run_extraction(ticket))
    }

    /// Select `image_bytes` now and extract its palette on a worker thread.
    /// The handle yields whether the result was applied.
    pub fn spawn_extraction(self: &Arc<Self>, image_bytes: &[u8]) -> Result<JoinHandle<bool>, StateError> {
        let ticket = self.select_image(image_bytes)?;
        let store = Arc::clone(self);
        Ok(std::thread::spawn(move || store.run_extraction(ticket)))
    }

    /// Copy the hex code of swatch `index` to `clipboard`, returning it.
    pub fn copy_swatch(&self, index: usize, clipboard: &mut dyn Clipboard) -> anyhow::Result<String> {
        let hex = {
            let state = lock(&self.state);
            let swatch = state
                .palette
                .get(index)
                .ok_or(StateError::SwatchIndexOutOfRange(index))?;
            swatch.hex().to_owned()
        };
        clipboard
            .set_text(&hex)
            .with_context(|| format!("copying {hex} to the clipboard"))?;
        debug!("copied {hex}");
        Ok(hex)
    }
}
