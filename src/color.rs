use std::{fmt, str::FromStr};

use palette::IntoColor;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("invalid hex length: {0}")]
    InvalidLength(usize),
    #[error("invalid hex digits")]
    InvalidHex,
}

/// An RGBA color. Channels are stored as bytes so every value is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue, alpha: u8::MAX }
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha }
    }

    /// `0xRRGGBB`, alpha dropped. Used as the ranking tie-break.
    pub fn packed_rgb(self) -> u32 {
        (self.red as u32) << 16 | (self.green as u32) << 8 | self.blue as u32
    }

    /// Uppercase `#RRGGBB`. Alpha never shows up in the text form.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Hue in degrees, saturation and lightness in `0.0..=1.0`
    pub fn hsl(self) -> (f32, f32, f32) {
        let raw = palette::Srgb::new(self.red, self.green, self.blue);
        let raw_float: palette::Srgb<f32> = raw.into_format();
        let hsl: palette::Hsl = raw_float.into_color();
        let (h, s, l) = hsl.into_components();

        (h.into_positive_degrees(), s, l)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(px: image::Rgba<u8>) -> Self {
        let [red, green, blue, alpha] = px.0;
        Self { red, green, blue, alpha }
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.red, c.green, c.blue, c.alpha])
    }
}

fn nibble(c: u8) -> Result<u8, ColorParseError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ColorParseError::InvalidHex),
    }
}

fn byte(hi: u8, lo: u8) -> Result<u8, ColorParseError> {
    Ok(nibble(hi)? << 4 | nibble(lo)?)
}

/// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`, with or without the `#`.
impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.is_empty() {
            return Err(ColorParseError::Empty);
        }
        let b = hex.as_bytes();
        match b.len() {
            3 => Ok(Color::rgb(nibble(b[0])? * 17, nibble(b[1])? * 17, nibble(b[2])? * 17)),
            6 => Ok(Color::rgb(byte(b[0], b[1])?, byte(b[2], b[3])?, byte(b[4], b[5])?)),
            8 => Ok(Color::rgba(
                byte(b[0], b[1])?,
                byte(b[2], b[3])?,
                byte(b[4], b[5])?,
                byte(b[6], b[7])?,
            )),
            n => Err(ColorParseError::InvalidLength(n)),
        }
    }
}

/// Channel accessors for `image` pixels
pub trait PixelExt {
    fn r(&self) -> u8;
    fn g(&self) -> u8;
    fn b(&self) -> u8;
    fn a(&self) -> u8;
}

impl PixelExt for image::Rgba<u8> {
    fn r(&self) -> u8 {
        self.0[0]
    }

    fn g(&self) -> u8 {
        self.0[1]
    }

    fn b(&self) -> u8 {
        self.0[2]
    }

    fn a(&self) -> u8 {
        self.0[3]
    }
}
