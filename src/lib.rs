//! Dominant color palettes from images.
//!
//! ```no_run
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let palette = palette_picker::extract(&bytes, (200, 200), 16).unwrap();
//! for swatch in &palette {
//!     println!("{} {}", swatch.hex(), swatch.population());
//! }
//! ```

pub mod clipboard;
pub mod color;
pub mod downscale;
pub mod extract;
pub mod loader;
pub mod quantize;
pub mod state;
pub mod swatch;

#[cfg(test)]
mod tests;

pub use color::Color;
pub use downscale::{Region, ResizeFilter, TargetSize};
pub use extract::{extract, extract_image, extract_with, BlackWhiteFilter, ExtractError, ExtractOptions, PaletteFilter};
pub use loader::{LoadImageError, SourceImage};
pub use state::{ExtractionTicket, PaletteStore, PickerState, StateError};
pub use swatch::{Palette, Swatch};
