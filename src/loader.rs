use std::{io::Cursor, path::Path};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadImageError {
    #[error("no image data")]
    EmptyInput,
    #[error("decoding failed: {message}")]
    Decode { message: String },
    #[error("reading image failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded image, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pixels: image::RgbaImage,
    format: Option<image::ImageFormat>,
}

impl SourceImage {
    /// Decode an image from a byte slice. The encoding is guessed from the content.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadImageError> {
        if data.is_empty() {
            return Err(LoadImageError::EmptyInput);
        }

        let reader = image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| LoadImageError::Decode {
                message: e.to_string(),
            })?;
        let format = reader.format();
        if format.is_none() {
            return Err(LoadImageError::Decode {
                message: "unrecognized image format".to_string(),
            });
        }

        let decoded = reader.decode().map_err(|e| LoadImageError::Decode {
            message: e.to_string(),
        })?;

        Ok(Self {
            pixels: decoded.to_rgba8(),
            format,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadImageError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Wrap pixels that are already decoded
    pub fn from_rgba(pixels: image::RgbaImage) -> Self {
        Self {
            pixels,
            format: None,
        }
    }

    pub fn pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }

    pub fn format(&self) -> Option<image::ImageFormat> {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}
