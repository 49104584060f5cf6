use std::fmt;

use thiserror::Error;

use crate::{
    color::Color,
    downscale::{downscale, Region, ResizeFilter, TargetSize},
    loader::{LoadImageError, SourceImage},
    quantize::quantize,
    swatch::Palette,
};

pub const DEFAULT_MAX_COLORS: usize = 16;
pub const DEFAULT_QUANTIZE_BITS: u8 = 5;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Load(#[from] LoadImageError),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl ExtractError {
    pub fn is_decode(&self) -> bool {
        matches!(self, ExtractError::Load(LoadImageError::Decode { .. }))
    }

    pub fn is_empty_input(&self) -> bool {
        matches!(self, ExtractError::Load(LoadImageError::EmptyInput))
    }
}

/// Decides whether a color may take part in the palette.
/// Applied to every pixel and again to every resulting color.
pub trait PaletteFilter: Send + Sync {
    fn is_allowed(&self, color: Color) -> bool;
}

impl<F> PaletteFilter for F
where
    F: Fn(Color) -> bool + Send + Sync,
{
    fn is_allowed(&self, color: Color) -> bool {
        self(color)
    }
}

/// Rejects colors close to black or white, which rarely make interesting swatches
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackWhiteFilter;

impl BlackWhiteFilter {
    const BLACK_MAX_LIGHTNESS: f32 = 0.05;
    const WHITE_MIN_LIGHTNESS: f32 = 0.95;
}

impl PaletteFilter for BlackWhiteFilter {
    fn is_allowed(&self, color: Color) -> bool {
        let (_, _, l) = color.hsl();
        l > Self::BLACK_MAX_LIGHTNESS && l < Self::WHITE_MIN_LIGHTNESS
    }
}

pub struct ExtractOptions {
    /// The image is shrunk to fit inside this before analysis
    pub target_size: TargetSize,
    pub max_colors: usize,
    /// Histogram precision per channel, 1..=8
    pub quantize_bits: u8,
    pub resize_filter: ResizeFilter,
    pub region: Option<Region>,
    pub filters: Vec<Box<dyn PaletteFilter>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            target_size: TargetSize::default(),
            max_colors: DEFAULT_MAX_COLORS,
            quantize_bits: DEFAULT_QUANTIZE_BITS,
            resize_filter: ResizeFilter::default(),
            region: None,
            filters: Vec::new(),
        }
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("target_size", &self.target_size)
            .field("max_colors", &self.max_colors)
            .field("quantize_bits", &self.quantize_bits)
            .field("resize_filter", &self.resize_filter)
            .field("region", &self.region)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl ExtractOptions {
    pub fn new(target_size: impl Into<TargetSize>, max_colors: usize) -> Self {
        Self {
            target_size: target_size.into(),
            max_colors,
            ..Default::default()
        }
    }

    pub fn with_quantize_bits(mut self, bits: u8) -> Self {
        self.quantize_bits = bits;
        self
    }

    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.resize_filter = filter;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_filter(mut self, filter: impl PaletteFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.max_colors == 0 {
            return Err(ExtractError::InvalidOptions("max_colors must be at least 1".to_string()));
        }
        if self.target_size.width == 0 || self.target_size.height == 0 {
            return Err(ExtractError::InvalidOptions(format!(
                "target size {} has a zero dimension",
                self.target_size
            )));
        }
        if !(1..=8).contains(&self.quantize_bits) {
            return Err(ExtractError::InvalidOptions(format!(
                "quantize_bits must be in 1..=8, got {}",
                self.quantize_bits
            )));
        }
        Ok(())
    }

    fn allows(&self, color: Color) -> bool {
        self.filters.iter().all(|f| f.is_allowed(color))
    }
}

/// Extract at most `max_colors` dominant colors from encoded image bytes,
/// analyzing the image shrunk to fit `target_size`.
pub fn extract(
    image_bytes: &[u8],
    target_size: impl Into<TargetSize>,
    max_colors: usize,
) -> Result<Palette, ExtractError> {
    extract_with(image_bytes, &ExtractOptions::new(target_size, max_colors))
}

pub fn extract_with(image_bytes: &[u8], options: &ExtractOptions) -> Result<Palette, ExtractError> {
    options.validate()?;
    let image = SourceImage::from_bytes(image_bytes)?;
    extract_image(&image, options)
}

/// Extract from an already decoded image. Pure: no I/O, no shared state.
pub fn extract_image(image: &SourceImage, options: &ExtractOptions) -> Result<Palette, ExtractError> {
    options.validate()?;

    let region = match options.region {
        Some(r) => Some(r.clamp_to(image.width(), image.height()).ok_or_else(|| {
            ExtractError::InvalidOptions(format!(
                "region {r:?} lies outside the {}x{} image",
                image.width(),
                image.height()
            ))
        })?),
        None => None,
    };

    let pixels = downscale(image, region, options.target_size, options.resize_filter);
    let colors = quantize(&pixels, options.quantize_bits, options.max_colors, |c| options.allows(c));
    Ok(colors.into_iter().collect())
}
