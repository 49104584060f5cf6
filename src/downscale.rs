//! Shrinks a source image before analysis.
//!
//! Quantizing a few tens of thousands of pixels is enough to find the dominant
//! colors of a photo. Downscaling bounds the cost at the price of color
//! fidelity: small details may disappear, and any filter other than `Nearest`
//! blends neighbours into colors that were never in the source.

use std::{fmt, str::FromStr};

use image::imageops::{self, FilterType};
use thiserror::Error;

use crate::loader::SourceImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::new(200, 200)
    }
}

impl From<(u32, u32)> for TargetSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected WIDTHxHEIGHT, got {0:?}")]
pub struct TargetSizeParseError(String);

/// Parses `200x200` (or `200X200`)
impl FromStr for TargetSize {
    type Err = TargetSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TargetSizeParseError(s.to_string());
        let (w, h) = s.split_once(|c: char| c == 'x' || c == 'X').ok_or_else(err)?;
        let width = w.trim().parse().map_err(|_| err())?;
        let height = h.trim().parse().map_err(|_| err())?;
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::EnumString, strum_macros::Display, strum_macros::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ResizeFilter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(f: ResizeFilter) -> Self {
        match f {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Area of the source image to analyze, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Intersection with a `width` x `height` image, `None` when empty
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        if self.x >= x1 || self.y >= y1 {
            return None;
        }
        Some(Region {
            x: self.x,
            y: self.y,
            width: x1 - self.x,
            height: y1 - self.y,
        })
    }
}

/// Largest size with the source aspect ratio that fits inside `target`.
/// Never upscales, never returns a zero dimension.
pub fn fit_dimensions(src: (u32, u32), target: TargetSize) -> (u32, u32) {
    let (w, h) = src;
    if w <= target.width && h <= target.height {
        return src;
    }
    let scale = f64::min(
        target.width as f64 / w as f64,
        target.height as f64 / h as f64,
    );
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (scaled(w).min(target.width), scaled(h).min(target.height))
}

/// Crop to `region` (already clamped) and shrink to fit `target`.
pub fn downscale(
    image: &SourceImage,
    region: Option<Region>,
    target: TargetSize,
    filter: ResizeFilter,
) -> image::RgbaImage {
    let pixels = image.pixels();
    let cropped = region.map(|r| imageops::crop_imm(pixels, r.x, r.y, r.width, r.height).to_image());
    let src = cropped.as_ref().unwrap_or(pixels);

    let (w, h) = fit_dimensions(src.dimensions(), target);
    if (w, h) == src.dimensions() {
        return src.clone();
    }
    imageops::resize(src, w, h, filter.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn fits_inside_target_keeping_aspect() {
        let target = TargetSize::new(200, 200);
        assert_eq!(fit_dimensions((400, 400), target), (200, 200));
        assert_eq!(fit_dimensions((800, 400), target), (200, 100));
        assert_eq!(fit_dimensions((300, 1200), target), (50, 200));
    }

    #[test]
    fn never_upscales() {
        assert_eq!(fit_dimensions((20, 10), TargetSize::new(200, 200)), (20, 10));
        assert_eq!(fit_dimensions((200, 200), TargetSize::new(200, 200)), (200, 200));
    }

    #[test]
    fn thin_images_keep_one_pixel() {
        assert_eq!(fit_dimensions((10_000, 1), TargetSize::new(100, 100)), (100, 1));
    }

    #[test]
    fn parses_target_size() {
        assert_eq!("64x48".parse::<TargetSize>().unwrap(), TargetSize::new(64, 48));
        assert_eq!("64X48".parse::<TargetSize>().unwrap(), TargetSize::new(64, 48));
        assert!("64".parse::<TargetSize>().is_err());
        assert!("axb".parse::<TargetSize>().is_err());
        assert_eq!(TargetSize::new(3, 4).to_string(), "3x4");
    }

    #[test]
    fn filter_names_round_trip() {
        for f in ResizeFilter::iter() {
            assert_eq!(f.to_string().parse::<ResizeFilter>().unwrap(), f);
        }
        assert_eq!("catmull-rom".parse::<ResizeFilter>().unwrap(), ResizeFilter::CatmullRom);
    }

    #[test]
    fn region_is_clamped() {
        let r = Region { x: 5, y: 5, width: 100, height: 2 };
        assert_eq!(r.clamp_to(10, 10), Some(Region { x: 5, y: 5, width: 5, height: 2 }));
        assert_eq!(r.clamp_to(5, 10), None);
    }

    #[test]
    fn downscale_crops_then_resizes() {
        let mut img = image::RgbaImage::from_pixel(40, 40, image::Rgba([0, 0, 0, 255]));
        for x in 20..40 {
            for y in 0..40 {
                img.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
            }
        }
        let src = SourceImage::from_rgba(img);
        let region = Region { x: 20, y: 0, width: 20, height: 40 };

        let out = downscale(&src, Some(region), TargetSize::new(10, 10), ResizeFilter::Nearest);
        assert_eq!(out.dimensions(), (5, 10));
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn nearest_keeps_pure_colors() {
        let img = image::RgbaImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let out = downscale(&SourceImage::from_rgba(img), None, TargetSize::new(16, 16), ResizeFilter::Nearest);
        assert_eq!(out.dimensions(), (16, 16));
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0, 255] || p.0 == [255, 255, 255, 255]));
    }
}
