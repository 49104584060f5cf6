use itertools::Itertools;

use crate::{color::Color, quantize::QuantizedColor};

/// One palette entry as a grid tile shows it: the color, its hex code and
/// how many analyzed pixels it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    color: Color,
    hex: String,
    population: u32,
}

impl Swatch {
    pub fn new(color: Color, population: u32) -> Self {
        Self {
            color,
            hex: color.to_hex(),
            population,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// `#RRGGBB`, what gets copied to the clipboard
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn population(&self) -> u32 {
        self.population
    }

    pub fn hsl(&self) -> (f32, f32, f32) {
        self.color.hsl()
    }
}

impl From<QuantizedColor> for Swatch {
    fn from(q: QuantizedColor) -> Self {
        Swatch::new(q.color, q.population)
    }
}

/// Swatches ordered most prominent first. Always built whole, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    pub fn new(swatches: Vec<Swatch>) -> Self {
        Self { swatches }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    pub fn get(&self, index: usize) -> Option<&Swatch> {
        self.swatches.get(index)
    }

    /// The most populous color
    pub fn dominant(&self) -> Option<&Swatch> {
        self.swatches.first()
    }

    pub fn colors(&self) -> Vec<Color> {
        self.swatches.iter().map(Swatch::color).collect_vec()
    }

    pub fn hex_codes(&self) -> Vec<&str> {
        self.swatches.iter().map(Swatch::hex).collect_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Swatch> {
        self.swatches.iter()
    }
}

impl FromIterator<QuantizedColor> for Palette {
    fn from_iter<T: IntoIterator<Item = QuantizedColor>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Swatch::from).collect())
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Swatch;
    type IntoIter = std::slice::Iter<'a, Swatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.swatches.iter()
    }
}
