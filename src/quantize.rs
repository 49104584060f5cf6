//! Median cut over a reduced-precision color histogram.
//!
//! Pixels are grouped into buckets by their color truncated to `bits` bits per
//! channel. Every bucket keeps its exact 8-bit channel sums, so the color
//! reported for a region is the true average of the pixels it covers and a
//! solid image comes back as exactly its own color.
//!
//! Ordering is fully deterministic: boxes are split largest-volume first, ties
//! going to the lowest box position, and results are ranked by population with
//! ties broken by ascending `0xRRGGBB`.

use std::cmp::Reverse;

use itertools::Itertools;
use log::trace;

use crate::color::{Color, PixelExt};

/// A representative color and how many pixels it stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedColor {
    pub color: Color,
    pub population: u32,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    key: [u8; 3],
    count: u32,
    sums: [u64; 4],
}

impl Bucket {
    fn new(key: [u8; 3]) -> Self {
        Self {
            key,
            count: 0,
            sums: [0; 4],
        }
    }

    fn add(&mut self, px: &image::Rgba<u8>) {
        self.count += 1;
        self.sums[0] += px.r() as u64;
        self.sums[1] += px.g() as u64;
        self.sums[2] += px.b() as u64;
        self.sums[3] += px.a() as u64;
    }
}

fn average(buckets: &[Bucket]) -> QuantizedColor {
    let mut count = 0u64;
    let mut sums = [0u64; 4];
    for b in buckets {
        count += b.count as u64;
        for (s, v) in sums.iter_mut().zip(b.sums) {
            *s += v;
        }
    }
    // count > 0: buckets are only created for a pixel
    let mean = |s: u64| ((s + count / 2) / count) as u8;
    QuantizedColor {
        color: Color::rgba(mean(sums[0]), mean(sums[1]), mean(sums[2]), mean(sums[3])),
        population: count as u32,
    }
}

/// A range of buckets and the bounding box of their quantized keys
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    lo: usize,
    hi: usize,
    min: [u8; 3],
    max: [u8; 3],
    population: u64,
}

impl ColorBox {
    fn fit(buckets: &[Bucket], lo: usize, hi: usize) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [0u8; 3];
        let mut population = 0;
        for b in &buckets[lo..hi] {
            for d in 0..3 {
                min[d] = min[d].min(b.key[d]);
                max[d] = max[d].max(b.key[d]);
            }
            population += b.count as u64;
        }
        Self { lo, hi, min, max, population }
    }

    fn can_split(&self) -> bool {
        self.hi - self.lo > 1
    }

    fn volume(&self) -> u64 {
        (0..3)
            .map(|d| (self.max[d] - self.min[d]) as u64 + 1)
            .product()
    }

    /// Red wins ties, then green
    fn longest_dimension(&self) -> usize {
        let len = |d: usize| self.max[d] - self.min[d];
        if len(0) >= len(1) && len(0) >= len(2) {
            0
        } else if len(1) >= len(2) {
            1
        } else {
            2
        }
    }

    /// Sort the box's buckets along its longest side and cut at the population median.
    /// Both halves are non-empty.
    fn split(&self, buckets: &mut [Bucket]) -> (ColorBox, ColorBox) {
        let dim = self.longest_dimension();
        buckets[self.lo..self.hi].sort_unstable_by_key(|b| (b.key[dim], b.key));

        let half = self.population / 2;
        let mut seen = 0u64;
        let mut cut = self.hi - 1;
        for (offset, b) in buckets[self.lo..self.hi].iter().enumerate() {
            seen += b.count as u64;
            if seen >= half {
                cut = (self.lo + offset + 1).min(self.hi - 1);
                break;
            }
        }

        (
            ColorBox::fit(buckets, self.lo, cut),
            ColorBox::fit(buckets, cut, self.hi),
        )
    }
}

fn histogram(pixels: &image::RgbaImage, bits: u8, accept: &impl Fn(Color) -> bool) -> Vec<Bucket> {
    let shift = 8 - bits.clamp(1, 8);
    let mut index = ahash::HashMap::<[u8; 3], usize>::default();
    let mut buckets = Vec::new();

    for px in pixels.pixels() {
        if px.a() == 0 || !accept(Color::from(*px)) {
            continue;
        }
        let key = [px.r() >> shift, px.g() >> shift, px.b() >> shift];
        let i = *index.entry(key).or_insert_with(|| {
            buckets.push(Bucket::new(key));
            buckets.len() - 1
        });
        buckets[i].add(px);
    }

    buckets.sort_unstable_by_key(|b| b.key);
    buckets
}

/// Reduce `pixels` to at most `max_colors` representative colors, most populous first.
///
/// Fully transparent pixels and pixels `accept` rejects are ignored, and so are
/// result colors `accept` rejects.
pub fn quantize(
    pixels: &image::RgbaImage,
    bits: u8,
    max_colors: usize,
    accept: impl Fn(Color) -> bool,
) -> Vec<QuantizedColor> {
    if max_colors == 0 {
        return Vec::new();
    }
    let mut buckets = histogram(pixels, bits, &accept);
    if buckets.is_empty() {
        return Vec::new();
    }

    let regions = if buckets.len() <= max_colors {
        buckets.iter().map(|b| average(std::slice::from_ref(b))).collect_vec()
    } else {
        let mut boxes = vec![ColorBox::fit(&buckets, 0, buckets.len())];
        while boxes.len() < max_colors {
            let next = boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.can_split())
                .min_by_key(|(i, b)| (Reverse(b.volume()), *i))
                .map(|(i, _)| i);
            let Some(i) = next else {
                break;
            };
            let (lower, upper) = boxes[i].split(&mut buckets);
            boxes[i] = lower;
            boxes.push(upper);
        }
        boxes.iter().map(|b| average(&buckets[b.lo..b.hi])).collect_vec()
    };

    trace!(
        "quantized {}x{} pixels: {} buckets, {} regions",
        pixels.width(),
        pixels.height(),
        buckets.len(),
        regions.len()
    );

    regions
        .into_iter()
        .filter(|q| accept(q.color))
        .sorted_by_key(|q| (Reverse(q.population), q.color.packed_rgb()))
        .take(max_colors)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any(_: Color) -> bool {
        true
    }

    fn rgba(r: u8, g: u8, b: u8) -> image::Rgba<u8> {
        image::Rgba([r, g, b, 255])
    }

    #[test]
    fn solid_image_is_one_exact_color() {
        let img = image::RgbaImage::from_pixel(10, 10, rgba(13, 201, 77));
        let out = quantize(&img, 5, 16, any);
        assert_eq!(out, vec![QuantizedColor { color: Color::rgb(13, 201, 77), population: 100 }]);
    }

    #[test]
    fn ranks_by_population_then_rgb() {
        let img = image::RgbaImage::from_fn(10, 1, |x, _| match x {
            0..=5 => rgba(0, 0, 255),
            6 | 7 => rgba(255, 0, 0),
            _ => rgba(0, 255, 0),
        });
        let out = quantize(&img, 5, 16, any);
        let colors = out.iter().map(|q| q.color.to_hex()).collect_vec();
        // green and red tie at 2 pixels, green packs lower
        assert_eq!(colors, vec!["#0000FF", "#00FF00", "#FF0000"]);
        assert_eq!(out.iter().map(|q| q.population).collect_vec(), vec![6, 2, 2]);
    }

    #[test]
    fn never_exceeds_max_colors() {
        let img = image::RgbaImage::from_fn(64, 64, |x, y| rgba((x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8));
        for max in [1, 2, 3, 7, 16, 64, 200] {
            let out = quantize(&img, 5, max, any);
            assert!(out.len() <= max, "{} > {max}", out.len());
            assert!(!out.is_empty());
            assert_eq!(out.iter().map(|q| q.population).sum::<u32>(), 64 * 64);
        }
    }

    #[test]
    fn single_box_averages_everything() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| if x == 0 { rgba(0, 0, 0) } else { rgba(255, 255, 255) });
        let out = quantize(&img, 5, 1, any);
        assert_eq!(out, vec![QuantizedColor { color: Color::rgb(128, 128, 128), population: 2 }]);
    }

    #[test]
    fn split_separates_distant_clusters() {
        let img = image::RgbaImage::from_fn(20, 20, |x, y| {
            let jitter = ((x + y) % 3) as u8;
            if x < 10 {
                rgba(200 + jitter * 8, 10, 10)
            } else {
                rgba(10, 10, 200 + jitter * 8)
            }
        });
        let out = quantize(&img, 5, 2, any);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|q| q.population == 200));
        assert!(out[0].color.blue > 180 && out[0].color.red < 20);
        assert!(out[1].color.red > 180 && out[1].color.blue < 20);
    }

    #[test]
    fn is_deterministic() {
        let img = image::RgbaImage::from_fn(50, 50, |x, y| rgba((x * 5) as u8, (y * 5) as u8, ((x * y) % 256) as u8));
        let a = quantize(&img, 5, 12, any);
        let b = quantize(&img, 5, 12, any);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn equal_volume_boxes_split_lowest_position_first() {
        // first cut gives [0, 10] and [20, 30], both 11 wide; the lower one stays at index 0
        let img = image::RgbaImage::from_fn(4, 1, |x, _| rgba((x * 10) as u8, 0, 0));
        let out = quantize(&img, 8, 3, any);
        let colors = out.iter().map(|q| q.color.to_hex()).collect_vec();
        assert_eq!(colors, vec!["#190000", "#000000", "#0A0000"]);
    }

    #[test]
    fn transparent_pixels_are_ignored() {
        let img = image::RgbaImage::from_fn(4, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 255, 0, 0])
            }
        });
        let out = quantize(&img, 5, 16, any);
        assert_eq!(out, vec![QuantizedColor { color: Color::rgb(255, 0, 0), population: 1 }]);

        let clear = image::RgbaImage::new(4, 4);
        assert!(quantize(&clear, 5, 16, any).is_empty());
    }

    #[test]
    fn rejected_pixels_are_ignored() {
        let img = image::RgbaImage::from_fn(3, 1, |x, _| [rgba(0, 0, 0), rgba(9, 9, 9), rgba(0, 0, 250)][x as usize]);
        let out = quantize(&img, 5, 16, |c| c.blue > 100);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].color, Color::rgb(0, 0, 250));
    }

    #[test]
    fn alpha_is_averaged() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| image::Rgba([40, 40, 40, if x == 0 { 100 } else { 200 }]));
        let out = quantize(&img, 5, 4, any);
        assert_eq!(out[0].color, Color::rgba(40, 40, 40, 150));
    }

    #[test]
    fn full_precision_keeps_near_colors_apart() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| rgba(100 + x as u8, 0, 0));
        assert_eq!(quantize(&img, 5, 16, any).len(), 1);
        assert_eq!(quantize(&img, 8, 16, any).len(), 2);
    }

    #[test]
    fn zero_max_colors_is_empty() {
        let img = image::RgbaImage::from_pixel(2, 2, rgba(1, 2, 3));
        assert!(quantize(&img, 5, 0, any).is_empty());
    }
}
