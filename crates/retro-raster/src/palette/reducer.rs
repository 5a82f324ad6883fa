//! k-means color quantization in RGBA space.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

use crate::error::DegradeError;
use crate::raster::{Color, RasterImage};

/// Upper bound on the clustering rounds per palette.
pub const MAX_ITERATIONS: usize = 10;

/// Largest palette a reducer will produce.
pub const MAX_COLORS: u32 = 256;

/// Seed used by [`ColorReducer::new`].
pub const DEFAULT_SEED: u64 = 0x5053_3154_4558;

/// Reduces an image to at most `k` colors with k-means clustering.
///
/// Centroid seeding draws from the reducer's RNG, so the palette for a
/// given input is reproducible for a given seed. The palette learned by the
/// most recent call is kept for inspection via [`ColorReducer::palette`].
///
/// # Example
///
/// ```
/// use retro_raster::{Color, ColorReducer, RasterImage};
///
/// let image = RasterImage::filled(4, 4, Color::rgb(10, 20, 30)).unwrap();
/// let mut reducer = ColorReducer::new();
/// let reduced = reducer.reduce_colors(&image, 8).unwrap();
///
/// assert_eq!(reduced, image);
/// assert_eq!(reducer.palette(), &[Color::rgb(10, 20, 30)]);
/// ```
#[derive(Debug, Clone)]
pub struct ColorReducer<R = StdRng> {
    rng: R,
    palette: Vec<Color>,
}

impl ColorReducer<StdRng> {
    /// Reducer seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::seeded(DEFAULT_SEED)
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for ColorReducer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ColorReducer<R> {
    /// Reducer drawing centroid seeds from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            palette: Vec::new(),
        }
    }

    /// Palette produced by the most recent call.
    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Map every pixel to its nearest palette entry.
    ///
    /// Images with at most `k` distinct colors are returned unchanged and
    /// the palette becomes exactly that set. Otherwise the palette is learned
    /// with [`generate_palette`](Self::generate_palette) and each pixel takes
    /// the RGB of its nearest entry while keeping its own alpha.
    pub fn reduce_colors(&mut self, image: &RasterImage, k: u32) -> Result<RasterImage, DegradeError> {
        validate_count(k)?;

        let distinct = distinct_colors(image.colors());
        if distinct.len() <= k as usize {
            self.palette = distinct;
            return Ok(image.clone());
        }

        self.generate_palette(image, k)?;
        if self.palette.is_empty() {
            // Every pixel is fully transparent; nothing to cluster against.
            return Ok(image.clone());
        }

        let mut out = Vec::with_capacity(image.pixels().len());
        for color in image.colors() {
            let nearest = color
                .nearest_index(&self.palette)
                .map(|index| self.palette[index])
                .unwrap_or(color);
            out.extend_from_slice(&[nearest.r, nearest.g, nearest.b, color.a]);
        }

        RasterImage::new(image.width(), image.height(), out)
    }

    /// Learn a palette of at most `k` colors.
    ///
    /// Fully transparent pixels never seed or move a centroid. Seeds are
    /// `k` distinct colors drawn without replacement; then up to
    /// [`MAX_ITERATIONS`] rounds of nearest-centroid assignment and
    /// rounded-mean update run, stopping once no centroid moves. Centroids
    /// left without members are dropped.
    pub fn generate_palette(&mut self, image: &RasterImage, k: u32) -> Result<Vec<Color>, DegradeError> {
        validate_count(k)?;

        let samples: Vec<Color> = image.colors().filter(|c| c.a > 0).collect();
        if samples.is_empty() {
            self.palette.clear();
            return Ok(Vec::new());
        }

        let mut centroids = self.initial_centroids(&samples, k as usize);
        let mut assignments = vec![0usize; samples.len()];

        for _ in 0..MAX_ITERATIONS {
            assign(&samples, &centroids, &mut assignments);

            let mut sums = vec![[0u64; 4]; centroids.len()];
            let mut counts = vec![0u64; centroids.len()];
            for (sample, &cluster) in samples.iter().zip(&assignments) {
                for (sum, value) in sums[cluster].iter_mut().zip(sample.to_bytes()) {
                    *sum += value as u64;
                }
                counts[cluster] += 1;
            }

            let mut changed = false;
            for (index, centroid) in centroids.iter_mut().enumerate() {
                if counts[index] == 0 {
                    continue;
                }
                let mean = sums[index].map(|sum| rounded_mean(sum, counts[index]));
                let updated = Color::from_bytes(mean);
                if updated != *centroid {
                    *centroid = updated;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        // Membership against the final centroids decides what survives.
        assign(&samples, &centroids, &mut assignments);
        let mut occupied = vec![false; centroids.len()];
        for &cluster in &assignments {
            occupied[cluster] = true;
        }
        let palette: Vec<Color> = centroids
            .into_iter()
            .zip(occupied)
            .filter_map(|(centroid, used)| used.then_some(centroid))
            .collect();

        self.palette = palette.clone();
        Ok(palette)
    }

    /// Draw up to `k` distinct sample colors, without replacement.
    ///
    /// Each color is weighted by how many samples carry it, so frequent
    /// colors are the likeliest seeds.
    fn initial_centroids(&mut self, samples: &[Color], k: usize) -> Vec<Color> {
        let candidates = color_counts(samples.iter().copied());
        if candidates.len() <= k {
            return candidates.into_iter().map(|(color, _)| color).collect();
        }
        let indices = rand::seq::index::sample_weighted(
            &mut self.rng,
            candidates.len(),
            |index| candidates[index].1 as f64,
            k,
        )
        // Counts are always positive, so weighting cannot fail.
        .unwrap_or_else(|_| rand::seq::index::sample(&mut self.rng, candidates.len(), k));
        indices
            .into_iter()
            .map(|index| candidates[index].0)
            .collect()
    }
}

fn validate_count(k: u32) -> Result<(), DegradeError> {
    if k == 0 || k > MAX_COLORS {
        return Err(DegradeError::InvalidColorCount {
            count: k,
            min: 1,
            max: MAX_COLORS,
        });
    }
    Ok(())
}

/// Distinct colors in first-seen order.
fn distinct_colors(colors: impl Iterator<Item = Color>) -> Vec<Color> {
    let mut seen = HashSet::new();
    colors.filter(|color| seen.insert(*color)).collect()
}

/// Distinct colors with their occurrence counts, in first-seen order.
fn color_counts(colors: impl Iterator<Item = Color>) -> Vec<(Color, u32)> {
    let mut index = HashMap::new();
    let mut counts: Vec<(Color, u32)> = Vec::new();
    for color in colors {
        let slot = *index.entry(color).or_insert_with(|| {
            counts.push((color, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }
    counts
}

fn assign(samples: &[Color], centroids: &[Color], assignments: &mut [usize]) {
    for (sample, slot) in samples.iter().zip(assignments.iter_mut()) {
        *slot = sample.nearest_index(centroids).unwrap_or(0);
    }
}

/// `sum / count` rounded half up.
fn rounded_mean(sum: u64, count: u64) -> u8 {
    ((sum * 2 + count) / (count * 2)).min(255) as u8
}
