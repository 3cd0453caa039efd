use crate::volume::Spacing;

use image::{Rgb, RgbImage};
use ndarray::{ArrayView2, Zip};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

const HISTOGRAM_BAR: Rgb<u8> = Rgb([60, 90, 200]);
const HISTOGRAM_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("ROI mask is {mask:?} but the slice is {slice:?}")]
    ShapeMismatch {
        mask: (usize, usize),
        slice: (usize, usize),
    },

    #[error("ROI does not contain any pixel")]
    EmptyRegion,
}

/// Summary of the pixels inside a region of interest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiStats {
    pub mean: f64,
    pub std: f64,
    pub area_mm2: f64,
    pub pixel_count: usize,
}

impl fmt::Display for RoiStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean: {:.2}", self.mean)?;
        writeln!(f, "Std. dev.: {:.2}", self.std)?;
        write!(f, "Area (mm²): {:.2}", self.area_mm2)
    }
}

pub struct StatsCalculator {
    spacing: Spacing,
}

impl StatsCalculator {
    pub fn new(spacing: Spacing) -> Self {
        Self { spacing }
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Pixels of `slice` selected by `mask`, in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::ShapeMismatch`] if mask and slice differ in shape.
    pub fn roi_pixels(
        mask: &ArrayView2<'_, bool>,
        slice: &ArrayView2<'_, f32>,
    ) -> Result<Vec<f32>, StatsError> {
        if mask.dim() != slice.dim() {
            return Err(StatsError::ShapeMismatch {
                mask: mask.dim(),
                slice: slice.dim(),
            });
        }
        let mut pixels = Vec::new();
        Zip::from(mask).and(slice).for_each(|&selected, &value| {
            if selected {
                pixels.push(value);
            }
        });
        Ok(pixels)
    }

    /// Mean, population standard deviation and physical area of the masked
    /// pixels of one slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes differ or the mask selects nothing.
    pub fn calculate_roi_stats(
        &self,
        mask: &ArrayView2<'_, bool>,
        slice: &ArrayView2<'_, f32>,
    ) -> Result<RoiStats, StatsError> {
        let pixels = Self::roi_pixels(mask, slice)?;
        self.stats_from_pixels(&pixels)
    }

    /// Statistics of pixels already selected with [`Self::roi_pixels`].
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::EmptyRegion`] if `pixels` is empty.
    pub fn stats_from_pixels(&self, pixels: &[f32]) -> Result<RoiStats, StatsError> {
        if pixels.is_empty() {
            return Err(StatsError::EmptyRegion);
        }

        let count = pixels.len() as f64;
        let mean = pixels.iter().map(|&v| v as f64).sum::<f64>() / count;
        let variance = pixels
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count;

        Ok(RoiStats {
            mean,
            std: variance.sqrt(),
            area_mm2: count * self.spacing.pixel_area(),
            pixel_count: pixels.len(),
        })
    }
}

/// Equal-width histogram over the range of the values.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` bin boundaries
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bins span `[min, max]` of `values`, the last bin closed on the right.
    /// A single distinct value gets the range `[v - 0.5, v + 0.5]`.
    pub fn from_values(values: &[f32], bins: usize) -> Self {
        let bins = bins.max(1);
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v as f64), hi.max(v as f64))
            });
        let (min, max) = if values.is_empty() {
            (0.0, 1.0)
        } else if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let step = (max - min) / bins as f64;
        let edges = (0..=bins).map(|i| min + step * i as f64).collect();
        let mut counts = vec![0; bins];
        for &v in values {
            let bin = (((v as f64 - min) / step) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Self { edges, counts }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Draw the histogram as a bar chart, one bar per bin scaled to the
    /// tallest bin.
    pub fn render(&self, width: u32, height: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, HISTOGRAM_BACKGROUND);
        let peak = self.counts.iter().copied().max().unwrap_or(0);
        if peak == 0 || width == 0 || height == 0 {
            return image;
        }

        let bins = self.bins() as u64;
        for x in 0..width {
            let bin = (x as u64 * bins / width as u64) as usize;
            let bar = (self.counts[bin] as u64 * height as u64 / peak as u64) as u32;
            for y in height - bar..height {
                image.put_pixel(x, y, HISTOGRAM_BAR);
            }
        }
        image
    }
}
