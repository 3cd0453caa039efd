use crate::windowing::Window;

use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;

/// Physical pixel size of a volume in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub row: f32,
    pub column: f32,
    pub slice_thickness: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            row: 1.0,
            column: 1.0,
            slice_thickness: 1.0,
        }
    }
}

impl Spacing {
    /// Area covered by one pixel of a slice, in mm².
    pub fn pixel_area(&self) -> f64 {
        self.row as f64 * self.column as f64
    }
}

/// An ordered stack of slices indexed (slice, row, column).
#[derive(Debug, Default)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: Spacing,
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: Spacing) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of slices
    pub fn depth(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Get one slice, or `None` if `index` is past the last slice.
    pub fn slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.depth()).then(|| self.data.index_axis(Axis(0), index))
    }

    /// Mean intensity over every voxel of the volume.
    pub fn mean(&self) -> f64 {
        let count = self.data.len();
        if count == 0 {
            return 0.0;
        }
        self.sum_per_slice(|v| v as f64) / count as f64
    }

    /// Population standard deviation over every voxel of the volume.
    pub fn std(&self) -> f64 {
        let count = self.data.len();
        if count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq = self.sum_per_slice(|v| {
            let d = v as f64 - mean;
            d * d
        });
        (sum_sq / count as f64).sqrt()
    }

    /// Slices are reduced in parallel and their partial sums added in slice
    /// order, so the result does not depend on scheduling.
    fn sum_per_slice(&self, f: impl Fn(f32) -> f64 + Sync) -> f64 {
        let partial: Vec<f64> = self
            .data
            .outer_iter()
            .into_par_iter()
            .map(|slice| slice.iter().map(|&v| f(v)).sum::<f64>())
            .collect();
        partial.iter().sum()
    }

    /// Window centred on the global mean with the global standard deviation
    /// as its width.
    pub fn default_window(&self) -> Window {
        Window::new(self.mean() as f32, self.std() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_slice_volume() -> Volume {
        let data = array![[[0.0, 2.0], [4.0, 6.0]], [[8.0, 10.0], [12.0, 14.0]]];
        Volume::new(data, Spacing::default())
    }

    #[test]
    fn slice_is_bounded() {
        let volume = two_slice_volume();
        assert_eq!(volume.dim(), (2, 2, 2));
        assert_eq!(volume.slice(1).unwrap()[[0, 1]], 10.0);
        assert!(volume.slice(2).is_none());
    }

    #[test]
    fn global_statistics() {
        let volume = two_slice_volume();
        assert!((volume.mean() - 7.0).abs() < 1e-9);
        // values 0..14 step 2: variance = 4 * var(0..7) = 4 * 5.25
        assert!((volume.std() - 21.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn default_window_uses_global_statistics() {
        let volume = two_slice_volume();
        let window = volume.default_window();
        assert!((window.center() - 7.0).abs() < 1e-5);
        assert!((window.width() - 21.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn empty_volume_has_zero_statistics() {
        let volume = Volume::default();
        assert_eq!(volume.mean(), 0.0);
        assert_eq!(volume.std(), 0.0);
        assert!(volume.slice(0).is_none());
    }

    #[test]
    fn pixel_area_multiplies_in_plane_spacing() {
        let spacing = Spacing {
            row: 0.5,
            column: 0.8,
            slice_thickness: 3.0,
        };
        assert!((spacing.pixel_area() - 0.4).abs() < 1e-6);
    }
}
