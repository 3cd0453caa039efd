use image::{GrayImage, ImageBuffer};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Narrowest window accepted; narrower widths are widened to this.
pub const MIN_WINDOW_WIDTH: f32 = 1.0;

/// Linear intensity window mapping `[center - width/2, center + width/2]`
/// onto the 8-bit display range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    center: f32,
    width: f32,
}

impl Window {
    pub fn new(center: f32, width: f32) -> Self {
        let width = if width.is_finite() {
            width.max(MIN_WINDOW_WIDTH)
        } else {
            MIN_WINDOW_WIDTH
        };
        Self { center, width }
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    /// Never below [`MIN_WINDOW_WIDTH`].
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn lower(&self) -> f32 {
        self.center - self.width / 2.0
    }

    pub fn upper(&self) -> f32 {
        self.center + self.width / 2.0
    }

    #[inline]
    pub fn apply_value(&self, value: f32) -> u8 {
        let normalized = ((value - self.lower()) / self.width).clamp(0.0, 1.0);
        (normalized * 255.0) as u8
    }

    /// Window a slice into display grey levels.
    pub fn apply(&self, slice: &ArrayView2<'_, f32>) -> Array2<u8> {
        let (height, width) = slice.dim();
        let pixels = self.apply_to_vec(slice);
        Array2::from_shape_vec((height, width), pixels)
            .expect("row-major pixels match slice shape")
    }

    /// Window a slice straight into an 8-bit image.
    pub fn to_image(&self, slice: &ArrayView2<'_, f32>) -> Option<GrayImage> {
        let (height, width) = slice.dim();
        ImageBuffer::from_raw(width as u32, height as u32, self.apply_to_vec(slice))
    }

    fn apply_to_vec(&self, slice: &ArrayView2<'_, f32>) -> Vec<u8> {
        // Row-major regardless of the view's memory layout.
        slice
            .outer_iter()
            .into_par_iter()
            .flat_map_iter(|row| {
                row.into_iter()
                    .map(|&v| self.apply_value(v))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
