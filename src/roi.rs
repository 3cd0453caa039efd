use image::{GrayImage, Rgb, RgbImage};
use ndarray::{Array2, s};
use std::str::FromStr;
use thiserror::Error;

pub const ROI_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoiParseError {
    #[error("expected four comma separated coordinates x1,y1,x2,y2, got {0:?}")]
    WrongArity(String),

    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),
}

/// Rectangle dragged over a slice, given by its two corners in image
/// coordinates (column, row). The corners may come in any order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl RoiRect {
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self { start, end }
    }

    /// Column range `x_min..x_max`
    pub fn columns(&self) -> (usize, usize) {
        (self.start.0.min(self.end.0), self.start.0.max(self.end.0))
    }

    /// Row range `y_min..y_max`
    pub fn rows(&self) -> (usize, usize) {
        (self.start.1.min(self.end.1), self.start.1.max(self.end.1))
    }

    /// Binary mask of a `(rows, columns)` slice. The rectangle is half-open
    /// and clipped to the slice.
    pub fn to_mask(&self, shape: (usize, usize)) -> Array2<bool> {
        let (height, width) = shape;
        let (x_min, x_max) = self.columns();
        let (y_min, y_max) = self.rows();
        let (x_min, x_max) = (x_min.min(width), x_max.min(width));
        let (y_min, y_max) = (y_min.min(height), y_max.min(height));

        let mut mask = Array2::from_elem(shape, false);
        mask.slice_mut(s![y_min..y_max, x_min..x_max]).fill(true);
        mask
    }
}

impl FromStr for RoiRect {
    type Err = RoiParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coords = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<usize>()
                    .map_err(|_| RoiParseError::InvalidCoordinate(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match coords.as_slice() {
            &[x1, y1, x2, y2] => Ok(Self::new((x1, y1), (x2, y2))),
            _ => Err(RoiParseError::WrongArity(s.to_string())),
        }
    }
}

/// Grey slice as RGB with the masked pixels painted in [`ROI_COLOR`].
/// Mask cells outside the image are ignored.
pub fn overlay(gray: &GrayImage, mask: &Array2<bool>) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let inside = mask
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(false);
        if inside {
            ROI_COLOR
        } else {
            let [v] = gray.get_pixel(x, y).0;
            Rgb([v, v, v])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_half_open_rectangle() {
        let mask = RoiRect::new((1, 2), (4, 3)).to_mask((5, 6));
        assert_eq!(mask.iter().filter(|&&v| v).count(), 3);
        assert!(mask[[2, 1]] && mask[[2, 2]] && mask[[2, 3]]);
        assert!(!mask[[2, 4]]);
        assert!(!mask[[3, 1]]);
    }

    #[test]
    fn corners_are_sorted() {
        let forward = RoiRect::new((1, 1), (3, 4)).to_mask((6, 6));
        let backward = RoiRect::new((3, 4), (1, 1)).to_mask((6, 6));
        assert_eq!(forward, backward);
        assert_eq!(forward.iter().filter(|&&v| v).count(), 6);
    }

    #[test]
    fn rectangle_is_clipped_to_slice() {
        let mask = RoiRect::new((2, 2), (100, 100)).to_mask((4, 5));
        assert_eq!(mask.dim(), (4, 5));
        assert_eq!(mask.iter().filter(|&&v| v).count(), 2 * 3);

        let outside = RoiRect::new((10, 10), (20, 20)).to_mask((4, 5));
        assert!(outside.iter().all(|&v| !v));
    }

    #[test]
    fn degenerate_rectangle_selects_nothing() {
        let mask = RoiRect::new((2, 2), (2, 4)).to_mask((5, 5));
        assert!(mask.iter().all(|&v| !v));
    }

    #[test]
    fn parses_coordinates() {
        assert_eq!(
            "10, 20,30,5".parse::<RoiRect>(),
            Ok(RoiRect::new((10, 20), (30, 5)))
        );
        assert_eq!(
            "1,2,3".parse::<RoiRect>(),
            Err(RoiParseError::WrongArity("1,2,3".to_string()))
        );
        assert_eq!(
            "1,2,x,4".parse::<RoiRect>(),
            Err(RoiParseError::InvalidCoordinate("x".to_string()))
        );
    }

    #[test]
    fn overlay_paints_mask_red() {
        let gray = GrayImage::from_pixel(3, 2, image::Luma([80]));
        let mask = RoiRect::new((1, 0), (2, 1)).to_mask((2, 3));
        let rgb = overlay(&gray, &mask);
        assert_eq!(*rgb.get_pixel(1, 0), ROI_COLOR);
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([80, 80, 80]));
        assert_eq!(*rgb.get_pixel(1, 1), Rgb([80, 80, 80]));
    }
}
