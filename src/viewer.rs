use crate::{
    enums::SortBy,
    roi::{self, RoiRect},
    stats::{DEFAULT_HISTOGRAM_BINS, Histogram, RoiStats, StatsCalculator, StatsError},
    volume::Volume,
    volume_loader::{VolumeLoader, VolumeLoaderError},
    windowing::Window,
};

use image::RgbImage;
use ndarray::{Array2, ArrayView2};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] VolumeLoaderError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Slice {index} is out of range, the volume has {depth} slices")]
    SliceOutOfRange { index: usize, depth: usize },
}

/// Statistics and histogram of the current ROI on the current slice.
#[derive(Clone, Debug, PartialEq)]
pub struct RoiSummary {
    pub rect: RoiRect,
    pub stats: RoiStats,
    pub histogram: Histogram,
}

/// Interactive viewer state without a UI: the loaded volume, the slice being
/// looked at, the display window and the selected ROI.
pub struct ViewerSession {
    volume: Volume,
    stats_calculator: StatsCalculator,
    current_slice: usize,
    window: Window,
    histogram_bins: usize,
    roi: Option<(RoiRect, Array2<bool>)>,
    summary: Option<RoiSummary>,
}

impl ViewerSession {
    /// Start a session on slice 0 with the volume's default window.
    pub fn new(volume: Volume) -> Self {
        let window = volume.default_window();
        log::debug!(
            "default window center {:.1} width {:.1}",
            window.center(),
            window.width()
        );
        Self {
            stats_calculator: StatsCalculator::new(volume.spacing()),
            volume,
            current_slice: 0,
            window,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            roi: None,
            summary: None,
        }
    }

    /// Load every DICOM file of `dir` and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory holds no DICOM files or loading fails.
    pub fn open(dir: impl AsRef<Path>, sort_by: SortBy) -> Result<Self, ViewerError> {
        let volume = VolumeLoader::load_from_directory(dir, sort_by)?;
        Ok(Self::new(volume))
    }

    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins.max(1);
        self
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn slice_count(&self) -> usize {
        self.volume.depth()
    }

    pub fn current_slice(&self) -> usize {
        self.current_slice
    }

    fn current_view(&self) -> Result<ArrayView2<'_, f32>, ViewerError> {
        self.volume
            .slice(self.current_slice)
            .ok_or(ViewerError::SliceOutOfRange {
                index: self.current_slice,
                depth: self.slice_count(),
            })
    }

    /// Move to another slice. An existing ROI is kept and its summary is
    /// recomputed on the new slice.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::SliceOutOfRange`] past the last slice.
    pub fn set_slice(&mut self, index: usize) -> Result<(), ViewerError> {
        let depth = self.slice_count();
        if index >= depth {
            return Err(ViewerError::SliceOutOfRange { index, depth });
        }
        self.current_slice = index;
        self.refresh_summary()
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    pub fn reset_window(&mut self) {
        self.window = self.volume.default_window();
    }

    /// Select a rectangular ROI on the current slice and summarise it.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::EmptyRegion`] if the rectangle selects no pixel
    /// of the slice; the previous ROI is kept in that case.
    pub fn select_roi(&mut self, rect: RoiRect) -> Result<&RoiSummary, ViewerError> {
        let mask = rect.to_mask(self.current_view()?.dim());
        let summary = self.summarize(rect, &mask)?;
        log::info!(
            "ROI {:?} on slice {}: mean {:.2}, std {:.2}, area {:.2} mm²",
            rect,
            self.current_slice,
            summary.stats.mean,
            summary.stats.std,
            summary.stats.area_mm2
        );
        self.roi = Some((rect, mask));
        Ok(self.summary.insert(summary))
    }

    pub fn clear_roi(&mut self) {
        self.roi = None;
        self.summary = None;
    }

    pub fn roi_mask(&self) -> Option<&Array2<bool>> {
        self.roi.as_ref().map(|(_, mask)| mask)
    }

    pub fn roi_summary(&self) -> Option<&RoiSummary> {
        self.summary.as_ref()
    }

    fn summarize(&self, rect: RoiRect, mask: &Array2<bool>) -> Result<RoiSummary, ViewerError> {
        let slice = self.current_view()?;
        let pixels = StatsCalculator::roi_pixels(&mask.view(), &slice)?;
        let stats = self.stats_calculator.stats_from_pixels(&pixels)?;
        Ok(RoiSummary {
            rect,
            stats,
            histogram: Histogram::from_values(&pixels, self.histogram_bins),
        })
    }

    fn refresh_summary(&mut self) -> Result<(), ViewerError> {
        if let Some((rect, mask)) = &self.roi {
            self.summary = Some(self.summarize(*rect, mask)?);
        }
        Ok(())
    }

    /// The current slice through the current window, with the ROI painted in
    /// red when one is selected.
    /// An empty volume renders as an empty image.
    pub fn render(&self) -> RgbImage {
        let Some(gray) = self
            .current_view()
            .ok()
            .and_then(|slice| self.window.to_image(&slice))
        else {
            return RgbImage::new(0, 0);
        };
        match self.roi_mask() {
            Some(mask) => roi::overlay(&gray, mask),
            None => image::DynamicImage::ImageLuma8(gray).to_rgb8(),
        }
    }
}
