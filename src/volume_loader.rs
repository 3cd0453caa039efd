use crate::{
    enums::SortBy,
    scanner,
    volume::{Spacing, Volume},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, Axis, s};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No DICOM files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions: expected {expected:?}, image {index} is {found:?}")]
    InconsistentDimensions {
        expected: (usize, usize),
        found: (usize, usize),
        index: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dicom::object::ReadError>,
    },

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),
}

/// One parsed file: its decoded frames and the attributes used for ordering
/// and physical spacing.
#[derive(Debug, Clone, Default)]
pub struct SliceRecord {
    pub frames: Vec<Array2<f32>>,
    pub instance_number: Option<i32>,
    pub position_z: Option<f32>,
    pub table_position: Option<f32>,
    pub pixel_spacing: Option<(f32, f32)>,
    pub slice_thickness: Option<f32>,
}

impl SliceRecord {
    /// Decode the pixel data and read the ordering and spacing attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel data cannot be decoded.
    pub fn from_dicom_object(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Self, VolumeLoaderError> {
        Ok(Self {
            frames: Self::decode_frames(dicom_object)?,
            instance_number: dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()
                .and_then(|e| e.to_int::<i32>().ok()),
            position_z: dicom_object
                .element(tags::IMAGE_POSITION_PATIENT)
                .ok()
                .and_then(|e| e.to_multi_float32().ok())
                .and_then(|pos| pos.get(2).copied()),
            table_position: dicom_object
                .element(tags::TABLE_POSITION)
                .ok()
                .and_then(|e| e.to_float32().ok()),
            pixel_spacing: dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()
                .and_then(|e| e.to_multi_float32().ok())
                .and_then(|spacing| match spacing.as_slice() {
                    [row, column, ..] => Some((*row, *column)),
                    _ => None,
                }),
            slice_thickness: dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()
                .and_then(|e| e.to_float32().ok()),
        })
    }

    fn decode_frames(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Vec<Array2<f32>>, VolumeLoaderError> {
        let pixel_data = dicom_object.decode_pixel_data()?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::Default)
            .with_voi_lut(VoiLutOption::Identity);
        // (frames, rows, columns, samples); only the first sample is kept
        let array = pixel_data.to_ndarray_with_options::<f32>(&options)?;
        Ok(array
            .axis_iter(Axis(0))
            .map(|frame| frame.slice(s![.., .., 0]).to_owned())
            .collect())
    }

    fn sort_key(&self, sort_by: SortBy) -> Option<f32> {
        match sort_by {
            SortBy::InstanceNumber => self.instance_number.map(|n| n as f32),
            SortBy::ImagePositionPatient => self.position_z,
            SortBy::TablePosition => self.table_position,
            SortBy::Auto | SortBy::None => None,
        }
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if pixel data cannot be decoded, no images were found or
    /// dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let records = dicom_objects
            .par_iter()
            .map(SliceRecord::from_dicom_object)
            .collect::<Result<Vec<_>, _>>()?;

        Self::load_from_records(records, sort_by)
    }

    /// Order already parsed records and stack their frames into a volume.
    ///
    /// # Errors
    ///
    /// Returns error if no frames were found or dimensions are inconsistent
    pub fn load_from_records(
        mut records: Vec<SliceRecord>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        Self::sort_records(&mut records, sort_by);

        let spacing = records.first().map(Self::get_spacing).unwrap_or_default();
        let images: Vec<_> = records
            .into_iter()
            .flat_map(|record| record.frames)
            .collect();

        if images.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::validate_dimensions(&images)?;
        let volume_array = Self::build_volume_array(&images);

        Ok(Volume::new(volume_array, spacing))
    }

    /// Load a volume from file paths
    ///
    /// # Errors
    ///
    /// Returns error if any file cannot be read or decoded
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let start = Instant::now();
        let objects = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                open_file(path).map_err(|source| VolumeLoaderError::Open {
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let volume = Self::load_from_dicom_objects(&objects, sort_by)?;
        log::info!(
            "loaded volume {:?} from {} files in {:.2?}",
            volume.dim(),
            paths.len(),
            start.elapsed()
        );
        Ok(volume)
    }

    /// Load a volume from every DICOM file of a directory, detected by
    /// ".dcm" extension or by the DICOM magic bytes
    ///
    /// # Errors
    ///
    /// Returns [`VolumeLoaderError::NoInputFiles`] if the directory contains
    /// no DICOM file
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths = scanner::scan_directory(path)?;
        Self::load_from_file_paths(&paths, sort_by)
    }

    fn resolve_sort_by(records: &[SliceRecord], sort_by: SortBy) -> SortBy {
        if !matches!(sort_by, SortBy::Auto) {
            return sort_by;
        }
        if records.iter().all(|r| r.instance_number.is_some()) {
            SortBy::InstanceNumber
        } else if records.iter().all(|r| r.position_z.is_some()) {
            SortBy::ImagePositionPatient
        } else {
            log::warn!(
                "slices carry neither InstanceNumber nor ImagePositionPatient on every file; keeping file order"
            );
            SortBy::None
        }
    }

    /// Stable sort by the resolved key; records without a key keep their
    /// relative order after the keyed ones.
    fn sort_records(records: &mut [SliceRecord], sort_by: SortBy) {
        let sort_by = Self::resolve_sort_by(records, sort_by);
        if matches!(sort_by, SortBy::None) {
            return;
        }
        log::debug!("ordering {} slices by {sort_by:?}", records.len());
        records.sort_by(|a, b| match (a.sort_key(sort_by), b.sort_key(sort_by)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    fn validate_dimensions(images: &[Array2<f32>]) -> Result<(), VolumeLoaderError> {
        let expected = images[0].dim();
        match images.iter().position(|img| img.dim() != expected) {
            Some(index) => Err(VolumeLoaderError::InconsistentDimensions {
                expected,
                found: images[index].dim(),
                index,
            }),
            None => Ok(()),
        }
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn get_spacing(record: &SliceRecord) -> Spacing {
        let defaults = Spacing::default();
        let (row, column) = record.pixel_spacing.unwrap_or_else(|| {
            log::debug!("PixelSpacing missing, assuming 1.0 mm");
            (defaults.row, defaults.column)
        });
        let slice_thickness = record.slice_thickness.unwrap_or_else(|| {
            log::debug!("SliceThickness missing, assuming 1.0 mm");
            defaults.slice_thickness
        });
        Spacing {
            row,
            column,
            slice_thickness,
        }
    }
}
