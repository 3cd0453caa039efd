//! Synthetic DICOM series written to temporary directories

#![allow(dead_code)]

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::{tags, uids};
use std::path::{Path, PathBuf};

/// One CT image file with uniform or explicit pixel values.
#[derive(Clone, Debug)]
pub struct TestSlice {
    pub rows: u16,
    pub columns: u16,
    pub frames: Vec<Vec<u16>>,
    pub signed: bool,
    pub instance_number: Option<i32>,
    pub position_z: Option<f32>,
    pub table_position: Option<f32>,
    pub pixel_spacing: Option<(f32, f32)>,
    pub slice_thickness: Option<f32>,
    pub rescale_intercept: Option<f32>,
}

impl TestSlice {
    pub fn filled(rows: u16, columns: u16, value: u16) -> Self {
        Self {
            rows,
            columns,
            frames: vec![vec![value; rows as usize * columns as usize]],
            signed: false,
            instance_number: None,
            position_z: None,
            table_position: None,
            pixel_spacing: None,
            slice_thickness: None,
            rescale_intercept: None,
        }
    }

    pub fn instance_number(mut self, n: i32) -> Self {
        self.instance_number = Some(n);
        self
    }

    pub fn position_z(mut self, z: f32) -> Self {
        self.position_z = Some(z);
        self
    }

    pub fn table_position(mut self, position: f32) -> Self {
        self.table_position = Some(position);
        self
    }

    pub fn spacing(mut self, row: f32, column: f32, thickness: f32) -> Self {
        self.pixel_spacing = Some((row, column));
        self.slice_thickness = Some(thickness);
        self
    }

    pub fn rescale_intercept(mut self, intercept: f32) -> Self {
        self.rescale_intercept = Some(intercept);
        self
    }

    pub fn with_frame(mut self, pixels: Vec<u16>) -> Self {
        self.frames.push(pixels);
        self
    }

    pub fn with_pixels(mut self, pixels: Vec<u16>) -> Self {
        self.frames = vec![pixels];
        self
    }

    pub fn write(&self, path: &Path) {
        let mut obj = InMemDicomObject::new_empty();
        let mut put = |tag, vr, value: PrimitiveValue| {
            obj.put(DataElement::new(tag, vr, value));
        };

        put(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(uids::CT_IMAGE_STORAGE));
        put(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.826.0.1.3680043.2.1"));
        put(tags::MODALITY, VR::CS, PrimitiveValue::from("CT"));
        put(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16));
        put(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        );
        put(tags::ROWS, VR::US, PrimitiveValue::from(self.rows));
        put(tags::COLUMNS, VR::US, PrimitiveValue::from(self.columns));
        put(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16));
        put(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16));
        put(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16));
        put(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            PrimitiveValue::from(u16::from(self.signed)),
        );
        if self.frames.len() > 1 {
            put(
                tags::NUMBER_OF_FRAMES,
                VR::IS,
                PrimitiveValue::from(self.frames.len().to_string()),
            );
        }
        if let Some(n) = self.instance_number {
            put(tags::INSTANCE_NUMBER, VR::IS, PrimitiveValue::from(n.to_string()));
        }
        if let Some(z) = self.position_z {
            put(
                tags::IMAGE_POSITION_PATIENT,
                VR::DS,
                strs(&["0".to_string(), "0".to_string(), z.to_string()]),
            );
        }
        if let Some(position) = self.table_position {
            put(tags::TABLE_POSITION, VR::DS, PrimitiveValue::from(position.to_string()));
        }
        if let Some((row, column)) = self.pixel_spacing {
            put(
                tags::PIXEL_SPACING,
                VR::DS,
                strs(&[row.to_string(), column.to_string()]),
            );
        }
        if let Some(thickness) = self.slice_thickness {
            put(tags::SLICE_THICKNESS, VR::DS, PrimitiveValue::from(thickness.to_string()));
        }
        if let Some(intercept) = self.rescale_intercept {
            put(tags::RESCALE_INTERCEPT, VR::DS, PrimitiveValue::from(intercept.to_string()));
            put(tags::RESCALE_SLOPE, VR::DS, PrimitiveValue::from("1"));
        }
        let pixels: Vec<u16> = self.frames.concat();
        put(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(pixels.into()));

        let file = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1"),
            )
            .expect("valid file meta");
        file.write_to_file(path).expect("should write DICOM file");
    }
}

fn strs(values: &[String]) -> PrimitiveValue {
    PrimitiveValue::Strs(values.iter().cloned().collect())
}

/// Write each slice under its file name and return the directory.
pub fn write_series(slices: &[(&str, TestSlice)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("should create temporary directory");
    for (name, slice) in slices {
        slice.write(&dir.path().join(name));
    }
    dir
}

pub fn path_in(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
