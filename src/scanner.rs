use crate::volume_loader::VolumeLoaderError;

use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

/// Length of the DICOM file preamble that precedes the magic bytes.
pub const PREAMBLE_LEN: usize = 128;
pub const DICOM_MAGIC: &[u8; 4] = b"DICM";

/// Check whether a file looks like a DICOM file, either by its ".dcm"
/// extension or by the "DICM" marker after the preamble.
pub fn is_dicom_file(path: &Path) -> bool {
    has_dcm_extension(path) || has_dicom_magic(path)
}

fn has_dcm_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

fn has_dicom_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut header = [0u8; PREAMBLE_LEN + 4];
    if file.read_exact(&mut header).is_err() {
        return false;
    }
    &header[PREAMBLE_LEN..] == DICOM_MAGIC
}

/// List the DICOM files of a directory (non-recursive), sorted by path.
///
/// # Errors
///
/// Returns [`VolumeLoaderError::NoInputFiles`] when the directory holds no
/// DICOM file, or an IO error when it cannot be read.
pub fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, VolumeLoaderError> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_dicom_file(path))
        .collect();

    if paths.is_empty() {
        return Err(VolumeLoaderError::NoInputFiles(dir.to_path_buf()));
    }

    paths.sort();
    log::debug!("found {} DICOM files in {}", paths.len(), dir.display());
    Ok(paths)
}
