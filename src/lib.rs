//! # CT viewer library
//!
//! This crate is the core of a viewer for CT and MR series stored as DICOM
//! files. It loads every DICOM file of a directory into an ordered volume and
//! provides what a viewer needs on top of it:
//!  - Browsing the slices of the volume
//!  - Linear intensity windowing into 8-bit grey levels, on the CPU or on the
//!    GPU using WGPU and a compute shader
//!  - A rectangular region of interest (ROI) with its mean, standard
//!    deviation, physical area and histogram
//!
//! Files are recognised by their ".dcm" extension or by the "DICM" marker
//! after the 128 byte preamble, and parsed in parallel using rayon. Slices
//! are ordered by InstanceNumber if every file has one, else by the z
//! coordinate of ImagePositionPatient, else they keep file order. Multi-frame
//! files contribute one slice per frame. Pixel spacing is read from the first
//! slice and defaults to 1 mm.
//!
//! [`ViewerSession`] holds the state an interactive front end works on: the
//! current slice, the window and the selected ROI.
//!
//! # Examples
//!
//! ## Measuring a ROI
//!
//! Load all DICOM files from the dicom/ directory, go to the middle slice and
//! measure a 20x20 pixel square.
//!
//! ```no_run
//! # use ct_viewer::{RoiRect, SortBy, ViewerSession};
//! let mut session = ViewerSession::open("dicom", SortBy::Auto)
//!     .expect("should have loaded files from directory");
//! session
//!     .set_slice(session.slice_count() / 2)
//!     .expect("middle slice exists");
//! let summary = session
//!     .select_roi(RoiRect::new((100, 100), (120, 120)))
//!     .expect("ROI should cover pixels of the slice");
//! println!("{}", summary.stats);
//! session.render().save("result.png").expect("should write image");
//! ```

pub mod cli;
pub mod enums;
pub mod gpu_windowing;
pub mod roi;
pub mod scanner;
pub mod stats;
pub mod viewer;
pub mod volume;
pub mod volume_loader;
pub mod windowing;

pub use enums::{Processor, SortBy};
pub use roi::RoiRect;
pub use stats::{Histogram, RoiStats, StatsCalculator};
pub use viewer::{RoiSummary, ViewerSession};
pub use volume::{Spacing, Volume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use windowing::Window;
