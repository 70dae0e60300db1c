//! Tracks what changed inside a fridge between two photos.
//!
//! Each capture yields a set of detected boxes. Overlapping duplicates are
//! suppressed, then the set is compared against the previous capture and
//! split into matched, added and deleted items, written as json files for
//! the inventory service. The result directory is then zipped and,
//! optionally, uploaded.

mod archive;
mod associate;
mod bbox;
mod config;
mod crop;
mod dedup;
mod detection;
mod detector;
mod error;
mod pipeline;
#[cfg(feature = "python")]
mod python_api;
mod store;
mod upload;

pub use archive::{DEFAULT_ARCHIVE_NAME, write_archive};
pub use associate::{
    AddRecord, DEFAULT_MATCH_IOU_THRESHOLD, DeleteRecord, Diff, MatchRecord, MatchStrategy, diff,
};
pub use bbox::BBox;
pub use config::{CONFIG_ENV, DifferConfig};
pub use crop::{crop_file_name, write_crops};
pub use dedup::{DEFAULT_DEDUP_IOU_THRESHOLD, deduplicate};
pub use detection::{Detection, DetectionSet, RawDetection};
pub use detector::{Detector, JsonFileDetector};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use store::{
    ADD_FILE, DELETE_FILE, MATCH_FILE, NEW_FILE, OLD_CROP_DIR, OLD_FILE, ResultStore, read_json,
    write_diff_to, write_json,
};
#[cfg(feature = "upload")]
pub use upload::HttpUploader;
pub use upload::Uploader;

#[cfg(feature = "python")]
use pyo3::{
    Bound, PyResult, pymodule,
    types::{PyModule, PyModuleMethods},
    wrap_pyfunction,
};

#[cfg(feature = "python")]
#[pymodule]
fn fridge_diff(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use crate::python_api::{PyBBox, PyDetection, PyDiff};

    m.add_class::<PyBBox>()?;
    m.add_class::<PyDetection>()?;
    m.add_class::<PyDiff>()?;
    m.add_function(wrap_pyfunction!(python_api::iou, m)?)?;
    m.add_function(wrap_pyfunction!(python_api::deduplicate, m)?)?;
    m.add_function(wrap_pyfunction!(python_api::diff, m)?)?;

    Ok(())
}
