mod py_bbox;
mod py_detection;
mod py_diff;

pub use py_bbox::PyBBox;
pub use py_detection::PyDetection;
pub use py_diff::PyDiff;

use pyo3::{PyErr, PyRef, PyResult, exceptions::PyValueError, pyfunction};

use crate::{
    DEFAULT_DEDUP_IOU_THRESHOLD, DEFAULT_MATCH_IOU_THRESHOLD, DetectionSet, Error, MatchStrategy,
};

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn to_detection_set(detections: &[PyRef<PyDetection>]) -> DetectionSet {
    DetectionSet::from(
        detections
            .iter()
            .map(|detection| detection.inner.clone())
            .collect::<Vec<_>>(),
    )
}

#[pyfunction]
pub fn iou(bbox_1: &PyBBox, bbox_2: &PyBBox) -> f64 {
    bbox_1.inner.iou(&bbox_2.inner)
}

#[pyfunction]
#[pyo3(signature = (detections, iou_threshold = DEFAULT_DEDUP_IOU_THRESHOLD))]
pub fn deduplicate(detections: Vec<PyRef<PyDetection>>, iou_threshold: f64) -> Vec<PyDetection> {
    crate::deduplicate(&to_detection_set(&detections), iou_threshold)
        .iter()
        .map(|detection| PyDetection {
            inner: detection.clone(),
        })
        .collect()
}

#[pyfunction]
#[pyo3(signature = (old, new, iou_threshold = DEFAULT_MATCH_IOU_THRESHOLD, strategy = "first_match"))]
pub fn diff(
    old: Vec<PyRef<PyDetection>>,
    new: Vec<PyRef<PyDetection>>,
    iou_threshold: f64,
    strategy: &str,
) -> PyResult<PyDiff> {
    let strategy = strategy.parse::<MatchStrategy>()?;
    let changes = crate::diff(
        &to_detection_set(&old),
        &to_detection_set(&new),
        iou_threshold,
        strategy,
    );

    Ok(PyDiff::from(changes))
}
