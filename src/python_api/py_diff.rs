use pyo3::{pyclass, pymethods};

use crate::Diff;

/// Plain id lists so python callers can re-key their inventory rows.
#[pyclass(name = "Diff")]
pub struct PyDiff {
    /// `(old_object_id, new_object_id, iou)`
    #[pyo3(get)]
    pub matches: Vec<(usize, usize, f64)>,
    #[pyo3(get)]
    pub added: Vec<usize>,
    #[pyo3(get)]
    pub deleted: Vec<usize>,
}

impl From<Diff> for PyDiff {
    fn from(diff: Diff) -> Self {
        Self {
            matches: diff
                .matches
                .iter()
                .map(|m| (m.old_object_id, m.new_object_id, m.iou))
                .collect(),
            added: diff.added.iter().map(|a| a.new_object_id).collect(),
            deleted: diff.deleted.iter().map(|d| d.old_object_id).collect(),
        }
    }
}

#[pymethods]
impl PyDiff {
    fn __repr__(&self) -> String {
        format!(
            "Diff(matches={}, added={:?}, deleted={:?})",
            self.matches.len(),
            self.added,
            self.deleted
        )
    }
}
