use pyo3::{pyclass, pymethods};

use crate::{Detection, python_api::PyBBox};

#[pyclass(name = "Detection")]
pub struct PyDetection {
    pub inner: Detection,
}

#[pymethods]
impl PyDetection {
    #[new]
    #[pyo3(signature = (object_id, bbox, label = None, confidence = None))]
    pub fn new(
        object_id: usize,
        bbox: &PyBBox,
        label: Option<String>,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            inner: Detection {
                label,
                confidence,
                ..Detection::new(object_id, bbox.inner)
            },
        }
    }

    #[getter]
    fn object_id(&self) -> usize {
        self.inner.id
    }

    #[getter]
    fn bbox(&self) -> PyBBox {
        PyBBox {
            inner: self.inner.bbox,
        }
    }

    #[getter]
    fn label(&self) -> Option<String> {
        self.inner.label.clone()
    }

    #[getter]
    fn confidence(&self) -> Option<f64> {
        self.inner.confidence
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(object_id={}, bbox={:?}, label={:?})",
            self.inner.id, self.inner.bbox, self.inner.label
        )
    }
}
