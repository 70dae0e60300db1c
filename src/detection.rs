use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bbox::BBox;

/// One box as reported by the detector, before any filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bounding_box: BBox,
    pub confidence: f64,
    #[serde(default)]
    pub label: String,
}

/// A detection inside one frame's set. Ids are only meaningful within the
/// set that issued them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "object_id")]
    pub id: usize,
    #[serde(rename = "bounding_box")]
    pub bbox: BBox,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Detection {
    pub fn new(id: usize, bbox: BBox) -> Self {
        Self {
            id,
            bbox,
            image_path: None,
            label: None,
            confidence: None,
        }
    }
}

/// Ordered detections of a single frame, ids `0..len` in detector order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    /// Keeps detections scoring above `score_threshold`, snaps their boxes to
    /// whole pixels and numbers them in detector order.
    pub fn from_raw(raw: impl IntoIterator<Item = RawDetection>, score_threshold: f64) -> Self {
        Self::renumbered(
            raw.into_iter()
                .filter(|detection| detection.confidence > score_threshold)
                .map(|detection| Detection {
                    id: 0,
                    bbox: detection.bounding_box.truncated(),
                    image_path: None,
                    label: Some(detection.label).filter(|label| !label.is_empty()),
                    confidence: Some(detection.confidence),
                }),
        )
    }

    /// Re-issues sequential ids. Crop references are keyed by id, so they
    /// are cleared.
    pub fn renumbered(detections: impl IntoIterator<Item = Detection>) -> Self {
        let detections = detections
            .into_iter()
            .enumerate()
            .map(|(id, detection)| Detection {
                id,
                image_path: None,
                ..detection
            })
            .collect();

        Self { detections }
    }

    pub fn from_bboxes(bboxes: impl IntoIterator<Item = BBox>) -> Self {
        Self::renumbered(bboxes.into_iter().map(|bbox| Detection::new(0, bbox)))
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Detection> {
        self.detections.iter_mut()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }
}

impl From<Vec<Detection>> for DetectionSet {
    /// Wraps detections as they are, ids included.
    fn from(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
