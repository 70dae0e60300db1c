use crate::detection::{Detection, DetectionSet};

pub const DEFAULT_DEDUP_IOU_THRESHOLD: f64 = 0.4;

/// Suppresses boxes that overlap an earlier kept box by more than
/// `iou_threshold`.
///
/// Detections are visited in set order and only compared against those
/// already kept, so the earlier of two duplicates always survives. The
/// result is renumbered from 0, keeping input order.
pub fn deduplicate(detections: &DetectionSet, iou_threshold: f64) -> DetectionSet {
    let mut kept: Vec<&Detection> = Vec::with_capacity(detections.len());

    for detection in detections {
        let duplicate_of = kept
            .iter()
            .find(|other| other.bbox.iou(&detection.bbox) > iou_threshold);

        match duplicate_of {
            Some(other) => log::debug!(
                "dropping detection {} as duplicate of {} (iou {:.3})",
                detection.id,
                other.id,
                other.bbox.iou(&detection.bbox)
            ),
            None => kept.push(detection),
        }
    }

    DetectionSet::renumbered(kept.into_iter().cloned())
}
