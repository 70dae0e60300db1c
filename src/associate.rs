use std::{fmt, str::FromStr};

use itertools::Itertools;
use pathfinding::prelude::{Matrix, kuhn_munkres_min};
use serde::{Deserialize, Serialize};

use crate::{
    bbox::BBox,
    detection::{Detection, DetectionSet},
    error::Error,
};

pub const DEFAULT_MATCH_IOU_THRESHOLD: f64 = 0.5;

// kuhn_munkres works on integer weights; iou keeps four decimals.
const IOU_MULTIPLIER: f64 = 10000.0;

/// How old and new detections are paired up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Every old detection takes the first still unmatched new detection
    /// above the threshold, scanning in set order. Not globally optimal;
    /// fridge photos barely change between captures so real ambiguity is
    /// rare.
    #[default]
    FirstMatch,
    /// Maximises the summed iou over all pairs (hungarian algorithm).
    Optimal,
}

impl FromStr for MatchStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_match" | "greedy" => Ok(MatchStrategy::FirstMatch),
            "optimal" | "hungarian" => Ok(MatchStrategy::Optimal),
            other => Err(Error::InvalidConfig(format!(
                "unknown match strategy `{other}`"
            ))),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::FirstMatch => f.write_str("first_match"),
            MatchStrategy::Optimal => f.write_str("optimal"),
        }
    }
}

/// The same physical item seen in both captures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub old_object_id: usize,
    pub new_object_id: usize,
    pub iou: f64,
}

/// An item that appeared in the current capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddRecord {
    pub new_object_id: usize,
    pub bounding_box: BBox,
}

/// An item of the previous capture that is no longer visible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteRecord {
    pub old_object_id: usize,
    pub bounding_box: BBox,
}

impl From<&Detection> for AddRecord {
    fn from(detection: &Detection) -> Self {
        Self {
            new_object_id: detection.id,
            bounding_box: detection.bbox,
        }
    }
}

impl From<&Detection> for DeleteRecord {
    fn from(detection: &Detection) -> Self {
        Self {
            old_object_id: detection.id,
            bounding_box: detection.bbox,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff {
    pub matches: Vec<MatchRecord>,
    pub added: Vec<AddRecord>,
    pub deleted: Vec<DeleteRecord>,
}

impl Diff {
    /// Diff used when there is no previous capture: everything is new.
    pub fn all_added(new: &DetectionSet) -> Self {
        Self {
            added: new.iter().map(AddRecord::from).collect(),
            ..Self::default()
        }
    }
}

/// Compares the previous capture against the current one.
///
/// Each detection takes part in at most one match. Matches and deletions
/// follow the order of `old`, additions the order of `new`.
pub fn diff(
    old: &DetectionSet,
    new: &DetectionSet,
    iou_threshold: f64,
    strategy: MatchStrategy,
) -> Diff {
    let pairs = match strategy {
        MatchStrategy::FirstMatch => first_match(old.as_slice(), new.as_slice(), iou_threshold),
        MatchStrategy::Optimal => optimal_match(old.as_slice(), new.as_slice(), iou_threshold),
    };

    let mut old_matched = vec![false; old.len()];
    let mut new_matched = vec![false; new.len()];
    let mut matches = Vec::with_capacity(pairs.len());

    for (i, j, iou) in pairs {
        old_matched[i] = true;
        new_matched[j] = true;
        let (old_detection, new_detection) = (&old.as_slice()[i], &new.as_slice()[j]);
        log::debug!(
            "matched old {} -> new {} (iou {:.3})",
            old_detection.id,
            new_detection.id,
            iou
        );
        matches.push(MatchRecord {
            old_object_id: old_detection.id,
            new_object_id: new_detection.id,
            iou,
        });
    }

    let deleted = old
        .iter()
        .zip(old_matched)
        .filter(|(_, matched)| !matched)
        .map(|(detection, _)| DeleteRecord::from(detection))
        .collect();
    let added = new
        .iter()
        .zip(new_matched)
        .filter(|(_, matched)| !matched)
        .map(|(detection, _)| AddRecord::from(detection))
        .collect();

    Diff {
        matches,
        added,
        deleted,
    }
}

/// Returns `(old index, new index, iou)` triples in old order.
fn first_match(old: &[Detection], new: &[Detection], iou_threshold: f64) -> Vec<(usize, usize, f64)> {
    let mut taken = vec![false; new.len()];
    let mut pairs = Vec::new();

    for (i, old_detection) in old.iter().enumerate() {
        let found = new
            .iter()
            .enumerate()
            .filter(|(j, _)| !taken[*j])
            .map(|(j, new_detection)| (j, old_detection.bbox.iou(&new_detection.bbox)))
            .find(|&(_, iou)| iou > iou_threshold);

        if let Some((j, iou)) = found {
            taken[j] = true;
            pairs.push((i, j, iou));
        }
    }

    pairs
}

fn optimal_match(old: &[Detection], new: &[Detection], iou_threshold: f64) -> Vec<(usize, usize, f64)> {
    if old.is_empty() || new.is_empty() {
        return Vec::new();
    }

    let cost_matrix = calc_iou_cost_matrix(old, new);
    let transpose = cost_matrix.rows > cost_matrix.columns;
    let transposed;
    let weights = if transpose {
        transposed = cost_matrix.transposed();
        &transposed
    } else {
        &cost_matrix
    };
    let assignment_vector = kuhn_munkres_min(weights).1;

    let mut pairs: Vec<(usize, usize, f64)> = assignment_vector
        .iter()
        .enumerate()
        .map(|(row, &column)| if transpose { (column, row) } else { (row, column) })
        .map(|(i, j)| (i, j, old[i].bbox.iou(&new[j].bbox)))
        .filter(|&(_, _, iou)| iou > iou_threshold)
        .collect();
    pairs.sort_by_key(|&(i, _, _)| i);

    pairs
}

fn calc_iou_cost_matrix(old: &[Detection], new: &[Detection]) -> Matrix<i64> {
    let mut matrix = Matrix::new(old.len(), new.len(), 0);

    for ((i, old_detection), (j, new_detection)) in old
        .iter()
        .enumerate()
        .cartesian_product(new.iter().enumerate())
    {
        matrix[(i, j)] = -(old_detection.bbox.iou(&new_detection.bbox) * IOU_MULTIPLIER) as i64;
    }

    matrix
}
