use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis aligned box in pixel coordinates, `(x_1, y_1)` top left and
/// `(x_2, y_2)` bottom right. On the wire it is `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x_1: f64,
    pub y_1: f64,
    pub x_2: f64,
    pub y_2: f64,
}

impl BBox {
    /// Builds a box, collapsing malformed input to the zero box so it can
    /// never overlap anything.
    pub fn new(x_1: f64, y_1: f64, x_2: f64, y_2: f64) -> Self {
        Self::try_new(x_1, y_1, x_2, y_2).unwrap_or_default()
    }

    pub fn try_new(x_1: f64, y_1: f64, x_2: f64, y_2: f64) -> Result<Self> {
        let invalid = |reason| Error::InvalidBBox {
            x_1,
            y_1,
            x_2,
            y_2,
            reason,
        };

        if ![x_1, y_1, x_2, y_2].iter().all(|c| c.is_finite()) {
            return Err(invalid("coordinates must be finite"));
        }
        if x_1 > x_2 || y_1 > y_2 {
            return Err(invalid("corners are inverted"));
        }

        Ok(BBox { x_1, y_1, x_2, y_2 })
    }

    /// Drops the fractional part of every coordinate.
    pub fn truncated(&self) -> Self {
        BBox {
            x_1: self.x_1.trunc(),
            y_1: self.y_1.trunc(),
            x_2: self.x_2.trunc(),
            y_2: self.y_2.trunc(),
        }
    }

    pub fn width(&self) -> f64 {
        (self.x_2 - self.x_1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y_2 - self.y_1).max(0.0)
    }

    pub fn iou(&self, other: &Self) -> f64 {
        let iwidth = (self.x_2.min(other.x_2) - self.x_1.max(other.x_1)).max(0.0);
        let iheight = (self.y_2.min(other.y_2) - self.y_1.max(other.y_1)).max(0.0);
        let iarea = iwidth * iheight;

        let union = self.area() + other.area() - iarea;

        if union <= 0.0 {
            return 0.0;
        }

        iarea / union
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

impl TryFrom<[f64; 4]> for BBox {
    type Error = Error;

    fn try_from(value: [f64; 4]) -> Result<Self> {
        let [x_1, y_1, x_2, y_2] = value;
        BBox::try_new(x_1, y_1, x_2, y_2)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        [bbox.x_1, bbox.y_1, bbox.x_2, bbox.y_2]
    }
}
