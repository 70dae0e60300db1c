use std::path::{Path, PathBuf};

use crate::{
    detection::RawDetection,
    error::{Error, Result},
    store::read_json,
};

/// Source of raw boxes for one captured image.
///
/// Any zero shot or closed set model fits as long as it reports box,
/// confidence and label. Failures are returned to the caller untouched.
pub trait Detector {
    fn name(&self) -> &'static str;

    fn detect(&mut self, image_path: &Path) -> Result<Vec<RawDetection>>;
}

/// Replays detector output that was produced out of process and saved as a
/// json array of `{bounding_box, confidence, label}`.
#[derive(Debug, Clone)]
pub struct JsonFileDetector {
    path: PathBuf,
}

impl JsonFileDetector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Detector for JsonFileDetector {
    fn name(&self) -> &'static str {
        "json-file"
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<RawDetection>> {
        if !self.path.exists() {
            return Err(Error::Detector {
                name: self.name(),
                message: format!(
                    "no detections recorded at {} for {}",
                    self.path.display(),
                    image_path.display()
                ),
            });
        }
        read_json(&self.path)
    }
}
