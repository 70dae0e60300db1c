use std::{
    path::Path,
    sync::{Mutex, PoisonError},
};

use image::DynamicImage;
use serde::Serialize;

use crate::{
    archive::write_archive,
    associate::{Diff, diff},
    config::DifferConfig,
    crop::write_crops,
    dedup::deduplicate,
    detection::{DetectionSet, RawDetection},
    detector::Detector,
    error::Result,
    store::ResultStore,
    upload::Uploader,
};

/// Counts reported after one capture has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub detected: usize,
    pub kept: usize,
    pub matched: usize,
    pub added: usize,
    pub deleted: usize,
    /// No previous capture existed, so everything was reported as added.
    pub first_run: bool,
    /// Files packed into the result archive.
    pub archived: usize,
    /// `None` when no uploader is configured.
    pub uploaded: Option<bool>,
}

/// Runs detect, dedup, rotate, crop, diff, pack and upload for one capture
/// at a time.
///
/// Runs are serialized by a mutex inside the process and by an advisory
/// lock on `json/.lock` across processes sharing the result directory.
pub struct Pipeline {
    config: DifferConfig,
    store: ResultStore,
    uploader: Option<Box<dyn Uploader + Send + Sync>>,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: DifferConfig) -> Result<Self> {
        config.validate()?;
        let store = ResultStore::open(&config.result_dir)?;

        Ok(Self {
            config,
            store,
            uploader: None,
            run_lock: Mutex::new(()),
        })
    }

    pub fn with_uploader(mut self, uploader: Box<dyn Uploader + Send + Sync>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn config(&self) -> &DifferConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Processes the image at `image_path` with `detector`.
    ///
    /// Detector and decode failures are returned before anything on disk
    /// changes, so the previous generation stays intact.
    pub fn process(&self, image_path: &Path, detector: &mut dyn Detector) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        log::info!(
            "running detector {} on {}",
            detector.name(),
            image_path.display()
        );
        let raw = detector.detect(image_path)?;
        let image = image::open(image_path)?;

        self.run_locked(&image, raw)
    }

    /// Same as [`Pipeline::process`] for an image already in memory.
    pub fn process_detections(
        &self,
        image: &DynamicImage,
        raw: Vec<RawDetection>,
    ) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_locked(image, raw)
    }

    fn run_locked(&self, image: &DynamicImage, raw: Vec<RawDetection>) -> Result<RunSummary> {
        let _dir_lock = self.store.lock()?;
        let detected = raw.len();
        let candidates = DetectionSet::from_raw(raw, self.config.score_threshold);
        let mut current = deduplicate(&candidates, self.config.dedup_iou_threshold);

        let has_previous = self.store.rotate()?;
        write_crops(image, &mut current, self.store.root())?;
        self.store.write_current(&current)?;

        let previous = if has_previous {
            self.store.load_previous()?
        } else {
            None
        };
        let changes = match &previous {
            Some(previous) => diff(
                previous,
                &current,
                self.config.match_iou_threshold,
                self.config.strategy,
            ),
            None => Diff::all_added(&current),
        };
        self.store.write_diff(&changes)?;

        let archive_path = self.config.archive_path();
        let archived = write_archive(self.store.root(), &archive_path)?;
        let uploaded = self.uploader.as_ref().map(|uploader| {
            match uploader.upload(&archive_path) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("{} upload failed, not retried: {}", uploader.name(), err);
                    false
                }
            }
        });

        let summary = RunSummary {
            detected,
            kept: current.len(),
            matched: changes.matches.len(),
            added: changes.added.len(),
            deleted: changes.deleted.len(),
            first_run: previous.is_none(),
            archived,
            uploaded,
        };
        log::info!(
            "{} detections, {} kept after dedup: {} matched, {} added, {} deleted",
            summary.detected,
            summary.kept,
            summary.matched,
            summary.added,
            summary.deleted
        );

        Ok(summary)
    }
}
