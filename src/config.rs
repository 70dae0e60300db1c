use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    archive::DEFAULT_ARCHIVE_NAME,
    associate::{DEFAULT_MATCH_IOU_THRESHOLD, MatchStrategy},
    dedup::DEFAULT_DEDUP_IOU_THRESHOLD,
    error::{Error, Result},
};

pub const CONFIG_ENV: &str = "FRIDGE_DIFF_CONFIG";

const DEFAULT_RESULT_DIR: &str = "result";
const DEFAULT_SCORE_THRESHOLD: f64 = 0.4;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DifferConfigFile {
    result_dir: Option<PathBuf>,
    score_threshold: Option<f64>,
    dedup_iou_threshold: Option<f64>,
    match_iou_threshold: Option<f64>,
    strategy: Option<MatchStrategy>,
    archive_path: Option<PathBuf>,
    upload_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifferConfig {
    /// Where crops and the json protocol files are written.
    pub result_dir: PathBuf,
    /// Minimum detector confidence (exclusive).
    pub score_threshold: f64,
    pub dedup_iou_threshold: f64,
    pub match_iou_threshold: f64,
    pub strategy: MatchStrategy,
    /// Zip of the result directory; `data.zip` next to it when unset.
    pub archive_path: Option<PathBuf>,
    /// Reconciliation endpoint the archive is POSTed to, if any.
    pub upload_url: Option<String>,
}

impl Default for DifferConfig {
    fn default() -> Self {
        Self::from_file(DifferConfigFile::default())
    }
}

impl DifferConfig {
    /// Reads `path`, or the file named by `FRIDGE_DIFF_CONFIG`, then applies
    /// `FRIDGE_DIFF_*` overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => DifferConfigFile::default(),
        };

        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg = Self::from_file(toml::from_str(contents)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DifferConfigFile) -> Self {
        Self {
            result_dir: file
                .result_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULT_DIR)),
            score_threshold: file.score_threshold.unwrap_or(DEFAULT_SCORE_THRESHOLD),
            dedup_iou_threshold: file
                .dedup_iou_threshold
                .unwrap_or(DEFAULT_DEDUP_IOU_THRESHOLD),
            match_iou_threshold: file
                .match_iou_threshold
                .unwrap_or(DEFAULT_MATCH_IOU_THRESHOLD),
            strategy: file.strategy.unwrap_or_default(),
            archive_path: file.archive_path,
            upload_url: file.upload_url,
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        match &self.archive_path {
            Some(path) => path.clone(),
            None => self
                .result_dir
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_ARCHIVE_NAME),
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("FRIDGE_DIFF_RESULT_DIR") {
            self.result_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("FRIDGE_DIFF_SCORE_THRESHOLD") {
            self.score_threshold = parse_threshold("FRIDGE_DIFF_SCORE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("FRIDGE_DIFF_DEDUP_THRESHOLD") {
            self.dedup_iou_threshold = parse_threshold("FRIDGE_DIFF_DEDUP_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("FRIDGE_DIFF_MATCH_THRESHOLD") {
            self.match_iou_threshold = parse_threshold("FRIDGE_DIFF_MATCH_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("FRIDGE_DIFF_STRATEGY") {
            self.strategy = value.parse()?;
        }
        if let Some(path) = lookup("FRIDGE_DIFF_ARCHIVE_PATH") {
            self.archive_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("FRIDGE_DIFF_UPLOAD_URL") {
            self.upload_url = Some(url).filter(|url| !url.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("dedup_iou_threshold", self.dedup_iou_threshold),
            ("match_iou_threshold", self.match_iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.result_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("result_dir must not be empty".into()));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DifferConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(toml::from_str(&raw)?)
}

fn parse_threshold(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{key} is not a number: {value}")))
}
