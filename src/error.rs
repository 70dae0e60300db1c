use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while detecting, matching or persisting object sets.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid bounding box [{x_1}, {y_1}, {x_2}, {y_2}]: {reason}")]
    InvalidBBox {
        x_1: f64,
        y_1: f64,
        x_2: f64,
        y_2: f64,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("detector {name} failed: {message}")]
    Detector { name: &'static str, message: String },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("upload to {url} failed: {message}")]
    Upload { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
