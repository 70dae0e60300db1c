use std::path::Path;

use crate::error::Result;

/// Ships a packed result archive to the inventory reconciliation endpoint.
///
/// A failed upload is logged by the pipeline and not retried; retry policy
/// belongs to the transport.
pub trait Uploader {
    fn name(&self) -> &'static str;

    fn upload(&self, archive_path: &Path) -> Result<()>;
}

/// POSTs the archive as `application/zip`.
#[cfg(feature = "upload")]
#[derive(Debug, Clone)]
pub struct HttpUploader {
    url: String,
}

#[cfg(feature = "upload")]
impl HttpUploader {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[cfg(feature = "upload")]
impl Uploader for HttpUploader {
    fn name(&self) -> &'static str {
        "http"
    }

    fn upload(&self, archive_path: &Path) -> Result<()> {
        use crate::error::Error;

        let body = std::fs::read(archive_path).map_err(|e| Error::io(archive_path, e))?;
        let response = ureq::post(&self.url)
            .set("Content-Type", "application/zip")
            .send_bytes(&body)
            .map_err(|e| Error::Upload {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        log::info!(
            "uploaded {} ({} bytes) to {}: {}",
            archive_path.display(),
            body.len(),
            self.url,
            response.status()
        );
        Ok(())
    }
}

#[cfg(all(test, feature = "upload"))]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_unreachable_endpoint_is_an_upload_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("data.zip");
        std::fs::write(&archive, b"PK").unwrap();

        // port 9 (discard) on loopback is closed in test environments
        let err = HttpUploader::new("http://127.0.0.1:9/upload/zip")
            .upload(&archive)
            .unwrap_err();

        assert!(matches!(err, Error::Upload { .. }));
    }
}
