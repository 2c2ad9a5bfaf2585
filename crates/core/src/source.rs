use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::{error::AcquisitionError, files::non_empty_len};

/// Video acquisition collaborator.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch `url` into a single merged container at `output`.
    async fn fetch(&self, url: &str, output: &Path) -> Result<PathBuf, AcquisitionError>;
}

/// [`VideoSource`] backed by `yt-dlp`.
pub struct YtDlp {
    binary: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl VideoSource for YtDlp {
    async fn fetch(&self, url: &str, output: &Path) -> Result<PathBuf, AcquisitionError> {
        let result = Command::new(&self.binary)
            .arg(url)
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("--no-playlist")
            .arg("-o")
            .arg(output)
            .output()
            .await?;

        if !result.status.success() {
            return Err(AcquisitionError::DownloadFailed {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        verify_download(output).await
    }
}

/// Confirm the downloaded file exists and has content.
pub async fn verify_download(path: &Path) -> Result<PathBuf, AcquisitionError> {
    match non_empty_len(path).await {
        Some(bytes) => {
            info!(path = %path.display(), bytes, "Source video ready");
            Ok(path.to_path_buf())
        }
        None => Err(AcquisitionError::MissingOutput {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_download_is_an_acquisition_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("video.mp4");
        std::fs::write(&path, b"").unwrap();

        let err = verify_download(&path).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::MissingOutput { .. }));

        std::fs::write(&path, b"data").unwrap();
        assert_eq!(verify_download(&path).await.unwrap(), path);
    }

    #[tokio::test]
    async fn missing_binary_fails_to_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let source = YtDlp::new(tmp.path().join("no-such-yt-dlp"));
        let err = source
            .fetch("https://example.com/v", &tmp.path().join("video.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::IoError(_)));
    }
}
