//! Fetching segment files from the distribution source.
//!
//! A transfer writes to `<local>.partial` and renames on success, so a
//! half-written file is never mistaken for a complete one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Transfer failures. The pipeline skips the band and carries on.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Source file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Moves one remote file to a local path.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetch `remote` into `local`, returning the number of bytes written.
    async fn fetch(&self, remote: &str, local: &Path) -> Result<u64, TransferError>;
}

fn partial_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Move a written `.partial` into place. On any failure the partial file is
/// removed so it never lingers in the hour bucket.
async fn commit_partial(
    partial: &Path,
    local: &Path,
    written: std::io::Result<u64>,
) -> Result<u64, TransferError> {
    let result = match written {
        Ok(bytes) => fs::rename(partial, local).await.map(|()| bytes),
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = fs::remove_file(partial).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
            }
        }
    }
    Ok(result?)
}

/// Plain HTTP(S) GET, single attempt. Retries are the next tick's job.
pub struct HttpTransfer {
    client: Client,
    base_url: String,
}

impl HttpTransfer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn url_for(&self, remote: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            remote.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    #[instrument(skip(self, local), fields(remote = %remote))]
    async fn fetch(&self, remote: &str, local: &Path) -> Result<u64, TransferError> {
        let url = self.url_for(remote);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransferError::NotFound(url));
        }
        if !status.is_success() {
            return Err(TransferError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: Bytes = response.bytes().await?;
        let partial = partial_path(local);
        let written = fs::write(&partial, &body).await.map(|()| body.len() as u64);
        let bytes = commit_partial(&partial, local, written).await?;

        debug!(url = %url, bytes, "Fetched");
        Ok(bytes)
    }
}

/// Copies from a local mirror laid out like the remote tree.
///
/// Used for replaying archived data and in tests.
pub struct MirrorTransfer {
    root: PathBuf,
}

impl MirrorTransfer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Transfer for MirrorTransfer {
    async fn fetch(&self, remote: &str, local: &Path) -> Result<u64, TransferError> {
        let source = self.root.join(remote.trim_start_matches('/'));
        if !fs::try_exists(&source).await? {
            return Err(TransferError::NotFound(source.display().to_string()));
        }
        let partial = partial_path(local);
        let written = fs::copy(&source, &partial).await;
        commit_partial(&partial, local, written).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mirror_copies_file() {
        let mirror = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let remote = "jma/hsd/202401/05/23/HS_H08_20240105_2350_B13_R301_R20_S0101.DAT.bz2";
        let source = mirror.path().join(remote);
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, b"BZh9 payload").unwrap();

        let local = target.path().join("50_B13.bz2");
        let transfer = MirrorTransfer::new(mirror.path());
        let bytes = transfer.fetch(remote, &local).await.unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&local).unwrap(), b"BZh9 payload");
        assert!(!partial_path(&local).exists());
    }

    #[tokio::test]
    async fn test_mirror_missing_file() {
        let mirror = tempfile::tempdir().unwrap();
        let transfer = MirrorTransfer::new(mirror.path());
        let result = transfer
            .fetch("nope.bz2", &mirror.path().join("out.bz2"))
            .await;
        assert!(matches!(result, Err(TransferError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_partial() {
        let mirror = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        std::fs::write(mirror.path().join("seg.bz2"), b"BZh9 payload").unwrap();

        // A non-empty directory where the file should land makes the rename fail.
        let local = target.path().join("50_B13.bz2");
        std::fs::create_dir_all(local.join("occupied")).unwrap();

        let transfer = MirrorTransfer::new(mirror.path());
        let result = transfer.fetch("seg.bz2", &local).await;
        assert!(matches!(result, Err(TransferError::Io(_))));
        assert!(!partial_path(&local).exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_behind() {
        let mirror = tempfile::tempdir().unwrap();
        std::fs::write(mirror.path().join("seg.bz2"), b"BZh9 payload").unwrap();
        let missing_bucket = mirror.path().join("no-such-bucket").join("50_B13.bz2");

        let transfer = MirrorTransfer::new(mirror.path());
        let result = transfer.fetch("seg.bz2", &missing_bucket).await;
        assert!(matches!(result, Err(TransferError::Io(_))));
        assert!(!partial_path(&missing_bucket).exists());
    }

    #[test]
    fn test_http_url_join() {
        let transfer = HttpTransfer::new("https://hsd.example.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            transfer.url_for("jma/hsd/202401/x.bz2"),
            "https://hsd.example.org/jma/hsd/202401/x.bz2"
        );
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/sate/2024010523/50_B13.bz2")),
            PathBuf::from("/tmp/sate/2024010523/50_B13.bz2.partial")
        );
    }
}
