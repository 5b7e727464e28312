//! Asset sources for backgrounds and static fragments
//!
//! Every fetch goes to the underlying store; nothing is cached between calls
//! and failed fetches are not retried.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Asset not found: {0}")]
    NotFound(String),
}

/// Resolves an asset reference (URL or path) to its bytes
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches assets over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Client whose requests fail after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(reference).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        debug!(reference, bytes = bytes.len(), "Fetched over HTTP");
        Ok(bytes.to_vec())
    }
}

/// Reads assets from files under a root directory
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AssetSource for FileSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.root.join(reference);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Read file asset");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Routes `http://` and `https://` references to HTTP, everything else to files
#[derive(Debug, Clone)]
pub struct AssetStore {
    http: HttpSource,
    files: FileSource,
}

impl AssetStore {
    pub fn new(http: HttpSource, files: FileSource) -> Self {
        Self { http, files }
    }

    fn is_remote(reference: &str) -> bool {
        let lower = reference.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

#[async_trait]
impl AssetSource for AssetStore {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        if Self::is_remote(reference) {
            self.http.fetch(reference).await
        } else {
            self.files.fetch(reference).await
        }
    }
}

/// Assets held in memory, keyed by reference
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(reference.into(), bytes);
    }

    pub fn with(mut self, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(reference, bytes);
        self
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        self.assets
            .get(reference)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_detection() {
        assert!(AssetStore::is_remote("https://cdn.example.com/h1.pdf"));
        assert!(AssetStore::is_remote("HTTP://cdn.example.com/h1.pdf"));
        assert!(!AssetStore::is_remote("pdf/h1.pdf"));
        assert!(!AssetStore::is_remote("/srv/assets/http-docs/h1.pdf"));
    }

    #[tokio::test]
    async fn test_file_source_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pdf")).unwrap();
        std::fs::write(dir.path().join("pdf/h1.pdf"), b"%PDF-1.5").unwrap();

        let source = FileSource::new(dir.path());
        assert_eq!(source.fetch("pdf/h1.pdf").await.unwrap(), b"%PDF-1.5".to_vec());
        assert!(matches!(
            source.fetch("pdf/missing.pdf").await,
            Err(FetchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_asset_store_routes_local_paths_to_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg.png"), b"png").unwrap();

        let store = AssetStore::new(
            HttpSource::new(Duration::from_secs(1)).unwrap(),
            FileSource::new(dir.path()),
        );
        assert_eq!(store.fetch("bg.png").await.unwrap(), b"png".to_vec());
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new().with("a", vec![1, 2, 3]);
        assert_eq!(source.fetch("a").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(source.fetch("b").await, Err(FetchError::NotFound(r)) if r == "b"));
    }
}
