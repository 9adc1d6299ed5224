use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::path::PathBuf;

/// Pulls a generated image fully into memory.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Where a fetched image ends up once the user asks to keep it.
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Persist `bytes` under `file_name` and return where they went.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Plain GET, no auth header: image urls are public file routes.
#[derive(Clone, Default)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GenerationError::Download(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Download(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| GenerationError::Download(format!("Reading {} failed: {}", url, e)))
    }
}

#[derive(Debug, Clone)]
pub struct FsSaveTarget {
    dir: PathBuf,
}

impl FsSaveTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveTarget for FsSaveTarget {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_target_writes_file() {
        let dir = std::env::temp_dir().join(format!("janusgen-test-{}", uuid::Uuid::new_v4()));
        let target = FsSaveTarget::new(&dir);

        let path = target
            .save("generated-image-2.webp", b"RIFF....WEBP")
            .await
            .unwrap();

        assert_eq!(path, dir.join("generated-image-2.webp"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"RIFF....WEBP");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_url_is_download_error() {
        let fetcher = HttpImageFetcher::new();
        let result = fetcher.fetch("http://127.0.0.1:9/file=/tmp/1.webp").await;
        assert!(matches!(result, Err(GenerationError::Download(_))));
    }
}
