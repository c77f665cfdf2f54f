//! Opaque blob storage for payment slips.
//!
//! The engine only keeps the URL and storage path a [`BlobStore`] hands
//! back; what happens to the bytes is the collaborator's business.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::StoreError;

/// Upload target for payment evidence.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Stores `bytes` under `path` and returns a URL clients can fetch.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
}

/// In-process blob store. URLs are `{base_url}/{path}`.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    base_url: String,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store serving URLs under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns a copy of the blob stored at `path`.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        if path.is_empty() {
            return Err(StoreError::Backend("empty blob path".to_string()));
        }
        self.blobs.write().await.insert(path.to_string(), bytes);
        Ok(format!("{}/{path}", self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_returns_url_under_base() {
        let blobs = MemoryBlobStore::new("https://cdn.example/slips/");
        let url = blobs.upload("a/b.png", vec![1, 2, 3]).await;
        assert_eq!(url.ok().as_deref(), Some("https://cdn.example/slips/a/b.png"));
        assert_eq!(blobs.get("a/b.png").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let blobs = MemoryBlobStore::new("http://x");
        assert!(blobs.upload("", Vec::new()).await.is_err());
    }
}
