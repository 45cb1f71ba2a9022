//! Attachment storage boundary. Bills only ever see the returned reference.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use budget_eagle_bills::Attachment;

const MEMORY_PREFIX: &str = "memory://attachments/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("file name cannot be empty")]
    EmptyName,

    #[error("no blob stored at {0}")]
    NotFound(String),

    #[error("blob backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Attachment, BlobError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError>;
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Attachment, BlobError> {
        // Keep only the final path segment of whatever the client sent.
        let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim().to_string();
        if file_name.is_empty() {
            return Err(BlobError::EmptyName);
        }
        let url = format!("{MEMORY_PREFIX}{}/{file_name}", Uuid::now_v7());

        self.blobs
            .write()
            .map_err(|_| BlobError::Backend("blob map lock poisoned".to_string()))?
            .insert(url.clone(), bytes);

        Ok(Attachment {
            url,
            name: file_name,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Backend("blob map lock poisoned".to_string()))?;
        blobs.get(url).cloned().ok_or_else(|| BlobError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download() {
        let store = InMemoryBlobStore::new();
        let attachment = store.upload("receipts/taxi.pdf", b"%PDF".to_vec()).await.unwrap();

        assert_eq!(attachment.name, "taxi.pdf");
        assert!(attachment.url.starts_with("memory://attachments/"));
        assert!(attachment.url.ends_with("/taxi.pdf"));
        assert_eq!(store.download(&attachment.url).await.unwrap(), b"%PDF".to_vec());
    }

    #[tokio::test]
    async fn same_name_gets_distinct_urls() {
        let store = InMemoryBlobStore::new();
        let a = store.upload("r.png", vec![1]).await.unwrap();
        let b = store.upload("r.png", vec![2]).await.unwrap();
        assert_ne!(a.url, b.url);
    }

    #[tokio::test]
    async fn rejects_blank_names_and_unknown_urls() {
        let store = InMemoryBlobStore::new();
        assert_eq!(store.upload("  ", vec![]).await, Err(BlobError::EmptyName));
        assert_eq!(store.upload("receipts/", vec![1]).await, Err(BlobError::EmptyName));
        assert_eq!(store.upload("receipts\\ ", vec![1]).await, Err(BlobError::EmptyName));
        assert!(matches!(
            store.download("memory://attachments/nope").await,
            Err(BlobError::NotFound(_))
        ));
    }
}
