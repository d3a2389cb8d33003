use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

mod local;
mod s3;

pub use local::LocalFileStore;
pub use s3::S3FileStore;

/// Uploads above this size are rejected before any bytes hit the store.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("S3 error: {0}")]
    S3(String),
}

/// Backend-agnostic object store. Keys are relative, slash-separated paths
/// produced by [`object_key`], identical across backends so the database
/// rows stay portable between them.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores the object and returns a URL the client can fetch it from.
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// `uploads/{category}/{parent}/{uuid}{ext}` where ext carries over from the
/// original filename.
pub fn object_key(category: &str, parent_id: Uuid, original_name: &str) -> String {
    let ext = std::path::Path::new(original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("uploads/{category}/{parent_id}/{}{ext}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_keeps_extension() {
        let parent = Uuid::new_v4();
        let key = object_key("task", parent, "report.final.pdf");
        assert!(key.starts_with(&format!("uploads/task/{parent}/")));
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn object_key_tolerates_missing_extension() {
        let key = object_key("project", Uuid::new_v4(), "Makefile");
        assert!(!key.ends_with('.'));
    }
}
