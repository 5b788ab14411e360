//! ObjectStore trait definition
//!
//! This trait defines the two storage operations the uploader needs.
//! It allows the uploader to be decoupled from the specific S3 SDK implementation.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for an uploaded object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Human-readable size
    pub size_human: String,

    /// ETag returned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type sent with the object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this is a directory marker
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: humansize::format_size(size, humansize::BINARY),
            etag: None,
            content_type: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a zero-byte directory marker
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: 0,
            size_human: humansize::format_size(0u64, humansize::BINARY),
            etag: None,
            content_type: None,
            is_dir: true,
        }
    }
}

/// Trait for the storage operations used by the uploader
///
/// Bucket and region are bound when the store is constructed.
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `source` under `key`
    async fn upload_file(&self, key: &str, source: &Path) -> Result<ObjectInfo>;

    /// Store an empty object under `key`
    async fn put_empty_object(&self, key: &str) -> Result<ObjectInfo>;
}
