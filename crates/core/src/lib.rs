//! cosup-core: Core library for the cosup directory uploader
//!
//! This crate provides the core functionality for cosup, including:
//! - Configuration loading and resolution
//! - Object key construction
//! - Directory tree walking into upload tasks
//! - ObjectStore trait and the upload dispatcher
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing for easy testing and potential future support for other backends.

pub mod config;
pub mod error;
pub mod key;
pub mod traits;
pub mod uploader;
pub mod walk;

pub use config::{Config, ConfigManager, ConfigOverrides, StoreConfig, UploadConfig};
pub use error::{Error, Result};
pub use key::KeyPrefix;
pub use traits::{ObjectInfo, ObjectStore};
pub use uploader::{UploadFailure, UploadReport, Uploader};
pub use walk::{plan_uploads, TaskKind, UploadPlan, UploadTask, WalkIssue};
