//! Directory tree walker
//!
//! Turns a local directory into a list of upload tasks: one per regular file,
//! plus one zero-byte directory marker per empty directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::key::KeyPrefix;

/// What a single upload task sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Upload the contents of a local file
    File(PathBuf),
    /// Put an empty object whose key ends with `/`
    DirectoryMarker,
}

/// One object to create in the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Destination object key
    pub key: String,
    pub kind: TaskKind,
}

impl UploadTask {
    pub fn file(key: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            kind: TaskKind::File(source.into()),
        }
    }

    pub fn directory_marker(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: TaskKind::DirectoryMarker,
        }
    }

    /// Local file to upload, absent for directory markers
    pub fn source_path(&self) -> Option<&Path> {
        match &self.kind {
            TaskKind::File(path) => Some(path),
            TaskKind::DirectoryMarker => None,
        }
    }

    pub fn is_directory_marker(&self) -> bool {
        matches!(self.kind, TaskKind::DirectoryMarker)
    }
}

/// An entry below the root that could not be turned into a task
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WalkIssue {
    /// Offending path, if known
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Result of walking one directory tree
#[derive(Debug, Clone, Default)]
pub struct UploadPlan {
    pub tasks: Vec<UploadTask>,
    pub issues: Vec<WalkIssue>,
}

impl UploadPlan {
    pub fn file_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_directory_marker()).count()
    }

    pub fn marker_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_directory_marker()).count()
    }
}

/// Walk `root` and build the upload plan for it
///
/// Symbolic links are followed. Siblings are visited in file-name order.
/// Errors on the root itself are returned; errors below it are collected as
/// [`WalkIssue`]s and the walk continues.
pub fn plan_uploads(root: &Path, prefix: &KeyPrefix) -> Result<UploadPlan> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("Source directory {}", root.display()))
        }
        _ => Error::Io(e),
    })?;
    if !metadata.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut plan = UploadPlan::default();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                plan.issues.push(WalkIssue {
                    path: e.path().map(Path::to_path_buf),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            match is_empty_dir(path) {
                Ok(false) => {}
                Ok(true) => match prefix.marker_key(relative) {
                    Ok(Some(key)) => plan.tasks.push(UploadTask::directory_marker(key)),
                    Ok(None) => {
                        tracing::debug!("Root is empty and no prefix set, nothing to mark")
                    }
                    Err(e) => record(&mut plan, path, e),
                },
                // Reported again by the walker when it tries to descend
                Err(e) => tracing::debug!("Cannot list {}: {e}", path.display()),
            }
        } else if file_type.is_file() {
            match prefix.object_key(relative) {
                Ok(key) => plan.tasks.push(UploadTask::file(key, path)),
                Err(e) => record(&mut plan, path, e),
            }
        } else {
            tracing::warn!("Skipping special file {}", path.display());
        }
    }

    tracing::debug!(
        files = plan.file_count(),
        markers = plan.marker_count(),
        issues = plan.issues.len(),
        "Planned upload of {}",
        root.display()
    );

    Ok(plan)
}

fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    Ok(std::fs::read_dir(path)?.next().is_none())
}

fn record(plan: &mut UploadPlan, path: &Path, error: Error) {
    tracing::warn!("Skipping {}: {error}", path.display());
    plan.issues.push(WalkIssue {
        path: Some(path.to_path_buf()),
        message: error.to_string(),
    });
}
