//! Upload dispatch
//!
//! Sends every task of an [`UploadPlan`] to an [`ObjectStore`] at once and
//! gathers the outcomes into an [`UploadReport`]. A failed task is logged and
//! recorded; it never stops the others and is not retried.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::error::Error;
use crate::traits::{ObjectInfo, ObjectStore};
use crate::walk::{TaskKind, UploadPlan, UploadTask, WalkIssue};

/// A task that did not make it into the bucket
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub key: String,
    pub directory_marker: bool,
    pub error: String,
}

/// Aggregate outcome of one upload run
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    /// Successfully stored objects, in completion order
    pub uploaded: Vec<ObjectInfo>,
    pub failures: Vec<UploadFailure>,
    pub walk_issues: Vec<WalkIssue>,
    pub started_at: jiff::Timestamp,
    pub finished_at: jiff::Timestamp,
}

impl UploadReport {
    /// True when every task succeeded and the walk saw no problems
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.walk_issues.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.uploaded.iter().filter(|o| !o.is_dir).count()
    }

    pub fn marker_count(&self) -> usize {
        self.uploaded.iter().filter(|o| o.is_dir).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.uploaded.iter().map(|o| o.size_bytes).sum()
    }

    pub fn elapsed(&self) -> jiff::SignedDuration {
        self.finished_at.duration_since(self.started_at)
    }
}

/// Runs upload plans against a store
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload every task in `plan` and wait for all of them to finish
    pub async fn run(&self, plan: UploadPlan) -> UploadReport {
        let started_at = jiff::Timestamp::now();
        let UploadPlan { tasks, issues } = plan;

        tracing::info!("Uploading {} object(s)", tasks.len());

        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| self.dispatch(task))
            .collect();

        let mut uploaded = Vec::new();
        let mut failures = Vec::new();

        while let Some((task, result)) = pending.next().await {
            match result {
                Ok(info) => {
                    if info.is_dir {
                        tracing::info!(key = %info.key, "Directory marker uploaded");
                    } else {
                        tracing::info!(key = %info.key, size = %info.size_human, "File uploaded");
                    }
                    uploaded.push(info);
                }
                Err(e) => {
                    let directory_marker = task.is_directory_marker();
                    if directory_marker {
                        tracing::error!(key = %task.key, "Error uploading directory: {e}");
                    } else {
                        tracing::error!(key = %task.key, "Error uploading file: {e}");
                    }
                    failures.push(UploadFailure {
                        key: task.key,
                        directory_marker,
                        error: e.to_string(),
                    });
                }
            }
        }

        UploadReport {
            uploaded,
            failures,
            walk_issues: issues,
            started_at,
            finished_at: jiff::Timestamp::now(),
        }
    }

    async fn dispatch(&self, task: UploadTask) -> (UploadTask, Result<ObjectInfo, Error>) {
        let result = match &task.kind {
            TaskKind::File(source) => self.store.upload_file(&task.key, source).await,
            TaskKind::DirectoryMarker => self.store.put_empty_object(&task.key).await,
        };
        (task, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockall::predicate::eq;
    use tokio::sync::Barrier;

    use crate::traits::MockObjectStore;

    /// Store whose calls only return once `n` of them are in flight
    struct RendezvousStore {
        barrier: Barrier,
    }

    impl RendezvousStore {
        fn new(n: usize) -> Self {
            Self {
                barrier: Barrier::new(n),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for RendezvousStore {
        async fn upload_file(&self, key: &str, _source: &Path) -> crate::Result<ObjectInfo> {
            self.barrier.wait().await;
            Ok(ObjectInfo::file(key, 1))
        }

        async fn put_empty_object(&self, key: &str) -> crate::Result<ObjectInfo> {
            self.barrier.wait().await;
            Ok(ObjectInfo::dir(key))
        }
    }

    fn plan(tasks: Vec<UploadTask>) -> UploadPlan {
        UploadPlan {
            tasks,
            issues: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_all_tasks_dispatched() {
        let mut store = MockObjectStore::new();
        store
            .expect_upload_file()
            .times(2)
            .returning(|key, _| Ok(ObjectInfo::file(key, 10)));
        store
            .expect_put_empty_object()
            .with(eq("prefix/a/empty/"))
            .times(1)
            .returning(|key| Ok(ObjectInfo::dir(key)));

        let report = Uploader::new(Arc::new(store))
            .run(plan(vec![
                UploadTask::file("prefix/a/b.txt", "/src/a/b.txt"),
                UploadTask::file("prefix/a/c/d.txt", "/src/a/c/d.txt"),
                UploadTask::directory_marker("prefix/a/empty/"),
            ]))
            .await;

        assert!(report.is_success());
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.marker_count(), 1);
        assert_eq!(report.total_bytes(), 20);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let mut store = MockObjectStore::new();
        store
            .expect_upload_file()
            .times(3)
            .returning(|key, source| {
                if source.ends_with("broken.txt") {
                    Err(Error::Network("connection reset".into()))
                } else {
                    Ok(ObjectInfo::file(key, 1))
                }
            });

        let report = Uploader::new(Arc::new(store))
            .run(plan(vec![
                UploadTask::file("a.txt", "/src/a.txt"),
                UploadTask::file("broken.txt", "/src/broken.txt"),
                UploadTask::file("c.txt", "/src/c.txt"),
            ]))
            .await;

        assert!(!report.is_success());
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "broken.txt");
        assert!(!report.failures[0].directory_marker);
        assert!(report.failures[0].error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_marker_failure_recorded() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_empty_object()
            .returning(|_| Err(Error::Auth("AccessDenied".into())));

        let report = Uploader::new(Arc::new(store))
            .run(plan(vec![UploadTask::directory_marker("prefix/")]))
            .await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].directory_marker);
        assert!(report.failures[0].error.starts_with("Authentication failed"));
    }

    #[tokio::test]
    async fn test_walk_issues_fail_the_report() {
        let store = MockObjectStore::new();
        let plan = UploadPlan {
            tasks: Vec::new(),
            issues: vec![WalkIssue {
                path: None,
                message: "permission denied".into(),
            }],
        };

        let report = Uploader::new(Arc::new(store)).run(plan).await;

        assert!(report.uploaded.is_empty());
        assert_eq!(report.walk_issues.len(), 1);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_empty_plan_succeeds() {
        let report = Uploader::new(Arc::new(MockObjectStore::new()))
            .run(UploadPlan::default())
            .await;

        assert!(report.is_success());
        assert_eq!(report.total_bytes(), 0);
    }

    #[tokio::test]
    async fn test_tasks_start_together() {
        let uploader = Uploader::new(Arc::new(RendezvousStore::new(3)));
        let run = uploader.run(plan(vec![
            UploadTask::file("a.txt", "/src/a.txt"),
            UploadTask::file("b.txt", "/src/b.txt"),
            UploadTask::directory_marker("empty/"),
        ]));

        // Each call blocks until the last one has started
        let report = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("uploads were not in flight at the same time");

        assert!(report.is_success());
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.marker_count(), 1);
    }
}
