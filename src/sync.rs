//! Deletion of selected copies and reconciliation with the server.
//!
//! # Overview
//!
//! [`DeleteSynchronizer`] turns a cluster's current selection into a
//! batch of independent delete requests. The batch is a snapshot: the
//! selected files and their delete targets are copied out under the
//! cluster lock before anything asynchronous starts, so selection
//! changes made while requests are in flight affect only the next
//! batch, never this one.
//!
//! Requests within a batch fire concurrently and do not gate each
//! other. Each response is reconciled on its own:
//!
//! * success, file still present: the file leaves the cluster;
//! * success, file already gone: a `warning` notification (anomaly,
//!   not a failure);
//! * failure: a `danger` notification; the file stays in the cluster
//!   and stays selected so it can be retried.
//!
//! A cluster left without duplicates is not removed here; callers
//! decide that from the observed state.

use std::error::Error as _;
use std::fmt;
use std::sync::Arc;

use futures_util::future;
use thiserror::Error;

use crate::hal::{ActionError, RemoteActions};
use crate::model::{FileCopy, FileId, SharedCluster};
use crate::notify::{NotificationKind, Notifications};
use crate::transport::{Transport, TransportError};

/// Error for a single file within a delete batch.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The file carried neither a `self` link nor an `abspath` to
    /// address a delete at.
    #[error("{path} has no deletable address")]
    Unaddressable {
        /// Display path of the file.
        path: String,
    },
    /// The `self`-bound delete could not be issued or failed.
    #[error("Failed to delete {path}")]
    Action {
        /// Display path of the file.
        path: String,
        #[source]
        source: ActionError,
    },
    /// The path-addressed delete failed.
    #[error("Failed to delete {path}")]
    Request {
        /// Display path of the file.
        path: String,
        #[source]
        source: TransportError,
    },
}

impl DeleteError {
    /// Display path of the file the error is about.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Unaddressable { path }
            | Self::Action { path, .. }
            | Self::Request { path, .. } => path,
        }
    }
}

/// Tally of one or more delete batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Files confirmed deleted and removed from their cluster.
    pub deleted: usize,
    /// Files whose delete request failed; still present and selected.
    pub failed: usize,
    /// Files the server deleted that were already gone locally.
    pub missing: usize,
}

impl DeleteOutcome {
    /// Number of files the batch attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.deleted + self.failed + self.missing
    }

    /// Whether no per-file request failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: Self) {
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.missing += other.missing;
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} deleted, {} failed, {} already gone",
            self.deleted, self.failed, self.missing
        )
    }
}

/// How a snapshotted file will be addressed for deletion.
enum DeleteRequest {
    /// Through the file's own `self` link.
    Action(RemoteActions),
    /// Through the path-derived fallback endpoint.
    Path(String),
}

/// One file captured from the selection at batch start.
struct PendingDelete {
    id: FileId,
    path: String,
    request: Option<DeleteRequest>,
}

impl PendingDelete {
    fn snapshot(file: &FileCopy, transport: &Arc<dyn Transport>) -> Self {
        let request = match file.resource().actions(transport) {
            Some(actions) => Some(DeleteRequest::Action(actions)),
            None => file
                .abspath()
                .map(|path| DeleteRequest::Path(format!("/files/{path}"))),
        };
        Self {
            id: file.id(),
            path: file.display_path().to_string(),
            request,
        }
    }

    async fn issue(&self, transport: &Arc<dyn Transport>) -> Result<(), DeleteError> {
        match &self.request {
            None => Err(DeleteError::Unaddressable {
                path: self.path.clone(),
            }),
            Some(DeleteRequest::Action(actions)) => actions
                .delete()
                .await
                .map(drop)
                .map_err(|source| DeleteError::Action {
                    path: self.path.clone(),
                    source,
                }),
            Some(DeleteRequest::Path(target)) => transport
                .delete(target)
                .await
                .map(drop)
                .map_err(|source| DeleteError::Request {
                    path: self.path.clone(),
                    source,
                }),
        }
    }
}

/// Executes delete batches against the server and keeps the local
/// cluster state consistent with the responses.
#[derive(Clone)]
pub struct DeleteSynchronizer {
    transport: Arc<dyn Transport>,
    notifications: Notifications,
}

impl fmt::Debug for DeleteSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteSynchronizer").finish_non_exhaustive()
    }
}

impl DeleteSynchronizer {
    /// Create a synchronizer reporting through `notifications`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, notifications: Notifications) -> Self {
        Self {
            transport,
            notifications,
        }
    }

    /// Delete every currently-selected file in `cluster`.
    ///
    /// Tolerates an empty selection (immediate no-op). Per-file
    /// failures never abort the rest of the batch; they are reported
    /// through the notification queue and tallied in the returned
    /// [`DeleteOutcome`].
    pub async fn delete_selected(&self, cluster: &SharedCluster) -> DeleteOutcome {
        let pending: Vec<PendingDelete> = {
            let cluster = cluster.lock().expect("cluster mutex poisoned");
            cluster
                .files()
                .iter()
                .filter(|file| file.is_selected())
                .map(|file| PendingDelete::snapshot(file, &self.transport))
                .collect()
        };

        if pending.is_empty() {
            log::debug!("Delete requested with nothing selected");
            return DeleteOutcome::default();
        }
        log::info!("Deleting {} selected files", pending.len());

        let attempts = pending.iter().map(|entry| entry.issue(&self.transport));
        let results = future::join_all(attempts).await;

        let mut outcome = DeleteOutcome::default();
        for (entry, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => self.reconcile_success(cluster, entry, &mut outcome),
                Err(error) => {
                    outcome.failed += 1;
                    let message = match error.source() {
                        Some(source) => format!("{error}: {source}"),
                        None => error.to_string(),
                    };
                    log::error!("{}", message);
                    self.notifications.push(NotificationKind::Danger, message);
                }
            }
        }

        log::info!("Delete batch finished: {}", outcome.summary());
        outcome
    }

    fn reconcile_success(
        &self,
        cluster: &SharedCluster,
        entry: &PendingDelete,
        outcome: &mut DeleteOutcome,
    ) {
        let removed = cluster
            .lock()
            .expect("cluster mutex poisoned")
            .remove_file(entry.id);
        if removed.is_some() {
            outcome.deleted += 1;
            log::info!("Deleted {}", entry.path);
        } else {
            outcome.missing += 1;
            log::warn!(
                "{} deleted on server but already absent locally",
                entry.path
            );
            self.notifications.push(
                NotificationKind::Warning,
                format!("{} was already removed", entry.path),
            );
        }
    }
}
