//! Report rendering for cluster listings and resolve runs.
//!
//! Two report shapes, each renderable as human text (yansi colouring,
//! bytesize sizes) or as JSON for scripting:
//!
//! * [`ListReport`]: the clusters currently held, with per-cluster
//!   space accounting.
//! * [`ResolveReport`]: what a resolve run planned, and what actually
//!   happened when it executed, including the queued notifications.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "clusters": [
//!     {
//!       "hash": "abc123",
//!       "size": 1024,
//!       "wasted_space": 2048,
//!       "files": [{"path": "/a", "size": 1024, "selected": false}]
//!     }
//!   ],
//!   "summary": {
//!     "clusters": 1,
//!     "files": 3,
//!     "wasted_space": 2048,
//!     "exit_code": 0,
//!     "exit_code_name": "DW000"
//!   }
//! }
//! ```

use std::io::Write;

use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::error::ExitCode;
use crate::model::{Cluster, SharedCluster};
use crate::notify::{Notification, Notifications};
use crate::sync::DeleteOutcome;

/// Errors that can occur while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during report generation: {0}")]
    Io(#[from] std::io::Error),
}

/// A single file copy in a report.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Display path of the copy
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Whether the copy is marked for deletion
    pub selected: bool,
}

/// A single cluster in a report.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    /// Content hash, when the server sent one
    pub hash: Option<String>,
    /// Size in bytes of one copy
    pub size: u64,
    /// Bytes recoverable by keeping a single copy
    pub wasted_space: u64,
    /// The copies, in server order
    pub files: Vec<FileReport>,
}

impl ClusterReport {
    /// Capture a cluster's current state.
    #[must_use]
    pub fn from_cluster(cluster: &Cluster) -> Self {
        Self {
            hash: cluster.hash().map(str::to_string),
            size: cluster.size(),
            wasted_space: cluster.wasted_space(),
            files: cluster
                .files()
                .iter()
                .map(|file| FileReport {
                    path: file.display_path().to_string(),
                    size: file.size(),
                    selected: file.is_selected(),
                })
                .collect(),
        }
    }

    fn from_shared(clusters: &[SharedCluster]) -> Vec<Self> {
        clusters
            .iter()
            .map(|cluster| {
                Self::from_cluster(&cluster.lock().expect("cluster mutex poisoned"))
            })
            .collect()
    }
}

/// Summary statistics for a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListSummary {
    /// Number of clusters held
    pub clusters: usize,
    /// Number of file copies across all clusters
    pub files: usize,
    /// Total bytes recoverable
    pub wasted_space: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DW000")
    pub exit_code_name: String,
}

/// Complete listing report.
#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    /// The clusters, in arrival order
    pub clusters: Vec<ClusterReport>,
    /// Summary statistics
    pub summary: ListSummary,
}

impl ListReport {
    /// Build a report over the current working set.
    #[must_use]
    pub fn new(clusters: &[SharedCluster], exit_code: ExitCode) -> Self {
        let clusters = ClusterReport::from_shared(clusters);
        let files = clusters.iter().map(|c| c.files.len()).sum();
        let wasted_space = clusters.iter().map(|c| c.wasted_space).sum();
        Self {
            summary: ListSummary {
                clusters: clusters.len(),
                files,
                wasted_space,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
            clusters,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Render the listing as human-readable text.
    #[must_use]
    pub fn render_text(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            let hash = cluster.hash.as_deref().unwrap_or("?");
            let _ = writeln!(
                out,
                "{} {} copies, {} each, {} reclaimable ({})",
                format!("Cluster {}:", index + 1).bold(),
                cluster.files.len(),
                ByteSize::b(cluster.size),
                ByteSize::b(cluster.wasted_space),
                hash.dim()
            );
            for file in &cluster.files {
                let _ = writeln!(out, "  {}", file.path);
            }
        }
        let _ = writeln!(
            out,
            "{} clusters, {} files, {} reclaimable",
            self.summary.clusters,
            self.summary.files,
            ByteSize::b(self.summary.wasted_space).green()
        );
        out
    }
}

/// A queued notification in a report.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationReport {
    /// Severity label ("danger", "success", "warning", "info")
    pub kind: String,
    /// Message text
    pub message: String,
}

impl NotificationReport {
    /// Capture a queued notification.
    #[must_use]
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            kind: notification.kind.label().to_string(),
            message: notification.message.clone(),
        }
    }
}

/// Complete report of a resolve run.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    /// Cluster state when the report was taken (plan markers included)
    pub clusters: Vec<ClusterReport>,
    /// Number of files that were selected for deletion
    pub planned: usize,
    /// Whether deletions were actually issued
    pub executed: bool,
    /// Files confirmed deleted
    pub deleted: usize,
    /// Files whose delete request failed
    pub failed: usize,
    /// Files already gone when their delete succeeded
    pub missing: usize,
    /// Notifications queued during the run
    pub notifications: Vec<NotificationReport>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DW003")
    pub exit_code_name: String,
}

impl ResolveReport {
    /// Build a resolve report.
    ///
    /// Pass `outcome: None` for a plan-only run (nothing was issued).
    #[must_use]
    pub fn new(
        clusters: &[SharedCluster],
        planned: usize,
        outcome: Option<DeleteOutcome>,
        notifications: &Notifications,
        exit_code: ExitCode,
    ) -> Self {
        let tally = outcome.unwrap_or_default();
        Self {
            clusters: ClusterReport::from_shared(clusters),
            planned,
            executed: outcome.is_some(),
            deleted: tally.deleted,
            failed: tally.failed,
            missing: tally.missing,
            notifications: notifications
                .snapshot()
                .iter()
                .map(NotificationReport::from_notification)
                .collect(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Render the resolve run as human-readable text.
    #[must_use]
    pub fn render_text(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            let hash = cluster.hash.as_deref().unwrap_or("?");
            let _ = writeln!(
                out,
                "{} ({})",
                format!("Cluster {}:", index + 1).bold(),
                hash.dim()
            );
            for file in &cluster.files {
                let marker = if file.selected {
                    "delete".red()
                } else {
                    "keep  ".green()
                };
                let _ = writeln!(out, "  {} {}", marker, file.path);
            }
        }

        if self.executed {
            let _ = writeln!(
                out,
                "{} deleted, {} failed, {} already gone",
                self.deleted, self.failed, self.missing
            );
        } else {
            let _ = writeln!(out, "Planned {} deletions", self.planned);
            let _ = writeln!(out, "Re-run with {} to delete these files", "--yes".bold());
        }

        for notification in &self.notifications {
            let kind = match notification.kind.as_str() {
                "danger" => notification.kind.red().to_string(),
                "warning" => notification.kind.yellow().to_string(),
                _ => notification.kind.clone(),
            };
            let _ = writeln!(out, "{}: {}", kind, notification.message);
        }
        out
    }
}
