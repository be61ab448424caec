//! Domain model for duplicate clusters and their file copies.
//!
//! # Overview
//!
//! The server reports duplicates as clusters: groups of files whose
//! content matched. This module wraps the generic parsed resources from
//! [`crate::hal`] in typed views ([`Cluster`] and [`FileCopy`]) without
//! flattening them, so attributes the client does not know about survive
//! inside the underlying [`Resource`].
//!
//! Every file copy is tagged with a locally generated [`FileId`] at
//! adoption time. All later bookkeeping (selection, deletion
//! reconciliation) identifies files by that id, never by position, since
//! clusters shrink while asynchronous work is in flight.
//!
//! # Example
//!
//! ```
//! use dupweb::hal;
//! use dupweb::model::Cluster;
//! use serde_json::json;
//!
//! let envelope = json!({
//!     "hash": "abc123",
//!     "size": 1024,
//!     "_embedded": {
//!         "files": [
//!             {"abspath": "/data/a.txt", "size": 1024},
//!             {"abspath": "/data/b.txt", "size": 1024}
//!         ]
//!     }
//! });
//!
//! let cluster = Cluster::adopt(hal::parse(&envelope).unwrap());
//! assert_eq!(cluster.len(), 2);
//! assert_eq!(cluster.wasted_space(), 1024);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::hal::{Embedded, Link, Resource};

/// Relation under which a cluster embeds its file copies.
pub const FILES_REL: &str = "files";

/// Locally assigned identifier for a file copy.
///
/// Ids are unique per process, not per cluster, and are never reused.
pub type FileId = u64;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

fn next_file_id() -> FileId {
    NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A cluster shared between the pager, the selection layer, and the
/// delete synchronizer.
pub type SharedCluster = Arc<Mutex<Cluster>>;

/// Wrap a cluster for shared mutation.
#[must_use]
pub fn share(cluster: Cluster) -> SharedCluster {
    Arc::new(Mutex::new(cluster))
}

// ==================== FileCopy ====================

/// One copy of a duplicated file, as reported by the server.
#[derive(Debug, Clone)]
pub struct FileCopy {
    id: FileId,
    resource: Resource,
    selected: bool,
}

impl FileCopy {
    /// Take ownership of a parsed file resource and tag it with a fresh id.
    #[must_use]
    pub fn adopt(resource: Resource) -> Self {
        Self {
            id: next_file_id(),
            resource,
            selected: false,
        }
    }

    /// Locally assigned identity of this copy.
    #[must_use]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// The underlying resource, attributes and links included.
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Absolute path attribute, if the server sent one.
    #[must_use]
    pub fn abspath(&self) -> Option<&str> {
        self.resource.attr_str("abspath")
    }

    /// Server-relative path attribute, if present.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.resource.attr_str("path")
    }

    /// Symlink-resolved path attribute, if present.
    #[must_use]
    pub fn realpath(&self) -> Option<&str> {
        self.resource.attr_str("realpath")
    }

    /// Best-effort path for messages and listings.
    ///
    /// Falls back through the known path-like attributes rather than
    /// failing, since notifications about a file must still render when
    /// the server omitted a field.
    #[must_use]
    pub fn display_path(&self) -> &str {
        self.abspath()
            .or_else(|| self.path())
            .or_else(|| self.fullname())
            .unwrap_or("<unknown file>")
    }

    /// File size in bytes, zero when the attribute is absent.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.resource.attr_u64("size").unwrap_or(0)
    }

    /// Content hash attribute, if present.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.resource.attr_str("hash")
    }

    /// File name attribute, if present.
    #[must_use]
    pub fn fullname(&self) -> Option<&str> {
        self.resource.attr_str("fullname")
    }

    /// Thumbnail link, if the server advertised one.
    #[must_use]
    pub fn thumb_link(&self) -> Option<&Link> {
        self.resource.link("thumb")
    }

    /// Whether this copy is currently marked for deletion.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

// ==================== Cluster ====================

/// A group of file copies with matching content.
///
/// Adoption pulls the embedded file resources out of the cluster
/// envelope into typed [`FileCopy`] entries; the remaining cluster
/// attributes and links stay on the wrapped [`Resource`].
#[derive(Debug, Clone)]
pub struct Cluster {
    resource: Resource,
    files: Vec<FileCopy>,
}

impl Cluster {
    /// Build a cluster from a parsed cluster resource.
    ///
    /// Files arrive under the `files` embed. A cluster without that
    /// embed is valid and simply empty; schema tolerance is deliberate
    /// here because the reserved-key envelope is validated upstream.
    #[must_use]
    pub fn adopt(mut resource: Resource) -> Self {
        let files: Vec<FileCopy> = resource
            .take_embedded(FILES_REL)
            .map(Embedded::into_resources)
            .unwrap_or_default()
            .into_iter()
            .map(FileCopy::adopt)
            .collect();

        log::debug!(
            "Adopted cluster (hash={}) with {} files",
            resource.attr_str("hash").unwrap_or("?"),
            files.len()
        );

        Self { resource, files }
    }

    /// The cluster envelope minus its adopted files.
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Content hash shared by the copies, if the server sent one.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.resource.attr_str("hash")
    }

    /// Size in bytes of a single copy, zero when absent.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.resource.attr_u64("size").unwrap_or(0)
    }

    /// The file copies in server order.
    #[must_use]
    pub fn files(&self) -> &[FileCopy] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [FileCopy] {
        &mut self.files
    }

    /// Look up a copy by id.
    #[must_use]
    pub fn file(&self, id: FileId) -> Option<&FileCopy> {
        self.files.iter().find(|file| file.id() == id)
    }

    /// Remove a copy by id, returning it if it was present.
    pub(crate) fn remove_file(&mut self, id: FileId) -> Option<FileCopy> {
        let index = self.files.iter().position(|file| file.id() == id)?;
        Some(self.files.remove(index))
    }

    /// Number of copies in this cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check whether the cluster has no copies left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether this cluster still describes a duplicate (2+ copies).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }

    /// Bytes recoverable by keeping a single copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        if self.files.len() > 1 {
            self.size() * (self.files.len() as u64 - 1)
        } else {
            0
        }
    }
}
