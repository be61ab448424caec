//! Paginated retrieval and accumulation of duplicate clusters.
//!
//! # Overview
//!
//! [`ClusterPager`] walks the server's duplicate listing one page at a
//! time and accumulates every cluster it has seen into a working set of
//! [`SharedCluster`] handles. Arrival order is preserved exactly as the
//! server sent it; pages are never re-sorted or de-duplicated.
//!
//! Fetches are serialized by construction: [`ClusterPager::load_next_page`]
//! takes `&mut self`, so a second call cannot start until the first
//! settles. Callers that want look-ahead queue behind the exclusive
//! borrow instead of racing it.
//!
//! The page cursor advances once per issued fetch whether or not the
//! fetch succeeds. A failed page is therefore not retried by calling
//! [`ClusterPager::load_next_page`] again; that requests the following
//! page. [`ClusterPager::reset`] starts the walk over from page 1.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::hal::{self, Embedded, ParseError};
use crate::model::{share, Cluster, SharedCluster};
use crate::transport::{Transport, TransportError};

/// Listing endpoint for duplicate clusters.
pub const CLUSTERS_PATH: &str = "/clusters/duplicates";

/// Page size requested when the caller does not override it.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const CLUSTERS_REL: &str = "clusters";
const NEXT_REL: &str = "next";

/// Error raised by a page load.
///
/// The pager's cursor has already advanced when one of these surfaces;
/// see the module docs for the retry consequences.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The page request itself failed.
    #[error("Failed to fetch page {page}")]
    Transport {
        /// Page number that was being fetched.
        page: u32,
        #[source]
        source: TransportError,
    },
    /// The page arrived but was not a valid hypermedia envelope.
    #[error("Failed to parse page {page}")]
    Parse {
        /// Page number that was being fetched.
        page: u32,
        #[source]
        source: ParseError,
    },
}

impl FetchError {
    /// Page number the failed fetch was for.
    #[must_use]
    pub fn page(&self) -> u32 {
        match self {
            Self::Transport { page, .. } | Self::Parse { page, .. } => *page,
        }
    }
}

/// Accumulating pager over the server's duplicate clusters.
pub struct ClusterPager {
    transport: Arc<dyn Transport>,
    page_size: u32,
    next_page: u32,
    has_more: bool,
    clusters: Vec<SharedCluster>,
}

impl fmt::Debug for ClusterPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterPager")
            .field("page_size", &self.page_size)
            .field("next_page", &self.next_page)
            .field("has_more", &self.has_more)
            .field("clusters", &self.clusters.len())
            .finish_non_exhaustive()
    }
}

impl ClusterPager {
    /// Create a pager using [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_page_size(transport, DEFAULT_PAGE_SIZE)
    }

    /// Create a pager with an explicit page size.
    #[must_use]
    pub fn with_page_size(transport: Arc<dyn Transport>, page_size: u32) -> Self {
        Self {
            transport,
            page_size,
            next_page: 1,
            has_more: true,
            clusters: Vec::new(),
        }
    }

    /// Fetch the next page and append its clusters to the working set.
    ///
    /// Returns the number of clusters appended. Once the server stops
    /// advertising a `next` link this becomes an immediate no-op
    /// returning `Ok(0)`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request or the envelope parse
    /// fails. The working set and `has_more_pages` are left unchanged,
    /// but the page cursor has advanced.
    pub async fn load_next_page(&mut self) -> Result<usize, FetchError> {
        if !self.has_more {
            log::debug!("All pages loaded; skipping fetch");
            return Ok(0);
        }

        let page = self.next_page;
        // One cursor step per issued fetch, success or not.
        self.next_page += 1;

        let query = [
            ("page", page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        let envelope = self
            .transport
            .get(CLUSTERS_PATH, &query)
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let mut resource =
            hal::parse(&envelope).map_err(|source| FetchError::Parse { page, source })?;

        self.has_more = resource.has_link(NEXT_REL);

        let adopted: Vec<SharedCluster> = resource
            .take_embedded(CLUSTERS_REL)
            .map(Embedded::into_resources)
            .unwrap_or_default()
            .into_iter()
            .map(Cluster::adopt)
            .map(share)
            .collect();

        let appended = adopted.len();
        self.clusters.extend(adopted);

        log::info!(
            "Loaded page {}: {} clusters ({} held, more={})",
            page,
            appended,
            self.clusters.len(),
            self.has_more
        );
        Ok(appended)
    }

    /// The accumulated working set, in arrival order.
    #[must_use]
    pub fn clusters(&self) -> &[SharedCluster] {
        &self.clusters
    }

    /// Number of clusters held.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Whether the server advertised another page.
    ///
    /// Optimistically `true` before the first fetch.
    #[must_use]
    pub fn has_more_pages(&self) -> bool {
        self.has_more
    }

    /// Page size sent with every fetch.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Page number the next fetch will request.
    #[must_use]
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Drop clusters that no longer describe a duplicate (fewer than
    /// two copies left).
    ///
    /// Returns the number of clusters removed.
    pub fn prune_resolved(&mut self) -> usize {
        let before = self.clusters.len();
        self.clusters.retain(|cluster| {
            cluster
                .lock()
                .expect("cluster mutex poisoned")
                .has_duplicates()
        });
        let removed = before - self.clusters.len();
        if removed > 0 {
            log::debug!("Pruned {} resolved clusters", removed);
        }
        removed
    }

    /// Forget everything and start over from page 1.
    pub fn reset(&mut self) {
        self.next_page = 1;
        self.has_more = true;
        self.clusters.clear();
        log::debug!("Pager reset to page 1");
    }
}
