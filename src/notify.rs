//! User-facing notification queue.
//!
//! # Overview
//!
//! Components report outcomes by pushing [`Notification`] entries onto a
//! shared, ordered queue that presentation layers read back out. The
//! [`Notifications`] handle is cheaply cloneable and injectable: it is
//! owned by the application's top-level context and passed by handle to
//! whichever component needs to surface a result, never reached through
//! a global.
//!
//! Entries may carry a time-to-live. Expiry is deadline-based: the
//! deadline is fixed when the entry is pushed and expired entries are
//! pruned on every read or write, identified by id rather than index
//! since the queue mutates while requests are in flight.
//!
//! The queue applies no dedup and no size cap; unbounded growth is an
//! accepted limitation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Identifier assigned to each queued notification.
pub type NotificationId = u64;

/// Severity of a queued notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// An operation failed and needs the user's attention.
    Danger,
    /// An operation completed as requested.
    Success,
    /// Something unexpected happened but nothing was lost.
    Warning,
    /// Neutral information.
    Info,
}

impl NotificationKind {
    /// Lowercase label used in logs and serialized output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Danger => "danger",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A single queued message.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Identity of this entry, unique per queue.
    pub id: NotificationId,
    /// Severity of the message.
    pub kind: NotificationKind,
    /// Human-readable message text.
    pub message: String,
    /// When the entry was pushed.
    pub created_at: DateTime<Utc>,
    /// Deadline after which the entry is dropped, if one was requested.
    deadline: Option<Instant>,
}

impl Notification {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// Cloneable handle to the shared notification queue.
#[derive(Clone)]
pub struct Notifications {
    inner: Arc<Mutex<VecDeque<Notification>>>,
    next_id: Arc<AtomicU64>,
}

impl Notifications {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Append a message that stays until explicitly dismissed.
    ///
    /// Returns the id of the new entry.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    pub fn push(&self, kind: NotificationKind, message: impl Into<String>) -> NotificationId {
        self.push_inner(kind, message.into(), None)
    }

    /// Append a message that is dropped once `ttl` has elapsed.
    ///
    /// Returns the id of the new entry; the entry can still be dismissed
    /// early by that id.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    pub fn push_expiring(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        ttl: Duration,
    ) -> NotificationId {
        self.push_inner(kind, message.into(), Some(Instant::now() + ttl))
    }

    fn push_inner(
        &self,
        kind: NotificationKind,
        message: String,
        deadline: Option<Instant>,
    ) -> NotificationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("Notification {} [{}]: {}", id, kind.label(), message);

        let mut entries = self.lock();
        prune_expired(&mut entries);
        entries.push_back(Notification {
            id,
            kind,
            message,
            created_at: Utc::now(),
            deadline,
        });
        id
    }

    /// Remove an entry by id.
    ///
    /// Returns whether an entry was actually removed.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let mut entries = self.lock();
        prune_expired(&mut entries);

        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() < before;
        if removed {
            log::debug!("Dismissed notification {}", id);
        }
        removed
    }

    /// Copy out the live entries in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        let mut entries = self.lock();
        prune_expired(&mut entries);
        entries.iter().cloned().collect()
    }

    /// Number of live entries.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        prune_expired(&mut entries);
        entries.len()
    }

    /// Check whether the queue has no live entries.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        self.inner.lock().expect("notification queue mutex poisoned")
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

fn prune_expired(entries: &mut VecDeque<Notification>) {
    let now = Instant::now();
    entries.retain(|entry| !entry.is_expired(now));
}
