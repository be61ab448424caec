//! dupweb - Duplicate File Resolution Client
//!
//! A CLI client for a dupfind duplicate-file server. It parses the
//! server's hypermedia (HAL) envelopes, accumulates paginated duplicate
//! clusters into a working set, selects redundant copies under a
//! never-delete-everything invariant, and synchronizes deletions back
//! to the server with partial-failure reporting.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod hal;
pub mod logging;
pub mod model;
pub mod notify;
pub mod output;
pub mod pager;
pub mod selection;
pub mod sync;
pub mod transport;

pub use app::run_app;
