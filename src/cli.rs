//! Command-line interface definitions for dupweb.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options cover verbosity, color, and the server connection; subcommands select
//! the operation.
//!
//! # Example
//!
//! ```bash
//! # List the first page of duplicate clusters
//! dupweb list
//!
//! # List every page as JSON for scripting
//! dupweb list --all --output json
//!
//! # Show what a resolve would delete
//! dupweb resolve --all
//!
//! # Actually delete the redundant copies
//! dupweb resolve --all --yes
//!
//! # Against a non-default server, with debug logging
//! dupweb -v --server http://nas.local:8080 list
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Duplicate-file resolution client for a dupfind server.
///
/// dupweb browses the clusters of duplicate files a dupfind server has
/// discovered, picks redundant copies per cluster (always keeping at
/// least one), and deletes them through the server's hypermedia API.
#[derive(Debug, Parser)]
#[command(name = "dupweb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Base URL of the dupfind server (overrides the config file)
    #[arg(short, long, global = true, value_name = "URL", env = "DUPWEB_SERVER")]
    pub server: Option<String>,

    /// Clusters to request per page (overrides the config file)
    #[arg(long, global = true, value_name = "N")]
    pub page_size: Option<u32>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print failures as a JSON document on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for dupweb.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List duplicate clusters reported by the server
    List(ListArgs),
    /// Select redundant copies and delete them from the server
    Resolve(ResolveArgs),
}

/// Arguments for the list subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Fetch every page instead of only the first
    #[arg(long)]
    pub all: bool,

    /// Output format (text for reading, json for scripting)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the resolve subcommand.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Fetch every page before resolving
    #[arg(long)]
    pub all: bool,

    /// Delete without confirmation; without this flag only the plan is printed
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output format (text for reading, json for scripting)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for listings and resolve reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
