//! Application orchestration: wiring the CLI onto the engine.
//!
//! [`run_app`] owns the top-level context: it initializes logging,
//! merges the config file with CLI overrides, builds the shared
//! transport, and dispatches to the subcommand runners. Components
//! receive their collaborators by handle; nothing in here is global.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ListArgs, OutputFormat, ResolveArgs};
use crate::config::ClientConfig;
use crate::error::ExitCode;
use crate::logging::{current_level_name, init_logging};
use crate::model::SharedCluster;
use crate::notify::Notifications;
use crate::output::{ListReport, ResolveReport};
use crate::pager::ClusterPager;
use crate::sync::{DeleteOutcome, DeleteSynchronizer};
use crate::transport::{HttpTransport, Transport};

/// Run the application with the given CLI arguments.
///
/// Returns the exit code the process should terminate with.
///
/// # Errors
///
/// Returns an error for failures that have no dedicated exit code:
/// an unusable server URL, or a page fetch that failed outright.
pub async fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }
    log::debug!("Logging at {} level", current_level_name());

    let config = apply_overrides(ClientConfig::load(), &cli);
    log::debug!(
        "Using server {} (page size {}, timeout {}s)",
        config.server,
        config.page_size,
        config.timeout_secs
    );

    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::new(&config.server, config.timeout())
            .with_context(|| format!("Invalid server URL: {}", config.server))?,
    );

    match cli.command {
        Commands::List(args) => run_list(transport, &config, &args).await,
        Commands::Resolve(args) => run_resolve(transport, &config, &args).await,
    }
}

/// Layer CLI connection flags over the loaded configuration.
fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> ClientConfig {
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    config
}

/// Fetch the first page, or every page with `--all`.
async fn load_pages(pager: &mut ClusterPager, all: bool) -> Result<()> {
    if all {
        while pager.has_more_pages() {
            pager.load_next_page().await?;
        }
    } else {
        pager.load_next_page().await?;
    }
    Ok(())
}

async fn run_list(
    transport: Arc<dyn Transport>,
    config: &ClientConfig,
    args: &ListArgs,
) -> Result<ExitCode> {
    let mut pager = ClusterPager::with_page_size(transport, config.page_size);
    load_pages(&mut pager, args.all).await?;

    let exit_code = if pager.cluster_count() == 0 {
        log::info!("Server reported no duplicate clusters");
        ExitCode::NoClusters
    } else {
        ExitCode::Success
    };

    let report = ListReport::new(pager.clusters(), exit_code);
    emit_list(&report, args.output)?;
    Ok(exit_code)
}

async fn run_resolve(
    transport: Arc<dyn Transport>,
    config: &ClientConfig,
    args: &ResolveArgs,
) -> Result<ExitCode> {
    let mut pager = ClusterPager::with_page_size(Arc::clone(&transport), config.page_size);
    load_pages(&mut pager, args.all).await?;

    let notifications = Notifications::new();

    if pager.cluster_count() == 0 {
        log::info!("Server reported no duplicate clusters");
        let report =
            ResolveReport::new(&[], 0, None, &notifications, ExitCode::NoClusters);
        emit_resolve(&report, args.output)?;
        return Ok(ExitCode::NoClusters);
    }

    let planned = plan_selection(pager.clusters());
    if planned == 0 {
        log::info!("Selection policy left nothing to delete");
        let report = ResolveReport::new(
            pager.clusters(),
            0,
            None,
            &notifications,
            ExitCode::Success,
        );
        emit_resolve(&report, args.output)?;
        return Ok(ExitCode::Success);
    }

    if !args.yes {
        // Plan only; nothing is issued without --yes.
        let report = ResolveReport::new(
            pager.clusters(),
            planned,
            None,
            &notifications,
            ExitCode::Success,
        );
        emit_resolve(&report, args.output)?;
        return Ok(ExitCode::Success);
    }

    let synchronizer = DeleteSynchronizer::new(transport, notifications.clone());
    let mut outcome = DeleteOutcome::default();
    for cluster in pager.clusters() {
        outcome.merge(synchronizer.delete_selected(cluster).await);
    }
    pager.prune_resolved();

    let exit_code = if outcome.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialFailure
    };
    log::info!("Resolve finished: {}", outcome.summary());

    let report = ResolveReport::new(
        pager.clusters(),
        planned,
        Some(outcome),
        &notifications,
        exit_code,
    );
    emit_resolve(&report, args.output)?;
    Ok(exit_code)
}

/// Apply the sweep selection to every cluster; returns how many files
/// ended up selected.
fn plan_selection(clusters: &[SharedCluster]) -> usize {
    let mut planned = 0;
    for cluster in clusters {
        let mut cluster = cluster.lock().expect("cluster mutex poisoned");
        cluster.select_all();
        planned += cluster.selected_count();
    }
    planned
}

fn emit_list(report: &ListReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => report.write_to(&mut io::stdout(), true)?,
    }
    Ok(())
}

fn emit_resolve(report: &ResolveReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => report.write_to(&mut io::stdout(), true)?,
    }
    Ok(())
}
