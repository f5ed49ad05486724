//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `netcraft_reporter` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use netcraft_reporter::app::{
    cancel_on_interrupt, print_error_statistics, print_job_summary, read_url_list,
    wait_for_terminal_event,
};
use netcraft_reporter::config::{Cli, Command, ExportArgs, PurgeArgs, ReportArgs};
use netcraft_reporter::export::{export_submissions, ExportOptions};
use netcraft_reporter::initialization::init_logger_with;
use netcraft_reporter::{
    normalize_url, Config, JobController, JobEvent, JobRegistry, NetcraftClient,
    ProcessingStats, SqliteSubmissionStore, StatusPoller, SubmissionFilter, SubmissionStore,
};

/// Loads `.env` from the current directory, falling back to the one next to
/// the executable.
fn load_env_file() {
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }
}

async fn open_store(config: &Config) -> Result<Arc<SqliteSubmissionStore>> {
    let store = SqliteSubmissionStore::open(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    Ok(Arc::new(store))
}

/// Runs one submission job. Returns `false` if the job ended in an error.
async fn run_report(mut config: Config, args: ReportArgs) -> Result<bool> {
    if config.email.trim().is_empty() {
        bail!("An email address is required to report URLs (--email or NETCRAFT_EMAIL)");
    }
    if let Some(batch_size) = args.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(max_urls) = args.max_urls {
        config.pipeline.max_urls_per_job = max_urls;
    }

    let urls = read_url_list(&args.file).await?;
    if urls.is_empty() {
        warn!("No URLs to report");
        return Ok(true);
    }

    let store = open_store(&config).await?;
    let api = Arc::new(
        NetcraftClient::from_config(&config).context("Failed to initialize API client")?,
    );
    let stats = Arc::new(ProcessingStats::new());
    let controller = JobController::new(
        store,
        api,
        Arc::new(JobRegistry::new()),
        config.pipeline.clone(),
        Arc::clone(&stats),
    );

    let mut job = controller.submit(urls);
    let interrupt = cancel_on_interrupt(controller.clone(), job.id);
    let terminal = wait_for_terminal_event(&mut job.events).await;
    interrupt.abort();
    job.task.await.context("Job task failed")?;

    print_error_statistics(&stats);
    match terminal {
        Some(JobEvent::Complete {
            totals, message, ..
        }) => {
            print_job_summary(&totals);
            if let Some(message) = message {
                println!("{message}");
            }
            println!(
                "{} reported, {} skipped, {} failed, {} invalid (of {})",
                totals.reported, totals.skipped, totals.failed, totals.invalid, totals.total
            );
            Ok(true)
        }
        Some(JobEvent::Stopped) => {
            println!("Job stopped; already stored submissions were kept");
            Ok(true)
        }
        Some(JobEvent::Error { message }) => {
            eprintln!("netcraft_reporter error: {message}");
            Ok(false)
        }
        _ => bail!("Job ended without a final event"),
    }
}

async fn run_check(config: Config) -> Result<()> {
    let store = open_store(&config).await?;
    let api = Arc::new(
        NetcraftClient::from_config(&config).context("Failed to initialize API client")?,
    );
    let stats = Arc::new(ProcessingStats::new());
    let poller = StatusPoller::new(store, api, config.poller.clone(), Arc::clone(&stats));

    let report = poller.run().await.context("Status sweep failed")?;
    print_error_statistics(&stats);
    println!(
        "{}",
        serde_json::to_string(&report).context("Failed to serialize sweep report")?
    );
    Ok(())
}

async fn run_export(config: Config, args: ExportArgs) -> Result<()> {
    let store = open_store(&config).await?;
    let mut filter = SubmissionFilter::default();
    if !args.any_tag {
        filter = filter.with_tag(args.tag);
    }
    if let Some(state) = args.state {
        filter = filter.with_state(state);
    }
    let opts = ExportOptions {
        output: args.output,
        format: args.format.into(),
        filter,
        ..Default::default()
    };

    let count = export_submissions(&*store, &opts).await?;
    match &opts.output {
        Some(path) => info!("Exported {count} submissions to {}", path.display()),
        None => info!("Exported {count} submissions"),
    }
    Ok(())
}

/// Reads a purge list; entries are normalized the same way reported URLs are.
async fn read_purge_list(path: &Path) -> Result<Vec<String>> {
    Ok(read_url_list(path)
        .await?
        .into_iter()
        .map(|raw| normalize_url(&raw).unwrap_or(raw))
        .collect())
}

async fn run_purge(config: Config, args: PurgeArgs) -> Result<()> {
    if args.states.is_empty() && args.urls.is_none() {
        bail!("Nothing to purge: pass --state and/or --urls");
    }
    let store = open_store(&config).await?;

    if !args.states.is_empty() {
        let deleted = store
            .delete_by_states(&args.states)
            .await
            .context("Failed to delete submissions by state")?;
        println!("Deleted {deleted} submissions by state");
    }
    if let Some(path) = &args.urls {
        let urls = read_purge_list(path).await?;
        let deleted = store
            .delete_by_urls(&urls)
            .await
            .context("Failed to delete submissions by URL")?;
        println!("Deleted {deleted} of {} listed submissions", urls.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();

    let cli = Cli::parse();
    let config = cli.global.to_config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let result = match cli.command {
        Command::Report(args) => run_report(config, args).await,
        Command::Check => run_check(config).await.map(|()| true),
        Command::Export(args) => run_export(config, args).await.map(|()| true),
        Command::Purge(args) => run_purge(config, args).await.map(|()| true),
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("netcraft_reporter error: {:#}", e);
            process::exit(1);
        }
    }
}
