//! repost-cursor - idempotent work-queue cursor for periodic repost jobs.
//!
//! Each invocation lists a work source, hands the first item not yet
//! committed to a processor command, and commits it only once the processor
//! reports success. A crash before the commit means the item is offered
//! again next run; an item is never offered again after its commit.
//!
//! QUICK START:
//!   repost-cursor init                  # Write ~/.repost-cursor/config.toml
//!   repost-cursor status                # Listing with done/next/pending markers
//!   repost-cursor run                   # Process and commit the next item
//!   repost-cursor schedule install      # Run periodically via a systemd timer

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    acquire_run_lock, format_run_summary, format_stats, format_status_json, format_status_plain,
    format_status_table, open_cursor_store, OutputFormat, RunService,
};
use cli::{Cli, Commands, ScheduleAction};
use domain::{AppConfig, ItemId};
use infrastructure::{build_work_source, ensure_config_exists, load_config, CommandProcessor};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Main application logic. Returns `false` when a processor failed.
fn run(cli: Cli) -> domain::Result<bool> {
    let format = cli.output_format().map_err(domain::AppError::config)?;
    let config_path = cli.config.as_deref();

    if matches!(cli.command, Commands::Init) {
        return cmd_init(config_path);
    }

    let config = load_config(config_path)?;

    match cli.command {
        Commands::Run { max_items, dry_run } => {
            cmd_run(&config, max_items.unwrap_or(config.run.max_items), dry_run)
        }
        Commands::Next => cmd_next(&config),
        Commands::Commit { id } => cmd_commit(&config, &ItemId::new(id)),
        Commands::Status { limit } => cmd_status(&config, limit, format),
        Commands::Schedule { action } => {
            let config_path = config_path
                .map_or_else(AppConfig::default_config_path, std::path::Path::to_path_buf);
            // Units run from another working directory.
            let config_path = std::fs::canonicalize(&config_path).unwrap_or(config_path);
            cmd_schedule(config, config_path, action)
        }
        Commands::Init => Ok(true),
    }
}

/// Write the default configuration.
fn cmd_init(config_path: Option<&std::path::Path>) -> domain::Result<bool> {
    let (path, created) = ensure_config_exists(config_path)?;
    if created {
        println!("{} Wrote {}", "✓".green().bold(), path.display());
    } else {
        println!("Config already exists: {}", path.display());
    }
    Ok(true)
}

/// Process up to `max_items` items.
fn cmd_run(config: &AppConfig, max_items: usize, dry_run: bool) -> domain::Result<bool> {
    if max_items == 0 {
        return Err(domain::AppError::config("--max-items must be at least 1"));
    }

    let _lock = acquire_run_lock(config)?;
    let source = build_work_source(config);
    let store = open_cursor_store(config)?;
    let mut service = RunService::new(source.as_ref(), store);

    if dry_run {
        match service.peek()? {
            Some(id) => println!("Would process: {id}"),
            None => println!("No new items"),
        }
        return Ok(true);
    }

    let processor_config = config.processor.as_ref().ok_or_else(|| {
        domain::AppError::config("no [processor] configured; add one or use --dry-run")
    })?;
    let processor = CommandProcessor::new(processor_config);

    let summary = service.run(&processor, max_items)?;
    println!("{}", format_run_summary(&summary));

    tracing::info!(
        processed = summary.processed.len(),
        failed = summary.failed.is_some(),
        exhausted = summary.exhausted,
        "Run finished"
    );

    Ok(summary.is_success())
}

/// Print the next item.
fn cmd_next(config: &AppConfig) -> domain::Result<bool> {
    let source = build_work_source(config);
    let store = open_cursor_store(config)?;
    let service = RunService::new(source.as_ref(), store);

    match service.peek()? {
        Some(id) => println!("{id}"),
        None => eprintln!("No new items"),
    }
    Ok(true)
}

/// Manually commit an item.
fn cmd_commit(config: &AppConfig, id: &ItemId) -> domain::Result<bool> {
    let _lock = acquire_run_lock(config)?;
    let source = build_work_source(config);
    let store = open_cursor_store(config)?;
    let mut service = RunService::new(source.as_ref(), store);

    service.commit(id)?;
    println!("{} Committed {}", "✓".green().bold(), id);
    Ok(true)
}

/// Show the listing with state markers.
fn cmd_status(config: &AppConfig, limit: usize, format: OutputFormat) -> domain::Result<bool> {
    let source = build_work_source(config);
    let store = open_cursor_store(config)?;
    let service = RunService::new(source.as_ref(), store);

    let (mut items, stats) = service.status()?;
    if limit > 0 {
        items.truncate(limit);
    }

    match format {
        OutputFormat::Table => {
            println!("{}", format_status_table(&items));
            println!();
            println!("{}", format_stats(&stats, service.committed_count()));
        }
        OutputFormat::Json => {
            let json = format_status_json(&items, &stats).map_err(domain::AppError::json_parse)?;
            println!("{json}");
        }
        OutputFormat::Plain => println!("{}", format_status_plain(&items)),
    }

    Ok(true)
}

/// Manage the systemd timer.
fn cmd_schedule(
    mut config: AppConfig,
    config_path: std::path::PathBuf,
    action: ScheduleAction,
) -> domain::Result<bool> {
    match action {
        ScheduleAction::Install { interval_minutes } => {
            if let Some(minutes) = interval_minutes {
                config.schedule.interval_minutes = minutes;
            }
            let schedule = infrastructure::SystemdSchedule::new(config, config_path);
            let result = schedule.install()?;
            println!("{} Installed {}", "✓".green().bold(), result.timer_path.display());
            println!("  Service: {}", result.service_path.display());
        }
        ScheduleAction::Uninstall => {
            infrastructure::SystemdSchedule::new(config, config_path).uninstall()?;
            println!("{} Schedule removed", "✓".green().bold());
        }
        ScheduleAction::Status => {
            let status = infrastructure::SystemdSchedule::new(config, config_path).get_status()?;
            println!("Timer: {}", status.short_status().bold());
            if status.is_installed {
                println!("{}", status.status_text);
            }
        }
    }
    Ok(true)
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
