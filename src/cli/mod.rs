//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// repost-cursor - hand out the next unprocessed item, exactly once.
///
/// Typical cron use: repost-cursor --config ~/repost/config.toml run
#[derive(Parser, Debug)]
#[command(name = "repost-cursor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (defaults to ~/.repost-cursor/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: table, json, or plain.
    #[arg(short, long, default_value = "table")]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process the next unprocessed item(s) and commit them on success.
    Run {
        /// Items to process in this run (overrides run.max_items).
        #[arg(short = 'n', long)]
        max_items: Option<usize>,

        /// Show what would be processed without running or committing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the next unprocessed item.
    Next,

    /// Mark an item as processed without running the processor.
    Commit {
        /// Item identifier, exactly as the work source lists it.
        id: String,
    },

    /// Show the listing with processed/pending markers.
    Status {
        /// Maximum number of items to show (0 = all).
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Write a default configuration file.
    Init,

    /// Manage the periodic systemd timer.
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    /// Install and enable the timer.
    Install {
        /// Minutes between runs (overrides schedule.interval_minutes).
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },

    /// Disable and remove the timer.
    Uninstall,

    /// Show timer status.
    Status,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
