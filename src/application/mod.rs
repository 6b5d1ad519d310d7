//! Application layer - use cases and orchestration.
//!
//! This layer contains the cursor stores and the run loop that ties them
//! to a work source and a processor.

pub mod cursor_store;
pub mod formatter;
pub mod run_service;

pub use cursor_store::open_cursor_store;
pub use formatter::{
    format_run_summary, format_stats, format_status_json, format_status_plain,
    format_status_table, OutputFormat,
};
pub use run_service::{acquire_run_lock, RunService};
