//! Infrastructure layer - external adapters (filesystem, processes).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod command_processor;
pub mod config;
pub mod run_lock;
pub mod state_files;
pub mod systemd;
pub mod work_sources;

pub use command_processor::CommandProcessor;
pub use config::{ensure_config_exists, load_config};
pub use run_lock::RunLock;
pub use state_files::{CommitLogFile, IndexFile};
pub use systemd::{InstallResult, ScheduleStatus, SystemdSchedule};
pub use work_sources::build_work_source;
