//! Domain layer - core types and collaborator seams.
//!
//! This layer contains pure models, configuration and error types
//! without any external dependencies (filesystem, processes).

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use config::{AppConfig, ProcessorConfig, SourceConfig, StoreConfig, StoreFormat};
pub use error::{AppError, Result, StoreError};
pub use models::{
    dedup_listing, CommitLog, IndexCursor, ItemId, ItemState, ItemStatus, QueueStats,
};
pub use ports::{CursorStore, Processor, StateStorage, WorkSource};
