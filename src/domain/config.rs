//! Configuration models.
//!
//! Everything the store and its collaborators need is carried here and
//! handed over at construction time; nothing below `main` reads the
//! environment for settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// On-disk encoding of progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    /// `{"processed": [...]}` commit log.
    #[default]
    Json,
    /// Newline-delimited commit log.
    Lines,
    /// Single integer cursor. Append-only sources only.
    Index,
}

impl StoreFormat {
    /// Whether this format keys progress by identifier.
    #[must_use]
    pub const fn is_identifier_keyed(self) -> bool {
        matches!(self, Self::Json | Self::Lines)
    }
}

impl std::fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Lines => write!(f, "lines"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// Durable state configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// State file path. Relative paths resolve against the config directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// State encoding.
    #[serde(default)]
    pub format: StoreFormat,

    /// Hold an advisory lock file for the duration of a run.
    #[serde(default = "default_lock")]
    pub lock: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            format: StoreFormat::default(),
            lock: default_lock(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("state.json")
}

const fn default_lock() -> bool {
    true
}

/// Where candidate items come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Text file of identifiers, one per line.
    Manifest {
        /// Manifest path. Relative paths resolve against the config directory.
        path: PathBuf,
    },

    /// External enumerator printing one record per line.
    Command {
        /// Program to run.
        program: String,
        /// Program arguments.
        #[serde(default)]
        args: Vec<String>,
        /// Treat each line as JSON and take this field as the identifier.
        #[serde(default)]
        json_field: Option<String>,
        /// Reverse the listing (newest-first to oldest-first).
        #[serde(default)]
        reverse: bool,
    },

    /// Numeric feed of positions `start..=end`.
    Sequence {
        /// First position.
        #[serde(default)]
        start: u64,
        /// Last position (inclusive).
        end: u64,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Manifest {
            path: PathBuf::from("items.txt"),
        }
    }
}

impl SourceConfig {
    /// Whether the listing only ever grows at the end.
    #[must_use]
    pub const fn is_append_only(&self) -> bool {
        matches!(self, Self::Manifest { .. } | Self::Sequence { .. })
    }

    /// Short name for logs and status output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Manifest { .. } => "manifest",
            Self::Command { .. } => "command",
            Self::Sequence { .. } => "sequence",
        }
    }
}

/// External command that processes one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Program to run.
    pub program: String,

    /// Arguments; the literal `{id}` is replaced by the item identifier.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Per-invocation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum items processed per invocation.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}

const fn default_max_items() -> usize {
    1
}

/// Periodic scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between scheduled runs.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

const fn default_interval_minutes() -> u64 {
    60
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Durable state.
    #[serde(default)]
    pub store: StoreConfig,

    /// Work source.
    #[serde(default)]
    pub source: SourceConfig,

    /// Processor hook. Required only by `run`.
    #[serde(default)]
    pub processor: Option<ProcessorConfig>,

    /// Per-run limits.
    #[serde(default)]
    pub run: RunConfig,

    /// Scheduling.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".repost-cursor")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Directory relative paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Resolve a configured path against the base directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Get the state file path.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store.path)
    }

    /// Get the lock file path.
    #[must_use]
    pub fn lock_file_path(&self) -> PathBuf {
        let mut name = self.store_path().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Reject combinations that would deliver the wrong item.
    ///
    /// # Errors
    /// Returns a configuration error for an index cursor over a source that
    /// is not append-only, or for a zero per-run limit.
    pub fn validate(&self) -> Result<()> {
        if !self.store.format.is_identifier_keyed() && !self.source.is_append_only() {
            return Err(AppError::config(format!(
                "index cursor requires an append-only work source, but source is '{}'; \
                 use format = \"json\" or \"lines\"",
                self.source.kind()
            )));
        }

        if let SourceConfig::Sequence { start, end } = self.source {
            if start > end {
                return Err(AppError::config(format!(
                    "sequence start {start} is after end {end}"
                )));
            }
        }

        if self.run.max_items == 0 {
            return Err(AppError::config("run.max_items must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store.format, StoreFormat::Json);
        assert!(config.store.lock);
        assert_eq!(config.run.max_items, 1);
        assert!(config.processor.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_cursor_rejected_for_live_source() {
        let config = AppConfig {
            store: StoreConfig {
                format: StoreFormat::Index,
                ..StoreConfig::default()
            },
            source: SourceConfig::Command {
                program: "yt-dlp".into(),
                args: Vec::new(),
                json_field: None,
                reverse: true,
            },
            ..AppConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_index_cursor_allowed_for_manifest() {
        let config = AppConfig {
            store: StoreConfig {
                format: StoreFormat::Index,
                ..StoreConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let config = AppConfig {
            base_dir: Some(PathBuf::from("/srv/repost")),
            ..AppConfig::default()
        };
        assert_eq!(config.store_path(), PathBuf::from("/srv/repost/state.json"));
        assert_eq!(
            config.lock_file_path(),
            PathBuf::from("/srv/repost/state.json.lock")
        );
        assert_eq!(
            config.resolve(Path::new("/abs/items.txt")),
            PathBuf::from("/abs/items.txt")
        );
    }

    #[test]
    fn test_source_kind_tag() {
        let source: SourceConfig =
            toml::from_str("kind = \"sequence\"\nstart = 1\nend = 5\n").unwrap();
        assert!(source.is_append_only());
        assert_eq!(source.kind(), "sequence");
    }
}
