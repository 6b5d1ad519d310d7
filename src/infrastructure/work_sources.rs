//! Work source adapters.
//!
//! Each source produces a fresh ordered listing per run: a manifest file,
//! the stdout of an external enumerator such as
//! `yt-dlp --flat-playlist --dump-json`, or a numeric sequence.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::domain::{dedup_listing, AppConfig, AppError, ItemId, Result, SourceConfig, WorkSource};

/// Fixed manifest file, one identifier per line.
///
/// Blank lines and `#` comments are skipped. Lines are only ever appended,
/// so positions are stable across runs.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    /// Create a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WorkSource for ManifestSource {
    fn list(&self) -> Result<Vec<ItemId>> {
        let content = fs::read_to_string(&self.path).map_err(|e| AppError::WorkSource {
            message: format!("Failed to read manifest: {}", self.path.display()),
            source: Some(e),
        })?;

        let listing = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ItemId::from)
            .collect();

        Ok(dedup_listing(listing))
    }

    fn is_append_only(&self) -> bool {
        true
    }
}

/// External enumerator printing one record per stdout line.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    json_field: Option<String>,
    reverse: bool,
}

impl CommandSource {
    /// Create a source running `program` with `args`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            json_field: None,
            reverse: false,
        }
    }

    /// Parse each line as JSON and take `field` as the identifier.
    #[must_use]
    pub fn with_json_field(mut self, field: Option<String>) -> Self {
        self.json_field = field;
        self
    }

    /// Reverse the listing (newest-first output becomes oldest-first).
    #[must_use]
    pub const fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Turn enumerator output into a listing.
    fn parse_listing(&self, stdout: &str) -> Vec<ItemId> {
        let mut listing: Vec<ItemId> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match &self.json_field {
                Some(field) => extract_field(line, field),
                None => Some(ItemId::from(line)),
            })
            .collect();

        if self.reverse {
            listing.reverse();
        }

        dedup_listing(listing)
    }
}

/// Pull `field` out of one JSON record. Records without it are skipped.
fn extract_field(line: &str, field: &str) -> Option<ItemId> {
    let record: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping non-JSON line from work source");
            return None;
        }
    };

    match record.get(field)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(ItemId::from(s.trim())),
        serde_json::Value::Number(n) => Some(ItemId::new(n.to_string())),
        _ => None,
    }
}

impl WorkSource for CommandSource {
    fn list(&self) -> Result<Vec<ItemId>> {
        tracing::debug!(program = %self.program, args = ?self.args, "Enumerating work source");

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| AppError::WorkSource {
                message: format!("Failed to run {}", self.program),
                source: Some(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::work_source(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let listing = self.parse_listing(&String::from_utf8_lossy(&output.stdout));
        tracing::info!(program = %self.program, items = listing.len(), "Work source listed");
        Ok(listing)
    }

    fn is_append_only(&self) -> bool {
        false
    }
}

/// Numeric feed of positions `start..=end`.
#[derive(Debug, Clone, Copy)]
pub struct SequenceSource {
    start: u64,
    end: u64,
}

impl SequenceSource {
    /// Create a feed over `start..=end`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

impl WorkSource for SequenceSource {
    fn list(&self) -> Result<Vec<ItemId>> {
        Ok((self.start..=self.end)
            .map(|n| ItemId::new(n.to_string()))
            .collect())
    }

    fn is_append_only(&self) -> bool {
        true
    }
}

/// Build the configured work source.
#[must_use]
pub fn build_work_source(config: &AppConfig) -> Box<dyn WorkSource> {
    match &config.source {
        SourceConfig::Manifest { path } => Box::new(ManifestSource::new(config.resolve(path))),
        SourceConfig::Command {
            program,
            args,
            json_field,
            reverse,
        } => Box::new(
            CommandSource::new(program.clone(), args.clone())
                .with_json_field(json_field.clone())
                .reversed(*reverse),
        ),
        SourceConfig::Sequence { start, end } => Box::new(SequenceSource::new(*start, *end)),
    }
}
