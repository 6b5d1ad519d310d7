//! Processor hook backed by an external command.
//!
//! Download, caption transform, upload and notification all happen in the
//! configured program. Exit status 0 means every effect was sent.

use std::process::Command;

use crate::domain::{AppError, ItemId, Processor, ProcessorConfig, Result};

/// Placeholder replaced by the item identifier in arguments.
const ID_PLACEHOLDER: &str = "{id}";

/// Environment variable carrying the item identifier.
pub const ITEM_ID_ENV: &str = "REPOST_ITEM_ID";

/// Runs one program per item.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
}

impl CommandProcessor {
    /// Create a processor from configuration.
    #[must_use]
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    /// Arguments for `id` with placeholders substituted.
    fn args_for(&self, id: &ItemId) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ID_PLACEHOLDER, id.as_str()))
            .collect()
    }
}

impl Processor for CommandProcessor {
    fn process(&self, id: &ItemId) -> Result<()> {
        let args = self.args_for(id);
        tracing::info!(id = %id, program = %self.program, "Processing item");

        let status = Command::new(&self.program)
            .args(&args)
            .env(ITEM_ID_ENV, id.as_str())
            .status()
            .map_err(|e| AppError::Processor {
                message: format!("Failed to run {}", self.program),
                source: Some(e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AppError::processor(format!(
                "{} exited with {status} for {id}",
                self.program
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(program: &str, args: &[&str]) -> CommandProcessor {
        CommandProcessor::new(&ProcessorConfig {
            program: program.into(),
            args: args.iter().map(ToString::to_string).collect(),
        })
    }

    #[test]
    fn test_placeholder_substitution() {
        let p = processor("repost", &["--url", "{id}", "--tag={id}"]);
        let args = p.args_for(&ItemId::from("https://ig/p/abc"));
        assert_eq!(
            args,
            vec!["--url", "https://ig/p/abc", "--tag=https://ig/p/abc"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_decides_success() {
        let ok = processor("sh", &["-c", "test \"$REPOST_ITEM_ID\" = \"$0\"", "{id}"]);
        assert!(ok.process(&ItemId::from("abc")).is_ok());

        let failing = processor("sh", &["-c", "exit 1"]);
        let err = failing.process(&ItemId::from("abc")).unwrap_err();
        assert!(matches!(err, AppError::Processor { .. }));
    }

    #[test]
    fn test_missing_program_is_processor_error() {
        let p = processor("/nonexistent/repost-hook", &[]);
        let err = p.process(&ItemId::from("abc")).unwrap_err();
        assert!(matches!(err, AppError::Processor { source: Some(_), .. }));
    }
}
