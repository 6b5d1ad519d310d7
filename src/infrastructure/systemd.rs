//! Systemd timer integration.
//!
//! Generates and installs a oneshot user service plus a timer that fires
//! `repost-cursor run` periodically.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::{AppConfig, AppError, Result};

/// Service unit file name.
const SERVICE_NAME: &str = "repost-cursor.service";

/// Timer unit file name.
const TIMER_NAME: &str = "repost-cursor.timer";

/// Systemd schedule manager.
pub struct SystemdSchedule {
    config: AppConfig,
    config_path: PathBuf,
}

impl SystemdSchedule {
    /// Create a schedule manager for the configuration at `config_path`.
    #[must_use]
    pub const fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Get the systemd user directory path.
    fn user_systemd_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| AppError::Config {
            message: "Could not determine home directory".into(),
        })?;

        Ok(home.join(".config/systemd/user"))
    }

    /// Generate the service unit content.
    fn generate_service_unit(&self, binary: &Path) -> String {
        let data_dir = self.config.store_path();
        let data_dir = data_dir.parent().unwrap_or_else(|| Path::new("."));

        format!(
            r"[Unit]
Description=Repost next queued item
After=network-online.target
Wants=network-online.target

[Service]
Type=oneshot
ExecStart={binary} --config {config} run
WorkingDirectory={data_dir}
Environment=RUST_LOG=info
",
            binary = quote_exec_arg(binary),
            config = quote_exec_arg(&self.config_path),
            data_dir = data_dir.display().to_string().replace('%', "%%"),
        )
    }

    /// Generate the timer unit content.
    fn generate_timer_unit(&self) -> String {
        let interval = self.config.schedule.interval_minutes.max(1);

        format!(
            r"[Unit]
Description=Run repost-cursor every {interval} minutes

[Timer]
OnBootSec=5min
OnUnitActiveSec={interval}min
Persistent=true

[Install]
WantedBy=timers.target
"
        )
    }

    /// Write both units, reload systemd and enable the timer.
    ///
    /// # Errors
    /// Returns error if the units cannot be written or systemctl fails.
    pub fn install(&self) -> Result<InstallResult> {
        // Timer runs cannot fall back to defaults the way an interactive run does.
        if !self.config_path.is_file() {
            return Err(AppError::config(format!(
                "{} does not exist; run `repost-cursor init` first",
                self.config_path.display()
            )));
        }

        let systemd_dir = Self::user_systemd_dir()?;
        fs::create_dir_all(&systemd_dir)
            .map_err(|e| AppError::io("Failed to create systemd user directory", e))?;

        let binary = std::env::current_exe()
            .map_err(|e| AppError::io("Failed to get executable path", e))?;

        let service_path = systemd_dir.join(SERVICE_NAME);
        let timer_path = systemd_dir.join(TIMER_NAME);

        fs::write(&service_path, self.generate_service_unit(&binary))
            .map_err(|e| AppError::io("Failed to write service file", e))?;
        fs::write(&timer_path, self.generate_timer_unit())
            .map_err(|e| AppError::io("Failed to write timer file", e))?;

        tracing::info!(
            service = %service_path.display(),
            timer = %timer_path.display(),
            "Unit files written"
        );

        systemctl(&["daemon-reload"])?;
        systemctl(&["enable", "--now", TIMER_NAME])?;

        Ok(InstallResult {
            service_path,
            timer_path,
        })
    }

    /// Disable the timer and remove both units.
    ///
    /// # Errors
    /// Returns error if a unit file cannot be removed.
    pub fn uninstall(&self) -> Result<()> {
        if let Err(e) = systemctl(&["disable", "--now", TIMER_NAME]) {
            tracing::warn!(error = %e, "Timer may not have been fully disabled");
        }

        let systemd_dir = Self::user_systemd_dir()?;
        for name in [TIMER_NAME, SERVICE_NAME] {
            let path = systemd_dir.join(name);
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| AppError::io(format!("Failed to remove {}", path.display()), e))?;
            }
        }

        let _ = systemctl(&["daemon-reload"]);

        tracing::info!("Schedule uninstalled");

        Ok(())
    }

    /// Get timer status.
    ///
    /// # Errors
    /// Returns error if systemctl cannot be run.
    pub fn get_status(&self) -> Result<ScheduleStatus> {
        let is_installed = Self::user_systemd_dir()?.join(TIMER_NAME).exists();

        if !is_installed {
            return Ok(ScheduleStatus {
                is_installed: false,
                is_enabled: false,
                is_active: false,
                status_text: "not installed".into(),
            });
        }

        let is_enabled = systemctl_output(&["is-enabled", TIMER_NAME])?.status.success();
        let is_active = systemctl_output(&["is-active", TIMER_NAME])?.status.success();

        let status_output = systemctl_output(&["list-timers", TIMER_NAME, "--no-pager"])?;
        let status_text = String::from_utf8_lossy(&status_output.stdout).to_string();

        Ok(ScheduleStatus {
            is_installed,
            is_enabled,
            is_active,
            status_text,
        })
    }
}

/// Quote a path as one `ExecStart` argument.
fn quote_exec_arg(path: &Path) -> String {
    let mut quoted = String::from("\"");
    for c in path.display().to_string().chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '%' => quoted.push_str("%%"),
            '$' => quoted.push_str("$$"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Run `systemctl --user <args>` and require success.
fn systemctl(args: &[&str]) -> Result<()> {
    let status = Command::new("systemctl")
        .arg("--user")
        .args(args)
        .status()
        .map_err(|e| AppError::io("Failed to run systemctl", e))?;

    if status.success() {
        Ok(())
    } else {
        Err(AppError::Config {
            message: format!("systemctl --user {} failed with {status}", args.join(" ")),
        })
    }
}

/// Run `systemctl --user <args>` and capture its output.
fn systemctl_output(args: &[&str]) -> Result<std::process::Output> {
    Command::new("systemctl")
        .arg("--user")
        .args(args)
        .output()
        .map_err(|e| AppError::io("Failed to run systemctl", e))
}

/// Result of installing the schedule.
#[derive(Debug)]
pub struct InstallResult {
    /// Path where the service unit was written.
    pub service_path: PathBuf,
    /// Path where the timer unit was written.
    pub timer_path: PathBuf,
}

/// Timer status information.
#[derive(Debug, Clone)]
pub struct ScheduleStatus {
    /// Whether the timer unit is installed.
    pub is_installed: bool,
    /// Whether the timer is enabled.
    pub is_enabled: bool,
    /// Whether the timer is currently armed.
    pub is_active: bool,
    /// Output of `systemctl list-timers`.
    pub status_text: String,
}

impl ScheduleStatus {
    /// Get a short status string.
    #[must_use]
    pub const fn short_status(&self) -> &'static str {
        match (self.is_installed, self.is_enabled, self.is_active) {
            (false, _, _) => "not installed",
            (true, false, false) => "installed, disabled",
            (true, true, false) => "enabled, inactive",
            (true, false, true) => "active (not enabled)",
            (true, true, true) => "active",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(interval_minutes: u64) -> SystemdSchedule {
        let mut config = AppConfig {
            base_dir: Some(PathBuf::from("/srv/repost")),
            ..AppConfig::default()
        };
        config.schedule.interval_minutes = interval_minutes;
        SystemdSchedule::new(config, PathBuf::from("/srv/repost/config.toml"))
    }

    #[test]
    fn test_service_unit_runs_with_config() {
        let unit = schedule(30).generate_service_unit(Path::new("/usr/bin/repost-cursor"));
        assert!(unit.contains("Type=oneshot"));
        assert!(unit.contains(
            r#"ExecStart="/usr/bin/repost-cursor" --config "/srv/repost/config.toml" run"#
        ));
        assert!(unit.contains("WorkingDirectory=/srv/repost"));
    }

    #[test]
    fn test_service_unit_quotes_paths_with_spaces() {
        let config = AppConfig {
            base_dir: Some(PathBuf::from("/home/me/My Jobs")),
            ..AppConfig::default()
        };
        let schedule =
            SystemdSchedule::new(config, PathBuf::from("/home/me/My Jobs/100% \"daily\".toml"));
        let unit = schedule.generate_service_unit(Path::new("/opt/repost tools/repost-cursor"));

        assert!(unit.contains(
            r#"ExecStart="/opt/repost tools/repost-cursor" --config "/home/me/My Jobs/100%% \"daily\".toml" run"#
        ));
        assert!(unit.contains("WorkingDirectory=/home/me/My Jobs"));
    }

    #[test]
    fn test_install_requires_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let schedule = SystemdSchedule::new(AppConfig::default(), missing);

        let err = schedule.install().unwrap_err();
        assert!(matches!(err, AppError::Config { ref message } if message.contains("init")));
    }

    #[test]
    fn test_timer_unit_uses_interval() {
        let unit = schedule(30).generate_timer_unit();
        assert!(unit.contains("OnUnitActiveSec=30min"));
        assert!(unit.contains("WantedBy=timers.target"));

        let clamped = schedule(0).generate_timer_unit();
        assert!(clamped.contains("OnUnitActiveSec=1min"));
    }

    #[test]
    fn test_schedule_status_short() {
        let status = ScheduleStatus {
            is_installed: true,
            is_enabled: true,
            is_active: true,
            status_text: String::new(),
        };
        assert_eq!(status.short_status(), "active");

        let status = ScheduleStatus {
            is_installed: false,
            is_enabled: false,
            is_active: false,
            status_text: String::new(),
        };
        assert_eq!(status.short_status(), "not installed");
    }
}
