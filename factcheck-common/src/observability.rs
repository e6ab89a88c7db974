//! Logging setup shared by the server binary and integration tests.
//!
//! [`init_logging`] installs the global `tracing` subscriber exactly once. Every
//! event goes to a daily rolling file; `stderr` can mirror it. Later callers get
//! the originally resolved log file path back and nothing else happens.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flushes the file writer on drop, so it lives for the whole process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static ACTIVE_LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "FACTCHECK_LOG_DIR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line events.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the default log directory and the file prefix.
    pub app_name: &'static str,
    /// Overrides `FACTCHECK_LOG_DIR` and the `~/.local/share/<app_name>` default.
    pub log_dir: Option<PathBuf>,
    /// Mirror every event to `stderr` as well as the file.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "factcheck",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::default(),
            default_filter: "info".to_string(),
        }
    }
}

/// Install the process-wide subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(existing) = ACTIVE_LOG_FILE.get() {
        return Ok(existing.clone());
    }

    let dir = log_dir_for(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let log_file = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = FILE_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // `Option<Layer>` is itself a layer, so the stderr mirror is just `None` when off.
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .with(
                config
                    .emit_stderr
                    .then(|| fmt::layer().with_writer(std::io::stderr)),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(file_writer))
            .with(
                config
                    .emit_stderr
                    .then(|| fmt::layer().json().with_writer(std::io::stderr)),
            )
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = ACTIVE_LOG_FILE.set(log_file.clone());
    Ok(log_file)
}

/// Explicit setting, then `FACTCHECK_LOG_DIR`, then the per-user data dir.
fn log_dir_for(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
        .map(|dir| tilde_expand(&dir))
        .unwrap_or_else(|| user_data_dir(app_name))
}

fn tilde_expand(path: &Path) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn user_data_dir(app_name: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".local/share"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = log_dir_for("factcheck", Some(tmp.path()));
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn absolute_paths_are_untouched_by_home_expansion() {
        let p = Path::new("/var/log/factcheck");
        assert_eq!(tilde_expand(p), PathBuf::from("/var/log/factcheck"));
    }

    #[test]
    fn tilde_prefix_resolves_under_home() {
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                tilde_expand(Path::new("~/logs/factcheck")),
                PathBuf::from(home).join("logs/factcheck")
            );
        }
    }

    #[test]
    fn log_format_reads_lowercase_names() {
        assert_eq!(parse_format("json"), LogFormat::Json);
        assert_eq!(parse_format("text"), LogFormat::Text);
    }

    fn parse_format(raw: &str) -> LogFormat {
        use serde::de::value::{Error, StrDeserializer};
        use serde::de::IntoDeserializer;
        let de: StrDeserializer<'_, Error> = raw.into_deserializer();
        LogFormat::deserialize(de).unwrap()
    }
}
