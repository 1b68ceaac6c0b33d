//! Tracing subscriber setup

use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "cookalong.log";

/// Format timestamps using the system's local time via chrono
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Default log directory (~/.cookalong/logs)
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".cookalong").join("logs"))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn open_log_file(log_dir: &Path) -> Option<std::fs::File> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
        return None;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
        .ok()
}

/// Install the global subscriber
///
/// Console output goes to stderr so stdout stays free for the cooking
/// transcript. `RUST_LOG` overrides the default `info` filter. Calling this
/// twice is harmless: the second subscriber is not installed.
pub fn init_logging(log_dir: Option<&Path>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTimer);

    let file_layer = log_dir.and_then(open_log_file).map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_timer(LocalTimer)
            .with_ansi(false)
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        init_logging(Some(dir.path()));
        init_logging(Some(dir.path()));
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_default_log_dir() {
        let dir = default_log_dir();
        assert!(dir.ends_with(".cookalong/logs") || dir == PathBuf::from("/tmp"));
    }
}
