//! Logging configuration for shopinsight.
//!
//! Logs go to stderr by default. When `[logging] file` is configured they are
//! appended to that file instead, without ANSI colors.

use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Initializes logging to the given file.
///
/// Falls back to stderr if the file cannot be opened, so a bad path never
/// silences the service.
pub fn init_file_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Warning: Could not create log directory: {e}");
                init_stderr_logging();
                return;
            }
        }
    }

    let log_file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {}: {e}", path.display());
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging according to the optional configured file.
pub fn init(file: Option<&Path>) {
    match file {
        Some(path) => init_file_logging(path),
        None => init_stderr_logging(),
    }
}
