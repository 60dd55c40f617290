// 📝 Logging - tracing subscriber setup shared by both binaries

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter for our crate at `log_level`, everything else at warn.
/// `RUST_LOG` replaces it entirely when set.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("book_distribution={log_level},warn")))
}

/// Install the global subscriber.
///
/// With `log_file` set, events are appended to that file instead of stderr
/// (the terminal UI owns the screen).
pub fn init_tracing(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = env_filter(log_level);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
