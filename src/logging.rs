use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when FIELDSYNC_LOG is unset or invalid
const DEFAULT_FILTER: &str = "fieldsync=info";

/// Directory the daily log files are written to
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("fieldsync")
    .join("logs")
}

fn filter() -> EnvFilter {
  EnvFilter::try_from_env("FIELDSYNC_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Route tracing output to a daily log file; the terminal belongs to the UI.
///
/// Keep the returned guard alive for the whole run, dropping it flushes
/// buffered lines.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "fieldsync.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  fmt()
    .with_env_filter(filter())
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}
