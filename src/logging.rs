use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the file writer flushing until dropped.
pub struct LogGuard {
  _guard: WorkerGuard,
}

/// Log to a daily-rolling file under `data_dir/logs`, and to stderr when verbose.
///
/// `RUST_LOG` overrides `level`.
pub fn init(data_dir: &Path, level: &str, verbose: bool) -> Result<LogGuard> {
  let env_filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .unwrap_or_else(|_| EnvFilter::new("info"));

  let log_dir = data_dir.join("logs");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "fvocab.log");
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
  let file_layer = fmt::layer()
    .with_writer(file_writer)
    .with_ansi(false)
    .with_target(true);

  let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(LogGuard { _guard: guard })
}
