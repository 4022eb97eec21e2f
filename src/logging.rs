//! Tracing subscriber setup, done once by `main`.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LogConfig;

/// Keeps the file writer flushing until dropped; hold it for the whole run.
pub struct LogGuard {
  _file: Option<WorkerGuard>,
}

/// Filter precedence: RUST_LOG, then `-v` flags, then the config level.
fn filter(config: &LogConfig, verbosity: u8) -> EnvFilter {
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return filter;
  }
  let directive = match verbosity {
    0 => config.level.as_str(),
    1 => "debug",
    _ => "trace",
  };
  EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(config: &LogConfig, verbosity: u8) -> Result<LogGuard> {
  let stderr = fmt::layer()
    .with_target(false)
    .with_writer(std::io::stderr)
    .with_filter(filter(config, verbosity));

  let (file_layer, guard) = match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("log.file has no file name: {}", path.display()))?;
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .with_filter(filter(config, verbosity));
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(stderr)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(LogGuard { _file: guard })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbosity_overrides_config_level() {
    // Only meaningful without RUST_LOG in the environment
    if std::env::var_os("RUST_LOG").is_some() {
      return;
    }
    let config = LogConfig::default();
    assert_eq!(filter(&config, 0).to_string(), "info");
    assert_eq!(filter(&config, 1).to_string(), "debug");
    assert_eq!(filter(&config, 5).to_string(), "trace");
  }
}
