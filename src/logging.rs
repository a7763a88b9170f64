use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config;

const LOG_FILE: &str = "bursar.log";

/// Send tracing output to `<data_dir>/bursar/bursar.log`; the terminal is
/// owned by the UI. Filter from `BURSAR_LOG`, default `info`.
///
/// Keep the returned guard alive for the life of the process or buffered
/// lines are lost.
pub fn init() -> Result<WorkerGuard> {
  let dir = config::data_dir()?;
  let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("BURSAR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| color_eyre::eyre::eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
