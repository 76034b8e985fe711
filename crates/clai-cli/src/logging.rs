use clai_core::AppPaths;
use clai_core::LOG_FILE_NAME;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CLAI_LOG";
const DEFAULT_FILTER: &str = "info";

/// Sends all tracing output to the log file in the app directory; the
/// terminal belongs to the UI. Keep the guard alive until exit to flush.
pub fn init(paths: &AppPaths) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let appender = tracing_appender::rolling::never(&paths.dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| format!("failed to initialise logging: {err}"))?;

    Ok(guard)
}
