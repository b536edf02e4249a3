//! Tracing subscriber setup with optional daily-rotated file output.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// File name prefix for the rolling application log.
const LOG_FILE_NAME: &str = "reqlog.log";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `to_file` the output goes to
/// a daily rolling file under `log_dir` (default `./logs`) through a
/// non-blocking writer; otherwise to stderr.
///
/// The returned guard flushes buffered file output when dropped, so hold it
/// for the lifetime of the process.
pub fn init_logging(level: &str, to_file: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if !to_file {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir.unwrap_or("./logs"), LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}
