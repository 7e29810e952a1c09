use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with console output and a JSON log file named
/// `<phase>_<run_stamp>.log` under `log_dir`.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the whole run.
pub fn init_logging(log_dir: &Path, phase: &str, run_stamp: &str) -> WorkerGuard {
    // Logging is best-effort; a missing directory only loses the file layer output
    let _ = fs::create_dir_all(log_dir);

    let file_appender =
        tracing_appender::rolling::never(log_dir, format!("{phase}_{run_stamp}.log"));
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    // RUST_LOG wins when set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("comedy_scraper=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
