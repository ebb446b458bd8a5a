use tracing::{
    Level, info,
    subscriber::{SetGlobalDefaultError, set_global_default},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt};

use crate::directories::config_dir;

const LOG_FILE_NAME: &str = "wlx-screen.log";

/// Keeps the non-blocking writers flushing until dropped.
pub struct LoggerGuards {
    _std: WorkerGuard,
    _file: WorkerGuard,
}

/// Logs to stdout and to a log file in the config directory.
pub fn setup_logger(debug: bool) -> Result<LoggerGuards, SetGlobalDefaultError> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = tracing_subscriber::filter::Targets::new().with_default(level);

    // stdout logger
    let (std_writer, std_guard) = tracing_appender::non_blocking(std::io::stdout());
    let std_logger = tracing_subscriber::fmt::layer()
        .with_writer(std_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    // file logger, replaced on every start
    let file_appender = tracing_appender::rolling::never(config_dir(), LOG_FILE_NAME);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_logger = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    // Register loggers
    let collector = tracing_subscriber::registry()
        .with(std_logger)
        .with(file_logger)
        .with(filter);

    set_global_default(collector)?;

    info!("Logger started at {level}");

    Ok(LoggerGuards {
        _std: std_guard,
        _file: file_guard,
    })
}
