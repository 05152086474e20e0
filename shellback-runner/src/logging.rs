//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output for interactive runs, plus optional daily-rotating file
//! output (the strategy's operators keep a persistent decision log). Level
//! comes from `RUST_LOG` when set, else from the config.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Guard for the non-blocking file writer; keep it alive for the process
/// lifetime or buffered log lines are lost on exit.
pub type LogGuard = tracing_appender::non_blocking::WorkerGuard;

/// Initialize the global tracing subscriber. Call once at program start.
pub fn init_logging(log_level: &str, log_dir: Option<&str>) -> Option<LogGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "shellback");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            None
        }
    }
}
