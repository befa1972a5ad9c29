//! Logging setup
//!
//! Events go to the console and to two files under the log directory:
//! `eventLogger.log` receives everything the filter lets through,
//! `errorlogger.log` receives errors only.

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter,
    Layer,
};

use crate::config::LoggingConfig;

pub const EVENT_LOG_FILE: &str = "eventLogger.log";
pub const ERROR_LOG_FILE: &str = "errorlogger.log";

/// Keeps the file writers flushing; hold it until shutdown
pub struct LogGuards {
    _events: WorkerGuard,
    _errors: WorkerGuard,
}

/// Install the process-wide subscriber
pub fn init(config: &LoggingConfig) -> anyhow::Result<LogGuards> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create log directory {}", config.dir.display()))?;

    let (events, events_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&config.dir, EVENT_LOG_FILE));
    let (errors, errors_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&config.dir, ERROR_LOG_FILE));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(events))
        .with(error_layer(errors))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LogGuards {
        _events: events_guard,
        _errors: errors_guard,
    })
}

/// Plain-text layer that only lets ERROR events through to `writer`
pub(crate) fn error_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::ERROR)
}
