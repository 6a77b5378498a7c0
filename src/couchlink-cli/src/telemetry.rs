//! Logging for the couchlink binary
//!
//! Provides structured tracing with:
//! - JSON formatted logs to file
//! - Human-readable console output on stderr (stdout carries command output)
//! - Size-based rotation (10MB per file) plus daily rotation

use anyhow::Result;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "couchlink=info,couchlink_cli=info,couchlink_rs=info,couchlink_core=info";
const VERBOSE_FILTER: &str = "couchlink=debug,couchlink_cli=debug,couchlink_rs=debug,couchlink_core=debug";

/// Initialize tracing with file logging under `log_dir`
///
/// Returns a guard that must be kept alive to ensure logs are flushed
pub fn init_telemetry(log_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Format: couchlink.log.2026-02-04, rotated at 10MB or daily
    let file_appender = RollingFileAppender::new(
        log_dir.join("couchlink.log"),
        RollingConditionBasic::new()
            .daily()
            .max_size(10 * 1024 * 1024), // 10 MB
        9,
    )?;

    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(VERBOSE_FILTER)
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_thread_ids(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::debug!("Telemetry initialized with file logging to {:?}", log_dir);

    Ok(guard)
}
