//! Error and performance tracking.
//!
//! [`initialize`] installs a process-wide [`Monitor`] once. Every function in
//! this module is safe to call before that, or when tracking is disabled; in
//! those cases the call is written to the local log instead.

pub mod config;
pub mod event;
pub mod middleware;
pub mod monitor;
pub mod scrub;
pub mod span;
pub mod transport;

pub use config::MonitoringConfig;
pub use event::{Breadcrumb, CaptureContext, ExceptionInfo, Level, RequestContext, UserContext};
pub use middleware::{panic_response, track_requests, ErrorReport, RequestScope};
pub use monitor::Monitor;
pub use span::{Span, SpanStatus};

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use transport::HttpTransport;
use uuid::Uuid;

static MONITOR: OnceLock<Monitor> = OnceLock::new();

pub(crate) fn global() -> Option<&'static Monitor> {
    MONITOR.get()
}

pub fn is_enabled() -> bool {
    MONITOR.get().is_some()
}

/// Reads `MONITORING_*` from the environment and installs the tracking client.
pub fn initialize() -> bool {
    initialize_with(MonitoringConfig::from_env())
}

/// Returns true only when tracking was switched on by this call.
pub fn initialize_with(config: MonitoringConfig) -> bool {
    initialize_into(&MONITOR, config)
}

fn initialize_into(cell: &OnceLock<Monitor>, config: MonitoringConfig) -> bool {
    if cell.get().is_some() {
        tracing::warn!("Monitoring already initialized, ignoring second initialization");
        return false;
    }

    let Some(dsn) = config.dsn.clone() else {
        tracing::info!("MONITORING_DSN not set, error tracking disabled");
        return false;
    };

    if tokio::runtime::Handle::try_current().is_err() {
        tracing::error!("Monitoring needs a tokio runtime, error tracking disabled");
        return false;
    }

    let transport = match HttpTransport::new(&dsn) {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!("Failed to initialize monitoring: {}", e);
            return false;
        }
    };

    let environment = config.environment.clone();
    let release = config.release.clone();
    let traces_sample_rate = config.traces_sample_rate;

    if cell.set(Monitor::new(config, Arc::new(transport))).is_err() {
        tracing::warn!("Monitoring already initialized, ignoring second initialization");
        return false;
    }

    tracing::info!(
        %environment,
        %release,
        traces_sample_rate,
        "Monitoring initialized"
    );
    true
}

pub fn capture_exception<E>(err: &E, context: CaptureContext) -> Option<Uuid>
where
    E: std::error::Error + ?Sized,
{
    report_exception(MONITOR.get(), ExceptionInfo::from_error(err), context)
}

pub fn capture_message(message: &str, level: Level, context: CaptureContext) -> Option<Uuid> {
    report_message(MONITOR.get(), message, level, context)
}

pub fn add_breadcrumb(crumb: Breadcrumb) {
    record_breadcrumb(MONITOR.get(), crumb)
}

pub fn start_span(name: &str, op: &str) -> Span {
    match MONITOR.get() {
        Some(monitor) => monitor.start_span(name, op),
        None => Span::detached(name, op),
    }
}

/// Flushes queued events. Timeouts are logged, never returned.
pub async fn close(timeout: Duration) {
    let Some(monitor) = MONITOR.get() else {
        return;
    };

    if monitor.flush(timeout).await {
        tracing::info!("Monitoring events flushed");
    } else {
        tracing::warn!("Timed out after {:?} flushing monitoring events", timeout);
    }
}

pub(crate) fn report_exception(
    monitor: Option<&Monitor>,
    exception: ExceptionInfo,
    context: CaptureContext,
) -> Option<Uuid> {
    match monitor {
        Some(monitor) => monitor.capture_exception_info(exception, context),
        None if scrub::is_ignored(&exception) => {
            tracing::debug!(
                kind = %exception.kind,
                tags = ?context.tags,
                "Expected failure: {}",
                exception.value
            );
            None
        }
        None => {
            tracing::error!(
                kind = %exception.kind,
                tags = ?context.tags,
                "Unreported exception: {}",
                exception.value
            );
            None
        }
    }
}

pub(crate) fn report_message(
    monitor: Option<&Monitor>,
    message: &str,
    level: Level,
    context: CaptureContext,
) -> Option<Uuid> {
    if let Some(monitor) = monitor {
        return monitor.capture_message(message, level, context);
    }

    match level {
        Level::Debug => tracing::debug!(tags = ?context.tags, "{}", message),
        Level::Info => tracing::info!(tags = ?context.tags, "{}", message),
        Level::Warning => tracing::warn!(tags = ?context.tags, "{}", message),
        Level::Error | Level::Fatal => tracing::error!(tags = ?context.tags, "{}", message),
    }
    None
}

pub(crate) fn record_breadcrumb(monitor: Option<&Monitor>, crumb: Breadcrumb) {
    match monitor {
        Some(monitor) => monitor.add_breadcrumb(crumb),
        None => tracing::trace!(category = %crumb.category, data = ?crumb.data, "breadcrumb"),
    }
}
