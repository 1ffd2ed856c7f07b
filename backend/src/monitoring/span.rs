use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;
use uuid::Uuid;

use super::event::Envelope;
use super::scrub::redact_value;
use super::transport::Worker;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Ok,
    Cancelled,
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    DeadlineExceeded,
    InternalError,
    Unavailable,
    Unknown,
}

impl SpanStatus {
    pub fn from_http_status(code: u16) -> Self {
        match code {
            100..=399 => SpanStatus::Ok,
            400 | 422 => SpanStatus::InvalidArgument,
            401 => SpanStatus::Unauthenticated,
            403 => SpanStatus::PermissionDenied,
            404 => SpanStatus::NotFound,
            408 | 504 => SpanStatus::DeadlineExceeded,
            429 => SpanStatus::ResourceExhausted,
            499 => SpanStatus::Cancelled,
            503 => SpanStatus::Unavailable,
            500..=599 => SpanStatus::InternalError,
            _ => SpanStatus::Unknown,
        }
    }
}

/// A finished span as sent to the endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub name: String,
    pub op: String,
    pub status: SpanStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub profiled: bool,
    pub environment: String,
    pub release: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

pub(crate) struct SpanSink {
    pub worker: Worker,
    pub environment: String,
    pub release: String,
}

/// Named timing interval. Call [`Span::finish`] to record it.
pub struct Span {
    name: String,
    op: String,
    trace_id: Uuid,
    span_id: Uuid,
    started_at: DateTime<Utc>,
    start: Instant,
    status: SpanStatus,
    attributes: Map<String, Value>,
    profiled: bool,
    // None when tracking is off or the span was not sampled
    sink: Option<SpanSink>,
}

impl Span {
    pub(crate) fn new(name: &str, op: &str, sink: Option<SpanSink>, profiled: bool) -> Self {
        Self {
            name: name.to_string(),
            op: op.to_string(),
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start: Instant::now(),
            status: SpanStatus::Ok,
            attributes: Map::new(),
            profiled,
            sink,
        }
    }

    /// A span that only reports to the local log.
    pub fn detached(name: &str, op: &str) -> Self {
        Self::new(name, op, None, false)
    }

    pub fn is_sampled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn finish(mut self) -> f64 {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;

        let Some(sink) = self.sink.take() else {
            tracing::debug!(
                span = %self.name,
                op = %self.op,
                status = ?self.status,
                "Span finished in {:.1}ms",
                duration_ms
            );
            return duration_ms;
        };

        let mut attributes = Value::Object(std::mem::take(&mut self.attributes));
        redact_value(&mut attributes);
        let attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let record = SpanRecord {
            trace_id: self.trace_id,
            span_id: self.span_id,
            name: std::mem::take(&mut self.name),
            op: std::mem::take(&mut self.op),
            status: self.status,
            started_at: self.started_at,
            duration_ms,
            profiled: self.profiled,
            environment: sink.environment,
            release: sink.release,
            attributes,
        };

        if !sink.worker.enqueue(Envelope::Transaction(record)) {
            tracing::debug!("Monitoring worker gone, span dropped");
        }

        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_http() {
        assert_eq!(SpanStatus::from_http_status(200), SpanStatus::Ok);
        assert_eq!(SpanStatus::from_http_status(302), SpanStatus::Ok);
        assert_eq!(SpanStatus::from_http_status(401), SpanStatus::Unauthenticated);
        assert_eq!(SpanStatus::from_http_status(429), SpanStatus::ResourceExhausted);
        assert_eq!(SpanStatus::from_http_status(503), SpanStatus::Unavailable);
        assert_eq!(SpanStatus::from_http_status(500), SpanStatus::InternalError);
    }

    #[test]
    fn test_detached_span_finishes_locally() {
        let mut span = Span::detached("catalog.import", "task");
        span.set_attribute("rows", 12);
        span.set_status(SpanStatus::InternalError);
        assert!(!span.is_sampled());
        assert!(span.finish() >= 0.0);
    }
}
