use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::config::MonitoringConfig;
use super::event::{Breadcrumb, CaptureContext, Envelope, Event, ExceptionInfo, Level};
use super::scrub::{before_breadcrumb, before_send};
use super::span::{Span, SpanSink};
use super::transport::{Transport, Worker};

const MAX_BREADCRUMBS: usize = 100;

/// An initialized tracking client.
pub struct Monitor {
    config: MonitoringConfig,
    worker: Worker,
    breadcrumbs: Mutex<VecDeque<Breadcrumb>>,
}

impl Monitor {
    /// Spawns the delivery worker, so a tokio runtime must be running.
    pub fn new(config: MonitoringConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            worker: Worker::spawn(transport),
            breadcrumbs: Mutex::new(VecDeque::with_capacity(MAX_BREADCRUMBS)),
        }
    }

    pub fn add_breadcrumb(&self, crumb: Breadcrumb) {
        let Some(crumb) = before_breadcrumb(crumb) else {
            return;
        };

        let mut trail = self.breadcrumbs.lock().unwrap_or_else(|e| e.into_inner());
        if trail.len() == MAX_BREADCRUMBS {
            trail.pop_front();
        }
        trail.push_back(crumb);
    }

    pub fn capture_exception<E>(&self, err: &E, context: CaptureContext) -> Option<Uuid>
    where
        E: std::error::Error + ?Sized,
    {
        self.capture_exception_info(ExceptionInfo::from_error(err), context)
    }

    pub fn capture_exception_info(
        &self,
        exception: ExceptionInfo,
        context: CaptureContext,
    ) -> Option<Uuid> {
        let mut event = Event::new(Level::Error, context);
        event.exception = Some(exception);
        self.capture_event(event)
    }

    pub fn capture_message(
        &self,
        message: &str,
        level: Level,
        context: CaptureContext,
    ) -> Option<Uuid> {
        let mut event = Event::new(level, context);
        event.message = Some(message.to_string());
        self.capture_event(event)
    }

    fn capture_event(&self, mut event: Event) -> Option<Uuid> {
        event.environment = self.config.environment.clone();
        event.release = self.config.release.clone();
        event.breadcrumbs = self
            .breadcrumbs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();

        let Some(event) = before_send(event) else {
            tracing::debug!("Monitoring event dropped by filter");
            return None;
        };

        if self.config.debug {
            tracing::info!(event_id = %event.event_id, level = ?event.level, "Sending monitoring event");
        }

        let event_id = event.event_id;
        if self.worker.enqueue(Envelope::Event(event)) {
            Some(event_id)
        } else {
            tracing::warn!("Monitoring worker is not running, event {} lost", event_id);
            None
        }
    }

    pub fn start_span(&self, name: &str, op: &str) -> Span {
        let sampled = sample(self.config.traces_sample_rate);
        if !sampled {
            return Span::detached(name, op);
        }

        let sink = SpanSink {
            worker: self.worker.clone(),
            environment: self.config.environment.clone(),
            release: self.config.release.clone(),
        };
        Span::new(name, op, Some(sink), sample(self.config.profiles_sample_rate))
    }

    pub async fn flush(&self, timeout: Duration) -> bool {
        self.worker.flush(timeout).await
    }
}

fn sample(rate: f64) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        rand::random::<f64>() < rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::event::{RequestContext, UserContext};
    use crate::monitoring::scrub::REDACTED;
    use crate::monitoring::span::SpanStatus;
    use crate::monitoring::transport::testing::MemoryTransport;
    use serde_json::json;

    fn test_config() -> MonitoringConfig {
        MonitoringConfig {
            dsn: Some("https://ingest.example.com/api/1/events".to_string()),
            environment: "test".to_string(),
            release: "pubflow-server@0.0.0".to_string(),
            traces_sample_rate: 1.0,
            profiles_sample_rate: 0.0,
            debug: false,
        }
    }

    fn monitor() -> (Monitor, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::default());
        (Monitor::new(test_config(), transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_capture_exception_is_scrubbed() {
        let (monitor, transport) = monitor();

        let mut request = RequestContext {
            method: "POST".into(),
            url: "/api/v1/auth/login".into(),
            data: Some(json!({ "email": "a@b.c", "password": "hunter2" })),
            ..Default::default()
        };
        request.headers.insert("authorization".into(), "Bearer secret-token".into());

        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let id = monitor.capture_exception(
            &err,
            CaptureContext {
                request: Some(request),
                user: Some(UserContext {
                    id: Some("u1".into()),
                    tenant_id: Some("t1".into()),
                }),
                ..Default::default()
            },
        );
        assert!(id.is_some());
        assert!(monitor.flush(Duration::from_secs(1)).await);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let payload = &sent[0]["payload"];
        assert_eq!(payload["exception"]["type"], "Error");
        assert_eq!(payload["environment"], "test");
        assert_eq!(payload["user"]["tenant_id"], "t1");
        assert_eq!(payload["request"]["data"]["password"], REDACTED);
        assert!(payload["request"]["headers"].get("authorization").is_none());
        assert!(!sent[0].to_string().contains("secret-token"));
        assert!(!sent[0].to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_ignored_exception_is_not_sent() {
        let (monitor, transport) = monitor();

        let id = monitor.capture_exception_info(
            ExceptionInfo::new("Unauthorized", "Unauthorized"),
            CaptureContext::default(),
        );
        assert!(id.is_none());
        assert!(monitor.flush(Duration::from_secs(1)).await);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_breadcrumbs_attach_and_are_bounded() {
        let (monitor, transport) = monitor();

        monitor.add_breadcrumb(Breadcrumb::http("GET", "/health", 200, 1));
        for i in 0..(MAX_BREADCRUMBS + 5) {
            monitor.add_breadcrumb(Breadcrumb::new("test", format!("crumb {}", i)));
        }
        monitor.capture_message("sync stalled", Level::Warning, CaptureContext::default());
        monitor.flush(Duration::from_secs(1)).await;

        let sent = transport.sent();
        let crumbs = sent[0]["payload"]["breadcrumbs"].as_array().unwrap();
        assert_eq!(crumbs.len(), MAX_BREADCRUMBS);
        assert_eq!(crumbs[0]["message"], "crumb 5");
        assert!(crumbs.iter().all(|c| c["category"] != "http"));
        assert_eq!(sent[0]["payload"]["message"], "sync stalled");
    }

    #[tokio::test]
    async fn test_sampled_span_is_sent_with_redacted_attributes() {
        let (monitor, transport) = monitor();

        let mut span = monitor.start_span("catalog.match", "task");
        assert!(span.is_sampled());
        span.set_attribute("tracks", 40);
        span.set_attribute("apiKey", "ak_live");
        span.set_status(SpanStatus::DeadlineExceeded);
        span.finish();
        monitor.flush(Duration::from_secs(1)).await;

        let sent = transport.sent();
        assert_eq!(sent[0]["type"], "transaction");
        let payload = &sent[0]["payload"];
        assert_eq!(payload["name"], "catalog.match");
        assert_eq!(payload["status"], "deadline_exceeded");
        assert_eq!(payload["profiled"], false);
        assert_eq!(payload["attributes"]["tracks"], 40);
        assert_eq!(payload["attributes"]["apiKey"], REDACTED);
    }

    #[tokio::test]
    async fn test_zero_trace_rate_never_sends_spans() {
        let transport = Arc::new(MemoryTransport::default());
        let monitor = Monitor::new(
            MonitoringConfig {
                traces_sample_rate: 0.0,
                ..test_config()
            },
            transport.clone(),
        );

        monitor.start_span("noop", "task").finish();
        monitor.flush(Duration::from_secs(1)).await;
        assert!(transport.sent().is_empty());
    }
}
