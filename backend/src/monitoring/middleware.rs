use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

use super::event::{Breadcrumb, CaptureContext, ExceptionInfo, Level, RequestContext, UserContext};
use super::monitor::Monitor;
use super::scrub::redact_url;
use super::span::{Span, SpanStatus};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CONTEXT_HEADERS: &[&str] = &[
    "user-agent",
    "content-type",
    "referer",
    "x-forwarded-for",
    REQUEST_ID_HEADER,
];

const MAX_CAPTURED_BODY: usize = 64 * 1024;

/// Error details a handler leaves on its response for the monitoring hook.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Default)]
struct ScopeData {
    request: RequestContext,
    user: UserContext,
    body: Option<Bytes>,
}

/// Per-request monitoring scope, stored in request extensions.
#[derive(Clone, Default)]
pub struct RequestScope(Arc<Mutex<ScopeData>>);

impl RequestScope {
    fn new(request: RequestContext, body: Option<Bytes>) -> Self {
        Self(Arc::new(Mutex::new(ScopeData {
            request,
            user: UserContext::default(),
            body,
        })))
    }

    pub fn set_user(&self, user: UserContext) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).user = user;
    }

    fn capture_context(&self) -> CaptureContext {
        let data = self.0.lock().unwrap_or_else(|e| e.into_inner());

        let mut request = data.request.clone();
        request.data = data
            .body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok());

        let mut context = CaptureContext {
            request: Some(request),
            user: Some(data.user.clone()),
            ..Default::default()
        };
        if let Some(id) = &data.request.request_id {
            context.tags.insert("request_id".to_string(), id.clone());
        }
        if let Some(tenant) = &data.user.tenant_id {
            context.tags.insert("tenant_id".to_string(), tenant.clone());
        }
        context
    }
}

/// Request lifecycle hooks for the process-wide monitor.
pub async fn track_requests(req: Request, next: Next) -> Response {
    observe(super::global(), req, next).await
}

pub async fn observe(monitor: Option<&Monitor>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let (mut parts, body) = req.into_parts();

    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let method = parts.method.to_string();
    let url = redact_url(&parts.uri.to_string());

    let (body, captured) = if should_capture_body(&parts.headers) {
        match to_bytes(body, MAX_CAPTURED_BODY).await {
            Ok(bytes) => (Body::from(bytes.clone()), Some(bytes)),
            Err(e) => {
                tracing::debug!("Could not buffer request body for monitoring: {}", e);
                (Body::empty(), None)
            }
        }
    } else {
        (body, None)
    };

    let scope = RequestScope::new(
        RequestContext {
            method: method.clone(),
            url: url.clone(),
            headers: context_headers(&parts.headers),
            cookies: None,
            data: None,
            request_id: Some(request_id.clone()),
        },
        captured,
    );
    parts.extensions.insert(scope.clone());

    let span_name = format!("{} {}", method, parts.uri.path());
    let mut span = match monitor {
        Some(monitor) => monitor.start_span(&span_name, "http.server"),
        None => Span::detached(&span_name, "http.server"),
    };

    let mut response = next.run(Request::from_parts(parts, body)).await;

    let status = response.status();
    span.set_status(SpanStatus::from_http_status(status.as_u16()));
    span.set_attribute("http.status_code", status.as_u16());
    span.set_attribute("request_id", request_id.as_str());
    span.finish();

    let duration_ms = started.elapsed().as_millis() as u64;
    super::record_breadcrumb(
        monitor,
        Breadcrumb::http(&method, &url, status.as_u16(), duration_ms),
    );

    if let Some(report) = response.extensions().get::<ErrorReport>() {
        let context = scope
            .capture_context()
            .tag("status_code", status.as_u16().to_string());
        super::report_exception(
            monitor,
            ExceptionInfo::new(report.kind, report.message.clone()),
            context,
        );
    } else if status.is_server_error() {
        let context = scope
            .capture_context()
            .tag("status_code", status.as_u16().to_string());
        super::report_message(
            monitor,
            &format!("{} {} responded {}", method, url, status),
            Level::Error,
            context,
        );
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Panic handler for `CatchPanicLayer`, which must sit inside [`track_requests`]
/// so the resulting 500 reaches the error hook.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!("Handler panicked: {}", message);

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response();
    response.extensions_mut().insert(ErrorReport {
        kind: "Panic",
        message,
    });
    response
}

fn should_capture_body(headers: &HeaderMap) -> bool {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    // Only bodies with a known, bounded length are buffered
    let length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    is_json && matches!(length, Some(len) if len <= MAX_CAPTURED_BODY)
}

fn context_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    CONTEXT_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}
