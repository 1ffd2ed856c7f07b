//! Filters applied to everything before it leaves the process.

use serde_json::Value;

use super::event::{Breadcrumb, Event, ExceptionInfo, RequestContext};

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key"];

const SENSITIVE_FIELDS: &[&str] = &["password", "token", "secret", "apiKey", "creditCard"];

/// Expected failures matched on the exception kind.
const IGNORED_KINDS: &[&str] = &[
    "RateLimited",
    "TooManyRequests",
    "Unauthorized",
    "Forbidden",
    "TokenExpired",
    "ConnectionReset",
    "ConnectionRefused",
    "ConnectionAborted",
    "TimedOut",
    "BrokenPipe",
];

/// Expected failures matched (case-insensitively) inside the exception value.
const IGNORED_MESSAGES: &[&str] = &[
    "too many requests",
    "rate limit",
    "connection reset",
    "connection refused",
    "connection aborted",
    "timed out",
    "broken pipe",
];

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn is_sensitive_field(name: &str) -> bool {
    SENSITIVE_FIELDS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_ignored(exception: &ExceptionInfo) -> bool {
    if IGNORED_KINDS.contains(&exception.kind.as_str()) {
        return true;
    }
    let value = exception.value.to_ascii_lowercase();
    IGNORED_MESSAGES.iter().any(|m| value.contains(m))
}

/// Replaces sensitive fields anywhere in a JSON document.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_field(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

/// Masks the values of sensitive query parameters, leaving the path intact.
pub fn redact_url(url: &str) -> String {
    let Some((path, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let (query, fragment) = match query.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (query, None),
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_field(key) => format!("{}={}", key, REDACTED),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(fragment) => format!("{}?{}#{}", path, query, fragment),
        None => format!("{}?{}", path, query),
    }
}

pub fn scrub_request(request: &mut RequestContext) {
    request.url = redact_url(&request.url);
    request.headers.retain(|name, _| !is_sensitive_header(name));
    request.cookies = None;
    if let Some(data) = request.data.as_mut() {
        redact_value(data);
    }
}

/// Runs on every event; `None` means the event is dropped.
pub fn before_send(mut event: Event) -> Option<Event> {
    if event.exception.as_ref().is_some_and(is_ignored) {
        return None;
    }

    if let Some(request) = event.request.as_mut() {
        scrub_request(request);
    }

    for (key, value) in event.extra.iter_mut() {
        if is_sensitive_field(key) {
            *value = Value::String(REDACTED.to_string());
        } else {
            redact_value(value);
        }
    }

    for crumb in event.breadcrumbs.iter_mut() {
        for (key, value) in crumb.data.iter_mut() {
            if is_sensitive_field(key) {
                *value = Value::String(REDACTED.to_string());
            } else if key == "url" {
                if let Some(url) = value.as_str().map(redact_url) {
                    *value = Value::String(url);
                }
            } else {
                redact_value(value);
            }
        }
    }

    Some(event)
}

/// Health-check traffic is noise in every trail.
pub fn before_breadcrumb(crumb: Breadcrumb) -> Option<Breadcrumb> {
    if crumb.category == "http" {
        let url = crumb.data.get("url").and_then(Value::as_str).unwrap_or("");
        if url.contains("/health") {
            return None;
        }
    }
    Some(crumb)
}
