use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::navigation::{ExecutionContext, LOGIN_PATH};
use crate::token::TokenStore;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    multipart::Form,
    Client, Method, Request, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub enum RequestBody {
    Json(Value),
    /// Multipart form; sets its own content type with the boundary.
    Form(Form),
}

#[derive(Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Applied after the defaults, so they win on conflict
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, form: Form) -> Self {
        self.body = Some(RequestBody::Form(form));
        self
    }

    pub fn header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Every call to the PubFlow API goes through here.
pub struct ApiClient {
    base_url: String,
    http: Client,
    tokens: Arc<dyn TokenStore>,
    context: ExecutionContext,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>, context: ExecutionContext) -> Self {
        Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            http: Client::new(),
            tokens,
            context,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    pub fn build_request(&self, endpoint: &str, options: RequestOptions) -> Result<Request> {
        let url = reqwest::Url::parse(&self.url(endpoint))
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let mut builder = self.http.request(options.method, url);

        if let Some(token) = self.tokens.get() {
            builder = builder.bearer_auth(token);
        }

        if !matches!(options.body, Some(RequestBody::Form(_))) {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        builder = builder.headers(options.headers);

        builder = match options.body {
            Some(RequestBody::Json(value)) => builder.body(serde_json::to_vec(&value)?),
            Some(RequestBody::Form(form)) => builder.multipart(form),
            None => builder,
        };

        Ok(builder.build()?)
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let request = self.build_request(endpoint, options)?;
        tracing::debug!("{} {}", request.method(), request.url());

        let response = self.http.execute(request).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::GET)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)?;
        self.request(endpoint, RequestOptions::new(Method::POST).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::DELETE)).await
    }

    fn handle_unauthorized(&self) {
        tracing::info!("Session rejected by API, clearing auth token");
        self.tokens.clear();
        if self.context.is_browser() {
            self.context.navigate_to(LOGIN_PATH);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Navigator;
    use crate::token::CookieTokenStore;
    use axum::{
        http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use pubflow_shared::{Track, TrackStatus};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNavigator {
        visited: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate_to(&self, path: &str) {
            self.visited.lock().unwrap().push(path.to_string());
        }
    }

    #[derive(Default)]
    struct CountingStore {
        inner: CookieTokenStore,
        clears: AtomicUsize,
    }

    impl TokenStore for CountingStore {
        fn get(&self) -> Option<String> {
            self.inner.get()
        }
        fn set(&self, token: String) {
            self.inner.set(token)
        }
        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.inner.clear()
        }
    }

    fn client_for(base: &str, tokens: Arc<dyn TokenStore>, context: ExecutionContext) -> ApiClient {
        ApiClient::new(
            &ClientConfig {
                api_base: base.to_string(),
            },
            tokens,
            context,
        )
    }

    fn header_value(headers: &AxumHeaders, name: &str) -> Value {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(Value::from)
            .unwrap_or(Value::Null)
    }

    async fn spawn_api() -> String {
        let app = Router::new()
            .route(
                "/api/v1/echo",
                post(|headers: AxumHeaders, body: String| async move {
                    Json(json!({
                        "authorization": header_value(&headers, "authorization"),
                        "contentType": header_value(&headers, "content-type"),
                        "body": body,
                    }))
                }),
            )
            .route(
                "/api/v1/catalog/tracks/t1",
                get(|| async {
                    Json(json!({
                        "id": "t1",
                        "title": "Dancing On My Own",
                        "artists": ["Robyn"],
                        "status": "matched"
                    }))
                }),
            )
            .route("/api/v1/expired", get(|| async { AxumStatus::UNAUTHORIZED }))
            .route(
                "/api/v1/broken",
                get(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }),
            )
            .route("/api/v1/empty", axum::routing::delete(|| async { AxumStatus::NO_CONTENT }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/v1", addr)
    }

    #[test]
    fn test_no_token_no_authorization_header() {
        let client = client_for(
            "http://localhost:3001/api/v1",
            Arc::new(CookieTokenStore::new()),
            ExecutionContext::Server,
        );
        let request = client
            .build_request("/catalog/tracks", RequestOptions::default())
            .unwrap();

        assert!(request.headers().get("authorization").is_none());
        assert_eq!(request.headers()["content-type"], "application/json");
        assert_eq!(request.url().as_str(), "http://localhost:3001/api/v1/catalog/tracks");
    }

    #[test]
    fn test_empty_token_no_authorization_header() {
        let tokens = Arc::new(CookieTokenStore::new());
        tokens.set(String::new());
        let client = client_for("http://localhost:3001/api/v1", tokens, ExecutionContext::Server);

        let request = client.build_request("me", RequestOptions::default()).unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_bearer_header_and_caller_overrides() {
        let tokens = Arc::new(CookieTokenStore::new());
        tokens.set("tok-1".to_string());
        let client = client_for("http://localhost:3001/api/v1/", tokens, ExecutionContext::Server);

        let options = RequestOptions::new(Method::PUT)
            .json(json!({ "title": "Work" }))
            .header("content-type", HeaderValue::from_static("application/vnd.pubflow+json"));
        let request = client.build_request("works/1", options).unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.headers()["authorization"], "Bearer tok-1");
        assert_eq!(request.headers()["content-type"], "application/vnd.pubflow+json");
        assert_eq!(request.url().as_str(), "http://localhost:3001/api/v1/works/1");
    }

    #[test]
    fn test_form_body_keeps_multipart_content_type() {
        let client = client_for(
            "http://localhost:3001/api/v1",
            Arc::new(CookieTokenStore::new()),
            ExecutionContext::Server,
        );
        let form = Form::new().text("kind", "cwr");
        let request = client
            .build_request("imports", RequestOptions::new(Method::POST).form(form))
            .unwrap();

        let content_type = request.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_absolute_endpoint_is_used_verbatim() {
        let client = client_for(
            "http://localhost:3001/api/v1",
            Arc::new(CookieTokenStore::new()),
            ExecutionContext::Server,
        );
        let request = client
            .build_request("https://uploads.example.com/x", RequestOptions::default())
            .unwrap();
        assert_eq!(request.url().host_str(), Some("uploads.example.com"));
    }

    #[tokio::test]
    async fn test_round_trip_sends_token_and_json() {
        let base = spawn_api().await;
        let tokens = Arc::new(CookieTokenStore::new());
        tokens.set("tok-2".to_string());
        let client = client_for(&base, tokens, ExecutionContext::Server);

        let echoed: Value = client.post("echo", &json!({ "a": 1 })).await.unwrap();
        assert_eq!(echoed["authorization"], "Bearer tok-2");
        assert_eq!(echoed["contentType"], "application/json");
        assert_eq!(echoed["body"], r#"{"a":1}"#);

        let track: Track = client.get("catalog/tracks/t1").await.unwrap();
        assert_eq!(track.status, TrackStatus::Matched);

        let nothing: Option<Value> = client.delete("empty").await.unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_in_browser_clears_and_redirects() {
        let base = spawn_api().await;
        let tokens = Arc::new(CountingStore::default());
        tokens.set("stale".to_string());
        let navigator = Arc::new(RecordingNavigator::default());
        let client = client_for(&base, tokens.clone(), ExecutionContext::Browser(navigator.clone()));

        let result: Result<Value> = client.get("expired").await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert_eq!(tokens.clears.load(Ordering::SeqCst), 1);
        assert!(tokens.get().is_none());
        assert_eq!(*navigator.visited.lock().unwrap(), vec![LOGIN_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_unauthorized_on_server_only_clears() {
        let base = spawn_api().await;
        let tokens = Arc::new(CountingStore::default());
        tokens.set("stale".to_string());
        let client = client_for(&base, tokens.clone(), ExecutionContext::Server);

        let result: Result<Value> = client.get("expired").await;
        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert_eq!(tokens.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_unchanged() {
        let base = spawn_api().await;
        let tokens = Arc::new(CountingStore::default());
        tokens.set("fine".to_string());
        let navigator = Arc::new(RecordingNavigator::default());
        let client = client_for(&base, tokens.clone(), ExecutionContext::Browser(navigator.clone()));

        let result: Result<Value> = client.get("broken").await;
        match result {
            Err(ClientError::Http { status, body }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(tokens.clears.load(Ordering::SeqCst), 0);
        assert_eq!(tokens.get().as_deref(), Some("fine"));
        assert!(navigator.visited.lock().unwrap().is_empty());
    }
}
