use std::sync::Arc;

pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/";

/// Performs client-side navigations.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

/// Where the code runs. Only a browser can navigate.
#[derive(Clone)]
pub enum ExecutionContext {
    Browser(Arc<dyn Navigator>),
    Server,
}

impl ExecutionContext {
    pub fn is_browser(&self) -> bool {
        matches!(self, ExecutionContext::Browser(_))
    }

    /// No-op outside the browser.
    pub fn navigate_to(&self, path: &str) {
        match self {
            ExecutionContext::Browser(navigator) => navigator.navigate_to(path),
            ExecutionContext::Server => {
                tracing::debug!("Skipping navigation to {} outside the browser", path)
            }
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionContext::Browser(_) => f.write_str("Browser"),
            ExecutionContext::Server => f.write_str("Server"),
        }
    }
}
