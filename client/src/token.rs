use std::sync::Mutex;

/// Name of the cookie holding the bearer token.
pub const AUTH_COOKIE: &str = "auth_token";

const COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Where the session token lives between requests.
pub trait TokenStore: Send + Sync {
    /// `None` when there is no usable token. Empty values count as absent.
    fn get(&self) -> Option<String>;
    fn set(&self, token: String);
    fn clear(&self);
}

/// Token store backed by the `auth_token` cookie.
#[derive(Debug, Default)]
pub struct CookieTokenStore {
    value: Mutex<Option<String>>,
}

impl CookieTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the token out of a `Cookie` request header.
    pub fn from_cookie_header(header: &str) -> Self {
        let token = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == AUTH_COOKIE)
            .map(|(_, value)| value.trim().to_string());

        Self {
            value: Mutex::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// `Set-Cookie` value that persists the current token, or expires the
    /// cookie when there is none.
    pub fn set_cookie_header(&self) -> String {
        match self.get() {
            Some(token) => format!(
                "{}={}; Path=/; Max-Age={}; SameSite=Lax",
                AUTH_COOKIE, token, COOKIE_MAX_AGE_SECS
            ),
            None => format!("{}=; Path=/; Max-Age=0; SameSite=Lax", AUTH_COOKIE),
        }
    }
}

impl TokenStore for CookieTokenStore {
    fn get(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn set(&self, token: String) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    fn clear(&self) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
