//! Browser-side plumbing for the PubFlow app: the authenticated API client,
//! the auth token cookie, the navigation guard and the helpers the catalog
//! components format their data with.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod token;
pub mod views;

pub use api::{ApiClient, RequestBody, RequestOptions};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use guard::{guard, GuardDecision};
pub use navigation::{ExecutionContext, Navigator};
pub use token::{CookieTokenStore, TokenStore, AUTH_COOKIE};
