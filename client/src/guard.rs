//! Runs before every client-side navigation.

use crate::navigation::{HOME_PATH, LOGIN_PATH};

/// Reachable without a session.
const PUBLIC_ROUTES: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/forgot-password",
    "/auth/reset-password",
];

/// Pointless once signed in.
const GUEST_ONLY_ROUTES: &[&str] = &["/auth/login", "/auth/register", "/auth/forgot-password"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

pub fn guard(path: &str, has_token: bool) -> GuardDecision {
    let path = strip_query(path);

    if !has_token && !PUBLIC_ROUTES.iter().any(|r| path.starts_with(r)) {
        return GuardDecision::Redirect(LOGIN_PATH.to_string());
    }

    if has_token && GUEST_ONLY_ROUTES.iter().any(|r| path.starts_with(r)) {
        return GuardDecision::Redirect(HOME_PATH.to_string());
    }

    GuardDecision::Proceed
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_on_login_proceeds() {
        assert_eq!(guard("/auth/login", false), GuardDecision::Proceed);
        assert_eq!(guard("/auth/reset-password?code=x", false), GuardDecision::Proceed);
    }

    #[test]
    fn test_guest_on_protected_redirects_to_login() {
        assert_eq!(
            guard("/catalog/works", false),
            GuardDecision::Redirect("/auth/login".to_string())
        );
        assert_eq!(guard("/", false), GuardDecision::Redirect("/auth/login".to_string()));
    }

    #[test]
    fn test_signed_in_on_guest_route_redirects_home() {
        assert_eq!(guard("/auth/login", true), GuardDecision::Redirect("/".to_string()));
        assert_eq!(
            guard("/auth/register?plan=pro", true),
            GuardDecision::Redirect("/".to_string())
        );
    }

    #[test]
    fn test_signed_in_elsewhere_proceeds() {
        assert_eq!(guard("/catalog/works", true), GuardDecision::Proceed);
        // Reset links must work even with a stale session
        assert_eq!(guard("/auth/reset-password", true), GuardDecision::Proceed);
    }
}
