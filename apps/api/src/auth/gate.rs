//! Page gating: a fixed allow/deny list keyed on path prefix and session-cookie presence.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::identity::has_session_cookie;

const PROTECTED_PREFIXES: &[&str] = &[
    "/home",
    "/dashboard",
    "/profile",
    "/view-resume",
    "/generated-resume",
];

const AUTH_PAGES: &[&str] = &["/sign-in", "/sign-up"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToSignIn,
    RedirectHome,
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn gate_decision(path: &str, has_token: bool) -> GateDecision {
    let protected = PROTECTED_PREFIXES.iter().any(|p| under_prefix(path, p));
    let auth_page = AUTH_PAGES.contains(&path);

    if protected && !has_token {
        GateDecision::RedirectToSignIn
    } else if auth_page && has_token {
        GateDecision::RedirectHome
    } else {
        GateDecision::Allow
    }
}

/// Axum middleware applying [`gate_decision`] to every request.
pub async fn gate_pages(request: Request, next: Next) -> Response {
    let decision = gate_decision(request.uri().path(), has_session_cookie(request.headers()));
    match decision {
        GateDecision::Allow => next.run(request).await,
        GateDecision::RedirectToSignIn => {
            tracing::debug!("no session for {}, redirecting to sign-in", request.uri().path());
            Redirect::temporary("/sign-in").into_response()
        }
        GateDecision::RedirectHome => Redirect::temporary("/home").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_pages_need_a_token() {
        for path in ["/home", "/dashboard/stats", "/profile", "/view-resume/42", "/generated-resume"] {
            assert_eq!(gate_decision(path, false), GateDecision::RedirectToSignIn, "{path}");
            assert_eq!(gate_decision(path, true), GateDecision::Allow, "{path}");
        }
    }

    #[test]
    fn test_auth_pages_bounce_signed_in_users() {
        assert_eq!(gate_decision("/sign-in", true), GateDecision::RedirectHome);
        assert_eq!(gate_decision("/sign-up", true), GateDecision::RedirectHome);
        assert_eq!(gate_decision("/sign-in", false), GateDecision::Allow);
    }

    #[test]
    fn test_api_and_lookalike_paths_pass() {
        assert_eq!(gate_decision("/api/profile", false), GateDecision::Allow);
        assert_eq!(gate_decision("/profiles", false), GateDecision::Allow);
        assert_eq!(gate_decision("/homepage", false), GateDecision::Allow);
        assert_eq!(gate_decision("/", false), GateDecision::Allow);
    }
}
