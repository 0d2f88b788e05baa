//! Request identity extractors.
//!
//! `SessionUser` requires a verified session (cookie or bearer). `TokenEmail` is the
//! permissive variant used by the resume routes: it yields the verified email when there
//! is one and lets the handler fall back to an email supplied by the caller.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::auth::session::{verify_token, Claims, SESSION_COOKIE};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct SessionUser(pub Claims);

#[derive(Debug, Clone, Default)]
pub struct TokenEmail(pub Option<String>);

impl TokenEmail {
    /// Verified token email first, then the caller-provided one. Blank values count as absent.
    pub fn or_provided(self, provided: Option<&str>) -> Option<String> {
        self.0
            .filter(|e| !e.trim().is_empty())
            .or_else(|| {
                provided
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Bearer header wins over the cookie when both verify.
pub fn claims_from_headers(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    bearer_token(headers)
        .and_then(|t| verify_token(t, secret))
        .or_else(|| cookie_token(headers).and_then(|t| verify_token(&t, secret)))
}

pub fn has_session_cookie(headers: &HeaderMap) -> bool {
    cookie_token(headers).is_some()
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        claims_from_headers(&parts.headers, &state.config.jwt_secret)
            .map(SessionUser)
            .ok_or_else(AppError::unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for TokenEmail {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(TokenEmail(
            claims_from_headers(&parts.headers, &state.config.jwt_secret).map(|c| c.email),
        ))
    }
}
