use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{create_user, find_by_email};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{expired_session_cookie, issue_token, session_cookie};
use crate::errors::AppError;
use crate::profile::document::initial_document;
use crate::profile::store::{ensure_profile, find_document};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    fn normalized(self) -> Result<(String, String), AppError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }
        Ok((email, self.password))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub profile: Value,
}

/// POST /api/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let (email, password) = credentials.normalized()?;

    let password_hash = hash_password(&password)?;
    let user_id = create_user(&state.db, &email, &password_hash)
        .await?
        .ok_or_else(|| AppError::Conflict("User already exists".to_string()))?;

    ensure_profile(&state.db, user_id, &email).await?;
    info!("Created account {user_id}");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user_id,
        }),
    ))
}

/// POST /api/login
///
/// Issues a session token, returned in the body and as an HTTP-only cookie.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    let (email, password) = credentials.normalized()?;
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = find_by_email(&state.db, &email).await?.ok_or_else(invalid)?;
    if !verify_password(&password, &user.password_hash) {
        return Err(invalid());
    }

    // Accounts created before profiles existed get one on first login.
    let profile = match find_document(&state.db, user.id).await? {
        Some(doc) => doc,
        None => {
            ensure_profile(&state.db, user.id, &user.email).await?;
            initial_document(user.id, &user.email)
        }
    };

    let ttl = state.config.session_ttl_secs;
    let token = issue_token(user.id, &user.email, &state.config.jwt_secret, ttl)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&token, ttl, state.config.cookie_secure)?,
    );
    info!("User {} logged in", user.id);

    Ok((
        headers,
        Json(LoginResponse {
            token,
            user_id: user.id,
            email: user.email,
            profile,
        }),
    ))
}

/// POST /api/logout
pub async fn handle_logout() -> (HeaderMap, Json<Value>) {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, expired_session_cookie());
    (headers, Json(json!({ "message": "Logged out successfully" })))
}
