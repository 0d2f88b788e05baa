pub mod health;

use axum::{
    http::Uri,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::auth::gate::gate_pages;
use crate::auth::handlers as auth;
use crate::chat;
use crate::dashboard;
use crate::errors::AppError;
use crate::profile::handlers as profile;
use crate::resume::handlers as resume;
use crate::selection::handlers as selection;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/signup", post(auth::handle_signup))
        .route("/api/login", post(auth::handle_login))
        .route("/api/logout", post(auth::handle_logout))
        // Profiles
        .route(
            "/api/profile",
            get(profile::handle_get_profile).post(profile::handle_update_profile),
        )
        .route("/api/profile/merge", post(profile::handle_merge_profiles))
        .route("/api/profile/import", post(profile::handle_import_profile))
        // Resumes
        .route(
            "/api/resume",
            get(resume::handle_list_resumes).post(resume::handle_save_resume),
        )
        .route(
            "/api/resume/ats-score",
            get(resume::handle_get_ats_score).post(resume::handle_compute_ats_score),
        )
        .route("/api/resume/import", post(resume::handle_import_resumes))
        .route("/api/resume/generate", post(resume::handle_generate_resume))
        // Chat
        .route("/api/chat/modify", post(chat::handle_modify))
        .route("/api/chat/process", post(chat::handle_process))
        // Dashboard
        .route("/api/dashboard", get(dashboard::handle_dashboard))
        // PDF region selections
        .route(
            "/api/selections",
            get(selection::handle_list).post(selection::handle_capture),
        )
        .route("/api/selections/recent", get(selection::handle_recent))
        .route("/api/selections/menu", get(selection::handle_menu))
        .route("/api/selections/actions", post(selection::handle_action))
        .route("/api/selections/events", get(selection::handle_events))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    router.layer(middleware::from_fn(gate_pages))
}
