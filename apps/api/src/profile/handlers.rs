use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::accounts::find_by_id;
use crate::auth::identity::SessionUser;
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::profile::document::{combine_with_account, prepare_update};
use crate::profile::merge::merge_profile;
use crate::profile::store::{find_document, find_profile, upsert_fields};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    #[serde(default)]
    pub draft: Profile,
    #[serde(default)]
    pub incoming: Profile,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub success: bool,
    pub profile: Profile,
}

/// GET /api/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Result<Json<Value>, AppError> {
    let document = find_document(&state.db, claims.user_id).await?;
    let account = find_by_id(&state.db, claims.user_id).await?;
    Ok(Json(combine_with_account(
        document,
        claims.user_id,
        account.as_ref(),
    )))
}

/// POST /api/profile
///
/// Partial update: only the top-level keys present in the body are replaced.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let fields = prepare_update(body, claims.user_id)?;
    let keys = fields.len();
    let document = upsert_fields(&state.db, claims.user_id, fields).await?;
    info!("Updated {keys} profile fields for user {}", claims.user_id);
    Ok(Json(json!({ "success": true, "data": document })))
}

/// POST /api/profile/merge
pub async fn handle_merge_profiles(Json(req): Json<MergeRequest>) -> Json<MergeResponse> {
    Json(MergeResponse {
        success: true,
        profile: merge_profile(&req.draft, &req.incoming),
    })
}

fn is_pdf_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// POST /api/profile/import
///
/// Parses an uploaded resume PDF and merges it into the stored profile. The merged draft
/// is returned for review; nothing is saved.
pub async fn handle_import_profile(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    mut multipart: Multipart,
) -> Result<Json<MergeResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    if !is_pdf_name(&file_name) {
        return Err(AppError::Validation("Please upload a PDF file".to_string()));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let incoming = state.service.parse_resume(&file_name, bytes.to_vec()).await?;
    let draft = find_profile(&state.db, claims.user_id).await?;
    info!("Merging imported resume '{file_name}' into profile of {}", claims.user_id);

    Ok(Json(MergeResponse {
        success: true,
        profile: merge_profile(&draft, &incoming),
    }))
}
