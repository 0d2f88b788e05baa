//! Conversational edits to a generated resume, and questions about captured PDF regions.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::identity::SessionUser;
use crate::errors::AppError;
use crate::selection::capture::decode_png_data_url;
use crate::state::AppState;

const DEFAULT_IMAGE_QUERY: &str = "Please analyze this image";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub latex_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyResponse {
    pub success: bool,
    pub pdf: String,
    pub latex_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub response: String,
}

fn image_query(query: Option<&str>) -> &str {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_IMAGE_QUERY)
}

fn validate_modify(req: &ModifyRequest) -> Result<(), AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::Validation("Query is required".to_string()));
    }
    if req.latex_code.trim().is_empty() {
        return Err(AppError::Validation("LaTeX code is required".to_string()));
    }
    Ok(())
}

/// POST /api/chat/modify
pub async fn handle_modify(
    State(state): State<AppState>,
    Json(req): Json<ModifyRequest>,
) -> Result<Json<ModifyResponse>, AppError> {
    validate_modify(&req)?;

    let modified = state
        .service
        .modify_resume(req.query.trim(), &req.latex_code)
        .await?;
    info!("Applied chat edit ({} bytes of LaTeX)", modified.latex_code.len());

    Ok(Json(ModifyResponse {
        success: true,
        pdf: modified.pdf,
        latex_code: modified.latex_code,
    }))
}

/// POST /api/chat/process
///
/// Asks about an image: the one in the payload, else the caller's most recent capture.
pub async fn handle_process(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let image_data = match req.image_data.filter(|d| !d.trim().is_empty()) {
        Some(data) => data,
        None => state
            .selections
            .recent(&claims.user_id.to_string())
            .await?
            .map(|s| s.image_data)
            .ok_or_else(|| {
                AppError::Validation("No image provided and no recent selection".to_string())
            })?,
    };

    let png = decode_png_data_url(&image_data)
        .map_err(|e| AppError::Validation(format!("Invalid image: {e}")))?;
    let response = state
        .service
        .process_image(png, image_query(req.query.as_deref()))
        .await?;

    Ok(Json(ProcessResponse {
        success: true,
        response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_query() {
        assert_eq!(image_query(None), DEFAULT_IMAGE_QUERY);
        assert_eq!(image_query(Some("   ")), DEFAULT_IMAGE_QUERY);
        assert_eq!(image_query(Some(" What is this? ")), "What is this?");
    }

    #[test]
    fn test_modify_requires_query_and_latex() {
        let missing_query = ModifyRequest {
            query: " ".into(),
            latex_code: "\\section{A}".into(),
        };
        assert!(matches!(validate_modify(&missing_query), Err(AppError::Validation(_))));

        let missing_latex = ModifyRequest {
            query: "Shorten it".into(),
            latex_code: String::new(),
        };
        assert!(matches!(validate_modify(&missing_latex), Err(AppError::Validation(_))));
    }
}
