use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::identity::TokenEmail;
use crate::errors::AppError;
use crate::models::resume::{ResumeFormData, ResumeRow};
use crate::resume::ats::{format_job_details, job_details, AtsScore};
use crate::resume::import::parse_import;
use crate::resume::store::{
    find_for_email, find_id_by_role, insert_imported, insert_resume, list_for_email,
    set_ats_score, update_resume, ResumeParams,
};
use crate::resume_service::GenerateResumeRequest;
use crate::state::AppState;

const EMAIL_REQUIRED: &str = "User email is required";

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsLookupQuery {
    pub email: Option<String>,
    pub resume_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResumeRequest {
    #[serde(default)]
    pub form_data: ResumeFormData,
    #[serde(default)]
    pub pdf_data: Option<String>,
    #[serde(default)]
    pub latex_code: Option<String>,
    #[serde(default)]
    pub ats_score: Option<Value>,
    #[serde(default)]
    pub update_existing: bool,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResumeResponse {
    pub success: bool,
    pub message: String,
    pub resume_id: Uuid,
    pub updated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub resumes: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub form_data: ResumeFormData,
    #[serde(default)]
    pub resume: Option<Value>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub saved: bool,
    pub resume_id: Option<Uuid>,
    pub pdf: String,
    pub latex_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsComputeRequest {
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub form_data: ResumeFormData,
    #[serde(default)]
    pub latex_code: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

fn present(value: &Option<Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// POST /api/resume
///
/// Saves a resume. An existing resume for the same role is overwritten only when the
/// caller asks for it.
pub async fn handle_save_resume(
    State(state): State<AppState>,
    token: TokenEmail,
    Json(req): Json<SaveResumeRequest>,
) -> Result<(StatusCode, Json<SaveResumeResponse>), AppError> {
    req.form_data.validate()?;
    let user_email = token.or_provided(req.user_email.as_deref());

    let params = ResumeParams {
        user_email: user_email.as_deref(),
        form_data: &req.form_data,
        pdf_data: req.pdf_data.as_deref(),
        latex_code: req.latex_code.as_deref(),
        ats_score: req.ats_score.as_ref(),
    };

    let existing = find_id_by_role(&state.db, user_email.as_deref(), &req.form_data.role).await?;
    match existing {
        Some(id) if req.update_existing => {
            update_resume(&state.db, id, params).await?;
            Ok((
                StatusCode::OK,
                Json(SaveResumeResponse {
                    success: true,
                    message: "Resume updated successfully".to_string(),
                    resume_id: id,
                    updated: true,
                }),
            ))
        }
        _ => {
            let id = insert_resume(&state.db, params).await?;
            Ok((
                StatusCode::CREATED,
                Json(SaveResumeResponse {
                    success: true,
                    message: "Resume data saved successfully".to_string(),
                    resume_id: id,
                    updated: false,
                }),
            ))
        }
    }
}

/// GET /api/resume?email=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    token: TokenEmail,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Value>, AppError> {
    let email = token
        .or_provided(query.email.as_deref())
        .ok_or_else(|| AppError::Validation(EMAIL_REQUIRED.to_string()))?;

    let resumes: Vec<ResumeRow> = list_for_email(&state.db, &email).await?;
    Ok(Json(json!({ "success": true, "resumes": resumes })))
}

/// GET /api/resume/ats-score?email=&resumeId=
pub async fn handle_get_ats_score(
    State(state): State<AppState>,
    token: TokenEmail,
    Query(query): Query<AtsLookupQuery>,
) -> Result<Json<Value>, AppError> {
    let email = token
        .or_provided(query.email.as_deref())
        .ok_or_else(|| AppError::Validation(EMAIL_REQUIRED.to_string()))?;
    let not_found = || AppError::NotFound("Resume not found".to_string());

    // An id that is not a UUID cannot match any resume.
    let resume_id = match query.resume_id.as_deref().filter(|id| !id.is_empty()) {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| not_found())?),
        None => None,
    };

    let resume = find_for_email(&state.db, &email, resume_id)
        .await?
        .ok_or_else(not_found)?;
    let score = AtsScore::normalize(resume.ats_score.as_ref().unwrap_or(&Value::Null));

    Ok(Json(json!({ "success": true, "atsScore": score })))
}

/// POST /api/resume/import
///
/// Moves resumes kept in browser storage into the caller's account. Requires a verified
/// session email.
pub async fn handle_import_resumes(
    State(state): State<AppState>,
    token: TokenEmail,
    Json(req): Json<ImportRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let resumes = parse_import(req.resumes, Utc::now())?;
    let email = token.or_provided(None).ok_or_else(|| {
        AppError::Unauthorized("Authentication required to import resumes".to_string())
    })?;

    let ids = insert_imported(&state.db, &email, &resumes).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{} resumes imported successfully", ids.len()),
            "insertedIds": ids,
        })),
    ))
}

/// POST /api/resume/generate
///
/// Calls the generator, then saves the result as a new resume. A failed save is logged
/// and reported through `saved`, the generated resume is still returned.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    token: TokenEmail,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if !present(&req.resume) && !present(&req.profile) {
        return Err(AppError::Validation(
            "Please either upload a resume or import your profile.".to_string(),
        ));
    }
    req.form_data.validate()?;

    let empty = json!({});
    let details = job_details(&req.form_data);
    let generated = state
        .service
        .generate_resume(&GenerateResumeRequest {
            job_details: &details,
            resume: req.resume.as_ref().filter(|v| !v.is_null()).unwrap_or(&empty),
            profile: req.profile.as_ref().filter(|v| !v.is_null()).unwrap_or(&empty),
        })
        .await?;
    info!("Generated resume for role '{}'", req.form_data.role);

    let user_email = token.or_provided(req.user_email.as_deref());
    let saved = insert_resume(
        &state.db,
        ResumeParams {
            user_email: user_email.as_deref(),
            form_data: &req.form_data,
            pdf_data: Some(&generated.pdf),
            latex_code: Some(&generated.latex_code),
            ats_score: None,
        },
    )
    .await;

    let resume_id = match saved {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Generated resume could not be saved: {e}");
            None
        }
    };

    Ok(Json(GenerateResponse {
        success: true,
        saved: resume_id.is_some(),
        resume_id,
        pdf: generated.pdf,
        latex_code: generated.latex_code,
    }))
}

/// POST /api/resume/ats-score
///
/// Scores LaTeX source against the form's job details and stores the result on the
/// caller's resume when one is named.
pub async fn handle_compute_ats_score(
    State(state): State<AppState>,
    token: TokenEmail,
    Json(req): Json<AtsComputeRequest>,
) -> Result<Json<Value>, AppError> {
    if req.latex_code.trim().is_empty() {
        return Err(AppError::Validation("LaTeX code is required".to_string()));
    }

    let raw = state
        .service
        .calculate_ats_score(&format_job_details(&req.form_data), &req.latex_code)
        .await?;
    let score = AtsScore::normalize(&raw);

    let resume_id = req
        .resume_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok());
    if let Some(id) = resume_id {
        let user_email = token.or_provided(req.user_email.as_deref());
        let stored = serde_json::to_value(score).map_err(anyhow::Error::from)?;
        match set_ats_score(&state.db, id, user_email.as_deref(), &stored).await {
            Ok(true) => info!("Stored ATS score on resume {id}"),
            Ok(false) => warn!("ATS score not stored: resume {id} not owned by caller"),
            Err(e) => warn!("ATS score not stored on resume {id}: {e}"),
        }
    }

    Ok(Json(json!({ "success": true, "atsScore": score })))
}
