use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::identity::TokenEmail;
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::resume::ats::headline_score;
use crate::resume::handlers::EmailQuery;
use crate::resume::store::list_for_email;
use crate::state::AppState;

const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub resume_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub resume_count: usize,
    pub average_ats_score: u32,
    pub recent_activity: Vec<Activity>,
    pub suggested_positions: Vec<String>,
}

/// Aggregates a user's resumes. Only positive scores count towards the average.
pub fn summarize(resumes: &[ResumeRow]) -> DashboardSummary {
    let scores: Vec<f64> = resumes
        .iter()
        .map(|r| headline_score(r.ats_score.as_ref()))
        .filter(|s| *s > 0.0)
        .collect();
    let average_ats_score = if scores.is_empty() {
        0
    } else {
        (scores.iter().sum::<f64>() / scores.len() as f64).round() as u32
    };

    let mut newest: Vec<&ResumeRow> = resumes.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_activity = newest
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|r| Activity {
            kind: "Resume Created",
            title: if r.role.is_empty() {
                r.form_data.title.clone()
            } else {
                r.role.clone()
            },
            created_at: r.created_at,
            resume_id: r.id,
        })
        .collect();

    let mut seen = HashSet::new();
    let suggested_positions = resumes
        .iter()
        .filter(|r| !r.role.is_empty() && seen.insert(r.role.as_str()))
        .map(|r| r.role.clone())
        .collect();

    DashboardSummary {
        resume_count: resumes.len(),
        average_ats_score,
        recent_activity,
        suggested_positions,
    }
}

/// GET /api/dashboard?email=
pub async fn handle_dashboard(
    State(state): State<AppState>,
    token: TokenEmail,
    Query(query): Query<EmailQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let email = token
        .or_provided(query.email.as_deref())
        .ok_or_else(|| AppError::Validation("User email is required".to_string()))?;
    let resumes = list_for_email(&state.db, &email).await?;
    Ok(Json(summarize(&resumes)))
}
