use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

/// The four fields the user fills in before generating a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFormData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub key_skills: String,
}

impl ResumeFormData {
    /// Rejects blank fields, reporting every missing one.
    pub fn validate(&self) -> Result<(), AppError> {
        let checks = [
            (&self.title, "Professional Title is required"),
            (&self.role, "Target Role is required"),
            (&self.job_description, "Job Description is required"),
            (&self.key_skills, "Key Skills are required"),
        ];
        let missing: Vec<&str> = checks
            .iter()
            .filter(|(value, _)| value.trim().is_empty())
            .map(|(_, message)| *message)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(missing.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_email: Option<String>,
    pub role: String,
    pub form_data: Json<ResumeFormData>,
    pub pdf_data: Option<String>,
    pub latex_code: Option<String>,
    pub ats_score: Option<Value>,
    pub legacy_id: Option<String>,
    pub imported_from_local_storage: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, role: &str, jd: &str, skills: &str) -> ResumeFormData {
        ResumeFormData {
            title: title.into(),
            role: role.into(),
            job_description: jd.into(),
            key_skills: skills.into(),
        }
    }

    #[test]
    fn test_complete_form_is_valid() {
        assert!(form("Engineer", "Backend", "Build APIs", "Rust").validate().is_ok());
    }

    #[test]
    fn test_blank_fields_are_all_reported() {
        let err = form("  ", "Backend", "", "Rust").validate().unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("Professional Title is required"));
                assert!(msg.contains("Job Description is required"));
                assert!(!msg.contains("Target Role"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_form_uses_camel_case_keys() {
        let parsed: ResumeFormData = serde_json::from_str(
            r#"{"title":"T","role":"R","jobDescription":"J","keySkills":"K"}"#,
        )
        .unwrap();
        assert_eq!(parsed, form("T", "R", "J", "K"));
    }
}
