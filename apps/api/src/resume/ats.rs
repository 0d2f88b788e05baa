use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::resume::ResumeFormData;
use crate::resume_service::JobDetails;

/// Per-category ATS breakdown as stored on a resume and returned to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AtsScore {
    pub total_score: f64,
    pub keyword_match: f64,
    pub work_experience: f64,
    pub technical_skills: f64,
    pub education_certifications: f64,
    pub projects_achievements: f64,
    pub soft_skills_summary: f64,
}

/// A score component may arrive as a number or as a one-element array; anything else is 0.
fn component(raw: &Value, key: &str) -> f64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::Array(items)) => items.first().and_then(Value::as_f64).unwrap_or(0.0),
        _ => 0.0,
    }
}

impl AtsScore {
    pub fn normalize(raw: &Value) -> Self {
        Self {
            total_score: component(raw, "total_score"),
            keyword_match: component(raw, "keyword_match"),
            work_experience: component(raw, "work_experience"),
            technical_skills: component(raw, "technical_skills"),
            education_certifications: component(raw, "education_certifications"),
            projects_achievements: component(raw, "projects_achievements"),
            soft_skills_summary: component(raw, "soft_skills_summary"),
        }
    }
}

/// Headline score of a stored `atsScore`: a bare number, or the object's `total_score`.
pub fn headline_score(stored: Option<&Value>) -> f64 {
    match stored {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(obj @ Value::Object(_)) => component(obj, "total_score"),
        _ => 0.0,
    }
}

/// Maps the resume form onto the generator's job details.
pub fn job_details(form: &ResumeFormData) -> JobDetails {
    JobDetails {
        job_role: form.role.clone(),
        job_title: form.title.clone(),
        job_description: form.job_description.clone(),
        responsibilities: form.key_skills.clone(),
    }
}

/// Plain-text job description sent to the scorer.
pub fn format_job_details(form: &ResumeFormData) -> String {
    let description = if form.job_description.trim().is_empty() {
        "No description available"
    } else {
        form.job_description.as_str()
    };
    let title = if form.title.trim().is_empty() {
        form.role.as_str()
    } else {
        form.title.as_str()
    };
    format!(
        "Job Title: {title}\nRole: {}\nDescription: {description}\nResponsibilities: {description}",
        form.role
    )
}
