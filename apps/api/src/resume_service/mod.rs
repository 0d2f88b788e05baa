//! Resume service client: the single point of entry for calls to the external resume
//! generation, parsing, ATS scoring and chat service.
//!
//! The service is an opaque collaborator: only the request/response JSON shapes below are
//! part of this crate's boundary. Calls are made once; there is no retry policy.

use std::time::Duration;

use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::profile::Profile;

const GENERATE_PATH: &str = "/generate_resume";
const PARSE_PATH: &str = "/api/upload-resume";
const ATS_PATH: &str = "/calculate-ats-score";
const MODIFY_PATH: &str = "/modify-resume";
const PROCESS_PATH: &str = "/process";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service answered but reported `status != "success"`.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDetails {
    pub job_role: String,
    pub job_title: String,
    pub job_description: String,
    pub responsibilities: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResumeRequest<'a> {
    pub job_details: &'a JobDetails,
    pub resume: &'a Value,
    pub profile: &'a Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedResume {
    pub pdf: String,
    pub latex_code: String,
}

#[derive(Debug, Serialize)]
struct AtsScoreRequest<'a> {
    job_details: &'a str,
    #[serde(rename = "latexCode")]
    latex_code: &'a str,
}

#[derive(Debug, Serialize)]
struct ModifyRequest<'a> {
    query: &'a str,
    #[serde(rename = "latexCode")]
    latex_code: &'a str,
}

/// `{status, error}` envelope wrapped around every non-generation reply.
#[derive(Debug, Deserialize)]
struct StatusEnvelope<T> {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

impl<T> StatusEnvelope<T> {
    fn into_success(self, what: &str) -> Result<T, ServiceError> {
        if self.status == "success" {
            Ok(self.body)
        } else {
            Err(ServiceError::Rejected(
                self.error.unwrap_or_else(|| format!("Failed to {what}")),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct AtsBody {
    #[serde(default)]
    ats_score: Value,
}

#[derive(Debug, Deserialize)]
struct ModifyBody {
    #[serde(default)]
    pdf: Option<String>,
    #[serde(default)]
    latex_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessBody {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ResumeServiceClient {
    client: Client,
    base_url: String,
}

impl ResumeServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Generates a resume (PDF as base64 plus LaTeX source) for the job details.
    pub async fn generate_resume(
        &self,
        request: &GenerateResumeRequest<'_>,
    ) -> Result<GeneratedResume, ServiceError> {
        let response = self
            .client
            .post(self.url(GENERATE_PATH))
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    /// Extracts a profile draft from an uploaded resume PDF.
    pub async fn parse_resume(&self, file_name: &str, pdf: Vec<u8>) -> Result<Profile, ServiceError> {
        let part = multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(PARSE_PATH))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    /// Returns the raw `ats_score` object; callers normalize it.
    pub async fn calculate_ats_score(
        &self,
        job_details: &str,
        latex_code: &str,
    ) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(self.url(ATS_PATH))
            .json(&AtsScoreRequest {
                job_details,
                latex_code,
            })
            .send()
            .await?;
        let envelope: StatusEnvelope<AtsBody> = read_json(response).await?;
        Ok(envelope.into_success("calculate ATS score")?.ats_score)
    }

    /// Applies a natural-language change request to the LaTeX source.
    pub async fn modify_resume(
        &self,
        query: &str,
        latex_code: &str,
    ) -> Result<GeneratedResume, ServiceError> {
        let response = self
            .client
            .post(self.url(MODIFY_PATH))
            .json(&ModifyRequest { query, latex_code })
            .send()
            .await?;
        let envelope: StatusEnvelope<ModifyBody> = read_json(response).await?;
        match envelope.into_success("modify resume")? {
            ModifyBody {
                pdf: Some(pdf),
                latex_code: Some(latex_code),
            } => Ok(GeneratedResume { pdf, latex_code }),
            _ => Err(ServiceError::Rejected(
                "Resume service returned an incomplete resume".to_string(),
            )),
        }
    }

    /// Asks a question about an image (typically a captured PDF selection).
    pub async fn process_image(&self, png: Vec<u8>, query: &str) -> Result<String, ServiceError> {
        let image = multipart::Part::bytes(png)
            .file_name("selection.png")
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .part("image", image)
            .text("query", query.to_string());

        let response = self
            .client
            .post(self.url(PROCESS_PATH))
            .multipart(form)
            .send()
            .await?;
        let envelope: StatusEnvelope<ProcessBody> = read_json(response).await?;
        envelope
            .into_success("process image")?
            .response
            .ok_or_else(|| ServiceError::Rejected("Resume service returned no response".to_string()))
    }
}

/// Maps non-2xx replies to `ServiceError::Api`, using the `{error}` body when present.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!("Resume service returned {status}");
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    debug!("Resume service replied {status} ({} bytes)", body.len());
    serde_json::from_str(&body).map_err(ServiceError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_request_shape() {
        let details = JobDetails {
            job_role: "Backend".into(),
            job_title: "Engineer".into(),
            job_description: "Build APIs".into(),
            responsibilities: "Rust".into(),
        };
        let resume = json!({});
        let profile = json!({ "name": "Ada" });
        let body = serde_json::to_value(GenerateResumeRequest {
            job_details: &details,
            resume: &resume,
            profile: &profile,
        })
        .unwrap();

        assert_eq!(body["jobDetails"]["job_role"], "Backend");
        assert_eq!(body["jobDetails"]["responsibilities"], "Rust");
        assert_eq!(body["profile"]["name"], "Ada");
    }

    #[test]
    fn test_ats_request_uses_camel_case_latex_key() {
        let body = serde_json::to_value(AtsScoreRequest {
            job_details: "Job Title: X",
            latex_code: "\\documentclass{article}",
        })
        .unwrap();
        assert_eq!(body["job_details"], "Job Title: X");
        assert!(body.get("latexCode").is_some());
    }

    #[test]
    fn test_success_envelope_unwraps() {
        let envelope: StatusEnvelope<ProcessBody> =
            serde_json::from_value(json!({ "status": "success", "response": "A table" })).unwrap();
        assert_eq!(
            envelope.into_success("process image").unwrap().response.as_deref(),
            Some("A table")
        );
    }

    #[test]
    fn test_failed_envelope_is_rejected_with_service_message() {
        let envelope: StatusEnvelope<AtsBody> =
            serde_json::from_value(json!({ "status": "error", "error": "bad latex" })).unwrap();
        match envelope.into_success("calculate ATS score") {
            Err(ServiceError::Rejected(msg)) => assert_eq!(msg, "bad latex"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_failed_envelope_without_message_gets_default() {
        let envelope: StatusEnvelope<AtsBody> =
            serde_json::from_value(json!({ "status": "error" })).unwrap();
        match envelope.into_success("calculate ATS score") {
            Err(ServiceError::Rejected(msg)) => assert_eq!(msg, "Failed to calculate ATS score"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
