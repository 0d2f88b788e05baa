use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::resume::ResumeFormData;
use crate::resume::store::ImportedResume;

/// A resume as the browser kept it before accounts existed. Older entries carry only a
/// `position` and put the score breakdown under `atsScoreDetails`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(default)]
    form_data: Option<ResumeFormData>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    pdf_data: Option<String>,
    #[serde(default)]
    latex_code: Option<String>,
    #[serde(default)]
    ats_score: Option<Value>,
    #[serde(default)]
    ats_score_details: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
}

/// Accepts RFC 3339 strings, bare `YYYY-MM-DD` dates (midnight UTC) or epoch
/// milliseconds; anything else means `now`.
fn parse_created_at(raw: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            })
            .unwrap_or(now),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(now),
        _ => now,
    }
}

fn legacy_id(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validates the `resumes` payload and shapes each entry for insertion.
pub fn parse_import(resumes: Option<Value>, now: DateTime<Utc>) -> Result<Vec<ImportedResume>, AppError> {
    let entries = match resumes {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => return Err(AppError::Validation("Invalid or empty resumes array".to_string())),
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry: StoredEntry = serde_json::from_value(entry)
                .map_err(|e| AppError::Validation(format!("Invalid resume at index {index}: {e}")))?;

            let mut form_data = entry.form_data.unwrap_or_default();
            if form_data.role.trim().is_empty() {
                form_data.role = entry.position.unwrap_or_default();
            }
            let ats_score = entry
                .ats_score_details
                .filter(Value::is_object)
                .or(entry.ats_score);

            Ok(ImportedResume {
                created_at: parse_created_at(entry.created_at.as_ref(), now),
                form_data,
                pdf_data: entry.pdf_data,
                latex_code: entry.latex_code,
                ats_score,
                legacy_id: legacy_id(entry.id),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_missing_or_empty_arrays() {
        for payload in [None, Some(json!([])), Some(json!({ "a": 1 })), Some(json!("x"))] {
            match parse_import(payload, now()) {
                Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid or empty resumes array"),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_legacy_entry_is_reshaped() {
        let parsed = parse_import(
            Some(json!([{
                "id": 1717243200000u64,
                "position": "Data Engineer",
                "pdfData": "JVBERi0=",
                "atsScore": 92,
                "atsScoreDetails": { "total_score": [88] },
                "createdAt": 1717243200000u64,
            }])),
            now(),
        )
        .unwrap();

        let resume = &parsed[0];
        assert_eq!(resume.form_data.role, "Data Engineer");
        assert_eq!(resume.legacy_id.as_deref(), Some("1717243200000"));
        assert_eq!(resume.ats_score, Some(json!({ "total_score": [88] })));
        assert_eq!(resume.created_at.timestamp_millis(), 1717243200000);
    }

    #[test]
    fn test_form_data_role_wins_and_bad_dates_fall_back() {
        let parsed = parse_import(
            Some(json!([{
                "formData": { "title": "Eng", "role": "Backend" },
                "position": "Ignored",
                "createdAt": "last tuesday",
            }])),
            now(),
        )
        .unwrap();
        assert_eq!(parsed[0].form_data.role, "Backend");
        assert_eq!(parsed[0].created_at, now());
        assert!(parsed[0].legacy_id.is_none());
    }

    #[test]
    fn test_date_only_created_at_is_midnight_utc() {
        let parsed = parse_import(
            Some(json!([
                { "position": "Backend", "createdAt": "2024-06-01" },
                { "position": "Frontend", "createdAt": "2024-02-30" },
            ])),
            now(),
        )
        .unwrap();
        assert_eq!(
            parsed[0].created_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(parsed[1].created_at, now());
    }

    #[test]
    fn test_non_object_entry_is_rejected() {
        assert!(matches!(
            parse_import(Some(json!([42])), now()),
            Err(AppError::Validation(_))
        ));
    }
}
