use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::resume::{ResumeFormData, ResumeRow};

const RESUME_COLUMNS: &str = "id, user_email, role, form_data, pdf_data, latex_code, ats_score, \
     legacy_id, imported_from_local_storage, created_at, updated_at";

/// Fields written when saving a resume.
pub struct ResumeParams<'a> {
    pub user_email: Option<&'a str>,
    pub form_data: &'a ResumeFormData,
    pub pdf_data: Option<&'a str>,
    pub latex_code: Option<&'a str>,
    pub ats_score: Option<&'a Value>,
}

/// One resume carried over from browser storage.
#[derive(Debug)]
pub struct ImportedResume {
    pub form_data: ResumeFormData,
    pub pdf_data: Option<String>,
    pub latex_code: Option<String>,
    pub ats_score: Option<Value>,
    pub legacy_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Resume already saved by this owner for `role`, if any. A missing email only matches
/// resumes saved without one.
pub async fn find_id_by_role(
    pool: &PgPool,
    user_email: Option<&str>,
    role: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM resumes WHERE user_email IS NOT DISTINCT FROM $1 AND role = $2 \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_email)
    .bind(role)
    .fetch_optional(pool)
    .await
}

pub async fn insert_resume(pool: &PgPool, params: ResumeParams<'_>) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO resumes (id, user_email, role, form_data, pdf_data, latex_code, ats_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(params.user_email)
    .bind(&params.form_data.role)
    .bind(Json(params.form_data))
    .bind(params.pdf_data)
    .bind(params.latex_code)
    .bind(params.ats_score)
    .execute(pool)
    .await?;

    info!("Saved resume {id} for role '{}'", params.form_data.role);
    Ok(id)
}

pub async fn update_resume(
    pool: &PgPool,
    id: Uuid,
    params: ResumeParams<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE resumes
        SET user_email = $2, role = $3, form_data = $4, pdf_data = $5, latex_code = $6,
            ats_score = $7, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(params.user_email)
    .bind(&params.form_data.role)
    .bind(Json(params.form_data))
    .bind(params.pdf_data)
    .bind(params.latex_code)
    .bind(params.ats_score)
    .execute(pool)
    .await?;

    info!("Updated resume {id}");
    Ok(())
}

/// Newest first.
pub async fn list_for_email(pool: &PgPool, user_email: &str) -> Result<Vec<ResumeRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RESUME_COLUMNS} FROM resumes WHERE user_email = $1 ORDER BY created_at DESC"
    ))
    .bind(user_email)
    .fetch_all(pool)
    .await
}

/// The owner's resume with `id`, or their newest one when no id is given.
pub async fn find_for_email(
    pool: &PgPool,
    user_email: &str,
    id: Option<Uuid>,
) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RESUME_COLUMNS} FROM resumes \
         WHERE user_email = $1 AND ($2::uuid IS NULL OR id = $2) \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(user_email)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Inserts every imported resume in one transaction.
pub async fn insert_imported(
    pool: &PgPool,
    user_email: &str,
    resumes: &[ImportedResume],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(resumes.len());

    for resume in resumes {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, user_email, role, form_data, pdf_data, latex_code, ats_score,
                 legacy_id, imported_from_local_storage, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9)
            "#,
        )
        .bind(id)
        .bind(user_email)
        .bind(&resume.form_data.role)
        .bind(Json(&resume.form_data))
        .bind(resume.pdf_data.as_deref())
        .bind(resume.latex_code.as_deref())
        .bind(resume.ats_score.as_ref())
        .bind(resume.legacy_id.as_deref())
        .bind(resume.created_at)
        .execute(&mut *tx)
        .await?;
        ids.push(id);
    }

    tx.commit().await?;
    info!("Imported {} resumes for {user_email}", ids.len());
    Ok(ids)
}

/// Stores a score on the owner's resume. Returns false when nothing matched.
pub async fn set_ats_score(
    pool: &PgPool,
    id: Uuid,
    user_email: Option<&str>,
    ats_score: &Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE resumes SET ats_score = $3, updated_at = now() \
         WHERE id = $1 AND user_email IS NOT DISTINCT FROM $2",
    )
    .bind(id)
    .bind(user_email)
    .bind(ats_score)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
