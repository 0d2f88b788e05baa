use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::profile::document::initial_document;

pub async fn find_document(pool: &PgPool, user_id: Uuid) -> Result<Option<Value>, sqlx::Error> {
    sqlx::query_scalar("SELECT document FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Loads the stored profile as a typed draft. A missing row is an empty draft; a stored
/// document that does not fit the typed shape is an error.
pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile, AppError> {
    let document = find_document(pool, user_id).await?;
    draft_from_document(document).map_err(|e| {
        warn!("Stored profile for {user_id} does not parse: {e}");
        e
    })
}

fn draft_from_document(document: Option<Value>) -> Result<Profile, AppError> {
    match document {
        None => Ok(Profile::default()),
        Some(doc) => serde_json::from_value(doc).map_err(|e| {
            AppError::Conflict(format!("Stored profile could not be read for merging: {e}"))
        }),
    }
}

/// Creates the starter document unless one exists. Returns true when a row was inserted.
pub async fn ensure_profile(pool: &PgPool, user_id: Uuid, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO profiles (user_id, document) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(initial_document(user_id, email))
    .execute(pool)
    .await?;

    let created = result.rows_affected() > 0;
    if created {
        info!("Created starter profile for user {user_id}");
    }
    Ok(created)
}

/// Upserts top-level fields over the stored document and returns the result.
pub async fn upsert_fields(
    pool: &PgPool,
    user_id: Uuid,
    fields: Map<String, Value>,
) -> Result<Value, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO profiles (user_id, document, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (user_id)
        DO UPDATE SET document = profiles.document || EXCLUDED.document, updated_at = now()
        RETURNING document
        "#,
    )
    .bind(user_id)
    .bind(Value::Object(fields))
    .fetch_one(pool)
    .await
}
