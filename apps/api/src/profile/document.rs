//! Shaping of raw profile documents: partial-update payloads and the account overlay
//! returned by `GET /api/profile`.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRow;

/// The document every new account starts with.
pub fn initial_document(user_id: Uuid, email: &str) -> Value {
    json!({
        "userId": user_id.to_string(),
        "email": email,
        "name": "",
        "contact": { "email": email },
    })
}

/// Turns a client payload into a set of top-level fields to upsert.
/// `_id` is discarded, null fields are dropped (partial update) and `userId` is forced.
pub fn prepare_update(body: Value, user_id: Uuid) -> Result<Map<String, Value>, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::Validation(
            "Profile payload must be a JSON object".to_string(),
        ));
    };

    fields.remove("_id");
    fields.retain(|_, value| !value.is_null());
    fields.insert("userId".to_string(), Value::String(user_id.to_string()));
    Ok(fields)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Overlays account data on the stored document. The account's name wins, then the
/// profile's, then a placeholder.
pub fn combine_with_account(document: Option<Value>, user_id: Uuid, account: Option<&UserRow>) -> Value {
    let mut fields = match document {
        Some(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("userId".to_string(), Value::String(user_id.to_string()));
            map
        }
    };

    let name = account
        .and_then(|a| a.name.as_deref())
        .filter(|n| !n.is_empty())
        .or_else(|| non_empty_str(fields.get("name")))
        .unwrap_or("User")
        .to_string();

    let email = account
        .map(|a| a.email.clone())
        .or_else(|| non_empty_str(fields.get("email")).map(String::from));

    let photo = account
        .and_then(|a| a.profile_photo_url.clone())
        .filter(|p| !p.is_empty())
        .or_else(|| non_empty_str(fields.get("profilePhotoUrl")).map(String::from));

    fields.insert("name".to_string(), Value::String(name));
    fields.insert("email".to_string(), email.map_or(Value::Null, Value::String));
    fields.insert(
        "profilePhotoUrl".to_string(),
        photo.map_or(Value::Null, Value::String),
    );
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(name: Option<&str>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            name: name.map(String::from),
            profile_photo_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_prepare_update_strips_id_and_nulls() {
        let user_id = Uuid::new_v4();
        let fields = prepare_update(
            json!({ "_id": "abc", "name": "Ada", "gender": null, "userId": "spoofed" }),
            user_id,
        )
        .unwrap();

        assert!(!fields.contains_key("_id"));
        assert!(!fields.contains_key("gender"));
        assert_eq!(fields["name"], "Ada");
        assert_eq!(fields["userId"], user_id.to_string());
    }

    #[test]
    fn test_prepare_update_rejects_non_objects() {
        assert!(matches!(
            prepare_update(json!(["name"]), Uuid::new_v4()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_account_name_wins() {
        let doc = json!({ "name": "Profile Name", "careerObjective": "Ship" });
        let combined = combine_with_account(Some(doc), Uuid::new_v4(), Some(&account(Some("Ada"))));
        assert_eq!(combined["name"], "Ada");
        assert_eq!(combined["email"], "ada@example.com");
        assert_eq!(combined["careerObjective"], "Ship");
    }

    #[test]
    fn test_profile_name_then_placeholder() {
        let doc = json!({ "name": "Profile Name" });
        let combined = combine_with_account(Some(doc), Uuid::new_v4(), Some(&account(Some(""))));
        assert_eq!(combined["name"], "Profile Name");

        let user_id = Uuid::new_v4();
        let bare = combine_with_account(None, user_id, None);
        assert_eq!(bare["name"], "User");
        assert_eq!(bare["userId"], user_id.to_string());
        assert!(bare["email"].is_null());
    }

    #[test]
    fn test_initial_document_copies_email_into_contact() {
        let doc = initial_document(Uuid::new_v4(), "ada@example.com");
        assert_eq!(doc["contact"]["email"], "ada@example.com");
        assert_eq!(doc["name"], "");
    }
}
