use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::{Uuid, Variant};

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CodeTimeParams {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

/// Sum the `time` column of a user's session rows.
///
/// Issues two store queries: the user's session times and an existence
/// check against the `users` table. Both must succeed before the 404
/// decision is made.
#[tracing::instrument(skip(state))]
pub async fn calculate_total_code_time(
    State(state): State<AppState>,
    Query(params): Query<CodeTimeParams>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = match params.user_id.as_deref() {
        Some(id) if is_uuid_v4(id) => id,
        _ => {
            return Err(AppError::Validation(
                "Invalid or missing parameters.".to_string(),
            ))
        }
    };

    let sessions = state
        .supabase
        .select_eq("sessions", "time", "user_id", user_id)
        .await
        .map_err(AppError::Upstream)?;

    let users = state
        .supabase
        .select_eq("users", "user_id", "user_id", user_id)
        .await
        .map_err(AppError::Upstream)?;

    if users.is_empty() {
        return Err(AppError::NotFound("User not found.".to_string()));
    }

    let total_time = sum_session_times(&sessions);

    Ok((StatusCode::OK, Json(json!({ "totalTime": total_time }))))
}

/// Accept only the canonical hyphenated 8-4-4-4-12 form with version 4
/// and an RFC 4122 variant. `Uuid::try_parse` alone also accepts braced,
/// simple, and URN forms, so the shape is checked first.
fn is_uuid_v4(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 36
        || bytes[8] != b'-'
        || bytes[13] != b'-'
        || bytes[18] != b'-'
        || bytes[23] != b'-'
    {
        return false;
    }

    match Uuid::try_parse(candidate) {
        Ok(uuid) => uuid.get_version_num() == 4 && uuid.get_variant() == Variant::RFC4122,
        Err(_) => false,
    }
}

/// Sum numeric `time` fields across session rows. Null, missing, or
/// non-numeric entries contribute 0.
fn sum_session_times(rows: &[Value]) -> f64 {
    rows.iter()
        .filter_map(|row| row.get("time"))
        .filter_map(Value::as_f64)
        .sum()
}
