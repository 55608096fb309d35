use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UsernameParams {
    pub username: Option<String>,
}

/// Check whether a username is still unclaimed in the `users` table.
///
/// Two concurrent checks for the same name may both see it as available;
/// the store's uniqueness constraint is the final authority.
#[tracing::instrument(skip(state))]
pub async fn check_username_availability(
    State(state): State<AppState>,
    Query(params): Query<UsernameParams>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let username = match params.username.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(AppError::Validation(
                "Invalid or missing parameters.".to_string(),
            ))
        }
    };

    let rows = state
        .supabase
        .select_eq("users", "username", "username", username)
        .await
        .map_err(AppError::Upstream)?;

    if !rows.is_empty() {
        return Err(AppError::Conflict("Username already exists.".to_string()));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Username is available." })),
    ))
}
