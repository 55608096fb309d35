use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use validator::Validate;

use crate::error::AppError;
use crate::AppState;

/// Body for the generic upsert passthrough. `columns` is a comma-separated
/// list matched positionally against `data`.
#[derive(Debug, Deserialize, Validate)]
pub struct SendDataRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub table: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub columns: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Upsert one row into an arbitrary table.
///
/// This endpoint deliberately performs no schema check: any table and
/// column set the configured API key can reach is writable. Row identity
/// on repeat calls is decided by the store's own conflict rules.
#[tracing::instrument(skip(state, request))]
pub async fn send_data_to_supabase(
    State(state): State<AppState>,
    Json(request): Json<SendDataRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.validate().is_err() || request.data.is_empty() {
        return Err(AppError::Validation(
            "Missing required parameters.".to_string(),
        ));
    }

    let row = build_row(&request.columns, &request.data)?;

    state
        .supabase
        .upsert(&request.table, &[Value::Object(row)])
        .await
        .map_err(AppError::Upstream)?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Data sent to Supabase successfully." })),
    ))
}

/// Zip the CSV column list against the positional values into one row
/// object, rejecting length mismatches and repeated column names.
fn build_row(columns: &str, data: &[Value]) -> Result<Map<String, Value>, AppError> {
    let names: Vec<&str> = columns.split(',').collect();

    if names.len() != data.len() {
        return Err(AppError::Validation(
            "Columns and data must have the same length.".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    if !names.iter().all(|name| seen.insert(*name)) {
        return Err(AppError::Validation("Columns must be unique.".to_string()));
    }

    Ok(names
        .iter()
        .zip(data.iter())
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect())
}
