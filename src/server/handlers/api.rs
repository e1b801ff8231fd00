use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{blocking, store_error};
use crate::server::AppState;
use crate::server::response::ApiError;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExamplesParams {
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Serialize)]
pub struct ExampleItem {
    pub french: String,
    pub english: String,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub expression: String,
    pub examples: Vec<ExampleItem>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "API root is alive." }))
}

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello from frflashy!" }))
}

pub async fn db_time(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let db = state.db.clone();
    let now = blocking(move || db.now()).await?.map_err(store_error)?;
    Ok(Json(json!({ "now": now })))
}

/// Stored examples for one expression, in id order. Never generates.
pub async fn get_examples(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExamplesParams>,
) -> Result<Json<ExamplesResponse>, ApiError> {
    let expression = params.expression.trim().to_string();
    if expression.is_empty() {
        return Err(ApiError::bad_request("missing expression parameter"));
    }

    let db = state.db.clone();
    let key = expression.clone();
    let records = blocking(move || db.examples_for(&key))
        .await?
        .map_err(store_error)?;

    Ok(Json(ExamplesResponse {
        expression,
        examples: records
            .into_iter()
            .map(|r| ExampleItem {
                french: r.french,
                english: r.english,
            })
            .collect(),
    }))
}
