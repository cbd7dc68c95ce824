// handlers/recycle/capture.rs - POST /api/recycle handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub table: String,
    pub original_id: Option<i64>,
    pub record: Value,
    pub actor: Option<String>,
}

/// Called by the CRUD layer before it deletes a live row
pub async fn recycle_capture(
    State(state): State<AppState>,
    body: Result<Json<CaptureRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = body?;
    let record: Map<String, Value> = match body.record {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("record must be a JSON object")),
    };

    let entry_id = state
        .bin
        .capture(&body.table, body.original_id, &record, body.actor.as_deref())
        .await?;

    Ok(ApiResponse::created(json!({ "entry_id": entry_id })))
}
