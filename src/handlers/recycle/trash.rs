// handlers/recycle/trash.rs - DELETE /api/data/:table/:id handler

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use crate::handlers::{actor_from_headers, AppState};
use crate::middleware::{ApiResponse, ApiResult};
use crate::recycle::TrashedRecord;

/// Delete a live row, keeping a snapshot in the recycle bin
pub async fn record_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<TrashedRecord> {
    let Path((table, id)) = path?;
    let actor = actor_from_headers(&headers);
    let trashed = state.bin.trash(&table, id, actor.as_deref()).await?;
    Ok(ApiResponse::success(trashed))
}
