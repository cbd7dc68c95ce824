// handlers/recycle/show.rs - GET /api/recycle/:id handler

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};

use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::recycle::EntryDetail;

pub async fn recycle_show(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<EntryDetail> {
    let Path(id) = path?;
    let detail = state.bin.entry(id).await?;
    Ok(ApiResponse::success(detail))
}
