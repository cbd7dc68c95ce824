// handlers/recycle/list.rs - GET /api/recycle handler

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};

use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::recycle::{ListOutcome, PageRequest};

/// Storage failures come back as an empty page with `error` set, never a 5xx.
pub async fn recycle_list(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<ListOutcome> {
    let Query(request) = query?;
    Ok(ApiResponse::success(state.bin.browse(request).await))
}
