// handlers/recycle/restore.rs - POST /api/recycle/:id/restore handler

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use crate::handlers::{actor_from_headers, AppState};
use crate::middleware::{ApiResponse, ApiResult};
use crate::recycle::{CallerContext, RestoredRecord};

/// Anti-forgery and session checks happen upstream; the actor is taken as given.
pub async fn recycle_restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<RestoredRecord> {
    let Path(id) = path?;
    let ctx = CallerContext::new(actor_from_headers(&headers));
    let restored = state.bin.restore(id, &ctx).await?;
    Ok(ApiResponse::success(restored))
}
