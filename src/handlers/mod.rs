// handlers/mod.rs - HTTP surface for the recycle bin
//
// Session, CSRF and role checks belong to the hosting application; these
// handlers assume the request already passed them.

use axum::http::HeaderMap;
use sqlx::PgPool;

use crate::recycle::RecycleBin;

pub mod health;
pub mod recycle;

pub const ACTOR_HEADER: &str = "x-actor";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub bin: RecycleBin,
    /// Present when backed by Postgres; used for health checks
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(bin: RecycleBin, pool: Option<PgPool>) -> Self {
        Self { bin, pool }
    }
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
