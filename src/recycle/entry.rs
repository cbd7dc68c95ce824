use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Column list for recycle_bin queries
pub const COLUMNS: &str =
    "id, original_table, original_id, data, deleted_by, deleted_at, restored_at";

/// One captured record in the recycle bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecycleEntry {
    pub id: i64,
    pub original_table: String,
    pub original_id: Option<i64>,
    /// Snapshot document (see `codec::encode`)
    pub data: Option<String>,
    pub deleted_by: Option<String>,
    pub deleted_at: DateTime<Utc>,
    pub restored_at: Option<DateTime<Utc>>,
}

impl RecycleEntry {
    pub fn is_restored(&self) -> bool {
        self.restored_at.is_some()
    }
}

/// Values for a new recycle_bin row; the store assigns `id`
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecycleEntry {
    pub original_table: String,
    pub original_id: Option<i64>,
    pub data: String,
    pub deleted_by: Option<String>,
    pub deleted_at: DateTime<Utc>,
}
