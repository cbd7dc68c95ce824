//! Read-only, paginated view over the recycle bin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec;
use super::entry::RecycleEntry;
use super::guard::SchemaGuard;

/// Raw paging input as supplied by a caller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Paging after clamping against the allowed sizes and the row count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page: Some(page), page_size: Some(page_size) }
    }

    /// Unknown page sizes fall back to `default_size`; the page is clamped
    /// into `[1, max(1, total_pages)]`.
    pub fn normalize(&self, total_count: i64, allowed_sizes: &[i64], default_size: i64) -> PageWindow {
        let page_size = match self.page_size {
            Some(size) if allowed_sizes.contains(&size) => size,
            _ => default_size.max(1),
        };
        let total_count = total_count.max(0);
        let total_pages = (total_count + page_size - 1) / page_size;
        let page = self.page.unwrap_or(1).clamp(1, total_pages.max(1));
        PageWindow { page, page_size, total_pages }
    }
}

/// One row of the operator listing
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub id: i64,
    pub original_table: String,
    pub original_id: Option<i64>,
    pub deleted_by: Option<String>,
    pub deleted_at: DateTime<Utc>,
    pub restored_at: Option<DateTime<Utc>>,
    pub preview: String,
    pub restorable: bool,
}

impl EntrySummary {
    pub fn from_entry(entry: &RecycleEntry, guard: &SchemaGuard, preview_length: usize) -> Self {
        Self {
            id: entry.id,
            original_table: entry.original_table.clone(),
            original_id: entry.original_id,
            deleted_by: entry.deleted_by.clone(),
            deleted_at: entry.deleted_at,
            restored_at: entry.restored_at,
            preview: codec::preview(entry.data.as_deref(), preview_length),
            restorable: !entry.is_restored() && guard.validate_table(&entry.original_table),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPage {
    pub entries: Vec<EntrySummary>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub page_size: i64,
}

impl ListPage {
    pub fn empty(window: PageWindow) -> Self {
        Self {
            entries: Vec::new(),
            total_count: 0,
            total_pages: 0,
            page: window.page,
            page_size: window.page_size,
        }
    }
}

/// A listing that never fails: storage errors become an empty page plus a reason
#[derive(Debug, Clone, Serialize)]
pub struct ListOutcome {
    #[serde(flatten)]
    pub page: ListPage,
    pub error: Option<String>,
}
