use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RecycleConfig;

use super::codec;
use super::entry::{NewRecycleEntry, RecycleEntry};
use super::error::RecycleError;
use super::guard::SchemaGuard;
use super::listing::{EntrySummary, ListOutcome, ListPage, PageRequest};
use super::restore::{CallerContext, RestoredRecord, Restorer};
use super::store::{RecycleStore, RecycleTransaction};

/// Result of deleting a live row into the recycle bin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrashedRecord {
    pub entry_id: i64,
    pub table: String,
    pub original_id: i64,
}

/// Full view of one entry, including an untruncated preview
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: RecycleEntry,
    pub preview: String,
    pub restorable: bool,
}

/// The recycle bin engine: capture, listing and restore over an injected store
#[derive(Clone)]
pub struct RecycleBin {
    store: Arc<dyn RecycleStore>,
    guard: SchemaGuard,
    settings: RecycleConfig,
}

impl RecycleBin {
    pub fn new(store: Arc<dyn RecycleStore>, settings: RecycleConfig) -> Self {
        let guard = SchemaGuard::new(settings.restorable_tables.iter().cloned());
        Self { store, guard, settings }
    }

    /// Snapshot a record that the caller is about to delete.
    ///
    /// The caller must not delete the live row unless this succeeds.
    pub async fn capture(
        &self,
        table: &str,
        original_id: Option<i64>,
        record: &Map<String, Value>,
        actor: Option<&str>,
    ) -> Result<i64, RecycleError> {
        self.guard.check_table(table)?;
        if record.is_empty() {
            return Err(RecycleError::CorruptSnapshot("cannot capture an empty record".to_string()));
        }
        let data = codec::encode(record)?;

        let id = self
            .store
            .append(NewRecycleEntry {
                original_table: table.to_string(),
                original_id,
                data,
                deleted_by: actor.map(str::to_string),
                deleted_at: Utc::now(),
            })
            .await?;

        tracing::info!(entry_id = id, table, ?original_id, "captured record into recycle bin");
        Ok(id)
    }

    /// Read, capture and delete a live row in one transaction
    pub async fn trash(
        &self,
        table: &str,
        id: i64,
        actor: Option<&str>,
    ) -> Result<TrashedRecord, RecycleError> {
        self.guard.check_table(table)?;

        let mut tx = self.store.begin().await?;
        let result = capture_and_delete(tx.as_mut(), table, id, actor).await;

        match result {
            Ok(entry_id) => {
                tx.commit().await?;
                tracing::info!(entry_id, table, id, "moved record to recycle bin");
                Ok(TrashedRecord { entry_id, table: table.to_string(), original_id: id })
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("rollback after failed delete also failed: {}", rollback_err);
                }
                tracing::warn!(table, id, "delete with capture failed: {}", err);
                Err(err)
            }
        }
    }

    pub async fn list(&self, request: PageRequest) -> Result<ListPage, RecycleError> {
        let total_count = self.store.count().await?;
        let window = request.normalize(
            total_count,
            &self.settings.page_sizes,
            self.settings.default_page_size,
        );

        let entries = if total_count == 0 {
            Vec::new()
        } else {
            self.store.page(window.page_size, window.offset()).await?
        };

        Ok(ListPage {
            entries: entries
                .iter()
                .map(|e| EntrySummary::from_entry(e, &self.guard, self.settings.preview_length))
                .collect(),
            total_count,
            total_pages: window.total_pages,
            page: window.page,
            page_size: window.page_size,
        })
    }

    /// Listing that degrades to an empty page instead of failing
    pub async fn browse(&self, request: PageRequest) -> ListOutcome {
        match self.list(request).await {
            Ok(page) => ListOutcome { page, error: None },
            Err(err) => {
                tracing::error!("recycle bin listing failed: {}", err);
                let window = request.normalize(0, &self.settings.page_sizes, self.settings.default_page_size);
                ListOutcome { page: ListPage::empty(window), error: Some(err.to_string()) }
            }
        }
    }

    pub async fn entry(&self, id: i64) -> Result<EntryDetail, RecycleError> {
        let entry = self.store.find(id).await?.ok_or(RecycleError::EntryNotFound(id))?;
        let preview = codec::preview(entry.data.as_deref(), usize::MAX);
        let restorable = !entry.is_restored() && self.guard.validate_table(&entry.original_table);
        Ok(EntryDetail { entry, preview, restorable })
    }

    pub async fn restore(&self, entry_id: i64, ctx: &CallerContext) -> Result<RestoredRecord, RecycleError> {
        Restorer::new(self.store.as_ref(), &self.guard).restore(entry_id, ctx).await
    }

    pub fn preview(&self, raw: Option<&str>) -> String {
        codec::preview(raw, self.settings.preview_length)
    }
}

async fn capture_and_delete(
    tx: &mut dyn RecycleTransaction,
    table: &str,
    id: i64,
    actor: Option<&str>,
) -> Result<i64, RecycleError> {
    let record = tx
        .fetch_row_for_delete(table, id)
        .await?
        .ok_or_else(|| RecycleError::RecordNotFound { table: table.to_string(), id })?;
    let entry_id = tx
        .append(NewRecycleEntry {
            original_table: table.to_string(),
            original_id: Some(id),
            data: codec::encode(&record)?,
            deleted_by: actor.map(str::to_string),
            deleted_at: Utc::now(),
        })
        .await?;
    if tx.delete_row(table, id).await? == 0 {
        return Err(RecycleError::RecordNotFound { table: table.to_string(), id });
    }
    Ok(entry_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recycle::memory::MemoryRecycleStore;
    use serde_json::json;

    fn bin(store: &MemoryRecycleStore) -> RecycleBin {
        RecycleBin::new(Arc::new(store.clone()), RecycleConfig::default())
    }

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn capture_stores_encoded_snapshot() {
        let store = MemoryRecycleStore::new();
        let bin = bin(&store);
        let id = bin
            .capture("resolutions", Some(42), &record(json!({"id": 42, "title": "Budget Q1", "amount": 1000})), Some("admin1"))
            .await
            .unwrap();

        let entry = store.find(id).await.unwrap().unwrap();
        assert_eq!(entry.data.as_deref(), Some(r#"{"id":42,"title":"Budget Q1","amount":1000}"#));
        assert_eq!(entry.deleted_by.as_deref(), Some("admin1"));
        assert!(entry.restored_at.is_none());
    }

    #[tokio::test]
    async fn capture_rejects_unknown_table_and_empty_record() {
        let store = MemoryRecycleStore::new();
        let bin = bin(&store);
        let err = bin.capture("users", Some(1), &record(json!({"id": 1})), None).await.unwrap_err();
        assert_eq!(err, RecycleError::InvalidTable("users".into()));

        let err = bin.capture("minutes", None, &Map::new(), None).await.unwrap_err();
        assert!(matches!(err, RecycleError::CorruptSnapshot(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn trash_moves_row_into_bin() {
        let store = MemoryRecycleStore::new();
        store.insert_live_row("ordinances", record(json!({"id": 3, "title": "Noise"})));
        let bin = bin(&store);

        let trashed = bin.trash("ordinances", 3, Some("clerk")).await.unwrap();
        assert_eq!(store.row_count("ordinances"), 0);

        let entry = store.find(trashed.entry_id).await.unwrap().unwrap();
        assert_eq!(entry.original_id, Some(3));
        assert_eq!(entry.data.as_deref(), Some(r#"{"id":3,"title":"Noise"}"#));
    }

    #[tokio::test]
    async fn trash_of_missing_row_changes_nothing() {
        let store = MemoryRecycleStore::new();
        store.create_table("ordinances");
        let bin = bin(&store);

        let err = bin.trash("ordinances", 99, None).await.unwrap_err();
        assert_eq!(err, RecycleError::RecordNotFound { table: "ordinances".into(), id: 99 });
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn entry_detail_uses_full_preview() {
        let store = MemoryRecycleStore::new();
        let bin = bin(&store);
        let long_title = "x".repeat(300);
        let id = bin
            .capture("minutes", Some(1), &record(json!({"id": 1, "title": long_title})), None)
            .await
            .unwrap();

        let detail = bin.entry(id).await.unwrap();
        assert!(!detail.preview.ends_with("..."));
        assert!(bin.preview(detail.entry.data.as_deref()).ends_with("..."));
        assert!(detail.restorable);
    }
}
