//! Transactional restore of a recycle bin entry.
//!
//! Requested -> Validated -> Reconstructed -> Inserted -> Committed. A failure
//! before any write is a rejection; a failure after is an abort. Both roll the
//! transaction back, so an inserted-but-unmarked row never persists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::codec::{self, Snapshot, SnapshotValue};
use super::error::RecycleError;
use super::guard::SchemaGuard;
use super::store::{RecycleStore, RecycleTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestoreStage {
    Requested,
    Validated,
    Reconstructed,
    Inserted,
    Committed,
}

/// Who is asking, for logs
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub actor: Option<String>,
    pub request_id: Uuid,
}

impl CallerContext {
    pub fn new(actor: Option<String>) -> Self {
        Self { actor, request_id: Uuid::new_v4() }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    fn actor(&self) -> &str {
        self.actor.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredRecord {
    pub entry_id: i64,
    pub table: String,
    /// Explicit primary key written, if one was determined
    pub restored_id: Option<i64>,
    pub columns: Vec<String>,
    pub dropped_columns: Vec<String>,
    pub restored_at: DateTime<Utc>,
}

/// Snapshot ready to be written into its original table
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub table: String,
    pub row: Snapshot,
    pub target_id: Option<i64>,
    pub dropped_columns: Vec<String>,
}

/// Decode an entry's document and decide what exactly gets inserted.
///
/// The decoded `id` wins over `original_id`; with neither positive the id
/// column is left out for the table to assign.
pub fn reconstruct(
    guard: &SchemaGuard,
    table: &str,
    data: Option<&str>,
    original_id: Option<i64>,
) -> Result<Reconstruction, RecycleError> {
    let data = data
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| RecycleError::CorruptSnapshot("entry has no data".to_string()))?;
    let mut row = codec::decode(data)?;

    let (_, dropped) = guard.partition_columns(row.columns());
    let dropped_columns: Vec<String> = dropped.into_iter().map(str::to_string).collect();
    row.retain(|column| !dropped_columns.iter().any(|d| d == column));

    let target_id = row
        .get("id")
        .and_then(SnapshotValue::as_positive_id)
        .or_else(|| original_id.filter(|id| *id > 0));

    match target_id {
        Some(id) => row.set("id", SnapshotValue::Int(id)),
        None => {
            row.remove("id");
        }
    }

    if row.is_empty() {
        return Err(RecycleError::CorruptSnapshot(
            "snapshot has no restorable columns".to_string(),
        ));
    }

    Ok(Reconstruction { table: table.to_string(), row, target_id, dropped_columns })
}

pub struct Restorer<'a> {
    store: &'a dyn RecycleStore,
    guard: &'a SchemaGuard,
}

impl<'a> Restorer<'a> {
    pub fn new(store: &'a dyn RecycleStore, guard: &'a SchemaGuard) -> Self {
        Self { store, guard }
    }

    pub async fn restore(
        &self,
        entry_id: i64,
        ctx: &CallerContext,
    ) -> Result<RestoredRecord, RecycleError> {
        tracing::debug!(
            request_id = %ctx.request_id,
            entry_id,
            stage = ?RestoreStage::Requested,
            "restore requested by {}",
            ctx.actor()
        );

        let mut tx = self.store.begin().await?;
        let mut stage = RestoreStage::Requested;

        match self.run(tx.as_mut(), entry_id, ctx, &mut stage).await {
            Ok(restored) => {
                tx.commit().await?;
                tracing::info!(
                    request_id = %ctx.request_id,
                    entry_id,
                    table = %restored.table,
                    restored_id = ?restored.restored_id,
                    "restored recycle bin entry for {}",
                    ctx.actor()
                );
                Ok(restored)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        request_id = %ctx.request_id,
                        entry_id,
                        "rollback after failed restore also failed: {}",
                        rollback_err
                    );
                }
                if err.is_permanent() {
                    tracing::warn!(request_id = %ctx.request_id, entry_id, ?stage, "restore rejected: {}", err);
                } else {
                    tracing::error!(request_id = %ctx.request_id, entry_id, ?stage, "restore aborted: {}", err);
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut dyn RecycleTransaction,
        entry_id: i64,
        ctx: &CallerContext,
        stage: &mut RestoreStage,
    ) -> Result<RestoredRecord, RecycleError> {
        let entry = tx
            .lock_for_restore(entry_id)
            .await?
            .ok_or(RecycleError::EntryNotFound(entry_id))?;
        if entry.is_restored() {
            return Err(RecycleError::AlreadyRestored(entry_id));
        }
        self.guard.check_table(&entry.original_table)?;
        advance(stage, RestoreStage::Validated, ctx, entry_id);

        let plan = reconstruct(self.guard, &entry.original_table, entry.data.as_deref(), entry.original_id)?;
        if let Some(id) = plan.target_id {
            if tx.row_exists(&plan.table, id).await? {
                return Err(RecycleError::IdCollision { table: plan.table.clone(), id });
            }
        }
        advance(stage, RestoreStage::Reconstructed, ctx, entry_id);

        tx.insert_row(&plan.table, &plan.row, plan.target_id).await?;
        advance(stage, RestoreStage::Inserted, ctx, entry_id);

        let restored_at = Utc::now();
        if tx.mark_restored(entry_id, restored_at).await? == 0 {
            return Err(RecycleError::ConcurrentRestoreDetected(entry_id));
        }
        advance(stage, RestoreStage::Committed, ctx, entry_id);

        Ok(RestoredRecord {
            entry_id,
            table: plan.table,
            restored_id: plan.target_id,
            columns: plan.row.columns().map(str::to_string).collect(),
            dropped_columns: plan.dropped_columns,
            restored_at,
        })
    }
}

fn advance(stage: &mut RestoreStage, next: RestoreStage, ctx: &CallerContext, entry_id: i64) {
    tracing::debug!(request_id = %ctx.request_id, entry_id, from = ?*stage, to = ?next, "restore stage");
    *stage = next;
}
