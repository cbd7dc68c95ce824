//! Storage seam for the recycle bin.
//!
//! The engine never holds a global connection; a store is injected and every
//! multi-step operation runs on a transaction obtained from `begin()`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::codec::Snapshot;
use super::entry::{NewRecycleEntry, RecycleEntry};
use super::error::RecycleError;

#[async_trait]
pub trait RecycleStore: Send + Sync {
    /// Append a captured entry, returning its id
    async fn append(&self, entry: NewRecycleEntry) -> Result<i64, RecycleError>;

    async fn count(&self) -> Result<i64, RecycleError>;

    /// Entries ordered most recently deleted first
    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<RecycleEntry>, RecycleError>;

    /// Unlocked read of a single entry
    async fn find(&self, id: i64) -> Result<Option<RecycleEntry>, RecycleError>;

    async fn begin(&self) -> Result<Box<dyn RecycleTransaction>, RecycleError>;
}

/// A unit of work. Dropping it without `commit` discards every write.
///
/// Table and column names passed in must already have passed the schema guard.
#[async_trait]
pub trait RecycleTransaction: Send {
    /// Read an entry holding an exclusive lock until the transaction ends
    async fn lock_for_restore(&mut self, id: i64) -> Result<Option<RecycleEntry>, RecycleError>;

    async fn row_exists(&mut self, table: &str, id: i64) -> Result<bool, RecycleError>;

    /// Insert the snapshot columns into `table`.
    ///
    /// A primary key clash surfaces as `IdCollision`, any other failure as
    /// `RestoreWriteFailed`.
    async fn insert_row(
        &mut self,
        table: &str,
        row: &Snapshot,
        target_id: Option<i64>,
    ) -> Result<(), RecycleError>;

    /// Set `restored_at` only if still null; returns rows affected
    async fn mark_restored(&mut self, id: i64, at: DateTime<Utc>) -> Result<u64, RecycleError>;

    /// Read a live row as a column map, locking it for deletion
    async fn fetch_row_for_delete(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<Map<String, Value>>, RecycleError>;

    async fn append(&mut self, entry: NewRecycleEntry) -> Result<i64, RecycleError>;

    async fn delete_row(&mut self, table: &str, id: i64) -> Result<u64, RecycleError>;

    async fn commit(self: Box<Self>) -> Result<(), RecycleError>;

    async fn rollback(self: Box<Self>) -> Result<(), RecycleError>;
}
