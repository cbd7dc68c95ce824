//! In-process recycle store.
//!
//! Entry and row locks are held for the life of a transaction and all writes
//! are staged, then applied in one step at commit. Primary keys and deleted
//! rows are re-checked at commit so a racing write cannot slip through.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::codec::Snapshot;
use super::entry::{NewRecycleEntry, RecycleEntry};
use super::error::RecycleError;
use super::store::{RecycleStore, RecycleTransaction};

#[derive(Debug, Default)]
struct MemoryTable {
    /// Declared columns; `None` accepts any column
    columns: Option<Vec<String>>,
    rows: BTreeMap<i64, Map<String, Value>>,
}

impl MemoryTable {
    fn next_id(&self) -> i64 {
        self.rows.keys().next_back().copied().unwrap_or(0) + 1
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<i64, RecycleEntry>,
    next_entry_id: i64,
    tables: HashMap<String, MemoryTable>,
}

impl MemoryState {
    fn push_entry(&mut self, entry: NewRecycleEntry) -> i64 {
        self.next_entry_id += 1;
        let id = self.next_entry_id;
        self.entries.insert(
            id,
            RecycleEntry {
                id,
                original_table: entry.original_table,
                original_id: entry.original_id,
                data: Some(entry.data),
                deleted_by: entry.deleted_by,
                deleted_at: entry.deleted_at,
                restored_at: None,
            },
        );
        id
    }
}

/// What a transaction holds an exclusive lock on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Entry(i64),
    Row(String, i64),
}

#[derive(Clone, Default)]
pub struct MemoryRecycleStore {
    state: Arc<Mutex<MemoryState>>,
    locks: Arc<Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>>,
}

impl MemoryRecycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table that accepts any column
    pub fn create_table(&self, name: &str) {
        self.state().tables.entry(name.to_string()).or_default();
    }

    /// Declare a table with a fixed column set
    pub fn create_table_with_columns(&self, name: &str, columns: &[&str]) {
        let mut state = self.state();
        let table = state.tables.entry(name.to_string()).or_default();
        table.columns = Some(columns.iter().map(|c| c.to_string()).collect());
    }

    /// Insert a live row directly, bypassing transactions
    pub fn insert_live_row(&self, table: &str, row: Map<String, Value>) -> i64 {
        let mut state = self.state();
        let table = state.tables.entry(table.to_string()).or_default();
        let id = row.get("id").and_then(Value::as_i64).unwrap_or_else(|| table.next_id());
        let mut row = row;
        row.insert("id".to_string(), Value::from(id));
        table.rows.insert(id, row);
        id
    }

    pub fn live_row(&self, table: &str, id: i64) -> Option<Map<String, Value>> {
        self.state().tables.get(table).and_then(|t| t.rows.get(&id).cloned())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Overwrite an entry's stored document
    pub fn set_entry_data(&self, id: i64, data: Option<&str>) {
        if let Some(entry) = self.state().entries.get_mut(&id) {
            entry.data = data.map(str::to_string);
        }
    }

    /// Append an entry with an explicit deletion time
    pub fn append_at(
        &self,
        table: &str,
        original_id: Option<i64>,
        data: &str,
        deleted_at: DateTime<Utc>,
    ) -> i64 {
        self.state().push_entry(NewRecycleEntry {
            original_table: table.to_string(),
            original_id,
            data: data.to_string(),
            deleted_by: None,
            deleted_at,
        })
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_handle(&self, key: &LockKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// Forget lock handles nobody holds or waits on
    fn prune_locks(&self, keys: &[LockKey]) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in keys {
            if locks.get(key).map(|l| Arc::strong_count(l) == 1).unwrap_or(false) {
                locks.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[async_trait]
impl RecycleStore for MemoryRecycleStore {
    async fn append(&self, entry: NewRecycleEntry) -> Result<i64, RecycleError> {
        Ok(self.state().push_entry(entry))
    }

    async fn count(&self) -> Result<i64, RecycleError> {
        Ok(self.state().entries.len() as i64)
    }

    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<RecycleEntry>, RecycleError> {
        let state = self.state();
        let mut entries: Vec<&RecycleEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(b.id.cmp(&a.id)));
        Ok(entries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<RecycleEntry>, RecycleError> {
        Ok(self.state().entries.get(&id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn RecycleTransaction>, RecycleError> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            held: Vec::new(),
            pending: Vec::new(),
        }))
    }
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Insert { table: String, id: i64, row: Map<String, Value> },
    MarkRestored { id: i64, at: DateTime<Utc> },
    Append { id: i64, entry: NewRecycleEntry },
    Delete { table: String, id: i64 },
}

pub struct MemoryTransaction {
    store: MemoryRecycleStore,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
    pending: Vec<PendingWrite>,
}

impl MemoryTransaction {
    async fn acquire(&mut self, key: LockKey) {
        if self.held.iter().any(|(held, _)| *held == key) {
            return;
        }
        let guard = self.store.lock_handle(&key).lock_owned().await;
        self.held.push((key, guard));
    }

    fn pending_insert(&self, table: &str, id: i64) -> bool {
        self.pending.iter().any(|w| {
            matches!(w, PendingWrite::Insert { table: t, id: i, .. } if t == table && *i == id)
        })
    }

    fn pending_delete(&self, table: &str, id: i64) -> bool {
        self.pending.iter().any(|w| {
            matches!(w, PendingWrite::Delete { table: t, id: i } if t == table && *i == id)
        })
    }

    fn pending_restored(&self, id: i64) -> bool {
        self.pending
            .iter()
            .any(|w| matches!(w, PendingWrite::MarkRestored { id: i, .. } if *i == id))
    }
}

#[async_trait]
impl RecycleTransaction for MemoryTransaction {
    async fn lock_for_restore(&mut self, id: i64) -> Result<Option<RecycleEntry>, RecycleError> {
        self.acquire(LockKey::Entry(id)).await;
        let mut entry = self.store.state().entries.get(&id).cloned();
        if let Some(entry) = entry.as_mut() {
            if entry.restored_at.is_none() && self.pending_restored(id) {
                entry.restored_at = Some(Utc::now());
            }
        }
        Ok(entry)
    }

    async fn row_exists(&mut self, table: &str, id: i64) -> Result<bool, RecycleError> {
        if self.pending_insert(table, id) {
            return Ok(true);
        }
        if self.pending_delete(table, id) {
            return Ok(false);
        }
        let state = self.store.state();
        match state.tables.get(table) {
            Some(t) => Ok(t.rows.contains_key(&id)),
            None => Err(RecycleError::PersistenceError(format!(
                "relation \"{}\" does not exist",
                table
            ))),
        }
    }

    async fn insert_row(
        &mut self,
        table: &str,
        row: &Snapshot,
        target_id: Option<i64>,
    ) -> Result<(), RecycleError> {
        let id = {
            let state = self.store.state();
            let Some(t) = state.tables.get(table) else {
                return Err(RecycleError::RestoreWriteFailed(format!(
                    "relation \"{}\" does not exist",
                    table
                )));
            };
            if let Some(columns) = &t.columns {
                if let Some(unknown) = row.columns().find(|c| !columns.iter().any(|k| k == c)) {
                    return Err(RecycleError::RestoreWriteFailed(format!(
                        "column \"{}\" of relation \"{}\" does not exist",
                        unknown, table
                    )));
                }
            }
            match target_id {
                Some(id) => id,
                None => {
                    let staged_max = self
                        .pending
                        .iter()
                        .filter_map(|w| match w {
                            PendingWrite::Insert { table: t, id, .. } if t == table => Some(*id),
                            _ => None,
                        })
                        .max()
                        .unwrap_or(0);
                    t.next_id().max(staged_max + 1)
                }
            }
        };

        if self.row_exists(table, id).await? {
            return Err(RecycleError::IdCollision { table: table.to_string(), id });
        }

        let mut stored = row.to_record();
        stored.insert("id".to_string(), Value::from(id));
        self.pending.push(PendingWrite::Insert { table: table.to_string(), id, row: stored });
        Ok(())
    }

    async fn mark_restored(&mut self, id: i64, at: DateTime<Utc>) -> Result<u64, RecycleError> {
        let live_unrestored = self
            .store
            .state()
            .entries
            .get(&id)
            .map(|e| e.restored_at.is_none())
            .unwrap_or(false);
        if !live_unrestored || self.pending_restored(id) {
            return Ok(0);
        }
        self.pending.push(PendingWrite::MarkRestored { id, at });
        Ok(1)
    }

    async fn fetch_row_for_delete(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<Map<String, Value>>, RecycleError> {
        // Read only after the lock is ours; a racing delete may have committed.
        self.acquire(LockKey::Row(table.to_string(), id)).await;
        if self.pending_delete(table, id) {
            return Ok(None);
        }
        let state = self.store.state();
        match state.tables.get(table) {
            Some(t) => Ok(t.rows.get(&id).cloned()),
            None => Err(RecycleError::PersistenceError(format!(
                "relation \"{}\" does not exist",
                table
            ))),
        }
    }

    async fn append(&mut self, entry: NewRecycleEntry) -> Result<i64, RecycleError> {
        // Ids are reserved eagerly, like a sequence; a rollback leaves a gap.
        let id = {
            let mut state = self.store.state();
            state.next_entry_id += 1;
            state.next_entry_id
        };
        self.pending.push(PendingWrite::Append { id, entry });
        Ok(id)
    }

    async fn delete_row(&mut self, table: &str, id: i64) -> Result<u64, RecycleError> {
        if self.fetch_row_for_delete(table, id).await?.is_none() {
            return Ok(0);
        }
        self.pending.push(PendingWrite::Delete { table: table.to_string(), id });
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), RecycleError> {
        let mut this = self;
        let pending = std::mem::take(&mut this.pending);
        let mut state = this.store.state();

        // Validate everything before touching state so commit is all-or-nothing.
        for write in &pending {
            match write {
                PendingWrite::Insert { table, id, .. } => {
                    let clash = state.tables.get(table).map(|t| t.rows.contains_key(id)).unwrap_or(false);
                    let deleted_first = pending.iter().any(|w| {
                        matches!(w, PendingWrite::Delete { table: t, id: i } if t == table && i == id)
                    });
                    if clash && !deleted_first {
                        return Err(RecycleError::IdCollision { table: table.clone(), id: *id });
                    }
                }
                PendingWrite::MarkRestored { id, .. } => {
                    if state.entries.get(id).map(|e| e.restored_at.is_some()).unwrap_or(true) {
                        return Err(RecycleError::ConcurrentRestoreDetected(*id));
                    }
                }
                PendingWrite::Delete { table, id } => {
                    let live = state.tables.get(table).map(|t| t.rows.contains_key(id)).unwrap_or(false);
                    let inserted_here = pending.iter().any(|w| {
                        matches!(w, PendingWrite::Insert { table: t, id: i, .. } if t == table && i == id)
                    });
                    if !live && !inserted_here {
                        return Err(RecycleError::RecordNotFound { table: table.clone(), id: *id });
                    }
                }
                PendingWrite::Append { .. } => {}
            }
        }

        for write in pending {
            match write {
                PendingWrite::Insert { table, id, row } => {
                    state.tables.entry(table).or_default().rows.insert(id, row);
                }
                PendingWrite::MarkRestored { id, at } => {
                    if let Some(entry) = state.entries.get_mut(&id) {
                        entry.restored_at = Some(at);
                    }
                }
                PendingWrite::Append { id, entry } => {
                    state.entries.insert(
                        id,
                        RecycleEntry {
                            id,
                            original_table: entry.original_table,
                            original_id: entry.original_id,
                            data: Some(entry.data),
                            deleted_by: entry.deleted_by,
                            deleted_at: entry.deleted_at,
                            restored_at: None,
                        },
                    );
                }
                PendingWrite::Delete { table, id } => {
                    if let Some(t) = state.tables.get_mut(&table) {
                        t.rows.remove(&id);
                    }
                }
            }
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RecycleError> {
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        let keys: Vec<LockKey> = self.held.iter().map(|(key, _)| key.clone()).collect();
        self.held.clear();
        self.store.prune_locks(&keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn store_with_row() -> MemoryRecycleStore {
        let store = MemoryRecycleStore::new();
        store.insert_live_row("minutes", json!({"id": 9, "body": "Roll call"}).as_object().cloned().unwrap());
        store
    }

    fn new_entry(id: i64) -> NewRecycleEntry {
        NewRecycleEntry {
            original_table: "minutes".to_string(),
            original_id: Some(id),
            data: format!(r#"{{"id":{}}}"#, id),
            deleted_by: None,
            deleted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_delete_waits_for_row_lock_and_sees_nothing() {
        let store = store_with_row();

        let mut first = store.begin().await.unwrap();
        assert!(first.fetch_row_for_delete("minutes", 9).await.unwrap().is_some());

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let row = tx.fetch_row_for_delete("minutes", 9).await.unwrap();
                let deleted = tx.delete_row("minutes", 9).await.unwrap();
                (row, deleted)
            })
        };

        // The contender is parked on the row lock until the first commits
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        first.append(new_entry(9)).await.unwrap();
        assert_eq!(first.delete_row("minutes", 9).await.unwrap(), 1);
        first.commit().await.unwrap();

        let (row, deleted) = contender.await.unwrap();
        assert!(row.is_none());
        assert_eq!(deleted, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_rejects_delete_of_vanished_row() {
        let store = store_with_row();

        let mut tx = store.begin().await.unwrap();
        tx.append(new_entry(9)).await.unwrap();
        assert_eq!(tx.delete_row("minutes", 9).await.unwrap(), 1);

        // Removed behind the transaction's back
        store.state().tables.get_mut("minutes").unwrap().rows.remove(&9);

        let err = tx.commit().await.unwrap_err();
        assert_eq!(err, RecycleError::RecordNotFound { table: "minutes".into(), id: 9 });
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn locks_are_released_when_transactions_end() {
        let store = store_with_row();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_for_restore(999).await.unwrap().is_none());
        tx.fetch_row_for_delete("minutes", 9).await.unwrap();
        assert_eq!(store.lock_count(), 2);
        tx.rollback().await.unwrap();
        assert_eq!(store.lock_count(), 0);

        let mut tx = store.begin().await.unwrap();
        tx.lock_for_restore(1).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.lock_count(), 0);

        let mut tx = store.begin().await.unwrap();
        tx.lock_for_restore(2).await.unwrap();
        drop(tx);
        assert_eq!(store.lock_count(), 0);
    }
}
