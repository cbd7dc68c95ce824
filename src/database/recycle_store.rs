use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::database::dynamic::{bind_value, build_insert, column_types};
use crate::recycle::codec::Snapshot;
use crate::recycle::entry::{NewRecycleEntry, RecycleEntry, COLUMNS};
use crate::recycle::error::RecycleError;
use crate::recycle::guard::quote_identifier;
use crate::recycle::store::{RecycleStore, RecycleTransaction};

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed recycle bin
#[derive(Clone)]
pub struct PgRecycleStore {
    pool: PgPool,
}

impl PgRecycleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the recycle_bin table and its listing index if missing
    pub async fn ensure_schema(&self) -> Result<(), RecycleError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS recycle_bin (
                id BIGSERIAL PRIMARY KEY,
                original_table TEXT NOT NULL,
                original_id BIGINT,
                data TEXT,
                deleted_by TEXT,
                deleted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                restored_at TIMESTAMPTZ
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS recycle_bin_deleted_at_idx ON recycle_bin (deleted_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("recycle_bin schema ready");
        Ok(())
    }
}

#[async_trait]
impl RecycleStore for PgRecycleStore {
    async fn append(&self, entry: NewRecycleEntry) -> Result<i64, RecycleError> {
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut *conn, &entry).await
    }

    async fn count(&self) -> Result<i64, RecycleError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recycle_bin")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn page(&self, limit: i64, offset: i64) -> Result<Vec<RecycleEntry>, RecycleError> {
        let query = format!(
            "SELECT {COLUMNS} FROM recycle_bin ORDER BY deleted_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let entries = sqlx::query_as::<_, RecycleEntry>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn find(&self, id: i64) -> Result<Option<RecycleEntry>, RecycleError> {
        let query = format!("SELECT {COLUMNS} FROM recycle_bin WHERE id = $1");
        let entry = sqlx::query_as::<_, RecycleEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn begin(&self) -> Result<Box<dyn RecycleTransaction>, RecycleError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgRecycleTransaction { tx }))
    }
}

pub struct PgRecycleTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RecycleTransaction for PgRecycleTransaction {
    async fn lock_for_restore(&mut self, id: i64) -> Result<Option<RecycleEntry>, RecycleError> {
        let query = format!("SELECT {COLUMNS} FROM recycle_bin WHERE id = $1 FOR UPDATE");
        let entry = sqlx::query_as::<_, RecycleEntry>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(entry)
    }

    async fn row_exists(&mut self, table: &str, id: i64) -> Result<bool, RecycleError> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            quote_identifier(table)
        );
        let exists: (bool,) = sqlx::query_as(&query)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists.0)
    }

    async fn insert_row(
        &mut self,
        table: &str,
        row: &Snapshot,
        target_id: Option<i64>,
    ) -> Result<(), RecycleError> {
        let types = column_types(&mut *self.tx, table)
            .await
            .map_err(|e| RecycleError::RestoreWriteFailed(e.to_string()))?;
        let sql = build_insert(table, row, &types);
        let bind_types: String = row.iter().map(|(_, v)| v.bind_type()).collect();
        tracing::debug!(table, bind_types = %bind_types, "inserting restored row");

        let mut q = sqlx::query(&sql);
        for (_, value) in row.iter() {
            q = bind_value(q, value);
        }

        match q.execute(&mut *self.tx).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                tracing::warn!("Unique violation restoring into {}: {}", table, db.message());
                match target_id {
                    Some(id) => Err(RecycleError::IdCollision { table: table.to_string(), id }),
                    None => Err(RecycleError::RestoreWriteFailed(db.message().to_string())),
                }
            }
            Err(e) => Err(RecycleError::RestoreWriteFailed(e.to_string())),
        }
    }

    async fn mark_restored(&mut self, id: i64, at: DateTime<Utc>) -> Result<u64, RecycleError> {
        let result = sqlx::query(
            "UPDATE recycle_bin SET restored_at = $2 WHERE id = $1 AND restored_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_row_for_delete(
        &mut self,
        table: &str,
        id: i64,
    ) -> Result<Option<Map<String, Value>>, RecycleError> {
        let query = format!(
            "SELECT row_to_json(t) AS row FROM {} t WHERE t.id = $1 FOR UPDATE",
            quote_identifier(table)
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => match row.try_get::<Value, _>("row")? {
                Value::Object(map) => Ok(Some(map)),
                other => Err(RecycleError::PersistenceError(format!(
                    "unexpected row shape from {}: {}",
                    table, other
                ))),
            },
            None => Ok(None),
        }
    }

    async fn append(&mut self, entry: NewRecycleEntry) -> Result<i64, RecycleError> {
        insert_entry(&mut *self.tx, &entry).await
    }

    async fn delete_row(&mut self, table: &str, id: i64) -> Result<u64, RecycleError> {
        let query = format!("DELETE FROM {} WHERE id = $1", quote_identifier(table));
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), RecycleError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RecycleError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn insert_entry(
    conn: &mut sqlx::PgConnection,
    entry: &NewRecycleEntry,
) -> Result<i64, RecycleError> {
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO recycle_bin (original_table, original_id, data, deleted_by, deleted_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(&entry.original_table)
    .bind(entry.original_id)
    .bind(&entry.data)
    .bind(&entry.deleted_by)
    .bind(entry.deleted_at)
    .fetch_one(conn)
    .await?;
    Ok(id.0)
}
