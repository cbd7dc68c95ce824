use thiserror::Error;

/// Every way a capture, listing or restore can fail.
///
/// The `Display` text is the operator-facing reason; `kind()` is the stable
/// code clients match on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecycleError {
    #[error("Table '{0}' is not restorable")]
    InvalidTable(String),

    #[error("Recycle bin entry {0} not found")]
    EntryNotFound(i64),

    #[error("Record {id} not found in {table}")]
    RecordNotFound { table: String, id: i64 },

    #[error("This record has already been restored")]
    AlreadyRestored(i64),

    #[error("Recycle bin data is corrupt: {0}")]
    CorruptSnapshot(String),

    #[error("Cannot restore because original ID already exists ({table} #{id})")]
    IdCollision { table: String, id: i64 },

    #[error("Failed to restore record: {0}")]
    RestoreWriteFailed(String),

    #[error("Entry {0} was restored by another request")]
    ConcurrentRestoreDetected(i64),

    #[error("Recycle bin storage error: {0}")]
    PersistenceError(String),
}

impl RecycleError {
    /// Stable error code for clients
    pub fn kind(&self) -> &'static str {
        match self {
            RecycleError::InvalidTable(_) => "INVALID_TABLE",
            RecycleError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            RecycleError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            RecycleError::AlreadyRestored(_) => "ALREADY_RESTORED",
            RecycleError::CorruptSnapshot(_) => "CORRUPT_SNAPSHOT",
            RecycleError::IdCollision { .. } => "ID_COLLISION",
            RecycleError::RestoreWriteFailed(_) => "RESTORE_WRITE_FAILED",
            RecycleError::ConcurrentRestoreDetected(_) => "CONCURRENT_RESTORE_DETECTED",
            RecycleError::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }

    /// True when re-issuing the same call can never succeed
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            RecycleError::PersistenceError(_) | RecycleError::RestoreWriteFailed(_)
        )
    }
}

impl From<sqlx::Error> for RecycleError {
    fn from(err: sqlx::Error) -> Self {
        RecycleError::PersistenceError(err.to_string())
    }
}
