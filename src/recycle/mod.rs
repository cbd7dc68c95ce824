//! Generic recycle bin: capture deleted rows as snapshots and restore them
//! into their original tables without compile-time schema knowledge.

pub mod codec;
pub mod entry;
pub mod error;
pub mod guard;
pub mod listing;
pub mod memory;
pub mod restore;
pub mod service;
pub mod store;

pub use codec::{Snapshot, SnapshotValue};
pub use entry::{NewRecycleEntry, RecycleEntry};
pub use error::RecycleError;
pub use guard::{validate_identifier, SchemaGuard};
pub use listing::{EntrySummary, ListOutcome, ListPage, PageRequest};
pub use memory::MemoryRecycleStore;
pub use restore::{CallerContext, RestoreStage, RestoredRecord};
pub use service::{EntryDetail, RecycleBin, TrashedRecord};
pub use store::{RecycleStore, RecycleTransaction};
