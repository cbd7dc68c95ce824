pub mod dynamic;
pub mod manager;
pub mod recycle_store;

pub use manager::{DatabaseError, DatabaseManager};
pub use recycle_store::PgRecycleStore;
