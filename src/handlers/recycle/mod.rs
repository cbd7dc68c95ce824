// handlers/recycle/mod.rs - Recycle bin handlers

pub mod capture;  // POST /api/recycle
pub mod list;     // GET /api/recycle
pub mod restore;  // POST /api/recycle/:id/restore
pub mod show;     // GET /api/recycle/:id
pub mod trash;    // DELETE /api/data/:table/:id

pub use capture::recycle_capture;
pub use list::recycle_list;
pub use restore::recycle_restore;
pub use show::recycle_show;
pub use trash::record_delete;
