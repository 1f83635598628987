//! Per-user status accounting rows.
//!
//! [`RowStore`] is the storage seam used by the tracker; [`SqliteRowStore`]
//! is the durable implementation and [`InMemoryRowStore`] backs tests.

pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteRowStore;
pub use store::{InMemoryRowStore, RecordPatch, RowStore};
