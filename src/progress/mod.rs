//! Learning progress: grade, view mode, filter, and the learned/mastered word sets.
//!
//! The store persists each field under its own durable key and validates each
//! key independently on hydration, so one corrupt value never resets the rest.

mod storage;
mod store;
mod types;

pub use storage::{KeyValueStorage, MemoryStorage, SqliteKvStorage};
pub use store::{ProgressStore, StorageKeys};
pub use types::{Filter, Grade, ProgressState, ViewMode};
