//! Storage collaborators: pluggable seams plus in-memory implementations

pub mod memory;
pub mod traits;

pub use memory::{CallLogEntry, MemoryNetworkCache, MemoryPersistentStore};
pub use traits::{NetworkCache, PersistentStore, StorageError, StorageResult};
