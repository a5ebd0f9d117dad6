//! Cache tiers: bounded in-process cache plus the tiered resolver

pub mod entry;
pub mod memory;
pub mod tiered;

pub use entry::{CacheEntry, CachePriority};
pub use memory::{BoundedMemoryCache, MemoryCacheStats};
pub use tiered::{CacheStats, TieredCacheResolver};
