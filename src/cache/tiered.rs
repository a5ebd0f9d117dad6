//! Tiered cache resolution
//!
//! Resolves a lookup through memory, then the shared network cache, then the
//! persistent store. A hit at any tier short-circuits and back-fills the
//! faster tiers above it. Tier failures degrade, they never propagate.

use crate::cache::entry::CachePriority;
use crate::cache::memory::{BoundedMemoryCache, MemoryCacheStats};
use crate::config::CacheSettings;
use crate::models::{LookupKey, PlanRecord};
use crate::storage::{NetworkCache, PersistentStore};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hit/miss counters per tier
#[derive(Debug, Default)]
struct TierCounters {
	memory_hits: AtomicU64,
	network_hits: AtomicU64,
	persistent_hits: AtomicU64,
	misses: AtomicU64,
}

/// Cache resolution statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
	pub memory_hits: u64,
	pub network_hits: u64,
	pub persistent_hits: u64,
	pub misses: u64,
	pub memory: MemoryCacheStats,
}

/// Resolver over the three cache tiers
#[derive(Clone)]
pub struct TieredCacheResolver {
	memory: Arc<BoundedMemoryCache>,
	network: Arc<dyn NetworkCache>,
	store: Arc<dyn PersistentStore>,
	settings: CacheSettings,
	counters: Arc<TierCounters>,
}

impl TieredCacheResolver {
	pub fn new(
		memory: Arc<BoundedMemoryCache>,
		network: Arc<dyn NetworkCache>,
		store: Arc<dyn PersistentStore>,
		settings: CacheSettings,
	) -> Self {
		Self {
			memory,
			network,
			store,
			settings,
			counters: Arc::new(TierCounters::default()),
		}
	}

	/// Resolve a key through the tiers; `None` means a full miss
	pub async fn resolve(&self, key: &LookupKey) -> Option<Vec<PlanRecord>> {
		let cache_key = key.cache_key();

		if let Some(records) = self.memory.get(&cache_key) {
			self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
			debug!("Memory tier hit for {}", cache_key);
			return Some(records.as_ref().clone());
		}

		if self.network.is_connected().await {
			match self.network.get(&cache_key).await {
				Ok(Some(records)) => {
					self.counters.network_hits.fetch_add(1, Ordering::Relaxed);
					debug!("Network tier hit for {}", cache_key);
					self.memory
						.insert(&cache_key, records.clone(), CachePriority::Medium);
					return Some(records);
				},
				Ok(None) => {},
				Err(e) => warn!("Network cache read failed for {}: {}", cache_key, e),
			}
		}

		match self.store.get_cached(&cache_key).await {
			Ok(Some(records)) => {
				self.counters.persistent_hits.fetch_add(1, Ordering::Relaxed);
				debug!("Persistent tier hit for {}", cache_key);
				self.backfill_fast_tiers(&cache_key, &records).await;
				return Some(records);
			},
			Ok(None) => {},
			Err(e) => warn!("Persistent store read failed for {}: {}", cache_key, e),
		}

		self.counters.misses.fetch_add(1, Ordering::Relaxed);
		None
	}

	/// Store records across every tier, best-effort beyond the memory tier
	pub async fn store(&self, key: &LookupKey, records: &[PlanRecord], priority: CachePriority) {
		let cache_key = key.cache_key();
		self.memory.insert(&cache_key, records.to_vec(), priority);

		if let Err(e) = self
			.network
			.set(&cache_key, records, self.settings.network_ttl_seconds)
			.await
		{
			warn!("Network cache write failed for {}: {}", cache_key, e);
		}

		if let Err(e) = self
			.store
			.set_cached(&cache_key, records, self.settings.persistent_ttl_hours)
			.await
		{
			warn!("Persistent store write failed for {}: {}", cache_key, e);
		}
	}

	/// TTL-ignoring memory read, for the stale-data fallback
	pub fn stale_memory(&self, key: &LookupKey) -> Option<Vec<PlanRecord>> {
		self.memory
			.get_stale(&key.cache_key())
			.map(|records| records.as_ref().clone())
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
			network_hits: self.counters.network_hits.load(Ordering::Relaxed),
			persistent_hits: self.counters.persistent_hits.load(Ordering::Relaxed),
			misses: self.counters.misses.load(Ordering::Relaxed),
			memory: self.memory.stats(),
		}
	}

	async fn backfill_fast_tiers(&self, cache_key: &str, records: &[PlanRecord]) {
		self.memory
			.insert(cache_key, records.to_vec(), CachePriority::Medium);
		if let Err(e) = self
			.network
			.set(cache_key, records, self.settings.network_ttl_seconds)
			.await
		{
			warn!("Network cache back-fill failed for {}: {}", cache_key, e);
		}
	}
}
