//! Bounded in-process cache tier
//!
//! A first-class cache type with an explicit capacity bound, score-based
//! batch eviction, and a periodic TTL sweep running as a cancellable
//! background task.

use crate::cache::entry::{CacheEntry, CachePriority};
use crate::models::PlanRecord;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Snapshot of the memory tier for stats reporting
#[derive(Debug, Clone, Serialize)]
pub struct MemoryCacheStats {
	pub entries: usize,
	pub capacity: usize,
}

/// In-process cache with capacity enforcement and TTL expiry
#[derive(Clone)]
pub struct BoundedMemoryCache {
	entries: Arc<DashMap<String, CacheEntry>>,
	capacity: usize,
	ttl_seconds: u64,
}

impl BoundedMemoryCache {
	pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
		Self {
			entries: Arc::new(DashMap::new()),
			capacity: capacity.max(1),
			ttl_seconds,
		}
	}

	/// TTL-respecting read; records the access as advisory metadata
	///
	/// Expired entries miss but are left in place for [`get_stale`] until the
	/// sweeper purges them.
	///
	/// [`get_stale`]: BoundedMemoryCache::get_stale
	pub fn get(&self, key: &str) -> Option<Arc<Vec<PlanRecord>>> {
		let entry = self.entries.get(key)?;
		if entry.is_expired(self.ttl_seconds) {
			return None;
		}
		entry.touch();
		Some(entry.records())
	}

	/// Read ignoring TTL, for the stale-data fallback path
	pub fn get_stale(&self, key: &str) -> Option<Arc<Vec<PlanRecord>>> {
		self.entries.get(key).map(|entry| entry.records())
	}

	/// Insert or fully replace an entry, then enforce the capacity bound
	pub fn insert(&self, key: &str, records: Vec<PlanRecord>, priority: CachePriority) {
		self.entries
			.insert(key.to_string(), CacheEntry::new(records, priority));
		self.enforce_capacity();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn stats(&self) -> MemoryCacheStats {
		MemoryCacheStats {
			entries: self.entries.len(),
			capacity: self.capacity,
		}
	}

	/// Drop expired entries; returns how many were removed
	pub fn purge_expired(&self) -> usize {
		let mut removed = 0;
		self.entries.retain(|_key, entry| {
			if entry.is_expired(self.ttl_seconds) {
				removed += 1;
				false
			} else {
				true
			}
		});

		if removed > 0 {
			info!("Purged {} expired plan cache entries", removed);
		}
		removed
	}

	/// Evict lowest-scored entries in a batch when over capacity
	///
	/// Removes at least the overflow and at least 20% of the population so
	/// repeated inserts at the boundary do not thrash one-at-a-time.
	fn enforce_capacity(&self) {
		let len = self.entries.len();
		if len <= self.capacity {
			return;
		}

		let mut scored: Vec<(String, f64)> = self
			.entries
			.iter()
			.map(|entry| (entry.key().clone(), entry.value().eviction_score()))
			.collect();
		scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

		let batch = (len - self.capacity).max(len / 5);
		for (key, _score) in scored.into_iter().take(batch) {
			self.entries.remove(&key);
		}

		debug!(
			"Evicted {} plan cache entries ({} over capacity {})",
			batch,
			len - self.capacity,
			self.capacity
		);
	}

	/// Start the periodic expiry sweep; cancelled via the token at shutdown
	pub fn start_sweeper(
		&self,
		sweep_interval: Duration,
		cancel: CancellationToken,
	) -> JoinHandle<()> {
		let cache = self.clone();
		tokio::spawn(async move {
			let mut ticker = interval(sweep_interval);
			// The first tick fires immediately; skip it
			ticker.tick().await;
			loop {
				tokio::select! {
					_ = cancel.cancelled() => {
						debug!("Plan cache sweeper stopped");
						break;
					},
					_ = ticker.tick() => {
						cache.purge_expired();
					},
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(id: &str) -> PlanRecord {
		PlanRecord {
			plan_id: id.to_string(),
			provider_id: "prov-1".to_string(),
			provider_name: "Example Energy".to_string(),
			plan_name: "Saver 12".to_string(),
			rate_500_kwh: 14.2,
			rate_1000_kwh: 12.9,
			rate_2000_kwh: 11.8,
			term_months: 12,
			early_termination_fee: 150.0,
			auto_renewal: true,
			renewable_pct: 22.0,
			deposit_required: false,
			time_of_use: false,
		}
	}

	#[test]
	fn insert_then_get_round_trips() {
		let cache = BoundedMemoryCache::new(10, 600);
		cache.insert("k1", vec![record("a")], CachePriority::Medium);

		let hit = cache.get("k1").unwrap();
		assert_eq!(hit.len(), 1);
		assert_eq!(hit[0].plan_id, "a");
		assert!(cache.get("missing").is_none());
	}

	#[test]
	fn expired_entries_miss_but_stale_read_still_hits() {
		let cache = BoundedMemoryCache::new(10, 0);
		cache.insert("k1", vec![record("a")], CachePriority::Medium);

		assert!(cache.get("k1").is_none());
		// The expired entry stays until the sweeper runs
		assert!(cache.get_stale("k1").is_some());
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn insert_is_full_replacement() {
		let cache = BoundedMemoryCache::new(10, 600);
		cache.insert("k1", vec![record("a"), record("b")], CachePriority::Low);
		cache.insert("k1", vec![record("c")], CachePriority::High);

		let hit = cache.get("k1").unwrap();
		assert_eq!(hit.len(), 1);
		assert_eq!(hit[0].plan_id, "c");
	}

	#[test]
	fn over_capacity_eviction_removes_a_batch() {
		let cache = BoundedMemoryCache::new(10, 600);
		for i in 0..11 {
			cache.insert(&format!("k{}", i), vec![record("a")], CachePriority::Medium);
		}

		// Overflow of 1 but batch floor of 20% of 11 entries -> 2 removed
		assert_eq!(cache.len(), 9);
	}

	#[test]
	fn eviction_prefers_cold_low_priority_entries() {
		let cache = BoundedMemoryCache::new(4, 600);
		cache.insert("low-cold", vec![record("a")], CachePriority::Low);
		cache.insert("high-1", vec![record("b")], CachePriority::High);
		cache.insert("high-2", vec![record("c")], CachePriority::High);
		cache.insert("high-3", vec![record("d")], CachePriority::High);

		// Touch the high-priority entries so they score well
		cache.get("high-1");
		cache.get("high-2");
		cache.get("high-3");

		cache.insert("high-4", vec![record("e")], CachePriority::High);

		assert!(cache.get("low-cold").is_none());
		assert!(cache.get("high-3").is_some());
	}

	#[test]
	fn purge_expired_counts_removals() {
		let cache = BoundedMemoryCache::new(10, 0);
		cache.insert("k1", vec![record("a")], CachePriority::Medium);
		cache.insert("k2", vec![record("b")], CachePriority::Medium);

		assert_eq!(cache.purge_expired(), 2);
		assert!(cache.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn sweeper_purges_on_interval_and_stops_on_cancel() {
		let cache = BoundedMemoryCache::new(10, 0);
		cache.insert("k1", vec![record("a")], CachePriority::Medium);

		let cancel = CancellationToken::new();
		let handle = cache.start_sweeper(Duration::from_secs(60), cancel.clone());

		tokio::time::sleep(Duration::from_secs(61)).await;
		assert!(cache.is_empty());

		cancel.cancel();
		handle.await.unwrap();
	}
}
