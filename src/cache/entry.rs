//! In-process cache entry
//!
//! Entry content is immutable after creation; an update is a full
//! replacement. Access metadata lives in atomics so the read path can record
//! it without blocking or failing.

use crate::models::PlanRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Tier-assignment priority used in the eviction score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePriority {
	Low,
	Medium,
	High,
}

impl CachePriority {
	pub fn weight(self) -> f64 {
		match self {
			CachePriority::Low => 1.0,
			CachePriority::Medium => 2.0,
			CachePriority::High => 3.0,
		}
	}
}

/// One cached record list with advisory access metadata
#[derive(Debug)]
pub struct CacheEntry {
	records: Arc<Vec<PlanRecord>>,
	created_at: DateTime<Utc>,
	priority: CachePriority,
	access_count: AtomicU64,
	last_access_ms: AtomicI64,
}

impl CacheEntry {
	pub fn new(records: Vec<PlanRecord>, priority: CachePriority) -> Self {
		let now = Utc::now();
		Self {
			records: Arc::new(records),
			created_at: now,
			priority,
			access_count: AtomicU64::new(0),
			last_access_ms: AtomicI64::new(now.timestamp_millis()),
		}
	}

	/// Shared handle to the immutable record list
	pub fn records(&self) -> Arc<Vec<PlanRecord>> {
		Arc::clone(&self.records)
	}

	/// Record an access; advisory only, never blocks
	pub fn touch(&self) {
		self.access_count.fetch_add(1, Ordering::Relaxed);
		self.last_access_ms
			.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
	}

	pub fn is_expired(&self, ttl_seconds: u64) -> bool {
		let age = Utc::now().signed_duration_since(self.created_at);
		age.num_seconds() >= ttl_seconds as i64
	}

	fn idle_seconds(&self) -> f64 {
		let last = self.last_access_ms.load(Ordering::Relaxed);
		let idle_ms = (Utc::now().timestamp_millis() - last).max(0);
		idle_ms as f64 / 1000.0
	}

	/// Composite eviction score: priority weight and access frequency over
	/// recency
	///
	/// Lower scores are evicted first, so cold low-priority entries go before
	/// frequently-read high-priority ones.
	pub fn eviction_score(&self) -> f64 {
		let frequency = 1.0 + (self.access_count.load(Ordering::Relaxed) as f64).ln_1p();
		self.priority.weight() * frequency / (1.0 + self.idle_seconds())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn priority_ordering() {
		assert!(CachePriority::Low < CachePriority::Medium);
		assert!(CachePriority::Medium < CachePriority::High);
		assert!(CachePriority::High.weight() > CachePriority::Low.weight());
	}

	#[test]
	fn touch_updates_metadata() {
		let entry = CacheEntry::new(Vec::new(), CachePriority::Medium);
		assert_eq!(entry.access_count.load(Ordering::Relaxed), 0);
		entry.touch();
		entry.touch();
		assert_eq!(entry.access_count.load(Ordering::Relaxed), 2);
	}

	#[test]
	fn frequently_read_entries_score_above_untouched_peers() {
		let hot = CacheEntry::new(Vec::new(), CachePriority::Medium);
		let cold = CacheEntry::new(Vec::new(), CachePriority::Medium);
		for _ in 0..5 {
			hot.touch();
		}
		assert!(hot.eviction_score() > cold.eviction_score());
	}

	#[test]
	fn zero_ttl_expires_immediately() {
		let entry = CacheEntry::new(Vec::new(), CachePriority::Medium);
		assert!(entry.is_expired(0));
		assert!(!entry.is_expired(3600));
	}

	#[test]
	fn higher_priority_scores_above_lower_at_equal_recency() {
		let low = CacheEntry::new(Vec::new(), CachePriority::Low);
		let high = CacheEntry::new(Vec::new(), CachePriority::High);
		assert!(high.eviction_score() > low.eviction_score());
	}

	#[test]
	fn recently_touched_scores_above_idle() {
		let idle = CacheEntry::new(Vec::new(), CachePriority::Medium);
		// Simulate an hour of idleness
		idle.last_access_ms.store(
			Utc::now().timestamp_millis() - 3_600_000,
			Ordering::Relaxed,
		);
		let fresh = CacheEntry::new(Vec::new(), CachePriority::Medium);
		fresh.touch();
		assert!(fresh.eviction_score() > idle.eviction_score());
	}
}
