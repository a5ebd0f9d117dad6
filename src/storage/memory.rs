//! In-memory storage implementations using DashMap
//!
//! These back the network-cache and persistent-store seams in tests and
//! single-process deployments, and double as the reference shape for real
//! Redis/Postgres implementations.

use crate::models::PlanRecord;
use crate::storage::traits::{NetworkCache, PersistentStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone)]
struct NetworkEntry {
	records: Vec<PlanRecord>,
	expires_at: DateTime<Utc>,
}

/// In-memory stand-in for a shared network cache
///
/// The connected flag is settable so tests can simulate an unreachable cache.
#[derive(Clone, Default)]
pub struct MemoryNetworkCache {
	entries: Arc<DashMap<String, NetworkEntry>>,
	disconnected: Arc<AtomicBool>,
}

impl MemoryNetworkCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Simulate losing or regaining the cache connection
	pub fn set_connected(&self, connected: bool) {
		self.disconnected.store(!connected, Ordering::Relaxed);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[async_trait]
impl NetworkCache for MemoryNetworkCache {
	async fn get(&self, key: &str) -> StorageResult<Option<Vec<PlanRecord>>> {
		if self.disconnected.load(Ordering::Relaxed) {
			return Err(StorageError::Connection(
				"network cache is not connected".to_string(),
			));
		}

		let expired = match self.entries.get(key) {
			Some(entry) => {
				if entry.expires_at > Utc::now() {
					return Ok(Some(entry.records.clone()));
				}
				true
			},
			None => false,
		};

		// Guard dropped above; safe to remove now
		if expired {
			self.entries.remove(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, records: &[PlanRecord], ttl_seconds: u64) -> StorageResult<()> {
		if self.disconnected.load(Ordering::Relaxed) {
			return Err(StorageError::Connection(
				"network cache is not connected".to_string(),
			));
		}

		self.entries.insert(
			key.to_string(),
			NetworkEntry {
				records: records.to_vec(),
				expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
			},
		);
		Ok(())
	}

	async fn invalidate(&self, pattern: &str) -> StorageResult<usize> {
		let mut removed = 0;
		if let Some(prefix) = pattern.strip_suffix('*') {
			self.entries.retain(|key, _| {
				if key.starts_with(prefix) {
					removed += 1;
					false
				} else {
					true
				}
			});
		} else if self.entries.remove(pattern).is_some() {
			removed = 1;
		}

		if removed > 0 {
			debug!("Invalidated {} network cache entries for '{}'", removed, pattern);
		}
		Ok(removed)
	}

	async fn is_connected(&self) -> bool {
		!self.disconnected.load(Ordering::Relaxed)
	}
}

#[derive(Debug, Clone)]
struct StoredEntry {
	records: Vec<PlanRecord>,
	stored_at: DateTime<Utc>,
	ttl_hours: u64,
}

/// One recorded upstream call attempt
#[derive(Debug, Clone)]
pub struct CallLogEntry {
	pub url: String,
	pub params: String,
	pub status_code: Option<u16>,
	pub latency_ms: u64,
	pub error_message: Option<String>,
	pub logged_at: DateTime<Utc>,
}

/// In-memory stand-in for the persistent last-known-good store
#[derive(Clone, Default)]
pub struct MemoryPersistentStore {
	entries: Arc<DashMap<String, StoredEntry>>,
	calls: Arc<Mutex<Vec<CallLogEntry>>>,
}

impl MemoryPersistentStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Recorded call log, oldest first
	pub fn call_log(&self) -> Vec<CallLogEntry> {
		self.calls.lock().map(|log| log.clone()).unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[async_trait]
impl PersistentStore for MemoryPersistentStore {
	async fn get_cached(&self, key: &str) -> StorageResult<Option<Vec<PlanRecord>>> {
		match self.entries.get(key) {
			Some(entry) => {
				let expires_at = entry.stored_at + Duration::hours(entry.ttl_hours as i64);
				if expires_at > Utc::now() {
					Ok(Some(entry.records.clone()))
				} else {
					Ok(None)
				}
			},
			None => Ok(None),
		}
	}

	async fn set_cached(
		&self,
		key: &str,
		records: &[PlanRecord],
		ttl_hours: u64,
	) -> StorageResult<()> {
		self.entries.insert(
			key.to_string(),
			StoredEntry {
				records: records.to_vec(),
				stored_at: Utc::now(),
				ttl_hours,
			},
		);
		Ok(())
	}

	async fn get_active(&self, key: &str) -> StorageResult<Vec<PlanRecord>> {
		// Last-known-good ignores TTL on purpose
		Ok(self
			.entries
			.get(key)
			.map(|entry| entry.records.clone())
			.unwrap_or_default())
	}

	async fn log_call(
		&self,
		url: &str,
		params: &str,
		status_code: Option<u16>,
		latency_ms: u64,
		error_message: Option<&str>,
	) -> StorageResult<()> {
		let entry = CallLogEntry {
			url: url.to_string(),
			params: params.to_string(),
			status_code,
			latency_ms,
			error_message: error_message.map(|m| m.to_string()),
			logged_at: Utc::now(),
		};
		self.calls
			.lock()
			.map_err(|_| StorageError::Backend("call log mutex poisoned".to_string()))?
			.push(entry);
		Ok(())
	}
}
