//! Storage collaborator seams
//!
//! The gateway never talks to a concrete cache or database; it goes through
//! these traits so deployments can plug in Redis, Postgres, or the in-memory
//! implementations shipped for tests and development.

use crate::models::PlanRecord;
use async_trait::async_trait;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures raised by storage collaborators
///
/// These never propagate to gateway callers directly; every storage call is
/// either best-effort or part of a fallback chain.
#[derive(Error, Debug)]
pub enum StorageError {
	#[error("Connection error: {0}")]
	Connection(String),

	#[error("Backend error: {0}")]
	Backend(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Shared cross-instance cache tier (e.g. Redis)
///
/// Unavailability degrades the gateway to the memory and persistent tiers;
/// it is never a hard dependency.
#[async_trait]
pub trait NetworkCache: Send + Sync {
	async fn get(&self, key: &str) -> StorageResult<Option<Vec<PlanRecord>>>;

	async fn set(&self, key: &str, records: &[PlanRecord], ttl_seconds: u64) -> StorageResult<()>;

	/// Remove all entries matching the pattern; a trailing `*` matches a prefix
	async fn invalidate(&self, pattern: &str) -> StorageResult<usize>;

	async fn is_connected(&self) -> bool;
}

/// Persistent last-known-good store and call audit log (e.g. Postgres)
#[async_trait]
pub trait PersistentStore: Send + Sync {
	/// TTL-respecting read of previously cached records
	async fn get_cached(&self, key: &str) -> StorageResult<Option<Vec<PlanRecord>>>;

	/// Store records with a TTL, also refreshing the last-known-good copy
	async fn set_cached(
		&self,
		key: &str,
		records: &[PlanRecord],
		ttl_hours: u64,
	) -> StorageResult<()>;

	/// Authoritative last-known-good read, ignoring TTL
	async fn get_active(&self, key: &str) -> StorageResult<Vec<PlanRecord>>;

	/// Record the outcome of one upstream call attempt
	async fn log_call(
		&self,
		url: &str,
		params: &str,
		status_code: Option<u16>,
		latency_ms: u64,
		error_message: Option<&str>,
	) -> StorageResult<()>;
}
