//! Shared test doubles and fixtures for gateway integration tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tariff_gateway::storage::{PersistentStore, StorageError, StorageResult};
use tariff_gateway::{
	CacheSettings, CircuitBreakerSettings, GatewayError, GatewayResult, GatewaySettings,
	LookupKey, PlanRecord, RetrySettings, SchedulerSettings, UpstreamClient, UpstreamSettings,
};

/// Upstream double that replays a scripted sequence of responses
///
/// Once the script is exhausted, every further call returns the default
/// response. Call counts are tracked so tests can assert how many live
/// fetches actually happened.
pub struct ScriptedUpstream {
	script: Mutex<VecDeque<GatewayResult<Value>>>,
	default: GatewayResult<Value>,
	calls: AtomicU32,
	ping_ok: AtomicBool,
}

impl ScriptedUpstream {
	pub fn with_default(default: GatewayResult<Value>) -> Self {
		Self {
			script: Mutex::new(VecDeque::new()),
			default,
			calls: AtomicU32::new(0),
			ping_ok: AtomicBool::new(true),
		}
	}

	pub fn succeeding_with(payload: Value) -> Self {
		Self::with_default(Ok(payload))
	}

	pub fn always_unavailable() -> Self {
		Self::with_default(Err(service_unavailable()))
	}

	/// Queue one response ahead of the default
	pub fn push(&self, response: GatewayResult<Value>) {
		self.script.lock().unwrap().push_back(response);
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn set_ping_ok(&self, ok: bool) {
		self.ping_ok.store(ok, Ordering::SeqCst);
	}
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
	async fn fetch_raw(&self, _key: &LookupKey) -> GatewayResult<Value> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let scripted = self.script.lock().unwrap().pop_front();
		scripted.unwrap_or_else(|| self.default.clone())
	}

	async fn ping(&self) -> GatewayResult<u64> {
		if self.ping_ok.load(Ordering::SeqCst) {
			Ok(5)
		} else {
			Err(GatewayError::Network {
				reason: "ping failed".to_string(),
			})
		}
	}

	fn endpoint(&self) -> &str {
		"mock://plans"
	}
}

/// Persistent store double whose every operation fails
///
/// Used to prove that storage faults degrade the gateway instead of
/// breaking it.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl PersistentStore for FailingStore {
	async fn get_cached(&self, _key: &str) -> StorageResult<Option<Vec<PlanRecord>>> {
		Err(StorageError::Connection("store is down".to_string()))
	}

	async fn set_cached(
		&self,
		_key: &str,
		_records: &[PlanRecord],
		_ttl_hours: u64,
	) -> StorageResult<()> {
		Err(StorageError::Connection("store is down".to_string()))
	}

	async fn get_active(&self, _key: &str) -> StorageResult<Vec<PlanRecord>> {
		Err(StorageError::Connection("store is down".to_string()))
	}

	async fn log_call(
		&self,
		_url: &str,
		_params: &str,
		_status_code: Option<u16>,
		_latency_ms: u64,
		_error_message: Option<&str>,
	) -> StorageResult<()> {
		Err(StorageError::Connection("store is down".to_string()))
	}
}

/// Install a per-process tracing subscriber honoring `RUST_LOG`
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn service_unavailable() -> GatewayError {
	GatewayError::ServiceUnavailable {
		status_code: 503,
		reason: "Service Unavailable".to_string(),
	}
}

/// One well-formed upstream plan entry
pub fn plan_entry(id: &str) -> Value {
	json!({
		"plan_id": id,
		"provider_id": "prov-1",
		"provider_name": "Example Energy",
		"plan_name": format!("Plan {}", id),
		"price_kwh500": 14.2,
		"price_kwh1000": 12.9,
		"price_kwh2000": 11.8,
		"term_value": 12,
		"cancel_fee": 150,
		"auto_renewal": true,
		"renewable_energy_pct": 22,
		"deposit_required": false,
		"time_of_use": false
	})
}

/// Two valid entries and one missing its identity
pub fn mixed_payload() -> Value {
	json!([
		plan_entry("plan-1"),
		{"plan_id": "", "provider_id": "prov-2", "price_kwh1000": 10.0},
		plan_entry("plan-3"),
	])
}

/// Settings tuned for fast tests: millisecond backoffs and recovery windows
pub fn fast_settings() -> GatewaySettings {
	GatewaySettings {
		upstream: UpstreamSettings {
			base_url: "mock://plans".to_string(),
			timeout_ms: 1_000,
		},
		cache: CacheSettings {
			memory_capacity: 100,
			memory_ttl_seconds: 600,
			sweep_interval_seconds: 60,
			network_ttl_seconds: 600,
			persistent_ttl_hours: 24,
		},
		retry: RetrySettings {
			max_attempts: 1,
			backoff_schedule_ms: vec![10],
			jitter: 0.0,
		},
		circuit_breaker: CircuitBreakerSettings {
			failure_threshold: 2,
			recovery_timeout_ms: 100,
			half_open_max_calls: 1,
		},
		scheduler: SchedulerSettings {
			requests_per_second: 100,
			burst_per_second: 0,
			max_concurrent: 8,
		},
	}
}
