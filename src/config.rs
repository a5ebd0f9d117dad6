//! Gateway configuration
//!
//! Settings structs with serde defaults plus a file loader. Every knob has a
//! production-safe default so an empty config file yields a working gateway.

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// Top-level gateway settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewaySettings {
	#[serde(default)]
	pub upstream: UpstreamSettings,
	#[serde(default)]
	pub cache: CacheSettings,
	#[serde(default)]
	pub retry: RetrySettings,
	#[serde(default)]
	pub circuit_breaker: CircuitBreakerSettings,
	#[serde(default)]
	pub scheduler: SchedulerSettings,
}

/// Upstream pricing API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
	/// Base URL of the plan pricing API
	pub base_url: String,
	/// Hard per-call timeout in milliseconds
	pub timeout_ms: u64,
}

impl Default for UpstreamSettings {
	fn default() -> Self {
		Self {
			base_url: "https://api.powertochoose.example.com/v1/plans".to_string(),
			timeout_ms: 15_000,
		}
	}
}

/// Cache tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
	/// Maximum entries held by the in-process tier
	pub memory_capacity: usize,
	/// In-process entry time-to-live in seconds
	pub memory_ttl_seconds: u64,
	/// Interval between proactive expiry sweeps in seconds
	pub sweep_interval_seconds: u64,
	/// Shared network cache time-to-live in seconds
	pub network_ttl_seconds: u64,
	/// Persistent store time-to-live in hours
	pub persistent_ttl_hours: u64,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			memory_capacity: 500,
			memory_ttl_seconds: 600,
			sweep_interval_seconds: 60,
			network_ttl_seconds: 1800,
			persistent_ttl_hours: 24,
		}
	}
}

/// Retry controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
	/// Maximum attempts per call chain, including the first
	pub max_attempts: u32,
	/// Escalating backoff schedule; attempts beyond its length reuse the last value
	pub backoff_schedule_ms: Vec<u64>,
	/// Jitter fraction applied to each delay (0.2 = ±20%)
	pub jitter: f64,
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff_schedule_ms: vec![1_000, 2_000, 4_000, 8_000, 16_000],
			jitter: 0.2,
		}
	}
}

/// Circuit breaker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
	/// Consecutive failures before the circuit opens
	pub failure_threshold: u32,
	/// How long the circuit stays open before probing recovery, in milliseconds
	pub recovery_timeout_ms: u64,
	/// Maximum concurrent probe calls while half-open
	pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
	fn default() -> Self {
		Self {
			failure_threshold: 5,
			recovery_timeout_ms: 30_000,
			half_open_max_calls: 1,
		}
	}
}

/// Outbound request scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
	/// Ceiling on upstream requests per rolling one-second window
	pub requests_per_second: u32,
	/// Burst control: maximum dispatches per second, spacing consecutive dispatches
	pub burst_per_second: u32,
	/// Maximum concurrently in-flight dispatched tasks
	pub max_concurrent: usize,
}

impl Default for SchedulerSettings {
	fn default() -> Self {
		Self {
			requests_per_second: 10,
			burst_per_second: 20,
			max_concurrent: 4,
		}
	}
}

/// Load settings from `config/gateway.*`, falling back to defaults
pub fn load_config() -> Result<GatewaySettings, ConfigError> {
	let s = Config::builder()
		.add_source(File::with_name("config/gateway").required(false))
		.build()?;

	s.try_deserialize()
}
