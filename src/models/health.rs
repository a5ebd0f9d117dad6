//! Gateway health report shape

use serde::Serialize;

/// Result of `TariffGateway::health_status`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
	/// Overall verdict: upstream reachable and circuit not open
	pub healthy: bool,
	/// Whether the circuit breaker is currently open
	pub circuit_open: bool,
	/// Whether the shared network cache tier is reachable
	pub network_cache_connected: bool,
	/// Upstream ping latency, when the ping succeeded
	pub latency_ms: Option<u64>,
}
