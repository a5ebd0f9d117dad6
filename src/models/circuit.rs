//! Circuit breaker state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circuit breaker state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
	/// Normal operation - calls pass through, failures counted
	Closed,
	/// Calls fail immediately - upstream is failing
	Open,
	/// Testing recovery - a bounded number of probe calls allowed
	HalfOpen,
}

/// Point-in-time view of the breaker, for health reporting and logs
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
	pub state: CircuitState,
	/// Consecutive failures observed while closed
	pub consecutive_failures: u32,
	/// When the circuit last opened, if it is currently open
	pub opened_at: Option<DateTime<Utc>>,
	/// When the last failure was recorded
	pub last_failure_at: Option<DateTime<Utc>>,
	/// When the next recovery probe will be admitted
	pub next_probe_at: Option<DateTime<Utc>>,
	/// How many times recovery has been attempted and failed
	pub recovery_attempts: u32,
}

impl CircuitSnapshot {
	pub fn is_open(&self) -> bool {
		self.state == CircuitState::Open
	}
}
