//! Process-local circuit breaker
//!
//! Trips open after a run of consecutive failures, fails calls fast while
//! open, and probes recovery through a half-open state. Each service
//! instance trips and recovers independently; there is no cross-instance
//! coordination.

use crate::config::CircuitBreakerSettings;
use crate::errors::{GatewayError, GatewayResult};
use crate::models::{CircuitSnapshot, CircuitState};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct BreakerInner {
	state: CircuitState,
	consecutive_failures: u32,
	last_failure_at: Option<DateTime<Utc>>,
	opened_at: Option<DateTime<Utc>>,
	next_probe_at: Option<DateTime<Utc>>,
	probes_in_flight: u32,
	recovery_attempts: u32,
}

/// Failure-isolation state machine guarding the upstream call path
pub struct CircuitBreaker {
	inner: Mutex<BreakerInner>,
	settings: CircuitBreakerSettings,
}

impl CircuitBreaker {
	pub fn new(settings: CircuitBreakerSettings) -> Self {
		Self {
			inner: Mutex::new(BreakerInner {
				state: CircuitState::Closed,
				consecutive_failures: 0,
				last_failure_at: None,
				opened_at: None,
				next_probe_at: None,
				probes_in_flight: 0,
				recovery_attempts: 0,
			}),
			settings,
		}
	}

	fn recovery_timeout(&self) -> Duration {
		Duration::milliseconds(self.settings.recovery_timeout_ms as i64)
	}

	/// Admission check before an upstream call; non-suspending
	///
	/// While open, transitions to half-open once the recovery timeout has
	/// elapsed and admits the current caller as the probe. While half-open,
	/// admits at most `half_open_max_calls` concurrent probes; an excess probe
	/// re-opens the circuit and starts a fresh recovery window.
	pub fn try_acquire(&self) -> GatewayResult<()> {
		let mut inner = self.lock();
		match inner.state {
			CircuitState::Closed => Ok(()),
			CircuitState::Open => {
				let now = Utc::now();
				let probe_due = inner.next_probe_at.map(|at| now >= at).unwrap_or(false);
				if probe_due {
					inner.state = CircuitState::HalfOpen;
					inner.probes_in_flight = 1;
					info!(
						"Circuit breaker half-open, admitting recovery probe (attempt #{})",
						inner.recovery_attempts + 1
					);
					Ok(())
				} else {
					let retry_in_ms = inner
						.next_probe_at
						.map(|at| (at - now).num_milliseconds().max(0))
						.unwrap_or(0);
					Err(GatewayError::CircuitOpen {
						reason: format!("recovery probe in {}ms", retry_in_ms),
					})
				}
			},
			CircuitState::HalfOpen => {
				if inner.probes_in_flight < self.settings.half_open_max_calls {
					inner.probes_in_flight += 1;
					Ok(())
				} else {
					// Exceeding the probe limit aborts recovery: back to open
					// with a fresh recovery window
					let now = Utc::now();
					warn!(
						"Circuit breaker re-opened - more than {} concurrent recovery probes attempted",
						self.settings.half_open_max_calls
					);
					inner.state = CircuitState::Open;
					inner.opened_at = Some(now);
					inner.next_probe_at = Some(now + self.recovery_timeout());
					inner.probes_in_flight = 0;
					inner.recovery_attempts += 1;
					Err(GatewayError::CircuitOpen {
						reason: format!(
							"half-open probe limit of {} exceeded",
							self.settings.half_open_max_calls
						),
					})
				}
			},
		}
	}

	/// Record a successful guarded call
	pub fn record_success(&self) {
		let mut inner = self.lock();
		match inner.state {
			CircuitState::Closed => {
				inner.consecutive_failures = 0;
			},
			CircuitState::HalfOpen => {
				info!("Circuit breaker closed - recovery probe succeeded");
				inner.state = CircuitState::Closed;
				inner.consecutive_failures = 0;
				inner.opened_at = None;
				inner.next_probe_at = None;
				inner.probes_in_flight = 0;
				inner.recovery_attempts = 0;
			},
			CircuitState::Open => {
				// A straggler completing after the circuit opened; ignore
				debug!("Success recorded while circuit open, ignoring");
			},
		}
	}

	/// Record a failed guarded call
	pub fn record_failure(&self) {
		let mut inner = self.lock();
		let now = Utc::now();
		inner.last_failure_at = Some(now);

		match inner.state {
			CircuitState::Closed => {
				inner.consecutive_failures += 1;
				if inner.consecutive_failures >= self.settings.failure_threshold {
					warn!(
						"Circuit breaker opened after {} consecutive failures (recovery in {}ms)",
						inner.consecutive_failures, self.settings.recovery_timeout_ms
					);
					inner.state = CircuitState::Open;
					inner.opened_at = Some(now);
					inner.next_probe_at = Some(now + self.recovery_timeout());
				}
			},
			CircuitState::HalfOpen => {
				warn!(
					"Circuit breaker re-opened - recovery probe failed (attempt #{})",
					inner.recovery_attempts + 1
				);
				inner.state = CircuitState::Open;
				inner.opened_at = Some(now);
				inner.next_probe_at = Some(now + self.recovery_timeout());
				inner.probes_in_flight = 0;
				inner.recovery_attempts += 1;
			},
			CircuitState::Open => {},
		}
	}

	pub fn is_open(&self) -> bool {
		self.lock().state == CircuitState::Open
	}

	/// Point-in-time view for health reporting
	pub fn snapshot(&self) -> CircuitSnapshot {
		let inner = self.lock();
		CircuitSnapshot {
			state: inner.state,
			consecutive_failures: inner.consecutive_failures,
			opened_at: inner.opened_at,
			last_failure_at: inner.last_failure_at,
			next_probe_at: inner.next_probe_at,
			recovery_attempts: inner.recovery_attempts,
		}
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
		// The breaker mutex only guards plain field updates; a panic while
		// holding it leaves no torn state worth failing the caller over
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn breaker(threshold: u32, recovery_ms: u64, half_open_max: u32) -> CircuitBreaker {
		CircuitBreaker::new(CircuitBreakerSettings {
			failure_threshold: threshold,
			recovery_timeout_ms: recovery_ms,
			half_open_max_calls: half_open_max,
		})
	}

	#[test]
	fn stays_closed_below_threshold() {
		let cb = breaker(3, 1_000, 1);
		cb.record_failure();
		cb.record_failure();
		assert!(cb.try_acquire().is_ok());
		assert_eq!(cb.snapshot().state, CircuitState::Closed);
	}

	#[test]
	fn success_resets_the_consecutive_counter() {
		let cb = breaker(3, 1_000, 1);
		cb.record_failure();
		cb.record_failure();
		cb.record_success();
		cb.record_failure();
		cb.record_failure();
		assert_eq!(cb.snapshot().state, CircuitState::Closed);
		assert_eq!(cb.snapshot().consecutive_failures, 2);
	}

	#[test]
	fn opens_at_threshold_and_fails_fast() {
		let cb = breaker(2, 60_000, 1);
		cb.record_failure();
		cb.record_failure();

		assert!(cb.is_open());
		let err = cb.try_acquire().unwrap_err();
		assert!(matches!(err, GatewayError::CircuitOpen { .. }));
	}

	#[test]
	fn half_open_after_recovery_timeout_then_success_closes() {
		let cb = breaker(1, 10, 1);
		cb.record_failure();
		assert!(cb.is_open());

		std::thread::sleep(std::time::Duration::from_millis(20));

		// The first caller after the timeout is admitted as the probe
		assert!(cb.try_acquire().is_ok());
		assert_eq!(cb.snapshot().state, CircuitState::HalfOpen);

		cb.record_success();
		assert_eq!(cb.snapshot().state, CircuitState::Closed);
		assert_eq!(cb.snapshot().consecutive_failures, 0);
	}

	#[test]
	fn probe_failure_reopens_immediately() {
		let cb = breaker(1, 10, 1);
		cb.record_failure();
		std::thread::sleep(std::time::Duration::from_millis(20));
		assert!(cb.try_acquire().is_ok());

		cb.record_failure();
		assert!(cb.is_open());
		assert_eq!(cb.snapshot().recovery_attempts, 1);

		// And the fresh open period rejects callers again
		assert!(cb.try_acquire().is_err());
	}

	#[test]
	fn excess_concurrent_probes_are_rejected() {
		let cb = breaker(1, 10, 2);
		cb.record_failure();
		std::thread::sleep(std::time::Duration::from_millis(20));

		assert!(cb.try_acquire().is_ok()); // admitted on open -> half-open transition
		assert!(cb.try_acquire().is_ok()); // second probe slot
		let err = cb.try_acquire().unwrap_err();
		assert!(matches!(err, GatewayError::CircuitOpen { .. }));
		assert_eq!(cb.snapshot().state, CircuitState::Open);
	}

	#[test]
	fn excess_probe_reopens_with_a_fresh_recovery_window() {
		let cb = breaker(1, 10, 1);
		cb.record_failure();
		std::thread::sleep(std::time::Duration::from_millis(20));
		assert!(cb.try_acquire().is_ok());
		assert_eq!(cb.snapshot().state, CircuitState::HalfOpen);

		let err = cb.try_acquire().unwrap_err();
		assert!(matches!(err, GatewayError::CircuitOpen { .. }));

		let snap = cb.snapshot();
		assert_eq!(snap.state, CircuitState::Open);
		assert_eq!(snap.recovery_attempts, 1);
		assert!(snap.next_probe_at.unwrap() > Utc::now());

		// The straggling first probe's outcome no longer decides the breaker
		cb.record_success();
		assert_eq!(cb.snapshot().state, CircuitState::Open);
	}

	#[test]
	fn snapshot_carries_probe_schedule() {
		let cb = breaker(1, 60_000, 1);
		cb.record_failure();

		let snap = cb.snapshot();
		assert!(snap.is_open());
		assert!(snap.opened_at.is_some());
		assert!(snap.next_probe_at.is_some());
		assert!(snap.next_probe_at.unwrap() > snap.opened_at.unwrap());
	}
}
