//! Retry controller
//!
//! Wraps a single upstream call with bounded retries. Errors are classified
//! through `GatewayError::is_retryable`; terminal errors return immediately.
//! Delays follow a fixed escalating schedule, clamped at its last value, with
//! jitter applied so concurrent callers do not retry in lockstep.

use crate::config::RetrySettings;
use crate::errors::GatewayResult;
use std::future::Future;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

/// Backoff policy for one call chain
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	max_attempts: u32,
	schedule: Vec<Duration>,
	jitter: f64,
}

impl RetryPolicy {
	pub fn new(settings: &RetrySettings) -> Self {
		let schedule: Vec<Duration> = settings
			.backoff_schedule_ms
			.iter()
			.map(|ms| Duration::from_millis(*ms))
			.collect();

		Self {
			max_attempts: settings.max_attempts.max(1),
			schedule: if schedule.is_empty() {
				vec![Duration::from_secs(1)]
			} else {
				schedule
			},
			jitter: settings.jitter.clamp(0.0, 1.0),
		}
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Jittered delay before the retry following `attempt` (1-based)
	///
	/// Attempts beyond the schedule's length reuse its last value.
	pub fn delay(&self, attempt: u32) -> Duration {
		let idx = (attempt.saturating_sub(1) as usize).min(self.schedule.len() - 1);
		let base = self.schedule[idx];
		if self.jitter <= 0.0 {
			return base;
		}

		// Uniform jitter in [1 - jitter, 1 + jitter]
		let factor = 1.0 + self.jitter * (rand::random::<f64>() * 2.0 - 1.0);
		base.mul_f64(factor)
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(&RetrySettings::default())
	}
}

/// Run `f` with bounded retries under the policy
///
/// The closure is invoked once per attempt. On exhaustion the last error is
/// surfaced, with the attempt count and total elapsed time logged.
pub async fn with_retry<T, F, Fut>(
	policy: &RetryPolicy,
	operation: &str,
	mut f: F,
) -> GatewayResult<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = GatewayResult<T>>,
{
	let started = Instant::now();

	for attempt in 1..=policy.max_attempts() {
		match f().await {
			Ok(value) => {
				if attempt > 1 {
					debug!(
						"{} succeeded on attempt {} after {}ms",
						operation,
						attempt,
						started.elapsed().as_millis()
					);
				}
				return Ok(value);
			},
			Err(err) if !err.is_retryable() => {
				debug!("{} failed terminally on attempt {}: {}", operation, attempt, err);
				return Err(err);
			},
			Err(err) if attempt == policy.max_attempts() => {
				warn!(
					"{} exhausted {} attempts after {}ms: {}",
					operation,
					attempt,
					started.elapsed().as_millis(),
					err
				);
				return Err(err);
			},
			Err(err) => {
				let delay = policy.delay(attempt);
				debug!(
					"{} attempt {} failed ({}), retrying in {}ms",
					operation,
					attempt,
					err,
					delay.as_millis()
				);
				sleep(delay).await;
			},
		}
	}

	unreachable!("retry loop always returns within max_attempts")
}
