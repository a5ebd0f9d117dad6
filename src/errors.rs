//! Gateway error taxonomy
//!
//! Every failure surfaced by the gateway is one of these kinds. Callers never
//! see raw network errors or partial upstream payloads.

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Typed failures surfaced by the gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
	#[error("Invalid request parameters: {reason}")]
	InvalidParameters { reason: String },

	#[error("Network error: {reason}")]
	Network { reason: String },

	#[error("Upstream call timed out after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Upstream rate limit exceeded")]
	RateLimited { retry_after_ms: Option<u64> },

	#[error("Upstream unavailable: HTTP {status_code} - {reason}")]
	ServiceUnavailable { status_code: u16, reason: String },

	#[error("Upstream payload failed validation: {reason}")]
	DataValidation { reason: String },

	#[error("Circuit breaker is open: {reason}")]
	CircuitOpen { reason: String },
}

impl GatewayError {
	/// Stable kind tag for logs and structured responses
	pub fn kind(&self) -> &'static str {
		match self {
			GatewayError::InvalidParameters { .. } => "INVALID_PARAMETERS",
			GatewayError::Network { .. } => "NETWORK_ERROR",
			GatewayError::Timeout { .. } => "TIMEOUT",
			GatewayError::RateLimited { .. } => "RATE_LIMITED",
			GatewayError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
			GatewayError::DataValidation { .. } => "DATA_VALIDATION_ERROR",
			GatewayError::CircuitOpen { .. } => "CIRCUIT_OPEN",
		}
	}

	/// Whether the retry controller may re-attempt the call
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			GatewayError::Network { .. }
				| GatewayError::Timeout { .. }
				| GatewayError::RateLimited { .. }
				| GatewayError::ServiceUnavailable { .. }
		)
	}

	/// Human-readable message safe to show to end users
	pub fn user_message(&self) -> String {
		match self {
			GatewayError::InvalidParameters { reason } => {
				format!("The request could not be processed: {}", reason)
			},
			GatewayError::Network { .. } | GatewayError::Timeout { .. } => {
				"Plan pricing is temporarily unreachable. Please try again shortly.".to_string()
			},
			GatewayError::RateLimited { .. } | GatewayError::ServiceUnavailable { .. } => {
				"The pricing service is busy right now. Please try again in a moment.".to_string()
			},
			GatewayError::DataValidation { .. } => {
				"Plan pricing returned unusable data. Please try again later.".to_string()
			},
			GatewayError::CircuitOpen { .. } => {
				"Plan pricing is recovering from an outage. Please try again in a moment."
					.to_string()
			},
		}
	}

	/// HTTP status associated with the error, when one exists
	pub fn status_code(&self) -> Option<u16> {
		match self {
			GatewayError::RateLimited { .. } => Some(429),
			GatewayError::ServiceUnavailable { status_code, .. } => Some(*status_code),
			_ => None,
		}
	}

	/// Map an upstream HTTP status to the matching error kind
	///
	/// 429 signals backoff, 5xx is a transient upstream fault, anything else
	/// non-2xx means the query itself was rejected.
	pub fn from_http_status(status_code: u16, reason: impl Into<String>) -> Self {
		let reason = reason.into();
		match status_code {
			429 => GatewayError::RateLimited {
				retry_after_ms: None,
			},
			500..=599 => GatewayError::ServiceUnavailable {
				status_code,
				reason,
			},
			_ => GatewayError::InvalidParameters {
				reason: format!("upstream rejected request with HTTP {}: {}", status_code, reason),
			},
		}
	}

	/// Convert a transport-level reqwest failure
	pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
		if err.is_timeout() {
			GatewayError::Timeout { timeout_ms }
		} else {
			GatewayError::Network {
				reason: err.to_string(),
			}
		}
	}
}
