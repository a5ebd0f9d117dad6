//! Upstream pricing API client
//!
//! The gateway talks to the upstream through the `UpstreamClient` seam; the
//! shipped implementation is a reqwest client with a hard per-call timeout.

use crate::config::UpstreamSettings;
use crate::errors::{GatewayError, GatewayResult};
use crate::models::LookupKey;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Seam for the live upstream call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamClient: Send + Sync {
	/// Fetch the raw payload for a lookup key
	async fn fetch_raw(&self, key: &LookupKey) -> GatewayResult<Value>;

	/// Lightweight reachability probe; returns round-trip latency in ms
	async fn ping(&self) -> GatewayResult<u64>;

	/// Endpoint identifier for logging and the call audit trail
	fn endpoint(&self) -> &str;
}

/// HTTP implementation over the plan pricing API
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
	client: Client,
	base_url: String,
	timeout_ms: u64,
}

impl HttpUpstreamClient {
	pub fn new(settings: &UpstreamSettings) -> GatewayResult<Self> {
		let mut headers = HeaderMap::new();
		headers.insert("Accept", HeaderValue::from_static("application/json"));
		headers.insert("User-Agent", HeaderValue::from_static("tariff-gateway/0.1"));

		let client = Client::builder()
			.default_headers(headers)
			.timeout(Duration::from_millis(settings.timeout_ms))
			.build()
			.map_err(|e| GatewayError::Network {
				reason: format!("failed to build HTTP client: {}", e),
			})?;

		Ok(Self {
			client,
			base_url: settings.base_url.clone(),
			timeout_ms: settings.timeout_ms,
		})
	}
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
	async fn fetch_raw(&self, key: &LookupKey) -> GatewayResult<Value> {
		debug!("Fetching plans from upstream for {}", key.cache_key());

		let response = self
			.client
			.get(&self.base_url)
			.query(&key.query_params())
			.send()
			.await
			.map_err(|e| GatewayError::from_reqwest(e, self.timeout_ms))?;

		let status = response.status();
		if !status.is_success() {
			let reason = status.canonical_reason().unwrap_or("unknown").to_string();
			return Err(GatewayError::from_http_status(status.as_u16(), reason));
		}

		response
			.json::<Value>()
			.await
			.map_err(|e| GatewayError::DataValidation {
				reason: format!("upstream body is not valid JSON: {}", e),
			})
	}

	async fn ping(&self) -> GatewayResult<u64> {
		let started = Instant::now();
		// Any HTTP response at all means the upstream is reachable
		self.client
			.get(&self.base_url)
			.send()
			.await
			.map_err(|e| GatewayError::from_reqwest(e, self.timeout_ms))?;

		Ok(started.elapsed().as_millis() as u64)
	}

	fn endpoint(&self) -> &str {
		&self.base_url
	}
}
