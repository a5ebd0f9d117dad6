//! Gateway entry point and fallback orchestration
//!
//! `TariffGateway` owns the whole chain: tiered cache in front, then the
//! request scheduler, circuit breaker, retry controller, live client and
//! validator. On an unrecoverable live-path failure it degrades through the
//! persistent store and stale in-process data before surfacing a typed error.

use crate::cache::{BoundedMemoryCache, CachePriority, CacheStats, TieredCacheResolver};
use crate::config::GatewaySettings;
use crate::errors::{GatewayError, GatewayResult};
use crate::models::{HealthStatus, LookupKey, PlanRecord};
use crate::resilience::{with_retry, CircuitBreaker, RequestScheduler, RetryPolicy};
use crate::storage::{
	MemoryNetworkCache, MemoryPersistentStore, NetworkCache, PersistentStore,
};
use crate::upstream::{validator, HttpUpstreamClient, UpstreamClient};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resilient gateway over the plan pricing upstream
///
/// Construct one per process via [`TariffGateway::builder`], call
/// [`start`](TariffGateway::start) to launch background maintenance, and
/// [`shutdown`](TariffGateway::shutdown) when the host application stops.
pub struct TariffGateway {
	settings: GatewaySettings,
	memory: Arc<BoundedMemoryCache>,
	cache: TieredCacheResolver,
	scheduler: RequestScheduler,
	breaker: Arc<CircuitBreaker>,
	retry: RetryPolicy,
	client: Arc<dyn UpstreamClient>,
	network_cache: Arc<dyn NetworkCache>,
	store: Arc<dyn PersistentStore>,
	cancel: CancellationToken,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TariffGateway {
	pub fn builder() -> TariffGatewayBuilder {
		TariffGatewayBuilder::default()
	}

	fn new(
		settings: GatewaySettings,
		client: Arc<dyn UpstreamClient>,
		network_cache: Arc<dyn NetworkCache>,
		store: Arc<dyn PersistentStore>,
	) -> Self {
		let memory = Arc::new(BoundedMemoryCache::new(
			settings.cache.memory_capacity,
			settings.cache.memory_ttl_seconds,
		));
		let cache = TieredCacheResolver::new(
			Arc::clone(&memory),
			Arc::clone(&network_cache),
			Arc::clone(&store),
			settings.cache.clone(),
		);

		Self {
			memory,
			cache,
			scheduler: RequestScheduler::new(settings.scheduler.clone()),
			breaker: Arc::new(CircuitBreaker::new(settings.circuit_breaker.clone())),
			retry: RetryPolicy::new(&settings.retry),
			client,
			network_cache,
			store,
			cancel: CancellationToken::new(),
			tasks: Mutex::new(Vec::new()),
			settings,
		}
	}

	/// Launch background maintenance (cache expiry sweeps)
	pub fn start(&self) {
		let sweeper = self.memory.start_sweeper(
			Duration::from_secs(self.settings.cache.sweep_interval_seconds),
			self.cancel.child_token(),
		);
		if let Ok(mut tasks) = self.tasks.lock() {
			tasks.push(sweeper);
		}
		info!("Tariff gateway started");
	}

	/// Stop background work and drain the scheduler
	pub async fn shutdown(&self) {
		self.cancel.cancel();
		self.scheduler.shutdown().await;

		let handles: Vec<JoinHandle<()>> = match self.tasks.lock() {
			Ok(mut tasks) => tasks.drain(..).collect(),
			Err(_) => Vec::new(),
		};
		for handle in handles {
			let _ = handle.await;
		}
		info!("Tariff gateway shut down");
	}

	/// Fetch normalized plan records for a lookup key
	///
	/// Never returns a cache MISS: either records come back (possibly from a
	/// degraded source) or a typed error is raised after every fallback is
	/// exhausted.
	pub async fn fetch_records(&self, key: &LookupKey) -> GatewayResult<Vec<PlanRecord>> {
		if let Some(records) = self.cache.resolve(key).await {
			return Ok(records);
		}

		match self.fetch_live(key).await {
			Ok(records) => {
				// Fire-and-forget: cache writes must never fail the call
				let cache = self.cache.clone();
				let cache_key = key.clone();
				let to_store = records.clone();
				tokio::spawn(async move {
					cache
						.store(&cache_key, &to_store, CachePriority::High)
						.await;
				});
				Ok(records)
			},
			Err(err) => self.fallback(key, err).await,
		}
	}

	/// Gateway health for load balancers and dashboards
	pub async fn health_status(&self) -> HealthStatus {
		let circuit_open = self.breaker.snapshot().is_open();
		let network_cache_connected = self.network_cache.is_connected().await;
		let latency_ms = match self.client.ping().await {
			Ok(latency) => Some(latency),
			Err(e) => {
				debug!("Upstream ping failed: {}", e);
				None
			},
		};

		HealthStatus {
			healthy: latency_ms.is_some() && !circuit_open,
			circuit_open,
			network_cache_connected,
			latency_ms,
		}
	}

	/// Cache tier hit/miss statistics
	pub fn cache_stats(&self) -> CacheStats {
		self.cache.stats()
	}

	/// Live path: scheduler -> circuit breaker -> retry -> call -> validate
	async fn fetch_live(&self, key: &LookupKey) -> GatewayResult<Vec<PlanRecord>> {
		let breaker = Arc::clone(&self.breaker);
		let client = Arc::clone(&self.client);
		let store = Arc::clone(&self.store);
		let retry = self.retry.clone();
		let key = key.clone();
		let timeout_ms = self.settings.upstream.timeout_ms;
		let endpoint = self.client.endpoint().to_string();

		self.scheduler
			.schedule(async move {
				breaker.try_acquire()?;

				let params = key.cache_key();
				let started = std::time::Instant::now();
				let result = with_retry(&retry, "fetch_plans", move || {
					let client = Arc::clone(&client);
					let key = key.clone();
					async move {
						let raw = timeout(
							Duration::from_millis(timeout_ms),
							client.fetch_raw(&key),
						)
						.await
						.map_err(|_| GatewayError::Timeout { timeout_ms })??;
						validator::transform(&raw)
					}
				})
				.await;

				let latency_ms = started.elapsed().as_millis() as u64;
				match &result {
					Ok(records) => {
						breaker.record_success();
						debug!("Live fetch returned {} records in {}ms", records.len(), latency_ms);
						if let Err(e) = store
							.log_call(&endpoint, &params, Some(200), latency_ms, None)
							.await
						{
							warn!("Failed to record call log entry: {}", e);
						}
					},
					Err(err) => {
						// A rejected query or unusable payload still means the
						// upstream answered; only failures that signal an
						// unhealthy upstream count toward opening the circuit
						if err.is_retryable() {
							breaker.record_failure();
						} else {
							breaker.record_success();
						}
						if let Err(e) = store
							.log_call(
								&endpoint,
								&params,
								err.status_code(),
								latency_ms,
								Some(&err.to_string()),
							)
							.await
						{
							warn!("Failed to record call log entry: {}", e);
						}
					},
				}

				result
			})
			.await
	}

	/// Degraded-data chain: persistent store, then stale memory, then error
	async fn fallback(
		&self,
		key: &LookupKey,
		original: GatewayError,
	) -> GatewayResult<Vec<PlanRecord>> {
		warn!(
			"Live fetch failed for {} ({}), entering fallback chain",
			key.cache_key(),
			original.kind()
		);

		match self.store.get_active(&key.cache_key()).await {
			Ok(records) if !records.is_empty() => {
				warn!(
					"Serving degraded persistent-store data for {} ({} records)",
					key.cache_key(),
					records.len()
				);
				return Ok(records);
			},
			Ok(_) => {},
			Err(e) => warn!("Persistent fallback read failed for {}: {}", key.cache_key(), e),
		}

		if let Some(records) = self.cache.stale_memory(key) {
			warn!(
				"Serving stale in-process cache data for {} ({} records)",
				key.cache_key(),
				records.len()
			);
			return Ok(records);
		}

		Err(original)
	}
}

/// Builder wiring collaborators into a gateway
///
/// Defaults: reqwest HTTP client against the configured base URL, in-memory
/// network cache and persistent store.
#[derive(Default)]
pub struct TariffGatewayBuilder {
	settings: Option<GatewaySettings>,
	client: Option<Arc<dyn UpstreamClient>>,
	network_cache: Option<Arc<dyn NetworkCache>>,
	store: Option<Arc<dyn PersistentStore>>,
}

impl TariffGatewayBuilder {
	pub fn settings(mut self, settings: GatewaySettings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn upstream_client(mut self, client: Arc<dyn UpstreamClient>) -> Self {
		self.client = Some(client);
		self
	}

	pub fn network_cache(mut self, cache: Arc<dyn NetworkCache>) -> Self {
		self.network_cache = Some(cache);
		self
	}

	pub fn persistent_store(mut self, store: Arc<dyn PersistentStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn build(self) -> GatewayResult<TariffGateway> {
		let settings = self.settings.unwrap_or_default();

		let client = match self.client {
			Some(client) => client,
			None => Arc::new(HttpUpstreamClient::new(&settings.upstream)?),
		};
		let network_cache = self
			.network_cache
			.unwrap_or_else(|| Arc::new(MemoryNetworkCache::new()));
		let store = self
			.store
			.unwrap_or_else(|| Arc::new(MemoryPersistentStore::new()));

		Ok(TariffGateway::new(settings, client, network_cache, store))
	}
}
