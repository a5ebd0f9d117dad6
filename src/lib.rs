//! Tariff Gateway
//!
//! Resilient access layer over a rate-limited plan pricing upstream. Callers
//! get two operations - [`TariffGateway::fetch_records`] and
//! [`TariffGateway::health_status`] - and are shielded from upstream
//! instability by tiered caching, a request scheduler, a circuit breaker,
//! bounded retries, and a degraded-data fallback chain.

pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod resilience;
pub mod storage;
pub mod upstream;

pub use cache::{BoundedMemoryCache, CachePriority, CacheStats, TieredCacheResolver};
pub use config::{
	load_config, CacheSettings, CircuitBreakerSettings, GatewaySettings, RetrySettings,
	SchedulerSettings, UpstreamSettings,
};
pub use errors::{GatewayError, GatewayResult};
pub use gateway::{TariffGateway, TariffGatewayBuilder};
pub use models::{CircuitSnapshot, CircuitState, HealthStatus, LookupKey, PlanRecord};
pub use resilience::{CircuitBreaker, RequestScheduler, RetryPolicy};
pub use storage::{
	MemoryNetworkCache, MemoryPersistentStore, NetworkCache, PersistentStore, StorageError,
	StorageResult,
};
pub use upstream::{HttpUpstreamClient, UpstreamClient};
