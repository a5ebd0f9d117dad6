//! Domain models for the tariff gateway

pub mod circuit;
pub mod health;
pub mod key;
pub mod plan;

pub use circuit::{CircuitSnapshot, CircuitState};
pub use health::HealthStatus;
pub use key::{LookupKey, DEFAULT_USAGE_KWH};
pub use plan::PlanRecord;
