//! Failure-isolation building blocks: retry, circuit breaker, scheduler

pub mod breaker;
pub mod retry;
pub mod scheduler;

pub use breaker::CircuitBreaker;
pub use retry::{with_retry, RetryPolicy};
pub use scheduler::RequestScheduler;
