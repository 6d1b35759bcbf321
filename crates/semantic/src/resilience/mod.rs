//! Resilience for outbound endpoint calls: retry with backoff and per-endpoint
//! circuit breaking.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager, CircuitState,
};
pub use retry::{execute_with_retry_async, is_retryable_error, RetryConfig, RetryResult};
