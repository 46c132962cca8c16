//! Retry executor with exponential backoff, jitter, and a per-key circuit
//! breaker (C7). Grounded on the original `retry_handler.py`'s three-state
//! circuit (closed/open/half-open) and its jittered exponential delay formula.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

const CIRCUIT_OPEN_THRESHOLD: u32 = 5;
const CIRCUIT_COOLDOWN: Duration = Duration::minutes(5);
const MAX_DELAY_SECS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitBreaker {
    state: CircuitState,
    last_failure: Option<DateTime<Utc>>,
    failure_count: u32,
}

#[derive(Debug)]
pub enum RetryError<E> {
    CircuitOpen { operation_key: String },
    Operation(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::CircuitOpen { operation_key } => {
                write!(f, "circuit breaker open for {operation_key}")
            }
            RetryError::Operation(err) => write!(f, "{err}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

pub struct RetryExecutor {
    circuits: Mutex<HashMap<String, CircuitBreaker>>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
        }
    }

    fn is_circuit_open(&self, operation_key: &str) -> bool {
        let mut circuits = self.circuits.lock().unwrap();
        let Some(breaker) = circuits.get_mut(operation_key) else {
            return false;
        };
        if breaker.state != CircuitState::Open {
            return false;
        }
        let Some(last_failure) = breaker.last_failure else {
            return false;
        };
        if Utc::now() - last_failure > CIRCUIT_COOLDOWN {
            breaker.state = CircuitState::HalfOpen;
            false
        } else {
            true
        }
    }

    fn record_failure(&self, operation_key: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        let breaker = circuits
            .entry(operation_key.to_string())
            .or_insert(CircuitBreaker {
                state: CircuitState::Closed,
                last_failure: None,
                failure_count: 0,
            });
        breaker.failure_count += 1;
        breaker.last_failure = Some(Utc::now());
        if breaker.failure_count >= CIRCUIT_OPEN_THRESHOLD {
            breaker.state = CircuitState::Open;
            tracing::warn!(operation_key, failure_count = breaker.failure_count, "circuit breaker opened");
        }
    }

    fn record_success(&self, operation_key: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        if let Some(breaker) = circuits.get_mut(operation_key) {
            if breaker.state == CircuitState::HalfOpen {
                breaker.state = CircuitState::Closed;
                breaker.failure_count = 0;
                tracing::info!(operation_key, "circuit breaker reset to closed");
            }
        }
    }

    fn calculate_delay(attempt: u32, base_delay_secs: f64) -> std::time::Duration {
        let exponential = base_delay_secs * 2f64.powi(attempt as i32);
        let jitter = exponential * 0.25;
        let jittered = exponential + rand::thread_rng().gen_range(-jitter..=jitter);
        std::time::Duration::from_secs_f64(jittered.max(0.0).min(MAX_DELAY_SECS))
    }

    /// Run `op`, retrying up to `max_retries` times with jittered exponential
    /// backoff. Short-circuits immediately if `operation_key`'s breaker is open.
    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        operation_key: &str,
        max_retries: u32,
        base_delay: std::time::Duration,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.is_circuit_open(operation_key) {
            return Err(RetryError::CircuitOpen {
                operation_key: operation_key.to_string(),
            });
        }

        let mut last_error = None;
        for attempt in 0..=max_retries {
            match op().await {
                Ok(value) => {
                    self.record_success(operation_key);
                    return Ok(value);
                }
                Err(err) => {
                    self.record_failure(operation_key);
                    if attempt == max_retries {
                        last_error = Some(err);
                        break;
                    }
                    tracing::warn!(
                        operation_key,
                        attempt = attempt + 1,
                        max_retries,
                        error = %err,
                        "operation failed, retrying"
                    );
                    last_error = Some(err);
                    tokio::time::sleep(Self::calculate_delay(attempt, base_delay.as_secs_f64())).await;
                }
            }
        }

        Err(RetryError::Operation(last_error.expect("loop always sets last_error before exiting")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let executor = RetryExecutor::new();
        let result: Result<u32, RetryError<&str>> = executor
            .execute_with_retry("op", 3, std::time::Duration::from_millis(1), || async { Ok(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let executor = RetryExecutor::new();
        let attempts = AtomicU32::new(0);
        let result = executor
            .execute_with_retry("op", 3, std::time::Duration::from_millis(1), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_final_error() {
        let executor = RetryExecutor::new();
        let result: Result<u32, RetryError<&str>> = executor
            .execute_with_retry("op", 2, std::time::Duration::from_millis(1), || async {
                Err("always fails")
            })
            .await;
        assert!(matches!(result, Err(RetryError::Operation("always fails"))));
    }

    #[tokio::test]
    async fn circuit_opens_after_five_consecutive_failures() {
        let executor = RetryExecutor::new();
        for _ in 0..5 {
            let _: Result<u32, RetryError<&str>> = executor
                .execute_with_retry("flaky", 0, std::time::Duration::from_millis(1), || async {
                    Err("boom")
                })
                .await;
        }
        let result: Result<u32, RetryError<&str>> = executor
            .execute_with_retry("flaky", 0, std::time::Duration::from_millis(1), || async { Ok(1) })
            .await;
        assert!(matches!(result, Err(RetryError::CircuitOpen { .. })));
    }
}
