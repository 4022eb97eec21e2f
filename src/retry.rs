//! Bounded retry for fallible async operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;

/// Re-runs an operation until it succeeds or the attempt budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(3, Duration::from_secs(5))
  }
}

impl RetryPolicy {
  /// A zero attempt budget is treated as a single attempt.
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      delay,
    }
  }

  /// Negative or non-finite delays mean no delay.
  pub fn from_config(config: &RetryConfig) -> Self {
    let delay = Duration::try_from_secs_f64(config.delay_secs).unwrap_or(Duration::ZERO);
    Self::new(config.max_attempts, delay)
  }

  #[allow(dead_code)]
  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Retry on every failure.
  #[allow(dead_code)]
  pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
  where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    self.run_if(op, |_| true).await
  }

  /// Retry only failures accepted by `is_retryable`; anything else is returned
  /// straight away. When the budget runs out the last failure is returned as is.
  pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
  where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
  {
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) if !is_retryable(&e) => return Err(e),
        Err(e) => {
          attempt += 1;
          warn!("Attempt {}/{} failed: {}", attempt, self.max_attempts, e);
          if attempt >= self.max_attempts {
            return Err(e);
          }
          if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
          }
        }
      }
    }
  }
}
