//! Retry and backoff policy shared by the reconciler runtime and the store
//! clients.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential increase: delay * 2^attempt
    Exponential,
    /// Exponential with up to 10% random jitter
    ExponentialWithJitter,
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`
    pub fn calculate_delay(
        &self,
        attempt: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Duration {
        use rand::Rng;

        let delay = match self {
            BackoffStrategy::Fixed => initial_delay,
            BackoffStrategy::Exponential => {
                initial_delay.saturating_mul(2u32.saturating_pow(attempt))
            }
            BackoffStrategy::ExponentialWithJitter => {
                let base = initial_delay.saturating_mul(2u32.saturating_pow(attempt));
                let jitter =
                    (base.as_millis() as f64 * 0.1 * rand::thread_rng().gen::<f64>()) as u64;
                base + Duration::from_millis(jitter)
            }
        };

        delay.min(max_delay)
    }
}

/// Retry policy configuration.
///
/// Durations are written in milliseconds in configuration files:
///
/// ```toml
/// [runtime.retry]
/// max_attempts = 5
/// initial_delay_ms = 50
/// max_delay_ms = 2000
/// strategy = "exponential"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_attempts: u32,
    /// Initial delay before first retry
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
    /// Backoff strategy to use
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    /// Exponential backoff, 5 attempts, 50ms doubling up to 2s
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Fixed delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: 5,
            initial_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Set maximum retry attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Switch to jittered exponential backoff
    pub fn with_jitter(mut self) -> Self {
        self.strategy = BackoffStrategy::ExponentialWithJitter;
        self
    }

    /// Delay before retry number `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.strategy
            .calculate_delay(attempt, self.initial_delay, self.max_delay)
    }

    /// Run `operation` until it succeeds, `retryable` rejects the error, or
    /// the attempts run out. Returns the last error together with the number
    /// of attempts made.
    pub async fn execute_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        retryable: P,
    ) -> Result<T, (E, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= self.max_attempts || !retryable(&err) {
                        return Err((err, attempt + 1));
                    }

                    tokio::time::sleep(self.calculate_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run `operation` with retries on every error
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_if(operation, |_| true)
            .await
            .map_err(|(err, _)| err)
    }
}

impl Default for RetryPolicy {
    /// Jittered exponential, so loops failing together spread their retries
    fn default() -> Self {
        Self::exponential().with_jitter()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn exponential_delays_double_and_cap() {
        let policy = RetryPolicy::exponential()
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(50));
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(10));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(20));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(40));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(50));
        assert_eq!(policy.calculate_delay(40), Duration::from_millis(50));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::exponential()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_jitter();
        for _ in 0..32 {
            let d = policy.calculate_delay(1);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(220));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn execute_if_stops_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(5);
        let result: Result<(), (&str, u32)> = policy
            .execute_if(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(if n < 2 { "transient" } else { "fatal" }) }
                },
                |e| *e == "transient",
            )
            .await;
        assert_eq!(result, Err(("fatal", 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn execute_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2);
        let result: Result<(), ()> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn policy_reads_from_toml() {
        let policy: RetryPolicy = toml::from_str(
            "max_attempts = 2\ninitial_delay_ms = 5\nmax_delay_ms = 40\nstrategy = \"fixed\"",
        )
        .unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_delay, Duration::from_millis(5));
        assert_eq!(policy.strategy, BackoffStrategy::Fixed);
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(5));

        let omitted: RetryPolicy = toml::from_str("max_attempts = 1").unwrap();
        assert_eq!(omitted.strategy, BackoffStrategy::ExponentialWithJitter);
    }

    #[test]
    fn default_policy_is_jittered() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.strategy, BackoffStrategy::ExponentialWithJitter);
        let d = policy.calculate_delay(0);
        assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(55));
    }
}
