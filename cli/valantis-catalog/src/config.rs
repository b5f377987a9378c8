//! Configuration types for catalog client construction.

use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://api.valantis.store:40000/";
pub const DEFAULT_PASSWORD: &str = "Valantis";

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// URL of the catalog endpoint. All actions are POSTed here.
    pub api_url: String,
    /// Shared secret the `X-Auth` token is derived from.
    pub password: String,
    /// How failed attempts are retried.
    pub retry: RetryPolicy,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            retry: RetryPolicy::default(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

/// Capped exponential backoff with an optional attempt ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts before giving up, `None` retries forever.
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays, values below 1 are treated as 1.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Whether no further attempt may follow the given (1-based) attempt.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max.max(1))
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = RetryPolicy {
            max_attempts: Some(10),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        };
        let delays = (1..=5).map(|n| policy.backoff(n)).collect::<Vec<_>>();
        assert_eq!(delays, [
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]);
    }

    #[test]
    fn zero_max_attempts_still_allows_one_attempt() {
        let policy = RetryPolicy {
            max_attempts: Some(0),
            ..RetryPolicy::default()
        };
        assert!(policy.is_exhausted(1));
    }

    #[test]
    fn unbounded_policy_never_exhausts() {
        let policy = RetryPolicy {
            max_attempts: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        };
        assert!(!policy.is_exhausted(u32::MAX));
        assert_eq!(policy.backoff(1_000), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn backoff_never_exceeds_cap(attempt in 1..u32::MAX, multiplier in 0.0..100.0_f64) {
            let policy = RetryPolicy {
                max_attempts: None,
                initial_backoff: Duration::from_millis(50),
                max_backoff: Duration::from_secs(3),
                multiplier,
            };
            prop_assert!(policy.backoff(attempt) <= Duration::from_secs(3));
        }
    }
}
