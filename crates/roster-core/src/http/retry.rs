//! Retry schedule and re-authentication policy
//!
//! Only transport failures are retried. The wait before each retry comes
//! from a fixed schedule (300ms, 900ms, 2700ms by default) that is
//! materialized up front, so the number of attempts per call is bounded by
//! the schedule's length.

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (in milliseconds)
    pub initial_delay_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Upper bound for any single delay (in milliseconds)
    pub max_delay_ms: u64,
    /// Randomize delays by ±50%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 300,
            multiplier: 3.0,
            max_delay_ms: 30_000,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Set the first delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the growth factor
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Create an exponential backoff instance
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_delay_ms),
            max_interval: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            max_elapsed_time: None,
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        // current_interval starts at the crate default otherwise
        backoff.reset();
        backoff
    }

    /// Delays before each retry, in order
    pub fn schedule(&self) -> Vec<Duration> {
        let mut backoff = self.create_backoff();
        (0..self.max_retries)
            .map(|_| {
                backoff
                    .next_backoff()
                    .unwrap_or(Duration::from_millis(self.max_delay_ms))
            })
            .collect()
    }
}

/// Retries left for one logical call
#[derive(Debug, Clone)]
pub struct RetryBudget {
    delays: Vec<Duration>,
    used: usize,
}

impl RetryBudget {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            delays: policy.schedule(),
            used: 0,
        }
    }

    /// Consume one retry, returning how long to wait before it
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.delays.get(self.used).copied()?;
        self.used += 1;
        Some(delay)
    }

    /// Retries consumed so far
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.delays.len()
    }
}

/// What to do after the backend rejects the credential
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReauthPolicy {
    /// Trigger login, then surface the original failure
    #[default]
    Propagate,
    /// Trigger login and, if it succeeds, try the call once more
    RetryOnce,
}
