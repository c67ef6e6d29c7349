//! Per-topic poller state and error backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::WorkerConfig;

/// Linear backoff with a ceiling, plus the give-up threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    max_consecutive_errors: u32,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration, max_consecutive_errors: u32) -> Self {
        Self {
            base,
            cap,
            max_consecutive_errors,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            Duration::from_secs(config.error_backoff_base_seconds),
            Duration::from_secs(config.error_backoff_cap_seconds),
            config.max_consecutive_errors,
        )
    }

    /// `min(cap, base * n)`; `n = 0` is treated as the first error
    pub fn delay_for(&self, consecutive_errors: u32) -> Duration {
        self.base
            .saturating_mul(consecutive_errors.max(1))
            .min(self.cap)
    }

    pub fn max_consecutive_errors(&self) -> u32 {
        self.max_consecutive_errors
    }
}

/// Run state owned by exactly one topic poller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerState {
    consecutive_errors: u32,
    last_fetch: Option<DateTime<Utc>>,
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful fetch: clears the error streak
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
        self.last_fetch = Some(Utc::now());
    }

    /// Failed fetch; returns the new streak length
    pub fn record_error(&mut self) -> u32 {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }

    pub fn should_give_up(&self, policy: &BackoffPolicy) -> bool {
        self.consecutive_errors >= policy.max_consecutive_errors
    }

    pub fn next_delay(&self, policy: &BackoffPolicy) -> Duration {
        policy.delay_for(self.consecutive_errors)
    }
}
