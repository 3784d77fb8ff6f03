// MIT License - Copyright (c) 2026 Peter Wright
// Controller connection settings

use std::time::Duration;

use crate::constants::{
    DEFAULT_JOB_TIMEOUT, DEFAULT_MAX_CLOCK_DRIFT, DEFAULT_REFRESH_DEBOUNCE, DEFAULT_REFRESH_RATE, DEFAULT_RETRY_DELAY,
};
use crate::transport::dispatcher::RetryPolicy;

/// Configuration for connecting to a RainBird controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller address, `ip` or `ip:port`
    pub host: String,
    /// Controller password (the key is derived from it)
    pub password: String,
    /// Interval between status polls in seconds (default: 60)
    pub refresh_rate_secs: u64,
    /// Delay between transport retries in milliseconds (default: 30000)
    pub retry_delay_ms: u64,
    /// Give up after this many attempts; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Quiet window for coalescing refresh requests in milliseconds (default: 1000)
    pub refresh_debounce_ms: u64,
    /// Safety timeout for a single zone start job in seconds (default: 3600)
    pub job_timeout_secs: u64,
    /// Warn when the controller clock is further off than this (default: 300)
    pub max_clock_drift_secs: u64,
    /// Broadcast channel capacity for controller events
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.100".to_string(),
            password: String::new(),
            refresh_rate_secs: DEFAULT_REFRESH_RATE.as_secs(),
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            max_attempts: None,
            refresh_debounce_ms: DEFAULT_REFRESH_DEBOUNCE.as_millis() as u64,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT.as_secs(),
            max_clock_drift_secs: DEFAULT_MAX_CLOCK_DRIFT.as_secs(),
            event_capacity: 256,
        }
    }
}

impl ControllerConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_secs(self.refresh_rate_secs.max(1))
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn max_clock_drift(&self) -> Duration {
        Duration::from_secs(self.max_clock_drift_secs)
    }

    /// Retry policy for the dispatcher.
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.retry_delay_ms);
        match self.max_attempts {
            Some(max) => RetryPolicy::capped(delay, max),
            None => RetryPolicy::uncapped(delay),
        }
    }
}

/// Builder for ControllerConfig.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn refresh_rate_secs(mut self, secs: u64) -> Self {
        self.config.refresh_rate_secs = secs;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn refresh_debounce_ms(mut self, ms: u64) -> Self {
        self.config.refresh_debounce_ms = ms;
        self
    }

    pub fn job_timeout_secs(mut self, secs: u64) -> Self {
        self.config.job_timeout_secs = secs;
        self
    }

    pub fn max_clock_drift_secs(mut self, secs: u64) -> Self {
        self.config.max_clock_drift_secs = secs;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> ControllerConfig {
        self.config
    }
}
