//! Guard configuration, loadable from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limiter::RateLimitPolicy;

/// Errors raised while loading or validating a [`ThrottleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error("window_seconds must be at least 1")]
    InvalidWindow,
}

/// Rate-limit settings for a [`GuardMiddleware`](crate::middleware::GuardMiddleware).
///
/// Missing fields take their defaults, so `{}` is a valid document.
///
/// # Examples
///
/// ```
/// use rttp_guard::ThrottleConfig;
///
/// let config = ThrottleConfig::from_json(r#"{ "limit": 500, "window_seconds": 3600 }"#).unwrap();
/// assert_eq!(config.limit, 500);
/// assert_eq!(config.eviction_interval_seconds, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Requests admitted per client per window.
    pub limit: u32,
    pub window_seconds: u64,
    /// Period of background eviction of elapsed windows; `0` disables it.
    pub eviction_interval_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_seconds: 60,
            eviction_interval_seconds: 300,
        }
    }
}

impl ThrottleConfig {
    pub fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style: set the per-window limit
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Builder-style: set the window length
    #[must_use]
    pub fn window_seconds(mut self, window_seconds: u64) -> Self {
        self.window_seconds = window_seconds;
        self
    }

    /// Builder-style: set the eviction period (0 disables eviction)
    #[must_use]
    pub fn eviction_interval_seconds(mut self, seconds: u64) -> Self {
        self.eviction_interval_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidLimit);
        }
        if self.window_seconds == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        Ok(())
    }

    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.limit, self.window_seconds)
    }

    pub fn eviction_interval(&self) -> Option<Duration> {
        (self.eviction_interval_seconds > 0)
            .then(|| Duration::from_secs(self.eviction_interval_seconds))
    }
}
