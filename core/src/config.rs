//! Client configuration: base URL and per-call timeouts.
//!
//! Values come from `ClientConfig::default()` and may be overridden through
//! the environment with `ClientConfig::from_env()`.

use std::time::Duration;

use tracing::warn;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Overrides the base URL.
pub const BASE_URL_ENV: &str = "JWTAUTH_BASE_URL";

/// Overrides the timeout, in whole seconds, of auth and account calls.
pub const TIMEOUT_ENV: &str = "JWTAUTH_TIMEOUT_SECS";

/// Per-call timeouts. The comparison endpoint performs two logins on the
/// server side, so it gets the longest budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub health: Duration,
    pub request: Duration,
    pub comparison: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(5),
            request: Duration::from_secs(10),
            comparison: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `JWTAUTH_BASE_URL` and `JWTAUTH_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeouts.request = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }
}
