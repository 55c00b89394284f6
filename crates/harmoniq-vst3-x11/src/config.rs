use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BridgeError;

/// Environment variable overriding the idle flush interval in milliseconds.
pub const IDLE_INTERVAL_ENV: &str = "HARMONIQ_VST3_IDLE_INTERVAL_MS";

/// Deferred updates are flushed at roughly 30 Hz unless configured otherwise.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_micros(1_000_000 / 30);

const DEFAULT_THREAD_NAME: &str = "harmoniq-vst3-idle";

/// Runtime options for the editor run-loop bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Delay between two deferred-update flushes on the idle thread.
    pub idle_interval: Duration,
    /// Name given to the idle update thread.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            idle_interval: DEFAULT_IDLE_INTERVAL,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(raw) = env::var_os(IDLE_INTERVAL_ENV) {
            match raw.to_string_lossy().trim().parse::<u64>() {
                Ok(ms) => config.idle_interval = Duration::from_millis(ms),
                Err(err) => warn!(?raw, %err, "ignoring malformed {IDLE_INTERVAL_ENV}"),
            }
        }
        config
    }

    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.idle_interval.is_zero() {
            return Err(BridgeError::InvalidConfig(
                "idle interval must be greater than zero".into(),
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(BridgeError::InvalidConfig(
                "thread name must not contain NUL bytes".into(),
            ));
        }
        Ok(())
    }
}
