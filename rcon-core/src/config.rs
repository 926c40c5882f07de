//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Dial settings.
    pub connection: ConnectionConfig,
    /// Idle keepalive polling.
    pub keepalive: KeepaliveConfig,
    /// Generation restart policy.
    pub supervisor: SupervisorConfig,
    /// Bound of the inbound request queue.
    pub queue_capacity: usize,
}

/// Dial settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Pause after a refused or timed-out dial, in milliseconds.
    pub dial_backoff_ms: u64,
    /// Give up after this many consecutive transient failures.
    /// Unset retries indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dial_attempts: Option<u32>,
}

/// Keepalive settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Interval between idle polls, in milliseconds.
    pub interval_ms: u64,
    /// How long one idle poll waits for a message, in milliseconds.
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub restart: RestartPolicy,
}

/// What the supervisor does when a generation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Redial after every generation.
    Unlimited { delay_ms: u64 },
    /// Redial at most `max_restarts` times in a row. A generation that
    /// answers at least one request resets the count.
    Limited { max_restarts: u32, delay_ms: u64 },
}

impl RestartPolicy {
    /// Pause before the next dial.
    pub fn delay(&self) -> Duration {
        match self {
            Self::Unlimited { delay_ms } | Self::Limited { delay_ms, .. } => {
                Duration::from_millis(*delay_ms)
            }
        }
    }

    /// Whether another restart is allowed after `restarts` have happened.
    pub fn allows(&self, restarts: u32) -> bool {
        match self {
            Self::Unlimited { .. } => true,
            Self::Limited { max_restarts, .. } => restarts < *max_restarts,
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            keepalive: KeepaliveConfig::default(),
            supervisor: SupervisorConfig::default(),
            queue_capacity: 32,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dial_backoff_ms: 5000,
            max_dial_attempts: None,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            read_timeout_ms: 50,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart: RestartPolicy::default(),
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::Unlimited { delay_ms: 0 }
    }
}

// ── Accessors ────────────────────────────────────────────────────

impl ConnectionConfig {
    pub fn dial_backoff(&self) -> Duration {
        Duration::from_millis(self.dial_backoff_ms)
    }
}

impl KeepaliveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse TOML text; unlike [`load`](Self::load) errors are returned.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
