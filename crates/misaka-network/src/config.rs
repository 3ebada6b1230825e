//! Client configuration.
//!
//! Defaults, environment variables, or a TOML file:
//!
//! ```toml
//! broker_url = "nats://localhost:4222"
//!
//! [telepath]
//! ttl_secs = 300
//! max_messages = 10000
//! max_bytes = -1
//!
//! [subscribe]
//! ack_wait_ms = 30000
//! max_ack_pending = 1
//! max_deliver = 5      # 0 for unlimited
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::domain::{SubscribeOptions, TelepathConfig};

/// Default broker address.
pub const DEFAULT_BROKER_URL: &str = "nats://localhost:4222";

/// Errors loading a [`NetworkConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection address plus defaults for new telepaths and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub broker_url: String,
    pub telepath: TelepathConfig,
    pub subscribe: SubscribeOptions,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            telepath: TelepathConfig::default(),
            subscribe: SubscribeOptions::default(),
        }
    }
}

impl NetworkConfig {
    /// Defaults overridden by `MISAKA_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("MISAKA_BROKER_URL") {
            config.broker_url = url;
        }
        if let Some(secs) = env_parse::<u64>("MISAKA_TELEPATH_TTL_SECS") {
            config.telepath.ttl = Duration::from_secs(secs);
        }
        if let Some(max) = env_parse("MISAKA_TELEPATH_MAX_MESSAGES") {
            config.telepath.max_messages = max;
        }
        if let Some(max) = env_parse("MISAKA_TELEPATH_MAX_BYTES") {
            config.telepath.max_bytes = max;
        }
        if let Some(ms) = env_parse::<u64>("MISAKA_ACK_WAIT_MS") {
            config.subscribe.ack_wait = Duration::from_millis(ms);
        }
        if let Some(max) = env_parse("MISAKA_MAX_ACK_PENDING") {
            config.subscribe.max_ack_pending = max;
        }
        if let Some(max) = env_parse::<u32>("MISAKA_MAX_DELIVER") {
            config.subscribe.max_deliver = (max > 0).then_some(max);
        }

        config
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse TOML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed TOML, `ConfigError::Invalid` for
    /// limits the client would reject anyway.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let defaults = Self::default();
        let telepath = TelepathConfig {
            ttl: file
                .telepath
                .ttl_secs
                .map_or(defaults.telepath.ttl, Duration::from_secs),
            max_messages: file
                .telepath
                .max_messages
                .unwrap_or(defaults.telepath.max_messages),
            max_bytes: file
                .telepath
                .max_bytes
                .unwrap_or(defaults.telepath.max_bytes),
        };
        let subscribe = SubscribeOptions {
            ack_wait: file
                .subscribe
                .ack_wait_ms
                .map_or(defaults.subscribe.ack_wait, Duration::from_millis),
            max_ack_pending: file
                .subscribe
                .max_ack_pending
                .unwrap_or(defaults.subscribe.max_ack_pending),
            max_deliver: match file.subscribe.max_deliver {
                Some(0) => None,
                Some(max) => Some(max),
                None => defaults.subscribe.max_deliver,
            },
        };

        telepath
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        subscribe
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            broker_url: file.broker_url.unwrap_or(defaults.broker_url),
            telepath,
            subscribe,
        })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw.as_str(), "Ignoring unparseable environment value");
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    broker_url: Option<String>,
    #[serde(default)]
    telepath: TelepathSection,
    #[serde(default)]
    subscribe: SubscribeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TelepathSection {
    ttl_secs: Option<u64>,
    max_messages: Option<i64>,
    max_bytes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubscribeSection {
    ack_wait_ms: Option<u64>,
    max_ack_pending: Option<u32>,
    max_deliver: Option<u32>,
}
