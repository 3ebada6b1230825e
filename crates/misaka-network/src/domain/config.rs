//! Telepath retention configuration

use std::time::Duration;

use crate::error::StreamConfigError;

/// Default message age limit.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default retention cap by message count.
pub const DEFAULT_MAX_MESSAGES: i64 = 10_000;

/// Default retention cap by size. `-1` is unlimited.
pub const DEFAULT_MAX_BYTES: i64 = -1;

/// Retention limits for a telepath stream.
///
/// Passed verbatim to stream creation. A zero `ttl` or a non-positive cap
/// means the broker applies no limit of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelepathConfig {
    pub ttl: Duration,
    pub max_messages: i64,
    pub max_bytes: i64,
}

impl Default for TelepathConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_messages: DEFAULT_MAX_MESSAGES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl TelepathConfig {
    #[must_use]
    pub fn builder() -> TelepathConfigBuilder {
        TelepathConfigBuilder::default()
    }

    /// Check the limits before they reach the broker.
    ///
    /// # Errors
    ///
    /// `StreamConfigError::InvalidLimit` for a negative `max_messages` or a
    /// `max_bytes` below `-1`.
    pub fn validate(&self) -> Result<(), StreamConfigError> {
        if self.max_messages < 0 {
            return Err(StreamConfigError::InvalidLimit {
                field: "max_messages",
                value: self.max_messages,
            });
        }
        if self.max_bytes < -1 {
            return Err(StreamConfigError::InvalidLimit {
                field: "max_bytes",
                value: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Builder for [`TelepathConfig`].
#[derive(Debug, Default)]
pub struct TelepathConfigBuilder {
    config: TelepathConfig,
}

impl TelepathConfigBuilder {
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    #[must_use]
    pub fn max_messages(mut self, max_messages: i64) -> Self {
        self.config.max_messages = max_messages;
        self
    }

    #[must_use]
    pub fn max_bytes(mut self, max_bytes: i64) -> Self {
        self.config.max_bytes = max_bytes;
        self
    }

    /// # Errors
    ///
    /// See [`TelepathConfig::validate`].
    pub fn build(self) -> Result<TelepathConfig, StreamConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
