//! Telepath naming.
//!
//! A telepath `name` maps to the stream `telepath_<name>`, whose subjects are
//! `telepath_<name>.>`. Names are restricted to ASCII alphanumerics, `_` and
//! `-`, so a name can never add a subject token or a wildcard, and two
//! distinct names never share a stream or overlap in subject space.

use std::fmt;

use crate::error::TelepathError;

/// Prefix for every telepath stream name.
pub const STREAM_PREFIX: &str = "telepath_";

/// Suffix for the durable consumer bound to a telepath.
pub const CONSUMER_SUFFIX: &str = "_consumer";

/// Longest accepted telepath name in bytes.
pub const MAX_TELEPATH_NAME_LEN: usize = 64;

/// A validated telepath name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TelepathName(String);

impl TelepathName {
    /// Validate a caller-chosen name.
    ///
    /// # Errors
    ///
    /// `TelepathError::InvalidTelepathName` if the name is empty, too long,
    /// or contains anything but `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TelepathError> {
        let name = name.into();

        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.len() > MAX_TELEPATH_NAME_LEN {
            Some("name exceeds 64 bytes")
        } else if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            Some("only ASCII letters, digits, '_' and '-' are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(TelepathError::InvalidTelepathName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broker stream backing this telepath.
    #[must_use]
    pub fn stream_name(&self) -> String {
        format!("{STREAM_PREFIX}{}", self.0)
    }

    /// Wildcard subject covering every partition of this telepath.
    #[must_use]
    pub fn subject_prefix(&self) -> String {
        format!("{STREAM_PREFIX}{}.>", self.0)
    }

    /// Durable consumer name. Stable across restarts so that a restarted
    /// subscriber resumes instead of starting a second consumer.
    #[must_use]
    pub fn consumer_name(&self) -> String {
        format!("{}{CONSUMER_SUFFIX}", self.0)
    }
}

impl fmt::Display for TelepathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for TelepathName {
    type Error = TelepathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for TelepathName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
