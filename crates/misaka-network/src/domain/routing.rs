//! Signal routing.
//!
//! Publish subjects place each signal in the partition of its authority
//! level: `telepath_<name>.lv<authority>`. Subscribers always bind the
//! wildcard `telepath_<name>.>`, so they see every level of their telepath
//! and nothing of any other telepath.
//!
//! There is no per-level subscription filter.

use super::telepath::{TelepathName, STREAM_PREFIX};

/// Token prefix of an authority partition.
pub const PARTITION_PREFIX: &str = "lv";

/// Subject a signal with `authority` is published to. Total over `u32`.
#[must_use]
pub fn resolve_publish_subject(name: &TelepathName, authority: u32) -> String {
    format!("{STREAM_PREFIX}{name}.{PARTITION_PREFIX}{authority}")
}

/// Pattern a subscriber binds: every partition of the telepath.
#[must_use]
pub fn resolve_subscribe_pattern(name: &TelepathName) -> String {
    name.subject_prefix()
}

/// Recover the authority level from a publish subject.
///
/// Returns `None` for subjects this crate never publishes to.
#[must_use]
pub fn parse_authority(subject: &str) -> Option<u32> {
    let rest = subject.strip_prefix(STREAM_PREFIX)?;
    let (telepath, partition) = rest.split_once('.')?;
    if telepath.is_empty() {
        return None;
    }
    let digits = partition.strip_prefix(PARTITION_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Broker subject matching.
///
/// Tokens are separated by `.`. `*` matches exactly one token, and `>` as
/// the last token matches one or more remaining tokens.
#[must_use]
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return pattern_tokens.next().is_none(),
            (Some("*"), Some(token)) if !token.is_empty() => {}
            (Some(p), Some(s)) if !p.is_empty() && p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Whether any subject could match both patterns.
#[must_use]
pub fn subjects_overlap(a: &str, b: &str) -> bool {
    let a_tokens: Vec<&str> = a.split('.').collect();
    let b_tokens: Vec<&str> = b.split('.').collect();

    let mut i = 0;
    loop {
        match (a_tokens.get(i), b_tokens.get(i)) {
            (Some(&">"), Some(_)) | (Some(_), Some(&">")) => return true,
            (Some(&x), Some(&y)) => {
                if x != "*" && y != "*" && x != y {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
        i += 1;
    }
}
