//! Authority levels.
//!
//! The labelled levels `LV0..LV5` come from the schema. The wire field is an
//! open enum, so unlabelled non-negative values are still valid routing keys.

use crate::AuthorityLevel;

impl AuthorityLevel {
    /// Parse a level label such as `"lv3"` or `"LV3"`.
    ///
    /// Unknown labels yield `None`; callers decide on their own fallback.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::from_str_name(&label.trim().to_ascii_uppercase())
    }

    /// Numeric level used for routing.
    #[must_use]
    pub fn level(self) -> u32 {
        self as i32 as u32
    }

    /// All labelled levels, lowest first.
    #[must_use]
    pub fn all() -> [Self; 6] {
        [
            Self::Lv0,
            Self::Lv1,
            Self::Lv2,
            Self::Lv3,
            Self::Lv4,
            Self::Lv5,
        ]
    }
}
