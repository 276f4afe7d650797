//! Message admission filter.
//!
//! Separates in-character roleplay from out-of-character (OOC) chatter and
//! from messages too short to carry any atmosphere.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use regex::Regex;
use std::sync::LazyLock;

/// An OOC marker recognised at the start of a message.
#[derive(Debug)]
pub struct OocPattern {
    /// Left-anchored, whitespace-tolerant pattern.
    pub pattern: Regex,
    /// Human-readable description of the marker.
    pub description: &'static str,
}

/// Static OOC prefix patterns.
pub static OOC_PATTERNS: LazyLock<Vec<OocPattern>> = LazyLock::new(|| {
    vec![
        OocPattern {
            pattern: Regex::new(r"^\s*\(").expect("static regex: paren"),
            description: "(",
        },
        OocPattern {
            pattern: Regex::new(r"^\s*//").expect("static regex: double slash"),
            description: "//",
        },
        OocPattern {
            pattern: Regex::new(r"(?i)^\s*ooc").expect("static regex: ooc"),
            description: "ooc",
        },
        OocPattern {
            pattern: Regex::new(r"(?i)^\s*\[ooc\]").expect("static regex: [ooc]"),
            description: "[ooc]",
        },
        OocPattern {
            pattern: Regex::new(r"(?i)^\s*<ooc>").expect("static regex: <ooc>"),
            description: "<ooc>",
        },
    ]
});

/// Outcome of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Admissible evidence.
    Admitted,
    /// Out-of-character chatter.
    RejectedOoc,
    /// Shorter than the minimum length.
    RejectedTooShort,
}

impl Classification {
    /// Whether the message should be buffered.
    #[must_use]
    pub const fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::RejectedOoc => "ooc",
            Self::RejectedTooShort => "too_short",
        }
    }
}

/// Stateless admission filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFilter {
    min_length: usize,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::new(30)
    }
}

impl MessageFilter {
    /// Creates a filter with the given minimum length in UTF-16 code units.
    #[must_use]
    pub const fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Minimum admissible length.
    #[must_use]
    pub const fn min_length(&self) -> usize {
        self.min_length
    }

    /// Classifies one message.
    ///
    /// OOC markers are checked first, so an OOC message is `RejectedOoc`
    /// whatever its length. Length counts UTF-16 code units of the
    /// untrimmed content.
    #[must_use]
    pub fn classify(&self, content: &str) -> Classification {
        if is_ooc(content) {
            return Classification::RejectedOoc;
        }
        if content.encode_utf16().count() < self.min_length {
            return Classification::RejectedTooShort;
        }
        Classification::Admitted
    }
}

/// Whether content starts with an OOC marker.
#[must_use]
pub fn is_ooc(content: &str) -> bool {
    OOC_PATTERNS.iter().any(|p| p.pattern.is_match(content))
}
