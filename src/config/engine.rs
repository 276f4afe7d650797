//! Controller thresholds.

use super::{ConfigFileEngine, env_parse};
use crate::{Error, Result};
use std::time::Duration;

/// Configuration for the evidence window, trigger and reconciler.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `NEWTYPE_ANALYSIS_INTERVAL_MS` | u64 | `180000` | Minimum gap between automatic analyses |
/// | `NEWTYPE_BUFFER_SIZE` | usize | `15` | Evidence window capacity |
/// | `NEWTYPE_MIN_MESSAGES` | usize | `5` | Messages required before analysis |
/// | `NEWTYPE_MIN_MESSAGE_LENGTH` | usize | `30` | Minimum length (UTF-16 units) |
/// | `NEWTYPE_HIGHLIGHT_THRESHOLD` | f64 | `70` | Intensity needed for a highlight |
/// | `NEWTYPE_CONTINUITY_TAIL` | usize | `5` | Entries kept after a successful analysis |
///
/// # Example
///
/// ```rust
/// use newtype::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default().with_analysis_interval(Duration::from_secs(60));
/// assert_eq!(config.buffer_size, 15);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum time between automatic analyses.
    pub analysis_interval: Duration,
    /// Evidence window capacity.
    pub buffer_size: usize,
    /// Minimum window length before any analysis.
    pub min_messages: usize,
    /// Minimum admissible message length in UTF-16 code units.
    pub min_message_length: usize,
    /// Intensity (0-100) at or above which a flagged highlight is raised.
    pub highlight_threshold: f64,
    /// Window entries kept after a successful analysis.
    pub continuity_tail: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_interval: Duration::from_millis(180_000),
            buffer_size: 15,
            min_messages: 5,
            min_message_length: 30,
            highlight_threshold: 70.0,
            continuity_tail: 5,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>("NEWTYPE_ANALYSIS_INTERVAL_MS") {
            self.analysis_interval = Duration::from_millis(ms);
        }
        if let Some(v) = env_parse("NEWTYPE_BUFFER_SIZE") {
            self.buffer_size = v;
        }
        if let Some(v) = env_parse("NEWTYPE_MIN_MESSAGES") {
            self.min_messages = v;
        }
        if let Some(v) = env_parse("NEWTYPE_MIN_MESSAGE_LENGTH") {
            self.min_message_length = v;
        }
        if let Some(v) = env_parse("NEWTYPE_HIGHLIGHT_THRESHOLD") {
            self.highlight_threshold = v;
        }
        if let Some(v) = env_parse("NEWTYPE_CONTINUITY_TAIL") {
            self.continuity_tail = v;
        }
        self
    }

    pub(super) fn merge_file(mut self, file: &ConfigFileEngine) -> Self {
        if let Some(ms) = file.analysis_interval_ms {
            self.analysis_interval = Duration::from_millis(ms);
        }
        if let Some(v) = file.buffer_size {
            self.buffer_size = v;
        }
        if let Some(v) = file.min_messages {
            self.min_messages = v;
        }
        if let Some(v) = file.min_message_length {
            self.min_message_length = v;
        }
        if let Some(v) = file.highlight_threshold {
            self.highlight_threshold = v;
        }
        if let Some(v) = file.continuity_tail {
            self.continuity_tail = v;
        }
        self
    }

    /// Sets the analysis interval.
    #[must_use]
    pub const fn with_analysis_interval(mut self, interval: Duration) -> Self {
        self.analysis_interval = interval;
        self
    }

    /// Sets the window capacity.
    #[must_use]
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the minimum window length before analysis.
    #[must_use]
    pub const fn with_min_messages(mut self, count: usize) -> Self {
        self.min_messages = count;
        self
    }

    /// Sets the minimum admissible message length.
    #[must_use]
    pub const fn with_min_message_length(mut self, length: usize) -> Self {
        self.min_message_length = length;
        self
    }

    /// Sets the highlight intensity threshold.
    #[must_use]
    pub const fn with_highlight_threshold(mut self, threshold: f64) -> Self {
        self.highlight_threshold = threshold;
        self
    }

    /// Sets the continuity tail length.
    #[must_use]
    pub const fn with_continuity_tail(mut self, tail: usize) -> Self {
        self.continuity_tail = tail;
        self
    }

    /// Analysis interval in whole milliseconds.
    #[must_use]
    pub fn analysis_interval_ms(&self) -> u64 {
        u64::try_from(self.analysis_interval.as_millis()).unwrap_or(u64::MAX)
    }

    /// Checks that the thresholds can ever produce an analysis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first violated bound.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidInput("buffer_size must be > 0".into()));
        }
        if self.min_messages == 0 {
            return Err(Error::InvalidInput("min_messages must be > 0".into()));
        }
        if self.min_messages > self.buffer_size {
            return Err(Error::InvalidInput(format!(
                "min_messages ({}) exceeds buffer_size ({})",
                self.min_messages, self.buffer_size
            )));
        }
        if self.continuity_tail > self.buffer_size {
            return Err(Error::InvalidInput(format!(
                "continuity_tail ({}) exceeds buffer_size ({})",
                self.continuity_tail, self.buffer_size
            )));
        }
        if !(0.0..=100.0).contains(&self.highlight_threshold) {
            return Err(Error::InvalidInput(format!(
                "highlight_threshold ({}) must be within 0..=100",
                self.highlight_threshold
            )));
        }
        Ok(())
    }
}
