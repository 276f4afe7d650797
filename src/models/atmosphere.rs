//! Atmosphere verdicts and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Mood of the initial snapshot.
pub const NEUTRAL_MOOD: &str = "neutral";

/// Treats `null` the same as a missing string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Verdict returned by the analysis service.
///
/// `mood`, `intensity` and `is_highlight` are required; `scene_summary`
/// defaults to empty. `error` is set by the service when it fell back to a
/// placeholder verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    /// Mood label, e.g. "combat", "romance", "neutral".
    pub mood: String,
    /// Intensity in `[0, 100]`.
    pub intensity: f64,
    /// Whether the service flagged this moment.
    pub is_highlight: bool,
    /// Short description of the scene.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scene_summary: String,
    /// In-band failure reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisVerdict {
    /// Creates a verdict without a summary.
    #[must_use]
    pub fn new(mood: impl Into<String>, intensity: f64, is_highlight: bool) -> Self {
        Self {
            mood: mood.into(),
            intensity,
            is_highlight,
            scene_summary: String::new(),
            error: None,
        }
    }

    /// Sets the scene summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.scene_summary = summary.into();
        self
    }
}

/// The most recently reconciled atmosphere.
///
/// Replaced wholesale on every successful analysis, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSnapshot {
    /// Mood label.
    pub mood: String,
    /// Intensity in `[0, 100]`.
    pub intensity: f64,
    /// Whether the service flagged this moment.
    pub is_highlight: bool,
    /// Short description of the scene.
    pub scene_summary: String,
    /// When the verdict was applied (Unix epoch milliseconds, 0 for the initial snapshot).
    pub observed_at: u64,
}

impl Default for AtmosphereSnapshot {
    fn default() -> Self {
        Self::neutral()
    }
}

impl AtmosphereSnapshot {
    /// The snapshot held before any analysis has completed.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            mood: NEUTRAL_MOOD.to_string(),
            intensity: 0.0,
            is_highlight: false,
            scene_summary: String::new(),
            observed_at: 0,
        }
    }

    /// Takes a verdict verbatim and stamps it.
    #[must_use]
    pub fn from_verdict(verdict: AnalysisVerdict, observed_at: u64) -> Self {
        Self {
            mood: verdict.mood,
            intensity: verdict.intensity,
            is_highlight: verdict.is_highlight,
            scene_summary: verdict.scene_summary,
            observed_at,
        }
    }

    /// Observation time as a UTC datetime, `None` for the initial snapshot.
    #[must_use]
    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        if self.observed_at == 0 {
            return None;
        }
        i64::try_from(self.observed_at)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_neutral_default() {
        let snapshot = AtmosphereSnapshot::default();
        assert_eq!(snapshot.mood, "neutral");
        assert!(snapshot.intensity.abs() < f64::EPSILON);
        assert!(!snapshot.is_highlight);
        assert!(snapshot.observed_at_utc().is_none());
    }

    #[test]
    fn test_verdict_summary_optional() {
        let verdict: AnalysisVerdict =
            serde_json::from_value(json!({"mood": "drama", "intensity": 40, "is_highlight": false}))
                .unwrap();
        assert_eq!(verdict.scene_summary, "");
        assert!(verdict.error.is_none());
    }

    #[test]
    fn test_verdict_null_summary_is_empty() {
        let verdict: AnalysisVerdict = serde_json::from_value(json!({
            "mood": "tense",
            "intensity": 85,
            "is_highlight": true,
            "scene_summary": null
        }))
        .unwrap();
        assert_eq!(verdict.scene_summary, "");
    }

    #[test]
    fn test_verdict_requires_mood() {
        let result: Result<AnalysisVerdict, _> =
            serde_json::from_value(json!({"intensity": 40, "is_highlight": false}));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_verdict_stamps_time() {
        let verdict = AnalysisVerdict::new("tense", 85.0, true).with_summary("Blades drawn.");
        let snapshot = AtmosphereSnapshot::from_verdict(verdict, 1_700_000_000_000);
        assert_eq!(snapshot.mood, "tense");
        assert_eq!(snapshot.scene_summary, "Blades drawn.");
        assert_eq!(
            snapshot.observed_at_utc().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }
}
