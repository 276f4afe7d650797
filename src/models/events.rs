//! Engine event types for subscribers and observability.

use super::AtmosphereSnapshot;
use serde::Serialize;
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Event source component.
    pub source: &'static str,
    /// Timestamp (Unix epoch milliseconds).
    pub timestamp: u64,
}

impl EventMeta {
    /// Creates new event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(source: &'static str, timestamp: u64) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp,
        }
    }
}

/// Events emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AtmosphereEvent {
    /// The engine entered the running state.
    #[serde(rename = "engine.started")]
    EngineStarted {
        /// Event metadata.
        meta: EventMeta,
    },
    /// The engine entered the stopped state.
    #[serde(rename = "engine.stopped")]
    EngineStopped {
        /// Event metadata.
        meta: EventMeta,
    },
    /// An analysis cycle was handed to the service.
    #[serde(rename = "analysis.started")]
    AnalysisStarted {
        /// Event metadata.
        meta: EventMeta,
        /// Cycle identifier.
        cycle_id: u64,
        /// Number of messages sent.
        message_count: usize,
    },
    /// An analysis cycle failed; controller state is unchanged.
    #[serde(rename = "analysis.failed")]
    AnalysisFailed {
        /// Event metadata.
        meta: EventMeta,
        /// Cycle identifier.
        cycle_id: u64,
        /// Failure kind: "transport", "service" or "malformed".
        kind: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// The mood differs from the previous snapshot.
    #[serde(rename = "atmosphere.changed")]
    AtmosphereChanged {
        /// Event metadata.
        meta: EventMeta,
        /// The new snapshot.
        snapshot: AtmosphereSnapshot,
        /// Mood before this verdict.
        previous_mood: String,
    },
    /// A flagged verdict reached the highlight threshold.
    #[serde(rename = "highlight")]
    Highlight {
        /// Event metadata.
        meta: EventMeta,
        /// The new snapshot.
        snapshot: AtmosphereSnapshot,
    },
}

impl AtmosphereEvent {
    /// Returns the event type as a string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::EngineStarted { .. } => "engine.started",
            Self::EngineStopped { .. } => "engine.stopped",
            Self::AnalysisStarted { .. } => "analysis.started",
            Self::AnalysisFailed { .. } => "analysis.failed",
            Self::AtmosphereChanged { .. } => "atmosphere.changed",
            Self::Highlight { .. } => "highlight",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::EngineStarted { meta }
            | Self::EngineStopped { meta }
            | Self::AnalysisStarted { meta, .. }
            | Self::AnalysisFailed { meta, .. }
            | Self::AtmosphereChanged { meta, .. }
            | Self::Highlight { meta, .. } => meta,
        }
    }

    /// Returns the timestamp of the event.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.meta().timestamp
    }
}
