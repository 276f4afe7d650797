//! Chat messages as they arrive and as admitted evidence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker name used when the host gives none.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Identifier of the actor a message was spoken as.
///
/// Only the identifier is held; the actor itself belongs to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Creates a new actor ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Raw message descriptor handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Message text.
    #[serde(default)]
    pub content: String,
    /// Display name of the speaker.
    #[serde(default)]
    pub speaker_alias: Option<String>,
    /// Actor the message was spoken as.
    #[serde(default)]
    pub actor_id: Option<ActorId>,
}

impl RawMessage {
    /// Creates a message with content only.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the speaker alias.
    #[must_use]
    pub fn with_speaker(mut self, alias: impl Into<String>) -> Self {
        self.speaker_alias = Some(alias.into());
        self
    }

    /// Sets the actor reference.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor.into());
        self
    }
}

/// One admitted message.
///
/// Immutable once created. Serializes as
/// `{speaker, content, timestamp, actorId}` for the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvidence {
    /// Display name, `"Unknown"` when absent.
    pub speaker: String,
    /// Message text; already passed the filter.
    pub content: String,
    /// Admission time (Unix epoch milliseconds).
    #[serde(rename = "timestamp")]
    pub captured_at: u64,
    /// Originating actor, if any.
    #[serde(rename = "actorId")]
    pub actor_id: Option<ActorId>,
}

impl ChatEvidence {
    /// Builds evidence from an admitted raw message.
    #[must_use]
    pub fn admit(raw: RawMessage, captured_at: u64) -> Self {
        Self {
            speaker: raw
                .speaker_alias
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            content: raw.content,
            captured_at,
            actor_id: raw.actor_id,
        }
    }
}
