//! Events arriving from the host application.

use super::RawMessage;
use serde::{Deserialize, Serialize};

/// One inbound host event, as read line-by-line by the CLI host.
///
/// ```json
/// {"type": "message", "content": "...", "speakerAlias": "Aria", "actorId": "a1"}
/// {"type": "toggle"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A chat message was created.
    Message(RawMessage),
    /// Start the engine.
    Start,
    /// Stop the engine.
    Stop,
    /// Flip between running and stopped.
    Toggle,
    /// Analyze now, bypassing the interval.
    Analyze,
}

impl HostEvent {
    /// Parses a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the line is not a known event.
    pub fn parse(line: &str) -> crate::Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| crate::Error::InvalidInput(format!("host event: {e}")))
    }
}
