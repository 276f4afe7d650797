//! Data models for newtype.
//!
//! This module contains the core data structures that flow through the
//! controller: raw host messages, admitted evidence, verdicts, snapshots and
//! events.

mod atmosphere;
mod events;
mod evidence;
mod host;

pub use atmosphere::{AnalysisVerdict, AtmosphereSnapshot, NEUTRAL_MOOD};
pub use events::{AtmosphereEvent, EventMeta};
pub use evidence::{ActorId, ChatEvidence, RawMessage, UNKNOWN_SPEAKER};
pub use host::HostEvent;
