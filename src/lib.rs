//! # Newtype
//!
//! Real-time atmosphere detection for tabletop roleplay chat.
//!
//! Newtype listens to a live stream of chat messages, keeps a rolling window
//! of in-character evidence, and periodically asks a remote analysis service
//! what the current scene feels like (mood, intensity, highlight).
//!
//! ## Pipeline
//!
//! ```text
//! host event -> MessageFilter -> EvidenceWindow -> trigger? -> AnalysisService
//!                                                                  |
//!             EventBus <- Reconciler <- Controller::complete_cycle <-+
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use newtype::engine::Engine;
//! use newtype::{EngineConfig, HttpAnalysisClient, RawMessage};
//!
//! let client = HttpAnalysisClient::new(ServiceConfig::default());
//! let (handle, _task) = Engine::builder(EngineConfig::default(), Arc::new(client)).spawn()?;
//!
//! handle.start().await?;
//! handle.submit(RawMessage::new("The dragon's shadow falls across the square...")).await?;
//! println!("{:?}", handle.atmosphere());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod analysis;
pub mod config;
pub mod engine;
pub mod models;
pub mod observability;
pub mod services;

pub use analysis::{AnalysisHttpConfig, AnalysisService, HttpAnalysisClient, ServiceStatus};
pub use config::{EngineConfig, LoggingSettings, NewtypeConfig, ServiceConfig};
pub use engine::{Engine, EngineHandle};
pub use models::{
    ActorId, AnalysisVerdict, AtmosphereEvent, AtmosphereSnapshot, ChatEvidence, EventMeta,
    HostEvent, RawMessage,
};
pub use services::{Classification, Controller, MessageFilter, Reconciler, Scheduler};

/// Error type for newtype operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Invalid configuration values, malformed host events |
/// | `OperationFailed` | Config file I/O, logging initialization |
/// | `Transport` | The analysis call could not reach the service |
/// | `Service` | The analysis service answered with a non-success status |
/// | `MalformedResponse` | The analysis body does not parse or is out of range |
/// | `EngineClosed` | A control call was made after the engine task exited |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Network or connection error on the analysis call.
    #[error("transport failure: {cause}")]
    Transport {
        /// The underlying cause.
        cause: String,
    },

    /// The analysis service returned a non-success status.
    ///
    /// Also raised when the service reports its own failure through the
    /// `error` field of an otherwise well-formed verdict.
    #[error("service failure ({status}): {body}")]
    Service {
        /// HTTP status code (0 when the service reported the failure in-band).
        status: u16,
        /// Response body or in-band error message.
        body: String,
    },

    /// The analysis body could not be interpreted.
    #[error("malformed response: {cause}")]
    MalformedResponse {
        /// The underlying cause.
        cause: String,
    },

    /// The engine task is no longer running.
    #[error("engine closed")]
    EngineClosed,
}

impl Error {
    /// Returns the analysis failure kind for cycle-level errors.
    ///
    /// `None` for errors that cannot come out of an analysis call.
    #[must_use]
    pub const fn cycle_failure_kind(&self) -> Option<&'static str> {
        match self {
            Self::Transport { .. } => Some("transport"),
            Self::Service { .. } => Some("service"),
            Self::MalformedResponse { .. } => Some("malformed"),
            _ => None,
        }
    }
}

/// Result type alias for newtype operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
