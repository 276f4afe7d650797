//! Analysis service boundary.
//!
//! The controller never computes mood itself: it sends the evidence window
//! to an [`AnalysisService`] and interprets the verdict. The production
//! implementation is [`HttpAnalysisClient`]; tests substitute in-process
//! services.

mod http;

pub use http::{HttpAnalysisClient, ServiceStatus};

use crate::config::ServiceConfig;
use crate::models::{AnalysisVerdict, ChatEvidence};
use crate::{Error, Result};
use std::time::Duration;

/// Trait for atmosphere analysis backends.
///
/// Calls are blocking; the engine runs them on the blocking thread pool.
pub trait AnalysisService: Send + Sync {
    /// The service name, for logs.
    fn name(&self) -> &'static str;

    /// Analyzes a batch of evidence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`], [`Error::Service`] or
    /// [`Error::MalformedResponse`] when no usable verdict was obtained.
    fn analyze(&self, messages: &[ChatEvidence]) -> Result<AnalysisVerdict>;
}

/// HTTP client configuration for the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for AnalysisHttpConfig {
    fn default() -> Self {
        Self::from_service(&ServiceConfig::default())
    }
}

impl AnalysisHttpConfig {
    /// Takes the timeouts out of a service configuration.
    #[must_use]
    pub const fn from_service(config: &ServiceConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: AnalysisHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(format!("newtype/{}", env!("CARGO_PKG_VERSION")));
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    } else {
        builder = builder.timeout(None);
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build analysis HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Parses and checks a verdict body.
///
/// # Errors
///
/// - [`Error::MalformedResponse`] if the body is not a verdict or the
///   intensity is outside `[0, 100]`.
/// - [`Error::Service`] (status 0) if the service reported an in-band error.
pub fn parse_verdict(body: &str) -> Result<AnalysisVerdict> {
    let verdict: AnalysisVerdict =
        serde_json::from_str(body).map_err(|e| Error::MalformedResponse {
            cause: format!("invalid verdict JSON: {e}"),
        })?;

    if let Some(reason) = verdict.error.as_deref().filter(|r| !r.trim().is_empty()) {
        return Err(Error::Service {
            status: 0,
            body: reason.to_string(),
        });
    }
    if !verdict.intensity.is_finite() || !(0.0..=100.0).contains(&verdict.intensity) {
        return Err(Error::MalformedResponse {
            cause: format!("intensity {} outside 0..=100", verdict.intensity),
        });
    }
    Ok(verdict)
}
