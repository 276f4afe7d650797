//! HTTP analysis client.

use super::{AnalysisHttpConfig, AnalysisService, build_http_client, parse_verdict};
use crate::config::ServiceConfig;
use crate::models::{AnalysisVerdict, ChatEvidence};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Free-form status document returned by the service.
pub type ServiceStatus = BTreeMap<String, serde_json::Value>;

/// Request body for the analyze endpoint.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    messages: &'a [ChatEvidence],
}

/// Client for the remote analysis service.
pub struct HttpAnalysisClient {
    /// Endpoint configuration.
    config: ServiceConfig,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl HttpAnalysisClient {
    /// Creates a client for the given service.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let client = build_http_client(AnalysisHttpConfig::from_service(&config));
        Self { config, client }
    }

    /// Creates a client from `NEWTYPE_*` environment variables over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ServiceConfig::default().with_env_overrides())
    }

    /// The endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Queries the status endpoint.
    ///
    /// # Errors
    ///
    /// Same failure kinds as [`AnalysisService::analyze`].
    pub fn status(&self) -> Result<ServiceStatus> {
        let url = self.config.status_url();
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| transport_error(&url, &e))?;
        let body = read_success_body(&url, response)?;
        serde_json::from_str(&body).map_err(|e| Error::MalformedResponse {
            cause: format!("invalid status JSON: {e}"),
        })
    }
}

impl AnalysisService for HttpAnalysisClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn analyze(&self, messages: &[ChatEvidence]) -> Result<AnalysisVerdict> {
        let url = self.config.analyze_url();
        tracing::info!(url = %url, message_count = messages.len(), "Analyzing messages");

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { messages })
            .send()
            .map_err(|e| transport_error(&url, &e))?;

        let body = read_success_body(&url, response)?;
        parse_verdict(&body).inspect_err(|e| {
            tracing::error!(url = %url, error = %e, "Unusable analysis response");
        })
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        url = %url,
        error = %e,
        error_kind = error_kind,
        "Analysis request failed"
    );
    Error::Transport {
        cause: format!("{error_kind} error: {e}"),
    }
}

fn read_success_body(url: &str, response: reqwest::blocking::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::error!(
            url = %url,
            status = %status,
            body = %body,
            "Analysis service returned error status"
        );
        return Err(Error::Service {
            status: status.as_u16(),
            body,
        });
    }
    response.text().map_err(|e| Error::MalformedResponse {
        cause: format!("unreadable body: {e}"),
    })
}
