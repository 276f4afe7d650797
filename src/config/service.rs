//! Analysis service endpoint configuration.

use super::{ConfigFileService, env_parse};

/// Where and how to reach the remote analysis service.
///
/// `timeout_ms` defaults to 0 (no timeout): a hung call only delays the
/// next trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Path of the analyze endpoint.
    pub analyze_path: String,
    /// Path of the status endpoint.
    pub status_path: String,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            analyze_path: "/api/newtype/analyze".to_string(),
            status_path: "/api/newtype/status".to_string(),
            timeout_ms: 0,
            connect_timeout_ms: 3_000,
        }
    }
}

impl ServiceConfig {
    /// Default service location.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000";

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Full URL of the analyze endpoint.
    #[must_use]
    pub fn analyze_url(&self) -> String {
        format!("{}{}", self.base_url, self.analyze_path)
    }

    /// Full URL of the status endpoint.
    #[must_use]
    pub fn status_url(&self) -> String {
        format!("{}{}", self.base_url, self.status_path)
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("NEWTYPE_SERVICE_URL") {
            self = self.with_base_url(url);
        }
        if let Some(v) = env_parse("NEWTYPE_SERVICE_TIMEOUT_MS") {
            self.timeout_ms = v;
        }
        if let Some(v) = env_parse("NEWTYPE_SERVICE_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = v;
        }
        self
    }

    pub(super) fn merge_file(mut self, file: ConfigFileService) -> Self {
        if let Some(url) = file.base_url {
            self = self.with_base_url(url);
        }
        if let Some(path) = file.analyze_path {
            self.analyze_path = path;
        }
        if let Some(path) = file.status_path {
            self.status_path = path;
        }
        if let Some(v) = file.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = file.connect_timeout_ms {
            self.connect_timeout_ms = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_join_without_double_slash() {
        let config = ServiceConfig::default().with_base_url("http://10.0.0.5:8000/");
        assert_eq!(config.analyze_url(), "http://10.0.0.5:8000/api/newtype/analyze");
        assert_eq!(config.status_url(), "http://10.0.0.5:8000/api/newtype/status");
    }
}
