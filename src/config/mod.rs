//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `NEWTYPE_*` environment variables.
//!
//! ```toml
//! [engine]
//! analysis_interval_ms = 180000
//! buffer_size = 15
//! min_messages = 5
//! min_message_length = 30
//! highlight_threshold = 70
//! continuity_tail = 5
//!
//! [service]
//! base_url = "http://localhost:8000"
//! timeout_ms = 0
//!
//! [logging]
//! format = "json"
//! file = "/var/log/newtype.log"
//! ```

mod engine;
mod service;

pub use engine::EngineConfig;
pub use service::ServiceConfig;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for newtype.
#[derive(Debug, Clone, Default)]
pub struct NewtypeConfig {
    /// Controller thresholds and window sizes.
    pub engine: EngineConfig,
    /// Analysis service endpoint.
    pub service: ServiceConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging settings as read from file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// Optional log file (stderr when unset).
    pub file: Option<PathBuf>,
    /// Filter directive, e.g. `newtype=debug`.
    pub filter: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    /// Engine section.
    pub engine: Option<ConfigFileEngine>,
    /// Service section.
    pub service: Option<ConfigFileService>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Engine section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEngine {
    /// Minimum time between automatic analyses.
    pub analysis_interval_ms: Option<u64>,
    /// Window capacity.
    pub buffer_size: Option<usize>,
    /// Messages required before analysis.
    pub min_messages: Option<usize>,
    /// Minimum admissible message length.
    pub min_message_length: Option<usize>,
    /// Intensity needed for a highlight.
    pub highlight_threshold: Option<f64>,
    /// Entries kept after a successful analysis.
    pub continuity_tail: Option<usize>,
}

/// Service section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileService {
    /// Base URL of the analysis service.
    pub base_url: Option<String>,
    /// Analyze endpoint path.
    pub analyze_path: Option<String>,
    /// Status endpoint path.
    pub status_path: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
}

impl NewtypeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting engine configuration is invalid.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::from_config_file(file).with_env_overrides();
        config.engine.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/newtype/` on macOS)
    /// 2. XDG config dir (`~/.config/newtype/`)
    ///
    /// Returns defaults (with env overrides) if no usable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default().with_env_overrides();
        };

        let candidates = [
            base_dirs.config_dir().join("newtype").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("newtype")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default().with_env_overrides()
    }

    /// Converts a `ConfigFile` to `NewtypeConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(engine) = file.engine {
            config.engine = config.engine.merge_file(&engine);
        }
        if let Some(service) = file.service {
            config.service = config.service.merge_file(service);
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                format: logging.format,
                file: logging.file.map(PathBuf::from),
                filter: logging.filter,
            };
        }

        config
    }

    /// Applies `NEWTYPE_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.engine = self.engine.with_env_overrides();
        self.service = self.service.with_env_overrides();
        if let Ok(v) = std::env::var("NEWTYPE_LOG_FORMAT") {
            self.logging.format = Some(v);
        }
        if let Ok(v) = std::env::var("NEWTYPE_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        self
    }
}

/// Reads and parses an environment variable, ignoring unparsable values.
pub(crate) fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_from_config_file_partial_sections() {
        let file: ConfigFile = toml::from_str(
            r#"
            [engine]
            buffer_size = 20
            highlight_threshold = 80

            [service]
            base_url = "http://10.0.0.5:9000"
            "#,
        )
        .unwrap();

        let config = NewtypeConfig::from_config_file(file);
        assert_eq!(config.engine.buffer_size, 20);
        assert!((config.engine.highlight_threshold - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.engine.min_messages, 5);
        assert_eq!(config.engine.analysis_interval, Duration::from_millis(180_000));
        assert_eq!(config.service.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.service.analyze_path, "/api/newtype/analyze");
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[engine]\nanalysis_interval_ms = 60000\n\n[logging]\nformat = \"json\"\nfile = \"/tmp/newtype.log\""
        )
        .unwrap();

        let config = NewtypeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.engine.analysis_interval, Duration::from_secs(60));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/newtype.log")));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_engine() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nbuffer_size = 3\nmin_messages = 5").unwrap();

        let result = NewtypeConfig::load_from_file(file.path());
        assert!(matches!(result, Err(crate::Error::InvalidInput(_))));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = NewtypeConfig::load_from_file(Path::new("/nonexistent/newtype.toml"));
        assert!(matches!(
            result,
            Err(crate::Error::OperationFailed { ref operation, .. }) if operation == "read_config_file"
        ));
    }

    #[test]
    fn test_load_from_unparsable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\nbuffer_size = ").unwrap();

        let result = NewtypeConfig::load_from_file(file.path());
        assert!(matches!(
            result,
            Err(crate::Error::OperationFailed { ref operation, .. }) if operation == "parse_config_file"
        ));
    }
}
