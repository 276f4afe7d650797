//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive when neither config nor `RUST_LOG` set one.
const DEFAULT_FILTER: &str = "newtype=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
    /// Level filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Resolves settings with `RUST_LOG` and the verbose flag.
    ///
    /// Precedence for the filter: `--verbose` (debug), then `RUST_LOG`, then
    /// the configured filter, then `newtype=info`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = settings
            .and_then(|s| s.format.as_deref())
            .map(LogFormat::parse)
            .unwrap_or_default();
        let file = settings.and_then(|s| s.file.clone());

        let filter = if verbose {
            EnvFilter::new("newtype=debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let directive = settings
                    .and_then(|s| s.filter.as_deref())
                    .unwrap_or(DEFAULT_FILTER);
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
            })
        };

        Self {
            format,
            file,
            filter,
        }
    }
}
