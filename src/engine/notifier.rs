//! User-facing notices.

use std::fmt;

/// A short notice meant for the person at the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The engine started listening.
    EngineStarted,
    /// The engine stopped listening.
    EngineStopped,
    /// A highlight was detected.
    Highlight {
        /// Mood of the highlighted verdict.
        mood: String,
        /// Intensity of the highlighted verdict.
        intensity: f64,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineStarted => write!(f, "Newtype engine started"),
            Self::EngineStopped => write!(f, "Newtype engine stopped"),
            Self::Highlight { mood, intensity } => {
                write!(f, "Highlight detected! ({mood}, {intensity}%)")
            },
        }
    }
}

/// Receiver of user-facing notices.
pub trait Notifier: Send + Sync {
    /// Surfaces one notice.
    fn notify(&self, notice: &Notice);
}

/// Notifier that writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!(notice = %notice, "User notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_text() {
        let notice = Notice::Highlight {
            mood: "combat".into(),
            intensity: 85.0,
        };
        assert_eq!(notice.to_string(), "Highlight detected! (combat, 85%)");
    }
}
