//! Atmosphere state reconciler.
//!
//! Holds the current [`AtmosphereSnapshot`] and merges each new verdict into
//! it, reporting which transitions the verdict caused.

use crate::models::{AnalysisVerdict, AtmosphereSnapshot};
use std::sync::Arc;

/// Transitions detected while reconciling a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transitions {
    /// The verdict's mood differs from the previous snapshot's.
    pub mood_changed: bool,
    /// The verdict is flagged and at or above the highlight threshold.
    pub highlight_crossed: bool,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The snapshot now held.
    pub snapshot: Arc<AtmosphereSnapshot>,
    /// Mood of the replaced snapshot.
    pub previous_mood: String,
    /// Transitions caused by the verdict.
    pub transitions: Transitions,
}

/// Owner of the current atmosphere snapshot.
#[derive(Debug, Clone)]
pub struct Reconciler {
    snapshot: Arc<AtmosphereSnapshot>,
    highlight_threshold: f64,
}

impl Reconciler {
    /// Creates a reconciler holding the neutral snapshot.
    #[must_use]
    pub fn new(highlight_threshold: f64) -> Self {
        Self {
            snapshot: Arc::new(AtmosphereSnapshot::neutral()),
            highlight_threshold,
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AtmosphereSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Replaces the snapshot with `verdict` stamped at `now`.
    ///
    /// The verdict is taken verbatim; the old snapshot is swapped out in one
    /// assignment, so readers holding either `Arc` always see a whole value.
    pub fn reconcile(&mut self, verdict: AnalysisVerdict, now: u64) -> Reconciliation {
        let transitions = Transitions {
            mood_changed: verdict.mood != self.snapshot.mood,
            highlight_crossed: verdict.is_highlight
                && verdict.intensity >= self.highlight_threshold,
        };

        let next = Arc::new(AtmosphereSnapshot::from_verdict(verdict, now));
        let previous = std::mem::replace(&mut self.snapshot, Arc::clone(&next));

        tracing::info!(
            mood = %next.mood,
            intensity = next.intensity,
            is_highlight = next.is_highlight,
            previous_mood = %previous.mood,
            mood_changed = transitions.mood_changed,
            highlight_crossed = transitions.highlight_crossed,
            "Atmosphere reconciled"
        );

        Reconciliation {
            snapshot: next,
            previous_mood: previous.mood.clone(),
            transitions,
        }
    }
}
