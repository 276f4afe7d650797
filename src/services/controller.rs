//! Synchronous controller core.
//!
//! Combines the [`Scheduler`] and [`Reconciler`] behind one object with
//! explicit timestamps. [`Controller::complete_cycle`] is the single state
//! transition applied when an analysis finishes, whichever way it finished.

use super::reconciler::{Reconciler, Reconciliation};
use super::scheduler::{ControllerState, CycleRequest, Intake, Scheduler};
use crate::config::EngineConfig;
use crate::models::{
    AnalysisVerdict, AtmosphereEvent, AtmosphereSnapshot, ChatEvidence, EventMeta, RawMessage,
};
use crate::{Error, Result};
use std::sync::Arc;

const EVENT_SOURCE: &str = "controller";

/// How a finished cycle was applied.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The verdict replaced the snapshot.
    Applied {
        /// Snapshot and transitions.
        reconciliation: Reconciliation,
        /// Whether the window was trimmed and the interval clock reset.
        ///
        /// False for results that arrive after `stop` or a later `start`.
        window_trimmed: bool,
    },
    /// The cycle failed; window and interval clock are unchanged.
    Failed {
        /// "transport", "service" or "malformed".
        kind: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

impl CycleOutcome {
    /// Events subscribers should see for this outcome, in order.
    #[must_use]
    pub fn events(&self, cycle_id: u64, now: u64) -> Vec<AtmosphereEvent> {
        match self {
            Self::Applied { reconciliation, .. } => {
                let mut events = Vec::with_capacity(2);
                if reconciliation.transitions.mood_changed {
                    events.push(AtmosphereEvent::AtmosphereChanged {
                        meta: EventMeta::with_timestamp(EVENT_SOURCE, now),
                        snapshot: (*reconciliation.snapshot).clone(),
                        previous_mood: reconciliation.previous_mood.clone(),
                    });
                }
                if reconciliation.transitions.highlight_crossed {
                    events.push(AtmosphereEvent::Highlight {
                        meta: EventMeta::with_timestamp(EVENT_SOURCE, now),
                        snapshot: (*reconciliation.snapshot).clone(),
                    });
                }
                events
            },
            Self::Failed { kind, reason } => vec![AtmosphereEvent::AnalysisFailed {
                meta: EventMeta::with_timestamp(EVENT_SOURCE, now),
                cycle_id,
                kind: *kind,
                reason: reason.clone(),
            }],
        }
    }
}

/// Scheduler plus reconciler, driven by explicit timestamps.
#[derive(Debug, Clone)]
pub struct Controller {
    scheduler: Scheduler,
    reconciler: Reconciler,
}

impl Controller {
    /// Creates a stopped controller with a neutral snapshot.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config),
            reconciler: Reconciler::new(config.highlight_threshold),
        }
    }

    /// See [`Scheduler::start`].
    pub fn start(&mut self, now: u64) -> bool {
        self.scheduler.start(now)
    }

    /// See [`Scheduler::stop`].
    pub fn stop(&mut self) -> bool {
        self.scheduler.stop()
    }

    /// See [`Scheduler::on_message`].
    pub fn on_message(&mut self, raw: RawMessage, now: u64) -> Intake {
        self.scheduler.on_message(raw, now)
    }

    /// See [`Scheduler::analyze_now`].
    pub fn analyze_now(&mut self, now: u64) -> Option<CycleRequest> {
        self.scheduler.analyze_now(now)
    }

    /// Whether the controller is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Lifecycle and timing state.
    #[must_use]
    pub const fn state(&self) -> &ControllerState {
        self.scheduler.state()
    }

    /// Defensive copy of the evidence window.
    #[must_use]
    pub fn buffer(&self) -> Vec<ChatEvidence> {
        self.scheduler.buffer()
    }

    /// Current atmosphere.
    #[must_use]
    pub fn atmosphere(&self) -> Arc<AtmosphereSnapshot> {
        self.reconciler.snapshot()
    }

    /// Applies the result of the cycle issued as `request`.
    ///
    /// On success the snapshot is always replaced (even after `stop`); the
    /// window and interval clock are only touched when the request belongs to
    /// the current running session. On failure nothing changes.
    pub fn complete_cycle(
        &mut self,
        request: &CycleRequest,
        result: Result<AnalysisVerdict>,
        now: u64,
    ) -> CycleOutcome {
        match result {
            Ok(verdict) => {
                let window_trimmed = self.scheduler.complete_success(request, now);
                let reconciliation = self.reconciler.reconcile(verdict, now);
                if !self.scheduler.is_running() {
                    tracing::info!(
                        cycle_id = request.cycle_id,
                        "Verdict applied while engine is stopped"
                    );
                }
                CycleOutcome::Applied {
                    reconciliation,
                    window_trimmed,
                }
            },
            Err(err) => {
                let kind = err.cycle_failure_kind().unwrap_or("service");
                tracing::error!(
                    cycle_id = request.cycle_id,
                    message_count = request.messages.len(),
                    error_kind = kind,
                    error = %err,
                    "Analysis cycle failed"
                );
                metrics::counter!("newtype_analysis_failures_total", "kind" => kind).increment(1);
                CycleOutcome::Failed {
                    kind,
                    reason: failure_reason(&err),
                }
            },
        }
    }
}

fn failure_reason(err: &Error) -> String {
    match err {
        Error::Transport { cause } | Error::MalformedResponse { cause } => cause.clone(),
        _ => err.to_string(),
    }
}
