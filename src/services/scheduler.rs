//! Evidence buffer and trigger scheduler.
//!
//! # State machine
//!
//! ```text
//!            start(now)                  on_message / analyze_now
//!  Stopped ────────────▶ Running ─────────────────────────────────▶ CycleRequest
//!     ▲                    │
//!     └──────── stop() ────┘
//! ```
//!
//! The scheduler never performs I/O. It hands out [`CycleRequest`]s that
//! carry their own copy of the window; whoever runs the analysis reports
//! back through [`Scheduler::complete_success`]. A failed cycle needs no
//! report at all: nothing was changed when the request was issued.

use super::filter::{Classification, MessageFilter};
use super::window::EvidenceWindow;
use crate::config::EngineConfig;
use crate::models::{ChatEvidence, RawMessage};

/// Lifecycle and timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// False until `start`, true until `stop`.
    pub running: bool,
    /// Time of the last successful analysis, or of the last `start`.
    pub last_analysis_at: u64,
    /// Incremented by every `start`.
    pub session: u64,
}

/// What caused a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Count and interval gates both passed on message intake.
    Interval,
    /// Requested through `analyze_now`.
    Manual,
}

impl Trigger {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Manual => "manual",
        }
    }
}

/// A request to analyze a frozen copy of the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    /// Monotonic cycle identifier.
    pub cycle_id: u64,
    /// Session the request was issued in.
    pub session: u64,
    /// Window contents at trigger time.
    pub messages: Vec<ChatEvidence>,
    /// When the request was issued.
    pub requested_at: u64,
    /// What caused it.
    pub trigger: Trigger,
}

/// Result of feeding one message to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// The scheduler is stopped; nothing happened.
    Ignored,
    /// The filter rejected the message; nothing happened.
    Rejected(Classification),
    /// The message was appended; no analysis is due.
    Buffered {
        /// Window length after the append.
        window_len: usize,
    },
    /// The message was appended and an analysis is due.
    Triggered(CycleRequest),
}

/// Trigger predicate.
///
/// True iff running, the window holds at least `min_messages` entries, and
/// at least `interval_ms` elapsed since the last analysis.
#[must_use]
pub const fn trigger_due(
    running: bool,
    window_len: usize,
    min_messages: usize,
    elapsed_ms: u64,
    interval_ms: u64,
) -> bool {
    running && window_len >= min_messages && elapsed_ms >= interval_ms
}

/// Owner of the evidence window and lifecycle state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    filter: MessageFilter,
    window: EvidenceWindow,
    state: ControllerState,
    min_messages: usize,
    interval_ms: u64,
    continuity_tail: usize,
    next_cycle_id: u64,
}

impl Scheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            filter: MessageFilter::new(config.min_message_length),
            window: EvidenceWindow::new(config.buffer_size),
            state: ControllerState::default(),
            min_messages: config.min_messages,
            interval_ms: config.analysis_interval_ms(),
            continuity_tail: config.continuity_tail,
            next_cycle_id: 1,
        }
    }

    /// Stopped → Running. Returns false if already running.
    ///
    /// Clears the window and resets the interval clock to `now`, so the
    /// first admitted message can never trigger.
    pub fn start(&mut self, now: u64) -> bool {
        if self.state.running {
            return false;
        }
        self.window.clear();
        self.state.running = true;
        self.state.last_analysis_at = now;
        self.state.session += 1;
        tracing::info!(session = self.state.session, "Engine started");
        true
    }

    /// Running → Stopped. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.window.clear();
        self.state.running = false;
        tracing::info!(session = self.state.session, "Engine stopped");
        true
    }

    /// Whether the scheduler is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.running
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Read-only view of the window.
    #[must_use]
    pub const fn window(&self) -> &EvidenceWindow {
        &self.window
    }

    /// Defensive copy of the window.
    #[must_use]
    pub fn buffer(&self) -> Vec<ChatEvidence> {
        self.window.to_vec()
    }

    /// Filters, buffers and evaluates the trigger for one message.
    pub fn on_message(&mut self, raw: RawMessage, now: u64) -> Intake {
        if !self.state.running {
            return Intake::Ignored;
        }

        let classification = self.filter.classify(&raw.content);
        if !classification.is_admitted() {
            metrics::counter!(
                "newtype_messages_rejected_total",
                "reason" => classification.as_str()
            )
            .increment(1);
            return Intake::Rejected(classification);
        }

        self.window.push(ChatEvidence::admit(raw, now));
        let window_len = self.window.len();
        metrics::counter!("newtype_messages_admitted_total").increment(1);
        metrics::gauge!("newtype_window_len").set(window_len as f64);
        tracing::debug!(window_len, "Message buffered");

        if self.should_trigger(now) {
            Intake::Triggered(self.issue(now, Trigger::Interval))
        } else {
            Intake::Buffered { window_len }
        }
    }

    /// Evaluates the trigger predicate at `now`.
    #[must_use]
    pub fn should_trigger(&self, now: u64) -> bool {
        trigger_due(
            self.state.running,
            self.window.len(),
            self.min_messages,
            now.saturating_sub(self.state.last_analysis_at),
            self.interval_ms,
        )
    }

    /// Issues a cycle regardless of the interval, if the window is full enough.
    pub fn analyze_now(&mut self, now: u64) -> Option<CycleRequest> {
        if self.window.len() < self.min_messages {
            tracing::debug!(
                window_len = self.window.len(),
                min_messages = self.min_messages,
                "Manual analysis skipped: not enough messages"
            );
            return None;
        }
        Some(self.issue(now, Trigger::Manual))
    }

    /// Records a successful cycle.
    ///
    /// Resets the interval clock and trims the window to the continuity
    /// tail. Returns false (and changes nothing) when the request belongs to
    /// an earlier session or the scheduler is stopped.
    pub fn complete_success(&mut self, request: &CycleRequest, now: u64) -> bool {
        if !self.state.running || request.session != self.state.session {
            tracing::debug!(
                cycle_id = request.cycle_id,
                request_session = request.session,
                session = self.state.session,
                "Late cycle result; window left untouched"
            );
            return false;
        }
        self.state.last_analysis_at = now;
        self.window.retain_tail(self.continuity_tail);
        metrics::gauge!("newtype_window_len").set(self.window.len() as f64);
        true
    }

    fn issue(&mut self, now: u64, trigger: Trigger) -> CycleRequest {
        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;
        CycleRequest {
            cycle_id,
            session: self.state.session,
            messages: self.window.to_vec(),
            requested_at: now,
            trigger,
        }
    }
}
