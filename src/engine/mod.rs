//! Async engine around the synchronous [`Controller`].
//!
//! # Architecture
//!
//! ```text
//! EngineHandle --[mpsc Command]--> Engine task --owns--> Controller
//!      ^                              |    ^
//!      | watch (snapshot, running)    |    | Completion
//!      +------------------------------+    |
//!                                     spawn_blocking(AnalysisService::analyze)
//!                                     |
//!                                     v
//!                                  EventBus --> subscribers
//! ```
//!
//! All controller state lives on the engine task; nothing else mutates it.
//! An analysis runs on the blocking pool with its own copy of the window,
//! so intake keeps flowing while it is in flight. When it finishes, the
//! result comes back to the engine task and goes through
//! [`Controller::complete_cycle`].
//!
//! Overlapping cycles are neither cancelled nor deduplicated; the last one
//! to complete determines the snapshot.

mod clock;
mod handle;
mod notifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handle::EngineHandle;
pub use notifier::{LogNotifier, Notice, Notifier};

use crate::analysis::AnalysisService;
use crate::config::EngineConfig;
use crate::models::{
    AnalysisVerdict, AtmosphereEvent, AtmosphereSnapshot, ChatEvidence, EventMeta, RawMessage,
};
use crate::observability::EventBus;
use crate::services::{Controller, CycleOutcome, CycleRequest, Intake};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

const EVENT_SOURCE: &str = "engine";
const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Requests sent from handles to the engine task.
pub(crate) enum Command {
    Message(RawMessage),
    Start(oneshot::Sender<bool>),
    Stop(oneshot::Sender<bool>),
    Toggle(oneshot::Sender<bool>),
    AnalyzeNow(oneshot::Sender<bool>),
    Buffer(oneshot::Sender<Vec<ChatEvidence>>),
    Shutdown,
}

/// A finished analysis call.
struct Completion {
    cycle_id: u64,
    result: Result<AnalysisVerdict>,
}

/// Builder for an [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    service: Arc<dyn AnalysisService>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    command_capacity: usize,
}

impl EngineBuilder {
    /// Uses a custom time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Uses a custom notice receiver.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Publishes on an existing event bus.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Sets the command channel capacity.
    #[must_use]
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Spawns the engine task on the current tokio runtime.
    ///
    /// The engine starts in the stopped state. It runs until every handle
    /// is dropped and in-flight cycles have finished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> Result<(EngineHandle, JoinHandle<()>)> {
        self.config.validate()?;

        let controller = Controller::new(&self.config);
        let (command_tx, command_rx) = mpsc::channel(self.command_capacity);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (atmosphere_tx, atmosphere_rx) = watch::channel(controller.atmosphere());
        let (running_tx, running_rx) = watch::channel(false);

        tracing::info!(
            service = self.service.name(),
            interval_ms = self.config.analysis_interval_ms(),
            buffer_size = self.config.buffer_size,
            min_messages = self.config.min_messages,
            "Spawning engine"
        );

        let engine = Engine {
            controller,
            service: self.service,
            clock: self.clock,
            notifier: self.notifier,
            event_bus: self.event_bus.clone(),
            commands: command_rx,
            commands_closed: false,
            completion_tx,
            completion_rx,
            pending: HashMap::new(),
            atmosphere_tx,
            running_tx,
        };
        let task = tokio::spawn(engine.run());

        let handle = EngineHandle::new(command_tx, atmosphere_rx, running_rx, self.event_bus);
        Ok((handle, task))
    }
}

/// The engine task state.
pub struct Engine {
    controller: Controller,
    service: Arc<dyn AnalysisService>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    commands: mpsc::Receiver<Command>,
    commands_closed: bool,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    pending: HashMap<u64, CycleRequest>,
    atmosphere_tx: watch::Sender<Arc<AtmosphereSnapshot>>,
    running_tx: watch::Sender<bool>,
}

/// What woke the engine loop.
enum Wake {
    Command(Command),
    Completion(Completion),
    Closed,
}

impl Engine {
    /// Starts building an engine around `service`.
    #[must_use]
    pub fn builder(config: EngineConfig, service: Arc<dyn AnalysisService>) -> EngineBuilder {
        EngineBuilder {
            config,
            service,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            event_bus: EventBus::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }

    async fn run(mut self) {
        loop {
            if self.commands_closed && self.pending.is_empty() {
                break;
            }

            let wake = tokio::select! {
                Some(completion) = self.completion_rx.recv() => Wake::Completion(completion),
                command = self.commands.recv(), if !self.commands_closed => {
                    command.map_or(Wake::Closed, Wake::Command)
                },
                else => Wake::Closed,
            };

            match wake {
                Wake::Command(command) => self.handle_command(command),
                Wake::Completion(completion) => self.finish_cycle(completion),
                Wake::Closed => {
                    self.commands_closed = true;
                    if !self.pending.is_empty() {
                        tracing::info!(
                            in_flight = self.pending.len(),
                            "All handles dropped; waiting for in-flight cycles"
                        );
                    }
                },
            }
        }
        tracing::info!("Engine task finished");
    }

    fn handle_command(&mut self, command: Command) {
        let now = self.clock.now_ms();
        match command {
            Command::Message(raw) => {
                if let Intake::Triggered(request) = self.controller.on_message(raw, now) {
                    self.dispatch(request);
                }
            },
            Command::Start(reply) => {
                let _ = reply.send(self.start(now));
            },
            Command::Stop(reply) => {
                let _ = reply.send(self.stop(now));
            },
            Command::Toggle(reply) => {
                if self.controller.is_running() {
                    self.stop(now);
                } else {
                    self.start(now);
                }
                let _ = reply.send(self.controller.is_running());
            },
            Command::AnalyzeNow(reply) => {
                let request = self.controller.analyze_now(now);
                let issued = request.is_some();
                if let Some(request) = request {
                    self.dispatch(request);
                }
                let _ = reply.send(issued);
            },
            Command::Buffer(reply) => {
                let _ = reply.send(self.controller.buffer());
            },
            Command::Shutdown => {
                tracing::info!("Shutdown requested");
                self.commands.close();
            },
        }
    }

    fn start(&mut self, now: u64) -> bool {
        if !self.controller.start(now) {
            return false;
        }
        self.running_tx.send_replace(true);
        self.notifier.notify(&Notice::EngineStarted);
        self.event_bus.publish(AtmosphereEvent::EngineStarted {
            meta: EventMeta::with_timestamp(EVENT_SOURCE, now),
        });
        true
    }

    fn stop(&mut self, now: u64) -> bool {
        if !self.controller.stop() {
            return false;
        }
        self.running_tx.send_replace(false);
        self.notifier.notify(&Notice::EngineStopped);
        self.event_bus.publish(AtmosphereEvent::EngineStopped {
            meta: EventMeta::with_timestamp(EVENT_SOURCE, now),
        });
        true
    }

    fn dispatch(&mut self, request: CycleRequest) {
        let cycle_id = request.cycle_id;
        let messages = request.messages.clone();
        let span = tracing::info_span!(
            "analysis_cycle",
            cycle_id,
            trigger = request.trigger.as_str(),
            message_count = messages.len()
        );

        tracing::info!(
            cycle_id,
            message_count = messages.len(),
            in_flight = self.pending.len(),
            "Analyzing messages"
        );
        metrics::counter!("newtype_analysis_cycles_total", "trigger" => request.trigger.as_str())
            .increment(1);
        self.event_bus.publish(AtmosphereEvent::AnalysisStarted {
            meta: EventMeta::with_timestamp(EVENT_SOURCE, request.requested_at),
            cycle_id,
            message_count: messages.len(),
        });
        self.pending.insert(cycle_id, request);

        let service = Arc::clone(&self.service);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(
            async move {
                let result =
                    match tokio::task::spawn_blocking(move || service.analyze(&messages)).await {
                        Ok(result) => result,
                        Err(join_error) => Err(Error::Service {
                            status: 0,
                            body: format!("analysis task aborted: {join_error}"),
                        }),
                    };
                let _ = completion_tx.send(Completion { cycle_id, result });
            }
            .instrument(span),
        );
    }

    fn finish_cycle(&mut self, completion: Completion) {
        let Some(request) = self.pending.remove(&completion.cycle_id) else {
            tracing::warn!(cycle_id = completion.cycle_id, "Completion for unknown cycle");
            return;
        };
        let now = self.clock.now_ms();
        let outcome = self.controller.complete_cycle(&request, completion.result, now);

        if let CycleOutcome::Applied { reconciliation, .. } = &outcome {
            self.atmosphere_tx
                .send_replace(Arc::clone(&reconciliation.snapshot));
            if reconciliation.transitions.highlight_crossed {
                self.notifier.notify(&Notice::Highlight {
                    mood: reconciliation.snapshot.mood.clone(),
                    intensity: reconciliation.snapshot.intensity,
                });
            }
        }

        for event in outcome.events(request.cycle_id, now) {
            self.event_bus.publish(event);
        }
    }
}
