//! Control surface for embedding applications.

use super::Command;
use crate::models::{AtmosphereEvent, AtmosphereSnapshot, ChatEvidence, HostEvent, RawMessage};
use crate::observability::{EventBus, FilteredReceiver};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Cloneable handle to a running engine task.
///
/// Queries that the engine publishes (`is_running`, `atmosphere`) are read
/// without a round trip; everything else is a message to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    atmosphere: watch::Receiver<Arc<AtmosphereSnapshot>>,
    running: watch::Receiver<bool>,
    event_bus: EventBus,
}

impl EngineHandle {
    pub(crate) const fn new(
        commands: mpsc::Sender<Command>,
        atmosphere: watch::Receiver<Arc<AtmosphereSnapshot>>,
        running: watch::Receiver<bool>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            commands,
            atmosphere,
            running,
            event_bus,
        }
    }

    /// Whether the engine is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// The current atmosphere snapshot.
    #[must_use]
    pub fn atmosphere(&self) -> Arc<AtmosphereSnapshot> {
        Arc::clone(&self.atmosphere.borrow())
    }

    /// A receiver that wakes whenever the snapshot is replaced.
    #[must_use]
    pub fn watch_atmosphere(&self) -> watch::Receiver<Arc<AtmosphereSnapshot>> {
        self.atmosphere.clone()
    }

    /// Copy of the evidence window, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn buffer(&self) -> Result<Vec<ChatEvidence>> {
        self.request(Command::Buffer).await
    }

    /// Hands one chat message to the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn submit(&self, message: RawMessage) -> Result<()> {
        self.commands
            .send(Command::Message(message))
            .await
            .map_err(|_| Error::EngineClosed)
    }

    /// Starts the engine. Returns false if it was already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn start(&self) -> Result<bool> {
        self.request(Command::Start).await
    }

    /// Stops the engine. Returns false if it was already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn stop(&self) -> Result<bool> {
        self.request(Command::Stop).await
    }

    /// Starts a stopped engine or stops a running one; returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn toggle(&self) -> Result<bool> {
        self.request(Command::Toggle).await
    }

    /// Analyzes the window now, ignoring the interval.
    ///
    /// Returns false when the window holds fewer than the minimum number of
    /// messages and nothing was sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn analyze_now(&self) -> Result<bool> {
        self.request(Command::AnalyzeNow).await
    }

    /// Stops accepting commands from every handle.
    ///
    /// Commands already queued are still applied and in-flight cycles still
    /// complete before the engine task exits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| Error::EngineClosed)
    }

    /// Applies one host event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineClosed`] if the engine task has exited.
    pub async fn apply(&self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::Message(raw) => self.submit(raw).await,
            HostEvent::Start => self.start().await.map(drop),
            HostEvent::Stop => self.stop().await.map(drop),
            HostEvent::Toggle => self.toggle().await.map(drop),
            HostEvent::Analyze => self.analyze_now().await.map(drop),
        }
    }

    /// Subscribes to every engine event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AtmosphereEvent> {
        self.event_bus.subscribe()
    }

    /// Subscribes to mood changes (new snapshot plus previous mood).
    #[must_use]
    pub fn on_atmosphere_change(
        &self,
    ) -> FilteredReceiver<impl Fn(&AtmosphereEvent) -> bool + use<>> {
        self.event_bus.subscribe_event_type("atmosphere.changed")
    }

    /// Subscribes to highlights.
    #[must_use]
    pub fn on_highlight(&self) -> FilteredReceiver<impl Fn(&AtmosphereEvent) -> bool + use<>> {
        self.event_bus.subscribe_event_type("highlight")
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::EngineClosed)?;
        reply_rx.await.map_err(|_| Error::EngineClosed)
    }
}
