//! Engine integration tests over a tokio runtime.
//!
//! The analysis service is an in-process mock; time comes from a
//! [`ManualClock`] so interval triggers are deterministic.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use newtype::engine::{Engine, EngineHandle, ManualClock, Notice, Notifier};
use newtype::models::{AnalysisVerdict, AtmosphereEvent, ChatEvidence, HostEvent, RawMessage};
use newtype::{AnalysisService, EngineConfig, Error, Result};
use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

const LINES: [&str; 8] = [
    "Rain hammers the shutters of the Gilded Stag tonight.",
    "The innkeeper slides a key across the bar without a word.",
    "Someone upstairs is pacing, the boards groaning with each step.",
    "Kestrel counts the exits twice, then a third time for luck.",
    "A hooded stranger orders two cups and drinks from neither.",
    "The fire pops, and every head in the room turns at once.",
    "Brannoc leans closer and lowers his voice to a rasp.",
    "Outside, hooves on cobblestones, too many to be a patrol.",
];

/// Returns a fixed verdict and records every window it was sent.
struct RecordingService {
    verdict: AnalysisVerdict,
    calls: Mutex<Vec<Vec<ChatEvidence>>>,
}

impl RecordingService {
    fn new(verdict: AnalysisVerdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<ChatEvidence>> {
        self.calls.lock().unwrap().clone()
    }
}

impl AnalysisService for RecordingService {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn analyze(&self, messages: &[ChatEvidence]) -> Result<AnalysisVerdict> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self.verdict.clone())
    }
}

/// Holds each call until the test releases it.
struct GatedService {
    verdict: AnalysisVerdict,
    gate: Mutex<std_mpsc::Receiver<()>>,
}

impl GatedService {
    fn new(verdict: AnalysisVerdict) -> (Arc<Self>, std_mpsc::Sender<()>) {
        let (tx, rx) = std_mpsc::channel();
        let service = Arc::new(Self {
            verdict,
            gate: Mutex::new(rx),
        });
        (service, tx)
    }
}

impl AnalysisService for GatedService {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn analyze(&self, _messages: &[ChatEvidence]) -> Result<AnalysisVerdict> {
        self.gate
            .lock()
            .unwrap()
            .recv_timeout(WAIT)
            .map_err(|e| Error::Transport {
                cause: e.to_string(),
            })?;
        Ok(self.verdict.clone())
    }
}

/// Gives each window size its own gate and verdict, so tests choose the
/// order in which concurrent cycles complete.
struct PerWindowService {
    gates: Mutex<HashMap<usize, (std_mpsc::Receiver<()>, AnalysisVerdict)>>,
    calls: Mutex<usize>,
}

impl PerWindowService {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(0),
        })
    }

    fn gate(&self, window_len: usize, verdict: AnalysisVerdict) -> std_mpsc::Sender<()> {
        let (tx, rx) = std_mpsc::channel();
        self.gates.lock().unwrap().insert(window_len, (rx, verdict));
        tx
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl AnalysisService for PerWindowService {
    fn name(&self) -> &'static str {
        "per-window"
    }

    fn analyze(&self, messages: &[ChatEvidence]) -> Result<AnalysisVerdict> {
        *self.calls.lock().unwrap() += 1;
        let entry = self.gates.lock().unwrap().remove(&messages.len());
        let (gate, verdict) = entry.ok_or_else(|| Error::Service {
            status: 404,
            body: format!("no gate for {} messages", messages.len()),
        })?;
        gate.recv_timeout(WAIT).map_err(|e| Error::Transport {
            cause: e.to_string(),
        })?;
        Ok(verdict)
    }
}

/// Always fails with a server error.
struct FailingService;

impl AnalysisService for FailingService {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn analyze(&self, _messages: &[ChatEvidence]) -> Result<AnalysisVerdict> {
        Err(Error::Service {
            status: 503,
            body: "model unavailable".into(),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

fn spawn(service: Arc<dyn AnalysisService>) -> (EngineHandle, JoinHandle<()>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let (handle, task) = Engine::builder(EngineConfig::default(), service)
        .with_clock(clock.clone())
        .spawn()
        .expect("valid config");
    (handle, task, clock)
}

async fn submit_lines(handle: &EngineHandle, lines: &[&str]) {
    for line in lines {
        handle.submit(RawMessage::new(*line)).await.unwrap();
    }
}

async fn next_event(events: &mut tokio::sync::broadcast::Receiver<AtmosphereEvent>) -> AtmosphereEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("event before timeout")
        .expect("bus open")
}

#[tokio::test]
async fn test_engine_starts_stopped_and_ignores_messages() {
    let service = RecordingService::new(AnalysisVerdict::new("calm", 10.0, false));
    let (handle, _task, _clock) = spawn(service.clone());

    assert!(!handle.is_running());
    submit_lines(&handle, &LINES[..6]).await;
    assert!(handle.buffer().await.unwrap().is_empty());
    assert!(!handle.analyze_now().await.unwrap());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_interval_trigger_applies_verdict() {
    let service = RecordingService::new(AnalysisVerdict::new("mystery", 40.0, false));
    let (handle, _task, clock) = spawn(service.clone());
    let mut changes = handle.on_atmosphere_change();

    assert!(handle.start().await.unwrap());
    submit_lines(&handle, &LINES[..5]).await;
    assert_eq!(handle.buffer().await.unwrap().len(), 5);
    assert!(service.calls().is_empty());

    clock.advance(Duration::from_millis(181_000));
    submit_lines(&handle, &LINES[5..6]).await;

    let event = tokio::time::timeout(WAIT, changes.recv())
        .await
        .expect("change before timeout")
        .unwrap();
    let AtmosphereEvent::AtmosphereChanged {
        snapshot,
        previous_mood,
        ..
    } = event
    else {
        panic!("expected atmosphere change");
    };
    assert_eq!(previous_mood, "neutral");
    assert_eq!(snapshot.mood, "mystery");

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 6);
    assert_eq!(handle.atmosphere().mood, "mystery");

    let window = handle.buffer().await.unwrap();
    assert_eq!(window.len(), 5);
    assert_eq!(window[0].content, LINES[1]);
}

#[tokio::test]
async fn test_intake_continues_while_cycle_in_flight() {
    let (service, release) = GatedService::new(AnalysisVerdict::new("tense", 60.0, false));
    let (handle, _task, _clock) = spawn(service);
    let mut changes = handle.on_atmosphere_change();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..5]).await;
    assert!(handle.analyze_now().await.unwrap());

    submit_lines(&handle, &LINES[5..7]).await;
    assert_eq!(handle.buffer().await.unwrap().len(), 7);
    assert_eq!(handle.atmosphere().mood, "neutral");

    release.send(()).unwrap();
    tokio::time::timeout(WAIT, changes.recv())
        .await
        .expect("change before timeout")
        .unwrap();

    let window = handle.buffer().await.unwrap();
    let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, LINES[2..7]);
}

#[tokio::test]
async fn test_overlapping_cycles_last_completion_wins() {
    let service = PerWindowService::new();
    let release_first = service.gate(5, AnalysisVerdict::new("calm", 20.0, false));
    let release_second = service.gate(7, AnalysisVerdict::new("dread", 65.0, false));
    let (handle, _task, clock) = spawn(service.clone());
    let mut changes = handle.on_atmosphere_change();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..5]).await;
    assert!(handle.analyze_now().await.unwrap());
    submit_lines(&handle, &LINES[5..7]).await;
    assert!(handle.analyze_now().await.unwrap());

    // Second cycle completes first.
    clock.advance(Duration::from_millis(181_000));
    release_second.send(()).unwrap();
    let AtmosphereEvent::AtmosphereChanged {
        snapshot,
        previous_mood,
        ..
    } = tokio::time::timeout(WAIT, changes.recv())
        .await
        .expect("change before timeout")
        .unwrap()
    else {
        panic!("expected atmosphere change");
    };
    assert_eq!((snapshot.mood.as_str(), previous_mood.as_str()), ("dread", "neutral"));
    let contents: Vec<String> = handle
        .buffer()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, LINES[2..7]);

    // Interval clock was reset by the second cycle, so this does not trigger.
    submit_lines(&handle, &LINES[7..8]).await;
    assert_eq!(handle.buffer().await.unwrap().len(), 6);

    // First cycle lands last and trims the window as it is now.
    clock.advance(Duration::from_millis(181_000));
    release_first.send(()).unwrap();
    let AtmosphereEvent::AtmosphereChanged {
        snapshot,
        previous_mood,
        ..
    } = tokio::time::timeout(WAIT, changes.recv())
        .await
        .expect("change before timeout")
        .unwrap()
    else {
        panic!("expected atmosphere change");
    };
    assert_eq!((snapshot.mood.as_str(), previous_mood.as_str()), ("calm", "dread"));
    assert_eq!(handle.atmosphere().mood, "calm");
    let contents: Vec<String> = handle
        .buffer()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, LINES[3..8]);

    // And reset the interval clock again.
    submit_lines(&handle, &["The lantern gutters out and nobody moves to relight it."]).await;
    assert_eq!(handle.buffer().await.unwrap().len(), 6);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn test_failed_cycle_leaves_buffer_and_snapshot() {
    let (handle, _task, _clock) = spawn(Arc::new(FailingService));
    let mut failures = handle.subscribe();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..6]).await;
    let before = handle.buffer().await.unwrap();
    assert!(handle.analyze_now().await.unwrap());

    let failure = loop {
        let event = next_event(&mut failures).await;
        if let AtmosphereEvent::AnalysisFailed { kind, reason, .. } = event {
            break (kind, reason);
        }
    };
    assert_eq!(failure.0, "service");
    assert!(failure.1.contains("503"));

    assert_eq!(handle.buffer().await.unwrap(), before);
    assert_eq!(handle.atmosphere().mood, "neutral");
    assert!(handle.is_running());
}

#[tokio::test]
async fn test_notifications_fire_once_each() {
    let service = RecordingService::new(
        AnalysisVerdict::new("tense", 85.0, true).with_summary("The stranger stands."),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (handle, _task) = Engine::builder(EngineConfig::default(), service)
        .with_clock(Arc::new(ManualClock::new(0)))
        .with_notifier(notifier.clone())
        .spawn()
        .unwrap();
    let mut events = handle.subscribe();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..5]).await;
    handle.analyze_now().await.unwrap();

    let mut seen = Vec::new();
    loop {
        let event = next_event(&mut events).await;
        let done = event.event_type() == "highlight";
        seen.push(event.event_type());
        if done {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            "engine.started",
            "analysis.started",
            "atmosphere.changed",
            "highlight"
        ]
    );
    assert!(events.try_recv().is_err());

    let notices = notifier.notices.lock().unwrap().clone();
    assert_eq!(
        notices,
        vec![
            Notice::EngineStarted,
            Notice::Highlight {
                mood: "tense".into(),
                intensity: 85.0,
            },
        ]
    );
    assert_eq!(handle.atmosphere().scene_summary, "The stranger stands.");
}

#[tokio::test]
async fn test_stop_then_start_resets_window() {
    let service = RecordingService::new(AnalysisVerdict::new("calm", 5.0, false));
    let (handle, _task, _clock) = spawn(service);

    assert!(handle.start().await.unwrap());
    assert!(!handle.start().await.unwrap());
    submit_lines(&handle, &LINES[..3]).await;
    assert_eq!(handle.buffer().await.unwrap().len(), 3);

    assert!(handle.stop().await.unwrap());
    assert!(!handle.is_running());
    assert!(handle.buffer().await.unwrap().is_empty());

    assert!(handle.toggle().await.unwrap());
    assert!(handle.is_running());
    assert!(handle.buffer().await.unwrap().is_empty());
    assert!(!handle.toggle().await.unwrap());
}

#[tokio::test]
async fn test_late_result_after_restart_keeps_new_window() {
    let (service, release) = GatedService::new(AnalysisVerdict::new("drama", 50.0, false));
    let (handle, _task, _clock) = spawn(service);
    let mut snapshot = handle.watch_atmosphere();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..5]).await;
    assert!(handle.analyze_now().await.unwrap());

    handle.stop().await.unwrap();
    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[5..7]).await;

    release.send(()).unwrap();
    tokio::time::timeout(WAIT, snapshot.changed())
        .await
        .expect("snapshot before timeout")
        .unwrap();

    assert_eq!(handle.atmosphere().mood, "drama");
    assert_eq!(handle.buffer().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_host_events_drive_engine() {
    let service = RecordingService::new(AnalysisVerdict::new("comedy", 30.0, false));
    let (handle, _task, _clock) = spawn(service.clone());

    handle.apply(HostEvent::Toggle).await.unwrap();
    assert!(handle.is_running());
    for line in &LINES[..5] {
        let json = serde_json::json!({ "type": "message", "content": line }).to_string();
        handle.apply(HostEvent::parse(&json).unwrap()).await.unwrap();
    }
    handle
        .apply(HostEvent::parse(r#"{"type":"message","content":"(ooc) brb"}"#).unwrap())
        .await
        .unwrap();
    assert_eq!(handle.buffer().await.unwrap().len(), 5);

    let mut changes = handle.on_atmosphere_change();
    handle.apply(HostEvent::Analyze).await.unwrap();
    tokio::time::timeout(WAIT, changes.recv())
        .await
        .expect("change before timeout")
        .unwrap();
    assert_eq!(service.calls().len(), 1);

    handle.apply(HostEvent::Stop).await.unwrap();
    assert!(!handle.is_running());
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_cycle() {
    let (service, release) = GatedService::new(AnalysisVerdict::new("awe", 75.0, true));
    let (handle, task, _clock) = spawn(service);
    let snapshot = handle.watch_atmosphere();

    handle.start().await.unwrap();
    submit_lines(&handle, &LINES[..5]).await;
    assert!(handle.analyze_now().await.unwrap());

    handle.shutdown().await.unwrap();
    drop(handle);
    release.send(()).unwrap();

    tokio::time::timeout(WAIT, task)
        .await
        .expect("engine exits before timeout")
        .unwrap();
    assert_eq!(snapshot.borrow().mood, "awe");
}

#[tokio::test]
async fn test_closed_engine_reports_error() {
    let service = RecordingService::new(AnalysisVerdict::new("calm", 5.0, false));
    let (handle, task, _clock) = spawn(service);
    let spare = handle.clone();

    handle.shutdown().await.unwrap();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

    assert!(matches!(spare.start().await, Err(Error::EngineClosed)));
    assert!(matches!(
        spare.submit(RawMessage::new(LINES[0])).await,
        Err(Error::EngineClosed)
    ));
}

#[test]
fn test_invalid_config_is_rejected() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();
    let config = EngineConfig::default().with_min_messages(0);
    let result = Engine::builder(config, Arc::new(FailingService)).spawn();
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
