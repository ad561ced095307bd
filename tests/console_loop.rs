//! End-to-end tests of the console interaction loop.
//!
//! Each test runs [`Console::run`] on the test thread while a driver thread
//! plays a frontend, feeding scripted `UiRequest`s (and injected key presses)
//! with short settles between them.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tempfile::TempDir;

use manipulator::{
    ActuatorBinding, AxisError, AxisMotor, ConfirmationPrompt, Console, ConsoleConfig, Direction,
    KeySource, KeyboardJogListener, LivePositionSample, NamedPosition, PositionSet, UiRequest,
    VisualizationSink,
};

const SETTLE: Duration = Duration::from_millis(20);
const KEY_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Rel(usize, f64),
    Abs(usize, f64),
}

/// Axis that records every commanded move into a shared log.
struct RecordingAxis {
    index: usize,
    position: f64,
    log: Arc<Mutex<Vec<Call>>>,
}

impl AxisMotor for RecordingAxis {
    fn current_position(&mut self) -> Result<f64, AxisError> {
        Ok(self.position)
    }

    fn move_relative(&mut self, delta: f64) -> Result<(), AxisError> {
        self.position += delta;
        self.log.lock().unwrap().push(Call::Rel(self.index, delta));
        Ok(())
    }

    fn move_absolute(&mut self, target: f64) -> Result<(), AxisError> {
        self.position = target;
        self.log.lock().unwrap().push(Call::Abs(self.index, target));
        Ok(())
    }
}

fn recording_binding(log: &Arc<Mutex<Vec<Call>>>) -> ActuatorBinding {
    ActuatorBinding::from_axes(vec![
        Box::new(RecordingAxis {
            index: 0,
            position: 0.0,
            log: log.clone(),
        }),
        Box::new(RecordingAxis {
            index: 1,
            position: 0.0,
            log: log.clone(),
        }),
    ])
}

struct InjectedKeys(Receiver<String>);

impl KeySource for InjectedKeys {
    fn poll_key(&mut self, timeout: Duration) -> Option<String> {
        self.0.recv_timeout(timeout).ok()
    }
}

#[derive(Default)]
struct SinkLog {
    samples: usize,
    sets: Vec<Vec<String>>,
    notes: Vec<String>,
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<SinkLog>>);

impl VisualizationSink for RecordingSink {
    fn position_sample(&mut self, _sample: LivePositionSample) {
        self.0.lock().unwrap().samples += 1;
    }

    fn position_set(&mut self, set: &PositionSet) {
        let names = set.iter().map(|p| p.name.clone()).collect();
        self.0.lock().unwrap().sets.push(names);
    }

    fn notify(&mut self, message: &str) {
        self.0.lock().unwrap().notes.push(message.to_string());
    }
}

struct ScriptedPrompt {
    accept: bool,
    messages: Arc<Mutex<Vec<String>>>,
}

impl ConfirmationPrompt for ScriptedPrompt {
    fn confirm(&mut self, _title: &str, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.accept
    }
}

struct Harness {
    console: Console,
    ui_tx: Sender<UiRequest>,
    ui_rx: Receiver<UiRequest>,
    key_tx: Sender<String>,
    _storage: TempDir,
}

fn harness(binding: ActuatorBinding) -> Harness {
    let storage = TempDir::new().unwrap();
    let mut config = ConsoleConfig::with_storage_root(storage.path());
    config.refresh_period_ms = 5;

    let (key_tx, key_rx) = unbounded();
    let keyboard = KeyboardJogListener::new(Box::new(InjectedKeys(key_rx)));
    let console = Console::new(config, binding, keyboard).unwrap();

    let (ui_tx, ui_rx) = unbounded();
    Harness {
        console,
        ui_tx,
        ui_rx,
        key_tx,
        _storage: storage,
    }
}

/// Sends each request with a settle in between, then shuts the loop down.
fn drive(ui: Sender<UiRequest>, requests: Vec<UiRequest>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for request in requests {
            thread::sleep(SETTLE);
            if ui.send(request).is_err() {
                return;
            }
        }
        thread::sleep(SETTLE);
        let _ = ui.send(UiRequest::Shutdown);
    })
}

#[test]
fn test_accepted_move_issues_x_then_y() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));

    let driver = drive(
        h.ui_tx.clone(),
        vec![
            UiRequest::SetJogStep(2.5),
            UiRequest::Jog(Direction::Right),
            UiRequest::MoveToPoint {
                x: 5.0,
                y: 7.0,
                label: "Home".to_string(),
            },
        ],
    );

    let messages = Arc::new(Mutex::new(Vec::new()));
    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: messages.clone(),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    let calls = log.lock().unwrap();
    assert_eq!(
        *calls,
        vec![Call::Rel(0, 2.5), Call::Abs(0, 5.0), Call::Abs(1, 7.0)]
    );

    let messages = messages.lock().unwrap();
    assert_eq!(
        *messages,
        vec!["Do you want to move to 'Home' position (5, 7)?".to_string()]
    );

    // The live poller ran alongside the scripted requests.
    assert!(sink.0.lock().unwrap().samples > 0);
}

#[test]
fn test_declined_move_touches_no_axis() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));

    let driver = drive(
        h.ui_tx.clone(),
        vec![UiRequest::MoveToPoint {
            x: 3.0,
            y: 4.0,
            label: "Target".to_string(),
        }],
    );

    let messages = Arc::new(Mutex::new(Vec::new()));
    let mut prompt = ScriptedPrompt {
        accept: false,
        messages: messages.clone(),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(messages.lock().unwrap().len(), 1);
}

#[test]
fn test_keyboard_jog_flows_through_listener() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));

    let ui = h.ui_tx.clone();
    let keys = h.key_tx.clone();
    let driver = thread::spawn(move || {
        ui.send(UiRequest::SetKeyboardEnabled(true)).unwrap();
        thread::sleep(SETTLE);
        keys.send("droite".to_string()).unwrap();
        keys.send("haut".to_string()).unwrap();
        thread::sleep(KEY_SETTLE);
        ui.send(UiRequest::SetKeyboardEnabled(false)).unwrap();
        ui.send(UiRequest::Shutdown).unwrap();
    });

    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: Arc::new(Mutex::new(Vec::new())),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    let calls = log.lock().unwrap();
    assert_eq!(*calls, vec![Call::Rel(0, 1.0), Call::Rel(1, 1.0)]);
}

#[test]
fn test_capture_current_persists_to_disk() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));
    let set_path = h._storage.path().join("default.txt");

    let driver = drive(
        h.ui_tx.clone(),
        vec![
            UiRequest::ManualEntry { x: 2.0, y: 3.0 },
            UiRequest::CaptureCurrent {
                name: "mark".to_string(),
            },
        ],
    );

    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: Arc::new(Mutex::new(Vec::new())),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    // Manual entry goes straight through, no prompt.
    let calls = log.lock().unwrap();
    assert_eq!(*calls, vec![Call::Abs(0, 2.0), Call::Abs(1, 3.0)]);

    let contents = std::fs::read_to_string(set_path).unwrap();
    assert!(contents.contains("mark,2,3"));

    // The redraw after capture carries the new row.
    let sink = sink.0.lock().unwrap();
    let last_set = sink.sets.last().unwrap();
    assert!(last_set.iter().any(|name| name == "mark"));
}

#[test]
fn test_failed_save_notifies_but_keeps_edit_visible() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));

    // Make the backing path unwritable before the mutation arrives.
    let set_path = h._storage.path().join("default.txt");
    std::fs::remove_file(&set_path).unwrap();
    std::fs::create_dir(&set_path).unwrap();

    let driver = drive(
        h.ui_tx.clone(),
        vec![UiRequest::Insert(NamedPosition::new("mark", 1.0, 2.0))],
    );

    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: Arc::new(Mutex::new(Vec::new())),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    let sink = sink.0.lock().unwrap();
    assert!(sink.notes.iter().any(|note| note.contains("save failed")));

    // The in-memory edit is still pushed for redraw.
    let last_set = sink.sets.last().unwrap();
    assert!(last_set.iter().any(|name| name == "mark"));
}

#[test]
fn test_unbound_jog_reports_instead_of_panicking() {
    let mut h = harness(ActuatorBinding::new());

    let driver = drive(h.ui_tx.clone(), vec![UiRequest::Jog(Direction::Up)]);

    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: Arc::new(Mutex::new(Vec::new())),
    };
    let mut sink = RecordingSink::default();
    h.console.run(h.ui_rx.clone(), &mut sink, &mut prompt);
    driver.join().unwrap();

    let sink = sink.0.lock().unwrap();
    assert!(sink
        .notes
        .iter()
        .any(|note| note.contains("no XY actuators bound")));
}

#[test]
fn test_refresh_period_reconfigures_live() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(recording_binding(&log));

    let ui = h.ui_tx.clone();
    let sink = RecordingSink::default();
    let counter = sink.0.clone();
    let driver = thread::spawn(move || {
        // Slow the poller right down, then confirm samples stall.
        ui.send(UiRequest::SetRefreshPeriod(Duration::from_secs(30)))
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        let stalled = counter.lock().unwrap().samples;
        thread::sleep(Duration::from_millis(100));
        assert_eq!(counter.lock().unwrap().samples, stalled);

        // Speed it back up and expect samples to resume.
        ui.send(UiRequest::SetRefreshPeriod(Duration::from_millis(2)))
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(counter.lock().unwrap().samples > stalled + 5);

        ui.send(UiRequest::Shutdown).unwrap();
    });

    let mut prompt = ScriptedPrompt {
        accept: true,
        messages: Arc::new(Mutex::new(Vec::new())),
    };
    let mut sink_ref = sink.clone();
    h.console.run(h.ui_rx.clone(), &mut sink_ref, &mut prompt);
    driver.join().unwrap();
}
