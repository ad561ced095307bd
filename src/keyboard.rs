//! Out-of-band keyboard jog listener.
//!
//! Wraps a global key-press source (a [`KeySource`], assigned externally)
//! and turns recognized direction keys into [`JogCommand`]s on a bounded
//! channel. The delivery thread never touches the motion controller or the
//! actuator binding; the main loop dequeues commands and applies the jog
//! step in force at that moment.
//!
//! `enable`/`disable` are idempotent. Disabling joins the delivery thread
//! before returning, so no command can arrive after `disable` completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::motion::Direction;

/// Capacity of the listener -> main-loop handoff channel.
///
/// Keyboard repeat can outrun the main loop while a confirmation dialog is
/// open; excess jogs are dropped rather than queued without bound.
const JOG_QUEUE_CAPACITY: usize = 8;

/// How long the delivery thread waits on the source before rechecking the
/// stop flag. Bounds disable latency.
const SOURCE_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// A jog request raised by the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JogCommand {
    pub direction: Direction,
}

/// Source of global key-press events (consumed interface).
///
/// Implementations wrap whatever application-independent hook the platform
/// provides and report pressed keys by name.
pub trait KeySource: Send + 'static {
    /// Wait up to `timeout` for the next key press; `None` on timeout.
    fn poll_key(&mut self, timeout: Duration) -> Option<String>;
}

/// Normalize a reported key name to a canonical jog direction.
///
/// Accepts the canonical English names and the locale aliases seen in the
/// field (French arrow-key names). Unrecognized keys map to `None`.
pub fn normalize_key(name: &str) -> Option<Direction> {
    match name.trim().to_lowercase().as_str() {
        "right" | "droite" => Some(Direction::Right),
        "left" | "gauche" => Some(Direction::Left),
        "up" | "haut" => Some(Direction::Up),
        "down" | "bas" => Some(Direction::Down),
        _ => None,
    }
}

/// Toggleable listener bridging the key source into the main loop.
pub struct KeyboardJogListener {
    tx: Sender<JogCommand>,
    rx: Receiver<JogCommand>,
    source: Option<Box<dyn KeySource>>,
    worker: Option<(Arc<AtomicBool>, JoinHandle<Box<dyn KeySource>>)>,
}

impl KeyboardJogListener {
    pub fn new(source: Box<dyn KeySource>) -> Self {
        let (tx, rx) = bounded(JOG_QUEUE_CAPACITY);
        Self {
            tx,
            rx,
            source: Some(source),
            worker: None,
        }
    }

    /// Receiving end of the jog channel, for the main loop's select.
    pub fn commands(&self) -> Receiver<JogCommand> {
        self.rx.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.worker.is_some()
    }

    /// Start delivering jog commands. No-op when already enabled.
    pub fn enable(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let Some(mut source) = self.source.take() else {
            warn!("key source unavailable (lost to a worker panic); cannot enable");
            return;
        };

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let tx = self.tx.clone();

        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let Some(name) = source.poll_key(SOURCE_POLL_TIMEOUT) else {
                    continue;
                };
                let Some(direction) = normalize_key(&name) else {
                    continue;
                };
                if tx.try_send(JogCommand { direction }).is_err() {
                    debug!("jog queue full, dropping {direction}");
                }
            }
            source
        });

        self.worker = Some((stop, handle));
        info!("keyboard jog listener enabled");
    }

    /// Stop delivering jog commands, joining the delivery thread.
    ///
    /// After this returns no further command is enqueued. No-op when
    /// already disabled.
    pub fn disable(&mut self) {
        let Some((stop, handle)) = self.worker.take() else {
            return;
        };
        stop.store(true, Ordering::Relaxed);
        match handle.join() {
            Ok(source) => self.source = Some(source),
            Err(_) => warn!("keyboard listener thread panicked; source lost"),
        }
        info!("keyboard jog listener disabled");
    }
}

impl Drop for KeyboardJogListener {
    fn drop(&mut self) {
        self.disable();
    }
}
