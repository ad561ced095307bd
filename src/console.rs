//! Top-level console coordinator.
//!
//! [`Console`] composes the store, controller, poller, and keyboard listener
//! as named fields wired by constructor injection, and runs the
//! single-threaded main loop: a `select!` over the poll ticker, the keyboard
//! jog channel, and the frontend's [`UiRequest`] channel. All controller and
//! store state is confined to this thread; the keyboard channel is the only
//! cross-thread boundary.
//!
//! Every recovered error is surfaced to the operator through
//! [`VisualizationSink::notify`]; nothing here is fatal.

use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::axis::ActuatorBinding;
use crate::config::ConsoleConfig;
use crate::keyboard::KeyboardJogListener;
use crate::motion::{
    ConfirmationPrompt, Direction, MotionController, MotionError, MoveOrigin, MoveOutcome,
};
use crate::poll::{LivePositionSample, PositionPoller};
use crate::store::{NamedPosition, PositionSet, PositionStore, StoreError};

/// Sink for everything the frontend redraws (consumed interface).
pub trait VisualizationSink {
    /// A fresh live-position sample.
    fn position_sample(&mut self, sample: LivePositionSample);

    /// The active set changed (mutation or set switch); full redraw.
    fn position_set(&mut self, set: &PositionSet);

    /// A recovered error or status message for the operator.
    fn notify(&mut self, message: &str);
}

/// Requests raised by the frontend (table, buttons, plot, entry fields).
#[derive(Debug, Clone, PartialEq)]
pub enum UiRequest {
    /// Jog button pressed.
    Jog(Direction),
    /// Table row double-clicked: move to that row's position.
    MoveToRow(usize),
    /// Move to a named position in the active set (first match).
    MoveToName(String),
    /// Plot click resolved to coordinates.
    MoveToPoint { x: f64, y: f64, label: String },
    /// Live numeric entry edited; move without confirmation.
    ManualEntry { x: f64, y: f64 },
    /// Append a position to the active set and persist.
    Insert(NamedPosition),
    /// Replace a row of the active set and persist.
    Update { row: usize, position: NamedPosition },
    /// Remove a row of the active set and persist.
    Remove(usize),
    /// Store the current live position under a new name and persist.
    CaptureCurrent { name: String },
    /// Switch the active set, reloading from disk.
    SelectSet(String),
    /// Reconfigure the live-position refresh period.
    SetRefreshPeriod(Duration),
    /// Change the jog step size.
    SetJogStep(f64),
    /// Toggle the global keyboard jog listener.
    SetKeyboardEnabled(bool),
    /// Leave the main loop.
    Shutdown,
}

/// The motion-coordination core, wired together.
pub struct Console {
    config: ConsoleConfig,
    store: PositionStore,
    binding: ActuatorBinding,
    controller: MotionController,
    poller: PositionPoller,
    keyboard: KeyboardJogListener,
    jog_step: f64,
}

impl Console {
    /// Build the console from its collaborators.
    ///
    /// Opens (and seeds, if needed) the position store under the configured
    /// storage root.
    pub fn new(
        config: ConsoleConfig,
        binding: ActuatorBinding,
        keyboard: KeyboardJogListener,
    ) -> Result<Self, StoreError> {
        let store = PositionStore::open(&config.storage_root)?;
        let poller = PositionPoller::new(config.refresh_period());
        let jog_step = config.jog_step;
        Ok(Self {
            config,
            store,
            binding,
            controller: MotionController::new(),
            poller,
            keyboard,
            jog_step,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn jog_step(&self) -> f64 {
        self.jog_step
    }

    /// Run the main interaction loop until `Shutdown` or the frontend hangs
    /// up. Confirmation prompts are modal: no ticks or jogs are serviced
    /// while one is open.
    pub fn run(
        &mut self,
        ui: Receiver<UiRequest>,
        viz: &mut dyn VisualizationSink,
        prompt: &mut dyn ConfirmationPrompt,
    ) {
        info!("console loop starting");
        viz.position_set(self.store.active());
        let jogs = self.keyboard.commands();

        loop {
            // Re-fetched every iteration so period changes take effect.
            let ticker = self.poller.ticker();

            crossbeam_channel::select! {
                recv(ticker) -> _ => {
                    if let Some(sample) = self.poller.sample(&mut self.binding) {
                        viz.position_sample(sample);
                    }
                }
                recv(jogs) -> command => {
                    if let Ok(command) = command {
                        self.jog(command.direction, MoveOrigin::Keyboard, viz);
                    }
                }
                recv(ui) -> request => {
                    match request {
                        Ok(UiRequest::Shutdown) | Err(_) => break,
                        Ok(request) => self.handle(request, viz, prompt),
                    }
                }
            }
        }

        self.keyboard.disable();
        info!("console loop stopped");
    }

    fn handle(
        &mut self,
        request: UiRequest,
        viz: &mut dyn VisualizationSink,
        prompt: &mut dyn ConfirmationPrompt,
    ) {
        match request {
            UiRequest::Jog(direction) => self.jog(direction, MoveOrigin::Table, viz),
            UiRequest::MoveToRow(row) => {
                let Some(position) = self.store.active().get(row).cloned() else {
                    viz.notify(&format!("row {row} out of range"));
                    return;
                };
                self.move_to(position, MoveOrigin::Table, viz, prompt);
            }
            UiRequest::MoveToName(name) => {
                let Some(position) = self.store.active().resolve(&name).cloned() else {
                    viz.notify(&format!("position '{name}' not found in active set"));
                    return;
                };
                self.move_to(position, MoveOrigin::Table, viz, prompt);
            }
            UiRequest::MoveToPoint { x, y, label } => {
                self.move_to(NamedPosition::new(label, x, y), MoveOrigin::Plot, viz, prompt);
            }
            UiRequest::ManualEntry { x, y } => {
                if let Err(e) = self.controller.manual_entry(&mut self.binding, x, y) {
                    viz.notify(&e.to_string());
                }
            }
            UiRequest::Insert(position) => {
                match self.store.insert(position) {
                    Ok(()) => self.persist_and_redraw(viz),
                    Err(e) => viz.notify(&e.to_string()),
                }
            }
            UiRequest::Update { row, position } => {
                match self.store.update(row, position) {
                    Ok(()) => self.persist_and_redraw(viz),
                    Err(e) => viz.notify(&e.to_string()),
                }
            }
            UiRequest::Remove(row) => {
                match self.store.remove(row) {
                    Ok(removed) => {
                        debug!("removed position '{}'", removed.name);
                        self.persist_and_redraw(viz);
                    }
                    Err(e) => viz.notify(&e.to_string()),
                }
            }
            UiRequest::CaptureCurrent { name } => self.capture_current(name, viz),
            UiRequest::SelectSet(name) => {
                match self.store.load_set(&name) {
                    Ok(()) => viz.position_set(self.store.active()),
                    Err(e) => viz.notify(&e.to_string()),
                }
            }
            UiRequest::SetRefreshPeriod(period) => {
                if period.is_zero() {
                    viz.notify("refresh period must be positive");
                    return;
                }
                self.poller.set_period(period);
            }
            UiRequest::SetJogStep(step) => {
                if !step.is_finite() {
                    viz.notify("jog step must be a finite number");
                    return;
                }
                self.jog_step = step;
            }
            UiRequest::SetKeyboardEnabled(enabled) => {
                if enabled {
                    self.keyboard.enable();
                } else {
                    self.keyboard.disable();
                }
            }
            UiRequest::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    fn jog(&mut self, direction: Direction, origin: MoveOrigin, viz: &mut dyn VisualizationSink) {
        if let Err(e) = self
            .controller
            .jog(&mut self.binding, direction, self.jog_step, origin)
        {
            viz.notify(&e.to_string());
        }
    }

    fn move_to(
        &mut self,
        position: NamedPosition,
        origin: MoveOrigin,
        viz: &mut dyn VisualizationSink,
        prompt: &mut dyn ConfirmationPrompt,
    ) {
        match self.controller.move_absolute(
            &mut self.binding,
            prompt,
            position.x,
            position.y,
            &position.name,
            origin,
        ) {
            Ok(MoveOutcome::Moved) => {}
            Ok(MoveOutcome::Declined) => debug!("move to '{}' declined", position.name),
            Err(e) => viz.notify(&e.to_string()),
        }
    }

    /// Read the live XY position for capture workflows.
    fn read_current(&mut self) -> Result<(f64, f64), MotionError> {
        let bound = self.binding.axis_count();
        let Some((x_axis, y_axis)) = self.binding.xy_mut() else {
            return Err(MotionError::NoActuatorBound(bound));
        };
        let x = x_axis.current_position()?;
        let y = y_axis.current_position()?;
        Ok((x, y))
    }

    fn capture_current(&mut self, name: String, viz: &mut dyn VisualizationSink) {
        let (x, y) = match self.read_current() {
            Ok(position) => position,
            Err(e) => {
                viz.notify(&e.to_string());
                return;
            }
        };
        match self.store.insert(NamedPosition::new(name, x, y)) {
            Ok(()) => self.persist_and_redraw(viz),
            Err(e) => viz.notify(&e.to_string()),
        }
    }

    /// Persist the active set and push the full set for redraw.
    ///
    /// A failed save keeps the in-memory edit visible so the operator can
    /// retry; the set is pushed either way.
    fn persist_and_redraw(&mut self, viz: &mut dyn VisualizationSink) {
        if let Err(e) = self.store.save_active() {
            warn!("save failed: {e}");
            viz.notify(&format!("save failed: {e}"));
        }
        viz.position_set(self.store.active());
    }
}
