//! Motion controller: jog and absolute moves under a confirmation gate.
//!
//! The controller is the only component allowed to invoke actuator mutators.
//! It runs the state machine `Idle -> AwaitingConfirmation -> Moving -> Idle`
//! (jogs and manual entries skip the confirmation step) and enforces the
//! single-move invariant: a request arriving while the controller is not
//! idle is rejected with [`MotionError::Busy`], never queued.
//!
//! There is no persistent failure state; every failure path restores `Idle`
//! and reports the error to the caller.

use thiserror::Error;
use tracing::{debug, info};

use crate::axis::{ActuatorBinding, AxisError};

/// Title used for move confirmation prompts.
pub const CONFIRM_TITLE: &str = "Move confirmation";

/// A cardinal jog direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Where a move request originated, carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MoveOrigin {
    /// Saved-positions table (row double-click or jog buttons).
    Table,
    /// Position plot click.
    Plot,
    /// Live numeric entry field.
    ManualEntry,
    /// Global keyboard jog listener.
    Keyboard,
}

/// Controller lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingConfirmation,
    Moving,
}

/// Result of a confirmed absolute move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The operator accepted and the move was issued.
    Moved,
    /// The operator declined; no actuator call was made. Not an error.
    Declined,
}

/// Errors reported by the motion controller.
#[derive(Debug, Error)]
pub enum MotionError {
    /// Fewer than the required two axes are bound. No side effect occurred.
    #[error("no XY actuators bound (need 2, have {0})")]
    NoActuatorBound(usize),

    /// A request arrived while a move or confirmation was in flight.
    #[error("controller busy ({0:?})")]
    Busy(ControllerState),

    /// The axis driver failed the issued command.
    #[error(transparent)]
    Axis(#[from] AxisError),
}

/// Synchronous yes/no prompt shown to the operator before absolute moves.
///
/// Consumed interface; the frontend owns the actual dialog. The prompt is
/// modal with respect to the main loop: nothing else runs while it is open.
pub trait ConfirmationPrompt {
    fn confirm(&mut self, title: &str, message: &str) -> bool;
}

/// Validates and executes move requests against the actuator binding.
#[derive(Debug)]
pub struct MotionController {
    state: ControllerState,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    fn ensure_idle(&self) -> Result<(), MotionError> {
        if self.state != ControllerState::Idle {
            return Err(MotionError::Busy(self.state));
        }
        Ok(())
    }

    /// Jog one axis by a signed step in the given direction.
    ///
    /// `Right`/`Left` map to +X/-X, `Up`/`Down` to +Y/-Y. Exactly one
    /// relative move is issued; with fewer than two bound axes nothing is
    /// issued at all (no partial single-axis move).
    pub fn jog(
        &mut self,
        binding: &mut ActuatorBinding,
        direction: Direction,
        step: f64,
        origin: MoveOrigin,
    ) -> Result<(), MotionError> {
        self.ensure_idle()?;

        let bound = binding.axis_count();
        let Some((x_axis, y_axis)) = binding.xy_mut() else {
            return Err(MotionError::NoActuatorBound(bound));
        };
        let (axis, delta) = match direction {
            Direction::Right => (x_axis, step),
            Direction::Left => (x_axis, -step),
            Direction::Up => (y_axis, step),
            Direction::Down => (y_axis, -step),
        };

        debug!("jog {direction} by {step} [{origin}]");
        self.state = ControllerState::Moving;
        let result = axis.move_relative(delta);
        self.state = ControllerState::Idle;
        Ok(result?)
    }

    /// Move both axes to an absolute target after operator confirmation.
    ///
    /// A declined confirmation is a no-op ([`MoveOutcome::Declined`]), not an
    /// error. On acceptance the X axis is commanded first, then Y.
    pub fn move_absolute(
        &mut self,
        binding: &mut ActuatorBinding,
        prompt: &mut dyn ConfirmationPrompt,
        x: f64,
        y: f64,
        label: &str,
        origin: MoveOrigin,
    ) -> Result<MoveOutcome, MotionError> {
        self.ensure_idle()?;

        self.state = ControllerState::AwaitingConfirmation;
        let message = format!("Do you want to move to '{label}' position ({x}, {y})?");
        let accepted = prompt.confirm(CONFIRM_TITLE, &message);

        if !accepted {
            self.state = ControllerState::Idle;
            debug!("move to '{label}' declined [{origin}]");
            return Ok(MoveOutcome::Declined);
        }

        let result = self.issue_absolute(binding, x, y);
        self.state = ControllerState::Idle;
        result?;
        info!("moved to '{label}' ({x}, {y}) [{origin}]");
        Ok(MoveOutcome::Moved)
    }

    /// Move both axes to an absolute target without confirmation.
    ///
    /// Used when the operator already edited a live numeric field.
    pub fn manual_entry(
        &mut self,
        binding: &mut ActuatorBinding,
        x: f64,
        y: f64,
    ) -> Result<(), MotionError> {
        self.ensure_idle()?;

        let result = self.issue_absolute(binding, x, y);
        self.state = ControllerState::Idle;
        result?;
        info!("moved to ({x}, {y}) [{}]", MoveOrigin::ManualEntry);
        Ok(())
    }

    /// Issue the absolute move pair, X first then Y.
    fn issue_absolute(
        &mut self,
        binding: &mut ActuatorBinding,
        x: f64,
        y: f64,
    ) -> Result<(), MotionError> {
        let bound = binding.axis_count();
        let Some((x_axis, y_axis)) = binding.xy_mut() else {
            return Err(MotionError::NoActuatorBound(bound));
        };

        self.state = ControllerState::Moving;
        x_axis.move_absolute(x)?;
        y_axis.move_absolute(y)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: ControllerState) {
        self.state = state;
    }
}
