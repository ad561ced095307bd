//! Motion-coordination core for an interactive two-axis positioning console.
//!
//! Lets an operator jog, move-to-absolute, and manage named target positions
//! for a pair of physical actuators while continuously displaying the live
//! position. The crate owns four pieces and wires them around one shared
//! resource, the currently addressed actuator pair:
//!
//! - [`store`] — named-position sets persisted as CSV files, switchable by
//!   file, with an active-set selection
//! - [`motion`] — the controller turning jog/absolute-move requests into
//!   actuator commands under a confirmation gate and a single-move invariant
//! - [`poll`] — timer-driven live-position sampling with a runtime-
//!   reconfigurable period
//! - [`keyboard`] — an out-of-band jog source marshalled into the main loop
//!   through a bounded channel
//!
//! [`console::Console`] composes them and runs the single-threaded main
//! loop. Everything the frontend provides — actuator drivers, the
//! confirmation dialog, the redraw surface — enters through the consumed
//! traits [`axis::AxisMotor`], [`motion::ConfirmationPrompt`], and
//! [`console::VisualizationSink`].
//!
//! # Concurrency
//!
//! Two domains only: the main loop thread owns all store/controller/poller
//! state, and the keyboard delivery thread hands jog commands across a
//! bounded channel. No other state crosses threads.

pub mod axis;
pub mod config;
pub mod console;
pub mod keyboard;
pub mod motion;
pub mod poll;
pub mod store;

pub use axis::{ActuatorBinding, AxisError, AxisMotor, AXIS_X, AXIS_Y};
pub use config::ConsoleConfig;
pub use console::{Console, UiRequest, VisualizationSink};
pub use keyboard::{JogCommand, KeySource, KeyboardJogListener};
pub use motion::{
    ConfirmationPrompt, ControllerState, Direction, MotionController, MotionError, MoveOrigin,
    MoveOutcome,
};
pub use poll::{LivePositionSample, PositionPoller};
pub use store::{NamedPosition, PositionSet, PositionStore, StoreError};
