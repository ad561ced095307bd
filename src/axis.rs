//! Actuator capability interface consumed by the motion core.
//!
//! The console never talks to motor hardware directly. Drivers implement
//! [`AxisMotor`] for one physical degree of freedom, and the dashboard (or a
//! test harness) assigns zero, one, or two of them to the
//! [`ActuatorBinding`]. Index 0 is the X axis, index 1 is the Y axis.
//!
//! Fewer than two bound axes is a normal, recoverable condition: callers
//! resolve the binding on every request and report
//! [`NoActuatorBound`](crate::motion::MotionError::NoActuatorBound) rather
//! than panicking.

use thiserror::Error;

/// Index of the X axis within a binding.
pub const AXIS_X: usize = 0;
/// Index of the Y axis within a binding.
pub const AXIS_Y: usize = 1;

/// Number of axes required for full XY operation.
pub const REQUIRED_AXES: usize = 2;

/// Error reported by an axis driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AxisError {
    /// The underlying driver rejected or failed the operation.
    #[error("axis driver fault: {0}")]
    Driver(String),
}

/// Interface for one independent degree of physical motion.
///
/// Abstracts the actuator hardware for testability; all calls are
/// synchronous and blocking from the caller's perspective. Timeouts and
/// cancellation are the driver's responsibility.
pub trait AxisMotor: Send {
    /// Read the current position in driver units.
    fn current_position(&mut self) -> Result<f64, AxisError>;

    /// Move by a signed relative distance.
    fn move_relative(&mut self, delta: f64) -> Result<(), AxisError>;

    /// Move to an absolute target position.
    fn move_absolute(&mut self, target: f64) -> Result<(), AxisError>;
}

/// The currently addressed pair of actuators.
///
/// Holds whatever axes have been assigned externally, in order. The binding
/// may legitimately be empty or hold a single axis; consumers must degrade
/// gracefully in that case.
#[derive(Default)]
pub struct ActuatorBinding {
    axes: Vec<Box<dyn AxisMotor>>,
}

impl ActuatorBinding {
    /// Create a binding with no axes assigned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a binding from an ordered list of axes (X first, then Y).
    pub fn from_axes(axes: Vec<Box<dyn AxisMotor>>) -> Self {
        Self { axes }
    }

    /// Replace the assigned axes.
    pub fn assign(&mut self, axes: Vec<Box<dyn AxisMotor>>) {
        self.axes = axes;
    }

    /// Remove all assigned axes.
    pub fn clear(&mut self) {
        self.axes.clear();
    }

    /// Number of currently bound axes.
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// True when both the X and Y axes are bound.
    pub fn is_fully_bound(&self) -> bool {
        self.axes.len() >= REQUIRED_AXES
    }

    /// Resolve a single axis by index, if bound.
    pub fn axis_mut(&mut self, index: usize) -> Option<&mut (dyn AxisMotor + '_)> {
        self.axes
            .get_mut(index)
            .map(|axis| &mut **axis as &mut dyn AxisMotor)
    }

    /// Resolve the XY pair, if both axes are bound.
    pub fn xy_mut(&mut self) -> Option<(&mut dyn AxisMotor, &mut dyn AxisMotor)> {
        if self.axes.len() < REQUIRED_AXES {
            return None;
        }
        let (head, tail) = self.axes.split_at_mut(1);
        Some((head[0].as_mut(), tail[0].as_mut()))
    }
}

impl std::fmt::Debug for ActuatorBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorBinding")
            .field("axis_count", &self.axes.len())
            .finish()
    }
}
