//! Periodic live-position sampling.
//!
//! The poller owns a `crossbeam_channel::tick` receiver at the configured
//! period (default 100 ms). Reconfiguring the period replaces the ticker
//! wholesale, so there is never more than one live timer and no re-entrant
//! stacking. Sampling is best-effort periodic: an unavailable read means
//! "no sample this tick", never an error.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::axis::{ActuatorBinding, AXIS_X, AXIS_Y};

/// Default sampling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// One live position reading, stamped with a logical tick counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivePositionSample {
    pub x: f64,
    pub y: f64,
    pub tick: u64,
}

/// Timer-driven sampler of the live actuator position.
pub struct PositionPoller {
    period: Duration,
    ticker: Receiver<Instant>,
    tick_count: u64,
    last_y: f64,
}

impl PositionPoller {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: crossbeam_channel::tick(period),
            tick_count: 0,
            last_y: 0.0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Receiver that fires once per period.
    ///
    /// Callers should re-fetch this every loop iteration so that a period
    /// change takes effect immediately; holding a stale clone keeps the old
    /// cadence alive.
    pub fn ticker(&self) -> Receiver<Instant> {
        self.ticker.clone()
    }

    /// Replace the timer with one at the new period.
    ///
    /// The previous ticker is dropped, which cancels it: exactly one timer
    /// is ever live, with no overlapping ticks.
    pub fn set_period(&mut self, period: Duration) {
        info!("refresh period {:?} -> {:?}", self.period, period);
        self.period = period;
        self.ticker = crossbeam_channel::tick(period);
    }

    /// Read the live position, if the binding allows it.
    ///
    /// Requires a readable X axis; Y falls back to the last known value when
    /// axis 1 is unbound or unreadable. Returns `None` when no sample can be
    /// produced this tick.
    pub fn sample(&mut self, binding: &mut ActuatorBinding) -> Option<LivePositionSample> {
        self.tick_count += 1;

        let x = match binding.axis_mut(AXIS_X)?.current_position() {
            Ok(x) => x,
            Err(e) => {
                debug!("X axis read unavailable: {e}");
                return None;
            }
        };

        let y = match binding.axis_mut(AXIS_Y) {
            Some(axis) => match axis.current_position() {
                Ok(y) => {
                    self.last_y = y;
                    y
                }
                Err(e) => {
                    debug!("Y axis read unavailable: {e}");
                    self.last_y
                }
            },
            None => self.last_y,
        };

        Some(LivePositionSample {
            x,
            y,
            tick: self.tick_count,
        })
    }
}
