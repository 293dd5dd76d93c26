//! Fixed-rate tick scheduling, independent of the host's frame rate.
//!
//! The host calls [`SimClock::update`] once per frame with the real time
//! that elapsed. The clock answers how many discrete steps are due. Steps
//! are taken from time accumulated by *earlier* frames; the current frame's
//! time is added afterwards. The backlog is clamped before stepping so a
//! stalled host (a suspended window, a debugger pause) cannot trigger an
//! unbounded burst of catch-up ticks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Default backlog clamp multiplier.
pub const DEFAULT_MAX_BACKLOG_FACTOR: f64 = 20.0;

/// Accumulator state for the simulation clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Seconds not yet consumed by a step.
    accumulated: f64,
    /// Ticks per second.
    speed: f64,
    running: bool,
    /// The backlog is clamped to `speed * max_backlog_factor`.
    max_backlog_factor: f64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            accumulated: 0.0,
            speed: 10.0,
            running: true,
            max_backlog_factor: DEFAULT_MAX_BACKLOG_FACTOR,
        }
    }
}

impl SimClock {
    /// A running clock at `speed` ticks per second.
    pub fn new(speed: f64) -> SimResult<Self> {
        let mut clock = Self::default();
        clock.set_speed(speed)?;
        Ok(clock)
    }

    pub fn with_max_backlog_factor(mut self, factor: f64) -> Self {
        self.max_backlog_factor = factor;
        self
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) -> SimResult<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SimError::InvalidSpeed { speed });
        }
        self.speed = speed;
        Ok(())
    }

    /// Seconds between two steps.
    pub fn step_interval(&self) -> f64 {
        1.0 / self.speed
    }

    /// Upper bound the backlog is clamped to before stepping.
    pub fn max_backlog(&self) -> f64 {
        self.speed * self.max_backlog_factor
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    /// Stop stepping. Time elapsed while paused is not accumulated.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Discard any backlog.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Advance by one host frame. Returns the number of steps due now.
    pub fn update(&mut self, elapsed: Duration) -> usize {
        if !self.running {
            return 0;
        }

        let step = self.step_interval();
        self.accumulated = self.accumulated.min(self.max_backlog());

        let mut steps = 0;
        while self.accumulated > step {
            self.accumulated -= step;
            steps += 1;
        }

        self.accumulated += elapsed.as_secs_f64();
        steps
    }
}
