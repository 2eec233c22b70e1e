//! Simulation clock seam and a wall-clock implementation.
//!
//! The renderer never measures time itself. Once per frame it asks a
//! [`SimulationClock`] for the particle system's current timestamp and feeds
//! it to the shaders, so particles age in lockstep with the simulation that
//! spawned them.
//!
//! # Example
//!
//! ```ignore
//! use tinted_quads::time::{SimulationClock, Time};
//!
//! let mut time = Time::new();
//!
//! // In your game loop:
//! time.update();
//! renderer.prepare_frame(&mut ctx, &time)?;
//! ```

use std::time::{Duration, Instant};

/// Time source shared between the particle simulation and the renderer.
pub trait SimulationClock {
    /// Current simulation time in milliseconds.
    ///
    /// Expected to be monotonic; a jump backwards only makes the time
    /// uniform discontinuous.
    fn now(&self) -> u32;

    /// Whether the simulation is advancing.
    fn is_running(&self) -> bool {
        true
    }
}

/// Pausable wall clock.
///
/// Time only accumulates across [`Time::update`] calls made while running,
/// so a pause freezes the particle timestamp instead of skipping ahead on
/// resume.
#[derive(Debug)]
pub struct Time {
    last: Instant,
    elapsed: Duration,
    paused: bool,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
            paused: false,
        }
    }

    /// Advance the clock to now. Call once per frame.
    ///
    /// Returns the elapsed running time in seconds.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        if !self.paused {
            self.elapsed += now.duration_since(self.last);
        }
        self.last = now;
        self.elapsed.as_secs_f32()
    }

    /// Running time accumulated so far.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last = Instant::now();
            self.paused = false;
        }
    }

    /// Back to zero, keeping the paused flag.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.elapsed = Duration::ZERO;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationClock for Time {
    /// Wraps after about 49 days of running time.
    fn now(&self) -> u32 {
        self.elapsed.as_millis() as u32
    }

    fn is_running(&self) -> bool {
        !self.paused
    }
}

/// A clock that only moves when told to.
///
/// Handy for headless drivers and for stepping frames deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualClock {
    /// Current time in milliseconds.
    pub millis: u32,
    /// Reported by [`SimulationClock::is_running`].
    pub running: bool,
}

impl ManualClock {
    pub fn new(millis: u32) -> Self {
        Self {
            millis,
            running: true,
        }
    }

    /// Move the clock forward, wrapping on overflow.
    pub fn advance(&mut self, millis: u32) {
        self.millis = self.millis.wrapping_add(millis);
    }
}

impl SimulationClock for ManualClock {
    fn now(&self) -> u32 {
        self.millis
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
