//! Simulation clock for the Ecosim world.
//!
//! The clock tracks two things: the tick counter, which orders every event
//! in a run, and the simulated time elapsed so far, which is the sum of the
//! `dt` values the driver has supplied. The driver owns the time step; the
//! clock only validates and accumulates it.
//!
//! All updates are checked before anything is written, so a rejected
//! advance leaves the clock untouched.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// The supplied time step is negative, NaN, or infinite.
    #[error("invalid time step: {dt}")]
    InvalidDelta {
        /// The rejected time step.
        dt: f64,
    },

    /// Invalid clock state (e.g. negative elapsed time).
    #[error("invalid clock state: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the state.
        reason: String,
    },
}

/// Clock tracking the tick counter and elapsed simulated time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldClock {
    /// Current tick number (0 before the first tick).
    tick: u64,

    /// Simulated time elapsed since the start of the run.
    elapsed: f64,
}

impl WorldClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Create a clock from explicit parameters (useful for testing and
    /// state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `elapsed` is negative or
    /// not finite.
    pub fn from_parts(tick: u64, elapsed: f64) -> Result<Self, ClockError> {
        if !(elapsed.is_finite() && elapsed >= 0.0) {
            return Err(ClockError::InvalidConfig {
                reason: format!("elapsed time must be finite and non-negative, got {elapsed}"),
            });
        }
        Ok(Self { tick, elapsed })
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time elapsed so far.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance by one tick of `dt` simulated time and return the new tick
    /// number.
    ///
    /// A zero `dt` is accepted and advances only the tick counter.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDelta`] for a negative or non-finite
    /// `dt`, or [`ClockError::TickOverflow`] at `u64::MAX`.
    pub fn advance(&mut self, dt: f64) -> Result<u64, ClockError> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(ClockError::InvalidDelta { dt });
        }
        let next = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.tick = next;
        self.elapsed += dt;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = WorldClock::new();
        assert_eq!(clock.tick(), 0);
        assert!(clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn advance_accumulates_time() {
        let mut clock = WorldClock::new();
        assert_eq!(clock.advance(0.025).ok(), Some(1));
        assert_eq!(clock.advance(0.025).ok(), Some(2));
        assert_eq!(clock.tick(), 2);
        assert!((clock.elapsed() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn zero_dt_still_ticks() {
        let mut clock = WorldClock::new();
        assert_eq!(clock.advance(0.0).ok(), Some(1));
        assert!(clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_dt_without_changing_state() {
        let mut clock = WorldClock::new();
        for dt in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                clock.advance(dt),
                Err(ClockError::InvalidDelta { .. })
            ));
        }
        assert_eq!(clock, WorldClock::new());
    }

    #[test]
    fn overflow_is_detected() {
        let mut clock = WorldClock::from_parts(u64::MAX, 0.0).unwrap_or_default();
        assert!(matches!(clock.advance(0.1), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }

    #[test]
    fn from_parts_rejects_negative_elapsed() {
        assert!(WorldClock::from_parts(3, -1.0).is_err());
        assert!(WorldClock::from_parts(3, 1.5).is_ok());
    }
}
