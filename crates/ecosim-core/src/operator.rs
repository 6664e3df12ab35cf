//! Run controls shared between the tick loop and whoever drives it.
//!
//! The driver (a keyboard handler, a signal handler, a test) holds an
//! `Arc<OperatorState>` and flips pause, stop, or the tick interval while
//! [`run_simulation`](crate::runner::run_simulation) reads them between
//! ticks. Flags are atomics so the loop never waits on a lock to check
//! them; only the end reason sits behind a mutex.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use ecosim_types::Species;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;
use crate::tick::SimulationState;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// The tick bound was reached.
    MaxTicksReached,
    /// The wall-clock bound was reached.
    MaxRealTimeReached,
    /// The driver asked the run to stop.
    OperatorStop,
    /// No agent of either species is left.
    Extinction,
}

/// Shared run control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Set while the loop must not tick.
    paused: AtomicBool,

    /// Wakes the loop when the run is resumed.
    resume_notify: Notify,

    /// Set once a stop has been requested.
    stop_requested: AtomicBool,

    /// Real-time delay between ticks in milliseconds.
    tick_interval_ms: AtomicU64,

    /// Wall-clock start of the run.
    started_at: DateTime<Utc>,

    /// Tick bound (0 = unlimited).
    max_ticks: u64,

    /// Wall-clock bound in seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Recorded once the loop exits.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Controls for a fresh run, unpaused.
    pub fn new(tick_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the run is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the run. The tick in progress finishes; no further tick starts.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the run and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Flip between paused and running. Returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        if self.is_paused() {
            self.resume();
            false
        } else {
            self.pause();
            true
        }
    }

    /// Block until the run is not paused. Returns immediately when running.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop after the current tick. Also wakes a paused
    /// loop so it can observe the request.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the run ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Why the run ended, once it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Current delay between ticks in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the delay between ticks. Returns the previous delay. A delay
    /// of 0 runs ticks back to back.
    pub fn set_tick_interval_ms(&self, ms: u64) -> u64 {
        self.tick_interval_ms.swap(ms, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Bounds
    // -----------------------------------------------------------------------

    /// Whether `current_tick` has reached a non-zero tick bound.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Whether a non-zero wall-clock bound has elapsed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Wall-clock start of the run.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the run started. A clock that went backwards
    /// reads as 0.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured tick bound.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Configured wall-clock bound.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// A serializable status report for the driver.
    pub async fn status(&self, state: &SimulationState) -> SimulationStatus {
        SimulationStatus {
            tick: state.clock.tick(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            max_real_time_seconds: self.max_real_time_seconds,
            prey_alive: state.count(Species::Prey),
            predators_alive: state.count(Species::Predator),
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable run status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Last completed tick.
    pub tick: u64,
    /// Whether the run is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Delay between ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// Wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Tick bound (0 = unlimited).
    pub max_ticks: u64,
    /// Wall-clock bound in seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Live prey.
    pub prey_alive: u32,
    /// Live predators.
    pub predators_alive: u32,
    /// Why the run ended, if it has.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 start timestamp.
    pub started_at: String,
}
