//! Simulation clock, population arena, tick cycle, and orchestration for
//! the Ecosim predator/prey simulation.
//!
//! This crate owns the loop that advances the world: regrow the resource
//! grid, let every agent sense, decide, act, move and age, then purge the
//! dead. It also owns configuration loading and the run controls a driver
//! uses to pause, resume and stop.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and elapsed simulated time.
//! - [`config`] -- Configuration loading from `ecosim-config.yaml` into
//!   strongly-typed structs.
//! - [`population`] -- Dense agent arena with stable handles.
//! - [`tick`] -- [`SimulationState`] and the single-tick [`run_tick`].
//! - [`snapshot`] -- Statistics, render snapshots, and inspection.
//! - [`operator`] -- Shared pause/stop/speed controls.
//! - [`runner`] -- The async loop around [`run_tick`].
//!
//! [`SimulationState`]: tick::SimulationState
//! [`run_tick`]: tick::run_tick

pub mod clock;
pub mod config;
pub mod operator;
pub mod population;
pub mod runner;
pub mod snapshot;
pub mod tick;

pub use clock::{ClockError, WorldClock};
pub use config::{ConfigError, SimulationConfig};
pub use operator::{OperatorState, SimulationEndReason, SimulationStatus};
pub use population::{Population, PopulationError};
pub use runner::{NoOpCallback, RunnerError, SimulationResult, TickCallback, run_simulation};
pub use tick::{DeathRecord, SimulationState, TickError, TickSummary, run_tick};
