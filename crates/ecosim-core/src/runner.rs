//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives [`run_tick`] until one of these holds:
//!
//! - the tick bound or the wall-clock bound is reached,
//! - the driver requests a stop,
//! - no agent is left alive.
//!
//! Between ticks it honours pause and sleeps for the current tick interval.
//! The tick itself is synchronous; the loop only yields at its edges.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;

use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Outcome of a finished run.
#[derive(Debug)]
pub struct SimulationResult {
    /// Why the run ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Number of ticks executed by this call.
    pub total_ticks: u64,
}

/// Hook invoked after every completed tick.
///
/// The engine uses it to log statistics; a renderer would use it to grab a
/// snapshot.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run ticks of `dt` simulated time until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails. The state is left as it was
/// after the last successful tick.
pub async fn run_simulation(
    state: &mut SimulationState,
    dt: f64,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        run_id = %state.run_id,
        dt,
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Simulation starting"
    );

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!(tick = state.clock.tick(), "Simulation paused");
            operator.wait_if_paused().await;
            info!(tick = state.clock.tick(), "Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!(tick = state.clock.tick(), "Operator stop requested");
            return Ok(finish(operator, SimulationEndReason::OperatorStop, last_summary, total_ticks).await);
        }

        // --- Check time limit (before tick) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            return Ok(finish(
                operator,
                SimulationEndReason::MaxRealTimeReached,
                last_summary,
                total_ticks,
            )
            .await);
        }

        // --- Execute tick ---
        let summary = tick::run_tick(state, dt)?;
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        // --- Check extinction ---
        if summary.agents_alive() == 0 {
            info!(tick = summary.tick, "No agents left, extinction");
            return Ok(finish(operator, SimulationEndReason::Extinction, Some(summary), total_ticks).await);
        }

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            return Ok(finish(
                operator,
                SimulationEndReason::MaxTicksReached,
                Some(summary),
                total_ticks,
            )
            .await);
        }

        last_summary = Some(summary);

        // --- Sleep for tick interval ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

async fn finish(
    operator: &OperatorState,
    end_reason: SimulationEndReason,
    final_summary: Option<TickSummary>,
    total_ticks: u64,
) -> SimulationResult {
    operator.set_end_reason(end_reason).await;
    SimulationResult {
        end_reason,
        final_summary,
        total_ticks,
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            prey = summary.prey_alive,
            predators = summary.predators_alive,
            elapsed = summary.elapsed,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::f64::consts::TAU;
    use std::sync::Arc;

    use ecosim_agents::{BehaviorConfig, Genome};
    use ecosim_types::{Species, Trait, Vec2};
    use ecosim_world::{EnvironmentGrid, GridParams};

    use super::*;
    use crate::config::SimulationBoundsConfig;

    const DT: f64 = 0.025;

    fn genome(max_energy: f64) -> Genome {
        let values = BTreeMap::from([
            (Trait::Speed, 50.0),
            (Trait::TurnSpeed, 1.0),
            (Trait::FieldOfView, TAU),
            (Trait::ViewDistance, 100.0),
            (Trait::MaxEnergy, max_energy),
            (Trait::MetabolismRate, 0.1),
            (Trait::FindMateRate, 1.0),
            (Trait::MaxDesireToMate, 50.0),
            (Trait::Sex, 0.0),
            (Trait::Red, 0.0),
            (Trait::Green, 0.0),
            (Trait::Blue, 0.0),
        ]);
        Genome::homozygous(&values).unwrap()
    }

    fn make_simulation_state(max_energy: f64) -> SimulationState {
        let grid = EnvironmentGrid::new(&GridParams::default()).unwrap();
        let mut state = SimulationState::new(grid, BehaviorConfig::default(), 42, 0).unwrap();
        state
            .spawn_agent(Species::Prey, genome(max_energy), Vec2::new(300.0, 300.0), 0.0)
            .unwrap();
        state
    }

    fn bounds(max_ticks: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds: 0,
        }
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let mut state = make_simulation_state(200.0);
        let operator = Arc::new(OperatorState::new(0, &bounds(5)));
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut state, DT, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(operator.end_reason().await, Some(SimulationEndReason::MaxTicksReached));
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut state = make_simulation_state(200.0);
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        operator.request_stop();
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut state, DT, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn extinction_stops_simulation() {
        // 0.25 energy at 0.1 per tick starves on the third tick.
        let mut state = make_simulation_state(0.25);
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut state, DT, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::Extinction);
        assert_eq!(result.total_ticks, 3);
        let summary = result.final_summary.unwrap();
        assert_eq!(summary.agents_alive(), 0);
    }

    #[tokio::test]
    async fn invalid_dt_is_an_error() {
        let mut state = make_simulation_state(200.0);
        let operator = Arc::new(OperatorState::new(0, &bounds(5)));
        let mut cb = NoOpCallback;

        let result = run_simulation(&mut state, f64::NAN, &operator, &mut cb).await;
        assert!(matches!(result, Err(RunnerError::Tick { .. })));
        assert_eq!(state.clock.tick(), 0);
    }

    #[tokio::test]
    async fn tick_callback_is_called() {
        struct CountCallback {
            count: u64,
            last_prey: u32,
        }

        impl TickCallback for CountCallback {
            fn on_tick(&mut self, summary: &TickSummary, _state: &SimulationState) {
                self.count = self.count.saturating_add(1);
                self.last_prey = summary.prey_alive;
            }
        }

        let mut state = make_simulation_state(200.0);
        let operator = Arc::new(OperatorState::new(0, &bounds(3)));
        let mut cb = CountCallback {
            count: 0,
            last_prey: 0,
        };

        let _result = run_simulation(&mut state, DT, &operator, &mut cb)
            .await
            .unwrap();

        assert_eq!(cb.count, 3);
        assert_eq!(cb.last_prey, 1);
    }
}
