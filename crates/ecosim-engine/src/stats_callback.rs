//! Tick callback that logs population statistics.
//!
//! Every `interval` ticks the callback computes per-species counts and
//! mean trait values and emits them as one JSON log line, the same series
//! a plotting tool needs to chart population and trait drift over a run.

use ecosim_core::runner::TickCallback;
use ecosim_core::snapshot;
use ecosim_core::tick::{SimulationState, TickSummary};
use ecosim_types::PopulationStats;
use tracing::{debug, info, warn};

/// Callback that periodically logs [`PopulationStats`].
pub struct StatsCallback {
    interval: u64,
    births: u64,
    deaths: u64,
    last: Option<PopulationStats>,
}

impl StatsCallback {
    /// Log every `interval` ticks. An interval of 0 disables logging.
    pub const fn new(interval: u64) -> Self {
        Self {
            interval,
            births: 0,
            deaths: 0,
            last: None,
        }
    }

    /// The most recently logged statistics.
    pub const fn last(&self) -> Option<&PopulationStats> {
        self.last.as_ref()
    }

    /// Births seen since the run started.
    pub const fn births(&self) -> u64 {
        self.births
    }

    /// Deaths seen since the run started.
    pub const fn deaths(&self) -> u64 {
        self.deaths
    }
}

impl TickCallback for StatsCallback {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        self.births = self.births.saturating_add(u64::from(summary.births));
        let died = u64::try_from(summary.deaths.len()).unwrap_or(u64::MAX);
        self.deaths = self.deaths.saturating_add(died);

        if summary.tick.checked_rem(self.interval) != Some(0) {
            return;
        }

        let stats = snapshot::population_stats(state);
        match serde_json::to_string(&stats) {
            Ok(json) => info!(
                tick = summary.tick,
                prey = summary.prey_alive,
                predators = summary.predators_alive,
                births = self.births,
                deaths = self.deaths,
                stats = %json,
                "Population stats"
            ),
            Err(e) => warn!(tick = summary.tick, error = %e, "failed to serialize stats"),
        }
        debug!(tick = summary.tick, resource = state.grid.total(), "Resource total");
        self.last = Some(stats);
    }
}
