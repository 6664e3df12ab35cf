//! Engine binary for the Ecosim predator/prey simulation.
//!
//! Loads configuration, seeds the world, and runs the tick loop until a
//! bound is reached, the population dies out, or the process receives
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ecosim-config.yaml` (or `ECOSIM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the resource grid, spatial index, and random source
//! 4. Spawn the seed population
//! 5. Create operator state from the simulation bounds
//! 6. Run the simulation loop
//! 7. Log the result

mod error;
mod spawner;
mod stats_callback;

use std::path::PathBuf;
use std::sync::Arc;

use ecosim_core::config::SimulationConfig;
use ecosim_core::operator::OperatorState;
use ecosim_core::runner;
use ecosim_core::tick::SimulationState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::stats_callback::StatsCallback;

/// Environment variable naming an alternative config file.
const CONFIG_PATH_ENV: &str = "ECOSIM_CONFIG";

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "ecosim-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config);
    info!("ecosim-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        dt = config.world.dt,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the world.
    let mut state = SimulationState::from_config(&config).map_err(EngineError::from)?;
    info!(
        run_id = %state.run_id,
        columns = state.grid.dims().columns(),
        rows = state.grid.dims().rows(),
        max_population = state.max_population,
        "World created"
    );

    // 4. Spawn seed agents.
    let spawned = spawner::spawn_seed_agents(&mut state, &config.population)?;
    info!(agents_spawned = spawned.total(), "Seed population ready");

    // 5. Create operator state and hook Ctrl-C to a clean stop.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Operator state initialized"
    );
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current tick");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run the simulation.
    let mut callback = StatsCallback::new(config.logging.stats_interval_ticks);
    let result = runner::run_simulation(&mut state, config.world.dt, &operator, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Log results.
    runner::log_simulation_end(&result);
    if let Some(stats) = callback.last() {
        info!(
            tick = stats.tick,
            prey = stats.prey.count,
            predators = stats.predators.count,
            "Last logged population"
        );
    }
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        births = callback.births(),
        deaths = callback.deaths(),
        "ecosim-engine shutdown complete"
    );

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load and validate the configuration. Returns whether a file was found.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = if path.exists() {
        (SimulationConfig::from_file(&path)?, true)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        (config, false)
    };
    config.validate()?;
    Ok((config, found))
}
