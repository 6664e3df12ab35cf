//! Seed population for a fresh run.
//!
//! Every seed agent gets a genome drawn from its species' configured
//! ranges, a position uniformly inside the field margins, and a random
//! orientation. All draws come from the simulation's own random source, so
//! the seed population is part of the reproducible history of a run.

use std::f64::consts::TAU;

use ecosim_agents::{Genome, random_coordinate};
use ecosim_core::config::PopulationConfig;
use ecosim_core::tick::SimulationState;
use ecosim_types::{AgentId, Species, Vec2};
use rand::Rng;
use tracing::info;

use crate::error::EngineError;

/// Ids of the seeded agents, per species.
#[derive(Debug, Default)]
pub struct SpawnResult {
    /// Seeded herbivores.
    pub prey: Vec<AgentId>,
    /// Seeded carnivores.
    pub predators: Vec<AgentId>,
}

impl SpawnResult {
    /// Total number of seeded agents.
    pub fn total(&self) -> usize {
        self.prey.len().saturating_add(self.predators.len())
    }
}

/// Spawn the configured number of prey, then predators.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if a genome cannot be drawn, or
/// [`EngineError::Setup`] if an agent cannot be placed. Seeding is
/// all-or-nothing from the caller's point of view: the run should not
/// start after an error.
pub fn spawn_seed_agents(
    state: &mut SimulationState,
    population: &PopulationConfig,
) -> Result<SpawnResult, EngineError> {
    let mut result = SpawnResult::default();
    for species in Species::ALL {
        let count = population.initial(species);
        let ids = spawn_species(state, species, count)?;
        info!(%species, count = ids.len(), "Seed agents spawned");
        match species {
            Species::Prey => result.prey = ids,
            Species::Predator => result.predators = ids,
        }
    }
    Ok(result)
}

fn spawn_species(
    state: &mut SimulationState,
    species: Species,
    count: u32,
) -> Result<Vec<AgentId>, EngineError> {
    let mut ids = Vec::new();
    for _ in 0..count {
        let genome = Genome::random(&state.behavior.species(species).genome, &mut state.rng)
            .map_err(|e| EngineError::Spawner {
                message: format!("cannot draw {species} genome: {e}"),
            })?;
        let margin = state.behavior.boundary_margin;
        let x = random_coordinate(state.behavior.field_width, margin, &mut state.rng);
        let y = random_coordinate(state.behavior.field_height, margin, &mut state.rng);
        let orientation = -state.rng.random_range(0.0..TAU);
        ids.push(state.spawn_agent(species, genome, Vec2::new(x, y), orientation)?);
    }
    Ok(ids)
}
