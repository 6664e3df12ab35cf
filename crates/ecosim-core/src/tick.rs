//! Tick cycle: the loop body that advances the Ecosim world by one step.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Clock** -- validate `dt` and advance the tick counter. A bad `dt`
//!    is rejected here, before anything else changes.
//! 2. **Regrowth** -- advance the resource grid by `dt`.
//! 3. **Agents** -- for every live agent in creation order: gather the
//!    neighbours it can sense, run the state transition, run the action
//!    (which may kill prey or produce offspring), move it and refile it in
//!    the spatial index, then age it.
//! 4. **Purge** -- drop dead agents from the arena and the index.
//!
//! Offspring join the arena and the index the moment they are born but
//! only act from the next tick on. The tick cycle is deterministic given
//! the same initial state and seed.

use ecosim_agents::{
    ActContext, ActOutcome, Agent, AgentSpawn, BehaviorConfig, Genome, MateRequest, NeighborView,
};
use ecosim_types::{AgentId, DeathCause, RunId, Species, Vec2};
use ecosim_world::{EnvironmentGrid, SpatialIndex};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::WorldClock;
use crate::config::{ConfigError, SimulationConfig};
use crate::population::{Population, PopulationError};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed (including a rejected time step).
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: crate::clock::ClockError,
    },

    /// Creating or updating an agent failed.
    #[error("agent error for {agent_id}: {source}")]
    Agent {
        /// The agent that caused the error.
        agent_id: AgentId,
        /// The underlying agent error.
        source: ecosim_agents::AgentError,
    },

    /// A grid or spatial index operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: ecosim_world::WorldError,
    },

    /// The agent arena rejected an operation.
    #[error("population error: {source}")]
    Population {
        /// The underlying arena error.
        #[from]
        source: PopulationError,
    },

    /// The configuration cannot be turned into a running world.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },
}

/// One death recorded during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeathRecord {
    /// The agent that died.
    pub agent_id: AgentId,
    /// Its species.
    pub species: Species,
    /// Why it died.
    pub cause: DeathCause,
    /// Its age at death.
    pub age: f64,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Simulated time elapsed after this tick.
    pub elapsed: f64,
    /// Offspring born during this tick.
    pub births: u32,
    /// Agents who died during this tick, in the order they died.
    pub deaths: Vec<DeathRecord>,
    /// Live prey at the end of the tick.
    pub prey_alive: u32,
    /// Live predators at the end of the tick.
    pub predators_alive: u32,
}

impl TickSummary {
    /// Live agents of both species at the end of the tick.
    pub const fn agents_alive(&self) -> u32 {
        self.prey_alive.saturating_add(self.predators_alive)
    }

    /// Number of deaths with the given cause.
    pub fn deaths_by(&self, cause: DeathCause) -> usize {
        self.deaths.iter().filter(|d| d.cause == cause).count()
    }
}

/// The mutable simulation state passed through the tick cycle.
///
/// The grid and the index are owned here and lent to agents only for the
/// duration of a call.
#[derive(Debug)]
pub struct SimulationState {
    /// Identifier of this run.
    pub run_id: RunId,
    /// The simulation clock.
    pub clock: WorldClock,
    /// The resource grid.
    pub grid: EnvironmentGrid,
    /// Bucket grid over live agent positions.
    pub index: SpatialIndex,
    /// Every agent of the run.
    pub population: Population,
    /// Behavior table shared by all agents.
    pub behavior: BehaviorConfig,
    /// The single random source of the run.
    pub rng: SmallRng,
    /// Cap on live agents; births beyond it are dropped (0 = unlimited).
    pub max_population: u32,
}

impl SimulationState {
    /// Build an empty world around a resource grid.
    ///
    /// The spatial index shares the grid's cells.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Config`] if the behavior table is invalid.
    pub fn new(
        grid: EnvironmentGrid,
        behavior: BehaviorConfig,
        seed: u64,
        max_population: u32,
    ) -> Result<Self, TickError> {
        behavior.validate().map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })?;
        let index = SpatialIndex::for_grid(&grid);
        Ok(Self {
            run_id: RunId::new(),
            clock: WorldClock::new(),
            grid,
            index,
            population: Population::new(),
            behavior,
            rng: SmallRng::seed_from_u64(seed),
            max_population,
        })
    }

    /// Build an empty world from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Config`] if the configuration is invalid, or
    /// [`TickError::World`] if the grid cannot be built.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, TickError> {
        config.validate()?;
        let grid = EnvironmentGrid::new(&config.grid_params())?;
        Self::new(
            grid,
            config.behavior_config(),
            config.world.seed,
            config.population.max_population,
        )
    }

    /// Add a first-generation agent to the world.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Agent`] if the genome cannot be expressed or the
    /// position is not finite. Nothing is added in that case.
    pub fn spawn_agent(
        &mut self,
        species: Species,
        genome: Genome,
        position: Vec2,
        orientation: f64,
    ) -> Result<AgentId, TickError> {
        let id = self.population.allocate_id()?;
        let spawn = AgentSpawn {
            id,
            species,
            genome,
            position,
            orientation,
            generation: 0,
            parents: None,
            born_at_tick: self.clock.tick(),
        };
        let agent = Agent::spawn(spawn, &self.behavior, &mut self.rng)
            .map_err(|source| TickError::Agent { agent_id: id, source })?;
        self.index.insert(id, agent.position)?;
        self.population.push(agent)?;
        debug!(agent = %id, %species, x = position.x, y = position.y, "agent spawned");
        Ok(id)
    }

    /// Live agents of one species.
    pub fn count(&self, species: Species) -> u32 {
        u32::try_from(self.population.count(species)).unwrap_or(u32::MAX)
    }
}

/// Execute one complete tick of the simulation, advancing time by `dt`.
///
/// # Errors
///
/// Returns [`TickError::Clock`] for a negative or non-finite `dt` (nothing
/// changes in that case), or a world or arena error if the index and the
/// arena fall out of step.
pub fn run_tick(state: &mut SimulationState, dt: f64) -> Result<TickSummary, TickError> {
    // --- Clock ---
    let tick = state.clock.advance(dt)?;

    // --- Regrowth ---
    state.grid.advance(dt);

    // --- Agents ---
    let mut deaths = Vec::new();
    let mut births: u32 = 0;
    let acting = state.population.slot_count();

    for slot in 0..acting {
        let Some(agent) = state.population.slot(slot) else {
            break;
        };
        if !agent.is_alive() {
            continue;
        }
        let id = agent.id();
        let neighbors = neighbor_views(&state.index, &state.population, agent);

        let Some(agent) = state.population.slot_mut(slot) else {
            break;
        };
        if let Some(cause) = agent.update_state(&state.behavior) {
            record_death(tick, agent, cause, &mut deaths);
            state.index.remove(id);
            continue;
        }

        let mut ctx = ActContext {
            grid: &mut state.grid,
            config: &state.behavior,
            dt,
        };
        let outcome = agent
            .act(&neighbors, &mut ctx, &mut state.rng)
            .unwrap_or_else(|e| {
                warn!(tick, agent = %id, error = %e, "action failed, skipping its effects");
                ActOutcome::default()
            });

        if let Some(prey) = outcome.kill {
            kill_prey(state, prey, id, tick, &mut deaths);
        }
        if let Some(request) = outcome.mate_request {
            let born = deliver_mate_request(state, &request, tick)?;
            births = births.saturating_add(born);
        }

        let Some(agent) = state.population.slot_mut(slot) else {
            break;
        };
        let old_position = agent.position;
        agent.advance_motion(&state.behavior, dt, &mut state.rng);
        state.index.relocate(id, old_position, agent.position)?;

        if let Some(cause) = agent.grow_older(&state.behavior) {
            record_death(tick, agent, cause, &mut deaths);
            state.index.remove(id);
        }
    }

    // --- Purge ---
    for id in state.population.compact() {
        state.index.remove(id);
    }

    let summary = TickSummary {
        tick,
        elapsed: state.clock.elapsed(),
        births,
        deaths,
        prey_alive: state.count(Species::Prey),
        predators_alive: state.count(Species::Predator),
    };
    debug!(
        tick,
        births = summary.births,
        deaths = summary.deaths.len(),
        prey = summary.prey_alive,
        predators = summary.predators_alive,
        "Tick complete"
    );
    Ok(summary)
}

/// Views of every live agent in the buckets around `agent`, excluding
/// `agent` itself.
fn neighbor_views(index: &SpatialIndex, population: &Population, agent: &Agent) -> Vec<NeighborView> {
    let own_id = agent.id();
    index
        .neighbors_within(agent.position, agent.phenotype().view_distance)
        .into_iter()
        .filter(|&other| other != own_id)
        .filter_map(|other| population.get(other))
        .filter(|other| other.is_alive())
        .map(Agent::view)
        .collect()
}

fn record_death(tick: u64, agent: &Agent, cause: DeathCause, deaths: &mut Vec<DeathRecord>) {
    info!(
        tick,
        agent = %agent.id(),
        species = %agent.species(),
        %cause,
        age = agent.age,
        "Agent died"
    );
    deaths.push(DeathRecord {
        agent_id: agent.id(),
        species: agent.species(),
        cause,
        age: agent.age,
    });
}

/// Apply a kill reported by a predator's action.
fn kill_prey(
    state: &mut SimulationState,
    prey_id: AgentId,
    predator: AgentId,
    tick: u64,
    deaths: &mut Vec<DeathRecord>,
) {
    let Some(prey) = state.population.get_mut(prey_id) else {
        debug!(tick, %predator, prey = %prey_id, "kill target already gone");
        return;
    };
    if !prey.is_alive() || prey.species() != Species::Prey {
        debug!(tick, %predator, prey = %prey_id, "kill target no longer valid");
        return;
    }
    prey.die(DeathCause::Predation);
    record_death(tick, prey, DeathCause::Predation, deaths);
    state.index.remove(prey_id);
}

/// Hand a mate request to its recipient and place any resulting offspring.
/// Returns the number of births.
fn deliver_mate_request(
    state: &mut SimulationState,
    request: &MateRequest,
    tick: u64,
) -> Result<u32, TickError> {
    let father_generation = state.population.get(request.from).map_or(0, Agent::generation);
    let Some(mother) = state.population.get_mut(request.to) else {
        debug!(tick, male = %request.from, female = %request.to, "mate request to missing agent");
        return Ok(0);
    };
    let genomes = match mother.receive_mate_request(request, &state.behavior, &mut state.rng) {
        Ok(Some(genomes)) => genomes,
        Ok(None) => return Ok(0),
        Err(e) => {
            warn!(tick, female = %request.to, error = %e, "offspring genomes failed, litter dropped");
            return Ok(0);
        }
    };

    let cap = usize::try_from(state.max_population).unwrap_or(usize::MAX);
    let mut born: u32 = 0;
    for genome in genomes {
        if cap > 0 && state.population.live_count() >= cap {
            warn!(tick, female = %request.to, cap, "population cap reached, birth dropped");
            continue;
        }
        let child_id = state.population.allocate_id()?;
        let Some(spawn) = state.population.get(request.to).map(|mother| {
            mother.offspring_spawn(child_id, genome, request.from, father_generation, tick)
        }) else {
            break;
        };
        let child = match Agent::spawn(spawn, &state.behavior, &mut state.rng) {
            Ok(child) => child,
            Err(e) => {
                warn!(tick, agent = %child_id, error = %e, "birth dropped");
                continue;
            }
        };
        let generation = child.generation();
        state.index.insert(child_id, child.position)?;
        state.population.push(child)?;
        born = born.saturating_add(1);
        info!(
            tick,
            agent = %child_id,
            species = %request.species,
            mother = %request.to,
            father = %request.from,
            generation,
            "Agent born"
        );
    }
    Ok(born)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;
    use std::f64::consts::TAU;

    use ecosim_types::Trait;
    use ecosim_world::GridParams;

    use super::*;

    fn state() -> SimulationState {
        let grid = EnvironmentGrid::new(&GridParams::default()).unwrap();
        SimulationState::new(grid, BehaviorConfig::default(), 7, 0).unwrap()
    }

    fn genome(overrides: &[(Trait, f64)]) -> Genome {
        let mut values = BTreeMap::from([
            (Trait::Speed, 0.0),
            (Trait::TurnSpeed, 1.0),
            (Trait::FieldOfView, TAU),
            (Trait::ViewDistance, 100.0),
            (Trait::MaxEnergy, 100.0),
            (Trait::MetabolismRate, 0.1),
            (Trait::FindMateRate, 1.0),
            (Trait::MaxDesireToMate, 50.0),
            (Trait::Sex, 0.0),
            (Trait::Red, 10.0),
            (Trait::Green, 20.0),
            (Trait::Blue, 30.0),
        ]);
        for &(key, value) in overrides {
            values.insert(key, value);
        }
        Genome::homozygous(&values).unwrap()
    }

    #[test]
    fn bad_dt_changes_nothing() {
        let mut state = state();
        let id = state
            .spawn_agent(Species::Prey, genome(&[]), Vec2::new(100.0, 100.0), 0.0)
            .unwrap();
        let energy = state.population.get(id).unwrap().energy;

        for dt in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(run_tick(&mut state, dt), Err(TickError::Clock { .. })));
        }
        assert_eq!(state.clock.tick(), 0);
        let agent = state.population.get(id).unwrap();
        assert!((agent.energy - energy).abs() < f64::EPSILON);
    }

    #[test]
    fn starvation_removes_agent() {
        let mut state = state();
        let id = state
            .spawn_agent(
                Species::Prey,
                genome(&[(Trait::MaxEnergy, 0.05)]),
                Vec2::new(100.0, 100.0),
                0.0,
            )
            .unwrap();

        let summary = run_tick(&mut state, 0.025).unwrap();
        assert_eq!(summary.deaths.len(), 1);
        assert_eq!(summary.deaths[0].agent_id, id);
        assert_eq!(summary.deaths_by(DeathCause::Starvation), 1);
        assert_eq!(summary.agents_alive(), 0);
        assert!(state.population.get(id).is_none());
        assert!(state.index.is_empty());
    }

    #[test]
    fn old_age_removes_agent() {
        let mut state = state();
        let id = state
            .spawn_agent(Species::Prey, genome(&[]), Vec2::new(100.0, 100.0), 0.0)
            .unwrap();
        state.population.get_mut(id).unwrap().age = 2000.0;

        let summary = run_tick(&mut state, 0.025).unwrap();
        assert_eq!(summary.deaths_by(DeathCause::OldAge), 1);
        assert!(state.index.is_empty());
    }

    #[test]
    fn summary_counts_species() {
        let mut state = state();
        for i in 0..3 {
            let x = 100.0 + f64::from(i) * 200.0;
            state
                .spawn_agent(Species::Prey, genome(&[]), Vec2::new(x, 100.0), 0.0)
                .unwrap();
        }
        state
            .spawn_agent(Species::Predator, genome(&[]), Vec2::new(900.0, 400.0), 0.0)
            .unwrap();

        let summary = run_tick(&mut state, 0.025).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.prey_alive, 3);
        assert_eq!(summary.predators_alive, 1);
        assert_eq!(summary.births, 0);
        assert!((summary.elapsed - 0.025).abs() < 1e-12);
    }

    #[test]
    fn spawn_rejects_non_finite_position() {
        let mut state = state();
        let result = state.spawn_agent(
            Species::Prey,
            genome(&[]),
            Vec2::new(f64::NAN, 1.0),
            0.0,
        );
        assert!(matches!(result, Err(TickError::Agent { .. })));
        assert!(state.population.is_empty());
        assert!(state.index.is_empty());
    }

    #[test]
    fn from_config_builds_empty_world() {
        let state = SimulationState::from_config(&SimulationConfig::default()).unwrap();
        assert!(state.population.is_empty());
        assert_eq!(state.index.dims().columns(), 52);
        assert_eq!(state.max_population, 2000);
    }

    #[test]
    fn from_config_rejects_invalid() {
        let mut config = SimulationConfig::default();
        config.behavior.wander_period_min = 0;
        assert!(matches!(
            SimulationState::from_config(&config),
            Err(TickError::Config { .. })
        ));
    }
}
