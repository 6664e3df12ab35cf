//! Read-only views of the world for the render, driver, and export
//! collaborators.
//!
//! Everything here takes `&SimulationState` and copies data out, so it can
//! be called between ticks without disturbing the run.

use std::collections::BTreeMap;

use chrono::Utc;
use ecosim_agents::Agent;
use ecosim_types::{
    AgentId, AgentInspection, PopulationStats, Species, SpeciesStats, Trait, Vec2, WorldSnapshot,
};

use crate::tick::SimulationState;

/// Population per species and the mean expressed value of every
/// continuous trait across each species' live agents.
pub fn population_stats(state: &SimulationState) -> PopulationStats {
    PopulationStats {
        tick: state.clock.tick(),
        prey: species_stats(state.population.iter().filter(|a| a.species() == Species::Prey)),
        predators: species_stats(
            state
                .population
                .iter()
                .filter(|a| a.species() == Species::Predator),
        ),
    }
}

fn species_stats<'a>(agents: impl Iterator<Item = &'a Agent>) -> SpeciesStats {
    let mut count: u32 = 0;
    let mut sums: BTreeMap<Trait, f64> = BTreeMap::new();
    for agent in agents {
        count = count.saturating_add(1);
        for trait_key in Trait::CONTINUOUS {
            if let Ok(value) = agent.genome().expressed(trait_key) {
                *sums.entry(trait_key).or_insert(0.0) += value;
            }
        }
    }
    let mean_traits = if count == 0 {
        BTreeMap::new()
    } else {
        let n = f64::from(count);
        sums.into_iter().map(|(key, sum)| (key, sum / n)).collect()
    };
    SpeciesStats { count, mean_traits }
}

/// Everything a renderer needs for one frame.
pub fn world_snapshot(state: &SimulationState) -> WorldSnapshot {
    WorldSnapshot {
        run_id: state.run_id,
        tick: state.clock.tick(),
        captured_at: Utc::now(),
        agents: state.population.iter().map(Agent::snapshot).collect(),
        cells: state.grid.snapshot(),
        stats: population_stats(state),
    }
}

/// Detailed view of one agent. Agents that died this tick remain visible
/// until the end-of-tick purge.
pub fn inspect(state: &SimulationState, id: AgentId) -> Option<AgentInspection> {
    state.population.get(id).map(Agent::inspect)
}

/// The live agent closest to `point` within `radius`, for click selection.
/// Ties go to the agent created first.
pub fn select_agent_at(state: &SimulationState, point: Vec2, radius: f64) -> Option<AgentId> {
    let mut candidates: Vec<&Agent> = state
        .index
        .neighbors_within(point, radius)
        .into_iter()
        .filter_map(|id| state.population.get(id))
        .filter(|agent| agent.is_alive())
        .collect();
    candidates.sort_by_key(|agent| agent.id());

    let mut best: Option<(AgentId, f64)> = None;
    for agent in candidates {
        let distance = agent.position.distance(point);
        if distance > radius {
            continue;
        }
        if best.is_none_or(|(_, nearest)| distance < nearest) {
            best = Some((agent.id(), distance));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::TAU;

    use ecosim_agents::{BehaviorConfig, Genome};
    use ecosim_world::{EnvironmentGrid, GridParams};

    use super::*;

    fn state() -> SimulationState {
        let grid = EnvironmentGrid::new(&GridParams::default()).unwrap();
        SimulationState::new(grid, BehaviorConfig::default(), 3, 0).unwrap()
    }

    fn genome(speed: f64) -> Genome {
        let values = BTreeMap::from([
            (Trait::Speed, speed),
            (Trait::TurnSpeed, 1.0),
            (Trait::FieldOfView, TAU),
            (Trait::ViewDistance, 100.0),
            (Trait::MaxEnergy, 100.0),
            (Trait::MetabolismRate, 0.1),
            (Trait::FindMateRate, 1.0),
            (Trait::MaxDesireToMate, 50.0),
            (Trait::Sex, 1.0),
            (Trait::Red, 200.0),
            (Trait::Green, 100.0),
            (Trait::Blue, 0.0),
        ]);
        Genome::homozygous(&values).unwrap()
    }

    #[test]
    fn stats_average_expressed_traits() {
        let mut state = state();
        state
            .spawn_agent(Species::Prey, genome(60.0), Vec2::new(50.0, 50.0), 0.0)
            .unwrap();
        state
            .spawn_agent(Species::Prey, genome(100.0), Vec2::new(300.0, 50.0), 0.0)
            .unwrap();
        state
            .spawn_agent(Species::Predator, genome(150.0), Vec2::new(600.0, 300.0), 0.0)
            .unwrap();

        let stats = population_stats(&state);
        assert_eq!(stats.prey.count, 2);
        assert_eq!(stats.predators.count, 1);
        assert_eq!(stats.total(), 3);
        let prey_speed = stats.prey.mean_traits.get(&Trait::Speed).copied().unwrap();
        assert!((prey_speed - 80.0).abs() < 1e-9);
        let predator_speed = stats
            .predators
            .mean_traits
            .get(&Trait::Speed)
            .copied()
            .unwrap();
        assert!((predator_speed - 150.0).abs() < 1e-9);
        assert!(!stats.prey.mean_traits.contains_key(&Trait::Sex));
    }

    #[test]
    fn empty_species_has_no_means() {
        let stats = population_stats(&state());
        assert_eq!(stats.total(), 0);
        assert!(stats.prey.mean_traits.is_empty());
    }

    #[test]
    fn snapshot_lists_agents_and_cells() {
        let mut state = state();
        let id = state
            .spawn_agent(Species::Prey, genome(50.0), Vec2::new(50.0, 50.0), 0.0)
            .unwrap();
        let snapshot = world_snapshot(&state);
        assert_eq!(snapshot.run_id, state.run_id);
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.agents.first().map(|a| a.id), Some(id));
        assert_eq!(snapshot.cells.len(), 52 * 24);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"cells\""));
    }

    #[test]
    fn inspect_reports_vitals() {
        let mut state = state();
        let id = state
            .spawn_agent(Species::Predator, genome(50.0), Vec2::new(50.0, 50.0), 0.0)
            .unwrap();
        let view = inspect(&state, id).unwrap();
        assert_eq!(view.snapshot.id, id);
        assert!((view.energy - 100.0).abs() < f64::EPSILON);
        assert!(view.age.abs() < f64::EPSILON);
        assert!(inspect(&state, AgentId(42)).is_none());
    }

    #[test]
    fn select_picks_nearest_within_radius() {
        let mut state = state();
        let far = state
            .spawn_agent(Species::Prey, genome(50.0), Vec2::new(110.0, 100.0), 0.0)
            .unwrap();
        let near = state
            .spawn_agent(Species::Prey, genome(50.0), Vec2::new(103.0, 100.0), 0.0)
            .unwrap();
        assert_eq!(
            select_agent_at(&state, Vec2::new(100.0, 100.0), 15.0),
            Some(near)
        );
        assert_eq!(
            select_agent_at(&state, Vec2::new(118.0, 100.0), 15.0),
            Some(far)
        );
        assert_eq!(select_agent_at(&state, Vec2::new(500.0, 500.0), 15.0), None);
    }
}
