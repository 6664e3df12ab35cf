//! Read-only snapshot types handed to the render, driver, and export
//! collaborators.
//!
//! Nothing in here is mutated by the simulation; each value is a copy
//! taken between ticks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BehaviorState, DeathCause, Sex, Species, Trait};
use crate::geometry::Vec2;
use crate::ids::{AgentId, RunId};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Phenotype color derived from the mean red/green/blue alleles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Per-agent data a renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// The agent's handle.
    pub id: AgentId,
    /// Species tag.
    pub species: Species,
    /// Position in world units.
    pub position: Vec2,
    /// Orientation in radians.
    pub orientation: f64,
    /// Phenotype color.
    pub color: Rgb,
    /// Current behavior state.
    pub state: BehaviorState,
    /// Whether the agent is still alive.
    pub alive: bool,
}

/// Diagnostic view of a single agent, returned by inspection queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentInspection {
    /// The render-facing fields.
    pub snapshot: AgentSnapshot,
    /// Current energy.
    pub energy: f64,
    /// Energy capacity (phenotype).
    pub max_energy: f64,
    /// Current desire to mate.
    pub desire_to_mate: f64,
    /// Desire cap (phenotype).
    pub max_desire_to_mate: f64,
    /// Current age.
    pub age: f64,
    /// Age at which the agent dies of old age.
    pub max_age: f64,
    /// Biological sex.
    pub sex: Sex,
    /// Whether the agent may currently initiate or accept mating.
    pub can_mate: bool,
    /// 0 for seed agents, otherwise one more than the older parent.
    pub generation: u32,
    /// Set once the agent has died.
    pub cause_of_death: Option<DeathCause>,
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Resource level of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellSnapshot {
    /// Column index (x / `cell_size`).
    pub column: u32,
    /// Row index (y / `cell_size`).
    pub row: u32,
    /// Resource level in `[0, max]`.
    pub level: f64,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate statistics for one species.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpeciesStats {
    /// Number of live agents.
    pub count: u32,
    /// Mean phenotype of each continuous trait. Empty when `count` is 0.
    pub mean_traits: BTreeMap<Trait, f64>,
}

/// Population counts and trait means across the live population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PopulationStats {
    /// Tick the statistics were taken after.
    pub tick: u64,
    /// Live prey.
    pub prey: SpeciesStats,
    /// Live predators.
    pub predators: SpeciesStats,
}

impl PopulationStats {
    /// Total live agents across all species.
    pub const fn total(&self) -> u32 {
        self.prey.count.saturating_add(self.predators.count)
    }

    /// Statistics for one species.
    pub const fn for_species(&self, species: Species) -> &SpeciesStats {
        match species {
            Species::Prey => &self.prey,
            Species::Predator => &self.predators,
        }
    }
}

/// Full read-only view of the world between two ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldSnapshot {
    /// The run this snapshot belongs to.
    pub run_id: RunId,
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Wall-clock capture time.
    pub captured_at: DateTime<Utc>,
    /// Every live agent, in creation order.
    pub agents: Vec<AgentSnapshot>,
    /// Every grid cell, row-major.
    pub cells: Vec<CellSnapshot>,
    /// Population statistics.
    pub stats: PopulationStats,
}
