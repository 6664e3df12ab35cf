//! Genomes, the agent state machine, and behaviors for the Ecosim simulation.
//!
//! This crate is the logic layer for individual agents. It never owns the
//! population or the spatial index: the simulation core hands each agent a
//! copy of what it can sense and applies the side effects it reports.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] aggregate: state machine, actions, motion, aging
//! - [`config`] -- Behavior parameters and genome ranges ([`BehaviorConfig`])
//! - [`error`] -- Error types ([`AgentError`], [`GenomeError`])
//! - [`genome`] -- Diploid genomes, gametes, crossover and mutation
//! - [`perception`] -- Neighbour views and the view-cone test

pub mod agent;
pub mod config;
pub mod error;
pub mod genome;
pub mod perception;

// Re-export primary types at crate root for convenience.
pub use agent::{
    ActContext, ActOutcome, Agent, AgentSpawn, MateRequest, Parents, random_coordinate,
};
pub use config::{BehaviorConfig, GenomeRanges, MutationParams, SpeciesParams, TraitRange};
pub use error::{AgentError, GenomeError};
pub use genome::{AllelePair, Gamete, Genome, Phenotype};
pub use perception::{NeighborView, Sight};
