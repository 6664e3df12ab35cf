//! Error types for the ecosim-agents crate.
//!
//! Genome errors are kept separate from agent errors so the tick loop can
//! drop a single malformed birth without treating it as a broken agent.

use ecosim_types::{AgentId, Trait};

/// Errors raised while building, recombining, or expressing a genome.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    /// A trait key is missing from a genome or gamete.
    #[error("genome is missing trait {0}")]
    MissingTrait(Trait),

    /// An allele value is NaN or infinite.
    #[error("allele for trait {trait_key} is not finite: {value}")]
    NonFiniteAllele {
        /// The affected trait.
        trait_key: Trait,
        /// The offending value.
        value: f64,
    },

    /// A configured trait range is empty or not finite.
    #[error("invalid range for trait {trait_key}: [{min}, {max})")]
    InvalidRange {
        /// The affected trait.
        trait_key: Trait,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

/// Errors that can occur during agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent's genome could not be expressed.
    #[error("genome error for agent {agent}: {source}")]
    Genome {
        /// The agent being built or bred.
        agent: AgentId,
        /// The underlying genome failure.
        source: GenomeError,
    },

    /// Spawn parameters were rejected.
    #[error("invalid spawn for agent {agent}: {reason}")]
    InvalidSpawn {
        /// The agent being spawned.
        agent: AgentId,
        /// Description of what was wrong.
        reason: String,
    },

    /// Behavior configuration failed validation.
    #[error("invalid behavior config: {reason}")]
    InvalidConfig {
        /// Description of what was wrong.
        reason: String,
    },
}
