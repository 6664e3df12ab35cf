//! Error types for the `ecosim-world` crate.
//!
//! Construction of the grid and the index is fallible; queries are not.
//! Out-of-grid lookups return empty results instead of errors so the tick
//! loop never has to branch on them.

use ecosim_types::AgentId;

/// Errors that can occur while building or mutating world structures.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid must have at least one column and one row.
    #[error("invalid grid dimensions: {columns}x{rows}")]
    InvalidDimensions {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },

    /// Cell size must be finite and strictly positive.
    #[error("invalid cell size: {0}")]
    InvalidCellSize(f64),

    /// Resource parameters must be finite and non-negative, with a
    /// positive maximum.
    #[error("invalid resource parameters: {reason}")]
    InvalidResourceParams {
        /// What is wrong with the parameters.
        reason: String,
    },

    /// The agent is already present in the spatial index.
    #[error("agent {0} is already indexed")]
    DuplicateAgent(AgentId),

    /// The agent is not present in the spatial index.
    #[error("agent {0} is not indexed")]
    AgentNotIndexed(AgentId),

    /// Arithmetic overflow while computing a grid size.
    #[error("arithmetic overflow in grid calculation")]
    ArithmeticOverflow,
}
