//! The physical field of the Ecosim simulation.
//!
//! Two structures share one cell layout: the resource grid that holds grass
//! levels, and the spatial index that buckets agents for proximity queries.
//!
//! # Modules
//!
//! - [`cell`] -- Cell coordinates and grid dimensions shared by both structures.
//! - [`error`] -- Error types for grid and index construction.
//! - [`grid`] -- [`EnvironmentGrid`]: resource levels with neighbour-seeded regrowth.
//! - [`spatial`] -- [`SpatialIndex`]: bucket grid of agent ids.

pub mod cell;
pub mod error;
pub mod grid;
pub mod spatial;

pub use cell::{CellCoord, GridDims};
pub use error::WorldError;
pub use grid::{EnvironmentGrid, GridParams};
pub use spatial::SpatialIndex;
