//! Shared type definitions for the Ecosim simulation.
//!
//! This crate is the single source of truth for the plain data that flows
//! between the simulation core and its collaborators (renderer, driver,
//! exporter). Render-facing types are exported to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Agent handles and run identifiers
//! - [`enums`] -- Species, behavior states, sex, heritable traits, death causes
//! - [`geometry`] -- The [`Vec2`] world-space vector
//! - [`structs`] -- Snapshot and statistics types

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BehaviorState, DeathCause, Sex, Species, Trait};
pub use geometry::Vec2;
pub use ids::{AgentId, RunId};
pub use structs::{
    AgentInspection, AgentSnapshot, CellSnapshot, PopulationStats, Rgb, SpeciesStats,
    WorldSnapshot,
};
