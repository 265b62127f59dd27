//! Tessera Engine -- the tick-driven simulation core.
//!
//! This crate builds on [`tessera_ecs`] and [`tessera_events`] to provide a
//! tile-based world: a [`SpatialGrid`](grid::SpatialGrid) with occupancy and
//! cached A* pathfinding, a [`RegionGrid`](region::RegionGrid) of ownable
//! territories, a faction goal engine, and the
//! [`Simulation`](scheduler::Simulation) that runs it all in a fixed order
//! every tick.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let config = WorldConfig { width: 32, height: 32, region_size: 8, seed: 1, ..Default::default() };
//! let mut sim = Simulation::new(config, TickConfig::default())
//!     .unwrap()
//!     .with_terrain(FlatTerrain);
//! sim.initialize().unwrap();
//!
//! let report = sim.tick().unwrap();
//! assert_eq!(report.tick, 1);
//!
//! // Every faction has picked a goal.
//! for faction in sim.factions() {
//!     assert!(sim.world().has::<CurrentGoal>(faction));
//! }
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod config;
pub mod events;
pub mod goals;
pub mod grid;
pub mod pathfinding;
pub mod region;
pub mod scheduler;
pub mod systems;
pub mod terrain;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

/// Re-export the event bus crate for convenience.
pub use tessera_events;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A tick was requested before the world was built.
    #[error("simulation is not initialized; call initialize() first")]
    NotInitialized,

    /// `initialize` was called on a built world.
    #[error("simulation is already initialized; use regenerate() to rebuild")]
    AlreadyInitialized,

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Region size does not divide the grid exactly.
    #[error("region size {region_size} does not evenly divide a {width}x{height} grid")]
    RegionLayoutMismatch {
        width: i32,
        height: i32,
        region_size: i32,
    },

    /// A region is out of range or already owned.
    #[error("region {region} is out of range or already owned")]
    RegionUnavailable { region: region::RegionCoord },

    /// A cell is out of bounds, non-walkable or occupied.
    #[error("cell {cell} is out of bounds, not walkable, or occupied")]
    CellUnavailable { cell: grid::GridCoord },

    /// The entity is not a live faction.
    #[error("entity {entity:?} is not a live faction")]
    NotAFaction { entity: tessera_ecs::entity::EntityId },

    /// Ran out of free cells while spawning units.
    #[error("no free cell to spawn unit: requested {requested}, spawned {spawned}")]
    NoSpawnCell { requested: usize, spawned: usize },

    #[error(transparent)]
    Ecs(#[from] tessera_ecs::EcsError),

    #[error(transparent)]
    Event(#[from] tessera_events::EventError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;
    pub use tessera_events::prelude::*;

    pub use crate::components::{CurrentGoal, FactionData, GridPosition, MoveIntent, VisualBinding};
    pub use crate::config::{StatRange, TickConfig, WorldConfig};
    pub use crate::events::{GameEvent, GameEventKind};
    pub use crate::goals::{Conquer, Expand, Fortify, Goal, GoalContext, GoalId, GoalOutcome, GoalRegistry};
    pub use crate::grid::{Biome, Cell, GridCoord, SpatialGrid};
    pub use crate::region::{OwnershipChange, Region, RegionCoord, RegionGrid};
    pub use crate::scheduler::{FactionSeed, SchedulerState, Simulation, TickDiagnostics, TickReport};
    pub use crate::systems::{SystemContext, SystemFn};
    pub use crate::terrain::{FlatTerrain, NoiseTerrain, TerrainGenerator};
    pub use crate::SimError;
}
