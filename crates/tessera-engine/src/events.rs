//! The simulation's event vocabulary.
//!
//! | Event                    | Published by        | Mode      |
//! |--------------------------|---------------------|-----------|
//! | `CellChanged`            | `set_walkable`      | immediate |
//! | `RegionOwnershipChanged` | any transfer        | immediate |
//! | `GoalSelected`           | decision system     | queued    |
//! | `EntitySpawned`          | spawn               | queued    |
//! | `EntityDestroyed`        | destroy             | queued    |
//! | `EntityMoved`            | visual-sync system  | queued    |
//! | `WorldRegenerated`       | regeneration        | immediate |

use tessera_ecs::entity::EntityId;
use tessera_events::event::Event;

use crate::grid::GridCoord;
use crate::region::{OwnershipChange, RegionCoord};

/// Something that happened in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A cell's walkability flipped.
    CellChanged { coord: GridCoord, walkable: bool },
    /// A region changed hands (or was released).
    RegionOwnershipChanged {
        region: RegionCoord,
        previous: Option<EntityId>,
        owner: Option<EntityId>,
    },
    /// A faction settled on a goal for this tick.
    GoalSelected { faction: EntityId, goal: &'static str },
    /// An entity was created; `position` is set for units.
    EntitySpawned {
        entity: EntityId,
        position: Option<GridCoord>,
    },
    /// An entity was destroyed.
    EntityDestroyed { entity: EntityId },
    /// A unit's rendered position moved.
    EntityMoved {
        entity: EntityId,
        from: GridCoord,
        to: GridCoord,
    },
    /// The world was rebuilt from scratch.
    WorldRegenerated { generation: u64 },
}

/// Routing key for [`GameEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameEventKind {
    CellChanged,
    RegionOwnershipChanged,
    GoalSelected,
    EntitySpawned,
    EntityDestroyed,
    EntityMoved,
    WorldRegenerated,
}

impl From<OwnershipChange> for GameEvent {
    fn from(change: OwnershipChange) -> Self {
        GameEvent::RegionOwnershipChanged {
            region: change.region,
            previous: change.previous,
            owner: change.owner,
        }
    }
}

impl Event for GameEvent {
    type Kind = GameEventKind;

    fn kind(&self) -> GameEventKind {
        match self {
            GameEvent::CellChanged { .. } => GameEventKind::CellChanged,
            GameEvent::RegionOwnershipChanged { .. } => GameEventKind::RegionOwnershipChanged,
            GameEvent::GoalSelected { .. } => GameEventKind::GoalSelected,
            GameEvent::EntitySpawned { .. } => GameEventKind::EntitySpawned,
            GameEvent::EntityDestroyed { .. } => GameEventKind::EntityDestroyed,
            GameEvent::EntityMoved { .. } => GameEventKind::EntityMoved,
            GameEvent::WorldRegenerated { .. } => GameEventKind::WorldRegenerated,
        }
    }

    fn source(&self) -> Option<EntityId> {
        match *self {
            GameEvent::CellChanged { .. } | GameEvent::WorldRegenerated { .. } => None,
            // Attributed to whoever took the region, or whoever lost it.
            GameEvent::RegionOwnershipChanged { owner, previous, .. } => owner.or(previous),
            GameEvent::GoalSelected { faction, .. } => Some(faction),
            GameEvent::EntitySpawned { entity, .. }
            | GameEvent::EntityDestroyed { entity }
            | GameEvent::EntityMoved { entity, .. } => Some(entity),
        }
    }
}
