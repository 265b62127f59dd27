//! Component kinds the simulation attaches to its entities.
//!
//! Factions carry [`FactionData`] and, once they have decided, a
//! [`CurrentGoal`]. Units carry [`GridPosition`], [`MoveIntent`] and
//! [`VisualBinding`].

use std::collections::VecDeque;

use serde::Serialize;
use tessera_ecs::component::Component;
use tessera_ecs::entity::EntityId;
use tessera_ecs::world::World;

use crate::goals::GoalId;
use crate::grid::GridCoord;
use crate::region::RegionCoord;

// ---------------------------------------------------------------------------
// Faction components
// ---------------------------------------------------------------------------

/// A territorial AI actor's stats and holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionData {
    pub name: String,
    pub color: String,
    pub resources: i64,
    pub strength: i64,
    /// Controlled regions in acquisition order. No duplicates.
    regions: Vec<RegionCoord>,
}

impl FactionData {
    pub fn new(name: impl Into<String>, color: impl Into<String>, resources: i64, strength: i64) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            resources,
            strength,
            regions: Vec::new(),
        }
    }

    pub fn regions(&self) -> &[RegionCoord] {
        &self.regions
    }

    pub fn owns(&self, region: RegionCoord) -> bool {
        self.regions.contains(&region)
    }

    /// Append `region`. Returns `false` if it was already held.
    pub fn add_region(&mut self, region: RegionCoord) -> bool {
        if self.owns(region) {
            return false;
        }
        self.regions.push(region);
        true
    }

    /// Remove `region`, keeping the order of the rest.
    pub fn remove_region(&mut self, region: RegionCoord) -> bool {
        let before = self.regions.len();
        self.regions.retain(|&r| r != region);
        self.regions.len() != before
    }
}

impl Component for FactionData {}

/// The goal a faction selected in the latest decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentGoal {
    pub goal: GoalId,
    pub name: &'static str,
}

impl Component for CurrentGoal {}

// ---------------------------------------------------------------------------
// Unit components
// ---------------------------------------------------------------------------

/// Cell a unit stands on. Mirrored in the grid's occupied set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPosition(pub GridCoord);

impl Component for GridPosition {}

/// Where a unit is walking and the steps left to get there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveIntent {
    pub destination: Option<GridCoord>,
    pub path: VecDeque<GridCoord>,
}

impl MoveIntent {
    pub fn is_idle(&self) -> bool {
        self.path.is_empty()
    }

    /// Forget the current plan.
    pub fn clear(&mut self) {
        self.destination = None;
        self.path.clear();
    }
}

impl Component for MoveIntent {}

/// Link between a unit and its sprite in the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisualBinding {
    /// Key the renderer uses to find the sprite; set when attached.
    pub sprite_key: Option<EntityId>,
    /// Position the presentation layer last drew.
    pub rendered_at: Option<GridCoord>,
}

impl Component for VisualBinding {
    fn on_attach(&mut self, entity: EntityId) {
        self.sprite_key = Some(entity);
    }
}

/// Register every simulation component kind with `world`.
pub fn register_all(world: &mut World) {
    world.register_component::<FactionData>("faction");
    world.register_component::<CurrentGoal>("current_goal");
    world.register_component::<GridPosition>("grid_position");
    world.register_component::<MoveIntent>("move_intent");
    world.register_component::<VisualBinding>("visual_binding");
}
