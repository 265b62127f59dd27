//! The faction goal engine.
//!
//! A [`GoalRegistry`] holds an ordered list of stateless [`Goal`] strategies.
//! Each tick a faction takes the first goal whose viability check passes; the
//! standard registry ends with [`Fortify`], which is always viable, so a
//! selection is always made. Execution happens in a separate pass after every
//! faction has decided.
//!
//! Targets are picked first-match: owned regions are scanned in acquisition
//! order and, for each, the cardinal neighbours in N, E, S, W order. A goal
//! that finds no target when executed does nothing.

use std::fmt;

use serde::Serialize;
use tessera_ecs::entity::EntityId;
use tessera_ecs::world::World;
use tessera_events::bus::EventBus;

use crate::components::FactionData;
use crate::events::GameEvent;
use crate::region::{OwnershipChange, RegionCoord, RegionGrid};
use crate::SimError;

/// Resources an Expand transfer costs.
pub const EXPAND_COST: i64 = 50;
/// Strength required to attempt a conquest, and what the attacker spends.
pub const CONQUER_COST: i64 = 30;
/// Strength a defender loses when a region is taken.
pub const CONQUER_DEFENDER_LOSS: i64 = 10;
/// Strength gained per Fortify.
pub const FORTIFY_STRENGTH: i64 = 5;
/// Resources gained per Fortify.
pub const FORTIFY_RESOURCES: i64 = 10;

// ---------------------------------------------------------------------------
// Goal trait
// ---------------------------------------------------------------------------

/// Mutable state a goal may touch when executed.
pub struct GoalContext<'a> {
    pub world: &'a mut World,
    pub regions: &'a mut RegionGrid,
    pub bus: &'a mut EventBus<GameEvent>,
}

/// What an execution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    /// A region changed hands.
    Transferred(OwnershipChange),
    /// Stats changed, no territory moved.
    Fortified,
    /// Nothing matched. Not an error.
    NoTarget,
}

/// A named strategy with a viability check and an execution behaviour.
pub trait Goal {
    fn name(&self) -> &'static str;

    /// Whether this goal can be chosen by `faction` right now.
    fn is_viable(&self, faction: EntityId, data: &FactionData, regions: &RegionGrid) -> bool;

    /// Carry out the goal once.
    fn execute(&self, faction: EntityId, ctx: &mut GoalContext<'_>) -> Result<GoalOutcome, SimError>;
}

/// First cardinal neighbour of any owned region satisfying `pred`, in scan
/// order.
fn scan_neighbors(
    data: &FactionData,
    regions: &RegionGrid,
    mut pred: impl FnMut(RegionCoord) -> bool,
) -> Option<RegionCoord> {
    data.regions()
        .iter()
        .flat_map(|&owned| regions.cardinal_neighbors(owned))
        .find(|&n| pred(n))
}

/// Move `region` to `faction`, updating both faction lists, and raise the
/// ownership notification immediately.
fn transfer(
    ctx: &mut GoalContext<'_>,
    region: RegionCoord,
    faction: EntityId,
) -> Result<GoalOutcome, SimError> {
    let Some(change) = ctx.regions.set_owner(region, Some(faction)) else {
        return Ok(GoalOutcome::NoTarget);
    };
    if let Some(previous) = change.previous {
        if let Some(loser) = ctx.world.get_mut::<FactionData>(previous) {
            loser.remove_region(region);
        }
    }
    if let Some(winner) = ctx.world.get_mut::<FactionData>(faction) {
        winner.add_region(region);
    }
    tracing::info!(
        region = %region,
        faction = %faction,
        previous = ?change.previous,
        "region ownership transferred"
    );
    ctx.bus.raise(change.into())?;
    Ok(GoalOutcome::Transferred(change))
}

// ---------------------------------------------------------------------------
// Standard goals
// ---------------------------------------------------------------------------

/// Claim an adjacent unclaimed region for [`EXPAND_COST`] resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expand;

impl Goal for Expand {
    fn name(&self) -> &'static str {
        "Expand"
    }

    fn is_viable(&self, _faction: EntityId, data: &FactionData, regions: &RegionGrid) -> bool {
        data.resources >= EXPAND_COST
            && scan_neighbors(data, regions, |n| regions.owner(n).is_none()).is_some()
    }

    fn execute(&self, faction: EntityId, ctx: &mut GoalContext<'_>) -> Result<GoalOutcome, SimError> {
        let Some(data) = ctx.world.get::<FactionData>(faction) else {
            return Ok(GoalOutcome::NoTarget);
        };
        if data.resources < EXPAND_COST {
            return Ok(GoalOutcome::NoTarget);
        }
        let regions = &*ctx.regions;
        let Some(target) = scan_neighbors(data, regions, |n| regions.owner(n).is_none()) else {
            return Ok(GoalOutcome::NoTarget);
        };

        if let Some(data) = ctx.world.get_mut::<FactionData>(faction) {
            data.resources -= EXPAND_COST;
        }
        transfer(ctx, target, faction)
    }
}

/// Take an adjacent enemy region from a strictly weaker defender.
#[derive(Debug, Clone, Copy, Default)]
pub struct Conquer;

impl Goal for Conquer {
    fn name(&self) -> &'static str {
        "Conquer"
    }

    fn is_viable(&self, faction: EntityId, data: &FactionData, regions: &RegionGrid) -> bool {
        data.strength >= CONQUER_COST
            && scan_neighbors(data, regions, |n| {
                regions.owner(n).is_some_and(|owner| owner != faction)
            })
            .is_some()
    }

    fn execute(&self, faction: EntityId, ctx: &mut GoalContext<'_>) -> Result<GoalOutcome, SimError> {
        let Some(data) = ctx.world.get::<FactionData>(faction) else {
            return Ok(GoalOutcome::NoTarget);
        };
        let attack = data.strength;
        if attack < CONQUER_COST {
            return Ok(GoalOutcome::NoTarget);
        }

        let world = &*ctx.world;
        let regions = &*ctx.regions;
        let found = scan_neighbors(data, regions, |n| match regions.owner(n) {
            Some(owner) if owner != faction => world
                .get::<FactionData>(owner)
                .is_some_and(|defender| attack > defender.strength),
            _ => false,
        });
        let Some(target) = found else {
            return Ok(GoalOutcome::NoTarget);
        };
        let defender = regions.owner(target);

        if let Some(data) = ctx.world.get_mut::<FactionData>(faction) {
            data.strength -= CONQUER_COST;
        }
        if let Some(defender) = defender.and_then(|d| ctx.world.get_mut::<FactionData>(d)) {
            defender.strength = (defender.strength - CONQUER_DEFENDER_LOSS).max(0);
        }
        transfer(ctx, target, faction)
    }
}

/// Build up strength and resources. Always viable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fortify;

impl Goal for Fortify {
    fn name(&self) -> &'static str {
        "Fortify"
    }

    fn is_viable(&self, _faction: EntityId, _data: &FactionData, _regions: &RegionGrid) -> bool {
        true
    }

    fn execute(&self, faction: EntityId, ctx: &mut GoalContext<'_>) -> Result<GoalOutcome, SimError> {
        let Some(data) = ctx.world.get_mut::<FactionData>(faction) else {
            return Ok(GoalOutcome::NoTarget);
        };
        data.strength += FORTIFY_STRENGTH;
        data.resources += FORTIFY_RESOURCES;
        Ok(GoalOutcome::Fortified)
    }
}

// ---------------------------------------------------------------------------
// GoalRegistry
// ---------------------------------------------------------------------------

/// Index of a goal in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GoalId(usize);

impl GoalId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered, fixed list of goals evaluated in priority order.
pub struct GoalRegistry {
    goals: Vec<Box<dyn Goal>>,
}

impl fmt::Debug for GoalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Default for GoalRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl GoalRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { goals: Vec::new() }
    }

    /// Expand, Conquer, Fortify, in that order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Expand);
        registry.register(Conquer);
        registry.register(Fortify);
        registry
    }

    /// Append a goal at the lowest priority.
    ///
    /// # Panics
    ///
    /// Panics if a goal with the same name is already registered.
    pub fn register(&mut self, goal: impl Goal + 'static) -> GoalId {
        assert!(
            !self.goals.iter().any(|g| g.name() == goal.name()),
            "duplicate goal name: {:?}",
            goal.name()
        );
        self.goals.push(Box::new(goal));
        GoalId(self.goals.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn get(&self, id: GoalId) -> Option<&dyn Goal> {
        self.goals.get(id.0).map(|g| g.as_ref())
    }

    pub fn find(&self, name: &str) -> Option<GoalId> {
        self.goals.iter().position(|g| g.name() == name).map(GoalId)
    }

    /// Goal names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.goals.iter().map(|g| g.name())
    }

    /// First viable goal in priority order, if any.
    pub fn select(&self, faction: EntityId, data: &FactionData, regions: &RegionGrid) -> Option<GoalId> {
        self.goals
            .iter()
            .position(|g| g.is_viable(faction, data, regions))
            .map(GoalId)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
