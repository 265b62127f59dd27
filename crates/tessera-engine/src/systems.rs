//! Built-in systems and the context every system runs against.
//!
//! Registration order is the execution order:
//!
//! 1. [`decision_system`] picks a goal for every faction.
//! 2. [`execution_system`] runs every faction's selected goal once.
//! 3. [`movement_system`] advances units one step along their paths.
//! 4. [`visual_sync_system`] publishes unit moves to the presentation layer.

use rand::Rng;
use rand_pcg::Pcg64;
use tessera_ecs::entity::EntityId;
use tessera_ecs::world::World;
use tessera_events::bus::EventBus;

use crate::components::{CurrentGoal, FactionData, GridPosition, MoveIntent, VisualBinding};
use crate::events::GameEvent;
use crate::goals::{GoalContext, GoalOutcome, GoalRegistry};
use crate::grid::{GridCoord, SpatialGrid};
use crate::region::RegionGrid;
use crate::SimError;

// ---------------------------------------------------------------------------
// SystemContext / SystemFn
// ---------------------------------------------------------------------------

/// Everything a system may read or mutate during one tick.
pub struct SystemContext<'a> {
    pub world: &'a mut World,
    pub grid: &'a mut SpatialGrid,
    pub regions: &'a mut RegionGrid,
    pub bus: &'a mut EventBus<GameEvent>,
    pub goals: &'a GoalRegistry,
    pub rng: &'a mut Pcg64,
    /// The tick being run (1-based).
    pub tick: u64,
    /// Region transfers made so far this tick.
    pub transfers: usize,
}

/// A system invoked once per tick with the live entity list in spawn order.
pub type SystemFn = fn(&mut SystemContext<'_>, &[EntityId]) -> Result<(), SimError>;

pub const DECISION_SYSTEM: &str = "decision";
pub const EXECUTION_SYSTEM: &str = "execution";
pub const MOVEMENT_SYSTEM: &str = "movement";
pub const VISUAL_SYNC_SYSTEM: &str = "visual_sync";

/// The built-in systems in execution order.
pub fn builtin_systems() -> [(&'static str, SystemFn); 4] {
    [
        (DECISION_SYSTEM, decision_system),
        (EXECUTION_SYSTEM, execution_system),
        (MOVEMENT_SYSTEM, movement_system),
        (VISUAL_SYNC_SYSTEM, visual_sync_system),
    ]
}

// ---------------------------------------------------------------------------
// Faction systems
// ---------------------------------------------------------------------------

/// Select the first viable goal for every faction and record it.
pub fn decision_system(ctx: &mut SystemContext<'_>, entities: &[EntityId]) -> Result<(), SimError> {
    for &faction in entities {
        let Some(data) = ctx.world.get::<FactionData>(faction) else {
            continue;
        };
        let Some(goal) = ctx.goals.select(faction, data, ctx.regions) else {
            ctx.world.detach::<CurrentGoal>(faction);
            continue;
        };
        let name = ctx.goals.get(goal).map_or("?", |g| g.name());
        tracing::trace!(tick = ctx.tick, faction = %faction, goal = name, "goal selected");

        ctx.world.attach(faction, CurrentGoal { goal, name })?;
        ctx.bus.enqueue(GameEvent::GoalSelected { faction, goal: name });
    }
    Ok(())
}

/// Run each faction's selected goal once.
pub fn execution_system(ctx: &mut SystemContext<'_>, entities: &[EntityId]) -> Result<(), SimError> {
    for &faction in entities {
        let Some(current) = ctx.world.get::<CurrentGoal>(faction).copied() else {
            continue;
        };
        let Some(goal) = ctx.goals.get(current.goal) else {
            continue;
        };
        let mut goal_ctx = GoalContext {
            world: &mut *ctx.world,
            regions: &mut *ctx.regions,
            bus: &mut *ctx.bus,
        };
        if let GoalOutcome::Transferred(_) = goal.execute(faction, &mut goal_ctx)? {
            ctx.transfers += 1;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit systems
// ---------------------------------------------------------------------------

/// Advance every unit along its path, re-planning idle units.
///
/// An idle unit samples one random cell and asks for a path there; failure
/// leaves it idle until the next tick. A walking unit steps one cell if the
/// next cell is still walkable and free, otherwise it drops the plan.
pub fn movement_system(ctx: &mut SystemContext<'_>, entities: &[EntityId]) -> Result<(), SimError> {
    for &unit in entities {
        let Some(&GridPosition(position)) = ctx.world.get::<GridPosition>(unit) else {
            continue;
        };
        let Some(intent) = ctx.world.get_mut::<MoveIntent>(unit) else {
            continue;
        };

        if intent.is_idle() {
            let target = GridCoord::new(
                ctx.rng.gen_range(0..ctx.grid.width()),
                ctx.rng.gen_range(0..ctx.grid.height()),
            );
            if target == position {
                continue;
            }
            if let Some(path) = ctx.grid.find_path(position, target) {
                intent.destination = Some(target);
                intent.path = path.into();
            }
            continue;
        }

        let Some(&next) = intent.path.front() else {
            continue;
        };
        if !ctx.grid.is_walkable(next) || ctx.grid.is_occupied(next) {
            intent.clear();
            continue;
        }
        intent.path.pop_front();
        if intent.path.is_empty() {
            intent.destination = None;
        }

        ctx.grid.clear_occupied(position);
        ctx.grid.set_occupied(next);
        if let Some(pos) = ctx.world.get_mut::<GridPosition>(unit) {
            pos.0 = next;
        }
    }
    Ok(())
}

/// Copy unit positions into their visual bindings and announce moves.
pub fn visual_sync_system(ctx: &mut SystemContext<'_>, entities: &[EntityId]) -> Result<(), SimError> {
    for &unit in entities {
        let Some(&GridPosition(position)) = ctx.world.get::<GridPosition>(unit) else {
            continue;
        };
        let Some(binding) = ctx.world.get_mut::<VisualBinding>(unit) else {
            continue;
        };
        let previous = binding.rendered_at.replace(position);
        match previous {
            Some(from) if from != position => {
                ctx.bus.enqueue(GameEvent::EntityMoved {
                    entity: unit,
                    from,
                    to: position,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_all;
    use crate::region::RegionCoord;
    use rand::SeedableRng;

    struct Harness {
        world: World,
        grid: SpatialGrid,
        regions: RegionGrid,
        bus: EventBus<GameEvent>,
        goals: GoalRegistry,
        rng: Pcg64,
    }

    impl Harness {
        fn new(width: i32, height: i32) -> Self {
            let mut world = World::new();
            register_all(&mut world);
            let grid = SpatialGrid::new(width, height, 64);
            let regions = RegionGrid::build(&grid, 2).unwrap();
            Self {
                world,
                grid,
                regions,
                bus: EventBus::new(),
                goals: GoalRegistry::standard(),
                rng: Pcg64::seed_from_u64(9),
            }
        }

        fn run(&mut self, system: SystemFn) -> usize {
            let live: Vec<EntityId> = self.world.entities().collect();
            let mut ctx = SystemContext {
                world: &mut self.world,
                grid: &mut self.grid,
                regions: &mut self.regions,
                bus: &mut self.bus,
                goals: &self.goals,
                rng: &mut self.rng,
                tick: 1,
                transfers: 0,
            };
            system(&mut ctx, &live).unwrap();
            ctx.transfers
        }

        fn unit(&mut self, at: GridCoord, path: &[GridCoord]) -> EntityId {
            let e = self.world.create_entity();
            self.world.attach(e, GridPosition(at)).unwrap();
            self.world
                .attach(
                    e,
                    MoveIntent {
                        destination: path.last().copied(),
                        path: path.iter().copied().collect(),
                    },
                )
                .unwrap();
            self.world.attach(e, VisualBinding::default()).unwrap();
            self.grid.set_occupied(at);
            e
        }
    }

    fn c(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    #[test]
    fn decision_then_execution_expands() {
        let mut h = Harness::new(4, 4);
        let f = h.world.create_entity();
        let mut data = FactionData::new("Azure", "blue", 50, 0);
        data.add_region(RegionCoord::new(0, 0));
        h.regions.set_owner(RegionCoord::new(0, 0), Some(f));
        h.world.attach(f, data).unwrap();

        h.run(decision_system);
        assert_eq!(h.world.get::<CurrentGoal>(f).map(|g| g.name), Some("Expand"));
        assert_eq!(h.bus.queued_len(), 1);

        let transfers = h.run(execution_system);
        assert_eq!(transfers, 1);
        assert_eq!(h.world.get::<FactionData>(f).unwrap().regions().len(), 2);
    }

    #[test]
    fn unit_steps_and_moves_occupancy() {
        let mut h = Harness::new(4, 4);
        let u = h.unit(c(0, 0), &[c(1, 0), c(2, 0)]);

        h.run(movement_system);
        assert_eq!(h.world.get::<GridPosition>(u), Some(&GridPosition(c(1, 0))));
        assert!(h.grid.is_occupied(c(1, 0)));
        assert!(!h.grid.is_occupied(c(0, 0)));

        h.run(movement_system);
        let intent = h.world.get::<MoveIntent>(u).unwrap();
        assert!(intent.is_idle());
        assert_eq!(intent.destination, None);
    }

    #[test]
    fn blocked_step_drops_the_plan() {
        let mut h = Harness::new(4, 4);
        let u = h.unit(c(0, 0), &[c(1, 0), c(2, 0)]);
        h.grid.set_walkable(c(1, 0), false);

        h.run(movement_system);
        assert_eq!(h.world.get::<GridPosition>(u), Some(&GridPosition(c(0, 0))));
        assert!(h.world.get::<MoveIntent>(u).unwrap().is_idle());
    }

    #[test]
    fn occupied_step_drops_the_plan() {
        let mut h = Harness::new(4, 4);
        let u = h.unit(c(0, 0), &[c(1, 0)]);
        h.unit(c(1, 0), &[]);

        h.run(movement_system);
        assert_eq!(h.world.get::<GridPosition>(u), Some(&GridPosition(c(0, 0))));
    }

    #[test]
    fn idle_unit_plans_a_reachable_path() {
        let mut h = Harness::new(4, 4);
        let u = h.unit(c(0, 0), &[]);
        let mut planned = false;
        for _ in 0..8 {
            h.run(movement_system);
            let intent = h.world.get::<MoveIntent>(u).unwrap();
            if let Some(dest) = intent.destination {
                assert!(h.grid.is_walkable(dest));
                assert_eq!(intent.path.back(), Some(&dest));
                planned = true;
            }
        }
        assert!(planned);
    }

    #[test]
    fn visual_sync_announces_only_real_moves() {
        let mut h = Harness::new(4, 4);
        let u = h.unit(c(0, 0), &[c(1, 0)]);

        h.run(visual_sync_system);
        assert_eq!(h.world.get::<VisualBinding>(u).unwrap().rendered_at, Some(c(0, 0)));
        assert_eq!(h.bus.queued_len(), 0);

        h.run(movement_system);
        h.run(visual_sync_system);
        assert_eq!(h.bus.queued_len(), 1);

        h.run(visual_sync_system);
        assert_eq!(h.bus.queued_len(), 1);
    }
}
