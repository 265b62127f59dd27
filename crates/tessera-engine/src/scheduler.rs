//! The tick scheduler: world construction, entity lifecycle, and the ordered
//! per-tick pipeline.
//!
//! The [`Simulation`] owns every piece of world state (store, grid, regions,
//! bus, RNG) and hands them to systems through a
//! [`SystemContext`](crate::systems::SystemContext). Each tick:
//!
//! 1. The tick counter advances.
//! 2. Every registered system runs once, in registration order, against the
//!    live entity list as it stands when that system starts.
//! 3. The event bus is flushed: queued events are delivered, then next-tick
//!    events are promoted.
//!
//! Given the same [`WorldConfig`], terrain generator and external commands,
//! two simulations produce identical [`state_hash`](Simulation::state_hash)
//! sequences.
//!
//! # Example
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let config = WorldConfig { width: 16, height: 16, region_size: 4, faction_count: 2, unit_count: 3, ..Default::default() };
//! let mut sim = Simulation::new(config, TickConfig::default()).unwrap();
//! sim.initialize().unwrap();
//!
//! sim.run_ticks(10).unwrap();
//! assert_eq!(sim.tick_count(), 10);
//! assert_eq!(sim.state(), SchedulerState::Running);
//! ```

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use tessera_ecs::entity::EntityId;
use tessera_ecs::world::World;
use tessera_events::bus::{EventBus, EventOutbox, SubscriptionId};
use tessera_events::HandlerError;

use crate::components::{register_all, FactionData, GridPosition, MoveIntent, VisualBinding};
use crate::config::{TickConfig, WorldConfig};
use crate::events::{GameEvent, GameEventKind};
use crate::goals::GoalRegistry;
use crate::grid::{GridCoord, SpatialGrid};
use crate::region::{OwnershipChange, RegionCoord, RegionGrid};
use crate::systems::{builtin_systems, SystemContext, SystemFn};
use crate::terrain::{NoiseTerrain, TerrainGenerator};
use crate::SimError;

/// Faction names, cycled when there are more factions than entries.
const PALETTE: [(&str, &str); 6] = [
    ("Azure Compact", "blue"),
    ("Crimson Host", "red"),
    ("Verdant Circle", "green"),
    ("Amber League", "yellow"),
    ("Violet Court", "purple"),
    ("Ashen Band", "grey"),
];

// ---------------------------------------------------------------------------
// State / diagnostics
// ---------------------------------------------------------------------------

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    /// Constructed; no world built yet. Ticking is an error.
    Uninitialized,
    /// World built, no tick run yet.
    Initialized,
    /// At least one tick has run since the last (re)build.
    Running,
    /// Rebuilt by [`Simulation::regenerate`]; ticks restart at zero.
    Reinitialized,
}

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(String, Duration)>,
    /// Time spent flushing the event bus.
    pub flush_time: Duration,
    /// Total time for the tick.
    pub total_time: Duration,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number just completed (1-based).
    pub tick: u64,
    /// Region ownership transfers made by goals.
    pub transfers: usize,
    /// Queued events delivered by the flush.
    pub events_flushed: usize,
    /// Handler invocations made by the flush.
    pub deliveries: usize,
}

/// Stats and placement for a new faction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionSeed {
    pub name: String,
    pub color: String,
    pub region: RegionCoord,
    pub strength: i64,
    pub resources: i64,
}

struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Owns one world and drives it tick by tick.
pub struct Simulation {
    config: WorldConfig,
    tick_config: TickConfig,
    state: SchedulerState,
    world: World,
    grid: SpatialGrid,
    regions: RegionGrid,
    bus: EventBus<GameEvent>,
    goals: GoalRegistry,
    terrain: Box<dyn TerrainGenerator>,
    rng: Pcg64,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    generation: u64,
    last_diagnostics: TickDiagnostics,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("tick", &self.tick_counter)
            .field("generation", &self.generation)
            .field("entities", &self.world.entity_count())
            .field("systems", &self.system_names())
            .finish()
    }
}

impl Simulation {
    /// Create an uninitialized simulation with noise terrain, the standard
    /// goal registry and the built-in systems registered.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] or [`SimError::RegionLayoutMismatch`] if
    /// either config fails validation.
    pub fn new(config: WorldConfig, tick_config: TickConfig) -> Result<Self, SimError> {
        config.validate()?;
        tick_config.validate()?;

        let mut world = World::new();
        register_all(&mut world);
        let grid = SpatialGrid::new(config.width, config.height, config.path_cache_capacity);
        let regions = RegionGrid::build(&grid, config.region_size)?;
        let rng = Pcg64::seed_from_u64(config.seed);

        let mut sim = Self {
            config,
            tick_config,
            state: SchedulerState::Uninitialized,
            world,
            grid,
            regions,
            bus: EventBus::new(),
            goals: GoalRegistry::standard(),
            terrain: Box::new(NoiseTerrain::default()),
            rng,
            systems: Vec::new(),
            tick_counter: 0,
            generation: 0,
            last_diagnostics: TickDiagnostics::default(),
        };
        for (name, func) in builtin_systems() {
            sim.add_system(name, func);
        }
        Ok(sim)
    }

    /// Replace the terrain generator used by the next (re)build.
    pub fn with_terrain(mut self, terrain: impl TerrainGenerator + 'static) -> Self {
        self.terrain = Box::new(terrain);
        self
    }

    /// Replace the goal registry.
    pub fn with_goals(mut self, goals: GoalRegistry) -> Self {
        self.goals = goals;
        self
    }

    /// Append a system after every system registered so far.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Registered system names in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Build the world: terrain, regions, factions, units.
    ///
    /// # Errors
    ///
    /// [`SimError::AlreadyInitialized`] if called twice (use
    /// [`regenerate`](Self::regenerate)), [`SimError::NoSpawnCell`] if the
    /// terrain leaves too few free cells for the configured units.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.state != SchedulerState::Uninitialized {
            return Err(SimError::AlreadyInitialized);
        }
        self.build_world()?;
        self.state = SchedulerState::Initialized;
        Ok(())
    }

    /// Throw the current world away and build a fresh one.
    ///
    /// Entity ids and the tick counter restart at zero. The RNG is reseeded
    /// from `seed + generation`, so each regeneration differs but is
    /// reproducible. Subscriptions survive; pending events do not.
    pub fn regenerate(&mut self) -> Result<(), SimError> {
        self.generation += 1;
        self.build_world()?;
        self.state = SchedulerState::Reinitialized;
        self.bus.raise(GameEvent::WorldRegenerated {
            generation: self.generation,
        })?;
        Ok(())
    }

    fn build_world(&mut self) -> Result<(), SimError> {
        self.world.clear();
        self.grid.clear_all_occupancy();
        self.bus.clear_pending();
        self.tick_counter = 0;
        self.last_diagnostics = TickDiagnostics::default();
        self.rng = Pcg64::seed_from_u64(self.config.seed.wrapping_add(self.generation));

        self.terrain.generate(&mut self.grid, &mut self.rng);
        self.regions = RegionGrid::build(&self.grid, self.config.region_size)?;

        for i in 0..self.config.faction_count {
            let unclaimed: Vec<RegionCoord> = self.regions.unclaimed().collect();
            let Some(&region) = unclaimed.choose(&mut self.rng) else {
                break;
            };
            let (name, color) = PALETTE[i % PALETTE.len()];
            let name = match i / PALETTE.len() {
                0 => name.to_owned(),
                round => format!("{name} {}", round + 1),
            };
            let strength = self
                .rng
                .gen_range(self.config.starting_strength.min..=self.config.starting_strength.max);
            let resources = self
                .rng
                .gen_range(self.config.starting_resources.min..=self.config.starting_resources.max);
            self.spawn_faction(FactionSeed {
                name,
                color: color.to_owned(),
                region,
                strength,
                resources,
            })?;
        }

        for _ in 0..self.config.unit_count {
            let free: Vec<GridCoord> = self.grid.free_cells().collect();
            let Some(&cell) = free.choose(&mut self.rng) else {
                return Err(SimError::NoSpawnCell {
                    requested: self.config.unit_count,
                    spawned: self.world.count_with::<GridPosition>(),
                });
            };
            self.spawn_unit(cell)?;
        }

        tracing::info!(
            generation = self.generation,
            seed = self.config.seed,
            factions = self.world.count_with::<FactionData>(),
            units = self.world.count_with::<GridPosition>(),
            walkable = self.grid.walkable_count(),
            "world built"
        );
        Ok(())
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create a faction owning `seed.region`.
    ///
    /// # Errors
    ///
    /// [`SimError::RegionUnavailable`] if the region is out of range or
    /// already owned.
    pub fn spawn_faction(&mut self, seed: FactionSeed) -> Result<EntityId, SimError> {
        match self.regions.get_region(seed.region) {
            Some(region) if region.is_unclaimed() => {}
            _ => return Err(SimError::RegionUnavailable { region: seed.region }),
        }

        let faction = self.world.create_entity();
        let mut data = FactionData::new(seed.name, seed.color, seed.resources, seed.strength);
        data.add_region(seed.region);
        self.world.attach(faction, data)?;
        self.bus.enqueue(GameEvent::EntitySpawned {
            entity: faction,
            position: None,
        });
        if let Some(change) = self.regions.set_owner(seed.region, Some(faction)) {
            self.announce_ownership(change)?;
        }
        Ok(faction)
    }

    /// Create a unit standing on `cell`.
    ///
    /// # Errors
    ///
    /// [`SimError::CellUnavailable`] if the cell is out of bounds,
    /// non-walkable or occupied.
    pub fn spawn_unit(&mut self, cell: GridCoord) -> Result<EntityId, SimError> {
        if !self.grid.is_walkable(cell) || self.grid.is_occupied(cell) {
            return Err(SimError::CellUnavailable { cell });
        }
        let unit = self.world.create_entity();
        self.world.attach(unit, GridPosition(cell))?;
        self.world.attach(unit, MoveIntent::default())?;
        self.world.attach(unit, VisualBinding::default())?;
        self.grid.set_occupied(cell);
        self.bus.enqueue(GameEvent::EntitySpawned {
            entity: unit,
            position: Some(cell),
        });
        Ok(unit)
    }

    /// Destroy an entity.
    ///
    /// Releases the cell a unit occupied and clears every region a faction
    /// owned (announcing each release). Returns `Ok(false)` if the entity was
    /// not alive.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<bool, SimError> {
        if !self.world.is_alive(entity) {
            tracing::warn!(entity = %entity, "destroy of dead entity ignored");
            return Ok(false);
        }
        if let Some(&GridPosition(cell)) = self.world.get::<GridPosition>(entity) {
            self.grid.clear_occupied(cell);
        }
        let owned_regions = self.world.has::<FactionData>(entity);
        self.world.destroy_entity(entity);

        if owned_regions {
            for region in self.regions.clear_owner(entity) {
                self.announce_ownership(OwnershipChange {
                    region,
                    previous: Some(entity),
                    owner: None,
                })?;
            }
        }
        self.bus.enqueue(GameEvent::EntityDestroyed { entity });
        Ok(true)
    }

    /// Give `region` to `faction` directly, bypassing goals. Any previous
    /// owner loses it.
    pub fn assign_region(&mut self, faction: EntityId, region: RegionCoord) -> Result<(), SimError> {
        if !self.world.has::<FactionData>(faction) {
            return Err(SimError::NotAFaction { entity: faction });
        }
        if self.regions.owner(region) == Some(faction) {
            return Ok(());
        }
        let change = self
            .regions
            .set_owner(region, Some(faction))
            .ok_or(SimError::RegionUnavailable { region })?;
        if let Some(previous) = change.previous {
            if let Some(data) = self.world.get_mut::<FactionData>(previous) {
                data.remove_region(region);
            }
        }
        if let Some(data) = self.world.get_mut::<FactionData>(faction) {
            data.add_region(region);
        }
        self.announce_ownership(change)
    }

    fn announce_ownership(&mut self, change: OwnershipChange) -> Result<(), SimError> {
        tracing::info!(
            region = %change.region,
            previous = ?change.previous,
            owner = ?change.owner,
            "region ownership changed"
        );
        self.bus.raise(change.into())?;
        Ok(())
    }

    // -- grid commands ------------------------------------------------------

    /// Change a cell's walkability.
    ///
    /// Always invalidates the path cache; raises
    /// [`GameEvent::CellChanged`] only if the value actually changed.
    pub fn set_walkable(&mut self, cell: GridCoord, walkable: bool) -> Result<bool, SimError> {
        let changed = self.grid.set_walkable(cell, walkable);
        if changed {
            self.bus.raise(GameEvent::CellChanged { coord: cell, walkable })?;
        }
        Ok(changed)
    }

    /// Mark a cell occupied (bookkeeping only).
    pub fn set_occupied(&mut self, cell: GridCoord) -> bool {
        self.grid.set_occupied(cell)
    }

    /// Release a cell.
    pub fn clear_occupied(&mut self, cell: GridCoord) -> bool {
        self.grid.clear_occupied(cell)
    }

    /// Cached path query; see [`SpatialGrid::find_path`].
    pub fn find_path(&mut self, start: GridCoord, end: GridCoord) -> Option<Vec<GridCoord>> {
        self.grid.find_path(start, end)
    }

    // -- events -------------------------------------------------------------

    /// Subscribe to simulation events.
    pub fn subscribe<F>(&mut self, kind: GameEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent, &mut EventOutbox<GameEvent>) -> Result<(), HandlerError> + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, kind: GameEventKind, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    pub fn bus(&self) -> &EventBus<GameEvent> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus<GameEvent> {
        &mut self.bus
    }

    // -- ticking ------------------------------------------------------------

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// [`SimError::NotInitialized`] before [`initialize`](Self::initialize).
    /// A failing system or event handler aborts the rest of the tick and its
    /// error is returned; the tick counter has already advanced.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        if self.state == SchedulerState::Uninitialized {
            return Err(SimError::NotInitialized);
        }
        self.state = SchedulerState::Running;
        self.tick_counter += 1;
        let tick = self.tick_counter;
        let tick_start = Instant::now();
        tracing::debug!(tick, entities = self.world.entity_count(), "tick start");

        let mut ctx = SystemContext {
            world: &mut self.world,
            grid: &mut self.grid,
            regions: &mut self.regions,
            bus: &mut self.bus,
            goals: &self.goals,
            rng: &mut self.rng,
            tick,
            transfers: 0,
        };

        let mut system_times = Vec::with_capacity(self.systems.len());
        for system in &self.systems {
            let live: Vec<EntityId> = ctx.world.entities().collect();
            let start = Instant::now();
            (system.func)(&mut ctx, &live)?;
            system_times.push((system.name.clone(), start.elapsed()));
        }
        let transfers = ctx.transfers;

        let flush_start = Instant::now();
        let flushed = self.bus.flush()?;
        let flush_time = flush_start.elapsed();

        self.last_diagnostics = TickDiagnostics {
            system_times,
            flush_time,
            total_time: tick_start.elapsed(),
        };
        tracing::debug!(
            tick,
            transfers,
            events = flushed.events,
            deliveries = flushed.deliveries,
            "tick end"
        );

        Ok(TickReport {
            tick,
            transfers,
            events_flushed: flushed.events,
            deliveries: flushed.deliveries,
        })
    }

    /// Run `n` ticks, stopping at the first error.
    pub fn run_ticks(&mut self, n: u64) -> Result<(), SimError> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Ticks run since the last (re)build.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated seconds since the last (re)build.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.tick_config.interval
    }

    /// Number of regenerations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn regions(&self) -> &RegionGrid {
        &self.regions
    }

    pub fn goals(&self) -> &GoalRegistry {
        &self.goals
    }

    /// Faction entities in spawn order.
    pub fn factions(&self) -> Vec<EntityId> {
        self.world.entities_with::<FactionData>().collect()
    }

    /// Unit entities in spawn order.
    pub fn units(&self) -> Vec<EntityId> {
        self.world.entities_with::<GridPosition>().collect()
    }

    /// BLAKE3 hex digest of the observable simulation state.
    ///
    /// Covers the tick and generation counters, live entity ids, faction
    /// data, region ownership, unit positions and the occupied set.
    pub fn state_hash(&self) -> String {
        #[derive(Serialize)]
        struct HashableState<'a> {
            tick: u64,
            generation: u64,
            entities: Vec<EntityId>,
            factions: Vec<(EntityId, &'a FactionData)>,
            ownership: Vec<(RegionCoord, Option<EntityId>)>,
            units: Vec<(EntityId, GridCoord)>,
            occupied: Vec<GridCoord>,
        }

        let hashable = HashableState {
            tick: self.tick_counter,
            generation: self.generation,
            entities: self.world.entities().collect(),
            factions: self.world.query::<FactionData>().collect(),
            ownership: self
                .regions
                .regions()
                .map(|r| (r.coord(), r.owner()))
                .collect(),
            units: self
                .world
                .query::<GridPosition>()
                .map(|(e, p)| (e, p.0))
                .collect(),
            occupied: self.grid.occupied().collect(),
        };

        let json_bytes = serde_json::to_vec(&hashable)
            .expect("simulation state should always be JSON-serializable");

        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
