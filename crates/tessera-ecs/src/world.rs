//! The [`World`] is the top-level container for the entity/component store. It
//! owns the entity allocator, the component registry, the live entity set, and
//! one storage column per registered component kind.

use std::collections::{BTreeMap, BTreeSet};

use crate::column::{Column, ErasedColumn};
use crate::component::{Component, ComponentRegistry, ComponentTypeId};
use crate::entity::{EntityAllocator, EntityId};
use crate::query::EntitiesWith;
use crate::EcsError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The entity/component store.
///
/// Provides the primary API for entity lifecycle and component access. Every
/// entity holds at most one component of each kind.
pub struct World {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    /// Indexed by `ComponentTypeId`.
    columns: Vec<Box<dyn ErasedColumn>>,
    /// Live entities. Ordered by id, which is spawn order.
    live: BTreeSet<EntityId>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.live.len())
            .field("component_kinds", &self.registry.len())
            .finish()
    }
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            columns: Vec::new(),
            live: BTreeSet::new(),
        }
    }

    /// Read-only access to the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a component kind so it can be attached to entities.
    ///
    /// Registering the same type twice is harmless and returns the original id.
    pub fn register_component<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let id = self.registry.register::<T>(name);
        if id.index() == self.columns.len() {
            self.columns.push(Box::new(Column::<T>::new()));
        }
        id
    }

    fn column<T: Component>(&self) -> Option<&Column<T>> {
        let id = self.registry.lookup::<T>()?;
        self.columns[id.index()].as_any().downcast_ref::<Column<T>>()
    }

    fn column_mut<T: Component>(&mut self) -> Option<&mut Column<T>> {
        let id = self.registry.lookup::<T>()?;
        self.columns[id.index()]
            .as_any_mut()
            .downcast_mut::<Column<T>>()
    }

    fn unknown_component<T>(&self) -> EcsError {
        EcsError::UnknownComponent {
            name: std::any::type_name::<T>().to_owned(),
            registered: self.registry.registered_names().join(", "),
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create a fresh entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        self.live.insert(entity);
        entity
    }

    /// Destroy an entity, dropping every component it holds.
    ///
    /// Returns `false` (and does nothing) if the entity is not alive.
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        if !self.live.remove(&entity) {
            return false;
        }
        for column in &mut self.columns {
            column.remove(entity);
        }
        true
    }

    /// Whether the entity is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.live.contains(&entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Alive entities in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.iter().copied()
    }

    /// Destroy every entity and restart id numbering from zero.
    ///
    /// Component registrations survive; only data is discarded.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.live.clear();
        self.allocator.reset();
    }

    // -- component access ---------------------------------------------------

    /// Attach a component, replacing any existing component of the same kind.
    ///
    /// The component's [`on_attach`](Component::on_attach) hook runs exactly
    /// once, before the value is stored.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`] if the entity is not alive,
    /// [`EcsError::UnknownComponent`] if `T` was never registered.
    pub fn attach<T: Component>(&mut self, entity: EntityId, mut value: T) -> Result<(), EcsError> {
        if !self.live.contains(&entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        if self.registry.lookup::<T>().is_none() {
            return Err(self.unknown_component::<T>());
        }
        value.on_attach(entity);
        if let Some(column) = self.column_mut::<T>() {
            column.insert(entity, value);
        }
        Ok(())
    }

    /// Remove and return a component. `None` if absent.
    pub fn detach<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.column_mut::<T>()?.take(entity)
    }

    /// Immutable access to a component.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.column::<T>()?.get(entity)
    }

    /// Mutable access to a component.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.column_mut::<T>()?.get_mut(entity)
    }

    /// Whether the entity holds a component of kind `T`.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.column::<T>().is_some_and(|c| c.contains(entity))
    }

    /// Number of entities holding a `T`.
    pub fn count_with<T: Component>(&self) -> usize {
        self.column::<T>().map_or(0, |c| c.len())
    }

    // -- iteration ----------------------------------------------------------

    /// Lazily iterate the entities that hold a `T`, in spawn order.
    pub fn entities_with<T: Component>(&self) -> EntitiesWith<'_, T> {
        EntitiesWith::new(self)
    }

    /// The first entity holding a `T` whose id is greater than `after`.
    ///
    /// Passing `None` starts from the beginning. This is the cursor step behind
    /// [`entities_with`](Self::entities_with), exposed for callers that need to
    /// mutate the world between steps.
    pub fn next_with<T: Component>(&self, after: Option<EntityId>) -> Option<EntityId> {
        self.column::<T>()?.next_after(after)
    }

    /// Iterate `(entity, &T)` pairs in spawn order.
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.column::<T>().into_iter().flat_map(|c| c.iter())
    }

    // -- inspection ---------------------------------------------------------

    /// Render every component on `entity` as JSON, keyed by registered name.
    ///
    /// Returns `None` if the entity is not alive.
    pub fn inspect(&self, entity: EntityId) -> Option<BTreeMap<String, serde_json::Value>> {
        if !self.live.contains(&entity) {
            return None;
        }
        let mut out = BTreeMap::new();
        for (idx, column) in self.columns.iter().enumerate() {
            let Some(value) = column.inspect(entity) else {
                continue;
            };
            if let Some(info) = self.registry.get_info(ComponentTypeId(idx as u32)) {
                out.insert(info.name.clone(), value);
            }
        }
        Some(out)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Pos {
        x: i32,
        y: i32,
    }
    impl Component for Pos {}

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Health(u32);
    impl Component for Health {}

    /// Counts how many times its hook ran and remembers the owner.
    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Hooked {
        owner: Option<EntityId>,
        attach_calls: u32,
    }
    impl Component for Hooked {
        fn on_attach(&mut self, entity: EntityId) {
            self.owner = Some(entity);
            self.attach_calls += 1;
        }
    }

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Pos>("position");
        world.register_component::<Health>("health");
        world.register_component::<Hooked>("hooked");
        world
    }

    #[test]
    fn create_attach_get() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Pos { x: 1, y: 2 }).unwrap();
        assert_eq!(world.get::<Pos>(e), Some(&Pos { x: 1, y: 2 }));
        assert!(world.has::<Pos>(e));
        assert!(!world.has::<Health>(e));
    }

    #[test]
    fn attach_replaces_existing() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Health(10)).unwrap();
        world.attach(e, Health(3)).unwrap();
        assert_eq!(world.get::<Health>(e), Some(&Health(3)));
        assert_eq!(world.count_with::<Health>(), 1);
    }

    #[test]
    fn attach_hook_runs_once_per_attach() {
        let mut world = setup_world();
        let e = world.create_entity();
        world
            .attach(
                e,
                Hooked {
                    owner: None,
                    attach_calls: 0,
                },
            )
            .unwrap();
        let hooked = world.get::<Hooked>(e).unwrap();
        assert_eq!(hooked.owner, Some(e));
        assert_eq!(hooked.attach_calls, 1);
    }

    #[test]
    fn attach_to_dead_entity_is_stale() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.destroy_entity(e);
        let err = world.attach(e, Health(1)).unwrap_err();
        assert!(matches!(err, EcsError::StaleEntity { .. }));
    }

    #[test]
    fn attach_unregistered_is_unknown() {
        #[derive(serde::Serialize)]
        struct Stray;
        impl Component for Stray {}

        let mut world = setup_world();
        let e = world.create_entity();
        let err = world.attach(e, Stray).unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent { .. }));
    }

    #[test]
    fn destroy_removes_all_components() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Pos { x: 0, y: 0 }).unwrap();
        world.attach(e, Health(5)).unwrap();
        assert!(world.destroy_entity(e));
        assert!(!world.is_alive(e));
        assert_eq!(world.get::<Pos>(e), None);
        assert_eq!(world.count_with::<Health>(), 0);
    }

    #[test]
    fn destroy_twice_is_noop() {
        let mut world = setup_world();
        let e = world.create_entity();
        assert!(world.destroy_entity(e));
        assert!(!world.destroy_entity(e));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn ids_are_not_reused_after_destroy() {
        let mut world = setup_world();
        let a = world.create_entity();
        world.destroy_entity(a);
        let b = world.create_entity();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn clear_resets_ids_and_live_set() {
        let mut world = setup_world();
        for _ in 0..4 {
            let e = world.create_entity();
            world.attach(e, Health(1)).unwrap();
        }
        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.count_with::<Health>(), 0);
        assert_eq!(world.create_entity().to_raw(), 0);
    }

    #[test]
    fn get_mut_modifies() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Pos { x: 0, y: 0 }).unwrap();
        if let Some(pos) = world.get_mut::<Pos>(e) {
            pos.x = 99;
        }
        assert_eq!(world.get::<Pos>(e), Some(&Pos { x: 99, y: 0 }));
    }

    #[test]
    fn detach_returns_value() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Health(7)).unwrap();
        assert_eq!(world.detach::<Health>(e), Some(Health(7)));
        assert!(!world.has::<Health>(e));
        assert_eq!(world.detach::<Health>(e), None);
    }

    #[test]
    fn entities_are_listed_in_spawn_order() {
        let mut world = setup_world();
        let ids: Vec<EntityId> = (0..5).map(|_| world.create_entity()).collect();
        world.destroy_entity(ids[2]);
        let live: Vec<EntityId> = world.entities().collect();
        assert_eq!(live, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn query_pairs_entities_with_values() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();
        world.attach(a, Health(1)).unwrap();
        world.attach(b, Health(2)).unwrap();
        let pairs: Vec<(EntityId, u32)> = world.query::<Health>().map(|(e, h)| (e, h.0)).collect();
        assert_eq!(pairs, vec![(a, 1), (b, 2)]);
    }

    #[test]
    fn inspect_uses_registered_names() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Pos { x: 3, y: 4 }).unwrap();
        world.attach(e, Health(9)).unwrap();
        let view = world.inspect(e).unwrap();
        assert_eq!(view["position"], serde_json::json!({"x": 3, "y": 4}));
        assert_eq!(view["health"], serde_json::json!(9));
        assert!(!view.contains_key("hooked"));

        world.destroy_entity(e);
        assert!(world.inspect(e).is_none());
    }
}
