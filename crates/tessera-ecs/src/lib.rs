//! Tessera ECS -- the entity/component store behind the simulation core.
//!
//! Entities are monotonically numbered handles that own at most one component
//! of each registered kind. Components live in per-kind columns ordered by
//! entity id, so every iteration visits entities in spawn order.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize)]
//! struct Position { x: i32, y: i32 }
//! impl Component for Position {}
//!
//! let mut world = World::new();
//! world.register_component::<Position>("position");
//!
//! let entity = world.create_entity();
//! world.attach(entity, Position { x: 3, y: 4 }).unwrap();
//!
//! assert_eq!(world.get::<Position>(entity), Some(&Position { x: 3, y: 4 }));
//! assert_eq!(world.entities_with::<Position>().count(), 1);
//! ```

#![deny(unsafe_code)]

mod column;
pub mod component;
pub mod entity;
pub mod query;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (destroyed or never allocated).
    #[error("entity {entity:?} does not exist (destroyed or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A component type was referenced that has not been registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentInfo, ComponentRegistry, ComponentTypeId};
    pub use crate::entity::EntityId;
    pub use crate::query::EntitiesWith;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Position {
        x: i32,
        y: i32,
    }
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Resources(i64);
    impl Component for Resources {}

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Position>("position");
        world.register_component::<Resources>("resources");
        world
    }

    #[test]
    fn spawn_entities_with_components_and_query_back() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Position { x: 1, y: 2 }).unwrap();
        world.attach(e, Resources(50)).unwrap();

        assert_eq!(world.get::<Position>(e), Some(&Position { x: 1, y: 2 }));
        assert_eq!(world.get::<Resources>(e), Some(&Resources(50)));
    }

    #[test]
    fn destroy_entity_verify_gone() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.attach(e, Position { x: 0, y: 0 }).unwrap();
        world.destroy_entity(e);
        assert!(!world.is_alive(e));
        assert_eq!(world.get::<Position>(e), None);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn queries_only_see_matching_kinds() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();
        world.attach(a, Position { x: 0, y: 0 }).unwrap();
        world.attach(b, Position { x: 1, y: 1 }).unwrap();
        world.attach(b, Resources(10)).unwrap();

        assert_eq!(world.entities_with::<Position>().count(), 2);
        assert_eq!(world.entities_with::<Resources>().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn error_messages_name_the_problem() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.destroy_entity(e);
        let err = world.attach(e, Resources(1)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
