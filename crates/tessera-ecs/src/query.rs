//! Lazy iteration over entities by component kind.
//!
//! [`EntitiesWith`] is a cursor, not a snapshot: every step asks the column
//! for the first entity after the last one yielded. Calling
//! [`World::entities_with`] again starts a fresh evaluation against whatever
//! the store holds at that moment.
//!
//! Code that needs to mutate the world while walking a kind uses the same
//! cursor by hand through [`World::next_with`]:
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, serde::Serialize)]
//! struct Doomed;
//! impl Component for Doomed {}
//!
//! let mut world = World::new();
//! world.register_component::<Doomed>("doomed");
//! for _ in 0..3 {
//!     let e = world.create_entity();
//!     world.attach(e, Doomed).unwrap();
//! }
//!
//! let mut cursor = None;
//! while let Some(e) = world.next_with::<Doomed>(cursor) {
//!     cursor = Some(e);
//!     world.destroy_entity(e);
//! }
//! assert_eq!(world.entity_count(), 0);
//! ```

use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;

/// Iterator over the ids of every entity carrying a `T`, in spawn order.
pub struct EntitiesWith<'w, T> {
    world: &'w World,
    cursor: Option<EntityId>,
    done: bool,
    _kind: PhantomData<fn() -> T>,
}

impl<'w, T: Component> EntitiesWith<'w, T> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            cursor: None,
            done: false,
            _kind: PhantomData,
        }
    }
}

impl<T: Component> Iterator for EntitiesWith<'_, T> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        if self.done {
            return None;
        }
        match self.world.next_with::<T>(self.cursor) {
            Some(e) => {
                self.cursor = Some(e);
                Some(e)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
