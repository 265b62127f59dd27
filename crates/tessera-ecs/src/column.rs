//! Per-kind component storage.
//!
//! Each registered component kind owns one [`Column`], a sorted map from
//! [`EntityId`] to the component value. Keeping columns ordered by id means
//! every iteration over a kind visits entities in spawn order, which is what
//! makes system passes deterministic.

use std::any::Any;
use std::collections::BTreeMap;

use crate::component::Component;
use crate::entity::EntityId;

/// Type-erased operations the world needs on every column without knowing the
/// concrete component type.
pub(crate) trait ErasedColumn: Send + Sync {
    fn contains(&self, entity: EntityId) -> bool;
    fn remove(&mut self, entity: EntityId) -> bool;
    fn clear(&mut self);
    fn len(&self) -> usize;
    /// Render the entity's component as JSON for inspection.
    fn inspect(&self, entity: EntityId) -> Option<serde_json::Value>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed storage for one component kind.
pub(crate) struct Column<T> {
    values: BTreeMap<EntityId, T>,
}

impl<T: Component> Column<T> {
    pub(crate) fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Insert or replace. Returns the previous value, if any.
    pub(crate) fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.values.insert(entity, value)
    }

    pub(crate) fn take(&mut self, entity: EntityId) -> Option<T> {
        self.values.remove(&entity)
    }

    pub(crate) fn get(&self, entity: EntityId) -> Option<&T> {
        self.values.get(&entity)
    }

    pub(crate) fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.values.get_mut(&entity)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.values.iter().map(|(e, v)| (*e, v))
    }

    /// First stored entity strictly after `after` (or the first overall).
    pub(crate) fn next_after(&self, after: Option<EntityId>) -> Option<EntityId> {
        match after {
            None => self.values.keys().next().copied(),
            Some(prev) => self
                .values
                .range((std::ops::Bound::Excluded(prev), std::ops::Bound::Unbounded))
                .next()
                .map(|(e, _)| *e),
        }
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn contains(&self, entity: EntityId) -> bool {
        self.values.contains_key(&entity)
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        self.values.remove(&entity).is_some()
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn inspect(&self, entity: EntityId) -> Option<serde_json::Value> {
        let value = self.values.get(&entity)?;
        match serde_json::to_value(value) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!(
                    entity = %entity,
                    component = std::any::type_name::<T>(),
                    error = %e,
                    "component failed to serialize for inspection"
                );
                None
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
