//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a plain, monotonically increasing 64-bit counter. Ids are
//! never recycled during a world's lifetime; the only way to see an id again
//! is a full [`EntityAllocator::reset`], which the world performs when it is
//! regenerated from scratch.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque entity identifier.
///
/// Ordering follows allocation order, so sorting ids yields spawn order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out fresh [`EntityId`]s in strictly increasing order.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Create a new allocator starting at id 0.
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate the next unused id.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Restart numbering from zero. Only valid once every outstanding id has
    /// been discarded.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_monotonic() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<EntityId> = (0..100).map(|_| alloc.allocate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0].to_raw(), 0);
        assert_eq!(ids[99].to_raw(), 99);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut alloc = EntityAllocator::new();
        alloc.allocate();
        alloc.allocate();
        alloc.reset();
        assert_eq!(alloc.allocate().to_raw(), 0);
    }

    #[test]
    fn entity_id_roundtrip() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.to_raw(), 42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
    }
}
