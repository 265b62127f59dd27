//! The contract an event vocabulary implements to travel on the bus.

use std::fmt::Debug;
use std::hash::Hash;

use tessera_ecs::entity::EntityId;

/// An immutable record of something that happened.
///
/// `Kind` is the routing key: subscribers register against a kind and receive
/// every event whose [`kind`](Event::kind) matches.
pub trait Event: Debug + 'static {
    /// Discriminant used for subscription routing.
    type Kind: Copy + Eq + Hash + Debug;

    /// The routing kind of this event.
    fn kind(&self) -> Self::Kind;

    /// The entity this event originates from, if any.
    fn source(&self) -> Option<EntityId>;
}
