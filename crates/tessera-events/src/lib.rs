//! Tessera Events -- typed publish/subscribe with immediate and deferred
//! delivery.
//!
//! The [`EventBus`] is generic over the event vocabulary: any type that
//! implements [`Event`] (a kind discriminant plus the originating entity) can be
//! routed through it. Three delivery modes are supported:
//!
//! - [`EventBus::raise`] delivers synchronously to every current subscriber.
//! - [`EventBus::enqueue`] holds the event until the next [`EventBus::flush`].
//! - [`EventBus::enqueue_next_tick`] holds the event for one extra flush.
//!
//! # Quick Start
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tessera_ecs::prelude::EntityId;
//! use tessera_events::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Ping;
//!
//! impl Event for Ping {
//!     type Kind = ();
//!     fn kind(&self) {}
//!     fn source(&self) -> Option<EntityId> { None }
//! }
//!
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//!
//! let mut bus = EventBus::<Ping>::new();
//! bus.subscribe((), move |_event, _outbox| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! bus.enqueue_next_tick(Ping);
//! bus.flush().unwrap();
//! assert_eq!(seen.get(), 0);
//! bus.flush().unwrap();
//! assert_eq!(seen.get(), 1);
//! ```

#![deny(unsafe_code)]

pub mod bus;
pub mod event;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Boxed error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while delivering events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A subscriber returned an error; delivery of the current pass stopped.
    #[error("handler {subscription:?} for event kind {kind} failed: {source}")]
    Handler {
        /// Debug rendering of the event kind being delivered.
        kind: String,
        /// The subscription whose handler failed.
        subscription: bus::SubscriptionId,
        /// The handler's own error.
        #[source]
        source: HandlerError,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bus::{BusStats, EventBus, EventOutbox, FlushReport, SubscriptionId};
    pub use crate::event::Event;
    pub use crate::{EventError, HandlerError};
}
