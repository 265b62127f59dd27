//! The event bus: subscription table plus the two delivery queues.
//!
//! # Flush semantics
//!
//! [`EventBus::flush`] runs once per tick, after every system has run:
//!
//! 1. The current-tick queue is drained in FIFO order. Only the events present
//!    when the flush starts are delivered; anything a handler enqueues during
//!    the flush waits for the next one.
//! 2. Every deferred (next-tick) event moves into the current-tick queue.
//!
//! Handler failures are not caught. The first failing handler aborts the pass:
//! the remaining events of the drained batch are dropped, the deferred queue
//! is left unpromoted, and the error is returned to the caller.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::event::Event;
use crate::{EventError, HandlerError};

// ---------------------------------------------------------------------------
// SubscriptionId
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::subscribe`], used to remove that exact
/// handler later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

// ---------------------------------------------------------------------------
// EventOutbox
// ---------------------------------------------------------------------------

/// Events a handler wants to publish as a consequence of the one it is
/// handling. Appended to the bus queues after the handler returns.
#[derive(Debug)]
pub struct EventOutbox<E> {
    this_tick: Vec<E>,
    next_tick: Vec<E>,
}

impl<E> EventOutbox<E> {
    fn new() -> Self {
        Self {
            this_tick: Vec::new(),
            next_tick: Vec::new(),
        }
    }

    /// Queue for the next flush.
    pub fn enqueue(&mut self, event: E) {
        self.this_tick.push(event);
    }

    /// Queue for the flush after next.
    pub fn enqueue_next_tick(&mut self, event: E) {
        self.next_tick.push(event);
    }
}

// ---------------------------------------------------------------------------
// Handler storage
// ---------------------------------------------------------------------------

type Handler<E> = Box<dyn FnMut(&E, &mut EventOutbox<E>) -> Result<(), HandlerError>>;

struct Subscriber<E> {
    id: SubscriptionId,
    handler: Handler<E>,
}

impl<E> fmt::Debug for Subscriber<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber({:?})", self.id)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Running totals since the bus was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Events published through any mode.
    pub published: u64,
    /// Individual handler invocations that returned `Ok`.
    pub deliveries: u64,
    /// Completed flush passes.
    pub flushes: u64,
}

/// Outcome of one successful flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Events drained from the current-tick queue.
    pub events: usize,
    /// Handler invocations made while draining.
    pub deliveries: usize,
    /// Deferred events promoted for the next flush.
    pub promoted: usize,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Typed publish/subscribe hub.
pub struct EventBus<E: Event> {
    subscribers: HashMap<E::Kind, Vec<Subscriber<E>>>,
    queue: VecDeque<E>,
    deferred: VecDeque<E>,
    next_subscription: u64,
    stats: BusStats,
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_kinds", &self.subscribers.len())
            .field("queued", &self.queue.len())
            .field("deferred", &self.deferred.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            queue: VecDeque::new(),
            deferred: VecDeque::new(),
            next_subscription: 0,
            stats: BusStats::default(),
        }
    }

    // -- subscriptions ------------------------------------------------------

    /// Register a handler for `kind`. Handlers for the same kind run in
    /// subscription order.
    pub fn subscribe<F>(&mut self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E, &mut EventOutbox<E>) -> Result<(), HandlerError> + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.entry(kind).or_default().push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a previously registered handler.
    ///
    /// Returns `false` if no such subscription exists for `kind`.
    pub fn unsubscribe(&mut self, kind: E::Kind, id: SubscriptionId) -> bool {
        let Some(list) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.subscribers.remove(&kind);
        }
        removed
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    // -- publishing ---------------------------------------------------------

    /// Deliver `event` now to every current subscriber of its kind.
    ///
    /// Returns the number of handlers invoked.
    pub fn raise(&mut self, event: E) -> Result<usize, EventError> {
        self.stats.published += 1;
        self.dispatch(&event)
    }

    /// Queue `event` for the next flush.
    pub fn enqueue(&mut self, event: E) {
        self.stats.published += 1;
        self.queue.push_back(event);
    }

    /// Queue `event` for the flush after next.
    pub fn enqueue_next_tick(&mut self, event: E) {
        self.stats.published += 1;
        self.deferred.push_back(event);
    }

    fn dispatch(&mut self, event: &E) -> Result<usize, EventError> {
        let kind = event.kind();
        let Some(list) = self.subscribers.get_mut(&kind) else {
            tracing::trace!(kind = ?kind, "event raised with no subscribers");
            return Ok(0);
        };

        let mut outbox = EventOutbox::new();
        let mut delivered = 0;
        for subscriber in list.iter_mut() {
            let result = (subscriber.handler)(event, &mut outbox);
            // Whatever the handler published before failing still stands.
            self.queue.extend(outbox.this_tick.drain(..));
            self.deferred.extend(outbox.next_tick.drain(..));
            if let Err(source) = result {
                tracing::debug!(
                    kind = ?kind,
                    subscription = ?subscriber.id,
                    error = %source,
                    "event handler failed"
                );
                return Err(EventError::Handler {
                    kind: format!("{kind:?}"),
                    subscription: subscriber.id,
                    source,
                });
            }
            delivered += 1;
            self.stats.deliveries += 1;
        }
        Ok(delivered)
    }

    // -- flushing -----------------------------------------------------------

    /// Drain the current-tick queue, then promote deferred events.
    pub fn flush(&mut self) -> Result<FlushReport, EventError> {
        let batch: Vec<E> = self.queue.drain(..).collect();
        let mut report = FlushReport {
            events: batch.len(),
            ..FlushReport::default()
        };

        for event in &batch {
            report.deliveries += self.dispatch(event)?;
        }

        report.promoted = self.deferred.len();
        self.queue.extend(self.deferred.drain(..));
        self.stats.flushes += 1;

        tracing::trace!(
            events = report.events,
            deliveries = report.deliveries,
            promoted = report.promoted,
            "event bus flushed"
        );
        Ok(report)
    }

    /// Drop every queued and deferred event. Subscriptions are kept.
    pub fn clear_pending(&mut self) {
        self.queue.clear();
        self.deferred.clear();
    }

    // -- accessors ----------------------------------------------------------

    /// Events waiting for the next flush.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Events waiting for the flush after next.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Running totals.
    pub fn stats(&self) -> BusStats {
        self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tessera_ecs::entity::EntityId;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Ev {
        kind: Kind,
        n: u32,
    }

    impl Event for Ev {
        type Kind = Kind;
        fn kind(&self) -> Kind {
            self.kind
        }
        fn source(&self) -> Option<EntityId> {
            None
        }
    }

    fn a(n: u32) -> Ev {
        Ev { kind: Kind::A, n }
    }

    fn b(n: u32) -> Ev {
        Ev { kind: Kind::B, n }
    }

    type Log = Rc<RefCell<Vec<(char, u32)>>>;

    fn recorder(log: &Log, tag: char) -> impl FnMut(&Ev, &mut EventOutbox<Ev>) -> Result<(), HandlerError> {
        let log = Rc::clone(log);
        move |ev, _| {
            log.borrow_mut().push((tag, ev.n));
            Ok(())
        }
    }

    #[test]
    fn raise_delivers_in_subscription_order() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, recorder(&log, 'x'));
        bus.subscribe(Kind::A, recorder(&log, 'y'));
        bus.subscribe(Kind::B, recorder(&log, 'z'));

        assert_eq!(bus.raise(a(1)).unwrap(), 2);
        assert_eq!(*log.borrow(), vec![('x', 1), ('y', 1)]);
    }

    #[test]
    fn raise_without_subscribers_is_fine() {
        let mut bus = EventBus::<Ev>::new();
        assert_eq!(bus.raise(a(1)).unwrap(), 0);
    }

    #[test]
    fn enqueue_waits_for_flush() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, recorder(&log, 'x'));

        bus.enqueue(a(1));
        bus.enqueue(a(2));
        assert!(log.borrow().is_empty());

        let report = bus.flush().unwrap();
        assert_eq!(report.events, 2);
        assert_eq!(report.deliveries, 2);
        assert_eq!(*log.borrow(), vec![('x', 1), ('x', 2)]);
    }

    #[test]
    fn next_tick_events_need_two_flushes() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, recorder(&log, 'x'));

        bus.enqueue_next_tick(a(7));
        let first = bus.flush().unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(first.promoted, 1);

        bus.flush().unwrap();
        assert_eq!(*log.borrow(), vec![('x', 7)]);

        bus.flush().unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn events_enqueued_during_flush_wait_for_next_flush() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, |ev: &Ev, outbox: &mut EventOutbox<Ev>| {
            outbox.enqueue(b(ev.n * 10));
            Ok(())
        });
        bus.subscribe(Kind::B, recorder(&log, 'b'));

        bus.enqueue(a(1));
        bus.flush().unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(bus.queued_len(), 1);

        bus.flush().unwrap();
        assert_eq!(*log.borrow(), vec![('b', 10)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        let first = bus.subscribe(Kind::A, recorder(&log, 'x'));
        bus.subscribe(Kind::A, recorder(&log, 'y'));

        assert!(bus.unsubscribe(Kind::A, first));
        assert!(!bus.unsubscribe(Kind::A, first));
        assert!(!bus.unsubscribe(Kind::B, first));

        bus.raise(a(3)).unwrap();
        assert_eq!(*log.borrow(), vec![('y', 3)]);
        assert_eq!(bus.subscriber_count(Kind::A), 1);
    }

    #[test]
    fn failing_handler_aborts_rest_of_flush() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, |ev: &Ev, _: &mut EventOutbox<Ev>| {
            if ev.n == 2 {
                return Err("boom".into());
            }
            Ok(())
        });
        bus.subscribe(Kind::A, recorder(&log, 'x'));

        bus.enqueue(a(1));
        bus.enqueue(a(2));
        bus.enqueue(a(3));
        bus.enqueue_next_tick(a(4));

        let err = bus.flush().unwrap_err();
        assert!(matches!(err, EventError::Handler { .. }));
        assert!(err.to_string().contains("boom"));
        // Event 1 fully delivered; event 2 stopped before the second handler;
        // event 3 never delivered.
        assert_eq!(*log.borrow(), vec![('x', 1)]);
        // The deferred event was not promoted.
        assert_eq!(bus.deferred_len(), 1);
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn stats_track_totals() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, recorder(&log, 'x'));
        bus.raise(a(1)).unwrap();
        bus.enqueue(a(2));
        bus.enqueue_next_tick(b(3));
        bus.flush().unwrap();

        let stats = bus.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.flushes, 1);
    }

    #[test]
    fn clear_pending_keeps_subscriptions() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.subscribe(Kind::A, recorder(&log, 'x'));
        bus.enqueue(a(1));
        bus.enqueue_next_tick(a(2));
        bus.clear_pending();
        bus.flush().unwrap();
        bus.flush().unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(bus.subscriber_count(Kind::A), 1);
    }
}
