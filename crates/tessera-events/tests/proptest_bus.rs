//! Property tests for queue promotion.
//!
//! A simple two-queue model predicts exactly which events each flush delivers;
//! the bus must agree with it for arbitrary interleavings.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tessera_ecs::prelude::EntityId;
use tessera_events::prelude::*;

#[derive(Debug, Clone)]
struct Tagged(u32);

impl Event for Tagged {
    type Kind = ();
    fn kind(&self) {}
    fn source(&self) -> Option<EntityId> {
        None
    }
}

#[derive(Debug, Clone)]
enum Op {
    Enqueue,
    EnqueueNextTick,
    Flush,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Enqueue),
        Just(Op::EnqueueNextTick),
        Just(Op::Flush),
    ]
}

proptest! {
    #[test]
    fn flush_matches_two_queue_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new();
        bus.subscribe((), move |ev: &Tagged, _: &mut EventOutbox<Tagged>| {
            sink.borrow_mut().push(ev.0);
            Ok(())
        });

        let mut model_queue: Vec<u32> = Vec::new();
        let mut model_deferred: Vec<u32> = Vec::new();
        let mut next = 0u32;

        for op in ops {
            match op {
                Op::Enqueue => {
                    bus.enqueue(Tagged(next));
                    model_queue.push(next);
                    next += 1;
                }
                Op::EnqueueNextTick => {
                    bus.enqueue_next_tick(Tagged(next));
                    model_deferred.push(next);
                    next += 1;
                }
                Op::Flush => {
                    seen.borrow_mut().clear();
                    let report = bus.flush().unwrap();
                    let expected: Vec<u32> = std::mem::take(&mut model_queue);
                    prop_assert_eq!(&*seen.borrow(), &expected);
                    prop_assert_eq!(report.events, expected.len());
                    prop_assert_eq!(report.promoted, model_deferred.len());
                    model_queue.append(&mut model_deferred);
                }
            }
            prop_assert_eq!(bus.queued_len(), model_queue.len());
            prop_assert_eq!(bus.deferred_len(), model_deferred.len());
        }
    }
}
