//! Property tests for store operations.
//!
//! These tests use `proptest` to generate random sequences of store operations
//! and verify that world invariants hold after each sequence.

use std::collections::HashSet;

use proptest::prelude::*;
use tessera_ecs::prelude::*;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct Pos {
    x: i32,
    y: i32,
}
impl Component for Pos {}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct Strength(i64);
impl Component for Strength {}

/// Operations we can perform on the world.
#[derive(Debug, Clone)]
enum EcsOp {
    Create,
    CreateWithPos(i32, i32),
    Destroy(usize),
    AttachStrength(usize, i64),
    DetachStrength(usize),
    QueryPos,
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        Just(EcsOp::Create),
        (-500i32..500, -500i32..500).prop_map(|(x, y)| EcsOp::CreateWithPos(x, y)),
        (0..100usize).prop_map(EcsOp::Destroy),
        (0..100usize, -1000i64..1000).prop_map(|(i, s)| EcsOp::AttachStrength(i, s)),
        (0..100usize).prop_map(EcsOp::DetachStrength),
        Just(EcsOp::QueryPos),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn ecs_random_ops_preserve_invariants(ops in prop::collection::vec(ecs_op_strategy(), 1..60)) {
        let mut world = World::new();
        world.register_component::<Pos>("pos");
        world.register_component::<Strength>("strength");

        let mut alive: Vec<EntityId> = Vec::new();
        let mut ever_issued: HashSet<EntityId> = HashSet::new();

        for op in ops {
            match op {
                EcsOp::Create => {
                    let e = world.create_entity();
                    prop_assert!(ever_issued.insert(e), "id {:?} was reused", e);
                    alive.push(e);
                }
                EcsOp::CreateWithPos(x, y) => {
                    let e = world.create_entity();
                    prop_assert!(ever_issued.insert(e), "id {:?} was reused", e);
                    world.attach(e, Pos { x, y }).unwrap();
                    alive.push(e);
                }
                EcsOp::Destroy(idx) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        let e = alive.remove(idx);
                        prop_assert!(world.destroy_entity(e));
                        prop_assert!(!world.destroy_entity(e));
                    }
                }
                EcsOp::AttachStrength(idx, s) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        world.attach(alive[idx], Strength(s)).unwrap();
                        prop_assert_eq!(world.get::<Strength>(alive[idx]), Some(&Strength(s)));
                    }
                }
                EcsOp::DetachStrength(idx) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        world.detach::<Strength>(alive[idx]);
                        prop_assert!(!world.has::<Strength>(alive[idx]));
                    }
                }
                EcsOp::QueryPos => {
                    let count = world.entities_with::<Pos>().count();
                    prop_assert!(count <= alive.len());
                }
            }

            // Invariant: entity_count matches our tracking.
            prop_assert_eq!(world.entity_count(), alive.len());

            // Invariant: the live list is strictly increasing (spawn order).
            let live: Vec<EntityId> = world.entities().collect();
            prop_assert!(live.windows(2).all(|w| w[0] < w[1]));

            // Invariant: every component holder is alive.
            for e in world.entities_with::<Strength>() {
                prop_assert!(world.is_alive(e));
            }
        }
    }

    /// Destroyed ids must stay dead even after many later allocations.
    #[test]
    fn destroyed_ids_stay_dead(spawns in 1usize..40, later in 1usize..40) {
        let mut world = World::new();
        world.register_component::<Strength>("strength");

        let first: Vec<EntityId> = (0..spawns).map(|_| world.create_entity()).collect();
        for &e in &first {
            world.destroy_entity(e);
        }
        for _ in 0..later {
            let e = world.create_entity();
            prop_assert!(!first.contains(&e));
        }
        for &e in &first {
            prop_assert!(!world.is_alive(e));
            prop_assert!(world.attach(e, Strength(1)).is_err());
        }
    }
}
