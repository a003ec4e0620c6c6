//! Property tests for ECS operations.
//!
//! These tests use `proptest` to generate random sequences of world operations
//! and verify that registry, store and query invariants hold after each step.

use shotline_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Clip {
    start: i64,
    duration: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Muted;

#[derive(Debug, Clone, PartialEq)]
struct Tag(u32);

/// Operations we can perform on the world.
#[derive(Debug, Clone)]
enum EcsOp {
    Create,
    CreateClip(i64, i64),
    Destroy(usize),
    DestroyStale(usize),
    AttachMuted(usize),
    DetachMuted(usize),
    SetTag(usize, u32),
    Update,
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        Just(EcsOp::Create),
        (-1000i64..1000, 0i64..1000).prop_map(|(s, d)| EcsOp::CreateClip(s, d)),
        (0..100usize).prop_map(EcsOp::Destroy),
        (0..100usize).prop_map(EcsOp::DestroyStale),
        (0..100usize).prop_map(EcsOp::AttachMuted),
        (0..100usize).prop_map(EcsOp::DetachMuted),
        (0..100usize, any::<u32>()).prop_map(|(i, v)| EcsOp::SetTag(i, v)),
        Just(EcsOp::Update),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_ops_preserve_invariants(ops in prop::collection::vec(ecs_op_strategy(), 1..60)) {
        let mut world = World::new();
        let mut alive: Vec<Entity> = Vec::new();
        let mut dead: Vec<Entity> = Vec::new();

        for op in ops {
            match op {
                EcsOp::Create => {
                    alive.push(world.create_entity().unwrap());
                }
                EcsOp::CreateClip(start, duration) => {
                    let e = world.create_entity().unwrap();
                    world.add_component(e, Clip { start, duration });
                    alive.push(e);
                }
                EcsOp::Destroy(idx) => {
                    if !alive.is_empty() {
                        let e = alive.remove(idx % alive.len());
                        prop_assert!(world.destroy_entity(e));
                        dead.push(e);
                    }
                }
                EcsOp::DestroyStale(idx) => {
                    if !dead.is_empty() {
                        let e = dead[idx % dead.len()];
                        prop_assert!(!world.destroy_entity(e));
                    }
                }
                EcsOp::AttachMuted(idx) => {
                    if !alive.is_empty() {
                        let e = alive[idx % alive.len()];
                        prop_assert!(world.add_component(e, Muted).is_some());
                    }
                }
                EcsOp::DetachMuted(idx) => {
                    if !alive.is_empty() {
                        let e = alive[idx % alive.len()];
                        let had = world.has_component::<Muted>(e);
                        prop_assert_eq!(world.remove_component::<Muted>(e), had);
                    }
                }
                EcsOp::SetTag(idx, v) => {
                    if !alive.is_empty() {
                        let e = alive[idx % alive.len()];
                        world.add_component(e, Tag(v));
                        prop_assert_eq!(world.get_component::<Tag>(e), Some(&Tag(v)));
                    }
                }
                EcsOp::Update => {
                    world.update(0.016);
                    prop_assert_eq!(world.entity_registry().entities().len(), alive.len());
                }
            }

            // Invariant: entity_count matches our tracking.
            prop_assert_eq!(world.entity_count(), alive.len());

            // Invariant: every tracked handle is alive, every stale one is not.
            for &e in &alive {
                prop_assert!(world.is_alive(e));
            }
            for &e in &dead {
                prop_assert!(!world.is_alive(e));
                prop_assert!(world.get_component::<Tag>(e).is_none());
            }

            // Invariant: the exclude query is exactly the complement within Clip.
            let with_clip = world.entities_with::<Clip>().len();
            let unmuted = world
                .query_entities(&Query::new().require::<Clip>().exclude::<Muted>())
                .count();
            let muted = world
                .query_entities(&Query::new().require::<Clip>().require::<Muted>())
                .count();
            prop_assert_eq!(unmuted + muted, with_clip);
        }
    }

    /// After destroying an entity, every access through the old handle fails,
    /// even once its id has been recycled.
    #[test]
    fn stale_handles_never_revive(
        spawn_count in 1..20usize,
        destroy_indices in prop::collection::vec(0..20usize, 1..10),
    ) {
        let mut world = World::new();
        let mut entities: Vec<Entity> = (0..spawn_count)
            .map(|i| {
                let e = world.create_entity().unwrap();
                world.add_component(e, Tag(i as u32));
                e
            })
            .collect();

        let mut stale: Vec<Entity> = Vec::new();
        for &idx in &destroy_indices {
            if !entities.is_empty() {
                let e = entities.remove(idx % entities.len());
                world.destroy_entity(e);
                stale.push(e);
            }
        }
        world.update(0.0);

        for _ in 0..stale.len() {
            let e = world.create_entity().unwrap();
            world.add_component(e, Tag(999));
            entities.push(e);
        }

        for &old in &stale {
            prop_assert!(!world.is_alive(old));
            prop_assert_eq!(world.get_component::<Tag>(old), None);
            let current = world.lookup_entity(old.id());
            prop_assert!(current.generation() > old.generation());
        }
        for &e in &entities {
            prop_assert!(world.is_alive(e));
            prop_assert!(world.get_component::<Tag>(e).is_some());
        }
    }

    /// Attach then read returns the value; remove then read returns nothing.
    #[test]
    fn add_get_remove_round_trip(start in any::<i64>(), duration in any::<i64>()) {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        let clip = Clip { start, duration };
        world.add_component(e, clip.clone());
        prop_assert_eq!(world.get_component::<Clip>(e), Some(&clip));
        prop_assert!(world.remove_component::<Clip>(e));
        prop_assert_eq!(world.get_component::<Clip>(e), None);
    }
}
