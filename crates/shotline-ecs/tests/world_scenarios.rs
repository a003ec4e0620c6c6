//! End-to-end world scenarios: hooks, mid-iteration mutation, system
//! lifecycle ordering and time scaling.

use std::cell::RefCell;
use std::rc::Rc;

use shotline_ecs::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Clip {
    name: String,
    start_time: f64,
    duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Expired;

type Log = Rc<RefCell<Vec<String>>>;

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

#[test]
fn hooks_fire_for_add_replace_remove_and_destroy() {
    let log = Log::default();
    let mut world = World::new();

    let (on_attach, on_detach) = (Rc::clone(&log), Rc::clone(&log));
    world.set_component_hooks(
        ComponentHooks::<Clip>::new()
            .on_attach(move |_, c| on_attach.borrow_mut().push(format!("attach {}", c.name)))
            .on_detach(move |_, c| on_detach.borrow_mut().push(format!("detach {}", c.name))),
    );

    let e = world.create_entity().unwrap();
    let clip = |name: &str| Clip {
        name: name.into(),
        start_time: 0.0,
        duration: 1.0,
    };
    world.add_component(e, clip("a"));
    world.add_component(e, clip("b"));
    world.remove_component::<Clip>(e);
    world.add_component(e, clip("c"));
    world.destroy_entity(e);

    assert_eq!(
        *log.borrow(),
        vec!["attach a", "detach a", "attach b", "detach b", "attach c", "detach c"]
    );
}

#[test]
fn attach_hook_can_edit_the_stored_value() {
    let mut world = World::new();
    world.set_component_hooks(ComponentHooks::<Clip>::new().on_attach(|_, c| {
        if c.duration < 0.0 {
            c.duration = 0.0;
        }
    }));
    let e = world.create_entity().unwrap();
    let stored = world
        .add_component(
            e,
            Clip {
                name: "neg".into(),
                start_time: 1.0,
                duration: -3.0,
            },
        )
        .unwrap();
    assert_eq!(stored.duration, 0.0);
}

// ---------------------------------------------------------------------------
// Mutation during iteration
// ---------------------------------------------------------------------------

#[test]
fn cursor_survives_destroy_and_create_mid_walk() {
    let mut world = World::new();
    let mut all = Vec::new();
    for i in 0..10 {
        let e = world.create_entity().unwrap();
        if i % 2 == 0 {
            world.add_component(e, Expired);
        }
        all.push(e);
    }

    let mut visited = Vec::new();
    let mut cursor = world.query_cursor(Query::new().require::<Expired>());
    while let Some(e) = cursor.advance(&world) {
        visited.push(e);
        world.destroy_entity(e);
        // A replacement without the marker must not be visited.
        world.create_entity().unwrap();
    }

    assert_eq!(visited.len(), 5);
    assert_eq!(world.entity_count(), 10);
    assert!(world.entities_with::<Expired>().is_empty());
}

#[test]
fn cursor_skips_entities_destroyed_ahead_of_it() {
    let mut world = World::new();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    world.add_component(a, Expired);
    world.add_component(b, Expired);

    let mut cursor = world.query_cursor(Query::new().require::<Expired>());
    assert_eq!(cursor.advance(&world), Some(a));
    world.destroy_entity(b);
    assert_eq!(cursor.advance(&world), None);
}

#[test]
fn optional_types_do_not_narrow_results() {
    let mut world = World::new();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    world.add_component(
        a,
        Clip {
            name: "a".into(),
            start_time: 0.0,
            duration: 1.0,
        },
    );
    world.add_component(
        b,
        Clip {
            name: "b".into(),
            start_time: 1.0,
            duration: 1.0,
        },
    );
    world.add_component(b, Expired);

    let q = Query::new().require::<Clip>().optional::<Expired>();
    assert_eq!(world.query_entities(&q).collect::<Vec<_>>(), vec![a, b]);
}

#[test]
fn unregistered_required_type_matches_nothing() {
    struct NeverAdded;

    let mut world = World::new();
    let e = world.create_entity().unwrap();
    world.add_component(e, Expired);

    assert_eq!(
        world
            .query_entities(&Query::new().require::<NeverAdded>())
            .count(),
        0
    );
    assert_eq!(
        world
            .query_entities(&Query::new().require::<Expired>().exclude::<NeverAdded>())
            .count(),
        1
    );
}

// ---------------------------------------------------------------------------
// System lifecycle
// ---------------------------------------------------------------------------

struct Recorder {
    name: &'static str,
    priority: i32,
    log: Log,
}

impl System for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn initialize(&mut self, _world: &mut World) {
        self.log.borrow_mut().push(format!("init {}", self.name));
    }

    fn update(&mut self, _world: &mut World, dt: f64) {
        self.log.borrow_mut().push(format!("update {} {dt}", self.name));
    }

    fn cleanup(&mut self, _world: &mut World) {
        self.log.borrow_mut().push(format!("cleanup {}", self.name));
    }
}

fn recorder(name: &'static str, priority: i32, log: &Log) -> Recorder {
    Recorder {
        name,
        priority,
        log: Rc::clone(log),
    }
}

#[test]
fn full_lifecycle_runs_in_priority_order() {
    let log = Log::default();
    let mut world = World::new();
    world.register_system(recorder("render", 1000, &log)).unwrap();
    world.register_system(recorder("timeline", 0, &log)).unwrap();

    world.initialize();
    world.update(0.5);
    world.cleanup();

    assert_eq!(
        *log.borrow(),
        vec![
            "init timeline",
            "init render",
            "update timeline 0.5",
            "update render 0.5",
            "cleanup timeline",
            "cleanup render",
        ]
    );
}

#[test]
fn zero_time_scale_freezes_deltas() {
    let log = Log::default();
    let mut world = World::new();
    world.register_system(recorder("timeline", 0, &log)).unwrap();
    world.set_time_scale(0.0).unwrap();
    world.update(1.0);

    assert_eq!(log.borrow().last().map(String::as_str), Some("update timeline 0"));
    assert_eq!(world.elapsed(), 0.0);
    assert_eq!(world.tick_count(), 1);
}

/// Destroys every `Expired` entity it sees.
struct Reaper;

impl System for Reaper {
    fn name(&self) -> &str {
        "reaper"
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        let mut cursor = world.query_cursor(Query::new().require::<Expired>());
        while let Some(e) = cursor.advance(world) {
            world.destroy_entity(e);
        }
    }
}

#[test]
fn system_can_destroy_entities_during_update() {
    let mut world = World::new();
    for i in 0..6 {
        let e = world.create_entity().unwrap();
        if i < 4 {
            world.add_component(e, Expired);
        }
    }
    world.register_system(Reaper).unwrap();
    world.update(0.016);

    assert_eq!(world.entity_count(), 2);
    assert_eq!(world.entity_registry().entities().len(), 2);
    assert_eq!(world.component_count(), 0);
}
