//! The [`World`] ties the entity registry, component store and system
//! registry into a single lifecycle.

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentHooks, ComponentStore};
use crate::entity::{Entity, EntityRegistry, DEFAULT_MAX_ENTITIES};
use crate::query::{EntityView, Query, QueryCursor};
use crate::system::{System, SystemRegistry};
use crate::EcsError;

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Construction parameters for a [`World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Hard ceiling on entity ids handed out.
    pub max_entities: usize,
    /// Multiplier applied to every `update` delta before systems see it.
    pub time_scale: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            time_scale: 1.0,
        }
    }
}

fn check_time_scale(value: f64) -> Result<f64, EcsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EcsError::InvalidTimeScale { value })
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Top-level ECS container.
///
/// Each [`update`](Self::update) runs the registered systems in priority
/// order, then sweeps components of dead entities, then compacts the
/// live-entity list.
pub struct World {
    entities: EntityRegistry,
    components: ComponentStore,
    systems: SystemRegistry,
    time_scale: f64,
    initialized: bool,
    tick_count: u64,
    /// Sum of scaled deltas passed to systems.
    elapsed: f64,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entities.alive_count())
            .field("component_count", &self.components.count())
            .field("systems", &self.systems.names())
            .field("time_scale", &self.time_scale)
            .field("tick_count", &self.tick_count)
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityRegistry::new(),
            components: ComponentStore::new(),
            systems: SystemRegistry::new(),
            time_scale: 1.0,
            initialized: false,
            tick_count: 0,
            elapsed: 0.0,
        }
    }

    /// # Errors
    ///
    /// [`EcsError::InvalidTimeScale`] for a negative or non-finite scale.
    pub fn with_config(config: WorldConfig) -> Result<Self, EcsError> {
        let time_scale = check_time_scale(config.time_scale)?;
        Ok(Self {
            entities: EntityRegistry::with_capacity_limit(config.max_entities),
            time_scale,
            ..Self::new()
        })
    }

    // -- lifecycle ------------------------------------------------------------

    /// Sort and initialize systems. [`update`](Self::update) calls this on
    /// its first run if nobody did.
    pub fn initialize(&mut self) {
        self.initialized = true;
        let mut systems = std::mem::take(&mut self.systems);
        systems.initialize_all(self);
        self.reattach_systems(systems);
    }

    /// Advance one tick.
    ///
    /// `delta_time` is multiplied by the time scale before systems see it.
    /// Components of destroyed entities are swept before the live-entity list
    /// is compacted.
    pub fn update(&mut self, delta_time: f64) {
        if !self.initialized {
            self.initialize();
        }
        let scaled = delta_time * self.time_scale;

        let mut systems = std::mem::take(&mut self.systems);
        systems.update_all(self, scaled);
        self.reattach_systems(systems);

        let swept = self.components.sweep(&self.entities);
        let compacted = self.entities.compact();

        self.tick_count += 1;
        self.elapsed += scaled;
        tracing::trace!(
            tick = self.tick_count,
            delta = scaled,
            swept,
            compacted,
            "world tick complete"
        );
    }

    /// Tear down: clean up and drop every system, then remove every entity
    /// and component. Safe to call on a world that was never initialized.
    pub fn cleanup(&mut self) {
        let mut systems = std::mem::take(&mut self.systems);
        systems.cleanup_all(self);
        // Anything registered by a cleanup hook is dropped as well.
        self.systems = SystemRegistry::new();

        self.components.clear();
        self.entities.clear();
        self.initialized = false;
        tracing::debug!("world cleaned up");
    }

    /// Put the registry back after running it detached, keeping anything that
    /// systems registered on the world in the meantime.
    fn reattach_systems(&mut self, systems: SystemRegistry) {
        let added = std::mem::replace(&mut self.systems, systems);
        if !added.is_empty() {
            self.systems.absorb(added);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Total scaled time handed to systems so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// # Errors
    ///
    /// [`EcsError::InvalidTimeScale`] for a negative or non-finite scale; the
    /// current scale is kept.
    pub fn set_time_scale(&mut self, time_scale: f64) -> Result<(), EcsError> {
        match check_time_scale(time_scale) {
            Ok(value) => {
                self.time_scale = value;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(time_scale, "ignoring invalid time scale");
                Err(e)
            }
        }
    }

    // -- entities -------------------------------------------------------------

    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`] when the entity ceiling is reached.
    pub fn create_entity(&mut self) -> Result<Entity, EcsError> {
        self.entities.create()
    }

    /// Remove all of `entity`'s components, then invalidate it.
    ///
    /// Returns `false` (and does nothing) for a stale or invalid handle.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        // Detach hooks run while the handle is still valid.
        self.components.remove_all(entity);
        self.entities.destroy(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Current handle for a raw id; never valid if the id is free.
    pub fn lookup_entity(&self, id: u32) -> Entity {
        self.entities.lookup(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Alive entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    pub fn entity_registry(&self) -> &EntityRegistry {
        &self.entities
    }

    // -- components -----------------------------------------------------------

    /// Attach `value` to `entity`, replacing any existing `T`.
    ///
    /// Returns `None` if the handle is stale.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            tracing::warn!(
                %entity,
                component = std::any::type_name::<T>(),
                "add_component on a dead entity ignored"
            );
            return None;
        }
        Some(self.components.add(entity, value))
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.components.remove::<T>(entity)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.components.get::<T>(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.get_mut::<T>(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.components.has::<T>(entity)
    }

    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.components.entities_with::<T>()
    }

    pub fn component_count(&self) -> usize {
        self.components.count()
    }

    pub fn set_component_hooks<T: Component>(&mut self, hooks: ComponentHooks<T>) {
        self.components.set_hooks(hooks);
    }

    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    // -- queries --------------------------------------------------------------

    /// Lazily walk alive entities matching `query`, in creation order.
    pub fn query_entities(&self, query: &Query) -> EntityView<'_> {
        EntityView::new(
            &self.entities,
            &self.components,
            query.resolve(self.components.registry()),
        )
    }

    /// A cursor over `query` that lets the world be mutated between steps.
    pub fn query_cursor(&self, query: Query) -> QueryCursor {
        QueryCursor::new(query)
    }

    // -- systems --------------------------------------------------------------

    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if the name is taken.
    pub fn register_system<T: System>(&mut self, system: T) -> Result<&mut T, EcsError> {
        self.systems.register(system)
    }

    /// Look up a system by name. While systems are running, the registry is
    /// detached from the world and this returns `None`.
    pub fn get_system(&self, name: &str) -> Option<&(dyn System + 'static)> {
        self.systems.get(name)
    }

    pub fn get_system_as<T: System>(&self, name: &str) -> Option<&T> {
        self.systems.get_as::<T>(name)
    }

    pub fn get_system_as_mut<T: System>(&mut self, name: &str) -> Option<&mut T> {
        self.systems.get_as_mut::<T>(name)
    }

    pub fn enable_system(&mut self, name: &str) -> bool {
        self.systems.enable(name)
    }

    pub fn disable_system(&mut self, name: &str) -> bool {
        self.systems.disable(name)
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemRegistry {
        &mut self.systems
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
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

    #[derive(Debug, Clone, PartialEq)]
    struct Pos {
        x: f64,
        y: f64,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Vel {
        dx: f64,
        dy: f64,
    }

    /// Moves every entity with `Pos` + `Vel` and records the deltas it saw.
    struct Movement {
        seen: Vec<f64>,
    }

    impl System for Movement {
        fn name(&self) -> &str {
            "movement"
        }

        fn update(&mut self, world: &mut World, dt: f64) {
            self.seen.push(dt);
            let movers: Vec<Entity> = world
                .query_entities(&Query::new().require::<Pos>().require::<Vel>())
                .collect();
            for e in movers {
                let vel = world.get_component::<Vel>(e).cloned();
                if let (Some(vel), Some(pos)) = (vel, world.get_component_mut::<Pos>(e)) {
                    pos.x += vel.dx * dt;
                    pos.y += vel.dy * dt;
                }
            }
        }
    }

    #[test]
    fn create_then_destroy_toggles_alive() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        assert!(world.is_alive(e));
        assert!(world.destroy_entity(e));
        assert!(!world.is_alive(e));
        assert!(!world.destroy_entity(e));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn destroy_removes_components_immediately() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add_component(e, Pos { x: 1.0, y: 2.0 });
        world.destroy_entity(e);
        assert_eq!(world.get_component::<Pos>(e), None);
        assert_eq!(world.component_count(), 0);
    }

    #[test]
    fn detach_hook_sees_live_entity_during_destroy() {
        let alive_at_detach: Rc<RefCell<Vec<Entity>>> = Rc::default();
        let mut world = World::new();
        let sink = Rc::clone(&alive_at_detach);
        world.set_component_hooks(ComponentHooks::<Pos>::new().on_detach(move |e, _| {
            sink.borrow_mut().push(e);
        }));
        let e = world.create_entity().unwrap();
        world.add_component(e, Pos { x: 0.0, y: 0.0 });
        world.destroy_entity(e);
        assert_eq!(*alive_at_detach.borrow(), vec![e]);
    }

    #[test]
    fn add_component_on_stale_handle_is_absorbed() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.destroy_entity(e);
        assert!(world.add_component(e, Pos { x: 0.0, y: 0.0 }).is_none());
        assert!(!world.has_component::<Pos>(e));
        assert!(!world.remove_component::<Pos>(e));
    }

    #[test]
    fn stale_handle_does_not_alias_recycled_id() {
        let mut world = World::new();
        let old = world.create_entity().unwrap();
        world.destroy_entity(old);
        world.update(0.0);
        let new = world.create_entity().unwrap();
        assert_eq!(new.id(), old.id());
        world.add_component(new, Pos { x: 5.0, y: 5.0 });
        assert_eq!(world.get_component::<Pos>(old), None);
        assert!(!world.is_alive(old));
    }

    #[test]
    fn update_scales_delta_and_runs_systems() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add_component(e, Pos { x: 0.0, y: 0.0 });
        world.add_component(e, Vel { dx: 1.0, dy: 2.0 });
        world.register_system(Movement { seen: Vec::new() }).unwrap();
        world.set_time_scale(2.0).unwrap();

        world.update(0.5);

        assert_eq!(world.get_component::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));
        assert_eq!(world.get_system_as::<Movement>("movement").unwrap().seen, vec![1.0]);
        assert_eq!(world.tick_count(), 1);
        assert!((world.elapsed() - 1.0).abs() < f64::EPSILON);
        assert!(world.is_initialized());
    }

    #[test]
    fn invalid_time_scale_is_rejected() {
        let mut world = World::new();
        assert!(matches!(
            world.set_time_scale(-1.0),
            Err(EcsError::InvalidTimeScale { .. })
        ));
        assert!(world.set_time_scale(f64::NAN).is_err());
        assert_eq!(world.time_scale(), 1.0);
        assert!(world.set_time_scale(0.0).is_ok());
    }

    #[test]
    fn update_compacts_live_list() {
        let mut world = World::new();
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.destroy_entity(a);
        assert_eq!(world.entity_registry().entities().len(), 2);
        world.update(0.016);
        assert_eq!(world.entity_registry().entities(), &[b]);
    }

    #[test]
    fn capacity_exhaustion_is_recoverable() {
        let mut world = World::with_config(WorldConfig {
            max_entities: 1,
            ..Default::default()
        })
        .unwrap();
        let e = world.create_entity().unwrap();
        assert!(matches!(
            world.create_entity(),
            Err(EcsError::CapacityExceeded { max: 1 })
        ));
        world.destroy_entity(e);
        assert!(world.create_entity().is_ok());
    }

    #[test]
    fn with_config_rejects_bad_time_scale() {
        let config = WorldConfig {
            time_scale: f64::INFINITY,
            ..Default::default()
        };
        assert!(World::with_config(config).is_err());
    }

    #[test]
    fn cleanup_without_initialize_is_safe() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add_component(e, Pos { x: 0.0, y: 0.0 });
        world.cleanup();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.component_count(), 0);
        assert!(world.systems().is_empty());
    }

    struct Spawner;

    impl System for Spawner {
        fn name(&self) -> &str {
            "spawner"
        }

        fn update(&mut self, world: &mut World, _dt: f64) {
            // The world's own registry is detached while systems run.
            assert!(world.get_system("spawner").is_none());
            let _ = world.register_system(Movement { seen: Vec::new() });
        }
    }

    #[test]
    fn systems_registered_mid_tick_are_kept() {
        let mut world = World::new();
        world.register_system(Spawner).unwrap();
        world.update(0.1);
        assert_eq!(world.systems().names(), vec!["spawner", "movement"]);
        world.update(0.1);
        assert_eq!(
            world.get_system_as::<Movement>("movement").unwrap().seen,
            vec![0.1]
        );
    }

    #[test]
    fn disable_system_skips_update() {
        let mut world = World::new();
        world.register_system(Movement { seen: Vec::new() }).unwrap();
        assert!(world.disable_system("movement"));
        world.update(1.0);
        assert!(world.get_system_as::<Movement>("movement").unwrap().seen.is_empty());
        assert!(world.enable_system("movement"));
        world.update(1.0);
        assert_eq!(world.get_system_as::<Movement>("movement").unwrap().seen.len(), 1);
    }
}
