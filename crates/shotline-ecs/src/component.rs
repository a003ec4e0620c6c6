//! Component type registration and per-type component tables.
//!
//! A [`ComponentStore`] hands out a [`ComponentTypeId`] the first time it sees
//! a Rust type. Values live in one [`ComponentTable`] per type, and the store
//! keeps a per-entity list of attached type ids in step with those tables.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::entity::{Entity, EntityRegistry};

/// Marker for types that can be stored as components.
pub trait Component: Any {}

impl<T: Any> Component for T {}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Small integer identifying a component type within one store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo / ComponentRegistry
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentTypeId,
    /// `std::any::type_name::<T>()`, for diagnostics only.
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Maps Rust types to [`ComponentTypeId`]s.
///
/// Ids are dense, assigned in first-use order and never reused.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `T`, assigning the next one if `T` is unseen.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: std::any::type_name::<T>(),
            type_id: rust_type_id,
        });
        self.by_type.insert(rust_type_id, id);
        tracing::debug!(
            component = std::any::type_name::<T>(),
            id = id.0,
            "registered component type"
        );
        id
    }

    pub fn lookup<T: Component>(&self) -> Option<ComponentTypeId> {
        self.lookup_type_id(TypeId::of::<T>())
    }

    pub fn lookup_type_id(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.by_type.get(&type_id).copied()
    }

    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ComponentHooks
// ---------------------------------------------------------------------------

type HookFn<T> = Box<dyn Fn(Entity, &mut T)>;

/// Functions the store calls when a component of type `T` is attached to or
/// detached from an entity.
pub struct ComponentHooks<T> {
    on_attach: Option<HookFn<T>>,
    on_detach: Option<HookFn<T>>,
}

impl<T> ComponentHooks<T> {
    pub fn new() -> Self {
        Self {
            on_attach: None,
            on_detach: None,
        }
    }

    pub fn on_attach(mut self, f: impl Fn(Entity, &mut T) + 'static) -> Self {
        self.on_attach = Some(Box::new(f));
        self
    }

    pub fn on_detach(mut self, f: impl Fn(Entity, &mut T) + 'static) -> Self {
        self.on_detach = Some(Box::new(f));
        self
    }

    fn attach(&self, entity: Entity, value: &mut T) {
        if let Some(f) = &self.on_attach {
            f(entity, value);
        }
    }

    fn detach(&self, entity: Entity, value: &mut T) {
        if let Some(f) = &self.on_detach {
            f(entity, value);
        }
    }
}

impl<T> Default for ComponentHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ComponentTable
// ---------------------------------------------------------------------------

/// Dense storage for every component of one type.
///
/// Values are packed in a `Vec` with an entity -> row index; removal swaps the
/// last row into the hole.
pub struct ComponentTable<T> {
    values: Vec<T>,
    owners: Vec<Entity>,
    rows: HashMap<Entity, usize>,
    hooks: ComponentHooks<T>,
}

impl<T: Component> ComponentTable<T> {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            owners: Vec::new(),
            rows: HashMap::new(),
            hooks: ComponentHooks::new(),
        }
    }

    /// Store `value` for `entity`, replacing (and detaching) any previous one.
    fn insert(&mut self, entity: Entity, value: T) -> &mut T {
        let row = match self.rows.get(&entity) {
            Some(&row) => {
                let mut old = std::mem::replace(&mut self.values[row], value);
                self.hooks.detach(entity, &mut old);
                row
            }
            None => {
                let row = self.values.len();
                self.values.push(value);
                self.owners.push(entity);
                self.rows.insert(entity, row);
                row
            }
        };
        let slot = &mut self.values[row];
        self.hooks.attach(entity, slot);
        slot
    }

    fn remove(&mut self, entity: Entity) -> Option<T> {
        let row = self.rows.remove(&entity)?;
        let mut value = self.values.swap_remove(row);
        self.owners.swap_remove(row);
        if let Some(&moved) = self.owners.get(row) {
            self.rows.insert(moved, row);
        }
        self.hooks.detach(entity, &mut value);
        Some(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.rows.get(&entity).map(|&row| &self.values[row])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let row = *self.rows.get(&entity)?;
        Some(&mut self.values[row])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().copied().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Type-erased table access
// ---------------------------------------------------------------------------

trait ErasedTable {
    /// Remove the entity's component, firing the detach hook.
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedTable for ComponentTable<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

/// Owns every component in a world.
///
/// Keeps two views that always agree: one table per component type
/// (type -> entity -> value) and one list of attached type ids per entity.
/// Every mutating method updates both before returning.
#[derive(Default)]
pub struct ComponentStore {
    registry: ComponentRegistry,
    /// Indexed by `ComponentTypeId.0`; grows together with the registry.
    tables: Vec<Box<dyn ErasedTable>>,
    entity_types: HashMap<Entity, Vec<ComponentTypeId>>,
}

impl fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("component_types", &self.registry.len())
            .field("entities", &self.entity_types.len())
            .field("components", &self.count())
            .finish()
    }
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Id for `T`, registering it (and creating its table) on first use.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.registry.register::<T>();
        if id.0 as usize == self.tables.len() {
            self.tables.push(Box::new(ComponentTable::<T>::new()));
        }
        id
    }

    pub fn type_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.lookup::<T>()
    }

    pub fn type_name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.registry.get_info(id).map(|info| info.name)
    }

    /// Install attach/detach hooks for `T`, replacing any previous ones.
    pub fn set_hooks<T: Component>(&mut self, hooks: ComponentHooks<T>) {
        let id = self.register::<T>();
        if let Some(table) = self.typed_table_mut::<T>(id) {
            table.hooks = hooks;
        }
    }

    /// Attach `value` to `entity`, replacing any existing `T` on it.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        let id = self.register::<T>();
        let types = self.entity_types.entry(entity).or_default();
        if !types.contains(&id) {
            types.push(id);
        }
        let table = self.tables[id.0 as usize]
            .as_any_mut()
            .downcast_mut::<ComponentTable<T>>()
            .unwrap_or_else(|| unreachable!("table type always matches its registry id"));
        table.insert(entity, value)
    }

    /// Detach `T` from `entity`. Returns `false` if it had none.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        let Some(id) = self.registry.lookup::<T>() else {
            return false;
        };
        if !self.tables[id.0 as usize].remove_entity(entity) {
            return false;
        }
        self.forget_type(entity, id);
        true
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.table::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.lookup::<T>()?;
        self.typed_table_mut::<T>(id)?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Type ids attached to `entity`, in attach order.
    pub fn entity_component_types(&self, entity: Entity) -> &[ComponentTypeId] {
        self.entity_types
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every entity carrying a `T`, in table order.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.table::<T>()
            .map(|table| table.owners.clone())
            .unwrap_or_default()
    }

    /// Read-only access to the whole table for `T`.
    pub fn table<T: Component>(&self) -> Option<&ComponentTable<T>> {
        let id = self.registry.lookup::<T>()?;
        self.tables[id.0 as usize]
            .as_any()
            .downcast_ref::<ComponentTable<T>>()
    }

    /// Remove every component attached to `entity`. Returns how many went.
    pub fn remove_all(&mut self, entity: Entity) -> usize {
        let Some(types) = self.entity_types.remove(&entity) else {
            return 0;
        };
        let mut removed = 0;
        for id in types {
            if self.tables[id.0 as usize].remove_entity(entity) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove the components of every entity `registry` no longer considers
    /// alive. Returns the number of entities swept.
    pub fn sweep(&mut self, registry: &EntityRegistry) -> usize {
        let mut dead: Vec<Entity> = self
            .entity_types
            .keys()
            .copied()
            .filter(|e| !registry.is_alive(*e))
            .collect();
        dead.sort();
        for &entity in &dead {
            self.remove_all(entity);
        }
        if !dead.is_empty() {
            tracing::debug!(entities = dead.len(), "swept components of dead entities");
        }
        dead.len()
    }

    /// Remove every component from every entity, firing detach hooks.
    /// Type registrations and hooks are kept.
    pub fn clear(&mut self) {
        let mut owners: Vec<Entity> = self.entity_types.keys().copied().collect();
        owners.sort();
        for entity in owners {
            self.remove_all(entity);
        }
    }

    /// Total number of components across all types.
    pub fn count(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum()
    }

    /// Number of components of one type.
    pub fn count_of(&self, id: ComponentTypeId) -> usize {
        self.tables.get(id.0 as usize).map_or(0, |t| t.len())
    }

    fn typed_table_mut<T: Component>(
        &mut self,
        id: ComponentTypeId,
    ) -> Option<&mut ComponentTable<T>> {
        self.tables
            .get_mut(id.0 as usize)?
            .as_any_mut()
            .downcast_mut::<ComponentTable<T>>()
    }

    fn forget_type(&mut self, entity: Entity, id: ComponentTypeId) {
        if let Some(types) = self.entity_types.get_mut(&entity) {
            types.retain(|t| *t != id);
            if types.is_empty() {
                self.entity_types.remove(&entity);
            }
        }
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
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Vel {
        dx: f32,
        dy: f32,
    }

    fn entities(n: u32) -> Vec<Entity> {
        (1..=n).map(|id| Entity::new(id, 1)).collect()
    }

    #[test]
    fn registry_assigns_dense_ids_in_first_use_order() {
        let mut reg = ComponentRegistry::new();
        let v = reg.register::<Vel>();
        let p = reg.register::<Pos>();
        assert_eq!(v.index(), 0);
        assert_eq!(p.index(), 1);
        assert_eq!(reg.register::<Vel>(), v);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lookup::<Pos>(), Some(p));
        assert!(reg.get_info(p).unwrap().name.ends_with("Pos"));
    }

    #[test]
    fn add_get_remove() {
        let mut store = ComponentStore::new();
        let e = Entity::new(1, 1);

        store.add(e, Pos { x: 1.0, y: 2.0 });
        assert_eq!(store.get::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));
        assert!(store.has::<Pos>(e));
        assert!(!store.has::<Vel>(e));

        assert!(store.remove::<Pos>(e));
        assert_eq!(store.get::<Pos>(e), None);
        assert!(!store.remove::<Pos>(e));
        assert!(store.entity_component_types(e).is_empty());
    }

    #[test]
    fn add_overwrites_without_duplicating() {
        let mut store = ComponentStore::new();
        let e = Entity::new(1, 1);
        store.add(e, Pos { x: 1.0, y: 1.0 });
        store.add(e, Pos { x: 9.0, y: 9.0 });
        assert_eq!(store.get::<Pos>(e), Some(&Pos { x: 9.0, y: 9.0 }));
        assert_eq!(store.entity_component_types(e).len(), 1);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn returned_reference_is_writable() {
        let mut store = ComponentStore::new();
        let e = Entity::new(1, 1);
        store.add(e, Pos { x: 0.0, y: 0.0 }).x = 5.0;
        assert_eq!(store.get::<Pos>(e).unwrap().x, 5.0);
        store.get_mut::<Pos>(e).unwrap().y = 6.0;
        assert_eq!(store.get::<Pos>(e), Some(&Pos { x: 5.0, y: 6.0 }));
    }

    #[test]
    fn type_lists_track_tables() {
        let mut store = ComponentStore::new();
        let e = Entity::new(1, 1);
        store.add(e, Pos { x: 0.0, y: 0.0 });
        store.add(e, Vel { dx: 0.0, dy: 0.0 });
        let pos = store.type_id::<Pos>().unwrap();
        let vel = store.type_id::<Vel>().unwrap();
        assert_eq!(store.entity_component_types(e), &[pos, vel]);

        store.remove::<Pos>(e);
        assert_eq!(store.entity_component_types(e), &[vel]);
        assert_eq!(store.count_of(pos), 0);
        assert_eq!(store.count_of(vel), 1);
    }

    #[test]
    fn swap_remove_keeps_other_rows_addressable() {
        let mut store = ComponentStore::new();
        let es = entities(3);
        for (i, e) in es.iter().enumerate() {
            store.add(*e, Pos { x: i as f32, y: 0.0 });
        }
        store.remove::<Pos>(es[0]);
        assert_eq!(store.get::<Pos>(es[1]).unwrap().x, 1.0);
        assert_eq!(store.get::<Pos>(es[2]).unwrap().x, 2.0);
        let mut with = store.entities_with::<Pos>();
        with.sort();
        assert_eq!(with, vec![es[1], es[2]]);
    }

    #[test]
    fn remove_all_clears_every_type() {
        let mut store = ComponentStore::new();
        let (a, b) = (Entity::new(1, 1), Entity::new(2, 1));
        store.add(a, Pos { x: 0.0, y: 0.0 });
        store.add(a, Vel { dx: 0.0, dy: 0.0 });
        store.add(b, Pos { x: 1.0, y: 1.0 });

        assert_eq!(store.remove_all(a), 2);
        assert_eq!(store.remove_all(a), 0);
        assert!(!store.has::<Pos>(a));
        assert!(!store.has::<Vel>(a));
        assert!(store.has::<Pos>(b));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn sweep_drops_components_of_dead_entities() {
        let mut reg = EntityRegistry::new();
        let mut store = ComponentStore::new();
        let a = reg.create().unwrap();
        let b = reg.create().unwrap();
        store.add(a, Pos { x: 0.0, y: 0.0 });
        store.add(b, Pos { x: 1.0, y: 1.0 });

        reg.destroy(a);
        assert_eq!(store.sweep(&reg), 1);
        assert_eq!(store.entities_with::<Pos>(), vec![b]);
        assert_eq!(store.sweep(&reg), 0);
    }

    #[test]
    fn hooks_fire_on_attach_replace_and_detach() {
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let mut store = ComponentStore::new();
        let attach_log = Rc::clone(&log);
        let detach_log = Rc::clone(&log);
        store.set_hooks(
            ComponentHooks::<Pos>::new()
                .on_attach(move |_, p| attach_log.borrow_mut().push(format!("attach {}", p.x)))
                .on_detach(move |_, p| detach_log.borrow_mut().push(format!("detach {}", p.x))),
        );

        let e = Entity::new(1, 1);
        store.add(e, Pos { x: 1.0, y: 0.0 });
        store.add(e, Pos { x: 2.0, y: 0.0 });
        store.remove_all(e);

        assert_eq!(
            *log.borrow(),
            vec!["attach 1", "detach 1", "attach 2", "detach 2"]
        );
    }

    #[test]
    fn attach_hook_can_normalize_value() {
        let mut store = ComponentStore::new();
        store.set_hooks(ComponentHooks::<Pos>::new().on_attach(|_, p| p.x = p.x.max(0.0)));
        let e = Entity::new(1, 1);
        assert_eq!(store.add(e, Pos { x: -3.0, y: 0.0 }).x, 0.0);
    }

    #[test]
    fn missing_type_queries_are_empty_not_errors() {
        let store = ComponentStore::new();
        let e = Entity::new(1, 1);
        assert_eq!(store.get::<Pos>(e), None);
        assert!(store.entities_with::<Pos>().is_empty());
        assert_eq!(store.count(), 0);
        assert!(store.type_id::<Pos>().is_none());
    }

    #[test]
    fn clear_keeps_registrations() {
        let mut store = ComponentStore::new();
        let es = entities(4);
        for e in &es {
            store.add(*e, Pos { x: 0.0, y: 0.0 });
        }
        let id = store.type_id::<Pos>().unwrap();
        store.clear();
        assert_eq!(store.count(), 0);
        assert_eq!(store.type_id::<Pos>(), Some(id));
    }
}
