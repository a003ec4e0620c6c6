//! Component-set queries over the live-entity list.
//!
//! A [`Query`] names component types by Rust type: required, excluded, and
//! optional. Before evaluation it is resolved against a store's registry into
//! a [`QueryFilter`] of [`ComponentTypeId`]s, which is what actually gets
//! matched against each entity's attached type list.
//!
//! Two ways to walk results:
//!
//! - [`EntityView`] borrows the world and is a plain `Iterator`.
//! - [`QueryCursor`] holds only an index, so the world can be mutated between
//!   steps. Entities destroyed in the meantime are skipped.
//!
//! Neither survives a tick boundary: [`World::update`](crate::world::World::update)
//! compacts the live-entity list, so re-issue queries every tick.

use std::any::TypeId;
use std::fmt;

use crate::component::{Component, ComponentRegistry, ComponentStore, ComponentTypeId};
use crate::entity::{Entity, EntityRegistry};
use crate::world::World;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
struct TypeKey {
    type_id: TypeId,
    name: &'static str,
}

impl TypeKey {
    fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Typed description of which entities to visit.
///
/// ```
/// use shotline_ecs::prelude::*;
///
/// struct Clip;
/// struct Hidden;
///
/// let mut world = World::new();
/// let shown = world.create_entity().unwrap();
/// world.add_component(shown, Clip);
/// let hidden = world.create_entity().unwrap();
/// world.add_component(hidden, Clip);
/// world.add_component(hidden, Hidden);
///
/// let query = Query::new().require::<Clip>().exclude::<Hidden>();
/// let found: Vec<Entity> = world.query_entities(&query).collect();
/// assert_eq!(found, vec![shown]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    required: Vec<TypeKey>,
    excluded: Vec<TypeKey>,
    optional: Vec<TypeKey>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only visit entities that carry a `T`.
    pub fn require<T: Component>(mut self) -> Self {
        push_unique(&mut self.required, TypeKey::of::<T>());
        self
    }

    /// Skip entities that carry a `T`.
    pub fn exclude<T: Component>(mut self) -> Self {
        push_unique(&mut self.excluded, TypeKey::of::<T>());
        self
    }

    /// Record that consumers may read a `T` if present. Never affects matching.
    pub fn optional<T: Component>(mut self) -> Self {
        push_unique(&mut self.optional, TypeKey::of::<T>());
        self
    }

    /// Resolve against a registry.
    ///
    /// A required type the registry has never seen makes the filter match
    /// nothing. Unseen excluded or optional types are dropped.
    pub fn resolve(&self, registry: &ComponentRegistry) -> QueryFilter {
        let mut filter = QueryFilter::new();
        for key in &self.required {
            match registry.lookup_type_id(key.type_id) {
                Some(id) => filter = filter.require_id(id),
                None => filter.unsatisfiable = true,
            }
        }
        for key in &self.excluded {
            if let Some(id) = registry.lookup_type_id(key.type_id) {
                filter = filter.exclude_id(id);
            }
        }
        for key in &self.optional {
            if let Some(id) = registry.lookup_type_id(key.type_id) {
                filter = filter.optional_id(id);
            }
        }
        filter
    }
}

fn push_unique<K: PartialEq>(list: &mut Vec<K>, key: K) {
    if !list.contains(&key) {
        list.push(key);
    }
}

// ---------------------------------------------------------------------------
// QueryFilter
// ---------------------------------------------------------------------------

/// A query resolved to component type ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    required: Vec<ComponentTypeId>,
    excluded: Vec<ComponentTypeId>,
    optional: Vec<ComponentTypeId>,
    unsatisfiable: bool,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_id(mut self, id: ComponentTypeId) -> Self {
        push_unique(&mut self.required, id);
        self
    }

    pub fn exclude_id(mut self, id: ComponentTypeId) -> Self {
        push_unique(&mut self.excluded, id);
        self
    }

    pub fn optional_id(mut self, id: ComponentTypeId) -> Self {
        push_unique(&mut self.optional, id);
        self
    }

    /// `true` iff every required id is in `types` and no excluded id is.
    pub fn matches(&self, types: &[ComponentTypeId]) -> bool {
        !self.unsatisfiable
            && self.required.iter().all(|id| types.contains(id))
            && !self.excluded.iter().any(|id| types.contains(id))
    }

    pub fn required(&self) -> &[ComponentTypeId] {
        &self.required
    }

    pub fn excluded(&self) -> &[ComponentTypeId] {
        &self.excluded
    }

    pub fn optional(&self) -> &[ComponentTypeId] {
        &self.optional
    }
}

// ---------------------------------------------------------------------------
// EntityView
// ---------------------------------------------------------------------------

/// Lazy iterator over the entities matching a query, in creation order.
pub struct EntityView<'w> {
    entities: &'w EntityRegistry,
    components: &'w ComponentStore,
    filter: QueryFilter,
    cursor: usize,
}

impl<'w> EntityView<'w> {
    pub(crate) fn new(
        entities: &'w EntityRegistry,
        components: &'w ComponentStore,
        filter: QueryFilter,
    ) -> Self {
        Self {
            entities,
            components,
            filter,
            cursor: 0,
        }
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }
}

impl Iterator for EntityView<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        next_match(
            self.entities,
            self.components,
            &self.filter,
            &mut self.cursor,
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entities.entities().len().saturating_sub(self.cursor);
        (0, Some(remaining))
    }
}

// ---------------------------------------------------------------------------
// QueryCursor
// ---------------------------------------------------------------------------

/// Index-based query walk that does not borrow the world between steps.
///
/// ```
/// use shotline_ecs::prelude::*;
///
/// struct Expired;
///
/// let mut world = World::new();
/// for _ in 0..3 {
///     let e = world.create_entity().unwrap();
///     world.add_component(e, Expired);
/// }
///
/// let mut cursor = world.query_cursor(Query::new().require::<Expired>());
/// while let Some(e) = cursor.advance(&world) {
///     world.destroy_entity(e);
/// }
/// assert_eq!(world.entity_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct QueryCursor {
    query: Query,
    position: usize,
}

impl QueryCursor {
    pub fn new(query: Query) -> Self {
        Self { query, position: 0 }
    }

    /// Step to the next match, re-checking liveness and components against
    /// the world as it is now.
    pub fn advance(&mut self, world: &World) -> Option<Entity> {
        let filter = self.query.resolve(world.components().registry());
        next_match(
            world.entity_registry(),
            world.components(),
            &filter,
            &mut self.position,
        )
    }

    /// Start over from the beginning of the live-entity list.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}

fn next_match(
    entities: &EntityRegistry,
    components: &ComponentStore,
    filter: &QueryFilter,
    cursor: &mut usize,
) -> Option<Entity> {
    let list = entities.entities();
    while let Some(&entity) = list.get(*cursor) {
        *cursor += 1;
        if entities.is_alive(entity) && filter.matches(components.entity_component_types(entity))
        {
            return Some(entity);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
