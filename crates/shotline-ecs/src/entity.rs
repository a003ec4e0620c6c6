//! Entity handles and the registry that issues them.
//!
//! An [`Entity`] is a `{id, generation}` pair. The registry keeps the last
//! generation issued for every id, so destroying an entity invalidates every
//! copy of its handle at once without having to find them.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::EcsError;

/// Default ceiling on the number of entity ids a registry will hand out.
pub const DEFAULT_MAX_ENTITIES: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Handles are compared on both fields and ordered by `(id, generation)`.
/// Id `0` is never issued and marks the invalid sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    id: u32,
    generation: u32,
}

impl Entity {
    /// The invalid sentinel handle.
    pub const INVALID: Entity = Entity {
        id: 0,
        generation: 0,
    };

    /// Construct a handle from raw parts.
    #[inline]
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    #[inline]
    pub fn id(self) -> u32 {
        self.id
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// `false` for the sentinel id. Says nothing about liveness.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.id != 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation)
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    /// Last generation issued for this id.
    generation: u32,
    alive: bool,
}

/// Issues, recycles and validates [`Entity`] handles.
///
/// Freed ids go into a FIFO queue so reuse is spread over all free slots.
/// Destruction is logically immediate, but the live-entity list is only
/// compacted by an explicit [`compact`](Self::compact) call.
#[derive(Debug)]
pub struct EntityRegistry {
    /// Indexed by id. Slot 0 backs the sentinel and is never allocated.
    slots: Vec<Slot>,
    free_ids: VecDeque<u32>,
    /// Creation-ordered handles; may hold dead handles until compaction.
    live: Vec<Entity>,
    alive_count: usize,
    max_entities: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::with_capacity_limit(DEFAULT_MAX_ENTITIES)
    }

    /// Create a registry that refuses to issue more than `max_entities` ids.
    pub fn with_capacity_limit(max_entities: usize) -> Self {
        Self {
            slots: vec![Slot::default()],
            free_ids: VecDeque::new(),
            live: Vec::new(),
            alive_count: 0,
            max_entities,
        }
    }

    /// Allocate a new handle.
    ///
    /// A freed id is reused first, with a generation strictly above the one it
    /// last carried. Otherwise the next sequential id is used.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`] when no free id exists and a fresh id
    /// would exceed the configured maximum.
    pub fn create(&mut self) -> Result<Entity, EcsError> {
        let id = match self.free_ids.pop_front() {
            Some(id) => id,
            None => {
                let next = self.slots.len();
                if next > self.max_entities || next > u32::MAX as usize {
                    return Err(EcsError::CapacityExceeded {
                        max: self.max_entities,
                    });
                }
                self.slots.push(Slot::default());
                next as u32
            }
        };

        let slot = &mut self.slots[id as usize];
        // Wraparound is not guarded beyond skipping the reserved 0.
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        slot.alive = true;

        let entity = Entity::new(id, slot.generation);
        self.live.push(entity);
        self.alive_count += 1;
        Ok(entity)
    }

    /// Invalidate `entity` and free its id.
    ///
    /// Returns `false` for the sentinel or a stale handle.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.slots[entity.id as usize].alive = false;
        self.free_ids.push_back(entity.id);
        self.alive_count -= 1;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        if !entity.is_valid() {
            return false;
        }
        match self.slots.get(entity.id as usize) {
            Some(slot) => slot.alive && slot.generation == entity.generation,
            None => false,
        }
    }

    /// The currently valid handle for `id`, or `Entity { id, generation: 0 }`
    /// when the id is free or was never allocated.
    pub fn lookup(&self, id: u32) -> Entity {
        match self.slots.get(id as usize) {
            Some(slot) if id != 0 && slot.alive => Entity::new(id, slot.generation),
            _ => Entity::new(id, 0),
        }
    }

    /// Drop dead handles from the live-entity list. Returns how many went.
    ///
    /// Must not be called while something is walking [`entities`](Self::entities).
    pub fn compact(&mut self) -> usize {
        let before = self.live.len();
        let slots = &self.slots;
        self.live.retain(|e| {
            let slot = slots[e.id as usize];
            slot.alive && slot.generation == e.generation
        });
        before - self.live.len()
    }

    /// The live-entity list in creation order. Until the next
    /// [`compact`](Self::compact) it may contain destroyed handles.
    pub fn entities(&self) -> &[Entity] {
        &self.live
    }

    /// Iterate handles that are alive right now, in creation order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live.iter().copied().filter(|e| self.is_alive(*e))
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Destroy every alive entity. Generations are kept, so handles issued
    /// before the clear stay dead once their ids are reused.
    pub fn clear(&mut self) {
        for (id, slot) in self.slots.iter_mut().enumerate().skip(1) {
            if slot.alive {
                slot.alive = false;
                self.free_ids.push_back(id as u32);
            }
        }
        self.live.clear();
        self.alive_count = 0;
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
