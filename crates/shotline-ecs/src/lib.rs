//! Shotline ECS -- the entity-component-system core of the timeline engine.
//!
//! Entities are generational handles issued by an [`EntityRegistry`](entity::EntityRegistry).
//! Components live in per-type tables inside a [`ComponentStore`](component::ComponentStore),
//! which assigns each type a small integer id the first time it is used.
//! Queries filter entities by required, excluded and optional component types,
//! and systems run once per tick in ascending priority order. The [`World`](world::World)
//! ties all of it into one lifecycle.
//!
//! # Quick Start
//!
//! ```
//! use shotline_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Clip { start: f64, duration: f64 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Muted;
//!
//! let mut world = World::new();
//! let a = world.create_entity().unwrap();
//! let b = world.create_entity().unwrap();
//! world.add_component(a, Clip { start: 0.0, duration: 5.0 });
//! world.add_component(b, Clip { start: 5.0, duration: 2.0 });
//! world.add_component(b, Muted);
//!
//! let audible: Vec<Entity> = world
//!     .query_entities(&Query::new().require::<Clip>().exclude::<Muted>())
//!     .collect();
//! assert_eq!(audible, vec![a]);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod query;
pub mod system;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
///
/// Plain absence (a stale handle, a missing component, an unknown system name)
/// is reported through `Option`/`bool` instead.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// Every id up to the configured ceiling is in use.
    #[error("entity capacity exceeded: at most {max} entities may be alive")]
    CapacityExceeded { max: usize },

    /// A system with this name is already registered.
    #[error("a system named '{name}' is already registered")]
    DuplicateSystem { name: String },

    /// Time scales must be finite and non-negative.
    #[error("invalid time scale {value}: must be finite and >= 0")]
    InvalidTimeScale { value: f64 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        Component, ComponentHooks, ComponentInfo, ComponentRegistry, ComponentStore,
        ComponentTable, ComponentTypeId,
    };
    pub use crate::entity::{Entity, EntityRegistry};
    pub use crate::query::{EntityView, Query, QueryCursor, QueryFilter};
    pub use crate::system::{System, SystemRegistry, SystemTiming};
    pub use crate::world::{World, WorldConfig};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
