//! Project snapshot and restore with BLAKE3 hashing.
//!
//! A [`ProjectSnapshot`] records every live entity's authored timeline
//! components, keyed by [`TimelineComponent::NAME`], plus a BLAKE3 digest of
//! the canonical JSON encoding of those records.
//!
//! ```
//! use shotline_timeline::prelude::*;
//!
//! let mut world = World::new();
//! let clip = world.create_entity().unwrap();
//! world.add_component(clip, ClipComponent::new("intro", 0.0, 4.0));
//!
//! let snapshot = ProjectSnapshot::capture(&world);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//!
//! let mut restored = World::new();
//! let handles = snapshot.restore_into(&mut restored).unwrap();
//! let new_clip = handles[&clip];
//! assert_eq!(restored.get_component::<ClipComponent>(new_clip).unwrap().name, "intro");
//! ```
//!
//! # What Is NOT Serialized
//!
//! - **Systems** -- the caller owns registration.
//! - **Derived state** ([`ClipState`](crate::components::ClipState),
//!   [`ResolvedTransform`](crate::components::ResolvedTransform),
//!   [`ResolvedAudio`](crate::components::ResolvedAudio)) -- recomputed on
//!   the next tick.
//! - **Entity generations** -- restore issues fresh handles and reports the
//!   old-to-new mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shotline_ecs::entity::Entity;
use shotline_ecs::world::World;

use crate::components::{
    AudioClipComponent, ClipComponent, EffectComponent, FileMetadataComponent, MarkerComponent,
    PlayheadComponent, TimelineComponent, TrackComponent, TransformComponent, VideoClipComponent,
};
use crate::TimelineError;

// ---------------------------------------------------------------------------
// Component codecs
// ---------------------------------------------------------------------------

/// Type-erased snapshot access to one component type.
struct Codec {
    name: &'static str,
    capture: fn(&World, Entity) -> Option<Value>,
    check: fn(&Value) -> Result<(), serde_json::Error>,
    restore: fn(&mut World, Entity, Value) -> Result<(), serde_json::Error>,
}

fn capture_one<T: TimelineComponent>(world: &World, entity: Entity) -> Option<Value> {
    world.get_component::<T>(entity).map(|c| {
        serde_json::to_value(c).expect("timeline components are always JSON-serializable")
    })
}

fn check_one<T: TimelineComponent>(value: &Value) -> Result<(), serde_json::Error> {
    T::deserialize(value).map(drop)
}

fn restore_one<T: TimelineComponent>(
    world: &mut World,
    entity: Entity,
    value: Value,
) -> Result<(), serde_json::Error> {
    let component: T = serde_json::from_value(value)?;
    world.add_component(entity, component);
    Ok(())
}

fn codec<T: TimelineComponent>() -> Codec {
    Codec {
        name: T::NAME,
        capture: capture_one::<T>,
        check: check_one::<T>,
        restore: restore_one::<T>,
    }
}

fn codecs() -> [Codec; 9] {
    [
        codec::<ClipComponent>(),
        codec::<VideoClipComponent>(),
        codec::<AudioClipComponent>(),
        codec::<TransformComponent>(),
        codec::<EffectComponent>(),
        codec::<TrackComponent>(),
        codec::<MarkerComponent>(),
        codec::<FileMetadataComponent>(),
        codec::<PlayheadComponent>(),
    ]
}

// ---------------------------------------------------------------------------
// ProjectSnapshot
// ---------------------------------------------------------------------------

/// One entity's authored components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Handle at capture time.
    pub entity: Entity,
    /// Component name -> JSON value.
    pub components: BTreeMap<String, Value>,
}

/// A serializable capture of a timeline project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Sorted by entity. Entities without timeline components are skipped.
    pub entities: Vec<EntityRecord>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of `entities`.
    pub hash: String,
}

/// BLAKE3 hex digest of the canonical JSON encoding of `entities`.
///
/// Object keys come out sorted (`BTreeMap`), so equal content always hashes
/// equal.
pub(crate) fn compute_hash(entities: &[EntityRecord]) -> String {
    let json_bytes = serde_json::to_vec(entities)
        .expect("snapshot records should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}

impl ProjectSnapshot {
    /// Capture every alive entity's timeline components.
    pub fn capture(world: &World) -> Self {
        let codecs = codecs();
        let mut alive: Vec<Entity> = world.entities().collect();
        alive.sort();

        let entities: Vec<EntityRecord> = alive
            .into_iter()
            .filter_map(|entity| {
                let components: BTreeMap<String, Value> = codecs
                    .iter()
                    .filter_map(|c| (c.capture)(world, entity).map(|v| (c.name.to_owned(), v)))
                    .collect();
                (!components.is_empty()).then_some(EntityRecord { entity, components })
            })
            .collect();

        let hash = compute_hash(&entities);
        tracing::debug!(entities = entities.len(), %hash, "captured project snapshot");
        Self { entities, hash }
    }

    /// Recompute the hash and compare it with the recorded one.
    ///
    /// # Errors
    ///
    /// [`TimelineError::SnapshotHashMismatch`] if they differ.
    pub fn verify(&self) -> Result<(), TimelineError> {
        let computed = compute_hash(&self.entities);
        if computed != self.hash {
            return Err(TimelineError::SnapshotHashMismatch {
                recorded: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Check the hash, that every component name is known and that every
    /// value decodes, without touching any world.
    ///
    /// # Errors
    ///
    /// [`TimelineError::SnapshotHashMismatch`],
    /// [`TimelineError::UnknownComponent`] or
    /// [`TimelineError::ComponentDeserialization`].
    pub fn validate(&self) -> Result<(), TimelineError> {
        self.verify()?;
        let codecs = codecs();
        for record in &self.entities {
            for (name, value) in &record.components {
                let Some(codec) = codecs.iter().find(|c| c.name == name.as_str()) else {
                    tracing::warn!(
                        component = %name,
                        entity = %record.entity,
                        "unknown snapshot component"
                    );
                    return Err(TimelineError::UnknownComponent {
                        name: name.clone(),
                        known: codecs.iter().map(|c| c.name).collect::<Vec<_>>().join(", "),
                    });
                };
                (codec.check)(value).map_err(|source| {
                    tracing::warn!(
                        component = %name,
                        entity = %record.entity,
                        %source,
                        "undecodable snapshot component"
                    );
                    TimelineError::ComponentDeserialization {
                        component: codec.name.to_owned(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Recreate the captured entities in `world` with fresh handles.
    ///
    /// Existing entities are left alone. Returns a map from each captured
    /// handle to the handle it was restored as.
    ///
    /// # Errors
    ///
    /// Fails before touching `world` if [`validate`](Self::validate) does.
    /// If an entity cannot be created, every entity created so far is
    /// destroyed again and the error is returned.
    pub fn restore_into(
        &self,
        world: &mut World,
    ) -> Result<BTreeMap<Entity, Entity>, TimelineError> {
        self.validate()?;

        let codecs = codecs();
        let mut handles = BTreeMap::new();
        for record in &self.entities {
            if let Err(e) = restore_record(&codecs, world, record, &mut handles) {
                for created in handles.values() {
                    world.destroy_entity(*created);
                }
                return Err(e);
            }
        }

        tracing::debug!(entities = handles.len(), "restored project snapshot");
        Ok(handles)
    }

    /// # Errors
    ///
    /// [`TimelineError::Json`] if encoding fails.
    pub fn to_json(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot. The hash is checked on restore, not here.
    ///
    /// # Errors
    ///
    /// [`TimelineError::Json`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn restore_record(
    codecs: &[Codec],
    world: &mut World,
    record: &EntityRecord,
    handles: &mut BTreeMap<Entity, Entity>,
) -> Result<(), TimelineError> {
    let entity = world.create_entity()?;
    handles.insert(record.entity, entity);
    for codec in codecs {
        if let Some(value) = record.components.get(codec.name) {
            (codec.restore)(world, entity, value.clone()).map_err(|source| {
                TimelineError::ComponentDeserialization {
                    component: codec.name.to_owned(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}
