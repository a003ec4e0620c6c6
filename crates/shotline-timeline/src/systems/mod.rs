//! The six timeline systems and their execution order.
//!
//! | system             | priority |
//! |--------------------|----------|
//! | [`TimelineSystem`]         | 0    |
//! | [`ClipProcessingSystem`]   | 100  |
//! | [`TransformSystem`]        | 200  |
//! | [`EffectProcessingSystem`] | 300  |
//! | [`AudioSystem`]            | 400  |
//! | [`RenderSystem`]           | 1000 |
//!
//! Each system re-reads what the previous ones wrote this tick, so the order
//! is load-bearing: the render list always reflects the playhead position
//! reached in the same tick.

use std::collections::HashSet;

use shotline_ecs::world::World;
use shotline_ecs::EcsError;

use crate::components::{PlayheadComponent, TrackComponent};

pub mod audio;
pub mod clip;
pub mod effect;
pub mod render;
pub mod timeline;
pub mod transform;

pub use audio::AudioSystem;
pub use clip::ClipProcessingSystem;
pub use effect::EffectProcessingSystem;
pub use render::{RenderItem, RenderList, RenderSystem};
pub use timeline::TimelineSystem;
pub use transform::TransformSystem;

/// Register all six systems on `world`.
///
/// # Errors
///
/// [`EcsError::DuplicateSystem`] if any of them is already registered.
pub fn register_default_systems(world: &mut World) -> Result<(), EcsError> {
    world.register_system(TimelineSystem::default())?;
    world.register_system(ClipProcessingSystem::default())?;
    world.register_system(TransformSystem)?;
    world.register_system(EffectProcessingSystem::default())?;
    world.register_system(AudioSystem)?;
    world.register_system(RenderSystem::default())?;
    Ok(())
}

/// Position of the first playhead in the world, or `0.0` if there is none.
pub(crate) fn playhead_position(world: &World) -> f64 {
    world
        .entities_with::<PlayheadComponent>()
        .first()
        .and_then(|e| world.get_component::<PlayheadComponent>(*e))
        .map_or(0.0, |p| p.position)
}

/// Indices of tracks that are muted.
pub(crate) fn muted_tracks(world: &World) -> HashSet<u32> {
    world
        .entities_with::<TrackComponent>()
        .into_iter()
        .filter_map(|e| world.get_component::<TrackComponent>(e))
        .filter(|t| t.muted)
        .map(|t| t.index)
        .collect()
}
