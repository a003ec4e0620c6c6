//! Clip activation against the playhead.

use shotline_ecs::entity::Entity;
use shotline_ecs::query::Query;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{ClipComponent, ClipState};
use crate::systems::{muted_tracks, playhead_position};

pub const CLIP_PROCESSING_SYSTEM: &str = "clip_processing";
pub const CLIP_PROCESSING_PRIORITY: i32 = 100;

/// Writes a [`ClipState`] on every clip.
///
/// A clip is active when it is enabled, its track is not muted and the
/// playhead lies inside it. `local_time` is the matching position inside the
/// source media, clamped to the clip's extent.
#[derive(Debug, Default)]
pub struct ClipProcessingSystem {
    active_clips: usize,
}

impl ClipProcessingSystem {
    /// Clips found active during the last update.
    pub fn active_clips(&self) -> usize {
        self.active_clips
    }
}

fn resolve(clip: &ClipComponent, playhead: f64, track_muted: bool) -> ClipState {
    let offset = (playhead - clip.start_time).clamp(0.0, clip.duration.max(0.0));
    ClipState {
        active: clip.enabled && !track_muted && clip.contains(playhead),
        local_time: clip.in_point + offset,
    }
}

impl System for ClipProcessingSystem {
    fn name(&self) -> &str {
        CLIP_PROCESSING_SYSTEM
    }

    fn priority(&self) -> i32 {
        CLIP_PROCESSING_PRIORITY
    }

    fn update(&mut self, world: &mut World, _delta_time: f64) {
        let playhead = playhead_position(world);
        let muted = muted_tracks(world);

        let clips: Vec<Entity> = world
            .query_entities(&Query::new().require::<ClipComponent>())
            .collect();

        self.active_clips = 0;
        for entity in clips {
            let Some(clip) = world.get_component::<ClipComponent>(entity) else {
                continue;
            };
            let state = resolve(clip, playhead, muted.contains(&clip.track_index));
            if state.active {
                self.active_clips += 1;
            }
            world.add_component(entity, state);
        }
        tracing::trace!(playhead, active = self.active_clips, "clips resolved");
    }
}
