//! Playhead advance.

use shotline_ecs::entity::Entity;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{ClipComponent, PlayheadComponent};

pub const TIMELINE_SYSTEM: &str = "timeline";
pub const TIMELINE_PRIORITY: i32 = 0;

/// End of the last clip on the timeline, or `0.0` when there are no clips.
pub fn timeline_duration(world: &World) -> f64 {
    world
        .components()
        .table::<ClipComponent>()
        .map_or(0.0, |table| {
            table
                .iter()
                .map(|(_, clip)| clip.end_time())
                .fold(0.0, f64::max)
        })
}

/// Advances every playing playhead by the tick delta.
///
/// At the end of the timeline a looping playhead wraps back to the start;
/// any other playhead is clamped to the end and stopped. Clips cover
/// `[start, end)`, so a playhead stopped at the end shows no clip and the
/// last rendered frame is the one from the tick before.
#[derive(Debug, Default)]
pub struct TimelineSystem {
    last_duration: f64,
}

impl TimelineSystem {
    /// Timeline length seen during the last update.
    pub fn last_duration(&self) -> f64 {
        self.last_duration
    }
}

impl System for TimelineSystem {
    fn name(&self) -> &str {
        TIMELINE_SYSTEM
    }

    fn priority(&self) -> i32 {
        TIMELINE_PRIORITY
    }

    fn update(&mut self, world: &mut World, delta_time: f64) {
        let duration = timeline_duration(world);
        self.last_duration = duration;

        let playheads: Vec<Entity> = world.entities_with::<PlayheadComponent>();
        for entity in playheads {
            let Some(playhead) = world.get_component_mut::<PlayheadComponent>(entity) else {
                continue;
            };
            if !playhead.playing {
                continue;
            }
            playhead.position += delta_time;
            if playhead.position < duration {
                continue;
            }
            if playhead.looping && duration > 0.0 {
                playhead.position = playhead.position.rem_euclid(duration);
            } else {
                playhead.position = duration;
                playhead.playing = false;
                tracing::debug!(%entity, duration, "playhead reached end of timeline");
            }
        }
    }
}
