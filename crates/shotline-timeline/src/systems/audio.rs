//! Audio gain resolution.

use shotline_ecs::entity::Entity;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{AudioClipComponent, ClipState, ResolvedAudio};

pub const AUDIO_SYSTEM: &str = "audio";
pub const AUDIO_PRIORITY: i32 = 400;

/// Writes [`ResolvedAudio`] on active audio clips and removes it from the
/// rest. A muted clip resolves to zero gain; muted tracks never get here
/// because their clips are inactive.
#[derive(Debug, Default)]
pub struct AudioSystem;

impl System for AudioSystem {
    fn name(&self) -> &str {
        AUDIO_SYSTEM
    }

    fn priority(&self) -> i32 {
        AUDIO_PRIORITY
    }

    fn update(&mut self, world: &mut World, _delta_time: f64) {
        let clips: Vec<Entity> = world.entities_with::<AudioClipComponent>();
        for entity in clips {
            let active = world
                .get_component::<ClipState>(entity)
                .is_some_and(|s| s.active);
            let resolved = world
                .get_component::<AudioClipComponent>(entity)
                .filter(|_| active)
                .map(|audio| ResolvedAudio {
                    gain: if audio.muted { 0.0 } else { audio.volume.max(0.0) },
                    pan: audio.pan.clamp(-1.0, 1.0),
                });
            match resolved {
                Some(resolved) => {
                    world.add_component(entity, resolved);
                }
                None => {
                    world.remove_component::<ResolvedAudio>(entity);
                }
            }
        }
    }
}
