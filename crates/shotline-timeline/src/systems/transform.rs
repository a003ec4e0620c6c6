//! Transform resolution for active clips.

use shotline_ecs::entity::Entity;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{ClipState, ResolvedTransform, TransformComponent};

pub const TRANSFORM_SYSTEM: &str = "transform";
pub const TRANSFORM_PRIORITY: i32 = 200;

/// Gives every active clip that has a [`TransformComponent`] a
/// [`ResolvedTransform`], and takes it away from clips that went inactive.
#[derive(Debug, Default)]
pub struct TransformSystem;

impl System for TransformSystem {
    fn name(&self) -> &str {
        TRANSFORM_SYSTEM
    }

    fn priority(&self) -> i32 {
        TRANSFORM_PRIORITY
    }

    fn update(&mut self, world: &mut World, _delta_time: f64) {
        let clips: Vec<Entity> = world.entities_with::<ClipState>();
        for entity in clips {
            let active = world
                .get_component::<ClipState>(entity)
                .is_some_and(|s| s.active);
            let resolved = world
                .get_component::<TransformComponent>(entity)
                .filter(|_| active)
                .map(|t| ResolvedTransform {
                    matrix: t.matrix(),
                    opacity: t.opacity.clamp(0.0, 1.0),
                });
            match resolved {
                Some(resolved) => {
                    world.add_component(entity, resolved);
                }
                None => {
                    world.remove_component::<ResolvedTransform>(entity);
                }
            }
        }
    }
}
