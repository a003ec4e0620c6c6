//! Effect stack ordering.

use shotline_ecs::entity::Entity;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{ClipState, EffectComponent};

pub const EFFECT_PROCESSING_SYSTEM: &str = "effect_processing";
pub const EFFECT_PROCESSING_PRIORITY: i32 = 300;

/// Keeps every effect stack sorted by `order` (ties keep insertion order)
/// and counts the enabled effects that apply this tick.
#[derive(Debug, Default)]
pub struct EffectProcessingSystem {
    active_effects: usize,
}

impl EffectProcessingSystem {
    /// Enabled effects on active clips, as of the last update.
    pub fn active_effects(&self) -> usize {
        self.active_effects
    }
}

impl System for EffectProcessingSystem {
    fn name(&self) -> &str {
        EFFECT_PROCESSING_SYSTEM
    }

    fn priority(&self) -> i32 {
        EFFECT_PROCESSING_PRIORITY
    }

    fn update(&mut self, world: &mut World, _delta_time: f64) {
        self.active_effects = 0;
        let stacks: Vec<Entity> = world.entities_with::<EffectComponent>();
        for entity in stacks {
            let active = world
                .get_component::<ClipState>(entity)
                .is_some_and(|s| s.active);
            let Some(stack) = world.get_component_mut::<EffectComponent>(entity) else {
                continue;
            };
            stack.effects.sort_by_key(|e| e.order);
            if active {
                self.active_effects += stack.enabled_count();
            }
        }
    }
}
