//! Render list assembly.

use serde::{Deserialize, Serialize};
use shotline_ecs::entity::Entity;
use shotline_ecs::query::Query;
use shotline_ecs::system::System;
use shotline_ecs::world::World;

use crate::components::{
    ClipComponent, ClipState, EffectComponent, Matrix2x3, ResolvedTransform, VideoClipComponent,
};
use crate::systems::playhead_position;

pub const RENDER_SYSTEM: &str = "render";
pub const RENDER_PRIORITY: i32 = 1000;

/// One visible video clip, ready for a compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    pub entity: Entity,
    pub track_index: u32,
    pub source_path: String,
    /// Position inside the source media.
    pub local_time: f64,
    pub matrix: Matrix2x3,
    pub opacity: f64,
    /// Enabled effect kinds in application order.
    pub effects: Vec<String>,
}

/// Everything visible at one playhead position, bottom track first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderList {
    pub playhead: f64,
    pub items: Vec<RenderItem>,
}

impl RenderList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Rebuilds the [`RenderList`] every tick from active video clips that have
/// a resolved transform. Items are ordered by `(track_index, entity)`.
#[derive(Debug, Default)]
pub struct RenderSystem {
    render_list: RenderList,
}

impl RenderSystem {
    pub fn render_list(&self) -> &RenderList {
        &self.render_list
    }
}

impl System for RenderSystem {
    fn name(&self) -> &str {
        RENDER_SYSTEM
    }

    fn priority(&self) -> i32 {
        RENDER_PRIORITY
    }

    fn update(&mut self, world: &mut World, _delta_time: f64) {
        let query = Query::new()
            .require::<ClipComponent>()
            .require::<VideoClipComponent>()
            .require::<ClipState>()
            .require::<ResolvedTransform>()
            .optional::<EffectComponent>();

        let mut items: Vec<RenderItem> = world
            .query_entities(&query)
            .filter_map(|entity| {
                let state = world.get_component::<ClipState>(entity)?;
                if !state.active {
                    return None;
                }
                let clip = world.get_component::<ClipComponent>(entity)?;
                let video = world.get_component::<VideoClipComponent>(entity)?;
                let transform = world.get_component::<ResolvedTransform>(entity)?;
                let effects = world
                    .get_component::<EffectComponent>(entity)
                    .map(EffectComponent::enabled_kinds)
                    .unwrap_or_default();
                Some(RenderItem {
                    entity,
                    track_index: clip.track_index,
                    source_path: video.source_path.clone(),
                    local_time: state.local_time,
                    matrix: transform.matrix,
                    opacity: transform.opacity,
                    effects,
                })
            })
            .collect();
        items.sort_by_key(|item| (item.track_index, item.entity));

        self.render_list = RenderList {
            playhead: playhead_position(world),
            items,
        };
        tracing::trace!(items = self.render_list.len(), "render list rebuilt");
    }

    fn cleanup(&mut self, _world: &mut World) {
        self.render_list = RenderList::default();
    }
}
