//! The timeline engine driver.
//!
//! [`TimelineEngine`] owns a [`World`] with one playhead entity and the six
//! default systems. Editing calls (`add_track`, `add_video_clip`, ...) create
//! entities; transport calls (`play`, `pause`, `seek`) edit the playhead; and
//! `tick` / `run_ticks` advance the world.

use shotline_ecs::entity::Entity;
use shotline_ecs::world::World;
use shotline_ecs::EcsError;

use crate::components::{
    AudioClipComponent, ClipComponent, MarkerComponent, PlayheadComponent, TimelineComponent,
    TrackComponent, TrackKind, TransformComponent, VideoClipComponent,
};
use crate::config::EngineConfig;
use crate::snapshot::ProjectSnapshot;
use crate::systems::render::{RenderList, RenderSystem, RENDER_SYSTEM};
use crate::systems::timeline::timeline_duration;
use crate::systems::register_default_systems;
use crate::TimelineError;

/// Drives a timeline project tick by tick.
pub struct TimelineEngine {
    world: World,
    config: EngineConfig,
    playhead: Entity,
    /// Returned when the render system is missing.
    empty_render_list: RenderList,
}

impl std::fmt::Debug for TimelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEngine")
            .field("world", &self.world)
            .field("playhead", &self.playhead)
            .field("frame_rate", &self.config.frame_rate)
            .finish()
    }
}

impl TimelineEngine {
    /// Build an engine with an empty timeline.
    ///
    /// # Errors
    ///
    /// [`TimelineError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: EngineConfig) -> Result<Self, TimelineError> {
        config.validate()?;
        let mut world = World::with_config(config.world.clone())?;
        let playhead = spawn_playhead(&mut world, config.loop_playback)?;
        register_default_systems(&mut world)?;
        tracing::debug!(
            frame_rate = config.frame_rate,
            looping = config.loop_playback,
            "timeline engine created"
        );
        Ok(Self {
            world,
            config,
            playhead,
            empty_render_list: RenderList::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- editing --------------------------------------------------------------

    /// Add a track one index above the highest existing track, so indices
    /// stay unique after removals.
    ///
    /// # Errors
    ///
    /// Fails if the entity capacity is exhausted.
    pub fn add_track(&mut self, name: &str, kind: TrackKind) -> Result<Entity, TimelineError> {
        let index = self
            .world
            .components()
            .table::<TrackComponent>()
            .and_then(|table| table.iter().map(|(_, track)| track.index).max())
            .map_or(0, |highest| highest + 1);
        let entity = self.world.create_entity()?;
        self.world.add_component(
            entity,
            TrackComponent {
                name: name.to_owned(),
                kind,
                index,
                muted: false,
                locked: false,
            },
        );
        Ok(entity)
    }

    /// Add a video clip with an identity transform.
    ///
    /// # Errors
    ///
    /// Fails if the entity capacity is exhausted.
    pub fn add_video_clip(
        &mut self,
        clip: ClipComponent,
        video: VideoClipComponent,
    ) -> Result<Entity, TimelineError> {
        let entity = self.world.create_entity()?;
        self.world.add_component(entity, clip);
        self.world.add_component(entity, video);
        self.world.add_component(entity, TransformComponent::default());
        Ok(entity)
    }

    /// # Errors
    ///
    /// Fails if the entity capacity is exhausted.
    pub fn add_audio_clip(
        &mut self,
        clip: ClipComponent,
        audio: AudioClipComponent,
    ) -> Result<Entity, TimelineError> {
        let entity = self.world.create_entity()?;
        self.world.add_component(entity, clip);
        self.world.add_component(entity, audio);
        Ok(entity)
    }

    /// # Errors
    ///
    /// Fails if the entity capacity is exhausted.
    pub fn add_marker(&mut self, time: f64, label: &str) -> Result<Entity, TimelineError> {
        let entity = self.world.create_entity()?;
        self.world.add_component(
            entity,
            MarkerComponent {
                time,
                label: label.to_owned(),
                ..Default::default()
            },
        );
        Ok(entity)
    }

    /// Remove a clip, track or marker. Returns `false` for a stale handle or
    /// the playhead.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if entity == self.playhead {
            return false;
        }
        self.world.destroy_entity(entity)
    }

    // -- transport ------------------------------------------------------------

    /// Start playback. A looping playhead parked at the end starts over.
    pub fn play(&mut self) {
        let duration = self.timeline_duration();
        if let Some(p) = self.playhead_mut() {
            p.playing = true;
            if p.looping && duration > 0.0 && p.position >= duration {
                p.position = p.position.rem_euclid(duration);
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(p) = self.playhead_mut() {
            p.playing = false;
        }
    }

    /// Move the playhead, clamped to `[0, timeline_duration]`. A looping
    /// playhead wraps targets at or past the end instead, the same way
    /// playback does.
    ///
    /// Clip state catches up on the next tick.
    pub fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            tracing::warn!(time, "ignoring non-finite seek target");
            return;
        }
        let duration = self.timeline_duration();
        if let Some(p) = self.playhead_mut() {
            p.position = if p.looping && duration > 0.0 && time >= duration {
                time.rem_euclid(duration)
            } else {
                time.clamp(0.0, duration)
            };
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        if let Some(p) = self.playhead_mut() {
            p.looping = looping;
        }
    }

    /// Advance the world by `delta_time` seconds (before time scaling).
    pub fn tick(&mut self, delta_time: f64) {
        self.world.update(delta_time);
    }

    /// Run `count` ticks of one frame each. Returns the world's tick count.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let frame = self.config.frame_duration();
        for _ in 0..count {
            self.tick(frame);
        }
        self.world.tick_count()
    }

    // -- queries --------------------------------------------------------------

    /// Current playhead position in seconds.
    pub fn playhead(&self) -> f64 {
        self.playhead_component().map_or(0.0, |p| p.position)
    }

    pub fn is_playing(&self) -> bool {
        self.playhead_component().is_some_and(|p| p.playing)
    }

    pub fn playhead_entity(&self) -> Entity {
        self.playhead
    }

    /// End of the last clip.
    pub fn timeline_duration(&self) -> f64 {
        timeline_duration(&self.world)
    }

    /// What the last tick found visible.
    pub fn render_list(&self) -> &RenderList {
        self.world
            .get_system_as::<RenderSystem>(RENDER_SYSTEM)
            .map_or(&self.empty_render_list, RenderSystem::render_list)
    }

    /// Markers sorted by time.
    pub fn markers(&self) -> Vec<(Entity, &MarkerComponent)> {
        let mut markers: Vec<(Entity, &MarkerComponent)> = self
            .world
            .components()
            .table::<MarkerComponent>()
            .map(|table| table.iter().collect())
            .unwrap_or_default();
        markers.sort_by(|a, b| a.1.time.total_cmp(&b.1.time));
        markers
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // -- persistence ----------------------------------------------------------

    pub fn capture_snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot::capture(&self.world)
    }

    /// Replace the project with the contents of `snapshot`.
    ///
    /// Registered systems are kept; after [`shutdown`](Self::shutdown) the
    /// default systems are registered again. If the snapshot carries no
    /// playhead a new stopped one is created.
    ///
    /// # Errors
    ///
    /// Anything [`ProjectSnapshot::validate`] reports, or
    /// [`EcsError::CapacityExceeded`](shotline_ecs::EcsError::CapacityExceeded)
    /// if the project would not fit. Both are checked before the current
    /// project is cleared, which leaves it untouched on error.
    pub fn restore_snapshot(&mut self, snapshot: &ProjectSnapshot) -> Result<(), TimelineError> {
        snapshot.validate()?;
        let has_playhead = snapshot
            .entities
            .iter()
            .any(|record| record.components.contains_key(PlayheadComponent::NAME));
        let needed = snapshot.entities.len() + usize::from(!has_playhead);
        let max = self.world.entity_registry().max_entities();
        if needed > max {
            return Err(EcsError::CapacityExceeded { max }.into());
        }

        let existing: Vec<Entity> = self.world.entities().collect();
        for entity in existing {
            self.world.destroy_entity(entity);
        }

        snapshot.restore_into(&mut self.world)?;
        if self.world.systems().is_empty() {
            register_default_systems(&mut self.world)?;
        }
        self.playhead = match self.world.entities_with::<PlayheadComponent>().first() {
            Some(&entity) => entity,
            None => spawn_playhead(&mut self.world, self.config.loop_playback)?,
        };
        Ok(())
    }

    /// Tear down systems and drop every entity. The engine does nothing
    /// afterwards until a snapshot is restored.
    pub fn shutdown(&mut self) {
        self.world.cleanup();
        self.playhead = Entity::INVALID;
        tracing::debug!("timeline engine shut down");
    }

    fn playhead_component(&self) -> Option<&PlayheadComponent> {
        self.world.get_component::<PlayheadComponent>(self.playhead)
    }

    fn playhead_mut(&mut self) -> Option<&mut PlayheadComponent> {
        self.world.get_component_mut::<PlayheadComponent>(self.playhead)
    }
}

fn spawn_playhead(world: &mut World, looping: bool) -> Result<Entity, TimelineError> {
    let entity = world.create_entity()?;
    world.add_component(
        entity,
        PlayheadComponent {
            position: 0.0,
            playing: false,
            looping,
        },
    );
    Ok(entity)
}
