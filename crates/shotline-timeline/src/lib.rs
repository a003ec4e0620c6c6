//! Shotline Timeline -- video-editing timeline bookkeeping on top of
//! [`shotline_ecs`].
//!
//! Clips, tracks, markers and the playhead are plain components on ECS
//! entities. Six systems run every tick in a fixed priority order: the
//! playhead advances, clips are activated against it, transforms and audio
//! gains are resolved, effect stacks are ordered, and finally a render list
//! of visible video clips is assembled for whatever draws frames.
//!
//! # Quick Start
//!
//! ```
//! use shotline_timeline::prelude::*;
//!
//! let mut engine = TimelineEngine::new(EngineConfig::default()).unwrap();
//! let track = engine.add_track("V1", TrackKind::Video).unwrap();
//! let clip = engine
//!     .add_video_clip(
//!         ClipComponent::new("intro", 0.0, 5.0).on_track(0),
//!         VideoClipComponent::new("intro.mp4", 1920, 1080, 30.0),
//!     )
//!     .unwrap();
//! assert!(engine.world().is_alive(track));
//!
//! engine.play();
//! engine.run_ticks(30);
//! assert!((engine.playhead() - 1.0).abs() < 1e-9);
//! assert_eq!(engine.render_list().items[0].entity, clip);
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod config;
pub mod engine;
pub mod logging;
pub mod snapshot;
pub mod systems;

use shotline_ecs::EcsError;

/// Re-export the ECS crate for convenience.
pub use shotline_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by timeline operations.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A snapshot's recorded hash does not match its contents.
    #[error(
        "snapshot hash mismatch: recorded {recorded} but recomputed {computed}. \
         The snapshot may be corrupted or tampered with."
    )]
    SnapshotHashMismatch { recorded: String, computed: String },

    /// A snapshot names a component this crate does not know how to restore.
    #[error("component type '{name}' not known. Known components: [{known}]")]
    UnknownComponent { name: String, known: String },

    /// A snapshot component value does not fit its type.
    #[error("failed to deserialize component '{component}': {source}")]
    ComponentDeserialization {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common timeline usage.
pub mod prelude {
    pub use shotline_ecs::prelude::*;

    pub use crate::components::{
        AudioClipComponent, ClipComponent, ClipState, EffectComponent, EffectInstance,
        FileMetadataComponent, MarkerComponent, PlayheadComponent, ResolvedAudio,
        ResolvedTransform, TimelineComponent, TrackComponent, TrackKind, TransformComponent,
        VideoClipComponent,
    };
    pub use crate::config::EngineConfig;
    pub use crate::engine::TimelineEngine;
    pub use crate::logging::init_tracing;
    pub use crate::snapshot::{EntityRecord, ProjectSnapshot};
    pub use crate::systems::{
        register_default_systems, AudioSystem, ClipProcessingSystem, EffectProcessingSystem,
        RenderItem, RenderList, RenderSystem, TimelineSystem, TransformSystem,
    };
    pub use crate::TimelineError;
}
