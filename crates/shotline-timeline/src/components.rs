//! Timeline component types.
//!
//! Authored components describe the project: clips, their media, transforms,
//! effects, tracks, markers and the playhead. They are serializable and
//! carry a stable [`TimelineComponent::NAME`] used by project snapshots.
//!
//! [`ClipState`], [`ResolvedTransform`] and [`ResolvedAudio`] are written by
//! the systems every tick and are never snapshotted.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shotline_ecs::component::Component;

/// A 2x3 affine matrix, row-major: `[[a, b, tx], [c, d, ty]]`.
pub type Matrix2x3 = [[f64; 3]; 2];

/// The identity transform.
pub const IDENTITY_MATRIX: Matrix2x3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// A component that can be written to and read back from a project snapshot.
pub trait TimelineComponent: Component + Clone + Serialize + DeserializeOwned {
    /// Stable name used as the snapshot key.
    const NAME: &'static str;
}

// ---------------------------------------------------------------------------
// Clips
// ---------------------------------------------------------------------------

/// Placement of a clip on the timeline. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipComponent {
    pub name: String,
    /// Where the clip starts on the timeline.
    pub start_time: f64,
    pub duration: f64,
    /// Offset into the source media at which playback of the clip begins.
    pub in_point: f64,
    pub track_index: u32,
    pub enabled: bool,
}

impl Default for ClipComponent {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_time: 0.0,
            duration: 0.0,
            in_point: 0.0,
            track_index: 0,
            enabled: true,
        }
    }
}

impl ClipComponent {
    pub fn new(name: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            start_time,
            duration,
            ..Self::default()
        }
    }

    pub fn on_track(mut self, track_index: u32) -> Self {
        self.track_index = track_index;
        self
    }

    pub fn with_in_point(mut self, in_point: f64) -> Self {
        self.in_point = in_point;
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Half-open: the clip covers `[start_time, end_time)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }
}

impl TimelineComponent for ClipComponent {
    const NAME: &'static str = "clip";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoClipComponent {
    pub source_path: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl VideoClipComponent {
    pub fn new(source_path: impl Into<String>, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            source_path: source_path.into(),
            width,
            height,
            frame_rate,
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Width over height, or `0.0` for a zero-height source.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }
}

impl TimelineComponent for VideoClipComponent {
    const NAME: &'static str = "video_clip";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioClipComponent {
    pub source_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Linear gain, 1.0 is unity.
    pub volume: f64,
    /// -1.0 is hard left, 1.0 hard right.
    pub pan: f64,
    pub muted: bool,
}

impl Default for AudioClipComponent {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            sample_rate: 48_000,
            channels: 2,
            volume: 1.0,
            pan: 0.0,
            muted: false,
        }
    }
}

impl AudioClipComponent {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Self::default()
        }
    }
}

impl TimelineComponent for AudioClipComponent {
    const NAME: &'static str = "audio_clip";
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// 2D placement of a visual clip. Rotation is in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformComponent {
    pub position: [f64; 2],
    pub scale: [f64; 2],
    pub rotation: f64,
    /// Pivot for scale and rotation, in clip-local units.
    pub anchor: [f64; 2],
    pub opacity: f64,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
            anchor: [0.0, 0.0],
            opacity: 1.0,
        }
    }
}

impl TransformComponent {
    /// `translate(position) * rotate(rotation) * scale(scale) * translate(-anchor)`.
    pub fn matrix(&self) -> Matrix2x3 {
        let (sin, cos) = self.rotation.sin_cos();
        let [sx, sy] = self.scale;
        let [ax, ay] = self.anchor;
        let (a, b) = (cos * sx, -sin * sy);
        let (c, d) = (sin * sx, cos * sy);
        let tx = self.position[0] - (a * ax + b * ay);
        let ty = self.position[1] - (c * ax + d * ay);
        [[a, b, tx], [c, d, ty]]
    }
}

impl TimelineComponent for TransformComponent {
    const NAME: &'static str = "transform";
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectInstance {
    /// Effect identifier, e.g. `"blur"` or `"color_correct"`.
    pub kind: String,
    pub enabled: bool,
    /// Lower applies first.
    pub order: i32,
    pub parameters: BTreeMap<String, f64>,
}

impl Default for EffectInstance {
    fn default() -> Self {
        Self {
            kind: String::new(),
            enabled: true,
            order: 0,
            parameters: BTreeMap::new(),
        }
    }
}

impl EffectInstance {
    pub fn new(kind: impl Into<String>, order: i32) -> Self {
        Self {
            kind: kind.into(),
            order,
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

/// The effect stack of one clip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectComponent {
    pub effects: Vec<EffectInstance>,
}

impl EffectComponent {
    pub fn push(&mut self, effect: EffectInstance) {
        self.effects.push(effect);
    }

    /// Kinds of the enabled effects, in stack order.
    pub fn enabled_kinds(&self) -> Vec<String> {
        self.effects
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.kind.clone())
            .collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.effects.iter().filter(|e| e.enabled).count()
    }
}

impl TimelineComponent for EffectComponent {
    const NAME: &'static str = "effects";
}

// ---------------------------------------------------------------------------
// Tracks, markers, metadata, playhead
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackComponent {
    pub name: String,
    pub kind: TrackKind,
    /// Matched against [`ClipComponent::track_index`].
    pub index: u32,
    pub muted: bool,
    pub locked: bool,
}

impl TimelineComponent for TrackComponent {
    const NAME: &'static str = "track";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerComponent {
    pub time: f64,
    pub label: String,
    /// RGBA.
    pub color: [u8; 4],
}

impl Default for MarkerComponent {
    fn default() -> Self {
        Self {
            time: 0.0,
            label: String::new(),
            color: [255, 255, 255, 255],
        }
    }
}

impl TimelineComponent for MarkerComponent {
    const NAME: &'static str = "marker";
}

/// Facts about a source file, as probed at import.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetadataComponent {
    pub path: String,
    pub duration: f64,
    pub codec: String,
    pub file_size: u64,
}

impl TimelineComponent for FileMetadataComponent {
    const NAME: &'static str = "file_metadata";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayheadComponent {
    /// Seconds from the start of the timeline.
    pub position: f64,
    pub playing: bool,
    /// Wrap to the start instead of stopping at the end.
    pub looping: bool,
}

impl TimelineComponent for PlayheadComponent {
    const NAME: &'static str = "playhead";
}

// ---------------------------------------------------------------------------
// System-written state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipState {
    pub active: bool,
    /// Position inside the source media.
    pub local_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTransform {
    pub matrix: Matrix2x3,
    pub opacity: f64,
}

impl Default for ResolvedTransform {
    fn default() -> Self {
        Self {
            matrix: IDENTITY_MATRIX,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedAudio {
    pub gain: f64,
    pub pan: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
