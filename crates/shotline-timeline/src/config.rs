//! Engine configuration.
//!
//! [`EngineConfig`] is plain serde data. Every field has a default, so a
//! config file only needs the keys it wants to change:
//!
//! ```
//! use shotline_timeline::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "frame_rate": 24.0 }"#).unwrap();
//! assert_eq!(config.frame_rate, 24.0);
//! assert!(!config.loop_playback);
//! assert_eq!(config.world.time_scale, 1.0);
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shotline_ecs::world::WorldConfig;

use crate::TimelineError;

/// Configuration for a [`TimelineEngine`](crate::engine::TimelineEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    /// Ticks per second used by `run_ticks`. Must be positive and finite.
    pub frame_rate: f64,
    /// Whether the playhead wraps at the end of the timeline.
    pub loop_playback: bool,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    /// 30 fps, no looping, `warn` logging.
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            frame_rate: 30.0,
            loop_playback: false,
            log_filter: "warn".to_owned(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// [`TimelineError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(TimelineError::InvalidConfig(format!(
                "frame_rate must be positive and finite, got {}",
                self.frame_rate
            )));
        }
        if !(self.world.time_scale.is_finite() && self.world.time_scale >= 0.0) {
            return Err(TimelineError::InvalidConfig(format!(
                "world.time_scale must be finite and >= 0, got {}",
                self.world.time_scale
            )));
        }
        if self.world.max_entities == 0 {
            return Err(TimelineError::InvalidConfig(
                "world.max_entities must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// [`TimelineError::Json`] for malformed input, or whatever
    /// [`validate`](Self::validate) reports.
    pub fn from_json_str(json: &str) -> Result<Self, TimelineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("failed to load engine config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Seconds per tick at the configured frame rate.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate
    }
}
