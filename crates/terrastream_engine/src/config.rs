//! # Streamer Configuration
//!
//! The configuration surface consumed (not owned) by the engine. Defaults
//! match the original terrain generator's constants; every field can be
//! overridden from a TOML file loaded once at startup.

use serde::Deserialize;
use terrastream_procedural::LAYER_COUNT;

use crate::error::{EngineError, EngineResult};

/// Largest chunk side length the snapshot format can record.
const MAX_CHUNK_SIZE: usize = u16::MAX as usize;

/// Configuration for a [`WorldStreamer`](crate::WorldStreamer).
///
/// `world_chunk_size_x`/`_y` are normalization denominators for noise
/// sampling, not hard world bounds: requests outside the advisory span are
/// accepted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamerConfig {
    /// Chunk side length in cells.
    pub chunk_size: usize,
    /// Advisory world width in chunks (noise normalization denominator).
    pub world_chunk_size_x: u32,
    /// Advisory world height in chunks (noise normalization denominator).
    pub world_chunk_size_y: u32,
    /// Frequency band for each of the four noise layers.
    pub octaves: [u32; LAYER_COUNT],
    /// Relative weight of each noise layer.
    pub noise_weights: [f64; LAYER_COUNT],
    /// Multiplier applied to the weighted layer sum.
    pub final_weight: f64,
    /// Lower clamp bound for terrain values (0 or 1 in known variants).
    pub clamp_floor: u8,
    /// Number of generation worker threads.
    pub worker_count: usize,
    /// Suggested per-frame drain limit for callers.
    pub drain_limit: usize,
    /// Fixed world seed; `None` draws a random seed at construction.
    pub seed: Option<u64>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8,
            world_chunk_size_x: 64,
            world_chunk_size_y: 64,
            octaves: [4, 12, 48, 128],
            noise_weights: [1.0, 0.5, 0.25, 0.125],
            final_weight: 200.0,
            clamp_floor: 0,
            worker_count: 8,
            drain_limit: 8,
            seed: None,
        }
    }
}

impl StreamerConfig {
    /// Parses a configuration from TOML and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] on parse or validation
    /// failure.
    pub fn from_toml_str(input: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive generation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first broken
    /// field.
    pub fn validate(&self) -> EngineResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.world_chunk_size_x == 0 || self.world_chunk_size_y == 0 {
            return Err(EngineError::InvalidConfig(
                "world_chunk_size_x/y must be non-zero".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if !self.final_weight.is_finite() {
            return Err(EngineError::InvalidConfig(
                "final_weight must be finite".to_string(),
            ));
        }
        if self.noise_weights.iter().any(|w| !w.is_finite()) {
            return Err(EngineError::InvalidConfig(
                "noise weights must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
