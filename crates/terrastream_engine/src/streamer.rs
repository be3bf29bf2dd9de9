//! # World Streamer
//!
//! The orchestrator between a frame loop and the generation workers.
//!
//! The streamer owns the dedup ledger and the materialized chunk
//! collection; workers never see either. Per coordinate, for the lifetime
//! of the streamer, **at most one generation job is ever submitted** - that
//! is the core correctness property of the request protocol.
//!
//! ## Ordering
//!
//! Workers race independently, so completions arrive in any order. The
//! materialized collection is kept in completion order, not request order.
//!
//! ## Memory
//!
//! The ledger and the chunk collection grow monotonically and are never
//! evicted. This matches the source model and is a known scaling limit,
//! not a defect; bounding would require an explicit eviction policy.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use terrastream_procedural::{
    Chunk, ChunkCoord, ChunkGenerator, GridParams, NoiseField, NoiseProfile,
    NoiseProfileDescriptor, TerrainLayers, WorldSeed, LAYER_COUNT,
};

use crate::config::StreamerConfig;
use crate::error::EngineResult;
use crate::snapshot;
use crate::worker::{WorkerPool, WorkerPoolStats};

/// Everything needed to persist and reconstruct a streamer.
///
/// Beyond the ledger and chunks this carries the full generation parameter
/// set, so a reconstructed streamer reproduces bit-identical output for any
/// coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldStreamerState {
    /// World seed the noise profiles were built from.
    pub seed: WorldSeed,
    /// Reconstruction parameters for the four noise profiles.
    pub profiles: [NoiseProfileDescriptor; LAYER_COUNT],
    /// Per-layer weights.
    pub weights: [f64; LAYER_COUNT],
    /// Final multiplier on the weighted layer sum.
    pub final_weight: f64,
    /// Advisory world width in chunks.
    pub world_width: u32,
    /// Advisory world height in chunks.
    pub world_height: u32,
    /// Chunk side length in cells.
    pub chunk_size: u16,
    /// Lower clamp bound for terrain values.
    pub clamp_floor: u8,
    /// Dedup ledger in insertion order.
    pub generated: Vec<ChunkCoord>,
    /// Materialized chunks in completion order.
    pub chunks: Vec<Chunk>,
}

/// Streams an effectively-infinite world by dispatching chunk generation to
/// a worker pool and merging completed chunks back without blocking.
pub struct WorldStreamer<F: NoiseField = NoiseProfile> {
    generator: Arc<ChunkGenerator<F>>,
    pool: WorkerPool,
    seed: WorldSeed,
    requested: HashSet<ChunkCoord>,
    request_order: Vec<ChunkCoord>,
    chunks: Vec<Chunk>,
    chunk_index: HashMap<ChunkCoord, usize>,
}

impl WorldStreamer<NoiseProfile> {
    /// Builds a streamer from configuration.
    ///
    /// Draws a random world seed if the config does not pin one; everything
    /// downstream of the seed is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if the configuration cannot drive generation.
    pub fn new(config: &StreamerConfig) -> EngineResult<Self> {
        config.validate()?;

        let seed = match config.seed {
            Some(seed) => WorldSeed::new(seed),
            None => WorldSeed::new(rand::thread_rng().gen()),
        };
        tracing::info!("world seed: {}", seed.value());

        let layers = TerrainLayers::from_seed(
            seed,
            config.octaves,
            config.noise_weights,
            config.final_weight,
        );
        let generator = ChunkGenerator::new(layers, grid_params(config));
        Ok(Self::assemble(generator, seed, config.worker_count))
    }

    /// Reads a persisted [`WorldStreamerState`] back from disk.
    ///
    /// A failed load constructs nothing: any live streamer is untouched.
    ///
    /// # Errors
    ///
    /// Surfaces [`EngineError::SnapshotIo`](crate::EngineError::SnapshotIo) or
    /// [`EngineError::SnapshotFormat`](crate::EngineError::SnapshotFormat).
    pub fn load_snapshot(path: &Path) -> EngineResult<WorldStreamerState> {
        snapshot::load(path)
    }

    /// Reconstructs a streamer from a persisted state.
    ///
    /// The rebuilt profiles reproduce identical output for any coordinate;
    /// the ledger and chunk collection match the saved state exactly. Ledger
    /// entries are never resubmitted - at-most-once generation holds across
    /// save/load.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if `worker_count` is zero.
    pub fn from_state(state: WorldStreamerState, worker_count: usize) -> EngineResult<Self> {
        if worker_count == 0 {
            return Err(crate::EngineError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }

        let layers = TerrainLayers::new(
            state.profiles.map(NoiseProfile::from_descriptor),
            state.weights,
            state.final_weight,
        );
        let params = GridParams {
            chunk_size: usize::from(state.chunk_size),
            world_span_x: state.world_width,
            world_span_y: state.world_height,
            clamp_floor: state.clamp_floor,
        };
        let generator = ChunkGenerator::new(layers, params);

        let mut streamer = Self::assemble(generator, state.seed, worker_count);
        streamer.requested = state.generated.iter().copied().collect();
        streamer.request_order = state.generated;
        for chunk in state.chunks {
            streamer.materialize(chunk);
        }
        Ok(streamer)
    }

    /// Persists the full streamer state to `path`.
    ///
    /// Shuts the pool down first so no worker holds state, then drains
    /// every completed result before serializing - chunks finished in
    /// flight are part of the snapshot, not lost.
    ///
    /// # Errors
    ///
    /// Surfaces [`EngineError::SnapshotIo`](crate::EngineError::SnapshotIo) on
    /// write failure.
    pub fn save_snapshot(&mut self, path: &Path) -> EngineResult<()> {
        self.cleanup();
        while let Some(chunk) = self.pool.try_recv_result() {
            self.materialize(chunk);
        }

        let state = self.to_state();
        snapshot::save(&state, path)?;
        tracing::info!(
            "snapshot saved: {} ledger entries, {} chunks",
            state.generated.len(),
            state.chunks.len()
        );
        Ok(())
    }

    /// Copies the current state out for persistence.
    #[must_use]
    pub fn to_state(&self) -> WorldStreamerState {
        let layers = self.generator.layers();
        let params = self.generator.params();
        WorldStreamerState {
            seed: self.seed,
            profiles: layers.descriptors(),
            weights: layers.weights(),
            final_weight: layers.final_weight(),
            world_width: params.world_span_x,
            world_height: params.world_span_y,
            chunk_size: params.chunk_size as u16,
            clamp_floor: params.clamp_floor,
            generated: self.request_order.clone(),
            chunks: self.chunks.clone(),
        }
    }
}

impl<F: NoiseField + Send + Sync + 'static> WorldStreamer<F> {
    /// Builds a streamer over a caller-supplied generator.
    ///
    /// This is the seam for substituting closed-form noise fields in tests;
    /// production code goes through [`WorldStreamer::new`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if the configuration cannot drive generation.
    pub fn with_generator(
        config: &StreamerConfig,
        generator: ChunkGenerator<F>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let seed = WorldSeed::new(config.seed.unwrap_or(0));
        Ok(Self::assemble(generator, seed, config.worker_count))
    }

    fn assemble(generator: ChunkGenerator<F>, seed: WorldSeed, worker_count: usize) -> Self {
        let generator = Arc::new(generator);
        let pool = WorkerPool::spawn(Arc::clone(&generator), worker_count);
        Self {
            generator,
            pool,
            seed,
            requested: HashSet::new(),
            request_order: Vec::new(),
            chunks: Vec::new(),
            chunk_index: HashMap::new(),
        }
    }

    /// Requests generation of a set of chunk coordinates.
    ///
    /// Coordinates already in the dedup ledger are silently skipped -
    /// duplicates are normal control flow, not errors. New coordinates
    /// enter the ledger exactly once and are submitted exactly once.
    ///
    /// Coordinates outside the advisory world span are accepted; bounding
    /// is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PoolStopped`](crate::EngineError::PoolStopped)
    /// after [`cleanup`](Self::cleanup); the request is rejected wholesale.
    pub fn request_chunks<I>(&mut self, coords: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = ChunkCoord>,
    {
        if self.pool.is_stopped() {
            return Err(crate::EngineError::PoolStopped);
        }

        for coord in coords {
            if !self.requested.insert(coord) {
                continue;
            }
            self.request_order.push(coord);
            if self.is_outside_advisory_span(coord) {
                tracing::debug!(
                    "chunk ({}, {}) is outside the advisory world span",
                    coord.x,
                    coord.y
                );
            }
            self.pool.submit(coord)?;
        }
        Ok(())
    }

    /// Collects up to `max_count` completed chunks without blocking.
    ///
    /// Returns the newly materialized chunks in arrival order; an empty
    /// result means nothing was ready, the expected common case while
    /// generation lags behind requests. `max_count` bounds per-call work so
    /// a frame loop never stalls on slow generation.
    pub fn drain_ready_chunks(&mut self, max_count: usize) -> Vec<Chunk> {
        let mut drained = Vec::new();
        while drained.len() < max_count {
            let Some(chunk) = self.pool.try_recv_result() else {
                break;
            };
            self.materialize(chunk.clone());
            drained.push(chunk);
        }
        if !drained.is_empty() {
            tracing::debug!("materialized {} chunk(s)", drained.len());
        }
        drained
    }

    /// Shuts the worker pool down, letting in-flight jobs complete.
    ///
    /// Completed chunks stay drainable afterwards. Idempotent.
    pub fn cleanup(&mut self) {
        self.pool.shutdown();
    }

    /// Materialized chunks in completion order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Looks up a materialized chunk by coordinate.
    #[must_use]
    pub fn chunk_at(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunk_index.get(&coord).map(|&i| &self.chunks[i])
    }

    /// Dedup ledger in insertion order.
    #[must_use]
    pub fn generated_coords(&self) -> &[ChunkCoord] {
        &self.request_order
    }

    /// Whether a coordinate has ever been requested.
    #[must_use]
    pub fn is_requested(&self, coord: ChunkCoord) -> bool {
        self.requested.contains(&coord)
    }

    /// World seed in use.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Worker pool counters (submissions, completions, failures).
    #[must_use]
    pub fn pool_stats(&self) -> &WorkerPoolStats {
        self.pool.stats()
    }

    fn materialize(&mut self, chunk: Chunk) {
        self.chunk_index.insert(chunk.coord, self.chunks.len());
        self.chunks.push(chunk);
    }

    fn is_outside_advisory_span(&self, coord: ChunkCoord) -> bool {
        let params = self.generator.params();
        coord.x < 0
            || coord.y < 0
            || coord.x as u32 >= params.world_span_x
            || coord.y as u32 >= params.world_span_y
    }
}

fn grid_params(config: &StreamerConfig) -> GridParams {
    GridParams {
        chunk_size: config.chunk_size,
        world_span_x: config.world_chunk_size_x,
        world_span_y: config.world_chunk_size_y,
        clamp_floor: config.clamp_floor,
    }
}
