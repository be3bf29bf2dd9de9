//! # TERRASTREAM Procedural Generation
//!
//! Deterministic terrain mathematics for an effectively-infinite 2D world.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed always produces the same world
//! 2. **Chunked**: terrain is generated in fixed-size square chunks
//! 3. **Pure**: generation is side-effect free, safe on any worker thread
//!
//! ## Core Components
//!
//! - [`NoiseProfile`]: seeded scalar noise fixed at one frequency band
//! - [`TerrainLayers`]: four weighted profiles composed into terrain values
//! - [`ChunkGenerator`]: pure coordinate -> grid mapping
//!
//! ## Example
//!
//! ```rust
//! use terrastream_procedural::{
//!     ChunkCoord, ChunkGenerator, GridParams, TerrainLayers, WorldSeed,
//! };
//!
//! let layers = TerrainLayers::from_seed(
//!     WorldSeed::new(42),
//!     [4, 12, 48, 128],
//!     [1.0, 0.5, 0.25, 0.125],
//!     200.0,
//! );
//! let generator = ChunkGenerator::new(layers, GridParams::default());
//!
//! let chunk = generator.generate(ChunkCoord::new(-3, 7));
//! assert_eq!(chunk.terrain().size(), 8);
//! ```

pub mod chunk;
pub mod noise;

pub use chunk::{Chunk, ChunkCoord, ChunkGenerator, GridParams, TerrainGrid, DEFAULT_CHUNK_SIZE};
pub use noise::{
    NoiseField, NoiseProfile, NoiseProfileDescriptor, SimplexNoise, TerrainLayers, WorldSeed,
    LAYER_COUNT,
};
