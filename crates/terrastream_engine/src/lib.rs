//! # TERRASTREAM Engine
//!
//! Streams an effectively-infinite 2D world to a caller-owned frame loop:
//! terrain is generated on demand in fixed-size chunks by a fixed pool of
//! worker threads and merged back into a live world model without blocking.
//!
//! ## Control Flow
//!
//! ```text
//! caller ──▶ WorldStreamer::request_chunks   (dedup, enqueue)
//!                      │
//!                      ▼
//!             WorkerPool workers             (pure generation)
//!                      │
//!                      ▼
//! caller ◀── WorldStreamer::drain_ready_chunks   (bounded, non-blocking)
//! ```
//!
//! The snapshot store persists the full streamer state on shutdown and
//! reconstructs an equivalent streamer on load.
//!
//! ## Example
//!
//! ```rust
//! use terrastream_engine::{StreamerConfig, WorldStreamer};
//! use terrastream_procedural::ChunkCoord;
//!
//! let config = StreamerConfig {
//!     seed: Some(42),
//!     ..StreamerConfig::default()
//! };
//! let mut streamer = WorldStreamer::new(&config)?;
//!
//! streamer.request_chunks([ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)])?;
//!
//! // Once per frame: collect whatever finished, never more than the limit.
//! let ready = streamer.drain_ready_chunks(config.drain_limit);
//! assert!(ready.len() <= config.drain_limit);
//!
//! streamer.cleanup();
//! # Ok::<(), terrastream_engine::EngineError>(())
//! ```

pub mod config;
pub mod error;
pub mod snapshot;
pub mod streamer;
pub mod worker;

pub use config::StreamerConfig;
pub use error::{EngineError, EngineResult};
pub use streamer::{WorldStreamer, WorldStreamerState};
pub use worker::{Job, WorkerPool, WorkerPoolStats};
