//! # Engine Error Types
//!
//! Failures that can surface to the caller. Worker-local generation
//! failures are deliberately absent: they are caught inside the worker
//! loop, logged, and skipped without ever crossing a channel.

use thiserror::Error;

/// Errors surfaced by the streaming engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or malformed configuration. Fatal at construction time: no
    /// core operation proceeds without valid noise and chunk parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request arrived after the worker pool was shut down. The request
    /// is rejected, not silently dropped.
    #[error("worker pool is stopped, request rejected")]
    PoolStopped,

    /// Snapshot file could not be read or written.
    #[error("snapshot I/O failed: {0}")]
    SnapshotIo(#[from] std::io::Error),

    /// Snapshot bytes do not form a valid record. A failed load leaves any
    /// existing in-memory state untouched.
    #[error("malformed snapshot: {0}")]
    SnapshotFormat(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
