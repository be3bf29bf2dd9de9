//! # Generation Worker Pool
//!
//! A fixed pool of threads pulling chunk-coordinate jobs from a shared
//! request channel and pushing completed chunks to a shared result channel.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌─────────────┐
//!   submit(coord) ──▶  │ job channel │ ──▶ worker 1..N ──┐
//!                      │ (unbounded) │     (generate)    │
//!                      └─────────────┘                   ▼
//!                                              ┌────────────────┐
//!   try_recv_result() ◀─────────────────────── │ result channel │
//!                                              └────────────────┘
//! ```
//!
//! Channels are unbounded: submission never blocks and no job is ever
//! silently dropped. Workers never communicate with each other; the only
//! shared state is the read-only generator behind an `Arc`.
//!
//! ## Failure Semantics
//!
//! A worker that hits a generation panic logs it, counts it, and continues
//! its loop. Only the typed [`Job::Stop`] sentinel terminates a worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use terrastream_procedural::{Chunk, ChunkCoord, ChunkGenerator, NoiseField};

use crate::error::{EngineError, EngineResult};

/// A job on the request channel.
///
/// The tagged `Stop` variant replaces any in-band sentinel value: it can
/// never be confused with real coordinate data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Generate the chunk at this coordinate.
    Generate(ChunkCoord),
    /// Exit the worker loop.
    Stop,
}

/// Counters shared between the pool handle and its workers.
#[derive(Debug, Default)]
pub struct WorkerPoolStats {
    /// Jobs accepted onto the request channel.
    jobs_submitted: AtomicU64,
    /// Chunks pushed onto the result channel.
    chunks_completed: AtomicU64,
    /// Jobs abandoned after a generation failure.
    jobs_failed: AtomicU64,
}

impl WorkerPoolStats {
    /// Jobs accepted onto the request channel.
    #[must_use]
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Chunks pushed onto the result channel.
    #[must_use]
    pub fn chunks_completed(&self) -> u64 {
        self.chunks_completed.load(Ordering::Relaxed)
    }

    /// Jobs abandoned after a generation failure.
    #[must_use]
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }
}

/// Fixed pool of generation workers.
///
/// The pool is the only component that crosses threads. Job and result
/// channels are multi-producer/multi-consumer; the generator is shared
/// read-only.
pub struct WorkerPool {
    job_tx: Sender<Job>,
    result_rx: Receiver<Chunk>,
    handles: Vec<JoinHandle<()>>,
    stats: Arc<WorkerPoolStats>,
    stopped: bool,
}

impl WorkerPool {
    /// Starts `worker_count` threads over a shared generator.
    #[must_use]
    pub fn spawn<F>(generator: Arc<ChunkGenerator<F>>, worker_count: usize) -> Self
    where
        F: NoiseField + Send + Sync + 'static,
    {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<Chunk>();
        let stats = Arc::new(WorkerPoolStats::default());

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let generator = Arc::clone(&generator);
            let stats = Arc::clone(&stats);

            handles.push(thread::spawn(move || {
                worker_loop(worker_id, &jobs, &results, &generator, &stats);
            }));
        }
        // Workers hold the only result senders: once they all exit, the
        // channel disconnects after its buffered chunks are drained.
        drop(result_tx);

        tracing::info!("worker pool started with {} worker(s)", worker_count);

        Self {
            job_tx,
            result_rx,
            handles,
            stats,
            stopped: false,
        }
    }

    /// Enqueues a generation job. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PoolStopped`] after [`shutdown`](Self::shutdown).
    pub fn submit(&self, coord: ChunkCoord) -> EngineResult<()> {
        if self.stopped {
            return Err(EngineError::PoolStopped);
        }
        self.job_tx
            .send(Job::Generate(coord))
            .map_err(|_| EngineError::PoolStopped)?;
        self.stats.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Non-blocking poll for one completed chunk.
    ///
    /// `None` means nothing is ready right now - the expected common case
    /// while generation lags behind requests. Chunks finished before a
    /// shutdown remain receivable after it.
    #[must_use]
    pub fn try_recv_result(&self) -> Option<Chunk> {
        self.result_rx.try_recv().ok()
    }

    /// Stops the pool: one [`Job::Stop`] per worker, then joins them all.
    ///
    /// In-flight jobs complete before their worker sees the sentinel (the
    /// job channel is FIFO). Idempotent: a second call is a documented
    /// no-op.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        for _ in 0..self.handles.len() {
            // Send can only fail if every worker already exited.
            let _ = self.job_tx.send(Job::Stop);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside a job");
            }
        }

        tracing::info!("worker pool stopped");
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> &WorkerPoolStats {
        &self.stats
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pull-compute-push loop run by each worker thread.
///
/// Blocks only on the job channel. A generation panic is confined to the
/// failing job: the worker logs it and keeps serving.
fn worker_loop<F: NoiseField>(
    worker_id: usize,
    jobs: &Receiver<Job>,
    results: &Sender<Chunk>,
    generator: &ChunkGenerator<F>,
    stats: &WorkerPoolStats,
) {
    while let Ok(job) = jobs.recv() {
        let coord = match job {
            Job::Stop => break,
            Job::Generate(coord) => coord,
        };

        match catch_unwind(AssertUnwindSafe(|| generator.generate(coord))) {
            Ok(chunk) => {
                // Fails only if the pool handle is already gone. Counted
                // after the send so the counter never runs ahead of the
                // result channel.
                let _ = results.send(chunk);
                stats.chunks_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "worker {} failed to generate ({}, {}), job skipped",
                    worker_id,
                    coord.x,
                    coord.y
                );
            }
        }
    }
}
