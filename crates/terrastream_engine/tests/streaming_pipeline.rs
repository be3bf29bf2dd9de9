//! End-to-end streaming pipeline tests: request, dedup, drain, shutdown,
//! and snapshot round trips.

use std::thread;
use std::time::{Duration, Instant};

use terrastream_engine::{EngineError, StreamerConfig, WorldStreamer};
use terrastream_procedural::{
    ChunkCoord, ChunkGenerator, GridParams, NoiseField, TerrainLayers,
};

fn seeded_config(seed: u64) -> StreamerConfig {
    StreamerConfig {
        chunk_size: 4,
        worker_count: 4,
        seed: Some(seed),
        ..StreamerConfig::default()
    }
}

/// Spins until the pool reports `expected` completions.
fn wait_for_completions<F>(streamer: &WorldStreamer<F>, expected: u64)
where
    F: NoiseField + Send + Sync + 'static,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while streamer.pool_stats().chunks_completed() + streamer.pool_stats().jobs_failed() < expected
    {
        assert!(Instant::now() < deadline, "generation timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn hammering_one_coordinate_generates_once() {
    let mut streamer = WorldStreamer::new(&seeded_config(42)).unwrap();
    let coord = ChunkCoord::new(5, -5);

    // 1000 requests across overlapping batches, one submission.
    for batch in 0..100 {
        let coords: Vec<_> = std::iter::repeat(coord)
            .take(10)
            .chain((0..batch % 3).map(|i| ChunkCoord::new(i, 0)))
            .collect();
        streamer.request_chunks(coords).unwrap();
    }

    let distinct = streamer.generated_coords().len() as u64;
    assert_eq!(streamer.pool_stats().jobs_submitted(), distinct);
    assert_eq!(distinct, 3); // (5,-5), (0,0), (1,0)

    wait_for_completions(&streamer, distinct);
    let mut total = 0;
    while total < distinct as usize {
        total += streamer.drain_ready_chunks(8).len();
    }
    assert_eq!(streamer.chunks().len(), 3);
    assert_eq!(
        streamer
            .chunks()
            .iter()
            .filter(|chunk| chunk.coord == coord)
            .count(),
        1,
        "exactly one chunk per coordinate"
    );
    streamer.cleanup();
}

#[test]
fn dedup_holds_across_randomized_batches() {
    let mut streamer = WorldStreamer::new(&seeded_config(7)).unwrap();

    // Deterministic pseudo-random overlapping batches.
    let mut state = 0x1234_5678_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..200 {
        let coords: Vec<_> = (0..8)
            .map(|_| {
                let r = next();
                ChunkCoord::new((r % 7) as i32 - 3, ((r >> 8) % 7) as i32 - 3)
            })
            .collect();
        streamer.request_chunks(coords).unwrap();
    }

    // At most 49 distinct coordinates exist in the sampled square.
    let distinct = streamer.generated_coords().len() as u64;
    assert!(distinct <= 49);
    assert_eq!(streamer.pool_stats().jobs_submitted(), distinct);
    streamer.cleanup();
}

#[test]
fn drain_never_exceeds_limit_and_never_blocks() {
    let mut streamer = WorldStreamer::new(&seeded_config(11)).unwrap();

    let started = Instant::now();
    assert!(streamer.drain_ready_chunks(8).is_empty());
    assert!(started.elapsed() < Duration::from_secs(1), "drain must not block");

    let coords: Vec<_> = (0..30).map(|i| ChunkCoord::new(i, 2 * i)).collect();
    streamer.request_chunks(coords).unwrap();
    wait_for_completions(&streamer, 30);

    let mut seen = 0;
    loop {
        let drained = streamer.drain_ready_chunks(8);
        assert!(drained.len() <= 8);
        if drained.is_empty() {
            break;
        }
        seen += drained.len();
    }
    assert_eq!(seen, 30);
    streamer.cleanup();
}

#[test]
fn shutdown_with_jobs_in_flight_loses_nothing() {
    let mut streamer = WorldStreamer::new(&seeded_config(13)).unwrap();

    let coords: Vec<_> = (0..50).map(|i| ChunkCoord::new(i % 10, i / 10)).collect();
    streamer.request_chunks(coords).unwrap();

    // Shut down immediately - jobs are still in flight.
    streamer.cleanup();

    // All 50 must complete and remain drainable after the pool stops.
    let mut total = 0;
    loop {
        let drained = streamer.drain_ready_chunks(16);
        if drained.is_empty() {
            break;
        }
        total += drained.len();
    }
    assert_eq!(total, 50);
    assert_eq!(streamer.pool_stats().chunks_completed(), 50);

    // And the pool accepts nothing new.
    assert!(matches!(
        streamer.request_chunks([ChunkCoord::new(99, 99)]),
        Err(EngineError::PoolStopped)
    ));
}

#[test]
fn every_cell_respects_clamp_bounds() {
    let config = StreamerConfig {
        clamp_floor: 1,
        ..seeded_config(17)
    };
    let mut streamer = WorldStreamer::new(&config).unwrap();

    let coords: Vec<_> = (-3..3).flat_map(|x| (-3..3).map(move |y| ChunkCoord::new(x, y))).collect();
    let count = coords.len() as u64;
    streamer.request_chunks(coords).unwrap();
    wait_for_completions(&streamer, count);

    while !streamer.drain_ready_chunks(8).is_empty() {}
    for chunk in streamer.chunks() {
        assert!(chunk.terrain().cells().iter().all(|&cell| cell >= 1));
    }
    streamer.cleanup();
}

#[test]
fn snapshot_roundtrip_restores_ledger_and_chunks() {
    let path = std::env::temp_dir().join("terrastream_pipeline_roundtrip.tsn");
    let config = seeded_config(42);

    let mut streamer = WorldStreamer::new(&config).unwrap();
    let coords: Vec<_> = (0..12).map(|i| ChunkCoord::new(i - 6, i)).collect();
    streamer.request_chunks(coords).unwrap();
    wait_for_completions(&streamer, 12);
    streamer.save_snapshot(&path).unwrap();

    let saved = streamer.to_state();
    assert_eq!(saved.chunks.len(), 12, "save drains everything in flight");

    let state = WorldStreamer::load_snapshot(&path).unwrap();
    assert_eq!(state, saved);

    let restored = WorldStreamer::from_state(state, config.worker_count).unwrap();
    assert_eq!(restored.generated_coords(), saved.generated.as_slice());
    assert_eq!(restored.chunks(), saved.chunks.as_slice());

    std::fs::remove_file(&path).ok();
}

#[test]
fn restored_streamer_reproduces_identical_terrain() {
    let path = std::env::temp_dir().join("terrastream_pipeline_determinism.tsn");
    let config = seeded_config(99);
    let probe = ChunkCoord::new(21, -8);

    // Reference world: generate the probe chunk directly.
    let mut reference = WorldStreamer::new(&config).unwrap();
    reference.request_chunks([probe]).unwrap();
    wait_for_completions(&reference, 1);
    while streamer_missing(&reference, probe) {
        reference.drain_ready_chunks(8);
    }
    let expected = reference.chunk_at(probe).unwrap().clone();
    reference.cleanup();

    // Saved world: never saw the probe coordinate before the snapshot.
    let mut original = WorldStreamer::new(&config).unwrap();
    original.request_chunks([ChunkCoord::new(0, 0)]).unwrap();
    wait_for_completions(&original, 1);
    original.save_snapshot(&path).unwrap();

    // The restored world must generate the probe chunk bit-identically.
    let state = WorldStreamer::load_snapshot(&path).unwrap();
    let mut restored = WorldStreamer::from_state(state, config.worker_count).unwrap();
    restored.request_chunks([probe]).unwrap();
    // The restored pool's counters start at zero: one new completion.
    wait_for_completions(&restored, 1);
    while streamer_missing(&restored, probe) {
        restored.drain_ready_chunks(8);
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(restored.chunk_at(probe).unwrap(), &expected);
    restored.cleanup();

    std::fs::remove_file(&path).ok();
}

fn streamer_missing(streamer: &WorldStreamer, coord: ChunkCoord) -> bool {
    streamer.chunk_at(coord).is_none()
}

/// Closed-form plane `u + v`, the substitution seam from the generation
/// contract.
struct Plane;

impl NoiseField for Plane {
    fn sample(&self, u: f64, v: f64) -> f64 {
        u + v
    }
}

#[test]
fn plane_field_yields_exact_grid_through_the_pipeline() {
    let config = StreamerConfig {
        chunk_size: 2,
        world_chunk_size_x: 1,
        world_chunk_size_y: 1,
        worker_count: 1,
        seed: Some(0),
        ..StreamerConfig::default()
    };
    let layers = TerrainLayers::new([Plane, Plane, Plane, Plane], [1.0, 0.0, 0.0, 0.0], 200.0);
    let generator = ChunkGenerator::new(
        layers,
        GridParams {
            chunk_size: 2,
            world_span_x: 1,
            world_span_y: 1,
            clamp_floor: 0,
        },
    );
    let mut streamer = WorldStreamer::with_generator(&config, generator).unwrap();

    streamer.request_chunks([ChunkCoord::new(0, 0)]).unwrap();
    wait_for_completions(&streamer, 1);
    let drained = streamer.drain_ready_chunks(8);
    assert_eq!(drained.len(), 1);

    let terrain = drained[0].terrain();
    assert_eq!(terrain.get(0, 0), 0);
    assert_eq!(terrain.get(1, 0), 100);
    assert_eq!(terrain.get(0, 1), 100);
    assert_eq!(terrain.get(1, 1), 200);
    assert!(drained[0].aux().cells().iter().all(|&cell| cell == 0));
    streamer.cleanup();
}
