//! # Snapshot Store
//!
//! Persists a [`WorldStreamerState`] as a single binary record.
//!
//! ## Record Layout
//!
//! ```text
//! [magic "TSSN":4][version:2][lz4 block with prepended size]
//! ```
//!
//! The compressed payload, all little-endian:
//!
//! ```text
//! seed:8
//! world_width:4  world_height:4  chunk_size:2  clamp_floor:1
//! 4 x { frequency:4  seed:8 }          noise-profile descriptors
//! 4 x weight:8   final_weight:8        f64 bit patterns
//! ledger_len:8   ledger_len x { cx:4 cy:4 }        insertion order
//! chunk_count:8  chunk_count x {
//!     cx:4 cy:4
//!     chunk_size^2 x { terrain:1 aux:1 }           row-major tiles
//! }                                                completion order
//! ```
//!
//! Parsing is length-checked before every read; truncated or corrupt input
//! surfaces [`EngineError::SnapshotFormat`], never a panic.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use terrastream_procedural::{
    Chunk, ChunkCoord, NoiseProfileDescriptor, TerrainGrid, WorldSeed, LAYER_COUNT,
};

use crate::error::{EngineError, EngineResult};
use crate::streamer::WorldStreamerState;

/// File magic.
const MAGIC: [u8; 4] = *b"TSSN";
/// Current format version.
const VERSION: u16 = 1;

/// Writes a state record to `path`.
///
/// # Errors
///
/// Surfaces [`EngineError::SnapshotIo`] on any file failure.
pub fn save(state: &WorldStreamerState, path: &Path) -> EngineResult<()> {
    let payload = encode_payload(state);
    let compressed = compress_prepend_size(&payload);

    let mut file = File::create(path)?;
    file.write_all(&MAGIC)?;
    file.write_all(&VERSION.to_le_bytes())?;
    file.write_all(&compressed)?;
    Ok(())
}

/// Reads a state record back from `path`.
///
/// # Errors
///
/// Surfaces [`EngineError::SnapshotIo`] on file failure and
/// [`EngineError::SnapshotFormat`] on any structural problem.
pub fn load(path: &Path) -> EngineResult<WorldStreamerState> {
    let bytes = std::fs::read(path)?;

    if bytes.len() < MAGIC.len() + 2 || bytes[..4] != MAGIC {
        return Err(EngineError::SnapshotFormat("missing TSSN magic".to_string()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(EngineError::SnapshotFormat(format!(
            "unsupported snapshot version {version}"
        )));
    }

    let payload = decompress_size_prepended(&bytes[6..])
        .map_err(|e| EngineError::SnapshotFormat(e.to_string()))?;
    decode_payload(&payload)
}

fn encode_payload(state: &WorldStreamerState) -> Vec<u8> {
    let tile_bytes = usize::from(state.chunk_size) * usize::from(state.chunk_size) * 2;
    let mut buf = Vec::with_capacity(
        128 + state.generated.len() * 8 + state.chunks.len() * (8 + tile_bytes),
    );

    buf.extend_from_slice(&state.seed.value().to_le_bytes());
    buf.extend_from_slice(&state.world_width.to_le_bytes());
    buf.extend_from_slice(&state.world_height.to_le_bytes());
    buf.extend_from_slice(&state.chunk_size.to_le_bytes());
    buf.push(state.clamp_floor);

    for descriptor in &state.profiles {
        buf.extend_from_slice(&descriptor.frequency.to_le_bytes());
        buf.extend_from_slice(&descriptor.seed.value().to_le_bytes());
    }
    for weight in state.weights {
        buf.extend_from_slice(&weight.to_bits().to_le_bytes());
    }
    buf.extend_from_slice(&state.final_weight.to_bits().to_le_bytes());

    buf.extend_from_slice(&(state.generated.len() as u64).to_le_bytes());
    for coord in &state.generated {
        buf.extend_from_slice(&coord.x.to_le_bytes());
        buf.extend_from_slice(&coord.y.to_le_bytes());
    }

    buf.extend_from_slice(&(state.chunks.len() as u64).to_le_bytes());
    for chunk in &state.chunks {
        buf.extend_from_slice(&chunk.coord.x.to_le_bytes());
        buf.extend_from_slice(&chunk.coord.y.to_le_bytes());
        for (terrain, aux) in chunk.terrain().cells().iter().zip(chunk.aux().cells()) {
            buf.push(*terrain);
            buf.push(*aux);
        }
    }

    buf
}

fn decode_payload(payload: &[u8]) -> EngineResult<WorldStreamerState> {
    let mut cursor = Cursor::new(payload);

    let seed = WorldSeed::new(cursor.read_u64()?);
    let world_width = cursor.read_u32()?;
    let world_height = cursor.read_u32()?;
    let chunk_size = cursor.read_u16()?;
    let clamp_floor = cursor.read_u8()?;

    if chunk_size == 0 {
        return Err(EngineError::SnapshotFormat("zero chunk size".to_string()));
    }

    let mut profiles = [NoiseProfileDescriptor {
        frequency: 0,
        seed: WorldSeed::new(0),
    }; LAYER_COUNT];
    for descriptor in &mut profiles {
        descriptor.frequency = cursor.read_u32()?;
        descriptor.seed = WorldSeed::new(cursor.read_u64()?);
    }

    let mut weights = [0.0; LAYER_COUNT];
    for weight in &mut weights {
        *weight = f64::from_bits(cursor.read_u64()?);
    }
    let final_weight = f64::from_bits(cursor.read_u64()?);

    let ledger_len = cursor.read_u64()?;
    let mut generated = Vec::new();
    for _ in 0..ledger_len {
        let x = cursor.read_i32()?;
        let y = cursor.read_i32()?;
        generated.push(ChunkCoord::new(x, y));
    }

    let cells_per_grid = usize::from(chunk_size) * usize::from(chunk_size);
    let chunk_count = cursor.read_u64()?;
    let mut chunks = Vec::new();
    for _ in 0..chunk_count {
        let x = cursor.read_i32()?;
        let y = cursor.read_i32()?;
        let tiles = cursor.take(cells_per_grid * 2)?;

        let mut terrain_cells = Vec::with_capacity(cells_per_grid);
        let mut aux_cells = Vec::with_capacity(cells_per_grid);
        for pair in tiles.chunks_exact(2) {
            terrain_cells.push(pair[0]);
            aux_cells.push(pair[1]);
        }

        let terrain = TerrainGrid::from_cells(usize::from(chunk_size), terrain_cells)
            .ok_or_else(|| EngineError::SnapshotFormat("tile count mismatch".to_string()))?;
        let aux = TerrainGrid::from_cells(usize::from(chunk_size), aux_cells)
            .ok_or_else(|| EngineError::SnapshotFormat("tile count mismatch".to_string()))?;
        chunks.push(Chunk::new(ChunkCoord::new(x, y), terrain, aux));
    }

    if !cursor.is_empty() {
        return Err(EngineError::SnapshotFormat(
            "trailing bytes after chunk data".to_string(),
        ));
    }

    Ok(WorldStreamerState {
        seed,
        profiles,
        weights,
        final_weight,
        world_width,
        world_height,
        chunk_size,
        clamp_floor,
        generated,
        chunks,
    })
}

/// Length-checked reader over the decompressed payload.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> EngineResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(EngineError::SnapshotFormat(format!(
                "record truncated at byte {}",
                self.pos
            )));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> EngineResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> EngineResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> EngineResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> EngineResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }
}
