//! # Chunk Generation
//!
//! The world is an unbounded lattice of fixed-size square chunks. Each chunk
//! is generated independently from the layered noise composition, which makes
//! generation embarrassingly parallel: the only shared state is the
//! read-only [`TerrainLayers`].
//!
//! ## Seamless Boundaries
//!
//! Cell coordinates are normalized before sampling:
//! `u = (lx / chunk_size + cx) / world_span_x`. Adjacent chunks therefore
//! sample contiguous regions of noise space and join without visible seams.

use crate::noise::{NoiseField, TerrainLayers};

/// Default chunk side length, in cells.
pub const DEFAULT_CHUNK_SIZE: usize = 8;

/// Chunk coordinate on the unbounded world lattice.
///
/// Either component may be negative. Equality and hashing are by value;
/// the configured world span is an advisory normalization denominator,
/// never a bound on these coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not cells).
    pub x: i32,
    /// Y coordinate (in chunks, not cells).
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A square grid of `u8` cell values with side length `size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainGrid {
    size: usize,
    cells: Vec<u8>,
}

impl TerrainGrid {
    /// Creates a grid with every cell set to `value`.
    #[must_use]
    pub fn filled(size: usize, value: u8) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    /// Rebuilds a grid from raw cells in row-major `(ly * size + lx)` order.
    ///
    /// Returns `None` if the cell count is not `size * size`.
    #[must_use]
    pub fn from_cells(size: usize, cells: Vec<u8>) -> Option<Self> {
        if cells.len() == size * size {
            Some(Self { size, cells })
        } else {
            None
        }
    }

    /// Returns the side length in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the cell at local coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `lx` or `ly` is outside `[0, size)`.
    #[inline]
    #[must_use]
    pub fn get(&self, lx: usize, ly: usize) -> u8 {
        assert!(lx < self.size && ly < self.size, "cell ({lx}, {ly}) out of grid");
        self.cells[ly * self.size + lx]
    }

    /// Returns the raw cells in row-major order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    fn set(&mut self, lx: usize, ly: usize, value: u8) {
        self.cells[ly * self.size + lx] = value;
    }
}

/// A materialized chunk: coordinate, terrain grid, and auxiliary grid.
///
/// Immutable once created - there are no mutating accessors. The auxiliary
/// grid is a reserved layer (all zeros today); no generation pass populates
/// it yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position on the world lattice.
    pub coord: ChunkCoord,
    terrain: TerrainGrid,
    aux: TerrainGrid,
}

impl Chunk {
    /// Assembles a chunk from generated grids.
    ///
    /// # Panics
    ///
    /// Panics if the grids differ in size.
    #[must_use]
    pub fn new(coord: ChunkCoord, terrain: TerrainGrid, aux: TerrainGrid) -> Self {
        assert_eq!(terrain.size(), aux.size(), "terrain and aux grids must match");
        Self { coord, terrain, aux }
    }

    /// Returns the terrain grid.
    #[inline]
    #[must_use]
    pub const fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    /// Returns the auxiliary grid.
    #[inline]
    #[must_use]
    pub const fn aux(&self) -> &TerrainGrid {
        &self.aux
    }
}

/// Grid-shape and clamping parameters for generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridParams {
    /// Chunk side length in cells.
    pub chunk_size: usize,
    /// Normalization denominator on the x axis (advisory world width).
    pub world_span_x: u32,
    /// Normalization denominator on the y axis (advisory world height).
    pub world_span_y: u32,
    /// Lower clamp bound for terrain values (0 or 1 in known variants).
    pub clamp_floor: u8,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            world_span_x: 64,
            world_span_y: 64,
            clamp_floor: 0,
        }
    }
}

/// Pure chunk generator over a layered noise composition.
///
/// `generate` has no side effects and touches no shared mutable state, which
/// is what makes the worker pool safe without locks.
///
/// Cell values are the layered sample clamped to `[clamp_floor, 255]` and
/// **truncated** (not rounded) to an integer.
pub struct ChunkGenerator<F> {
    layers: TerrainLayers<F>,
    params: GridParams,
}

impl<F: NoiseField> ChunkGenerator<F> {
    /// Creates a generator from composed layers and grid parameters.
    #[must_use]
    pub fn new(layers: TerrainLayers<F>, params: GridParams) -> Self {
        Self { layers, params }
    }

    /// Returns the composed noise layers.
    #[must_use]
    pub fn layers(&self) -> &TerrainLayers<F> {
        &self.layers
    }

    /// Returns the grid parameters.
    #[must_use]
    pub const fn params(&self) -> GridParams {
        self.params
    }

    /// Generates the chunk at `coord`.
    ///
    /// Deterministic: identical generator state and coordinate yield a
    /// bit-identical chunk.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> Chunk {
        let size = self.params.chunk_size;
        let span_x = f64::from(self.params.world_span_x);
        let span_y = f64::from(self.params.world_span_y);
        let floor = f64::from(self.params.clamp_floor);

        let mut terrain = TerrainGrid::filled(size, 0);
        let aux = TerrainGrid::filled(size, 0);

        for lx in 0..size {
            let u = (lx as f64 / size as f64 + f64::from(coord.x)) / span_x;
            for ly in 0..size {
                let v = (ly as f64 / size as f64 + f64::from(coord.y)) / span_y;
                let raw = self.layers.sample(u, v);
                terrain.set(lx, ly, raw.clamp(floor, 255.0) as u8);
            }
        }

        Chunk::new(coord, terrain, aux)
    }
}
