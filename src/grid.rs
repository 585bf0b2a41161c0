//! The hex grid: cell storage, chunk partition, neighbour wiring.
//!
//! Cells live in one row-major `Vec` and refer to each other by index.
//! Editing, search, unit bookkeeping and persistence are split into
//! submodules that all extend [`HexGrid`].

mod editing;
mod persistence;
mod search;
mod units;

pub use persistence::{MAP_FILE_VERSION, MapFileError};
pub use units::{HexUnit, TRAVEL_SPEED, UNIT_ROTATION_SPEED, UNIT_SPEED, UNIT_VISION_RANGE, UnitId, UnitMotion};

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::{HexCoordinates, HexDirection};
use crate::metrics::{
    CHUNK_SIZE_X, CHUNK_SIZE_Z, ELEVATION_PERTURB_STRENGTH, ELEVATION_STEP, HexMetrics,
    INNER_DIAMETER, OUTER_RADIUS,
};
use crate::priority_queue::HexCellPriorityQueue;

/// A block of cells that is triangulated as one unit.
#[derive(Clone, Debug, Default)]
pub struct HexGridChunk {
    cells: Vec<usize>,
    dirty: bool,
}

impl HexGridChunk {
    /// Indices of the cells in this chunk.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Whether the chunk needs to be triangulated again.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Search frontier and the current path endpoints.
#[derive(Clone, Debug, Default)]
struct SearchState {
    frontier: HexCellPriorityQueue,
    phase: u32,
    path_from: Option<usize>,
    path_to: Option<usize>,
    has_path: bool,
}

/// The whole map.
#[derive(Resource, Clone, Debug)]
pub struct HexGrid {
    cell_count_x: usize,
    cell_count_z: usize,
    chunk_count_x: usize,
    chunk_count_z: usize,
    wrapping: bool,
    pub(crate) cells: Vec<HexCell>,
    chunks: Vec<HexGridChunk>,
    pub(crate) units: Vec<HexUnit>,
    next_unit_id: u32,
    metrics: HexMetrics,
    search: SearchState,
}

impl HexGrid {
    /// Empty grid with the given metrics; call [`create_map`](Self::create_map) next.
    pub fn new(metrics: HexMetrics) -> Self {
        Self {
            cell_count_x: 0,
            cell_count_z: 0,
            chunk_count_x: 0,
            chunk_count_z: 0,
            wrapping: false,
            cells: Vec::new(),
            chunks: Vec::new(),
            units: Vec::new(),
            next_unit_id: 0,
            metrics,
            search: SearchState::default(),
        }
    }

    /// Builds a fresh flat map of `x × z` cells.
    ///
    /// Both sizes must be positive multiples of the chunk size. On failure the
    /// grid is left exactly as it was and `false` is returned.
    pub fn create_map(&mut self, x: usize, z: usize, wrapping: bool) -> bool {
        if x == 0 || z == 0 || x % CHUNK_SIZE_X != 0 || z % CHUNK_SIZE_Z != 0 {
            error!("Unsupported map size {x}x{z}: must be a multiple of {CHUNK_SIZE_X}x{CHUNK_SIZE_Z}");
            return false;
        }

        self.clear_path();
        self.clear_units();
        self.cell_count_x = x;
        self.cell_count_z = z;
        self.wrapping = wrapping;
        self.metrics.set_wrap_size(if wrapping { x as i32 } else { 0 });
        self.chunk_count_x = x / CHUNK_SIZE_X;
        self.chunk_count_z = z / CHUNK_SIZE_Z;
        self.search.phase = 0;

        self.chunks = (0..self.chunk_count_x * self.chunk_count_z)
            .map(|_| HexGridChunk {
                cells: Vec::with_capacity(CHUNK_SIZE_X * CHUNK_SIZE_Z),
                dirty: true,
            })
            .collect();

        self.cells = Vec::with_capacity(x * z);
        let mut i = 0;
        for cz in 0..z {
            for cx in 0..x {
                self.create_cell(cx, cz, i);
                i += 1;
            }
        }
        info!("Created {x}x{z} map (wrapping: {wrapping})");
        true
    }

    fn create_cell(&mut self, x: usize, z: usize, i: usize) {
        let position = Vec3::new(
            (x as f32 + z as f32 * 0.5 - (z / 2) as f32) * INNER_DIAMETER,
            0.0,
            z as f32 * (OUTER_RADIUS * 1.5),
        );
        let explorable = if self.wrapping {
            z > 0 && z < self.cell_count_z - 1
        } else {
            x > 0 && z > 0 && x < self.cell_count_x - 1 && z < self.cell_count_z - 1
        };
        let chunk = x / CHUNK_SIZE_X + (z / CHUNK_SIZE_Z) * self.chunk_count_x;

        self.cells.push(HexCell {
            coordinates: HexCoordinates::from_offset(x as i32, z as i32, self.metrics.wrap_size()),
            index: i,
            column_index: x / CHUNK_SIZE_X,
            chunk,
            position,
            explorable,
            ..default()
        });
        self.chunks[chunk].cells.push(i);

        let count_x = self.cell_count_x;
        if x > 0 {
            self.set_neighbor(i, HexDirection::W, i - 1);
            if self.wrapping && x == count_x - 1 {
                self.set_neighbor(i, HexDirection::E, i - x);
            }
        }
        if z > 0 {
            if z & 1 == 0 {
                self.set_neighbor(i, HexDirection::SE, i - count_x);
                if x > 0 {
                    self.set_neighbor(i, HexDirection::SW, i - count_x - 1);
                } else if self.wrapping {
                    self.set_neighbor(i, HexDirection::SW, i - 1);
                }
            } else {
                self.set_neighbor(i, HexDirection::SW, i - count_x);
                if x < count_x - 1 {
                    self.set_neighbor(i, HexDirection::SE, i - count_x + 1);
                } else if self.wrapping {
                    self.set_neighbor(i, HexDirection::SE, i - count_x * 2 + 1);
                }
            }
        }
        self.refresh_position(i);
    }

    /// Links `cell` and `neighbor` in direction `d` and its opposite.
    fn set_neighbor(&mut self, cell: usize, d: HexDirection, neighbor: usize) {
        self.cells[cell].neighbors[d.index()] = Some(neighbor);
        self.cells[neighbor].neighbors[d.opposite().index()] = Some(cell);
    }

    /// Recomputes the cell center from its elevation and the noise.
    pub(crate) fn refresh_position(&mut self, i: usize) {
        let cell = &self.cells[i];
        let mut position = cell.position;
        position.y = cell.elevation as f32 * ELEVATION_STEP;
        position.y +=
            (self.metrics.sample_noise(position).y * 2.0 - 1.0) * ELEVATION_PERTURB_STRENGTH;
        self.cells[i].position = position;
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Columns of cells.
    pub fn cell_count_x(&self) -> usize {
        self.cell_count_x
    }

    /// Rows of cells.
    pub fn cell_count_z(&self) -> usize {
        self.cell_count_z
    }

    /// Columns of chunks.
    pub fn chunk_count_x(&self) -> usize {
        self.chunk_count_x
    }

    /// Rows of chunks.
    pub fn chunk_count_z(&self) -> usize {
        self.chunk_count_z
    }

    /// Whether the map wraps east to west.
    pub fn wrapping(&self) -> bool {
        self.wrapping
    }

    /// Geometry context shared by triangulation and generation.
    pub fn metrics(&self) -> &HexMetrics {
        &self.metrics
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// Cell by index.
    pub fn cell(&self, i: usize) -> Option<&HexCell> {
        self.cells.get(i)
    }

    /// Neighbour cell of `i` in direction `d`.
    pub fn neighbor(&self, i: usize, d: HexDirection) -> Option<&HexCell> {
        self.cells.get(i)?.neighbor(d).map(|n| &self.cells[n])
    }

    /// All chunks in row-major order.
    pub fn chunks(&self) -> &[HexGridChunk] {
        &self.chunks
    }

    /// Cell index at offset coordinates.
    pub fn cell_index_at_offset(&self, x: i32, z: i32) -> Option<usize> {
        if x < 0 || z < 0 || x as usize >= self.cell_count_x || z as usize >= self.cell_count_z {
            return None;
        }
        Some(x as usize + z as usize * self.cell_count_x)
    }

    /// Cell index at cube coordinates.
    pub fn cell_index_at(&self, coordinates: HexCoordinates) -> Option<usize> {
        let (x, z) = coordinates.to_offset();
        self.cell_index_at_offset(x, z)
    }

    /// Cell index under a world position.
    pub fn cell_index_at_position(&self, position: Vec3) -> Option<usize> {
        self.cell_index_at(HexCoordinates::from_position(position, self.metrics.wrap_size()))
    }

    /// Cube distance between two cells, honouring wraparound.
    pub fn distance(&self, a: usize, b: usize) -> i32 {
        self.cells[a]
            .coordinates
            .distance_to(self.cells[b].coordinates, self.metrics.wrap_size())
    }

    // ── Chunk refresh ──────────────────────────────────────────────

    /// Marks the cell's chunk and every neighbouring chunk for rebuild.
    pub(crate) fn refresh(&mut self, i: usize) {
        let chunk = self.cells[i].chunk;
        self.chunks[chunk].dirty = true;
        for n in self.cells[i].neighbors.into_iter().flatten() {
            let other = self.cells[n].chunk;
            if other != chunk {
                self.chunks[other].dirty = true;
            }
        }
        self.validate_unit_location(i);
    }

    /// Marks only the cell's own chunk for rebuild.
    pub(crate) fn refresh_self_only(&mut self, i: usize) {
        let chunk = self.cells[i].chunk;
        self.chunks[chunk].dirty = true;
        self.validate_unit_location(i);
    }

    /// Marks every chunk for rebuild.
    pub fn refresh_all(&mut self) {
        for chunk in &mut self.chunks {
            chunk.dirty = true;
        }
    }

    /// Drains the dirty flags, returning each dirty chunk index once.
    pub fn take_dirty_chunks(&mut self) -> Vec<usize> {
        self.chunks
            .iter_mut()
            .enumerate()
            .filter_map(|(i, chunk)| std::mem::take(&mut chunk.dirty).then_some(i))
            .collect()
    }
}

impl Default for HexGrid {
    fn default() -> Self {
        Self::new(HexMetrics::default())
    }
}
