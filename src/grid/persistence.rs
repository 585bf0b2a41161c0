//! Versioned little-endian map files.
//!
//! Layout: `i32` version, then `i32` width, `i32` height, `bool` wrapping
//! (version ≥ 5), one fixed record per cell, and (version ≥ 2) the unit
//! list. Older versions omit fields and are still readable. Loading parses
//! the whole file into a [`MapSnapshot`] first, so a truncated or invalid
//! file never leaves the grid half-updated.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bevy::prelude::*;
use thiserror::Error;

use crate::coordinates::{HexCoordinates, HexDirection};
use crate::metrics::{CHUNK_SIZE_X, CHUNK_SIZE_Z};

use super::HexGrid;

/// Version written by [`HexGrid::save`].
pub const MAP_FILE_VERSION: i32 = 5;

/// Largest cell count a map file may declare.
pub const MAX_MAP_CELLS: usize = 1 << 22;

/// Why a map file could not be loaded.
#[derive(Debug, Error)]
pub enum MapFileError {
    /// Reading or writing failed, including unexpected end of file.
    #[error("map file i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The file was written by a newer format, or the header is corrupt.
    #[error("unknown map format {0}")]
    UnknownVersion(i32),
    /// The stored dimensions cannot form a grid.
    #[error("unsupported map size {width}x{height}")]
    InvalidSize {
        /// Stored width.
        width: i32,
        /// Stored height.
        height: i32,
    },
    /// A unit refers to a cell outside the map.
    #[error("unit at {0} is outside the map")]
    UnknownCell(HexCoordinates),
}

// ── Binary helpers ─────────────────────────────────────────────────

struct MapReader<R> {
    inner: R,
}

impl<R: Read> MapReader<R> {
    fn bytes<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn u8(&mut self) -> io::Result<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn bool(&mut self) -> io::Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.bytes()?))
    }

    fn f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }
}

fn river_byte(river: Option<HexDirection>) -> u8 {
    river.map_or(0, |d| d as u8 + 128)
}

fn river_from_byte(data: u8) -> Option<HexDirection> {
    (data >= 128).then(|| HexDirection::from_index((data - 128) as usize))
}

// ── Snapshot ───────────────────────────────────────────────────────

/// Fully parsed contents of one cell record.
#[derive(Clone, Debug, Default, PartialEq)]
struct CellRecord {
    terrain_type_index: u8,
    elevation: i32,
    water_level: i32,
    urban_level: u8,
    farm_level: u8,
    plant_level: u8,
    special_index: u8,
    walled: bool,
    incoming_river: Option<HexDirection>,
    outgoing_river: Option<HexDirection>,
    roads: [bool; 6],
    explored: bool,
}

/// A parsed map file, validated and ready to apply.
#[derive(Clone, Debug, Default)]
pub struct MapSnapshot {
    width: usize,
    height: usize,
    wrapping: bool,
    cells: Vec<CellRecord>,
    units: Vec<(usize, f32)>,
}

impl MapSnapshot {
    /// Parses a map stream, including its leading version header.
    pub fn read(reader: impl Read) -> Result<Self, MapFileError> {
        let mut r = MapReader { inner: reader };
        let version = r.i32()?;
        if !(0..=MAP_FILE_VERSION).contains(&version) {
            return Err(MapFileError::UnknownVersion(version));
        }

        let (width, height) = if version >= 1 { (r.i32()?, r.i32()?) } else { (20, 15) };
        if width <= 0
            || height <= 0
            || width as usize % CHUNK_SIZE_X != 0
            || height as usize % CHUNK_SIZE_Z != 0
        {
            return Err(MapFileError::InvalidSize { width, height });
        }
        let wrapping = version >= 5 && r.bool()?;
        let (columns, rows) = (width as usize, height as usize);
        let Some(count) = columns.checked_mul(rows).filter(|&n| n <= MAX_MAP_CELLS) else {
            return Err(MapFileError::InvalidSize { width, height });
        };
        let (width, height) = (columns, rows);

        let mut cells = Vec::new();
        for _ in 0..count {
            let terrain_type_index = r.u8()?;
            let mut elevation = r.u8()? as i32;
            if version >= 4 {
                elevation -= 127;
            }
            let water_level = r.u8()? as i32;
            let urban_level = r.u8()?;
            let farm_level = r.u8()?;
            let plant_level = r.u8()?;
            let special_index = r.u8()?;
            let walled = r.bool()?;
            let incoming_river = river_from_byte(r.u8()?);
            let outgoing_river = river_from_byte(r.u8()?);
            let road_flags = r.u8()?;
            let explored = version >= 3 && r.bool()?;
            cells.push(CellRecord {
                terrain_type_index,
                elevation,
                water_level,
                urban_level,
                farm_level,
                plant_level,
                special_index,
                walled,
                incoming_river,
                outgoing_river,
                roads: std::array::from_fn(|i| road_flags & (1u8 << i) != 0),
                explored,
            });
        }

        let mut units = Vec::new();
        if version >= 2 {
            let count = r.i32()?.max(0);
            for _ in 0..count {
                let x = r.i32()?;
                let z = r.i32()?;
                let orientation = r.f32()?;
                let coordinates = HexCoordinates::new(x, z, 0);
                let (col, row) = coordinates.to_offset();
                let Some(col) = usize::try_from(col).ok().filter(|&c| c < width) else {
                    return Err(MapFileError::UnknownCell(coordinates));
                };
                let Some(row) = usize::try_from(row).ok().filter(|&r| r < height) else {
                    return Err(MapFileError::UnknownCell(coordinates));
                };
                units.push((col + row * width, orientation));
            }
        }

        Ok(Self {
            width,
            height,
            wrapping,
            cells,
            units,
        })
    }
}

// ── HexGrid ────────────────────────────────────────────────────────

impl HexGrid {
    /// Writes the map in the current format, version header included.
    pub fn save(&self, writer: impl Write) -> io::Result<()> {
        let mut w = writer;
        w.write_all(&MAP_FILE_VERSION.to_le_bytes())?;
        w.write_all(&(self.cell_count_x as i32).to_le_bytes())?;
        w.write_all(&(self.cell_count_z as i32).to_le_bytes())?;
        w.write_all(&[self.wrapping as u8])?;

        for cell in &self.cells {
            w.write_all(&[
                cell.terrain_type_index,
                (cell.elevation + 127) as u8,
                cell.water_level as u8,
                cell.urban_level,
                cell.farm_level,
                cell.plant_level,
                cell.special_index,
                cell.walled as u8,
                river_byte(cell.incoming_river),
                river_byte(cell.outgoing_river),
                cell.road_flags(),
                cell.is_explored() as u8,
            ])?;
        }

        w.write_all(&(self.units.len() as i32).to_le_bytes())?;
        for unit in &self.units {
            let coordinates = self.cells[unit.location()].coordinates;
            w.write_all(&coordinates.x().to_le_bytes())?;
            w.write_all(&coordinates.z().to_le_bytes())?;
            w.write_all(&unit.orientation().to_le_bytes())?;
        }
        w.flush()
    }

    /// Reads a map stream and replaces the grid contents with it.
    ///
    /// On error the grid is untouched.
    pub fn load(&mut self, reader: impl Read) -> Result<(), MapFileError> {
        let snapshot = MapSnapshot::read(reader)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Replaces the grid contents with a parsed snapshot.
    pub fn apply_snapshot(&mut self, snapshot: MapSnapshot) {
        self.clear_path();
        self.clear_units();
        if snapshot.width != self.cell_count_x
            || snapshot.height != self.cell_count_z
            || snapshot.wrapping != self.wrapping
        {
            // Snapshot sizes are validated while parsing.
            self.create_map(snapshot.width, snapshot.height, snapshot.wrapping);
        }

        for (i, record) in snapshot.cells.into_iter().enumerate() {
            let cell = &mut self.cells[i];
            cell.terrain_type_index = record.terrain_type_index;
            cell.elevation = record.elevation;
            cell.water_level = record.water_level;
            cell.urban_level = record.urban_level;
            cell.farm_level = record.farm_level;
            cell.plant_level = record.plant_level;
            cell.special_index = record.special_index;
            cell.walled = record.walled;
            cell.incoming_river = record.incoming_river;
            cell.outgoing_river = record.outgoing_river;
            cell.roads = record.roads;
            cell.explored = record.explored;
            cell.visibility = 0;
            self.refresh_position(i);
        }
        self.refresh_all();

        for (location, orientation) in snapshot.units {
            self.add_unit(location, orientation);
        }
    }

    /// Saves the map to a file, logging failures.
    pub fn save_map_file(&self, path: &Path) -> bool {
        let result = File::create(path).and_then(|file| self.save(BufWriter::new(file)));
        match result {
            Ok(()) => {
                info!("Saved map to {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to save map to {}: {e}", path.display());
                false
            }
        }
    }

    /// Loads a map file, logging failures; the grid is untouched on error.
    pub fn load_map_file(&mut self, path: &Path) -> bool {
        let result = File::open(path)
            .map_err(MapFileError::from)
            .and_then(|file| self.load(BufReader::new(file)));
        match result {
            Ok(()) => {
                info!("Loaded map from {}", path.display());
                true
            }
            Err(MapFileError::UnknownVersion(version)) => {
                warn!("Unknown map format {version} in {}", path.display());
                false
            }
            Err(e) => {
                error!("Failed to load map from {}: {e}", path.display());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::grid;

    fn saved(g: &HexGrid) -> Vec<u8> {
        let mut bytes = Vec::new();
        g.save(&mut bytes).unwrap();
        bytes
    }

    // ── format ──────────────────────────────────────────────────────

    #[test]
    fn header_and_record_sizes() {
        let g = grid(10, 5);
        let bytes = saved(&g);
        assert_eq!(&bytes[0..4], &5i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &10i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &5i32.to_le_bytes());
        assert_eq!(bytes[12], 0);
        // 13 header bytes, 12 per cell, 4 for the unit count.
        assert_eq!(bytes.len(), 13 + 50 * 12 + 4);
    }

    #[test]
    fn negative_elevation_is_biased() {
        let mut g = grid(5, 5);
        g.set_elevation(0, -2);
        let bytes = saved(&g);
        assert_eq!(bytes[13 + 1], 125);
    }

    #[test]
    fn edited_map_survives_reload() {
        let mut g = grid(10, 10);
        let a = g.cell_index_at_offset(3, 3).unwrap();
        let b = g.cell_index_at_offset(6, 6).unwrap();
        g.set_elevation(a, 1);
        g.set_water_level(b, 1);
        g.set_terrain_type(a, 4);
        g.set_urban_level(b, 2);
        g.set_walled(a, true);
        g.set_special_index(b, 3);
        g.set_outgoing_river(a, HexDirection::E);
        g.add_road(a, HexDirection::W);
        let id = g.add_unit(a, 45.0).unwrap();
        let bytes = saved(&g);

        let mut loaded = grid(5, 5);
        loaded.load(bytes.as_slice()).unwrap();
        assert_eq!(loaded.cell_count_x(), 10);
        assert_eq!(saved(&loaded), bytes);

        let cell = &loaded.cells()[a];
        assert_eq!(cell.elevation(), 1);
        assert_eq!(cell.outgoing_river(), Some(HexDirection::E));
        assert!(cell.has_road_through_edge(HexDirection::W));
        assert!(cell.unit().is_some());
        let unit = &loaded.units()[0];
        assert_eq!(unit.orientation(), g.unit(id).unwrap().orientation());
    }

    #[test]
    fn version_zero_defaults_to_twenty_by_fifteen() {
        let mut bytes = 0i32.to_le_bytes().to_vec();
        bytes.extend(std::iter::repeat_n([1u8, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0], 300).flatten());
        let mut g = grid(5, 5);
        g.load(bytes.as_slice()).unwrap();
        assert_eq!((g.cell_count_x(), g.cell_count_z()), (20, 15));
        // No elevation bias before version 4.
        assert_eq!(g.cells()[0].elevation(), 3);
        assert_eq!(g.cells()[0].terrain_type_index(), 1);
        assert!(!g.cells()[0].is_explored());
    }

    // ── failures ────────────────────────────────────────────────────

    #[test]
    fn unknown_version_is_rejected() {
        let mut g = grid(5, 5);
        let err = g.load(6i32.to_le_bytes().as_slice()).unwrap_err();
        assert!(matches!(err, MapFileError::UnknownVersion(6)));
    }

    #[test]
    fn truncated_file_leaves_grid_untouched() {
        let mut source = grid(10, 10);
        source.set_elevation(12, 4);
        let bytes = saved(&source);

        let mut g = grid(5, 5);
        g.set_elevation(6, 1);
        let before = saved(&g);
        let err = g.load(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, MapFileError::Io(_)));
        assert_eq!(saved(&g), before);
    }

    #[test]
    fn bad_size_is_rejected() {
        let mut bytes = 5i32.to_le_bytes().to_vec();
        bytes.extend(7i32.to_le_bytes());
        bytes.extend(5i32.to_le_bytes());
        let mut g = grid(5, 5);
        let err = g.load(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, MapFileError::InvalidSize { width: 7, height: 5 }));
    }

    #[test]
    fn negative_version_is_rejected() {
        let mut g = grid(5, 5);
        let err = g.load((-1i32).to_le_bytes().as_slice()).unwrap_err();
        assert!(matches!(err, MapFileError::UnknownVersion(-1)));
    }

    #[test]
    fn huge_header_is_rejected_without_allocating() {
        let mut bytes = 5i32.to_le_bytes().to_vec();
        bytes.extend(2_147_483_645i32.to_le_bytes());
        bytes.extend(2_147_483_645i32.to_le_bytes());
        bytes.push(0);
        let mut g = grid(5, 5);
        let err = g.load(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, MapFileError::InvalidSize { .. }));
        assert_eq!(g.cell_count_x(), 5);
    }

    #[test]
    fn large_header_with_missing_cells_is_an_io_error() {
        let mut bytes = 5i32.to_le_bytes().to_vec();
        bytes.extend(1000i32.to_le_bytes());
        bytes.extend(1000i32.to_le_bytes());
        bytes.push(0);
        bytes.extend([0u8; 24]);
        let mut g = grid(5, 5);
        let err = g.load(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, MapFileError::Io(_)));
    }
}
