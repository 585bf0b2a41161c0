//! Per-tile state of the hex grid.
//!
//! A [`HexCell`] is plain data. Mutations that must keep the map consistent
//! (rivers, roads, refreshing chunks) go through [`HexGrid`](crate::grid::HexGrid),
//! which can reach neighbours and chunks; the accessors here are read-only.

use bevy::prelude::*;

use crate::coordinates::{HexCoordinates, HexDirection};
use crate::grid::UnitId;
use crate::metrics::{self, EdgeType};

/// Terrain type indices stored in [`HexCell::terrain_type_index`].
pub mod terrain_type {
    /// Sand.
    pub const SAND: u8 = 0;
    /// Grass.
    pub const GRASS: u8 = 1;
    /// Mud.
    pub const MUD: u8 = 2;
    /// Stone.
    pub const STONE: u8 = 3;
    /// Snow.
    pub const SNOW: u8 = 4;
    /// Number of terrain types.
    pub const COUNT: usize = 5;
}

/// One tile of the grid.
#[derive(Clone, Debug, Default)]
pub struct HexCell {
    pub(crate) coordinates: HexCoordinates,
    pub(crate) index: usize,
    pub(crate) column_index: usize,
    pub(crate) chunk: usize,
    pub(crate) position: Vec3,
    pub(crate) neighbors: [Option<usize>; 6],

    pub(crate) elevation: i32,
    pub(crate) water_level: i32,
    pub(crate) terrain_type_index: u8,
    pub(crate) urban_level: u8,
    pub(crate) farm_level: u8,
    pub(crate) plant_level: u8,
    pub(crate) special_index: u8,
    pub(crate) walled: bool,
    pub(crate) incoming_river: Option<HexDirection>,
    pub(crate) outgoing_river: Option<HexDirection>,
    pub(crate) roads: [bool; 6],

    pub(crate) visibility: u32,
    pub(crate) explored: bool,
    pub(crate) explorable: bool,
    pub(crate) unit: Option<UnitId>,

    pub(crate) distance: i32,
    pub(crate) search_phase: u32,
    pub(crate) search_heuristic: i32,
    pub(crate) path_from: Option<usize>,
}

impl HexCell {
    // ── Identity ───────────────────────────────────────────────────

    /// Cube coordinates of the cell.
    pub fn coordinates(&self) -> HexCoordinates {
        self.coordinates
    }

    /// Row-major index in the grid.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Chunk column this cell belongs to.
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// Index of the owning chunk.
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Perturbed world position of the cell center.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Neighbour index in direction `d`, if any.
    pub fn neighbor(&self, d: HexDirection) -> Option<usize> {
        self.neighbors[d.index()]
    }

    // ── Terrain ────────────────────────────────────────────────────

    /// Elevation level.
    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    /// Water surface level.
    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    /// Whether the water level is above the terrain.
    pub fn is_underwater(&self) -> bool {
        self.water_level > self.elevation
    }

    /// Terrain type index (see [`terrain_type`]).
    pub fn terrain_type_index(&self) -> u8 {
        self.terrain_type_index
    }

    /// Height used for sight ranges: the higher of terrain and water.
    pub fn view_elevation(&self) -> i32 {
        self.elevation.max(self.water_level)
    }

    /// Edge shape between this cell and `other`.
    pub fn edge_type_to(&self, other: &HexCell) -> EdgeType {
        metrics::edge_type(self.elevation, other.elevation)
    }

    /// Absolute elevation difference to `other`.
    pub fn elevation_difference(&self, other: &HexCell) -> i32 {
        (self.elevation - other.elevation).abs()
    }

    /// Y of the stream bed.
    pub fn stream_bed_y(&self) -> f32 {
        (self.elevation as f32 + metrics::STREAM_BED_ELEVATION_OFFSET) * metrics::ELEVATION_STEP
    }

    /// Y of a river surface flowing through this cell.
    pub fn river_surface_y(&self) -> f32 {
        (self.elevation as f32 + metrics::WATER_ELEVATION_OFFSET) * metrics::ELEVATION_STEP
    }

    /// Y of the standing water surface.
    pub fn water_surface_y(&self) -> f32 {
        (self.water_level as f32 + metrics::WATER_ELEVATION_OFFSET) * metrics::ELEVATION_STEP
    }

    // ── Features ───────────────────────────────────────────────────

    /// Urban density, 0 to 3.
    pub fn urban_level(&self) -> u8 {
        self.urban_level
    }

    /// Farm density, 0 to 3.
    pub fn farm_level(&self) -> u8 {
        self.farm_level
    }

    /// Plant density, 0 to 3.
    pub fn plant_level(&self) -> u8 {
        self.plant_level
    }

    /// Special feature index, 0 for none.
    pub fn special_index(&self) -> u8 {
        self.special_index
    }

    /// Whether a special feature occupies the cell.
    pub fn is_special(&self) -> bool {
        self.special_index > 0
    }

    /// Whether the cell is enclosed by walls.
    pub fn walled(&self) -> bool {
        self.walled
    }

    // ── Rivers ─────────────────────────────────────────────────────

    /// Direction a river enters from.
    pub fn incoming_river(&self) -> Option<HexDirection> {
        self.incoming_river
    }

    /// Direction a river leaves through.
    pub fn outgoing_river(&self) -> Option<HexDirection> {
        self.outgoing_river
    }

    /// Whether a river enters the cell.
    pub fn has_incoming_river(&self) -> bool {
        self.incoming_river.is_some()
    }

    /// Whether a river leaves the cell.
    pub fn has_outgoing_river(&self) -> bool {
        self.outgoing_river.is_some()
    }

    /// Whether any river touches the cell.
    pub fn has_river(&self) -> bool {
        self.incoming_river.is_some() || self.outgoing_river.is_some()
    }

    /// Whether a river starts or ends here.
    pub fn has_river_begin_or_end(&self) -> bool {
        self.incoming_river.is_some() != self.outgoing_river.is_some()
    }

    /// The single river direction of a river source or sink.
    pub fn river_begin_or_end_direction(&self) -> Option<HexDirection> {
        self.incoming_river.or(self.outgoing_river)
    }

    /// Whether a river crosses edge `d`.
    pub fn has_river_through_edge(&self, d: HexDirection) -> bool {
        self.incoming_river == Some(d) || self.outgoing_river == Some(d)
    }

    /// Whether a river may flow from this cell into `neighbor`.
    pub fn is_valid_river_destination(&self, neighbor: &HexCell) -> bool {
        self.elevation >= neighbor.elevation || self.water_level == neighbor.elevation
    }

    // ── Roads ──────────────────────────────────────────────────────

    /// Whether a road crosses edge `d`.
    pub fn has_road_through_edge(&self, d: HexDirection) -> bool {
        self.roads[d.index()]
    }

    /// Whether any road touches the cell.
    pub fn has_roads(&self) -> bool {
        self.roads.iter().any(|&r| r)
    }

    /// Road flags packed into a bitmask, bit `i` for direction `i`.
    pub fn road_flags(&self) -> u8 {
        self.roads
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &r)| if r { acc | (1u8 << i) } else { acc })
    }

    // ── Visibility ─────────────────────────────────────────────────

    /// Number of observers currently seeing the cell.
    pub fn visibility(&self) -> u32 {
        self.visibility
    }

    /// Whether any observer sees the cell.
    pub fn is_visible(&self) -> bool {
        self.visibility > 0 && self.explorable
    }

    /// Whether the cell has ever been seen.
    pub fn is_explored(&self) -> bool {
        self.explored && self.explorable
    }

    /// Whether the cell can be explored at all; map borders cannot.
    pub fn explorable(&self) -> bool {
        self.explorable
    }

    /// Unit standing on the cell.
    pub fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    // ── Search ─────────────────────────────────────────────────────

    /// Distance assigned by the most recent search.
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Queue priority during a search.
    pub fn search_priority(&self) -> i32 {
        self.distance + self.search_heuristic
    }

    /// Predecessor on the most recent path.
    pub fn path_from(&self) -> Option<usize> {
        self.path_from
    }

    /// Search phase stamp of the most recent query that touched the cell.
    pub fn search_phase(&self) -> u32 {
        self.search_phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(elevation: i32, water_level: i32) -> HexCell {
        HexCell {
            elevation,
            water_level,
            ..default()
        }
    }

    // ── terrain ─────────────────────────────────────────────────────

    #[test]
    fn underwater_and_view_elevation() {
        let dry = cell(4, 3);
        let wet = cell(1, 3);
        assert!(!dry.is_underwater());
        assert!(wet.is_underwater());
        assert_eq!(dry.view_elevation(), 4);
        assert_eq!(wet.view_elevation(), 3);
    }

    #[test]
    fn surface_heights_follow_offsets() {
        let c = cell(2, 3);
        assert!((c.stream_bed_y() - 0.75).abs() < 1e-5);
        assert!((c.river_surface_y() - 4.5).abs() < 1e-5);
        assert!((c.water_surface_y() - 7.5).abs() < 1e-5);
    }

    // ── rivers ──────────────────────────────────────────────────────

    #[test]
    fn river_destination_rule() {
        let high = cell(3, 0);
        let low = cell(1, 0);
        assert!(high.is_valid_river_destination(&low));
        assert!(!low.is_valid_river_destination(&high));
        // A lake surface at the neighbour's elevation may overflow into it.
        let lake = cell(1, 3);
        assert!(lake.is_valid_river_destination(&high));
    }

    #[test]
    fn river_begin_or_end() {
        let mut c = cell(0, 0);
        c.outgoing_river = Some(HexDirection::E);
        assert!(c.has_river_begin_or_end());
        assert_eq!(c.river_begin_or_end_direction(), Some(HexDirection::E));
        c.incoming_river = Some(HexDirection::W);
        assert!(!c.has_river_begin_or_end());
        assert!(c.has_river_through_edge(HexDirection::W));
        assert!(!c.has_river_through_edge(HexDirection::NE));
    }

    // ── roads ───────────────────────────────────────────────────────

    #[test]
    fn road_flags_pack_directions() {
        let mut c = cell(0, 0);
        c.roads[HexDirection::NE.index()] = true;
        c.roads[HexDirection::W.index()] = true;
        assert_eq!(c.road_flags(), 0b01_0001);
        assert!(c.has_roads());
    }

    // ── visibility ──────────────────────────────────────────────────

    #[test]
    fn border_cells_never_count_as_explored() {
        let mut c = cell(0, 0);
        c.explored = true;
        c.visibility = 2;
        assert!(!c.is_explored());
        assert!(!c.is_visible());
        c.explorable = true;
        assert!(c.is_explored());
        assert!(c.is_visible());
    }
}
