//! Cell editing that preserves the river, road and special-feature rules.
//!
//! Every setter is a silent no-op when the edit would be illegal or changes
//! nothing, and marks the affected chunks dirty otherwise.

use crate::coordinates::HexDirection;

use super::HexGrid;

impl HexGrid {
    // ── Terrain ────────────────────────────────────────────────────

    /// Sets the elevation, dropping rivers and roads the new height invalidates.
    pub fn set_elevation(&mut self, i: usize, elevation: i32) {
        if self.cells[i].elevation == elevation {
            return;
        }
        self.cells[i].elevation = elevation;
        self.refresh_position(i);
        self.validate_rivers(i);

        for d in HexDirection::ALL {
            if !self.cells[i].roads[d.index()] {
                continue;
            }
            let Some(n) = self.cells[i].neighbor(d) else {
                continue;
            };
            if self.cells[i].elevation_difference(&self.cells[n]) > 1 {
                self.set_road(i, d, false);
            }
        }
        self.refresh(i);
    }

    /// Sets the water level.
    pub fn set_water_level(&mut self, i: usize, water_level: i32) {
        if self.cells[i].water_level == water_level {
            return;
        }
        self.cells[i].water_level = water_level;
        self.validate_rivers(i);
        self.refresh(i);
    }

    /// Sets the terrain type index.
    pub fn set_terrain_type(&mut self, i: usize, terrain_type_index: u8) {
        if self.cells[i].terrain_type_index != terrain_type_index {
            self.cells[i].terrain_type_index = terrain_type_index;
            self.refresh(i);
        }
    }

    // ── Features ───────────────────────────────────────────────────

    /// Sets the urban density (clamped to 0..=3).
    pub fn set_urban_level(&mut self, i: usize, level: u8) {
        let level = level.min(3);
        if self.cells[i].urban_level != level {
            self.cells[i].urban_level = level;
            self.refresh_self_only(i);
        }
    }

    /// Sets the farm density (clamped to 0..=3).
    pub fn set_farm_level(&mut self, i: usize, level: u8) {
        let level = level.min(3);
        if self.cells[i].farm_level != level {
            self.cells[i].farm_level = level;
            self.refresh_self_only(i);
        }
    }

    /// Sets the plant density (clamped to 0..=3).
    pub fn set_plant_level(&mut self, i: usize, level: u8) {
        let level = level.min(3);
        if self.cells[i].plant_level != level {
            self.cells[i].plant_level = level;
            self.refresh_self_only(i);
        }
    }

    /// Turns walls around the cell on or off.
    pub fn set_walled(&mut self, i: usize, walled: bool) {
        if self.cells[i].walled != walled {
            self.cells[i].walled = walled;
            self.refresh(i);
        }
    }

    /// Places a special feature; ignored on cells with a river.
    ///
    /// Roads touching the cell are removed.
    pub fn set_special_index(&mut self, i: usize, special_index: u8) {
        let cell = &self.cells[i];
        if cell.special_index != special_index && !cell.has_river() {
            self.cells[i].special_index = special_index;
            self.remove_roads(i);
            self.refresh_self_only(i);
        }
    }

    // ── Rivers ─────────────────────────────────────────────────────

    /// Starts a river leaving cell `i` through edge `d`.
    ///
    /// Ignored when there is no neighbour or the river would flow uphill.
    /// Replaces any previous outgoing river of `i` and incoming river of
    /// the neighbour, clears special features on both, and removes the road
    /// on that edge.
    pub fn set_outgoing_river(&mut self, i: usize, d: HexDirection) {
        if self.cells[i].outgoing_river == Some(d) {
            return;
        }
        let Some(n) = self.cells[i].neighbor(d) else {
            return;
        };
        if !self.cells[i].is_valid_river_destination(&self.cells[n]) {
            return;
        }

        self.remove_outgoing_river(i);
        if self.cells[i].incoming_river == Some(d) {
            self.remove_incoming_river(i);
        }
        self.cells[i].outgoing_river = Some(d);
        self.cells[i].special_index = 0;

        self.remove_incoming_river(n);
        self.cells[n].incoming_river = Some(d.opposite());
        self.cells[n].special_index = 0;

        self.set_road(i, d, false);
    }

    /// Removes both rivers of the cell.
    pub fn remove_river(&mut self, i: usize) {
        self.remove_outgoing_river(i);
        self.remove_incoming_river(i);
    }

    /// Removes the outgoing river and the matching incoming river downstream.
    pub fn remove_outgoing_river(&mut self, i: usize) {
        let Some(d) = self.cells[i].outgoing_river.take() else {
            return;
        };
        self.refresh_self_only(i);
        if let Some(n) = self.cells[i].neighbor(d) {
            self.cells[n].incoming_river = None;
            self.refresh_self_only(n);
        }
    }

    /// Removes the incoming river and the matching outgoing river upstream.
    pub fn remove_incoming_river(&mut self, i: usize) {
        let Some(d) = self.cells[i].incoming_river.take() else {
            return;
        };
        self.refresh_self_only(i);
        if let Some(n) = self.cells[i].neighbor(d) {
            self.cells[n].outgoing_river = None;
            self.refresh_self_only(n);
        }
    }

    /// Drops rivers that no longer flow downhill after an elevation or water change.
    fn validate_rivers(&mut self, i: usize) {
        if let Some(d) = self.cells[i].outgoing_river
            && let Some(n) = self.cells[i].neighbor(d)
            && !self.cells[i].is_valid_river_destination(&self.cells[n])
        {
            self.remove_outgoing_river(i);
        }
        if let Some(d) = self.cells[i].incoming_river
            && let Some(n) = self.cells[i].neighbor(d)
            && !self.cells[n].is_valid_river_destination(&self.cells[i])
        {
            self.remove_incoming_river(i);
        }
    }

    // ── Roads ──────────────────────────────────────────────────────

    /// Adds a road through edge `d` when the edge allows one.
    ///
    /// Roads cannot cross rivers, touch special cells, or climb more than
    /// one elevation level.
    pub fn add_road(&mut self, i: usize, d: HexDirection) {
        let Some(n) = self.cells[i].neighbor(d) else {
            return;
        };
        let cell = &self.cells[i];
        let neighbor = &self.cells[n];
        if !cell.roads[d.index()]
            && !cell.has_river_through_edge(d)
            && !cell.is_special()
            && !neighbor.is_special()
            && cell.elevation_difference(neighbor) <= 1
        {
            self.set_road(i, d, true);
        }
    }

    /// Removes every road touching the cell.
    pub fn remove_roads(&mut self, i: usize) {
        for d in HexDirection::ALL {
            if self.cells[i].roads[d.index()] {
                self.set_road(i, d, false);
            }
        }
    }

    fn set_road(&mut self, i: usize, d: HexDirection, state: bool) {
        self.cells[i].roads[d.index()] = state;
        if let Some(n) = self.cells[i].neighbor(d) {
            self.cells[n].roads[d.opposite().index()] = state;
            self.refresh_self_only(n);
        }
        self.refresh_self_only(i);
    }
}
