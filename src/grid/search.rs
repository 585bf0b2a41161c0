//! Turn-based pathfinding and range-limited visibility.
//!
//! Both searches share the grid's bucket queue and the search-phase stamp:
//! every query advances the phase by two, so a cell is "unvisited" when its
//! stamp is below the phase, "in the frontier" when equal, and "done" once
//! dequeued (phase + 1). No per-query clearing of cell fields is needed.

use crate::coordinates::HexDirection;
use crate::metrics::EdgeType;

use super::HexGrid;

impl HexGrid {
    // ── Pathfinding ────────────────────────────────────────────────

    /// Searches for a path for a unit with `speed` movement points per turn.
    ///
    /// The result replaces any previous path; query it with
    /// [`has_path`](Self::has_path) and [`path`](Self::path).
    pub fn find_path(&mut self, from: usize, to: usize, speed: i32) {
        self.clear_path();
        self.search.path_from = Some(from);
        self.search.path_to = Some(to);
        self.search.has_path = self.search_path(from, to, speed.max(1));
    }

    /// Whether the last [`find_path`](Self::find_path) reached its target.
    pub fn has_path(&self) -> bool {
        self.search.has_path
    }

    /// Start and end of the last path query.
    pub fn current_path_endpoints(&self) -> Option<(usize, usize)> {
        self.search.path_from.zip(self.search.path_to)
    }

    /// Cells of the current path, start first, destination last.
    pub fn path(&self) -> Option<Vec<usize>> {
        if !self.search.has_path {
            return None;
        }
        let (from, to) = self.current_path_endpoints()?;
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = self.cells[current].path_from?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Forgets the current path.
    pub fn clear_path(&mut self) {
        self.search.has_path = false;
        self.search.path_from = None;
        self.search.path_to = None;
    }

    /// Turn in which a unit with `speed` reaches cell `i` on the current path.
    pub fn turn_of(&self, i: usize, speed: i32) -> i32 {
        (self.cells[i].distance - 1) / speed.max(1)
    }

    /// Whether a unit may end its move on cell `i`.
    pub fn unit_is_valid_destination(&self, i: usize) -> bool {
        let cell = &self.cells[i];
        cell.is_explored() && !cell.is_underwater() && cell.unit.is_none()
    }

    /// Movement cost of stepping from `from` to `to` through edge `d`.
    ///
    /// Returns `None` when the step is impossible: the destination is invalid,
    /// the edge is a cliff, or it crosses a wall without a road.
    pub fn move_cost(&self, from: usize, to: usize, d: HexDirection) -> Option<i32> {
        if !self.unit_is_valid_destination(to) {
            return None;
        }
        let a = &self.cells[from];
        let b = &self.cells[to];
        let edge = a.edge_type_to(b);
        if edge == EdgeType::Cliff {
            return None;
        }
        if a.has_road_through_edge(d) {
            return Some(1);
        }
        if a.walled != b.walled {
            return None;
        }
        let base = if edge == EdgeType::Flat { 5 } else { 10 };
        Some(base + (b.urban_level + b.farm_level + b.plant_level) as i32)
    }

    fn search_path(&mut self, from: usize, to: usize, speed: i32) -> bool {
        self.search.phase += 2;
        let phase = self.search.phase;
        self.search.frontier.clear();

        let start = &mut self.cells[from];
        start.search_phase = phase;
        start.distance = 0;
        start.search_heuristic = 0;
        start.path_from = None;
        self.search.frontier.enqueue(from, 0);

        let target = self.cells[to].coordinates;
        let wrap_size = self.metrics.wrap_size();

        while let Some(current) = self.search.frontier.dequeue() {
            self.cells[current].search_phase += 1;
            if current == to {
                return true;
            }

            let current_distance = self.cells[current].distance;
            let current_turn = (current_distance - 1) / speed;

            for d in HexDirection::ALL {
                let Some(n) = self.cells[current].neighbor(d) else {
                    continue;
                };
                if self.cells[n].search_phase > phase {
                    continue;
                }
                let Some(move_cost) = self.move_cost(current, n, d) else {
                    continue;
                };

                let mut distance = current_distance + move_cost;
                let turn = (distance - 1) / speed;
                if turn > current_turn {
                    distance = turn * speed + move_cost;
                }

                let neighbor = &mut self.cells[n];
                if neighbor.search_phase < phase {
                    neighbor.search_phase = phase;
                    neighbor.distance = distance;
                    neighbor.path_from = Some(current);
                    neighbor.search_heuristic = neighbor.coordinates.distance_to(target, wrap_size);
                    let priority = neighbor.search_priority() as usize;
                    self.search.frontier.enqueue(n, priority);
                } else if distance < neighbor.distance {
                    let old_priority = neighbor.search_priority() as usize;
                    neighbor.distance = distance;
                    neighbor.path_from = Some(current);
                    let new_priority = neighbor.search_priority() as usize;
                    self.search.frontier.change(n, old_priority, new_priority);
                }
            }
        }
        false
    }

    // ── Visibility ─────────────────────────────────────────────────

    /// Cells visible from `from` with sight `range`, using the shared frontier.
    ///
    /// The range grows with the viewer's view elevation; a cell is visible
    /// when its search distance plus its own view elevation fits in that
    /// range and the search did not detour around obstacles to reach it.
    pub fn visible_cells(&mut self, from: usize, range: i32) -> Vec<usize> {
        let mut visible = Vec::new();
        let range = range + self.cells[from].view_elevation();

        self.search.phase += 2;
        let phase = self.search.phase;
        self.search.frontier.clear();

        let start = &mut self.cells[from];
        start.search_phase = phase;
        start.distance = 0;
        start.search_heuristic = 0;
        self.search.frontier.enqueue(from, 0);

        let origin = self.cells[from].coordinates;
        let wrap_size = self.metrics.wrap_size();

        while let Some(current) = self.search.frontier.dequeue() {
            self.cells[current].search_phase += 1;
            visible.push(current);

            let current_distance = self.cells[current].distance;
            for d in HexDirection::ALL {
                let Some(n) = self.cells[current].neighbor(d) else {
                    continue;
                };
                let neighbor = &mut self.cells[n];
                if neighbor.search_phase > phase || !neighbor.explorable {
                    continue;
                }

                let distance = current_distance + 1;
                if distance + neighbor.view_elevation() > range
                    || distance > origin.distance_to(neighbor.coordinates, wrap_size)
                {
                    continue;
                }

                if neighbor.search_phase < phase {
                    neighbor.search_phase = phase;
                    neighbor.distance = distance;
                    neighbor.search_heuristic = 0;
                    self.search.frontier.enqueue(n, distance as usize);
                } else if distance < neighbor.distance {
                    let old_priority = neighbor.search_priority() as usize;
                    neighbor.distance = distance;
                    self.search.frontier.change(n, old_priority, distance as usize);
                }
            }
        }
        visible
    }

    /// Adds one observer to every cell visible from `from`.
    pub fn increase_visibility(&mut self, from: usize, range: i32) {
        for i in self.visible_cells(from, range) {
            let cell = &mut self.cells[i];
            cell.visibility += 1;
            if cell.visibility == 1 {
                cell.explored = true;
                self.refresh(i);
            }
        }
    }

    /// Removes one observer from every cell visible from `from`.
    pub fn decrease_visibility(&mut self, from: usize, range: i32) {
        for i in self.visible_cells(from, range) {
            let cell = &mut self.cells[i];
            cell.visibility = cell.visibility.saturating_sub(1);
            if cell.visibility == 0 {
                self.refresh(i);
            }
        }
    }

    /// Clears every visibility counter, then re-applies the sight of all units.
    pub fn reset_visibility(&mut self) {
        for i in 0..self.cells.len() {
            if self.cells[i].visibility > 0 {
                self.cells[i].visibility = 0;
                self.refresh(i);
            }
        }
        let observers: Vec<usize> = self.units.iter().map(|u| u.location()).collect();
        for location in observers {
            self.increase_visibility(location, super::UNIT_VISION_RANGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinates::HexDirection;
    use crate::grid::tests::grid;
    use crate::grid::{UNIT_SPEED, UNIT_VISION_RANGE};

    // ── pathfinding ─────────────────────────────────────────────────

    #[test]
    fn two_flat_steps_cost_ten() {
        let mut g = grid(10, 10);
        let start = g.cell_index_at_offset(4, 4).unwrap();
        let goal = g.cell_index_at_offset(6, 4).unwrap();
        g.add_unit(start, 0.0);

        g.find_path(start, goal, UNIT_SPEED);
        assert!(g.has_path());
        let path = g.path().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], start);
        assert_eq!(*path.last().unwrap(), goal);
        assert_eq!(g.cells()[goal].distance(), 10);
        assert_eq!(g.turn_of(goal, UNIT_SPEED), 0);
    }

    #[test]
    fn unexplored_destination_has_no_path() {
        let mut g = grid(20, 10);
        let start = g.cell_index_at_offset(3, 4).unwrap();
        let goal = g.cell_index_at_offset(16, 4).unwrap();
        g.add_unit(start, 0.0);
        g.find_path(start, goal, UNIT_SPEED);
        assert!(!g.has_path());
        assert!(g.path().is_none());
    }

    #[test]
    fn cliff_forces_detour_and_road_is_cheap() {
        let mut g = grid(10, 10);
        let start = g.cell_index_at_offset(4, 4).unwrap();
        let east = g.cells()[start].neighbor(HexDirection::E).unwrap();
        let goal = g.cells()[east].neighbor(HexDirection::E).unwrap();
        g.add_unit(start, 0.0);

        g.set_elevation(east, 3);
        g.find_path(start, goal, UNIT_SPEED);
        assert!(g.has_path());
        assert!(!g.path().unwrap().contains(&east));
        assert_eq!(g.cells()[goal].distance(), 15);

        g.set_elevation(east, 0);
        g.add_road(start, HexDirection::E);
        g.add_road(east, HexDirection::E);
        g.find_path(start, goal, UNIT_SPEED);
        assert_eq!(g.cells()[goal].distance(), 2);
    }

    #[test]
    fn turn_boundary_rounds_distance_up() {
        let mut g = grid(15, 10);
        let start = g.cell_index_at_offset(2, 4).unwrap();
        let goal = g.cell_index_at_offset(8, 4).unwrap();
        g.add_unit(start, 0.0);
        g.increase_visibility(start, 8);
        // Speed 12 fits two flat steps per turn; the third starts turn two.
        g.find_path(start, goal, 12);
        assert!(g.has_path());
        let path = g.path().unwrap();
        let third = path[3];
        assert_eq!(g.cells()[third].distance(), 17);
        assert_eq!(g.turn_of(third, 12), 1);
    }

    #[test]
    fn clear_path_forgets_result() {
        let mut g = grid(10, 10);
        let start = g.cell_index_at_offset(4, 4).unwrap();
        let goal = g.cell_index_at_offset(5, 4).unwrap();
        g.add_unit(start, 0.0);
        g.find_path(start, goal, UNIT_SPEED);
        assert!(g.has_path());
        g.clear_path();
        assert!(!g.has_path());
        assert_eq!(g.current_path_endpoints(), None);
    }

    // ── visibility ──────────────────────────────────────────────────

    #[test]
    fn sight_range_on_flat_ground() {
        let mut g = grid(15, 15);
        let center = g.cell_index_at_offset(7, 7).unwrap();
        let visible = g.visible_cells(center, UNIT_VISION_RANGE);
        // A radius-3 hexagon holds 37 cells.
        assert_eq!(visible.len(), 37);
        for i in visible {
            assert!(g.distance(center, i) <= UNIT_VISION_RANGE);
        }
    }

    #[test]
    fn hill_blocks_sight_beyond_it() {
        let mut g = grid(15, 15);
        let center = g.cell_index_at_offset(7, 7).unwrap();
        let hill = g.cells()[center].neighbor(HexDirection::E).unwrap();
        let behind = g.cells()[hill].neighbor(HexDirection::E).unwrap();
        g.set_elevation(hill, 5);
        let visible = g.visible_cells(center, UNIT_VISION_RANGE);
        assert!(!visible.contains(&hill));
        assert!(!visible.contains(&behind));
    }

    #[test]
    fn observers_count_up_and_down() {
        let mut g = grid(10, 10);
        let a = g.cell_index_at_offset(4, 4).unwrap();
        g.increase_visibility(a, 2);
        g.increase_visibility(a, 2);
        assert_eq!(g.cells()[a].visibility(), 2);
        assert!(g.cells()[a].is_explored());
        g.decrease_visibility(a, 2);
        g.decrease_visibility(a, 2);
        assert_eq!(g.cells()[a].visibility(), 0);
        assert!(g.cells()[a].is_explored(), "explored flag is sticky");
    }

    #[test]
    fn reset_visibility_restores_unit_sight() {
        let mut g = grid(10, 10);
        let a = g.cell_index_at_offset(4, 4).unwrap();
        let far = g.cell_index_at_offset(8, 8).unwrap();
        g.add_unit(a, 0.0);
        g.increase_visibility(far, 1);
        g.reset_visibility();
        assert_eq!(g.cells()[a].visibility(), 1);
        assert_eq!(g.cells()[far].visibility(), 0);
    }
}
