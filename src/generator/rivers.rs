//! River tracing from wet highlands down to the sea.

use bevy::prelude::*;

use crate::coordinates::HexDirection;

use super::MapGenerator;

impl MapGenerator<'_> {
    /// Places rivers until the river budget is spent or origins run out.
    ///
    /// Returns the unspent budget.
    pub(super) fn create_rivers(&mut self) -> i32 {
        let s = self.settings;
        let mut origins = Vec::new();
        for i in 0..self.grid.cells().len() {
            let cell = &self.grid.cells[i];
            if cell.is_underwater() {
                continue;
            }
            let data = self.climate[i];
            let weight = data.moisture * (cell.elevation - s.water_level) as f32
                / (s.elevation_maximum - s.water_level) as f32;
            if weight > 0.75 {
                origins.push(i);
                origins.push(i);
            }
            if weight > 0.5 {
                origins.push(i);
            }
            if weight > 0.25 {
                origins.push(i);
            }
        }

        let mut budget = (self.land_cells as f32 * s.river_percentage as f32 * 0.01).round() as i32;
        while budget > 0 && !origins.is_empty() {
            let index = self.range(0, origins.len() as i32) as usize;
            let origin = origins.swap_remove(index);

            if self.grid.cells[origin].has_river() {
                continue;
            }
            let crowded = HexDirection::ALL.into_iter().any(|d| {
                self.grid.cells[origin]
                    .neighbor(d)
                    .is_some_and(|n| {
                        let neighbor = &self.grid.cells[n];
                        neighbor.has_river() || neighbor.is_underwater()
                    })
            });
            if !crowded {
                budget -= self.create_river(origin);
            }
        }

        if budget > 0 {
            warn!("Failed to use up river budget");
        }
        budget.max(0)
    }

    /// Traces one river downhill from `origin` and returns its length.
    ///
    /// A river that cannot leave its origin has length zero. Where the river
    /// gets stuck it ends in a lake.
    fn create_river(&mut self, origin: usize) -> i32 {
        let mut length = 1;
        let mut cell = origin;
        let mut direction = HexDirection::NE;
        let mut flow = Vec::with_capacity(6 * 5);

        while !self.grid.cells[cell].is_underwater() {
            let elevation = self.grid.cells[cell].elevation;
            let mut min_neighbor_elevation = i32::MAX;
            flow.clear();

            for d in HexDirection::ALL {
                let Some(n) = self.grid.cells[cell].neighbor(d) else {
                    continue;
                };
                let neighbor = &self.grid.cells[n];
                min_neighbor_elevation = min_neighbor_elevation.min(neighbor.elevation);

                if n == origin || neighbor.has_incoming_river() {
                    continue;
                }
                let delta = neighbor.elevation - elevation;
                if delta > 0 {
                    continue;
                }
                if neighbor.has_outgoing_river() {
                    self.grid.set_outgoing_river(cell, d);
                    return length;
                }

                if delta < 0 {
                    flow.extend([d, d, d]);
                }
                if length == 1 || (d != direction.next2() && d != direction.previous2()) {
                    flow.push(d);
                }
                flow.push(d);
            }

            if flow.is_empty() {
                if length == 1 {
                    return 0;
                }
                if min_neighbor_elevation >= elevation {
                    self.grid.set_water_level(cell, min_neighbor_elevation);
                    if min_neighbor_elevation == elevation {
                        self.grid.set_elevation(cell, min_neighbor_elevation - 1);
                    }
                }
                break;
            }

            direction = flow[self.range(0, flow.len() as i32) as usize];
            self.grid.set_outgoing_river(cell, direction);
            length += 1;

            if min_neighbor_elevation >= elevation
                && self.value() < self.settings.extra_lake_probability
            {
                self.grid.set_water_level(cell, elevation);
                self.grid.set_elevation(cell, elevation - 1);
            }
            let Some(next) = self.grid.cells[cell].neighbor(direction) else {
                break;
            };
            cell = next;
        }
        length
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::coordinates::HexDirection;
    use crate::generator::{MapGenerator, MapGeneratorSettings};
    use crate::grid::HexGrid;
    use crate::grid::tests::grid;
    use crate::priority_queue::HexCellPriorityQueue;

    fn generator<'a>(settings: &'a MapGeneratorSettings, g: &'a mut HexGrid) -> MapGenerator<'a> {
        MapGenerator {
            settings,
            grid: g,
            rng: ChaCha8Rng::seed_from_u64(5),
            frontier: HexCellPriorityQueue::new(),
            frontier_phase: 0,
            regions: Vec::new(),
            climate: Vec::new(),
            land_cells: 0,
        }
    }

    /// Ridge descending eastward into the sea along row 5.
    fn slope(g: &mut HexGrid) {
        for i in 0..g.cells().len() {
            g.set_water_level(i, 1);
            let (x, _) = g.cells()[i].coordinates().to_offset();
            g.set_elevation(i, (6 - x).max(0));
        }
    }

    // ── tracing ─────────────────────────────────────────────────────

    #[test]
    fn river_flows_downhill_into_the_sea() {
        let mut g = grid(10, 10);
        slope(&mut g);
        let settings = MapGeneratorSettings {
            extra_lake_probability: 0.0,
            ..Default::default()
        };
        let origin = g.cell_index_at_offset(1, 5).unwrap();
        let length = generator(&settings, &mut g).create_river(origin);
        assert!(length > 1);

        let mut cell = origin;
        let mut steps = 1;
        while let Some(d) = g.cells()[cell].outgoing_river() {
            let next = g.cells()[cell].neighbor(d).unwrap();
            assert!(g.cells()[next].elevation() <= g.cells()[cell].elevation());
            cell = next;
            steps += 1;
        }
        assert_eq!(steps, length);
        assert!(g.cells()[cell].is_underwater());
    }

    #[test]
    fn pit_without_exit_has_no_river() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_water_level(i, 0);
            g.set_elevation(i, 4);
        }
        let pit = g.cell_index_at_offset(5, 5).unwrap();
        g.set_elevation(pit, 2);
        let settings = MapGeneratorSettings::default();
        assert_eq!(generator(&settings, &mut g).create_river(pit), 0);
        assert!(!g.cells()[pit].has_river());
    }

    #[test]
    fn river_joins_existing_river() {
        let mut g = grid(10, 10);
        slope(&mut g);
        let downstream = g.cell_index_at_offset(3, 5).unwrap();
        g.set_outgoing_river(downstream, HexDirection::E);
        let settings = MapGeneratorSettings::default();
        // West neighbour sits one level higher and flows into the existing river.
        let upstream = g.cell_index_at_offset(2, 5).unwrap();
        let length = generator(&settings, &mut g).create_river(upstream);
        assert_eq!(length, 1);
        assert_eq!(g.cells()[upstream].outgoing_river(), Some(HexDirection::E));
    }
}
