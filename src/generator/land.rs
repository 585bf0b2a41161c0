//! Region partition and the land-raising flood fill.

use bevy::prelude::*;

use crate::coordinates::HexDirection;

use super::MapGenerator;

/// Rectangle of offset coordinates that seeds land chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct MapRegion {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
}

const LAND_GUARD: usize = 10_000;

impl MapGenerator<'_> {
    /// Splits the map into one to four regions separated by borders.
    pub(super) fn create_regions(&mut self) {
        self.regions.clear();
        let s = self.settings;
        let count_x = self.grid.cell_count_x() as i32;
        let count_z = self.grid.cell_count_z() as i32;
        let wrapping = self.grid.wrapping();
        let mut border_x = if wrapping { s.region_border } else { s.map_border_x };

        let mut region = MapRegion {
            x_min: border_x,
            x_max: count_x - border_x,
            z_min: s.map_border_z,
            z_max: count_z - s.map_border_z,
        };

        match s.region_count {
            2 => {
                if self.value() < 0.5 {
                    region.x_max = count_x / 2 - s.region_border;
                    self.regions.push(region);
                    region.x_min = count_x / 2 + s.region_border;
                    region.x_max = count_x - border_x;
                    self.regions.push(region);
                } else {
                    if wrapping {
                        border_x = 0;
                    }
                    region.x_min = border_x;
                    region.x_max = count_x - border_x;
                    region.z_max = count_z / 2 - s.region_border;
                    self.regions.push(region);
                    region.z_min = count_z / 2 + s.region_border;
                    region.z_max = count_z - s.map_border_z;
                    self.regions.push(region);
                }
            }
            3 => {
                region.x_max = count_x / 3 - s.region_border;
                self.regions.push(region);
                region.x_min = count_x / 3 + s.region_border;
                region.x_max = count_x * 2 / 3 - s.region_border;
                self.regions.push(region);
                region.x_min = count_x * 2 / 3 + s.region_border;
                region.x_max = count_x - border_x;
                self.regions.push(region);
            }
            4 => {
                region.x_max = count_x / 2 - s.region_border;
                region.z_max = count_z / 2 - s.region_border;
                self.regions.push(region);
                region.x_min = count_x / 2 + s.region_border;
                region.x_max = count_x - border_x;
                self.regions.push(region);
                region.z_min = count_z / 2 + s.region_border;
                region.z_max = count_z - s.map_border_z;
                self.regions.push(region);
                region.x_min = border_x;
                region.x_max = count_x / 2 - s.region_border;
                self.regions.push(region);
            }
            _ => {
                if wrapping {
                    border_x = 0;
                }
                region.x_min = border_x;
                region.x_max = count_x - border_x;
                self.regions.push(region);
            }
        }
    }

    /// Raises and sinks chunks until the land budget is spent.
    ///
    /// Returns the budget left over when the iteration guard ran out.
    pub(super) fn create_land(&mut self) -> i32 {
        let cell_count = self.grid.cells().len() as f32;
        let mut budget = (cell_count * self.settings.land_percentage as f32 * 0.01).round() as i32;
        self.land_cells = budget;

        for _ in 0..LAND_GUARD {
            let sink = self.value() < self.settings.sink_probability;
            for r in 0..self.regions.len() {
                let region = self.regions[r];
                let chunk_size = self.range(self.settings.chunk_size_min, self.settings.chunk_size_max - 1);
                if sink {
                    budget = self.sink_terrain(chunk_size, budget, region);
                } else {
                    budget = self.raise_terrain(chunk_size, budget, region);
                    if budget == 0 {
                        return 0;
                    }
                }
            }
        }

        if budget > 0 {
            warn!("Failed to use up {budget} land budget");
            self.land_cells -= budget;
        }
        budget
    }

    fn random_cell(&mut self, region: MapRegion) -> usize {
        let x = self.range(region.x_min, region.x_max);
        let z = self.range(region.z_min, region.z_max);
        let max_x = self.grid.cell_count_x() as i32 - 1;
        let max_z = self.grid.cell_count_z() as i32 - 1;
        x.clamp(0, max_x) as usize + z.clamp(0, max_z) as usize * self.grid.cell_count_x()
    }

    /// Starts a jittered flood fill at a random cell of `region`.
    fn begin_chunk(&mut self, region: MapRegion) -> usize {
        self.frontier_phase += 1;
        let first = self.random_cell(region);
        let cell = &mut self.grid.cells[first];
        cell.search_phase = self.frontier_phase;
        cell.distance = 0;
        cell.search_heuristic = 0;
        self.frontier.enqueue(first, 0);
        first
    }

    /// Queues the unvisited neighbours of `current`, prioritised by distance
    /// to the chunk center plus random jitter.
    fn spread_chunk(&mut self, current: usize, center: usize) {
        let center = self.grid.cells[center].coordinates;
        let wrap_size = self.grid.metrics().wrap_size();
        for d in HexDirection::ALL {
            let Some(n) = self.grid.cells[current].neighbor(d) else {
                continue;
            };
            if self.grid.cells[n].search_phase >= self.frontier_phase {
                continue;
            }
            let jitter = if self.value() < self.settings.jitter_probability { 1 } else { 0 };
            let neighbor = &mut self.grid.cells[n];
            neighbor.search_phase = self.frontier_phase;
            neighbor.distance = neighbor.coordinates.distance_to(center, wrap_size);
            neighbor.search_heuristic = jitter;
            let priority = neighbor.search_priority() as usize;
            self.frontier.enqueue(n, priority);
        }
    }

    fn raise_terrain(&mut self, chunk_size: i32, mut budget: i32, region: MapRegion) -> i32 {
        let first = self.begin_chunk(region);
        let rise = if self.value() < self.settings.high_rise_probability { 2 } else { 1 };
        let water_level = self.settings.water_level;

        let mut size = 0;
        while size < chunk_size {
            let Some(current) = self.frontier.dequeue() else {
                break;
            };
            let original = self.grid.cells[current].elevation;
            let elevation = original + rise;
            if elevation > self.settings.elevation_maximum {
                continue;
            }
            self.grid.set_elevation(current, elevation);
            if original < water_level && elevation >= water_level {
                budget -= 1;
                if budget == 0 {
                    break;
                }
            }
            size += 1;
            self.spread_chunk(current, first);
        }
        self.frontier.clear();
        budget
    }

    fn sink_terrain(&mut self, chunk_size: i32, mut budget: i32, region: MapRegion) -> i32 {
        let first = self.begin_chunk(region);
        let sink = if self.value() < self.settings.high_rise_probability { 2 } else { 1 };
        let water_level = self.settings.water_level;

        let mut size = 0;
        while size < chunk_size {
            let Some(current) = self.frontier.dequeue() else {
                break;
            };
            let original = self.grid.cells[current].elevation;
            let elevation = original - sink;
            if elevation < self.settings.elevation_minimum {
                continue;
            }
            self.grid.set_elevation(current, elevation);
            if original >= water_level && elevation < water_level {
                budget += 1;
            }
            size += 1;
            self.spread_chunk(current, first);
        }
        self.frontier.clear();
        budget
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::generator::MapGeneratorSettings;
    use crate::grid::HexGrid;
    use crate::priority_queue::HexCellPriorityQueue;

    fn with_generator<R>(
        settings: &MapGeneratorSettings,
        x: usize,
        z: usize,
        wrapping: bool,
        f: impl FnOnce(&mut MapGenerator) -> R,
    ) -> R {
        let mut grid = HexGrid::default();
        assert!(grid.create_map(x, z, wrapping));
        let mut generator = MapGenerator {
            settings,
            grid: &mut grid,
            rng: ChaCha8Rng::seed_from_u64(9),
            frontier: HexCellPriorityQueue::new(),
            frontier_phase: 0,
            regions: Vec::new(),
            climate: Vec::new(),
            land_cells: 0,
        };
        f(&mut generator)
    }

    // ── regions ─────────────────────────────────────────────────────

    #[test]
    fn single_region_keeps_map_border() {
        let settings = MapGeneratorSettings::default();
        let regions = with_generator(&settings, 40, 30, false, |g| {
            g.create_regions();
            g.regions.clone()
        });
        assert_eq!(
            regions,
            vec![MapRegion { x_min: 5, x_max: 35, z_min: 5, z_max: 25 }]
        );
    }

    #[test]
    fn wrapping_single_region_spans_all_columns() {
        let settings = MapGeneratorSettings::default();
        let regions = with_generator(&settings, 40, 30, true, |g| {
            g.create_regions();
            g.regions.clone()
        });
        assert_eq!(regions[0].x_min, 0);
        assert_eq!(regions[0].x_max, 40);
    }

    #[test]
    fn four_regions_are_disjoint_quadrants() {
        let settings = MapGeneratorSettings {
            region_count: 4,
            ..default()
        };
        let regions = with_generator(&settings, 60, 40, false, |g| {
            g.create_regions();
            g.regions.clone()
        });
        assert_eq!(regions.len(), 4);
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                let overlap_x = a.x_min < b.x_max && b.x_min < a.x_max;
                let overlap_z = a.z_min < b.z_max && b.z_min < a.z_max;
                assert!(!(overlap_x && overlap_z), "{a:?} overlaps {b:?}");
            }
        }
    }

    // ── land ────────────────────────────────────────────────────────

    #[test]
    fn raise_spends_budget_for_each_cell_leaving_water() {
        let settings = MapGeneratorSettings {
            high_rise_probability: 1.0,
            ..default()
        };
        with_generator(&settings, 40, 30, false, |g| {
            for i in 0..g.grid.cells().len() {
                g.grid.set_water_level(i, 1);
            }
            g.create_regions();
            let region = g.regions[0];
            let left = g.raise_terrain(10, 100, region);
            // Every raised cell goes from 0 to 2, crossing water level 1.
            let raised = g.grid.cells().iter().filter(|c| c.elevation() == 2).count();
            assert_eq!(raised, 10);
            assert_eq!(left, 90);
            assert!(g.frontier.is_empty());
        });
    }

    #[test]
    fn land_budget_is_spent_on_default_settings() {
        let settings = MapGeneratorSettings::default();
        with_generator(&settings, 40, 30, false, |g| {
            for i in 0..g.grid.cells().len() {
                g.grid.set_water_level(i, settings.water_level);
            }
            g.create_regions();
            assert_eq!(g.create_land(), 0);
            assert_eq!(g.land_cells, 600);
            let dry = g.grid.cells().iter().filter(|c| !c.is_underwater()).count();
            assert_eq!(dry, 600);
        });
    }
}
