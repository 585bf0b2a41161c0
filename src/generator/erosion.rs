//! Erosion: wears down cliffs by moving elevation to lower neighbours.

use crate::coordinates::HexDirection;

use super::MapGenerator;

impl MapGenerator<'_> {
    /// Lowers a share of the erodible cells, depositing each lost level on
    /// a lower neighbour.
    pub(super) fn erode_land(&mut self) {
        let mut erodible: Vec<usize> = (0..self.grid.cells().len())
            .filter(|&i| self.is_erodible(i))
            .collect();

        let target_count =
            (erodible.len() as f32 * (100 - self.settings.erosion_percentage) as f32 * 0.01) as usize;

        while erodible.len() > target_count {
            let index = self.range(0, erodible.len() as i32) as usize;
            let cell = erodible[index];
            let Some(target) = self.erosion_target(cell) else {
                erodible.swap_remove(index);
                continue;
            };

            let elevation = self.grid.cells[cell].elevation - 1;
            self.grid.set_elevation(cell, elevation);
            let target_elevation = self.grid.cells[target].elevation + 1;
            self.grid.set_elevation(target, target_elevation);

            if !self.is_erodible(cell) {
                erodible.swap_remove(index);
            }

            for d in HexDirection::ALL {
                let Some(n) = self.grid.cells[cell].neighbor(d) else {
                    continue;
                };
                if self.grid.cells[n].elevation == elevation + 2 && !erodible.contains(&n) {
                    erodible.push(n);
                }
            }

            if self.is_erodible(target) && !erodible.contains(&target) {
                erodible.push(target);
            }

            for d in HexDirection::ALL {
                let Some(n) = self.grid.cells[target].neighbor(d) else {
                    continue;
                };
                if n != cell
                    && self.grid.cells[n].elevation == target_elevation + 1
                    && !self.is_erodible(n)
                    && let Some(pos) = erodible.iter().position(|&e| e == n)
                {
                    erodible.remove(pos);
                }
            }
        }
    }

    /// A cell is erodible when some neighbour sits at least two levels lower.
    pub(super) fn is_erodible(&self, i: usize) -> bool {
        let cell = &self.grid.cells[i];
        let eroded = cell.elevation - 2;
        HexDirection::ALL.into_iter().any(|d| {
            cell.neighbor(d)
                .is_some_and(|n| self.grid.cells[n].elevation <= eroded)
        })
    }

    fn erosion_target(&mut self, i: usize) -> Option<usize> {
        let cell = &self.grid.cells[i];
        let eroded = cell.elevation - 2;
        let candidates: Vec<usize> = HexDirection::ALL
            .into_iter()
            .filter_map(|d| cell.neighbor(d))
            .filter(|&n| self.grid.cells[n].elevation <= eroded)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let pick = self.range(0, candidates.len() as i32) as usize;
        Some(candidates[pick])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::generator::{MapGenerator, MapGeneratorSettings};
    use crate::grid::tests::grid;
    use crate::priority_queue::HexCellPriorityQueue;

    fn cliff_count(g: &crate::grid::HexGrid) -> usize {
        g.cells()
            .iter()
            .map(|c| {
                crate::coordinates::HexDirection::ALL
                    .into_iter()
                    .filter_map(|d| c.neighbor(d))
                    .filter(|&n| c.elevation() - g.cells()[n].elevation() >= 2)
                    .count()
            })
            .sum()
    }

    // ── erosion ─────────────────────────────────────────────────────

    #[test]
    fn erosion_conserves_mass_and_removes_cliffs() {
        let mut g = grid(10, 10);
        let peak = g.cell_index_at_offset(5, 5).unwrap();
        g.set_elevation(peak, 6);
        let before = cliff_count(&g);
        let total_before: i32 = g.cells().iter().map(|c| c.elevation()).sum();

        let settings = MapGeneratorSettings {
            erosion_percentage: 100,
            ..Default::default()
        };
        let mut generator = MapGenerator {
            settings: &settings,
            grid: &mut g,
            rng: ChaCha8Rng::seed_from_u64(1),
            frontier: HexCellPriorityQueue::new(),
            frontier_phase: 0,
            regions: Vec::new(),
            climate: Vec::new(),
            land_cells: 0,
        };
        assert!(generator.is_erodible(peak));
        generator.erode_land();

        let total_after: i32 = g.cells().iter().map(|c| c.elevation()).sum();
        assert_eq!(total_before, total_after);
        assert!(cliff_count(&g) < before);
        assert_eq!(cliff_count(&g), 0);
    }

    #[test]
    fn zero_erosion_leaves_map_alone() {
        let mut g = grid(10, 10);
        let peak = g.cell_index_at_offset(5, 5).unwrap();
        g.set_elevation(peak, 6);

        let settings = MapGeneratorSettings {
            erosion_percentage: 0,
            ..Default::default()
        };
        let mut generator = MapGenerator {
            settings: &settings,
            grid: &mut g,
            rng: ChaCha8Rng::seed_from_u64(1),
            frontier: HexCellPriorityQueue::new(),
            frontier_phase: 0,
            regions: Vec::new(),
            climate: Vec::new(),
            land_cells: 0,
        };
        generator.erode_land();
        assert_eq!(g.cells()[peak].elevation(), 6);
    }
}
