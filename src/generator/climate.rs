//! Water cycle simulation that produces per-cell moisture.

use crate::coordinates::HexDirection;

use super::MapGenerator;

const CLIMATE_CYCLES: usize = 40;

/// Clouds and moisture of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(super) struct ClimateData {
    pub clouds: f32,
    pub moisture: f32,
}

impl MapGenerator<'_> {
    /// Runs the evaporation, precipitation and dispersal cycles.
    pub(super) fn create_climate(&mut self) {
        let count = self.grid.cells().len();
        let initial = ClimateData {
            clouds: 0.0,
            moisture: self.settings.starting_moisture,
        };
        self.climate = vec![initial; count];
        let mut next = vec![ClimateData::default(); count];

        for _ in 0..CLIMATE_CYCLES {
            for i in 0..count {
                self.evolve_climate(i, &mut next);
            }
            std::mem::swap(&mut self.climate, &mut next);
        }
    }

    fn evolve_climate(&mut self, i: usize, next: &mut [ClimateData]) {
        let s = self.settings;
        let cell = &self.grid.cells[i];
        let mut climate = self.climate[i];

        if cell.is_underwater() {
            climate.moisture = 1.0;
            climate.clouds += s.evaporation_factor;
        } else {
            let evaporation = climate.moisture * s.evaporation_factor;
            climate.moisture -= evaporation;
            climate.clouds += evaporation;
        }

        let precipitation = climate.clouds * s.precipitation_factor;
        climate.clouds -= precipitation;
        climate.moisture += precipitation;

        let cloud_maximum = 1.0 - cell.view_elevation() as f32 / (s.elevation_maximum + 1) as f32;
        if climate.clouds > cloud_maximum {
            climate.moisture += climate.clouds - cloud_maximum;
            climate.clouds = cloud_maximum;
        }

        let main_dispersal = s.wind_direction.opposite();
        let cloud_dispersal = climate.clouds * (1.0 / (5.0 + s.wind_strength));
        let runoff = climate.moisture * s.runoff_factor * (1.0 / 6.0);
        let seepage = climate.moisture * s.seepage_factor * (1.0 / 6.0);

        for d in HexDirection::ALL {
            let Some(n) = cell.neighbor(d) else {
                continue;
            };
            let neighbor_climate = &mut next[n];
            if d == main_dispersal {
                neighbor_climate.clouds += cloud_dispersal * s.wind_strength;
            } else {
                neighbor_climate.clouds += cloud_dispersal;
            }

            let elevation_delta = self.grid.cells[n].view_elevation() - cell.view_elevation();
            if elevation_delta < 0 {
                climate.moisture -= runoff;
                neighbor_climate.moisture += runoff;
            } else if elevation_delta == 0 {
                climate.moisture -= seepage;
                neighbor_climate.moisture += seepage;
            }
        }

        let own = &mut next[i];
        own.moisture = (own.moisture + climate.moisture).min(1.0);
        self.climate[i] = ClimateData::default();
    }

    /// Final moisture of cell `i`.
    pub(super) fn moisture(&self, i: usize) -> f32 {
        self.climate[i].moisture
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::generator::{MapGenerator, MapGeneratorSettings};
    use crate::grid::tests::grid;
    use crate::priority_queue::HexCellPriorityQueue;

    // ── water cycle ─────────────────────────────────────────────────

    #[test]
    fn moisture_stays_in_unit_range_and_water_is_wet() {
        let mut g = grid(20, 15);
        for i in 0..g.cells().len() {
            g.set_water_level(i, 1);
        }
        // Dry plateau in the middle.
        for z in 4..11 {
            for x in 5..15 {
                let i = g.cell_index_at_offset(x, z).unwrap();
                g.set_elevation(i, 2);
            }
        }

        let settings = MapGeneratorSettings::default();
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
        generator.create_climate();

        let count = generator.grid.cells().len();
        for i in 0..count {
            let m = generator.moisture(i);
            assert!((0.0..=1.0).contains(&m), "cell {i}: {m}");
            if generator.grid.cells()[i].is_underwater() {
                assert!(m > 0.9, "sea cell {i}: {m}");
            }
        }

        // Rain reaches the plateau from the surrounding sea.
        let coast = generator.grid.cell_index_at_offset(5, 7).unwrap();
        let inland = generator.grid.cell_index_at_offset(10, 7).unwrap();
        assert!(generator.moisture(coast) > 0.0);
        assert!(generator.moisture(inland) > 0.0);
    }
}
