//! Biome assignment from temperature and moisture.

use crate::cell::terrain_type::{GRASS, MUD, SAND, SNOW, STONE};
use crate::coordinates::HexDirection;

use super::{HemisphereMode, MapGenerator};

const TEMPERATURE_BANDS: [f32; 3] = [0.1, 0.3, 0.6];
const MOISTURE_BANDS: [f32; 3] = [0.12, 0.28, 0.85];

/// Terrain and plant level for one temperature/moisture combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Biome {
    terrain: u8,
    plant: u8,
}

const fn biome(terrain: u8, plant: u8) -> Biome {
    Biome { terrain, plant }
}

/// Rows by temperature band (cold to hot), columns by moisture band (dry to wet).
const BIOMES: [Biome; 16] = [
    biome(SAND, 0), biome(SNOW, 0), biome(SNOW, 0), biome(SNOW, 0),
    biome(SAND, 0), biome(MUD, 0), biome(MUD, 1), biome(MUD, 2),
    biome(SAND, 0), biome(GRASS, 0), biome(GRASS, 1), biome(GRASS, 2),
    biome(SAND, 0), biome(GRASS, 1), biome(GRASS, 2), biome(GRASS, 3),
];

fn band(value: f32, bands: &[f32; 3]) -> usize {
    bands.iter().position(|&b| value < b).unwrap_or(bands.len())
}

impl MapGenerator<'_> {
    /// Picks terrain type and vegetation for every cell.
    pub(super) fn set_terrain_type(&mut self) {
        let s = self.settings;
        let temperature_jitter_channel = self.range(0, 4) as usize;
        let rock_desert_elevation = s.elevation_maximum - (s.elevation_maximum - s.water_level) / 2;

        for i in 0..self.grid.cells().len() {
            let temperature = self.determine_temperature(i, temperature_jitter_channel);
            let moisture = self.moisture(i);
            let cell = &self.grid.cells[i];

            if !cell.is_underwater() {
                let t = band(temperature, &TEMPERATURE_BANDS);
                let m = band(moisture, &MOISTURE_BANDS);
                let mut biome = BIOMES[t * 4 + m];

                if biome.terrain == SAND {
                    if cell.elevation >= rock_desert_elevation {
                        biome.terrain = STONE;
                    }
                } else if cell.elevation == s.elevation_maximum {
                    biome.terrain = SNOW;
                }

                if biome.terrain == SNOW {
                    biome.plant = 0;
                } else if biome.plant < 3 && cell.has_river() {
                    biome.plant += 1;
                }

                self.grid.set_terrain_type(i, biome.terrain);
                self.grid.set_plant_level(i, biome.plant);
            } else {
                let terrain = if cell.elevation == s.water_level - 1 {
                    let (mut cliffs, mut slopes) = (0, 0);
                    for d in HexDirection::ALL {
                        let Some(n) = cell.neighbor(d) else {
                            continue;
                        };
                        let delta = self.grid.cells[n].elevation - s.water_level;
                        if delta == 0 {
                            slopes += 1;
                        } else if delta > 0 {
                            cliffs += 1;
                        }
                    }
                    if cliffs + slopes > 3 {
                        GRASS
                    } else if cliffs > 0 {
                        STONE
                    } else if slopes > 0 {
                        SAND
                    } else {
                        GRASS
                    }
                } else if cell.elevation >= s.water_level {
                    GRASS
                } else if cell.elevation < 0 {
                    STONE
                } else {
                    MUD
                };

                let terrain = if terrain == GRASS && temperature < TEMPERATURE_BANDS[0] {
                    MUD
                } else {
                    terrain
                };
                self.grid.set_terrain_type(i, terrain);
            }
        }
    }

    /// Temperature of cell `i` from latitude, altitude and noise.
    fn determine_temperature(&self, i: usize, jitter_channel: usize) -> f32 {
        let s = self.settings;
        let cell = &self.grid.cells[i];
        let mut latitude = cell.coordinates.z() as f32 / self.grid.cell_count_z() as f32;
        match s.hemisphere {
            HemisphereMode::Both => {
                latitude *= 2.0;
                if latitude > 1.0 {
                    latitude = 2.0 - latitude;
                }
            }
            HemisphereMode::North => latitude = 1.0 - latitude,
            HemisphereMode::South => {}
        }

        let mut temperature = s.low_temperature + (s.high_temperature - s.low_temperature) * latitude;
        temperature *= 1.0
            - (cell.view_elevation() - s.water_level) as f32
                / (s.elevation_maximum - s.water_level + 1) as f32;

        let jitter = self.grid.metrics().sample_noise(cell.position * 0.1)[jitter_channel];
        temperature + (jitter * 2.0 - 1.0) * s.temperature_jitter
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::generator::MapGeneratorSettings;
    use crate::generator::climate::ClimateData;
    use crate::grid::HexGrid;
    use crate::grid::tests::grid;
    use crate::priority_queue::HexCellPriorityQueue;

    fn generator<'a>(settings: &'a MapGeneratorSettings, g: &'a mut HexGrid, moisture: f32) -> MapGenerator<'a> {
        let count = g.cells().len();
        MapGenerator {
            settings,
            grid: g,
            rng: ChaCha8Rng::seed_from_u64(3),
            frontier: HexCellPriorityQueue::new(),
            frontier_phase: 0,
            regions: Vec::new(),
            climate: vec![ClimateData { clouds: 0.0, moisture }; count],
            land_cells: 0,
        }
    }

    fn run(settings: &MapGeneratorSettings, g: &mut HexGrid, moisture: f32) {
        generator(settings, g, moisture).set_terrain_type();
    }

    fn edge_temperatures(hemisphere: HemisphereMode) -> (f32, f32) {
        let mut g = grid(10, 10);
        let settings = MapGeneratorSettings {
            water_level: 0,
            low_temperature: 0.0,
            high_temperature: 1.0,
            temperature_jitter: 0.0,
            hemisphere,
            ..Default::default()
        };
        let south = g.cell_index_at_offset(4, 0).unwrap();
        let north = g.cell_index_at_offset(4, 9).unwrap();
        let generator = generator(&settings, &mut g, 0.5);
        (
            generator.determine_temperature(south, 0),
            generator.determine_temperature(north, 0),
        )
    }

    // ── temperature ─────────────────────────────────────────────────

    #[test]
    fn north_hemisphere_is_warm_in_the_south() {
        let (south, north) = edge_temperatures(HemisphereMode::North);
        assert!(south > north, "south {south}, north {north}");
        assert!((south - 1.0).abs() < 1e-5);
    }

    #[test]
    fn south_hemisphere_is_warm_in_the_north() {
        let (south, north) = edge_temperatures(HemisphereMode::South);
        assert!(north > south, "south {south}, north {north}");
        assert!(south.abs() < 1e-5);
    }

    #[test]
    fn both_hemispheres_warm_the_equator() {
        let mut g = grid(10, 10);
        let settings = MapGeneratorSettings {
            water_level: 0,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        let pole = g.cell_index_at_offset(4, 0).unwrap();
        let equator = g.cell_index_at_offset(4, 5).unwrap();
        let generator = generator(&settings, &mut g, 0.5);
        assert!(generator.determine_temperature(equator, 0) > generator.determine_temperature(pole, 0));
    }

    // ── bands ───────────────────────────────────────────────────────

    #[test]
    fn band_lookup() {
        assert_eq!(band(0.05, &TEMPERATURE_BANDS), 0);
        assert_eq!(band(0.1, &TEMPERATURE_BANDS), 1);
        assert_eq!(band(0.59, &TEMPERATURE_BANDS), 2);
        assert_eq!(band(0.9, &TEMPERATURE_BANDS), 3);
    }

    // ── land ────────────────────────────────────────────────────────

    #[test]
    fn dry_land_is_desert_and_peaks_are_rock() {
        let mut g = grid(10, 10);
        let peak = g.cell_index_at_offset(4, 4).unwrap();
        g.set_elevation(peak, 8);
        let settings = MapGeneratorSettings {
            water_level: 0,
            low_temperature: 0.7,
            high_temperature: 0.7,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        run(&settings, &mut g, 0.0);
        let flat = g.cell_index_at_offset(1, 1).unwrap();
        assert_eq!(g.cells()[flat].terrain_type_index(), SAND);
        assert_eq!(g.cells()[peak].terrain_type_index(), STONE);
    }

    #[test]
    fn wet_warm_land_is_lush_grass() {
        let mut g = grid(10, 10);
        let settings = MapGeneratorSettings {
            water_level: 0,
            low_temperature: 0.8,
            high_temperature: 0.8,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        run(&settings, &mut g, 1.0);
        for cell in g.cells() {
            assert_eq!(cell.terrain_type_index(), GRASS);
            assert_eq!(cell.plant_level(), 3);
        }
    }

    // ── water ───────────────────────────────────────────────────────

    #[test]
    fn deep_water_floor_is_mud_or_stone() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_water_level(i, 3);
        }
        let trench = g.cell_index_at_offset(5, 5).unwrap();
        g.set_elevation(trench, -1);
        let settings = MapGeneratorSettings {
            low_temperature: 0.8,
            high_temperature: 0.8,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        run(&settings, &mut g, 1.0);
        assert_eq!(g.cells()[trench].terrain_type_index(), STONE);
        let floor = g.cell_index_at_offset(1, 1).unwrap();
        assert_eq!(g.cells()[floor].terrain_type_index(), MUD);
    }

    #[test]
    fn lake_above_sea_level_keeps_a_land_biome() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_elevation(i, 5);
        }
        let lake = g.cell_index_at_offset(4, 4).unwrap();
        g.set_elevation(lake, 3);
        g.set_water_level(lake, 5);
        assert!(g.cells()[lake].is_underwater());
        let settings = MapGeneratorSettings {
            water_level: 3,
            low_temperature: 0.8,
            high_temperature: 0.8,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        run(&settings, &mut g, 0.5);
        assert_eq!(g.cells()[lake].terrain_type_index(), GRASS);
    }

    #[test]
    fn shallow_floor_ringed_by_cliffs_is_grass() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_elevation(i, 5);
        }
        let bay = g.cell_index_at_offset(4, 4).unwrap();
        g.set_elevation(bay, 2);
        g.set_water_level(bay, 3);
        let settings = MapGeneratorSettings {
            water_level: 3,
            low_temperature: 0.8,
            high_temperature: 0.8,
            temperature_jitter: 0.0,
            ..Default::default()
        };
        run(&settings, &mut g, 0.5);
        assert_eq!(g.cells()[bay].terrain_type_index(), GRASS);
    }
}
