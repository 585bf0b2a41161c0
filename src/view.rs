//! Bevy front end: chunk meshes, feature and unit markers, debug controls.
//!
//! The [`HexGrid`](crate::grid::HexGrid) lives as a resource. Editing it
//! marks chunks dirty; once per frame, in `PostUpdate`, every dirty chunk is
//! triangulated again and its child meshes are replaced.

mod entities;
mod systems;

pub use entities::{ChunkLayer, FeatureMarker, HexChunk, MapCamera, UnitMarker};

use bevy::prelude::*;

use crate::GameState;
use crate::generator::MapGeneratorSettings;

/// Nested configuration for the map view.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct HexMapConfig {
    /// Map size, seeds and where the first map comes from.
    pub grid: GridSettings,
    /// Procedural generator parameters.
    pub generator: MapGeneratorSettings,
    /// Terrain and layer colors.
    pub palette: TerrainPalette,
    /// Camera movement.
    pub camera: CameraSettings,
    /// Background clear color.
    pub clear_color: Color,
}

/// Map size, seeds, and startup source.
#[derive(Clone, Debug, Reflect)]
pub struct GridSettings {
    /// Cells along X; a multiple of the chunk width.
    pub width: usize,
    /// Cells along Z; a multiple of the chunk height.
    pub height: usize,
    /// Whether the map wraps east to west.
    pub wrapping: bool,
    /// Seed of the perturbation noise texture.
    pub noise_seed: u32,
    /// Seed of the feature hash grid.
    pub hash_seed: u64,
    /// Run the generator at startup instead of creating a flat map.
    pub generate: bool,
    /// Map file to load at startup; overrides `generate`.
    pub load_path: Option<String>,
    /// Target of the save and load debug keys.
    pub save_path: String,
}

/// Colors used to shade the chunk layers.
#[derive(Clone, Debug, Reflect)]
pub struct TerrainPalette {
    /// One color per terrain type index.
    pub terrain: Vec<Color>,
    /// Rivers, open water and estuaries.
    pub water: Color,
    /// Road surface.
    pub road: Color,
    /// Wall stone.
    pub wall: Color,
    /// Shade cells by unit vision; otherwise everything is lit.
    pub fog_of_war: bool,
    /// Brightness of explored cells no unit currently sees.
    pub explored_brightness: f32,
}

/// Top-down camera movement.
#[derive(Clone, Debug, Reflect)]
pub struct CameraSettings {
    /// WASD pan speed in world units per second.
    pub pan_speed: f32,
    /// Height change per scroll line.
    pub zoom_step: f32,
    /// Lowest camera height.
    pub min_height: f32,
    /// Highest camera height.
    pub max_height: f32,
}

impl Default for HexMapConfig {
    fn default() -> Self {
        Self {
            grid: GridSettings {
                width: 40,
                height: 30,
                wrapping: false,
                noise_seed: 0,
                hash_seed: 1234,
                generate: true,
                load_path: None,
                save_path: "map.hexmap".into(),
            },
            generator: MapGeneratorSettings::default(),
            palette: TerrainPalette {
                terrain: vec![
                    Color::srgb(0.85, 0.78, 0.51),
                    Color::srgb(0.39, 0.62, 0.25),
                    Color::srgb(0.47, 0.36, 0.24),
                    Color::srgb(0.55, 0.55, 0.55),
                    Color::srgb(0.94, 0.96, 0.98),
                ],
                water: Color::srgba(0.16, 0.4, 0.7, 0.75),
                road: Color::srgb(0.6, 0.25, 0.2),
                wall: Color::srgb(0.7, 0.66, 0.6),
                fog_of_war: false,
                explored_brightness: 0.5,
            },
            camera: CameraSettings {
                pan_speed: 120.0,
                zoom_step: 15.0,
                min_height: 40.0,
                max_height: 600.0,
            },
            clear_color: Color::srgb(0.05, 0.06, 0.09),
        }
    }
}

/// Map view plugin: builds the map at startup and keeps its meshes current.
pub struct HexMapPlugin(pub HexMapConfig);

impl Plugin for HexMapPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<HexMapConfig>()
            .register_type::<HexChunk>()
            .register_type::<ChunkLayer>()
            .register_type::<FeatureMarker>()
            .register_type::<UnitMarker>()
            .register_type::<MapCamera>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color))
            .add_systems(
                Startup,
                (systems::setup_map, systems::load_assets, systems::spawn_camera).chain(),
            )
            .add_systems(
                Update,
                (
                    systems::debug_keys,
                    systems::pan_camera,
                    systems::tick_units.after(systems::debug_keys),
                    systems::sync_unit_markers.after(systems::tick_units),
                    systems::draw_path,
                )
                    .run_if(in_state(GameState::Running)),
            )
            .add_systems(PostUpdate, systems::rebuild_dirty_chunks);

        app.add_systems(
            Update,
            systems::draw_cell_labels.run_if(in_state(GameState::Debugging)),
        );
    }
}
