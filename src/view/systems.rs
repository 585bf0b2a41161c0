use std::path::Path;

use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::egui;
use rand::Rng;

use super::entities::{ChunkLayer, FeatureMarker, HexChunk, MapAssets, MapCamera, UnitMarker};
use super::{HexMapConfig, TerrainPalette};
use crate::cell::HexCell;
use crate::generator;
use crate::grid::{HexGrid, UNIT_SPEED};
use crate::metrics::{BRIDGE_DESIGN_LENGTH, HexMetrics, INNER_DIAMETER, OUTER_RADIUS};
use crate::triangulator::{self, FeatureKind, FeaturePlacement};

/// Fallback map size when the configured one is rejected.
const FALLBACK_SIZE: (usize, usize) = (20, 15);

/// Height of the unit placeholder.
const UNIT_HEIGHT: f32 = 6.0;

// ── Startup ────────────────────────────────────────────────────────

/// Builds the grid resource: loaded, generated, or flat.
pub fn setup_map(mut commands: Commands, cfg: Res<HexMapConfig>) {
    let settings = &cfg.grid;
    let mut grid = HexGrid::new(HexMetrics::new(settings.noise_seed, settings.hash_seed));

    let loaded = settings
        .load_path
        .as_deref()
        .is_some_and(|path| grid.load_map_file(Path::new(path)));

    if !loaded {
        let created = if settings.generate {
            generator::generate_map(
                &mut grid,
                &cfg.generator,
                settings.width,
                settings.height,
                settings.wrapping,
            )
            .is_some()
        } else {
            grid.create_map(settings.width, settings.height, settings.wrapping)
        };
        if !created {
            let (x, z) = FALLBACK_SIZE;
            warn!("Falling back to a flat {x}x{z} map");
            grid.create_map(x, z, false);
        }
    }

    commands.insert_resource(grid);
}

/// Creates the shared materials and the marker cube.
pub fn load_assets(
    mut commands: Commands,
    cfg: Res<HexMapConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let palette = &cfg.palette;
    let mut solid = |color: Color| {
        materials.add(StandardMaterial {
            base_color: color,
            perceptual_roughness: 0.9,
            ..default()
        })
    };
    let features = [
        solid(Color::srgb(0.8, 0.3, 0.25)),
        solid(Color::srgb(0.75, 0.7, 0.3)),
        solid(Color::srgb(0.2, 0.45, 0.2)),
        solid(Color::srgb(0.5, 0.4, 0.6)),
    ];
    let unit = solid(Color::srgb(0.2, 0.3, 0.9));
    let terrain = solid(Color::WHITE);

    commands.insert_resource(MapAssets {
        terrain,
        water: materials.add(StandardMaterial {
            base_color: palette.water,
            alpha_mode: AlphaMode::Blend,
            cull_mode: None,
            ..default()
        }),
        road: materials.add(StandardMaterial {
            base_color: palette.road,
            depth_bias: 1.0,
            perceptual_roughness: 0.9,
            ..default()
        }),
        wall: materials.add(StandardMaterial {
            base_color: palette.wall,
            cull_mode: None,
            ..default()
        }),
        unit,
        features,
        cube: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
    });
}

/// Spawns the camera above the south edge of the map, plus a sun.
pub fn spawn_camera(mut commands: Commands, grid: Res<HexGrid>) {
    let center = Vec3::new(
        grid.cell_count_x() as f32 * INNER_DIAMETER * 0.5,
        0.0,
        grid.cell_count_z() as f32 * OUTER_RADIUS * 0.75,
    );
    commands.spawn((
        Name::new("Map Camera"),
        Camera3d::default(),
        Transform::from_xyz(center.x, 250.0, center.z - 220.0).looking_at(center, Vec3::Y),
        MapCamera,
    ));
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(0.0, 1.0, 0.0).looking_at(Vec3::new(-0.4, 0.0, 0.6), Vec3::Y),
    ));
}

// ── Update: input ──────────────────────────────────────────────────

/// WASD pan and scroll zoom in the camera's ground plane.
pub fn pan_camera(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut scroll: MessageReader<MouseWheel>,
    cfg: Res<HexMapConfig>,
    mut query: Query<&mut Transform, With<MapCamera>>,
) {
    let Ok(mut transform) = query.single_mut() else {
        return;
    };
    let cam = &cfg.camera;

    let forward = transform.forward();
    let forward_xz = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right = transform.right();
    let right_xz = Vec3::new(right.x, 0.0, right.z).normalize_or_zero();

    let mut direction = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        direction += forward_xz;
    }
    if keys.pressed(KeyCode::KeyS) {
        direction -= forward_xz;
    }
    if keys.pressed(KeyCode::KeyD) {
        direction += right_xz;
    }
    if keys.pressed(KeyCode::KeyA) {
        direction -= right_xz;
    }
    if direction != Vec3::ZERO {
        let height_factor = transform.translation.y / cam.min_height;
        transform.translation += direction.normalize() * cam.pan_speed * height_factor.sqrt() * time.delta_secs();
    }

    let lines: f32 = scroll
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y / 40.0,
        })
        .sum();
    if lines != 0.0 {
        let step = *forward * lines * cam.zoom_step;
        let target = transform.translation + step;
        if (cam.min_height..=cam.max_height).contains(&target.y) {
            transform.translation = target;
        }
    }
}

/// Editing shortcuts.
///
/// G regenerates, N makes a flat map, U drops a unit, T sends idle units to a
/// random explored cell, F toggles fog of war, F5 saves and F9 loads.
pub fn debug_keys(keys: Res<ButtonInput<KeyCode>>, mut grid: ResMut<HexGrid>, mut cfg: ResMut<HexMapConfig>) {
    let grid = &mut *grid;
    let (width, height, wrapping) = (cfg.grid.width, cfg.grid.height, cfg.grid.wrapping);

    if keys.just_pressed(KeyCode::KeyG) {
        generator::generate_map(grid, &cfg.generator, width, height, wrapping);
    }
    if keys.just_pressed(KeyCode::KeyN) {
        grid.create_map(width, height, wrapping);
    }
    if keys.just_pressed(KeyCode::KeyU) {
        spawn_random_unit(grid);
    }
    if keys.just_pressed(KeyCode::KeyT) {
        send_units_exploring(grid);
    }
    if keys.just_pressed(KeyCode::KeyF) {
        cfg.palette.fog_of_war = !cfg.palette.fog_of_war;
        info!("Fog of war: {}", cfg.palette.fog_of_war);
        grid.refresh_all();
    }
    if keys.just_pressed(KeyCode::F5) {
        grid.save_map_file(Path::new(&cfg.grid.save_path));
    }
    if keys.just_pressed(KeyCode::F9) {
        grid.load_map_file(Path::new(&cfg.grid.save_path));
    }
}

fn spawn_random_unit(grid: &mut HexGrid) {
    let candidates: Vec<usize> = grid
        .cells()
        .iter()
        .filter(|c| !c.is_underwater() && c.unit().is_none())
        .map(HexCell::index)
        .collect();
    if candidates.is_empty() {
        warn!("No free land cell for a unit");
        return;
    }
    let mut rng = rand::thread_rng();
    let cell = candidates[rng.gen_range(0..candidates.len())];
    if let Some(id) = grid.add_unit(cell, rng.gen_range(0.0..360.0)) {
        info!("Unit {} placed at {}", id.0, grid.cells()[cell].coordinates());
    }
}

fn send_units_exploring(grid: &mut HexGrid) {
    let mut rng = rand::thread_rng();
    let idle: Vec<_> = grid
        .units()
        .iter()
        .filter(|u| !u.is_travelling())
        .map(|u| (u.id(), u.location()))
        .collect();

    for (id, from) in idle {
        let destinations: Vec<usize> = (0..grid.cells().len())
            .filter(|&i| grid.unit_is_valid_destination(i))
            .collect();
        for _ in 0..8 {
            let Some(&to) = destinations.get(rng.gen_range(0..destinations.len().max(1))) else {
                break;
            };
            grid.find_path(from, to, UNIT_SPEED);
            if let Some(path) = grid.path() {
                grid.travel(id, path);
                break;
            }
        }
    }
}

// ── Update: units ──────────────────────────────────────────────────

/// Advances unit travel by the frame time.
pub fn tick_units(time: Res<Time>, mut grid: ResMut<HexGrid>) {
    if grid.units().iter().any(|u| u.is_travelling()) {
        grid.tick_units(time.delta_secs());
    }
}

/// Spawns, moves and despawns unit markers to match the grid.
pub fn sync_unit_markers(
    mut commands: Commands,
    grid: Res<HexGrid>,
    assets: Res<MapAssets>,
    mut markers: Query<(Entity, &UnitMarker, &mut Transform)>,
) {
    let mut shown = Vec::new();
    for (entity, marker, mut transform) in &mut markers {
        match grid.unit(marker.id) {
            Some(unit) => {
                *transform = unit_transform(unit.position(), unit.orientation());
                shown.push(marker.id);
            }
            None => commands.entity(entity).despawn(),
        }
    }

    for unit in grid.units().iter().filter(|u| !shown.contains(&u.id())) {
        commands.spawn((
            Name::new(format!("Unit {}", unit.id().0)),
            UnitMarker { id: unit.id() },
            Mesh3d(assets.cube.clone()),
            MeshMaterial3d(assets.unit.clone()),
            unit_transform(unit.position(), unit.orientation()),
        ));
    }
}

fn unit_transform(position: Vec3, orientation: f32) -> Transform {
    Transform::from_translation(position + Vec3::Y * (UNIT_HEIGHT * 0.5))
        .with_rotation(Quat::from_rotation_y(orientation.to_radians()))
        .with_scale(Vec3::new(3.0, UNIT_HEIGHT, 3.0))
}

/// Draws the current search path.
pub fn draw_path(grid: Res<HexGrid>, mut gizmos: Gizmos) {
    let Some(path) = grid.path() else {
        return;
    };
    let points = path
        .iter()
        .filter_map(|&i| grid.cell(i))
        .map(|c| c.position() + Vec3::Y * 2.0);
    gizmos.linestrip(points, Color::WHITE);
}

// ── PostUpdate: chunk rebuild ──────────────────────────────────────

/// Brightness of a cell under fog of war.
pub fn cell_brightness(cell: &HexCell, palette: &TerrainPalette) -> f32 {
    if !palette.fog_of_war || cell.is_visible() {
        1.0
    } else if cell.is_explored() {
        palette.explored_brightness
    } else {
        0.0
    }
}

/// Scale of the placeholder cuboid standing in for a feature.
pub fn feature_scale(kind: FeatureKind, choice: f32) -> Vec3 {
    let tier = |sizes: [Vec3; 3], size: u8| sizes[(size as usize).min(2)];
    let variant = 0.85 + 0.3 * choice;
    match kind {
        FeatureKind::Urban { size } => {
            tier(
                [Vec3::new(4.0, 6.0, 4.0), Vec3::new(3.0, 3.5, 3.0), Vec3::new(2.0, 2.0, 2.0)],
                size,
            ) * Vec3::new(1.0, variant, 1.0)
        }
        FeatureKind::Farm { size } => tier(
            [Vec3::new(5.0, 0.1, 5.0), Vec3::new(3.5, 0.1, 3.5), Vec3::new(2.5, 0.1, 2.5)],
            size,
        ),
        FeatureKind::Plant { size } => {
            tier(
                [Vec3::new(1.25, 4.5, 1.25), Vec3::new(1.0, 3.0, 1.0), Vec3::new(0.75, 1.5, 0.75)],
                size,
            ) * Vec3::new(1.0, variant, 1.0)
        }
        FeatureKind::Special { .. } => Vec3::new(6.0, 8.0, 6.0),
        FeatureKind::Bridge { length } => Vec3::new(3.0, 0.7, length * BRIDGE_DESIGN_LENGTH),
        FeatureKind::WallTower => Vec3::new(2.0, 5.0, 2.0),
    }
}

fn feature_bundle(placement: &FeaturePlacement, assets: &MapAssets) -> impl Bundle {
    let scale = feature_scale(placement.kind, placement.choice);
    let material = match placement.kind {
        FeatureKind::Urban { .. } => &assets.features[0],
        FeatureKind::Farm { .. } => &assets.features[1],
        FeatureKind::Plant { .. } => &assets.features[2],
        FeatureKind::Special { .. } => &assets.features[3],
        FeatureKind::Bridge { .. } => &assets.road,
        FeatureKind::WallTower => &assets.wall,
    };
    (
        FeatureMarker { kind: placement.kind },
        Mesh3d(assets.cube.clone()),
        MeshMaterial3d(material.clone()),
        Transform::from_translation(placement.position + Vec3::Y * (scale.y * 0.5))
            .with_rotation(placement.rotation)
            .with_scale(scale),
    )
}

/// Triangulates every dirty chunk and replaces its children.
pub fn rebuild_dirty_chunks(
    mut commands: Commands,
    mut grid: ResMut<HexGrid>,
    cfg: Res<HexMapConfig>,
    assets: Option<Res<MapAssets>>,
    mut meshes: ResMut<Assets<Mesh>>,
    chunks: Query<(Entity, &HexChunk)>,
) {
    let Some(assets) = assets else {
        return;
    };
    let dirty = grid.take_dirty_chunks();
    if dirty.is_empty() {
        return;
    }
    let grid = &*grid;

    let mut roots = vec![None; grid.chunks().len()];
    for (entity, chunk) in &chunks {
        match roots.get_mut(chunk.index) {
            Some(slot) => *slot = Some(entity),
            None => commands.entity(entity).despawn(),
        }
    }

    let palette = &cfg.palette;
    let brightness = |i: u32| grid.cell(i as usize).map_or(1.0, |c| cell_brightness(c, palette));
    let terrain_color = |i: u32| {
        let Some(cell) = grid.cell(i as usize) else {
            return LinearRgba::WHITE;
        };
        let color = palette
            .terrain
            .get(cell.terrain_type_index() as usize)
            .copied()
            .unwrap_or(Color::WHITE);
        color.to_linear() * cell_brightness(cell, palette)
    };
    let shade = |i: u32| LinearRgba::WHITE * brightness(i);

    for &index in &dirty {
        let root = match roots[index] {
            Some(entity) => {
                commands.entity(entity).despawn_related::<Children>();
                entity
            }
            None => commands
                .spawn((
                    Name::new(format!("Chunk {index}")),
                    HexChunk { index },
                    Transform::default(),
                    Visibility::default(),
                ))
                .id(),
        };

        let geometry = triangulator::triangulate_chunk(grid, index);
        let layers = [
            (ChunkLayer::Terrain, &geometry.terrain, &assets.terrain),
            (ChunkLayer::Rivers, &geometry.rivers, &assets.water),
            (ChunkLayer::Roads, &geometry.roads, &assets.road),
            (ChunkLayer::Water, &geometry.water, &assets.water),
            (ChunkLayer::WaterShore, &geometry.water_shore, &assets.water),
            (ChunkLayer::Estuaries, &geometry.estuaries, &assets.water),
            (ChunkLayer::Walls, &geometry.walls, &assets.wall),
        ];
        for (layer, builder, material) in layers {
            if builder.is_empty() {
                continue;
            }
            let mesh = if layer == ChunkLayer::Terrain {
                builder.to_mesh(&terrain_color)
            } else {
                builder.to_mesh(&shade)
            };
            commands.entity(root).with_child((
                Name::new(format!("{layer:?}")),
                layer,
                Mesh3d(meshes.add(mesh)),
                MeshMaterial3d(material.clone()),
                Transform::default(),
            ));
        }

        for placement in &geometry.features {
            let visible = grid
                .cell_index_at_position(placement.position)
                .and_then(|i| grid.cell(i))
                .is_none_or(|c| cell_brightness(c, palette) > 0.0);
            if visible {
                commands.entity(root).with_child(feature_bundle(placement, &assets));
            }
        }
    }
    debug!("Rebuilt {} chunks", dirty.len());
}

// ── Debugging: labels ──────────────────────────────────────────────

/// Coordinate and elevation labels over cells near the camera.
pub fn draw_cell_labels(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<MapCamera>>,
    grid: Option<Res<HexGrid>>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Some(grid) = grid else { return };
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let cam_pos = cam_gt.translation();
    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());

    for cell in grid.cells() {
        let world_pos = cell.position();
        if cam_pos.distance(world_pos) > 200.0 {
            continue;
        }
        if let Ok(viewport) = camera.world_to_viewport(cam_gt, world_pos) {
            painter.text(
                egui::pos2(viewport.x, viewport.y),
                egui::Align2::CENTER_CENTER,
                format!("{}\n{}", cell.coordinates(), cell.elevation()),
                egui::FontId::proportional(11.0),
                egui::Color32::WHITE,
            );
        }
    }
}
