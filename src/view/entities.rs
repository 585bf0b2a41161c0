use bevy::prelude::*;

use crate::grid::UnitId;
use crate::triangulator::FeatureKind;

/// Root entity of one chunk; its children are the layer meshes and features.
#[derive(Component, Reflect)]
pub struct HexChunk {
    /// Chunk index in the grid.
    pub index: usize,
}

/// Which geometry layer a chunk child renders.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum ChunkLayer {
    /// Ground surface.
    Terrain,
    /// River surfaces.
    Rivers,
    /// Roads.
    Roads,
    /// Open water.
    Water,
    /// Coastal water.
    WaterShore,
    /// River mouths.
    Estuaries,
    /// Walls.
    Walls,
}

/// Placeholder for a feature placement.
#[derive(Component, Reflect)]
pub struct FeatureMarker {
    /// What the placement stands for.
    pub kind: FeatureKind,
}

/// Visual of a unit, kept in sync with the grid.
#[derive(Component, Reflect)]
pub struct UnitMarker {
    /// Unit this entity shows.
    pub id: UnitId,
}

/// Marker on the map camera.
#[derive(Component, Reflect)]
pub struct MapCamera;

/// Shared render assets for chunk layers and markers.
#[derive(Resource)]
pub struct MapAssets {
    /// Vertex-colored terrain.
    pub terrain: Handle<StandardMaterial>,
    /// Translucent water layers.
    pub water: Handle<StandardMaterial>,
    /// Roads.
    pub road: Handle<StandardMaterial>,
    /// Walls and towers.
    pub wall: Handle<StandardMaterial>,
    /// Unit cuboid material.
    pub unit: Handle<StandardMaterial>,
    /// One material per feature family: urban, farm, plant, special.
    pub features: [Handle<StandardMaterial>; 4],
    /// Unit cube every marker is scaled from.
    pub cube: Handle<Mesh>,
}
