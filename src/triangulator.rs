//! Chunk triangulation: turns a block of cells into mesh layers.
//!
//! Each cell is split into six wedges. A wedge is a solid inner fan plus,
//! for the NE, E and SE directions, the blend strip to the neighbour and the
//! corner triangle where three cells meet. Rivers, roads, water, walls and
//! feature placements are layered on top. A chunk is always rebuilt from
//! scratch.

mod edge_vertices;
mod features;
mod rivers;
mod roads;
mod water;

pub use edge_vertices::EdgeVertices;
pub use features::{FeatureKind, FeaturePlacement};

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::grid::HexGrid;
use crate::mesh_builder::{HexMeshBuilder, MeshChannels, WEIGHTS_1, WEIGHTS_2, WEIGHTS_3};
use crate::metrics::{self, EdgeType, HexMetrics, TERRACE_STEPS};

/// All geometry of one chunk.
#[derive(Clone, Debug)]
pub struct ChunkGeometry<'a> {
    /// Ground surface.
    pub terrain: HexMeshBuilder<'a>,
    /// River surfaces and waterfalls.
    pub rivers: HexMeshBuilder<'a>,
    /// Road surfaces.
    pub roads: HexMeshBuilder<'a>,
    /// Open water.
    pub water: HexMeshBuilder<'a>,
    /// Water along coasts.
    pub water_shore: HexMeshBuilder<'a>,
    /// Where rivers flow into water.
    pub estuaries: HexMeshBuilder<'a>,
    /// Wall segments.
    pub walls: HexMeshBuilder<'a>,
    /// Decorations, bridges and wall towers.
    pub features: Vec<FeaturePlacement>,
}

impl<'a> ChunkGeometry<'a> {
    fn new(metrics: &'a HexMetrics) -> Self {
        let cell_data = MeshChannels {
            cell_data: true,
            ..default()
        };
        let cell_data_uv = MeshChannels {
            cell_data: true,
            uv: true,
            uv2: false,
        };
        Self {
            terrain: HexMeshBuilder::new(metrics, cell_data),
            rivers: HexMeshBuilder::new(metrics, cell_data_uv),
            roads: HexMeshBuilder::new(metrics, cell_data_uv),
            water: HexMeshBuilder::new(metrics, cell_data),
            water_shore: HexMeshBuilder::new(metrics, cell_data_uv),
            estuaries: HexMeshBuilder::new(
                metrics,
                MeshChannels {
                    cell_data: true,
                    uv: true,
                    uv2: true,
                },
            ),
            walls: HexMeshBuilder::new(metrics, MeshChannels::default()),
            features: Vec::new(),
        }
    }
}

/// Triangulates every cell of chunk `chunk`.
///
/// Returns empty geometry for an out-of-range chunk index.
pub fn triangulate_chunk(grid: &HexGrid, chunk: usize) -> ChunkGeometry<'_> {
    let mut triangulator = ChunkTriangulator {
        grid,
        metrics: grid.metrics(),
        geometry: ChunkGeometry::new(grid.metrics()),
    };
    if let Some(chunk) = grid.chunks().get(chunk) {
        for &i in chunk.cells() {
            triangulator.triangulate_cell(&grid.cells()[i]);
        }
    }
    triangulator.geometry
}

/// Cell data indices `[a, b, c]`.
fn cell_indices(a: &HexCell, b: &HexCell, c: &HexCell) -> [u32; 3] {
    [a.index() as u32, b.index() as u32, c.index() as u32]
}

/// Cell data indices for geometry owned by a single cell.
fn own_indices(cell: &HexCell) -> [u32; 3] {
    [cell.index() as u32; 3]
}

struct ChunkTriangulator<'a> {
    grid: &'a HexGrid,
    metrics: &'a HexMetrics,
    geometry: ChunkGeometry<'a>,
}

impl<'a> ChunkTriangulator<'a> {
    fn neighbor(&self, cell: &HexCell, d: HexDirection) -> Option<&'a HexCell> {
        let grid: &'a HexGrid = self.grid;
        grid.neighbor(cell.index(), d)
    }

    fn triangulate_cell(&mut self, cell: &HexCell) {
        for d in HexDirection::ALL {
            self.triangulate_direction(d, cell);
        }
        if !cell.is_underwater() {
            if !cell.has_river() && !cell.has_roads() {
                self.add_feature(cell, cell.position());
            }
            if cell.is_special() {
                self.add_special_feature(cell, cell.position());
            }
        }
    }

    fn triangulate_direction(&mut self, d: HexDirection, cell: &HexCell) {
        let center = cell.position();
        let mut e = EdgeVertices::new(
            center + metrics::first_solid_corner(d),
            center + metrics::second_solid_corner(d),
        );

        if cell.has_river() {
            if cell.has_river_through_edge(d) {
                e.v3.y = cell.stream_bed_y();
                if cell.has_river_begin_or_end() {
                    self.triangulate_with_river_begin_or_end(cell, center, e);
                } else {
                    self.triangulate_with_river(d, cell, center, e);
                }
            } else {
                self.triangulate_adjacent_to_river(d, cell, center, e);
            }
        } else {
            self.triangulate_without_river(d, cell, center, e);
            if !cell.is_underwater() && !cell.has_road_through_edge(d) {
                self.add_feature(cell, (center + e.v1 + e.v5) * (1.0 / 3.0));
            }
        }

        if matches!(d, HexDirection::NE | HexDirection::E | HexDirection::SE) {
            self.triangulate_connection(d, cell, e);
        }
        if cell.is_underwater() {
            self.triangulate_water(d, cell, center);
        }
    }

    fn triangulate_without_river(&mut self, d: HexDirection, cell: &HexCell, center: Vec3, e: EdgeVertices) {
        self.triangulate_edge_fan(center, &e, cell);
        if cell.has_roads() {
            let (left, right) = road_interpolators(d, cell);
            self.triangulate_road(
                center,
                center.lerp(e.v1, left),
                center.lerp(e.v5, right),
                &e,
                cell.has_road_through_edge(d),
                cell,
            );
        }
    }

    // ── Connections ────────────────────────────────────────────────

    fn triangulate_connection(&mut self, d: HexDirection, cell: &HexCell, e1: EdgeVertices) {
        let Some(neighbor) = self.neighbor(cell, d) else {
            return;
        };

        let mut bridge = metrics::bridge(d);
        bridge.y = neighbor.position().y - cell.position().y;
        let mut e2 = EdgeVertices::new(e1.v1 + bridge, e1.v5 + bridge);

        let has_river = cell.has_river_through_edge(d);
        let has_road = cell.has_road_through_edge(d);

        if has_river {
            e2.v3.y = neighbor.stream_bed_y();
            let indices = cell_indices(cell, neighbor, cell);
            if !cell.is_underwater() {
                if !neighbor.is_underwater() {
                    self.triangulate_river_quad_sloped(
                        [e1.v2, e1.v4, e2.v2, e2.v4],
                        cell.river_surface_y(),
                        neighbor.river_surface_y(),
                        0.8,
                        cell.incoming_river() == Some(d),
                        indices,
                    );
                } else if cell.elevation() > neighbor.water_level() {
                    self.triangulate_waterfall_in_water(
                        [e1.v2, e1.v4, e2.v2, e2.v4],
                        cell.river_surface_y(),
                        neighbor.river_surface_y(),
                        neighbor.water_surface_y(),
                        indices,
                    );
                }
            } else if !neighbor.is_underwater() && neighbor.elevation() > cell.water_level() {
                self.triangulate_waterfall_in_water(
                    [e2.v4, e2.v2, e1.v4, e1.v2],
                    neighbor.river_surface_y(),
                    cell.river_surface_y(),
                    cell.water_surface_y(),
                    indices,
                );
            }
        }

        if cell.edge_type_to(neighbor) == EdgeType::Slope {
            self.triangulate_edge_terraces(&e1, cell, &e2, neighbor, has_road);
        } else {
            self.triangulate_edge_strip(&e1, WEIGHTS_1, cell, &e2, WEIGHTS_2, neighbor, has_road);
        }

        self.add_edge_wall(&e1, cell, &e2, neighbor, has_river, has_road);

        if !matches!(d, HexDirection::NE | HexDirection::E) {
            return;
        }
        let Some(next) = self.neighbor(cell, d.next()) else {
            return;
        };
        let mut v5 = e1.v5 + metrics::bridge(d.next());
        v5.y = next.position().y;

        if cell.elevation() <= neighbor.elevation() {
            if cell.elevation() <= next.elevation() {
                self.triangulate_corner(e1.v5, cell, e2.v5, neighbor, v5, next);
            } else {
                self.triangulate_corner(v5, next, e1.v5, cell, e2.v5, neighbor);
            }
        } else if neighbor.elevation() <= next.elevation() {
            self.triangulate_corner(e2.v5, neighbor, v5, next, e1.v5, cell);
        } else {
            self.triangulate_corner(v5, next, e1.v5, cell, e2.v5, neighbor);
        }
    }

    fn triangulate_edge_terraces(
        &mut self,
        begin: &EdgeVertices,
        begin_cell: &HexCell,
        end: &EdgeVertices,
        end_cell: &HexCell,
        has_road: bool,
    ) {
        let mut e2 = EdgeVertices::terrace_lerp(begin, end, 1);
        let mut w2 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_2, 1);
        self.triangulate_edge_strip(begin, WEIGHTS_1, begin_cell, &e2, w2, end_cell, has_road);

        for step in 2..TERRACE_STEPS {
            let e1 = e2;
            let w1 = w2;
            e2 = EdgeVertices::terrace_lerp(begin, end, step);
            w2 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_2, step);
            self.triangulate_edge_strip(&e1, w1, begin_cell, &e2, w2, end_cell, has_road);
        }

        self.triangulate_edge_strip(&e2, w2, begin_cell, end, WEIGHTS_2, end_cell, has_road);
    }

    // ── Corners ────────────────────────────────────────────────────

    /// Fills the triangle between three cells; `bottom` is the lowest.
    fn triangulate_corner(
        &mut self,
        bottom: Vec3,
        bottom_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let left_edge = bottom_cell.edge_type_to(left_cell);
        let right_edge = bottom_cell.edge_type_to(right_cell);

        match (left_edge, right_edge) {
            (EdgeType::Slope, EdgeType::Slope) => {
                self.triangulate_corner_terraces(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            (EdgeType::Slope, EdgeType::Flat) => {
                self.triangulate_corner_terraces(left, left_cell, right, right_cell, bottom, bottom_cell);
            }
            (EdgeType::Slope, EdgeType::Cliff) => {
                self.triangulate_corner_terraces_cliff(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            (EdgeType::Flat, EdgeType::Slope) => {
                self.triangulate_corner_terraces(right, right_cell, bottom, bottom_cell, left, left_cell);
            }
            (EdgeType::Cliff, EdgeType::Slope) => {
                self.triangulate_corner_cliff_terraces(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            _ if left_cell.edge_type_to(right_cell) == EdgeType::Slope => {
                if left_cell.elevation() < right_cell.elevation() {
                    self.triangulate_corner_cliff_terraces(right, right_cell, bottom, bottom_cell, left, left_cell);
                } else {
                    self.triangulate_corner_terraces_cliff(left, left_cell, right, right_cell, bottom, bottom_cell);
                }
            }
            _ => {
                self.geometry.terrain.add_triangle(bottom, left, right);
                self.geometry.terrain.add_triangle_cell_data(
                    cell_indices(bottom_cell, left_cell, right_cell),
                    WEIGHTS_1,
                    WEIGHTS_2,
                    WEIGHTS_3,
                );
            }
        }

        self.add_corner_wall(bottom, bottom_cell, left, left_cell, right, right_cell);
    }

    fn triangulate_corner_terraces(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let indices = cell_indices(begin_cell, left_cell, right_cell);
        let terrain = &mut self.geometry.terrain;

        let mut v3 = metrics::terrace_lerp(begin, left, 1);
        let mut v4 = metrics::terrace_lerp(begin, right, 1);
        let mut w3 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_2, 1);
        let mut w4 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_3, 1);
        terrain.add_triangle(begin, v3, v4);
        terrain.add_triangle_cell_data(indices, WEIGHTS_1, w3, w4);

        for step in 2..TERRACE_STEPS {
            let (v1, v2, w1, w2) = (v3, v4, w3, w4);
            v3 = metrics::terrace_lerp(begin, left, step);
            v4 = metrics::terrace_lerp(begin, right, step);
            w3 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_2, step);
            w4 = metrics::terrace_lerp_weights(WEIGHTS_1, WEIGHTS_3, step);
            terrain.add_quad(v1, v2, v3, v4);
            terrain.add_quad_cell_data(indices, w1, w2, w3, w4);
        }

        terrain.add_quad(v3, v4, left, right);
        terrain.add_quad_cell_data(indices, w3, w4, WEIGHTS_2, WEIGHTS_3);
    }

    fn triangulate_corner_terraces_cliff(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let b = (1.0 / (right_cell.elevation() - begin_cell.elevation()) as f32).abs();
        let boundary = self.metrics.perturb(begin).lerp(self.metrics.perturb(right), b);
        let boundary_weights = WEIGHTS_1.lerp(WEIGHTS_3, b);
        let indices = cell_indices(begin_cell, left_cell, right_cell);

        self.triangulate_boundary_triangle(begin, WEIGHTS_1, left, WEIGHTS_2, boundary, boundary_weights, indices);
        self.close_cliff_corner(left, left_cell, right, right_cell, boundary, boundary_weights, indices);
    }

    fn triangulate_corner_cliff_terraces(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let b = (1.0 / (left_cell.elevation() - begin_cell.elevation()) as f32).abs();
        let boundary = self.metrics.perturb(begin).lerp(self.metrics.perturb(left), b);
        let boundary_weights = WEIGHTS_1.lerp(WEIGHTS_2, b);
        let indices = cell_indices(begin_cell, left_cell, right_cell);

        self.triangulate_boundary_triangle(right, WEIGHTS_3, begin, WEIGHTS_1, boundary, boundary_weights, indices);
        self.close_cliff_corner(left, left_cell, right, right_cell, boundary, boundary_weights, indices);
    }

    /// Closes the top of a terrace/cliff corner between `left` and `right`.
    #[allow(clippy::too_many_arguments)]
    fn close_cliff_corner(
        &mut self,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
        boundary: Vec3,
        boundary_weights: Vec3,
        indices: [u32; 3],
    ) {
        if left_cell.edge_type_to(right_cell) == EdgeType::Slope {
            self.triangulate_boundary_triangle(left, WEIGHTS_2, right, WEIGHTS_3, boundary, boundary_weights, indices);
        } else {
            let (l, r) = (self.metrics.perturb(left), self.metrics.perturb(right));
            self.geometry.terrain.add_triangle_unperturbed(l, r, boundary);
            self.geometry
                .terrain
                .add_triangle_cell_data(indices, WEIGHTS_2, WEIGHTS_3, boundary_weights);
        }
    }

    /// Terraced fan from `begin → left` collapsing onto `boundary`.
    #[allow(clippy::too_many_arguments)]
    fn triangulate_boundary_triangle(
        &mut self,
        begin: Vec3,
        begin_weights: Vec3,
        left: Vec3,
        left_weights: Vec3,
        boundary: Vec3,
        boundary_weights: Vec3,
        indices: [u32; 3],
    ) {
        let m = self.metrics;
        let terrain = &mut self.geometry.terrain;

        let mut v2 = m.perturb(metrics::terrace_lerp(begin, left, 1));
        let mut w2 = metrics::terrace_lerp_weights(begin_weights, left_weights, 1);
        terrain.add_triangle_unperturbed(m.perturb(begin), v2, boundary);
        terrain.add_triangle_cell_data(indices, begin_weights, w2, boundary_weights);

        for step in 2..TERRACE_STEPS {
            let (v1, w1) = (v2, w2);
            v2 = m.perturb(metrics::terrace_lerp(begin, left, step));
            w2 = metrics::terrace_lerp_weights(begin_weights, left_weights, step);
            terrain.add_triangle_unperturbed(v1, v2, boundary);
            terrain.add_triangle_cell_data(indices, w1, w2, boundary_weights);
        }

        terrain.add_triangle_unperturbed(v2, m.perturb(left), boundary);
        terrain.add_triangle_cell_data(indices, w2, left_weights, boundary_weights);
    }

    // ── Fans and strips ────────────────────────────────────────────

    fn triangulate_edge_fan(&mut self, center: Vec3, edge: &EdgeVertices, cell: &HexCell) {
        let terrain = &mut self.geometry.terrain;
        let indices = own_indices(cell);
        for (a, b) in [(edge.v1, edge.v2), (edge.v2, edge.v3), (edge.v3, edge.v4), (edge.v4, edge.v5)] {
            terrain.add_triangle(center, a, b);
            terrain.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn triangulate_edge_strip(
        &mut self,
        e1: &EdgeVertices,
        w1: Vec3,
        cell1: &HexCell,
        e2: &EdgeVertices,
        w2: Vec3,
        cell2: &HexCell,
        has_road: bool,
    ) {
        let indices = cell_indices(cell1, cell2, cell1);
        let terrain = &mut self.geometry.terrain;
        for (a1, b1, a2, b2) in [
            (e1.v1, e1.v2, e2.v1, e2.v2),
            (e1.v2, e1.v3, e2.v2, e2.v3),
            (e1.v3, e1.v4, e2.v3, e2.v4),
            (e1.v4, e1.v5, e2.v4, e2.v5),
        ] {
            terrain.add_quad(a1, b1, a2, b2);
            terrain.add_quad_cell_data_pair(indices, w1, w2);
        }

        if has_road {
            self.triangulate_road_segment(
                [e1.v2, e1.v3, e1.v4, e2.v2, e2.v3, e2.v4],
                w1,
                w2,
                indices,
            );
        }
    }
}

/// How far toward the outer edge corners the road fan of wedge `d` reaches.
fn road_interpolators(d: HexDirection, cell: &HexCell) -> (f32, f32) {
    if cell.has_road_through_edge(d) {
        (0.5, 0.5)
    } else {
        let side = |dir: HexDirection| if cell.has_road_through_edge(dir) { 0.5 } else { 0.25 };
        (side(d.previous()), side(d.next()))
    }
}
