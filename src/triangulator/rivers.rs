//! River channels carved into the terrain and their water surfaces.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::mesh_builder::{WEIGHTS_1, WEIGHTS_2};
use crate::metrics::{self, INNER_TO_OUTER};

use super::{ChunkTriangulator, EdgeVertices, own_indices};

impl ChunkTriangulator<'_> {
    /// Wedge of a cell where a river starts or ends.
    pub(super) fn triangulate_with_river_begin_or_end(&mut self, cell: &HexCell, center: Vec3, e: EdgeVertices) {
        let mut m = EdgeVertices::new(center.lerp(e.v1, 0.5), center.lerp(e.v5, 0.5));
        m.v3.y = e.v3.y;

        self.triangulate_edge_strip(&m, WEIGHTS_1, cell, &e, WEIGHTS_1, cell, false);
        self.triangulate_edge_fan(center, &m, cell);

        if cell.is_underwater() {
            return;
        }
        let reversed = cell.has_incoming_river();
        let indices = own_indices(cell);
        let y = cell.river_surface_y();
        self.triangulate_river_quad([m.v2, m.v4, e.v2, e.v4], y, 0.6, reversed, indices);

        let rivers = &mut self.geometry.rivers;
        let with_y = |v: Vec3| Vec3::new(v.x, y, v.z);
        rivers.add_triangle(with_y(center), with_y(m.v2), with_y(m.v4));
        if reversed {
            rivers.add_triangle_uv(Vec2::new(0.5, 0.4), Vec2::new(1.0, 0.2), Vec2::new(0.0, 0.2));
        } else {
            rivers.add_triangle_uv(Vec2::new(0.5, 0.4), Vec2::new(0.0, 0.6), Vec2::new(1.0, 0.6));
        }
        rivers.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
    }

    /// Wedge of a cell that a river flows through.
    ///
    /// The center is stretched into a line so the channel can run across the
    /// cell; its shape depends on where the other river edge is.
    pub(super) fn triangulate_with_river(&mut self, d: HexDirection, cell: &HexCell, center: Vec3, e: EdgeVertices) {
        let (center_l, center_r) = if cell.has_river_through_edge(d.opposite()) {
            (
                center + metrics::first_solid_corner(d.previous()) * 0.25,
                center + metrics::second_solid_corner(d.next()) * 0.25,
            )
        } else if cell.has_river_through_edge(d.next()) {
            (center, center.lerp(e.v5, 2.0 / 3.0))
        } else if cell.has_river_through_edge(d.previous()) {
            (center.lerp(e.v1, 2.0 / 3.0), center)
        } else if cell.has_river_through_edge(d.next2()) {
            (
                center,
                center + metrics::solid_edge_middle(d.next()) * (0.5 * INNER_TO_OUTER),
            )
        } else {
            (
                center + metrics::solid_edge_middle(d.previous()) * (0.5 * INNER_TO_OUTER),
                center,
            )
        };
        let mut center = center_l.lerp(center_r, 0.5);

        let mut m = EdgeVertices::with_outer_step(
            center_l.lerp(e.v1, 0.5),
            center_r.lerp(e.v5, 0.5),
            1.0 / 6.0,
        );
        m.v3.y = e.v3.y;
        center.y = e.v3.y;

        self.triangulate_edge_strip(&m, WEIGHTS_1, cell, &e, WEIGHTS_1, cell, false);

        let indices = own_indices(cell);
        let terrain = &mut self.geometry.terrain;
        terrain.add_triangle(center_l, m.v1, m.v2);
        terrain.add_quad(center_l, center, m.v2, m.v3);
        terrain.add_quad(center, center_r, m.v3, m.v4);
        terrain.add_triangle(center_r, m.v4, m.v5);
        terrain.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
        terrain.add_quad_cell_data_uniform(indices, WEIGHTS_1);
        terrain.add_quad_cell_data_uniform(indices, WEIGHTS_1);
        terrain.add_triangle_cell_data_uniform(indices, WEIGHTS_1);

        if !cell.is_underwater() {
            let reversed = cell.incoming_river() == Some(d);
            let y = cell.river_surface_y();
            self.triangulate_river_quad([center_l, center_r, m.v2, m.v4], y, 0.4, reversed, indices);
            self.triangulate_river_quad([m.v2, m.v4, e.v2, e.v4], y, 0.6, reversed, indices);
        }
    }

    /// Wedge of a cell with a river that does not cross this edge.
    pub(super) fn triangulate_adjacent_to_river(
        &mut self,
        d: HexDirection,
        cell: &HexCell,
        mut center: Vec3,
        e: EdgeVertices,
    ) {
        if cell.has_roads() {
            self.triangulate_road_adjacent_to_river(d, cell, center, &e);
        }

        if cell.has_river_through_edge(d.next()) {
            if cell.has_river_through_edge(d.previous()) {
                center += metrics::solid_edge_middle(d) * (INNER_TO_OUTER * 0.5);
            } else if cell.has_river_through_edge(d.previous2()) {
                center += metrics::first_solid_corner(d) * 0.25;
            }
        } else if cell.has_river_through_edge(d.previous()) && cell.has_river_through_edge(d.next2()) {
            center += metrics::second_solid_corner(d) * 0.25;
        }

        let m = EdgeVertices::new(center.lerp(e.v1, 0.5), center.lerp(e.v5, 0.5));
        self.triangulate_edge_strip(&m, WEIGHTS_1, cell, &e, WEIGHTS_1, cell, false);
        self.triangulate_edge_fan(center, &m, cell);

        if !cell.is_underwater() && !cell.has_road_through_edge(d) {
            self.add_feature(cell, (center + e.v1 + e.v5) * (1.0 / 3.0));
        }
    }

    /// Level river surface quad.
    pub(super) fn triangulate_river_quad(&mut self, v: [Vec3; 4], y: f32, v_coord: f32, reversed: bool, indices: [u32; 3]) {
        self.triangulate_river_quad_sloped(v, y, y, v_coord, reversed, indices);
    }

    /// River surface quad from height `y1` on the near side to `y2` on the far side.
    ///
    /// `v_coord` places the quad along the flow texture; reversed rivers flip
    /// both texture axes.
    pub(super) fn triangulate_river_quad_sloped(
        &mut self,
        v: [Vec3; 4],
        y1: f32,
        y2: f32,
        v_coord: f32,
        reversed: bool,
        indices: [u32; 3],
    ) {
        let [mut v1, mut v2, mut v3, mut v4] = v;
        v1.y = y1;
        v2.y = y1;
        v3.y = y2;
        v4.y = y2;

        let rivers = &mut self.geometry.rivers;
        rivers.add_quad(v1, v2, v3, v4);
        if reversed {
            rivers.add_quad_uv_range(1.0, 0.0, 0.8 - v_coord, 0.6 - v_coord);
        } else {
            rivers.add_quad_uv_range(0.0, 1.0, v_coord, v_coord + 0.2);
        }
        rivers.add_quad_cell_data_pair(indices, WEIGHTS_1, WEIGHTS_2);
    }

    /// River falling from height `y1` into water at `water_y`.
    ///
    /// The quad is cut off where it meets the water surface.
    pub(super) fn triangulate_waterfall_in_water(
        &mut self,
        v: [Vec3; 4],
        y1: f32,
        y2: f32,
        water_y: f32,
        indices: [u32; 3],
    ) {
        let [mut v1, mut v2, mut v3, mut v4] = v;
        v1.y = y1;
        v2.y = y1;
        v3.y = y2;
        v4.y = y2;
        let m = self.metrics;
        let (v1, v2) = (m.perturb(v1), m.perturb(v2));
        let (v3, v4) = (m.perturb(v3), m.perturb(v4));

        let t = (water_y - y2) / (y1 - y2);
        let v3 = v3.lerp(v1, t);
        let v4 = v4.lerp(v2, t);

        let rivers = &mut self.geometry.rivers;
        rivers.add_quad_unperturbed(v1, v2, v3, v4);
        rivers.add_quad_uv_range(0.0, 1.0, 0.8, 1.0);
        rivers.add_quad_cell_data_pair(indices, WEIGHTS_1, WEIGHTS_2);
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::coordinates::HexDirection;
    use crate::grid::HexGrid;
    use crate::grid::tests::grid;
    use crate::triangulator::{ChunkGeometry, ChunkTriangulator, triangulate_chunk};

    fn river_grid() -> (HexGrid, usize, usize) {
        let mut g = grid(10, 10);
        let a = g.cell_index_at_offset(1, 2).unwrap();
        let b = g.cells()[a].neighbor(HexDirection::E).unwrap();
        g.set_elevation(a, 1);
        g.set_outgoing_river(a, HexDirection::E);
        (g, a, b)
    }

    // ── channels ────────────────────────────────────────────────────

    #[test]
    fn river_produces_surface_and_channel() {
        let (g, a, _) = river_grid();
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.rivers.is_empty());
        assert_eq!(geometry.rivers.uvs().len(), geometry.rivers.vertices().len());

        // Some terrain vertex dips to the stream bed of the source cell.
        let bed = g.cells()[a].stream_bed_y();
        assert!(
            geometry
                .terrain
                .vertices()
                .iter()
                .any(|v| (v.y - bed).abs() < 1e-4)
        );
    }

    #[test]
    fn river_surface_sits_below_the_banks() {
        let (g, a, b) = river_grid();
        let geometry = triangulate_chunk(&g, 0);
        let top = g.cells()[a].river_surface_y().max(g.cells()[b].river_surface_y());
        for v in geometry.rivers.vertices() {
            assert!(v.y <= top + 1e-4, "{v:?}");
        }
    }

    #[test]
    fn reversed_river_flips_uvs() {
        let g = grid(10, 10);
        let quad = [Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)];
        let mut t = ChunkTriangulator {
            grid: &g,
            metrics: g.metrics(),
            geometry: ChunkGeometry::new(g.metrics()),
        };
        t.triangulate_river_quad(quad, 0.0, 0.6, false, [0; 3]);
        t.triangulate_river_quad(quad, 0.0, 0.6, true, [0; 3]);

        let uvs = t.geometry.rivers.uvs();
        let expected = [
            Vec2::new(0.0, 0.6),
            Vec2::new(1.0, 0.6),
            Vec2::new(0.0, 0.8),
            Vec2::new(1.0, 0.8),
            Vec2::new(1.0, 0.2),
            Vec2::new(0.0, 0.2),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];
        for (uv, e) in uvs.iter().zip(expected) {
            assert!((*uv - e).length() < 1e-5, "{uv:?} vs {e:?}");
        }
    }

    #[test]
    fn waterfall_into_lake() {
        let mut g = grid(10, 10);
        let a = g.cell_index_at_offset(1, 2).unwrap();
        let b = g.cells()[a].neighbor(HexDirection::E).unwrap();
        g.set_elevation(a, 3);
        g.set_water_level(b, 1);
        g.set_outgoing_river(a, HexDirection::E);
        assert!(g.cells()[b].is_underwater());
        let geometry = triangulate_chunk(&g, 0);
        let water_y = g.cells()[b].water_surface_y();
        let lowest = geometry
            .rivers
            .vertices()
            .iter()
            .map(|v| v.y)
            .fold(f32::MAX, f32::min);
        assert!((lowest - water_y).abs() < 1e-3, "{lowest} vs {water_y}");
    }
}
