//! Water surfaces: open water, shorelines and estuaries.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::mesh_builder::{WEIGHTS_1, WEIGHTS_2, WEIGHTS_3};
use crate::metrics::{self, INNER_DIAMETER};

use super::{ChunkTriangulator, EdgeVertices, cell_indices, own_indices};

impl ChunkTriangulator<'_> {
    /// Water wedge of an underwater cell.
    pub(super) fn triangulate_water(&mut self, d: HexDirection, cell: &HexCell, mut center: Vec3) {
        center.y = cell.water_surface_y();
        match self.neighbor(cell, d) {
            Some(neighbor) if !neighbor.is_underwater() => {
                self.triangulate_water_shore(d, cell, neighbor, center);
            }
            neighbor => self.triangulate_open_water(d, cell, neighbor, center),
        }
    }

    /// Center of `other` as seen from `cell`, shifted across the wrap seam.
    fn unwrapped_center(&self, cell: &HexCell, other: &HexCell) -> Vec3 {
        let mut center = other.position();
        if !self.metrics.wrapping() {
            return center;
        }
        let wrap_width = self.metrics.wrap_size() as f32 * INNER_DIAMETER;
        let dx = center.x - cell.position().x;
        if dx < -wrap_width * 0.5 {
            center.x += wrap_width;
        } else if dx > wrap_width * 0.5 {
            center.x -= wrap_width;
        }
        center
    }

    fn triangulate_open_water(
        &mut self,
        d: HexDirection,
        cell: &HexCell,
        neighbor: Option<&HexCell>,
        center: Vec3,
    ) {
        let c1 = center + metrics::first_water_corner(d);
        let c2 = center + metrics::second_water_corner(d);
        let mut indices = own_indices(cell);

        let water = &mut self.geometry.water;
        water.add_triangle(center, c1, c2);
        water.add_triangle_cell_data_uniform(indices, WEIGHTS_1);

        if !matches!(d, HexDirection::NE | HexDirection::E | HexDirection::SE) {
            return;
        }
        let Some(neighbor) = neighbor else {
            return;
        };
        let bridge = metrics::water_bridge(d);
        let e1 = c1 + bridge;
        let e2 = c2 + bridge;
        indices[1] = neighbor.index() as u32;
        water.add_quad(c1, c2, e1, e2);
        water.add_quad_cell_data_pair(indices, WEIGHTS_1, WEIGHTS_2);

        if !matches!(d, HexDirection::NE | HexDirection::E) {
            return;
        }
        let Some(next) = self.neighbor(cell, d.next()) else {
            return;
        };
        if !next.is_underwater() {
            return;
        }
        indices[2] = next.index() as u32;
        let water = &mut self.geometry.water;
        water.add_triangle(c2, e2, c2 + metrics::water_bridge(d.next()));
        water.add_triangle_cell_data(indices, WEIGHTS_1, WEIGHTS_2, WEIGHTS_3);
    }

    fn triangulate_water_shore(&mut self, d: HexDirection, cell: &HexCell, neighbor: &HexCell, center: Vec3) {
        let e1 = EdgeVertices::new(
            center + metrics::first_water_corner(d),
            center + metrics::second_water_corner(d),
        );
        let mut indices = cell_indices(cell, neighbor, cell);

        let water = &mut self.geometry.water;
        for (a, b) in [(e1.v1, e1.v2), (e1.v2, e1.v3), (e1.v3, e1.v4), (e1.v4, e1.v5)] {
            water.add_triangle(center, a, b);
            water.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
        }

        let mut center2 = self.unwrapped_center(cell, neighbor);
        center2.y = center.y;
        let e2 = EdgeVertices::new(
            center2 + metrics::second_solid_corner(d.opposite()),
            center2 + metrics::first_solid_corner(d.opposite()),
        );

        if cell.has_river_through_edge(d) {
            self.triangulate_estuary(&e1, &e2, cell.incoming_river() == Some(d), indices);
        } else {
            let shore = &mut self.geometry.water_shore;
            for (a1, b1, a2, b2) in [
                (e1.v1, e1.v2, e2.v1, e2.v2),
                (e1.v2, e1.v3, e2.v2, e2.v3),
                (e1.v3, e1.v4, e2.v3, e2.v4),
                (e1.v4, e1.v5, e2.v4, e2.v5),
            ] {
                shore.add_quad(a1, b1, a2, b2);
                shore.add_quad_uv_range(0.0, 0.0, 0.0, 1.0);
                shore.add_quad_cell_data_pair(indices, WEIGHTS_1, WEIGHTS_2);
            }
        }

        let Some(next) = self.neighbor(cell, d.next()) else {
            return;
        };
        let mut center3 = self.unwrapped_center(cell, next);
        let corner = if next.is_underwater() {
            metrics::first_water_corner(d.previous())
        } else {
            metrics::first_solid_corner(d.previous())
        };
        center3.y = center.y;
        let v3 = center3 + corner;

        indices[2] = next.index() as u32;
        let shore = &mut self.geometry.water_shore;
        shore.add_triangle(e1.v5, e2.v5, v3);
        shore.add_triangle_uv(
            Vec2::ZERO,
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, if next.is_underwater() { 0.0 } else { 1.0 }),
        );
        shore.add_triangle_cell_data(indices, WEIGHTS_1, WEIGHTS_2, WEIGHTS_3);
    }

    /// River mouth blending into the shore; UV2 carries the river flow.
    fn triangulate_estuary(&mut self, e1: &EdgeVertices, e2: &EdgeVertices, incoming_river: bool, indices: [u32; 3]) {
        let shore = &mut self.geometry.water_shore;
        shore.add_triangle(e2.v1, e1.v2, e1.v1);
        shore.add_triangle(e2.v5, e1.v5, e1.v4);
        shore.add_triangle_uv(Vec2::new(0.0, 1.0), Vec2::ZERO, Vec2::ZERO);
        shore.add_triangle_uv(Vec2::new(0.0, 1.0), Vec2::ZERO, Vec2::ZERO);
        shore.add_triangle_cell_data(indices, WEIGHTS_2, WEIGHTS_1, WEIGHTS_1);
        shore.add_triangle_cell_data(indices, WEIGHTS_2, WEIGHTS_1, WEIGHTS_1);

        let estuaries = &mut self.geometry.estuaries;
        estuaries.add_quad(e2.v1, e1.v2, e2.v2, e1.v3);
        estuaries.add_triangle(e1.v3, e2.v2, e2.v4);
        estuaries.add_quad(e1.v3, e1.v4, e2.v4, e2.v5);

        estuaries.add_quad_uv(Vec2::new(0.0, 1.0), Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::ZERO);
        estuaries.add_triangle_uv(Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        estuaries.add_quad_uv(Vec2::ZERO, Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0));

        estuaries.add_quad_cell_data(indices, WEIGHTS_2, WEIGHTS_1, WEIGHTS_2, WEIGHTS_1);
        estuaries.add_triangle_cell_data(indices, WEIGHTS_1, WEIGHTS_2, WEIGHTS_2);
        estuaries.add_quad_cell_data_pair(indices, WEIGHTS_1, WEIGHTS_2);

        if incoming_river {
            estuaries.add_quad_uv2(
                Vec2::new(1.5, 1.0),
                Vec2::new(0.7, 1.15),
                Vec2::new(1.0, 0.8),
                Vec2::new(0.5, 1.1),
            );
            estuaries.add_triangle_uv2(Vec2::new(0.5, 1.1), Vec2::new(1.0, 0.8), Vec2::new(0.0, 0.8));
            estuaries.add_quad_uv2(
                Vec2::new(0.5, 1.1),
                Vec2::new(0.3, 1.15),
                Vec2::new(0.0, 0.8),
                Vec2::new(-0.5, 1.0),
            );
        } else {
            estuaries.add_quad_uv2(
                Vec2::new(-0.5, -0.2),
                Vec2::new(0.3, -0.35),
                Vec2::ZERO,
                Vec2::new(0.5, -0.3),
            );
            estuaries.add_triangle_uv2(Vec2::new(0.5, -0.3), Vec2::ZERO, Vec2::new(1.0, 0.0));
            estuaries.add_quad_uv2(
                Vec2::new(0.5, -0.3),
                Vec2::new(0.7, -0.35),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.5, -0.2),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinates::HexDirection;
    use crate::grid::tests::grid;
    use crate::grid::HexGrid;
    use crate::triangulator::triangulate_chunk;

    fn flooded(x: usize, z: usize) -> HexGrid {
        let mut g = grid(x, z);
        for i in 0..g.cells().len() {
            g.set_water_level(i, 1);
        }
        g
    }

    // ── open water ──────────────────────────────────────────────────

    #[test]
    fn sea_is_open_water_without_shore() {
        let g = flooded(10, 10);
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.water.is_empty());
        assert!(geometry.water_shore.is_empty());
        let y = g.cells()[0].water_surface_y();
        assert!(geometry.water.vertices().iter().all(|v| (v.y - y).abs() < 1e-5));
    }

    // ── shore ───────────────────────────────────────────────────────

    #[test]
    fn island_gets_a_shoreline() {
        let mut g = flooded(10, 10);
        let island = g.cell_index_at_offset(2, 2).unwrap();
        g.set_elevation(island, 2);
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.water_shore.is_empty());
        assert_eq!(geometry.water_shore.uvs().len(), geometry.water_shore.vertices().len());
        assert!(geometry.estuaries.is_empty());
    }

    #[test]
    fn river_into_sea_forms_estuary() {
        let mut g = flooded(10, 10);
        let a = g.cell_index_at_offset(1, 2).unwrap();
        g.set_elevation(a, 1);
        g.set_outgoing_river(a, HexDirection::E);
        assert!(g.cells()[a].has_outgoing_river());
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.estuaries.is_empty());
        assert_eq!(geometry.estuaries.uv2s().len(), geometry.estuaries.vertices().len());
    }

    #[test]
    fn wrapped_shore_stays_local() {
        // A coast on the seam must not stretch across the whole map.
        let mut g = grid(10, 10);
        assert!(g.create_map(10, 10, true));
        for i in 0..g.cells().len() {
            g.set_water_level(i, 1);
        }
        let coast = g.cell_index_at_offset(9, 2).unwrap();
        g.set_elevation(coast, 2);
        let chunk = g.cells()[g.cell_index_at_offset(0, 2).unwrap()].chunk();
        let geometry = triangulate_chunk(&g, chunk);
        let width = crate::metrics::INNER_DIAMETER * 2.0;
        let v = geometry.water_shore.vertices();
        for tri in geometry.water_shore.triangles().chunks_exact(3) {
            let xs = [v[tri[0] as usize].x, v[tri[1] as usize].x, v[tri[2] as usize].x];
            let span = xs.iter().copied().fold(f32::MIN, f32::max) - xs.iter().copied().fold(f32::MAX, f32::min);
            assert!(span < width, "span {span}");
        }
    }
}
