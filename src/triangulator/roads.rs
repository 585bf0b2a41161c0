//! Road surfaces, including roads that have to dodge rivers.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::mesh_builder::WEIGHTS_1;
use crate::metrics::{self, INNER_TO_OUTER};

use super::{ChunkTriangulator, EdgeVertices, own_indices, road_interpolators};

impl ChunkTriangulator<'_> {
    /// Road fan of one wedge; a full segment when the road leaves through the edge.
    pub(super) fn triangulate_road(
        &mut self,
        center: Vec3,
        m_l: Vec3,
        m_r: Vec3,
        e: &EdgeVertices,
        has_road_through_edge: bool,
        cell: &HexCell,
    ) {
        if !has_road_through_edge {
            self.triangulate_road_edge(center, m_l, m_r, cell);
            return;
        }

        let indices = own_indices(cell);
        let m_c = m_l.lerp(m_r, 0.5);
        self.triangulate_road_segment([m_l, m_c, m_r, e.v2, e.v3, e.v4], WEIGHTS_1, WEIGHTS_1, indices);

        let roads = &mut self.geometry.roads;
        roads.add_triangle(center, m_l, m_c);
        roads.add_triangle(center, m_c, m_r);
        roads.add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::ZERO, Vec2::new(1.0, 0.0));
        roads.add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0), Vec2::ZERO);
        roads.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
        roads.add_triangle_cell_data_uniform(indices, WEIGHTS_1);
    }

    /// Rounded road end inside a cell.
    pub(super) fn triangulate_road_edge(&mut self, center: Vec3, m_l: Vec3, m_r: Vec3, cell: &HexCell) {
        let roads = &mut self.geometry.roads;
        roads.add_triangle(center, m_l, m_r);
        roads.add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::ZERO, Vec2::ZERO);
        roads.add_triangle_cell_data_uniform(own_indices(cell), WEIGHTS_1);
    }

    /// Two quads across a strip: `v[0..3]` on the near side, `v[3..6]` on the far side.
    pub(super) fn triangulate_road_segment(&mut self, v: [Vec3; 6], w1: Vec3, w2: Vec3, indices: [u32; 3]) {
        let roads = &mut self.geometry.roads;
        roads.add_quad(v[0], v[1], v[3], v[4]);
        roads.add_quad(v[1], v[2], v[4], v[5]);
        roads.add_quad_uv_range(0.0, 1.0, 0.0, 0.0);
        roads.add_quad_uv_range(1.0, 0.0, 0.0, 0.0);
        roads.add_quad_cell_data_pair(indices, w1, w2);
        roads.add_quad_cell_data_pair(indices, w1, w2);
    }

    /// Road in a wedge that shares the cell with a river.
    ///
    /// The road center is pushed away from the river; where a straight river
    /// splits the cell, a bridge joins the two halves.
    pub(super) fn triangulate_road_adjacent_to_river(
        &mut self,
        d: HexDirection,
        cell: &HexCell,
        mut center: Vec3,
        e: &EdgeVertices,
    ) {
        let has_road_through_edge = cell.has_road_through_edge(d);
        let previous_has_river = cell.has_river_through_edge(d.previous());
        let next_has_river = cell.has_river_through_edge(d.next());
        let (left, right) = road_interpolators(d, cell);
        let mut road_center = center;

        if let Some(river_end) = cell.river_begin_or_end_direction() {
            road_center += metrics::solid_edge_middle(river_end.opposite()) * (1.0 / 3.0);
        } else if let (Some(incoming), Some(outgoing)) = (cell.incoming_river(), cell.outgoing_river()) {
            if incoming == outgoing.opposite() {
                let corner = if previous_has_river {
                    if !has_road_through_edge && !cell.has_road_through_edge(d.next()) {
                        return;
                    }
                    metrics::second_solid_corner(d)
                } else {
                    if !has_road_through_edge && !cell.has_road_through_edge(d.previous()) {
                        return;
                    }
                    metrics::first_solid_corner(d)
                };
                road_center += corner * 0.5;
                if incoming == d.next()
                    && (cell.has_road_through_edge(d.next2()) || cell.has_road_through_edge(d.opposite()))
                {
                    self.add_bridge(road_center, center - corner * 0.5);
                }
                center += corner * 0.25;
            } else if incoming == outgoing.previous() {
                road_center -= metrics::second_corner(incoming) * 0.2;
            } else if incoming == outgoing.next() {
                road_center -= metrics::first_corner(incoming) * 0.2;
            } else if previous_has_river && next_has_river {
                if !has_road_through_edge {
                    return;
                }
                let offset = metrics::solid_edge_middle(d) * INNER_TO_OUTER;
                road_center += offset * 0.7;
                center += offset * 0.5;
            } else {
                let middle = if previous_has_river {
                    d.next()
                } else if next_has_river {
                    d.previous()
                } else {
                    d
                };
                if !cell.has_road_through_edge(middle)
                    && !cell.has_road_through_edge(middle.previous())
                    && !cell.has_road_through_edge(middle.next())
                {
                    return;
                }
                let offset = metrics::solid_edge_middle(middle);
                road_center += offset * 0.25;
                if d == middle && cell.has_road_through_edge(d.opposite()) {
                    self.add_bridge(road_center, center - offset * (INNER_TO_OUTER * 0.7));
                }
            }
        }

        let m_l = road_center.lerp(e.v1, left);
        let m_r = road_center.lerp(e.v5, right);
        self.triangulate_road(road_center, m_l, m_r, e, has_road_through_edge, cell);
        if previous_has_river {
            self.triangulate_road_edge(road_center, center, m_l, cell);
        }
        if next_has_river {
            self.triangulate_road_edge(road_center, m_r, center, cell);
        }
    }
}
