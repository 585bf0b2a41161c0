//! Feature placements and wall geometry.
//!
//! Placements are plain data; whatever renders a chunk decides what mesh
//! each [`FeatureKind`] becomes.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::math;
use crate::metrics::{self, BRIDGE_DESIGN_LENGTH, EdgeType, WALL_HEIGHT, WALL_TOWER_THRESHOLD};

use super::{ChunkTriangulator, EdgeVertices};

/// What a [`FeaturePlacement`] stands for.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub enum FeatureKind {
    /// Building; `size` 0 is the largest tier.
    Urban {
        /// Size tier.
        size: u8,
    },
    /// Field; `size` 0 is the largest tier.
    Farm {
        /// Size tier.
        size: u8,
    },
    /// Tree or bush; `size` 0 is the largest tier.
    Plant {
        /// Size tier.
        size: u8,
    },
    /// Landmark occupying a whole cell.
    Special {
        /// Landmark index, starting at 1.
        index: u8,
    },
    /// Bridge over a river, stretched along its local Z axis.
    Bridge {
        /// Scale relative to the design length.
        length: f32,
    },
    /// Tower standing on a wall; its local X axis runs along the wall.
    WallTower,
}

/// One feature instance: what, where and how it is turned.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct FeaturePlacement {
    /// Kind and size.
    pub kind: FeatureKind,
    /// Ground position, already perturbed.
    pub position: Vec3,
    /// Rotation about the Y axis.
    pub rotation: Quat,
    /// Variant roll in `[0, 1)` for picking among same-size prefabs.
    pub choice: f32,
}

/// Size tier for `level` given the feature roll `hash`, if any.
fn pick_size(level: u8, hash: f32) -> Option<u8> {
    if level == 0 {
        return None;
    }
    metrics::feature_thresholds(level)
        .iter()
        .position(|&threshold| hash < threshold)
        .map(|i| i as u8)
}

impl ChunkTriangulator<'_> {
    /// Places the urban, farm or plant feature that wins the hash roll at `position`.
    pub(super) fn add_feature(&mut self, cell: &HexCell, position: Vec3) {
        if cell.is_special() {
            return;
        }
        let hash = self.metrics.sample_hash_grid(position);

        let mut pick = pick_size(cell.urban_level(), hash.a).map(|size| (FeatureKind::Urban { size }, hash.a));
        if let Some(size) = pick_size(cell.farm_level(), hash.b)
            && pick.is_none_or(|(_, used)| hash.b < used)
        {
            pick = Some((FeatureKind::Farm { size }, hash.b));
        }
        if let Some(size) = pick_size(cell.plant_level(), hash.c)
            && pick.is_none_or(|(_, used)| hash.c < used)
        {
            pick = Some((FeatureKind::Plant { size }, hash.c));
        }
        let Some((kind, _)) = pick else {
            return;
        };

        self.geometry.features.push(FeaturePlacement {
            kind,
            position: self.metrics.perturb(position),
            rotation: Quat::from_rotation_y((360.0 * hash.e).to_radians()),
            choice: hash.d,
        });
    }

    /// Places the landmark of a special cell at its center.
    pub(super) fn add_special_feature(&mut self, cell: &HexCell, position: Vec3) {
        let hash = self.metrics.sample_hash_grid(position);
        self.geometry.features.push(FeaturePlacement {
            kind: FeatureKind::Special {
                index: cell.special_index(),
            },
            position: self.metrics.perturb(position),
            rotation: Quat::from_rotation_y((360.0 * hash.e).to_radians()),
            choice: 0.0,
        });
    }

    /// Spans a bridge between two road centers on either side of a river.
    pub(super) fn add_bridge(&mut self, road_center1: Vec3, road_center2: Vec3) {
        let a = self.metrics.perturb(road_center1);
        let b = self.metrics.perturb(road_center2);
        let yaw = math::yaw_degrees(b - a).unwrap_or(0.0);
        self.geometry.features.push(FeaturePlacement {
            kind: FeatureKind::Bridge {
                length: a.distance(b) / BRIDGE_DESIGN_LENGTH,
            },
            position: (a + b) * 0.5,
            rotation: Quat::from_rotation_y(yaw.to_radians()),
            choice: 0.0,
        });
    }

    /// Tower midway between two perturbed wall points.
    fn add_tower(&mut self, left: Vec3, right: Vec3) {
        let along = right - left;
        self.geometry.features.push(FeaturePlacement {
            kind: FeatureKind::WallTower,
            position: (left + right) * 0.5,
            rotation: Quat::from_rotation_y((-along.z).atan2(along.x)),
            choice: 0.0,
        });
    }

    // ── Walls ───────────────────────────────────────────────────────

    /// Wall along the strip between two cells when exactly one of them is walled.
    ///
    /// Rivers and roads leave a gap in the middle, closed off with caps.
    pub(super) fn add_edge_wall(
        &mut self,
        near: &EdgeVertices,
        near_cell: &HexCell,
        far: &EdgeVertices,
        far_cell: &HexCell,
        has_river: bool,
        has_road: bool,
    ) {
        if near_cell.walled() == far_cell.walled()
            || near_cell.is_underwater()
            || far_cell.is_underwater()
            || near_cell.edge_type_to(far_cell) == EdgeType::Cliff
        {
            return;
        }

        self.add_wall_segment(near.v1, far.v1, near.v2, far.v2, false);
        if has_river || has_road {
            self.add_wall_cap(near.v2, far.v2);
            self.add_wall_cap(far.v4, near.v4);
        } else {
            self.add_wall_segment(near.v2, far.v2, near.v3, far.v3, false);
            self.add_wall_segment(near.v3, far.v3, near.v4, far.v4, false);
        }
        self.add_wall_segment(near.v4, far.v4, near.v5, far.v5, false);
    }

    /// Wall through the corner where three cells meet.
    ///
    /// The odd one out, walled or not, becomes the pivot the wall turns around.
    pub(super) fn add_corner_wall(
        &mut self,
        c1: Vec3,
        cell1: &HexCell,
        c2: Vec3,
        cell2: &HexCell,
        c3: Vec3,
        cell3: &HexCell,
    ) {
        match (cell1.walled(), cell2.walled(), cell3.walled()) {
            (true, true, false) | (false, false, true) => {
                self.add_pivot_wall_segment(c3, cell3, c1, cell1, c2, cell2);
            }
            (true, false, true) | (false, true, false) => {
                self.add_pivot_wall_segment(c2, cell2, c3, cell3, c1, cell1);
            }
            (true, false, false) | (false, true, true) => {
                self.add_pivot_wall_segment(c1, cell1, c2, cell2, c3, cell3);
            }
            _ => {}
        }
    }

    fn add_pivot_wall_segment(
        &mut self,
        pivot: Vec3,
        pivot_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        if pivot_cell.is_underwater() {
            return;
        }
        let has_left_wall = !left_cell.is_underwater() && pivot_cell.edge_type_to(left_cell) != EdgeType::Cliff;
        let has_right_wall = !right_cell.is_underwater() && pivot_cell.edge_type_to(right_cell) != EdgeType::Cliff;

        if has_left_wall {
            if has_right_wall {
                let has_tower = left_cell.elevation() == right_cell.elevation()
                    && self.metrics.sample_hash_grid((pivot + left + right) * (1.0 / 3.0)).e
                        < WALL_TOWER_THRESHOLD;
                self.add_wall_segment(pivot, left, pivot, right, has_tower);
            } else if left_cell.elevation() < right_cell.elevation() {
                self.add_wall_wedge(pivot, left, right);
            } else {
                self.add_wall_cap(pivot, left);
            }
        } else if has_right_wall {
            if right_cell.elevation() < left_cell.elevation() {
                self.add_wall_wedge(right, pivot, left);
            } else {
                self.add_wall_cap(right, pivot);
            }
        }
    }

    /// Wall piece between the left and right cross-sections: two sides and a top.
    fn add_wall_segment(&mut self, near_left: Vec3, far_left: Vec3, near_right: Vec3, far_right: Vec3, tower: bool) {
        let m = self.metrics;
        let (near_left, far_left) = (m.perturb(near_left), m.perturb(far_left));
        let (near_right, far_right) = (m.perturb(near_right), m.perturb(far_right));

        let left = metrics::wall_lerp(near_left, far_left);
        let right = metrics::wall_lerp(near_right, far_right);
        let left_offset = metrics::wall_thickness_offset(near_left, far_left);
        let right_offset = metrics::wall_thickness_offset(near_right, far_right);
        let left_top = left.y + WALL_HEIGHT;
        let right_top = right.y + WALL_HEIGHT;

        let (v1, v2) = (left - left_offset, right - right_offset);
        let t1 = Vec3::new(v1.x, left_top, v1.z);
        let t2 = Vec3::new(v2.x, right_top, v2.z);
        let walls = &mut self.geometry.walls;
        walls.add_quad_unperturbed(v1, v2, t1, t2);

        let (v1, v2) = (left + left_offset, right + right_offset);
        let v3 = Vec3::new(v1.x, left_top, v1.z);
        let v4 = Vec3::new(v2.x, right_top, v2.z);
        walls.add_quad_unperturbed(v2, v1, v4, v3);
        walls.add_quad_unperturbed(t1, t2, v3, v4);

        if tower {
            self.add_tower(left, right);
        }
    }

    /// Flat end of a wall.
    fn add_wall_cap(&mut self, near: Vec3, far: Vec3) {
        let near = self.metrics.perturb(near);
        let far = self.metrics.perturb(far);
        let center = metrics::wall_lerp(near, far);
        let thickness = metrics::wall_thickness_offset(near, far);
        let top = center.y + WALL_HEIGHT;

        let v1 = center - thickness;
        let v2 = center + thickness;
        self.geometry.walls.add_quad_unperturbed(
            v1,
            v2,
            Vec3::new(v1.x, top, v1.z),
            Vec3::new(v2.x, top, v2.z),
        );
    }

    /// Pointed wall end leaning against a cliff toward `point`.
    fn add_wall_wedge(&mut self, near: Vec3, far: Vec3, point: Vec3) {
        let near = self.metrics.perturb(near);
        let far = self.metrics.perturb(far);
        let point = self.metrics.perturb(point);
        let center = metrics::wall_lerp(near, far);
        let thickness = metrics::wall_thickness_offset(near, far);
        let top = center.y + WALL_HEIGHT;

        let v1 = center - thickness;
        let v2 = center + thickness;
        let v3 = Vec3::new(v1.x, top, v1.z);
        let v4 = Vec3::new(v2.x, top, v2.z);
        let point_bottom = Vec3::new(point.x, center.y, point.z);
        let point_top = Vec3::new(point.x, top, point.z);

        let walls = &mut self.geometry.walls;
        walls.add_quad_unperturbed(v1, point_bottom, v3, point_top);
        walls.add_quad_unperturbed(point_bottom, v2, point_top, v4);
        walls.add_triangle_unperturbed(point_top, v3, v4);
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::coordinates::HexDirection;
    use crate::grid::tests::grid;
    use crate::metrics::WALL_HEIGHT;
    use crate::triangulator::{ChunkGeometry, triangulate_chunk};

    // ── pick_size ───────────────────────────────────────────────────

    #[test]
    fn size_tiers_follow_thresholds() {
        assert_eq!(pick_size(0, 0.0), None);
        // Level 1 only ever yields the smallest tier.
        assert_eq!(pick_size(1, 0.1), Some(2));
        assert_eq!(pick_size(1, 0.5), None);
        // Level 3 can yield the largest.
        assert_eq!(pick_size(3, 0.1), Some(0));
        assert_eq!(pick_size(3, 0.7), Some(2));
    }

    // ── features ────────────────────────────────────────────────────

    #[test]
    fn dense_city_places_urban_features() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_urban_level(i, 3);
        }
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.features.is_empty());
        assert!(
            geometry
                .features
                .iter()
                .all(|f| matches!(f.kind, FeatureKind::Urban { size } if size < 3))
        );
    }

    #[test]
    fn special_cell_replaces_regular_features() {
        let mut g = grid(10, 10);
        let i = g.cell_index_at_offset(2, 2).unwrap();
        g.set_urban_level(i, 3);
        g.set_special_index(i, 2);
        let geometry = triangulate_chunk(&g, 0);
        let specials: Vec<_> = geometry
            .features
            .iter()
            .filter(|f| matches!(f.kind, FeatureKind::Special { index: 2 }))
            .collect();
        assert_eq!(specials.len(), 1);
        assert!(
            !geometry
                .features
                .iter()
                .any(|f| matches!(f.kind, FeatureKind::Urban { .. }))
        );
    }

    #[test]
    fn underwater_cells_have_no_features() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_plant_level(i, 3);
            g.set_water_level(i, 1);
        }
        assert!(triangulate_chunk(&g, 0).features.is_empty());
    }

    // ── walls ───────────────────────────────────────────────────────

    #[test]
    fn wall_rises_between_walled_and_open_cells() {
        let mut g = grid(10, 10);
        let i = g.cell_index_at_offset(2, 2).unwrap();
        g.set_walled(i, true);
        let geometry = triangulate_chunk(&g, 0);
        assert!(!geometry.walls.is_empty());
        let top = geometry.walls.vertices().iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!(top > WALL_HEIGHT * 0.5);
    }

    #[test]
    fn fully_walled_region_has_no_inner_walls() {
        let mut g = grid(10, 10);
        for i in 0..g.cells().len() {
            g.set_walled(i, true);
        }
        assert!(triangulate_chunk(&g, 0).walls.is_empty());
    }

    #[test]
    fn no_wall_across_cliffs() {
        let mut g = grid(10, 10);
        let i = g.cell_index_at_offset(2, 2).unwrap();
        g.set_elevation(i, 3);
        g.set_walled(i, true);
        let geometry = triangulate_chunk(&g, 0);
        assert!(geometry.walls.is_empty());
    }

    #[test]
    fn road_leaves_a_gap_in_the_wall() {
        let mut g = grid(10, 10);
        let i = g.cell_index_at_offset(2, 2).unwrap();
        g.set_walled(i, true);
        let closed = triangulate_chunk(&g, 0).walls.triangle_count();
        g.add_road(i, HexDirection::E);
        let open = triangulate_chunk(&g, 0).walls.triangle_count();
        assert!(open < closed, "{open} >= {closed}");
    }

    #[test]
    fn tower_faces_along_the_wall() {
        let g = grid(10, 10);
        let mut t = ChunkTriangulator {
            grid: &g,
            metrics: g.metrics(),
            geometry: ChunkGeometry::new(g.metrics()),
        };
        t.add_tower(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0));
        let tower = t.geometry.features[0];
        assert_eq!(tower.kind, FeatureKind::WallTower);
        assert!((tower.position - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        let local_x = tower.rotation * Vec3::X;
        assert!((local_x - Vec3::Z).length() < 1e-5, "{local_x:?}");
    }

    #[test]
    fn bridge_spans_its_road_centers() {
        let g = grid(10, 10);
        let mut t = ChunkTriangulator {
            grid: &g,
            metrics: g.metrics(),
            geometry: ChunkGeometry::new(g.metrics()),
        };
        t.add_bridge(Vec3::new(20.0, 0.0, 20.0), Vec3::new(60.0, 0.0, 20.0));
        let FeatureKind::Bridge { length } = t.geometry.features[0].kind else {
            panic!("expected a bridge");
        };
        assert!(length > 0.0);
        let forward = t.geometry.features[0].rotation * Vec3::Z;
        assert!(forward.y.abs() < 1e-5);
        assert!(forward.x > 0.5, "{forward:?}");
    }
}
