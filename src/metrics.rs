//! Geometry constants and the per-grid metrics object.
//!
//! The free functions here are pure lookups into fixed tables (corners,
//! bridges, terrace interpolation, wall offsets). [`HexMetrics`] bundles the
//! state that used to be process-wide: the perturbation noise, the feature
//! hash grid and the wrap size of the grid that owns it.

mod noise_source;

pub use noise_source::{HashGrid, HexHash, NOISE_TEXTURE_SIZE, NoiseTexture};

use bevy::prelude::*;

use crate::coordinates::HexDirection;

// ── Constants ──────────────────────────────────────────────────────

/// Ratio of inner (edge) radius to outer (corner) radius.
pub const OUTER_TO_INNER: f32 = 0.866_025_4;
/// Ratio of outer radius to inner radius.
pub const INNER_TO_OUTER: f32 = 1.0 / OUTER_TO_INNER;
/// Distance from a cell center to its corners.
pub const OUTER_RADIUS: f32 = 10.0;
/// Distance from a cell center to the middle of its edges.
pub const INNER_RADIUS: f32 = OUTER_RADIUS * OUTER_TO_INNER;
/// Distance between the centers of two horizontal neighbours.
pub const INNER_DIAMETER: f32 = INNER_RADIUS * 2.0;

/// Fraction of a cell covered by its flat solid region.
pub const SOLID_FACTOR: f32 = 0.8;
/// Fraction of a cell used for blending with neighbours.
pub const BLEND_FACTOR: f32 = 1.0 - SOLID_FACTOR;
/// Solid fraction of open water.
pub const WATER_FACTOR: f32 = 0.6;
/// Blend fraction of open water.
pub const WATER_BLEND_FACTOR: f32 = 1.0 - WATER_FACTOR;

/// World height of one elevation level.
pub const ELEVATION_STEP: f32 = 3.0;
/// Flat terraces per sloped connection.
pub const TERRACES_PER_SLOPE: usize = 2;
/// Interpolation steps across a terraced connection.
pub const TERRACE_STEPS: usize = TERRACES_PER_SLOPE * 2 + 1;
/// Horizontal fraction advanced per terrace step.
pub const HORIZONTAL_TERRACE_STEP_SIZE: f32 = 1.0 / TERRACE_STEPS as f32;
/// Vertical fraction advanced per terrace.
pub const VERTICAL_TERRACE_STEP_SIZE: f32 = 1.0 / (TERRACES_PER_SLOPE as f32 + 1.0);

/// Maximum horizontal perturbation distance.
pub const CELL_PERTURB_STRENGTH: f32 = 4.0;
/// Maximum vertical perturbation of a cell's center.
pub const ELEVATION_PERTURB_STRENGTH: f32 = 1.5;
/// World-to-texture scale for noise sampling.
pub const NOISE_SCALE: f32 = 0.003;

/// Cells per chunk along X.
pub const CHUNK_SIZE_X: usize = 5;
/// Cells per chunk along Z.
pub const CHUNK_SIZE_Z: usize = 5;

/// Stream bed depth relative to the cell's elevation, in elevation levels.
pub const STREAM_BED_ELEVATION_OFFSET: f32 = -1.75;
/// Water and river surface offset, in elevation levels.
pub const WATER_ELEVATION_OFFSET: f32 = -0.5;

/// Height of a wall above its foundation.
pub const WALL_HEIGHT: f32 = 4.0;
/// Vertical offset applied to wall foundations.
pub const WALL_Y_OFFSET: f32 = -1.0;
/// Thickness of walls.
pub const WALL_THICKNESS: f32 = 0.75;
/// Fraction of the elevation difference a wall sits at on the low side.
pub const WALL_ELEVATION_OFFSET: f32 = VERTICAL_TERRACE_STEP_SIZE;
/// Hash threshold below which a wall corner gets a tower.
pub const WALL_TOWER_THRESHOLD: f32 = 0.5;

/// Length of the bridge model before scaling.
pub const BRIDGE_DESIGN_LENGTH: f32 = 7.0;

/// Side length of the feature hash grid.
pub const HASH_GRID_SIZE: usize = 256;
/// World-to-hash-grid scale.
pub const HASH_GRID_SCALE: f32 = 0.25;

const FEATURE_THRESHOLDS: [[f32; 3]; 3] = [[0.0, 0.0, 0.4], [0.0, 0.4, 0.6], [0.4, 0.6, 0.8]];

const CORNERS: [Vec3; 7] = [
    Vec3::new(0.0, 0.0, OUTER_RADIUS),
    Vec3::new(INNER_RADIUS, 0.0, 0.5 * OUTER_RADIUS),
    Vec3::new(INNER_RADIUS, 0.0, -0.5 * OUTER_RADIUS),
    Vec3::new(0.0, 0.0, -OUTER_RADIUS),
    Vec3::new(-INNER_RADIUS, 0.0, -0.5 * OUTER_RADIUS),
    Vec3::new(-INNER_RADIUS, 0.0, 0.5 * OUTER_RADIUS),
    Vec3::new(0.0, 0.0, OUTER_RADIUS),
];

// ── Edge classification ────────────────────────────────────────────

/// Shape of the connection between two neighbouring cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum EdgeType {
    /// Same elevation.
    Flat,
    /// One level apart; rendered with terraces.
    Slope,
    /// Two or more levels apart.
    Cliff,
}

/// Classifies the connection between elevations `a` and `b`.
pub fn edge_type(a: i32, b: i32) -> EdgeType {
    match (a - b).abs() {
        0 => EdgeType::Flat,
        1 => EdgeType::Slope,
        _ => EdgeType::Cliff,
    }
}

// ── Corner tables ──────────────────────────────────────────────────

/// Outer corner at the counter-clockwise end of edge `d`.
pub fn first_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index()]
}

/// Outer corner at the clockwise end of edge `d`.
pub fn second_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index() + 1]
}

/// First corner of the solid region.
pub fn first_solid_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index()] * SOLID_FACTOR
}

/// Second corner of the solid region.
pub fn second_solid_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index() + 1] * SOLID_FACTOR
}

/// Middle of the solid edge in direction `d`.
pub fn solid_edge_middle(d: HexDirection) -> Vec3 {
    (CORNERS[d.index()] + CORNERS[d.index() + 1]) * (0.5 * SOLID_FACTOR)
}

/// Offset spanning the blend region toward the neighbour in direction `d`.
pub fn bridge(d: HexDirection) -> Vec3 {
    (CORNERS[d.index()] + CORNERS[d.index() + 1]) * BLEND_FACTOR
}

/// First corner of the open water region.
pub fn first_water_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index()] * WATER_FACTOR
}

/// Second corner of the open water region.
pub fn second_water_corner(d: HexDirection) -> Vec3 {
    CORNERS[d.index() + 1] * WATER_FACTOR
}

/// Offset spanning the water blend region in direction `d`.
pub fn water_bridge(d: HexDirection) -> Vec3 {
    (CORNERS[d.index()] + CORNERS[d.index() + 1]) * WATER_BLEND_FACTOR
}

// ── Terraces ───────────────────────────────────────────────────────

/// Position of terrace step `step` between `a` and `b`.
///
/// Horizontal progress is linear per step; vertical progress only advances on
/// odd steps, producing flat treads.
pub fn terrace_lerp(a: Vec3, b: Vec3, step: usize) -> Vec3 {
    let h = step as f32 * HORIZONTAL_TERRACE_STEP_SIZE;
    let v = ((step + 1) / 2) as f32 * VERTICAL_TERRACE_STEP_SIZE;
    Vec3::new(
        a.x + (b.x - a.x) * h,
        a.y + (b.y - a.y) * v,
        a.z + (b.z - a.z) * h,
    )
}

/// Cell-weight counterpart of [`terrace_lerp`]; weights blend linearly.
pub fn terrace_lerp_weights(a: Vec3, b: Vec3, step: usize) -> Vec3 {
    a.lerp(b, step as f32 * HORIZONTAL_TERRACE_STEP_SIZE)
}

// ── Features and walls ─────────────────────────────────────────────

/// Size-tier thresholds for a feature density level (1..=3).
pub fn feature_thresholds(level: u8) -> [f32; 3] {
    let index = (level.max(1) as usize - 1).min(FEATURE_THRESHOLDS.len() - 1);
    FEATURE_THRESHOLDS[index]
}

/// Point where a wall stands between `near` and `far`.
pub fn wall_lerp(near: Vec3, far: Vec3) -> Vec3 {
    let mut p = near;
    p.x += (far.x - near.x) * 0.5;
    p.z += (far.z - near.z) * 0.5;
    let v = if near.y < far.y {
        WALL_ELEVATION_OFFSET
    } else {
        1.0 - WALL_ELEVATION_OFFSET
    };
    p.y += (far.y - near.y) * v + WALL_Y_OFFSET;
    p
}

/// Horizontal half-thickness offset of a wall running across `near → far`.
pub fn wall_thickness_offset(near: Vec3, far: Vec3) -> Vec3 {
    let offset = Vec3::new(far.x - near.x, 0.0, far.z - near.z);
    offset.normalize_or_zero() * (WALL_THICKNESS * 0.5)
}

// ── HexMetrics ─────────────────────────────────────────────────────

/// Grid-scoped geometry context: noise, hash grid, and wrap size.
///
/// Every grid owns one and passes it by reference to the triangulator and
/// generator, replacing any process-wide mutable state.
#[derive(Clone, Debug)]
pub struct HexMetrics {
    noise: NoiseTexture,
    hash_grid: HashGrid,
    wrap_size: i32,
}

impl HexMetrics {
    /// Builds the noise texture and hash grid from their seeds.
    pub fn new(noise_seed: u32, hash_seed: u64) -> Self {
        Self {
            noise: NoiseTexture::generate(noise_seed, NOISE_TEXTURE_SIZE),
            hash_grid: HashGrid::new(hash_seed),
            wrap_size: 0,
        }
    }

    /// Number of cell columns after which the map wraps, or 0.
    pub fn wrap_size(&self) -> i32 {
        self.wrap_size
    }

    /// Whether the owning grid wraps horizontally.
    pub fn wrapping(&self) -> bool {
        self.wrap_size > 0
    }

    /// Updates the wrap size when the owning grid is recreated.
    pub fn set_wrap_size(&mut self, wrap_size: i32) {
        self.wrap_size = wrap_size.max(0);
    }

    /// Noise sample at a world position, blended across the wrap seam.
    pub fn sample_noise(&self, position: Vec3) -> Vec4 {
        let sample = self
            .noise
            .sample_bilinear(position.x * NOISE_SCALE, position.z * NOISE_SCALE);
        if self.wrapping() && position.x < INNER_DIAMETER * 1.5 {
            let shifted = self.noise.sample_bilinear(
                (position.x + self.wrap_size as f32 * INNER_DIAMETER) * NOISE_SCALE,
                position.z * NOISE_SCALE,
            );
            let t = (position.x / INNER_DIAMETER - 0.5).clamp(0.0, 1.0);
            return shifted.lerp(sample, t);
        }
        sample
    }

    /// Displaces a vertex horizontally by the noise at its position.
    pub fn perturb(&self, position: Vec3) -> Vec3 {
        let sample = self.sample_noise(position);
        Vec3::new(
            position.x + (sample.x * 2.0 - 1.0) * CELL_PERTURB_STRENGTH,
            position.y,
            position.z + (sample.z * 2.0 - 1.0) * CELL_PERTURB_STRENGTH,
        )
    }

    /// Feature hash for the hash-grid cell covering `position`.
    pub fn sample_hash_grid(&self, position: Vec3) -> HexHash {
        self.hash_grid.get(
            (position.x * HASH_GRID_SCALE) as i32,
            (position.z * HASH_GRID_SCALE) as i32,
        )
    }
}

impl Default for HexMetrics {
    fn default() -> Self {
        Self::new(0, 1234)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── edge_type ───────────────────────────────────────────────────

    #[test]
    fn edge_types_by_difference() {
        assert_eq!(edge_type(2, 2), EdgeType::Flat);
        assert_eq!(edge_type(2, 3), EdgeType::Slope);
        assert_eq!(edge_type(3, 2), EdgeType::Slope);
        assert_eq!(edge_type(0, 2), EdgeType::Cliff);
        assert_eq!(edge_type(-1, 4), EdgeType::Cliff);
    }

    // ── corners ─────────────────────────────────────────────────────

    #[test]
    fn corners_lie_on_outer_radius() {
        for d in HexDirection::ALL {
            assert!((first_corner(d).length() - OUTER_RADIUS).abs() < 1e-4);
            assert_eq!(second_corner(d), first_corner(d.next()));
        }
    }

    #[test]
    fn solid_plus_bridge_reaches_neighbour_solid() {
        // Two solid regions plus one bridge span the distance between centers.
        for d in HexDirection::ALL {
            let span = solid_edge_middle(d) * 2.0 + bridge(d);
            assert!((span.length() - INNER_DIAMETER).abs() < 1e-3, "{d:?}");
        }
    }

    // ── terraces ────────────────────────────────────────────────────

    #[test]
    fn terrace_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 3.0, 5.0);
        assert_eq!(terrace_lerp(a, b, 0), a);
        assert!((terrace_lerp(a, b, TERRACE_STEPS) - b).length() < 1e-5);
    }

    #[test]
    fn terrace_treads_are_flat() {
        let a = Vec3::ZERO;
        let b = Vec3::new(10.0, 3.0, 0.0);
        // Steps 1 and 2 share a height, as do 3 and 4.
        assert_eq!(terrace_lerp(a, b, 1).y, terrace_lerp(a, b, 2).y);
        assert_eq!(terrace_lerp(a, b, 3).y, terrace_lerp(a, b, 4).y);
        assert!(terrace_lerp(a, b, 2).x < terrace_lerp(a, b, 3).x);
    }

    // ── walls ───────────────────────────────────────────────────────

    #[test]
    fn wall_sits_lower_on_the_low_side() {
        let near = Vec3::new(0.0, 0.0, 0.0);
        let far = Vec3::new(4.0, 6.0, 0.0);
        let p = wall_lerp(near, far);
        assert!((p.x - 2.0).abs() < 1e-6);
        assert!((p.y - (6.0 * WALL_ELEVATION_OFFSET + WALL_Y_OFFSET)).abs() < 1e-5);
        let q = wall_lerp(far, near);
        assert!((q.y - (6.0 - 6.0 * (1.0 - WALL_ELEVATION_OFFSET) + WALL_Y_OFFSET)).abs() < 1e-5);
    }

    #[test]
    fn wall_offset_has_half_thickness() {
        let o = wall_thickness_offset(Vec3::ZERO, Vec3::new(3.0, 9.0, 4.0));
        assert!((o.length() - WALL_THICKNESS * 0.5).abs() < 1e-5);
        assert_eq!(o.y, 0.0);
    }

    #[test]
    fn feature_thresholds_grow_with_level() {
        assert_eq!(feature_thresholds(1), [0.0, 0.0, 0.4]);
        assert_eq!(feature_thresholds(3), [0.4, 0.6, 0.8]);
    }

    // ── HexMetrics ──────────────────────────────────────────────────

    #[test]
    fn perturb_stays_within_strength() {
        let metrics = HexMetrics::new(3, 9);
        for i in 0..40 {
            let p = Vec3::new(i as f32 * 13.7, 5.0, i as f32 * 4.1);
            let q = metrics.perturb(p);
            assert!((q.x - p.x).abs() <= CELL_PERTURB_STRENGTH + 1e-4);
            assert!((q.z - p.z).abs() <= CELL_PERTURB_STRENGTH + 1e-4);
            assert_eq!(q.y, p.y);
        }
    }

    #[test]
    fn wrapped_noise_matches_across_seam() {
        let mut metrics = HexMetrics::new(3, 9);
        metrics.set_wrap_size(20);
        let z = 40.0;
        // At the far west edge the sample equals the sample one map width east.
        let west = metrics.sample_noise(Vec3::new(0.0, 0.0, z));
        let east = metrics.sample_noise(Vec3::new(20.0 * INNER_DIAMETER, 0.0, z));
        assert!((west - east).length() < 1e-4);
    }
}
