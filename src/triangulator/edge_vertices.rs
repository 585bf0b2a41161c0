use bevy::prelude::*;

use crate::metrics;

/// Five points along one cell edge, used to subdivide strips and fans.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVertices {
    /// First corner.
    pub v1: Vec3,
    /// Quarter point, or the outer step point.
    pub v2: Vec3,
    /// Middle; lowered to the stream bed when a river crosses the edge.
    pub v3: Vec3,
    /// Three-quarter point.
    pub v4: Vec3,
    /// Second corner.
    pub v5: Vec3,
}

impl EdgeVertices {
    /// Evenly spaced points between two corners.
    pub fn new(corner1: Vec3, corner2: Vec3) -> Self {
        Self {
            v1: corner1,
            v2: corner1.lerp(corner2, 0.25),
            v3: corner1.lerp(corner2, 0.5),
            v4: corner1.lerp(corner2, 0.75),
            v5: corner2,
        }
    }

    /// Like [`new`](Self::new) but with `v2`/`v4` at `outer_step` from the corners.
    pub fn with_outer_step(corner1: Vec3, corner2: Vec3, outer_step: f32) -> Self {
        Self {
            v1: corner1,
            v2: corner1.lerp(corner2, outer_step),
            v3: corner1.lerp(corner2, 0.5),
            v4: corner1.lerp(corner2, 1.0 - outer_step),
            v5: corner2,
        }
    }

    /// Terrace step `step` between two edges.
    pub fn terrace_lerp(a: &Self, b: &Self, step: usize) -> Self {
        Self {
            v1: metrics::terrace_lerp(a.v1, b.v1, step),
            v2: metrics::terrace_lerp(a.v2, b.v2, step),
            v3: metrics::terrace_lerp(a.v3, b.v3, step),
            v4: metrics::terrace_lerp(a.v4, b.v4, step),
            v5: metrics::terrace_lerp(a.v5, b.v5, step),
        }
    }
}
