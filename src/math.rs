//! Small numeric helpers shared by the noise texture, the mesh builder, unit
//! travel and feature placement.

use bevy::prelude::Vec3;

/// Rescales a noise sample from `[-1, 1]` into `[min, max]`.
///
/// ```
/// # use hex_map::math::map_noise_to_range;
/// assert_eq!(map_noise_to_range(-1.0, 0.0, 1.0), 0.0);
/// assert_eq!(map_noise_to_range(1.0, 0.0, 1.0), 1.0);
/// assert_eq!(map_noise_to_range(0.0, 2.0, 6.0), 4.0);
/// ```
pub fn map_noise_to_range(noise_val: f64, min: f32, max: f32) -> f32 {
    min + ((noise_val as f32 + 1.0) / 2.0) * (max - min)
}

/// Unit normal `(v1 - v0) × (v2 - v0)`; zero for a degenerate triangle.
pub fn compute_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    edge1.cross(edge2).normalize_or_zero()
}

/// Point on the quadratic Bézier curve `a → b → c` at parameter `t`.
pub fn bezier_point(a: Vec3, b: Vec3, c: Vec3, t: f32) -> Vec3 {
    let r = 1.0 - t;
    a * (r * r) + b * (2.0 * r * t) + c * (t * t)
}

/// First derivative of the quadratic Bézier curve `a → b → c` at `t`.
///
/// Used as the facing direction of a unit moving along the curve.
pub fn bezier_derivative(a: Vec3, b: Vec3, c: Vec3, t: f32) -> Vec3 {
    2.0 * ((1.0 - t) * (b - a) + t * (c - b))
}

/// Yaw in degrees of a horizontal direction, measured clockwise from +Z.
///
/// Matches a "look rotation" around the Y axis: `+Z` is 0°, `+X` is 90°.
/// Returns `None` for a direction without horizontal extent.
pub fn yaw_degrees(direction: Vec3) -> Option<f32> {
    if direction.x.abs() < 1e-6 && direction.z.abs() < 1e-6 {
        return None;
    }
    let yaw = direction.x.atan2(direction.z).to_degrees();
    Some(if yaw < 0.0 { yaw + 360.0 } else { yaw })
}

/// Shortest signed difference `to - from` between two angles, in `(-180, 180]`.
pub fn delta_angle(from: f32, to: f32) -> f32 {
    let mut d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d -= 360.0;
    }
    d
}

/// Interpolates between two angles in degrees along the shorter arc.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    (from + delta_angle(from, to) * t.clamp(0.0, 1.0)).rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── map_noise_to_range ──────────────────────────────────────────

    #[test]
    fn noise_min_maps_to_range_min() {
        assert_eq!(map_noise_to_range(-1.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn noise_max_maps_to_range_max() {
        assert_eq!(map_noise_to_range(1.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn noise_zero_maps_to_midpoint() {
        let result = map_noise_to_range(0.0, 0.0, 1.0);
        assert!((result - 0.5).abs() < 1e-6);
    }

    // ── compute_normal ──────────────────────────────────────────────

    #[test]
    fn normal_of_xz_plane_triangle() {
        let n = compute_normal(Vec3::ZERO, Vec3::X, Vec3::Z);
        // Cross of X × Z = -Y
        assert!((n - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn clockwise_from_above_faces_up() {
        // Terrain triangles are wound clockwise when viewed from +Y.
        let n = compute_normal(Vec3::ZERO, Vec3::Z, Vec3::X);
        assert!((n - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn degenerate_triangle_returns_zero() {
        let n = compute_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(n, Vec3::ZERO);
    }

    // ── bezier ──────────────────────────────────────────────────────

    #[test]
    fn bezier_hits_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(5.0, 2.0, 0.0);
        let c = Vec3::new(10.0, 0.0, 4.0);
        assert!((bezier_point(a, b, c, 0.0) - a).length() < 1e-6);
        assert!((bezier_point(a, b, c, 1.0) - c).length() < 1e-6);
    }

    #[test]
    fn bezier_midpoint_is_pulled_toward_control() {
        let mid = bezier_point(Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0), Vec3::X * 2.0, 0.5);
        assert!((mid - Vec3::new(0.5, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn bezier_derivative_of_straight_line_is_constant() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::X * 2.0;
        for t in [0.0, 0.3, 1.0] {
            let d = bezier_derivative(a, b, c, t);
            assert!((d - Vec3::X * 2.0).length() < 1e-6, "t = {t}: {d}");
        }
    }

    // ── angles ──────────────────────────────────────────────────────

    #[test]
    fn yaw_of_axes() {
        assert_eq!(yaw_degrees(Vec3::Z), Some(0.0));
        assert!((yaw_degrees(Vec3::X).unwrap() - 90.0).abs() < 1e-4);
        assert!((yaw_degrees(Vec3::NEG_X).unwrap() - 270.0).abs() < 1e-4);
        assert_eq!(yaw_degrees(Vec3::Y), None);
    }

    #[test]
    fn delta_angle_takes_short_way() {
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn lerp_angle_wraps_through_zero() {
        let a = lerp_angle(350.0, 10.0, 0.5);
        assert!(a.abs() < 1e-3 || (a - 360.0).abs() < 1e-3, "got {a}");
    }
}
