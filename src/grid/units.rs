//! Units standing on cells and their animated travel along paths.
//!
//! Travel is a small state machine advanced by [`HexGrid::tick_units`]:
//! a unit first turns toward the next cell, then follows quadratic Bézier
//! segments through the path's cell centers. Visibility follows the unit one
//! segment at a time. Starting a new journey replaces the running one.

use bevy::prelude::*;

use crate::math;

use super::HexGrid;

/// Movement points a unit spends per turn.
pub const UNIT_SPEED: i32 = 24;
/// Sight range of a unit, in cells.
pub const UNIT_VISION_RANGE: i32 = 3;
/// Path segments travelled per second.
pub const TRAVEL_SPEED: f32 = 4.0;
/// Turning speed in degrees per second.
pub const UNIT_ROTATION_SPEED: f32 = 180.0;

/// Stable handle of a unit in its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct UnitId(pub u32);

/// Animation state of a unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum UnitMotion {
    /// Standing still since it was placed.
    #[default]
    Idle,
    /// Turning toward the first step of its path.
    LookingAt {
        /// Orientation at the start of the turn.
        from: f32,
        /// Orientation to end up with.
        to: f32,
        /// Progress in `[0, 1)`.
        t: f32,
        /// Progress per second.
        speed: f32,
    },
    /// Following path segment `segment` (1-based; the last one ends at the destination).
    Traveling {
        /// Current segment.
        segment: usize,
        /// Progress along the segment in `[0, 1)`.
        t: f32,
    },
    /// Reached the end of its last path.
    Arrived,
}

/// A unit on the map.
#[derive(Clone, Debug)]
pub struct HexUnit {
    id: UnitId,
    location: usize,
    orientation: f32,
    position: Vec3,
    path: Vec<usize>,
    current_travel_location: Option<usize>,
    motion: UnitMotion,
}

impl HexUnit {
    /// Stable handle of the unit.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Cell the unit occupies (its destination while travelling).
    pub fn location(&self) -> usize {
        self.location
    }

    /// Facing in degrees, clockwise from +Z.
    pub fn orientation(&self) -> f32 {
        self.orientation
    }

    /// Current world position, interpolated while travelling.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current animation state.
    pub fn motion(&self) -> &UnitMotion {
        &self.motion
    }

    /// Whether the unit is animating along a path.
    pub fn is_travelling(&self) -> bool {
        matches!(
            self.motion,
            UnitMotion::LookingAt { .. } | UnitMotion::Traveling { .. }
        )
    }
}

impl HexGrid {
    // ── Bookkeeping ────────────────────────────────────────────────

    /// All units on the map.
    pub fn units(&self) -> &[HexUnit] {
        &self.units
    }

    /// Unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&HexUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Places a new unit on cell `location`, which must be free.
    ///
    /// The unit immediately reveals its surroundings.
    pub fn add_unit(&mut self, location: usize, orientation: f32) -> Option<UnitId> {
        if self.cells.get(location)?.unit.is_some() {
            return None;
        }
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.push(HexUnit {
            id,
            location,
            orientation,
            position: self.cells[location].position,
            path: Vec::new(),
            current_travel_location: None,
            motion: UnitMotion::Idle,
        });
        self.cells[location].unit = Some(id);
        self.increase_visibility(location, UNIT_VISION_RANGE);
        Some(id)
    }

    /// Removes a unit, withdrawing its sight.
    pub fn remove_unit(&mut self, id: UnitId) {
        let Some(pos) = self.units.iter().position(|u| u.id == id) else {
            return;
        };
        let unit = self.units.remove(pos);
        let seen_from = unit.current_travel_location.unwrap_or(unit.location);
        self.decrease_visibility(seen_from, UNIT_VISION_RANGE);
        if self.cells[unit.location].unit == Some(id) {
            self.cells[unit.location].unit = None;
        }
    }

    /// Removes every unit.
    pub(crate) fn clear_units(&mut self) {
        let ids: Vec<UnitId> = self.units.iter().map(|u| u.id).collect();
        for id in ids {
            self.remove_unit(id);
        }
    }

    /// Snaps an idle unit on cell `i` to the cell's current center.
    pub(crate) fn validate_unit_location(&mut self, i: usize) {
        let Some(id) = self.cells[i].unit else {
            return;
        };
        let position = self.cells[i].position;
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == id)
            && !unit.is_travelling()
        {
            unit.position = position;
        }
    }

    // ── Travel ─────────────────────────────────────────────────────

    /// Moves a unit along `path` (start cell first).
    ///
    /// The unit occupies the destination right away; the animation and the
    /// moving sight range are played out by [`tick_units`](Self::tick_units).
    /// Paths shorter than two cells are ignored.
    pub fn travel(&mut self, id: UnitId, path: Vec<usize>) {
        let Some(&destination) = path.last() else {
            return;
        };
        if path.len() < 2 {
            return;
        }
        let Some(pos) = self.units.iter().position(|u| u.id == id) else {
            return;
        };

        let old_location = self.units[pos].location;
        if self.cells[old_location].unit == Some(id) {
            self.cells[old_location].unit = None;
        }
        self.cells[destination].unit = Some(id);

        let next = self.cells[path[1]].position;
        let unit = &mut self.units[pos];
        unit.location = destination;
        let from = unit.orientation;
        let to = math::yaw_degrees(next - unit.position).unwrap_or(from);
        let angle = math::delta_angle(from, to).abs();
        unit.path = path;
        unit.motion = UnitMotion::LookingAt {
            from,
            to,
            t: 0.0,
            speed: if angle > 0.0 {
                UNIT_ROTATION_SPEED / angle
            } else {
                f32::INFINITY
            },
        };
    }

    /// Advances every unit's animation by `dt` seconds.
    pub fn tick_units(&mut self, dt: f32) {
        let mut units = std::mem::take(&mut self.units);
        for unit in &mut units {
            self.advance_unit(unit, dt);
        }
        // Units are never added or removed while ticking.
        self.units = units;
    }

    fn advance_unit(&mut self, unit: &mut HexUnit, dt: f32) {
        let mut remaining = dt.max(0.0);
        loop {
            match unit.motion {
                UnitMotion::Idle | UnitMotion::Arrived => return,
                UnitMotion::LookingAt { from, to, t, speed } => {
                    let t = t + remaining * speed;
                    if t < 1.0 {
                        unit.orientation = math::lerp_angle(from, to, t);
                        unit.motion = UnitMotion::LookingAt { from, to, t, speed };
                        return;
                    }
                    unit.orientation = to;
                    remaining = if speed.is_finite() { (t - 1.0) / speed } else { remaining };
                    self.begin_travel(unit);
                }
                UnitMotion::Traveling { segment, t } => {
                    let t = t + remaining * TRAVEL_SPEED;
                    if t < 1.0 {
                        self.place_on_segment(unit, segment, t);
                        unit.motion = UnitMotion::Traveling { segment, t };
                        return;
                    }
                    remaining = (t - 1.0) / TRAVEL_SPEED;
                    self.finish_segment(unit, segment);
                }
            }
        }
    }

    fn begin_travel(&mut self, unit: &mut HexUnit) {
        let from = *unit.current_travel_location.get_or_insert(unit.path[0]);
        self.decrease_visibility(from, UNIT_VISION_RANGE);
        self.enter_segment(unit, 1);
    }

    fn enter_segment(&mut self, unit: &mut HexUnit, segment: usize) {
        if segment < unit.path.len() {
            let cell = unit.path[segment];
            unit.current_travel_location = Some(cell);
            self.increase_visibility(cell, UNIT_VISION_RANGE);
        } else {
            unit.current_travel_location = None;
            self.increase_visibility(unit.location, UNIT_VISION_RANGE);
        }
        unit.motion = UnitMotion::Traveling { segment, t: 0.0 };
    }

    fn finish_segment(&mut self, unit: &mut HexUnit, segment: usize) {
        if segment < unit.path.len() {
            self.decrease_visibility(unit.path[segment], UNIT_VISION_RANGE);
            self.enter_segment(unit, segment + 1);
            return;
        }
        self.place_on_segment(unit, segment, 1.0);
        unit.position = self.cells[unit.location].position;
        unit.path.clear();
        unit.motion = UnitMotion::Arrived;
    }

    /// Control points of segment `segment`: from the previous midpoint,
    /// through the previous cell center, to the next midpoint.
    fn segment_curve(&self, path: &[usize], segment: usize) -> (Vec3, Vec3, Vec3) {
        let center = |i: usize| self.cells[path[i]].position;
        let a = if segment == 1 {
            center(0)
        } else {
            (center(segment - 2) + center(segment - 1)) * 0.5
        };
        let b = center(segment - 1);
        let c = if segment < path.len() {
            (b + center(segment)) * 0.5
        } else {
            b
        };
        (a, b, c)
    }

    fn place_on_segment(&self, unit: &mut HexUnit, segment: usize, t: f32) {
        let (a, b, c) = self.segment_curve(&unit.path, segment);
        unit.position = math::bezier_point(a, b, c, t);
        if let Some(yaw) = math::yaw_degrees(math::bezier_derivative(a, b, c, t)) {
            unit.orientation = yaw;
        }
    }
}
