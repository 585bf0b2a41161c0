//! Cube hex coordinates and the six edge directions.
//!
//! Cells are laid out pointy-side up in offset rows. A coordinate stores the
//! cube `x` and `z` components; `y` is derived so that `x + y + z == 0`.
//! Grids may wrap horizontally, in which case the offset column is kept in
//! `[0, wrap_size)`.

use std::fmt;

use bevy::prelude::*;
use hexx::Hex;

use crate::metrics::{INNER_DIAMETER, OUTER_RADIUS};

// ── HexDirection ───────────────────────────────────────────────────

/// One of the six edge directions of a cell, clockwise from north-east.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
#[repr(u8)]
pub enum HexDirection {
    /// North-east.
    NE = 0,
    /// East.
    E = 1,
    /// South-east.
    SE = 2,
    /// South-west.
    SW = 3,
    /// West.
    W = 4,
    /// North-west.
    NW = 5,
}

impl HexDirection {
    /// All directions in index order.
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NE,
        HexDirection::E,
        HexDirection::SE,
        HexDirection::SW,
        HexDirection::W,
        HexDirection::NW,
    ];

    /// Direction for an index, taken modulo six.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// Index of this direction in `0..6`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Counter-clockwise neighbour direction.
    pub fn previous(self) -> Self {
        Self::from_index(self.index() + 5)
    }

    /// Clockwise neighbour direction.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Two steps counter-clockwise.
    pub fn previous2(self) -> Self {
        Self::from_index(self.index() + 4)
    }

    /// Two steps clockwise.
    pub fn next2(self) -> Self {
        Self::from_index(self.index() + 2)
    }
}

// ── HexCoordinates ─────────────────────────────────────────────────

/// Cube coordinate of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub struct HexCoordinates {
    x: i32,
    z: i32,
}

impl HexCoordinates {
    /// Builds a coordinate, normalizing the offset column when `wrap_size > 0`.
    pub fn new(x: i32, z: i32, wrap_size: i32) -> Self {
        let mut x = x;
        if wrap_size > 0 {
            let offset_x = x + z / 2;
            if offset_x < 0 {
                x += wrap_size;
            } else if offset_x >= wrap_size {
                x -= wrap_size;
            }
        }
        Self { x, z }
    }

    /// Converts an offset (column, row) pair into cube coordinates.
    pub fn from_offset(column: i32, row: i32, wrap_size: i32) -> Self {
        Self::new(column - row / 2, row, wrap_size)
    }

    /// Cube X component.
    pub fn x(self) -> i32 {
        self.x
    }

    /// Derived cube Y component.
    pub fn y(self) -> i32 {
        -self.x - self.z
    }

    /// Cube Z component, also the offset row.
    pub fn z(self) -> i32 {
        self.z
    }

    /// Offset (column, row) of this coordinate.
    pub fn to_offset(self) -> (i32, i32) {
        (self.x + self.z / 2, self.z)
    }

    /// Cube distance to `other`, the shortest way round on wrapping grids.
    pub fn distance_to(self, other: HexCoordinates, wrap_size: i32) -> i32 {
        let a = Hex::new(self.x, self.z);
        let direct = a.distance_to(Hex::new(other.x, other.z));
        if wrap_size <= 0 {
            return direct;
        }
        let east = a.distance_to(Hex::new(other.x + wrap_size, other.z));
        let west = a.distance_to(Hex::new(other.x - wrap_size, other.z));
        direct.min(east).min(west)
    }

    /// Coordinate of the cell containing a world-space position.
    pub fn from_position(position: Vec3, wrap_size: i32) -> Self {
        let offset = position.z / (OUTER_RADIUS * 3.0);
        let x = position.x / INNER_DIAMETER - offset;
        let y = -position.x / INNER_DIAMETER - offset;
        let z = -x - y;

        let mut ix = x.round() as i32;
        let iy = y.round() as i32;
        let mut iz = z.round() as i32;

        if ix + iy + iz != 0 {
            let dx = (x - ix as f32).abs();
            let dy = (y - iy as f32).abs();
            let dz = (z - iz as f32).abs();
            if dx > dy && dx > dz {
                ix = -iy - iz;
            } else if dz > dy {
                iz = -ix - iy;
            }
        }
        Self::new(ix, iz, wrap_size)
    }
}

impl fmt::Display for HexCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y(), self.z)
    }
}
