//! World positions.
//!
//! Locations follow the host's conventions: Y is up, yaw and pitch are in
//! degrees, yaw 0 faces +Z and increases clockwise when seen from above.

use serde::{Deserialize, Serialize};

/// A 3D vector in block units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    #[must_use]
    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    #[must_use]
    pub fn sub(self, other: Vec3) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Integer block coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A position in a named world, with facing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    /// Create a location facing yaw 0, pitch 0.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            position: Vec3::new(x, y, z),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Set the facing (builder pattern).
    #[must_use]
    pub fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Unit vector the location is looking along.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        let yaw = f64::from(self.yaw).to_radians();
        let pitch = f64::from(self.pitch).to_radians();
        let xz = pitch.cos();
        Vec3::new(-xz * yaw.sin(), -pitch.sin(), xz * yaw.cos())
    }

    /// The block containing this location.
    #[must_use]
    pub fn block(&self) -> BlockPos {
        BlockPos::new(
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
            self.position.z.floor() as i32,
        )
    }

    /// Squared distance, or `None` across worlds.
    #[must_use]
    pub fn distance_squared(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        Some(other.position.sub(self.position).length_squared())
    }

    /// Copy of this location moved by `delta`.
    #[must_use]
    pub fn translated(&self, delta: Vec3) -> Self {
        Self {
            world: self.world.clone(),
            position: self.position.add(delta),
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }
}

/// Positional adjustments applied to an effect's anchor before it plays.
///
/// Applied in order: absolute offset, side offset (perpendicular to the
/// horizontal facing), height offset, forward offset (along the horizontal
/// facing).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offsets {
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub side: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub forward: f64,
}

impl Offsets {
    /// No adjustment.
    pub const NONE: Self = Self {
        offset: Vec3::ZERO,
        side: 0.0,
        height: 0.0,
        forward: 0.0,
    };

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.offset.is_zero() && self.side == 0.0 && self.height == 0.0 && self.forward == 0.0
    }

    /// Apply to a location, returning the adjusted copy.
    #[must_use]
    pub fn apply(&self, location: &Location) -> Location {
        let mut loc = location.clone();
        if !self.offset.is_zero() {
            loc.position = loc.position.add(self.offset);
        }
        if self.side != 0.0 {
            let dir = loc.direction().normalize();
            let side = Vec3::new(-dir.z, 0.0, dir.x).normalize();
            loc.position = loc.position.add(side.scale(self.side));
        }
        if self.height != 0.0 {
            loc.position.y += self.height;
        }
        if self.forward != 0.0 {
            let mut dir = loc.direction();
            dir.y = 0.0;
            loc.position = loc.position.add(dir.normalize().scale(self.forward));
        }
        loc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_direction_yaw_zero_faces_positive_z() {
        let loc = Location::new("world", 0.0, 64.0, 0.0);
        let dir = loc.direction();
        assert!(approx(dir.x, 0.0));
        assert!(approx(dir.y, 0.0));
        assert!(approx(dir.z, 1.0));
    }

    #[test]
    fn test_block_floors_negative() {
        let loc = Location::new("world", -0.5, 64.9, 3.2);
        assert_eq!(loc.block(), BlockPos::new(-1, 64, 3));
    }

    #[test]
    fn test_distance_across_worlds() {
        let a = Location::new("world", 0.0, 0.0, 0.0);
        let b = Location::new("nether", 1.0, 0.0, 0.0);
        assert_eq!(a.distance_squared(&b), None);
        let c = Location::new("world", 3.0, 4.0, 0.0);
        assert_eq!(a.distance_squared(&c), Some(25.0));
    }

    #[test]
    fn test_height_and_forward_offsets() {
        let loc = Location::new("world", 0.0, 64.0, 0.0).facing(0.0, 45.0);
        let offsets = Offsets {
            height: 1.5,
            forward: 2.0,
            ..Offsets::NONE
        };
        let moved = offsets.apply(&loc);
        assert!(approx(moved.position.y, 65.5));
        // Forward ignores pitch.
        assert!(approx(moved.position.z, 2.0));
        assert!(approx(moved.position.x, 0.0));
    }

    #[test]
    fn test_side_offset_is_perpendicular() {
        let loc = Location::new("world", 0.0, 64.0, 0.0);
        let offsets = Offsets {
            side: 1.0,
            ..Offsets::NONE
        };
        let moved = offsets.apply(&loc);
        assert!(approx(moved.position.x, -1.0));
        assert!(approx(moved.position.z, 0.0));
    }

    #[test]
    fn test_no_offsets_is_identity() {
        let loc = Location::new("world", 1.0, 2.0, 3.0).facing(90.0, 0.0);
        assert!(Offsets::NONE.is_none());
        assert_eq!(Offsets::NONE.apply(&loc), loc);
    }
}
