//! Integer lattice math for the battle grid.
//!
//! The battlefield is a cube of integer cells. Movement and weapon range
//! are both measured with the Chebyshev metric, so every distance in the
//! crate goes through [`Vector::clen`].

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Largest coordinate magnitude accepted from the wire.
///
/// Keeps every sum, difference and step multiple the pipeline computes far
/// away from `i32` overflow.
pub const COORDINATE_LIMIT: i32 = 1 << 20;

/// A point or displacement on the integer lattice.
///
/// Serialized on the wire as an `"X/Y/Z"` string. Decoding rejects
/// coordinates beyond [`COORDINATE_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vector {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl Vector {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chebyshev distance: the largest per-axis difference.
    #[must_use]
    pub fn clen(self, other: Self) -> i32 {
        let d = self - other;
        d.x.abs().max(d.y.abs()).max(d.z.abs())
    }

    /// Whether a ship anchored at this cell fits inside `bounds`.
    #[must_use]
    pub fn in_bounds(self, bounds: &MapBounds) -> bool {
        bounds.contains(self)
    }

    fn coords(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + -rhs
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1
    }
}

impl Mul<i32> for Vector {
    type Output = Self;

    fn mul(self, k: i32) -> Self::Output {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x, self.y, self.z)
    }
}

impl FromStr for Vector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/').map(|p| p.trim().parse::<i32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => {
                let v = Self::new(x, y, z);
                let playable = -COORDINATE_LIMIT..=COORDINATE_LIMIT;
                if v.coords().iter().all(|c| playable.contains(c)) {
                    Ok(v)
                } else {
                    Err(CoreError::CoordinateOutOfRange(s.to_string()))
                }
            }
            _ => Err(CoreError::MalformedVector(s.to_string())),
        }
    }
}

impl TryFrom<String> for Vector {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Vector> for String {
    fn from(v: Vector) -> Self {
        v.to_string()
    }
}

/// All displacements whose components are drawn from `steps`.
///
/// Iterates X outermost and Z innermost, in the order `steps` lists them,
/// so callers get a stable candidate order.
pub fn lattice_offsets(steps: &[i32]) -> impl Iterator<Item = Vector> + '_ {
    steps.iter().flat_map(move |&x| {
        steps
            .iter()
            .flat_map(move |&y| steps.iter().map(move |&z| Vector::new(x, y, z)))
    })
}

/// How much room a ship needs between its anchor cell and the map walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundsMargin {
    /// The ship occupies `c..=c + ship_size` on each axis and must stay
    /// strictly inside the map.
    #[default]
    Extent,
    /// The margin sits on the side of the map facing the player: side 0
    /// keeps `ship_size` clear at the far wall, side 1 at the near wall.
    SideAware,
}

/// Playable region for ship anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Edge length of the cubic map.
    pub map_size: i32,
    /// Physical ship extent along each axis.
    pub ship_size: i32,
    /// Margin policy.
    pub margin: BoundsMargin,
    /// Which side of the map we spawned on (0 or 1). Only used by
    /// [`BoundsMargin::SideAware`].
    pub side: i32,
}

impl MapBounds {
    /// Create bounds for side 0.
    #[must_use]
    pub const fn new(map_size: i32, ship_size: i32, margin: BoundsMargin) -> Self {
        Self {
            map_size,
            ship_size,
            margin,
            side: 0,
        }
    }

    /// Same bounds for the given side. Sides other than 0 and 1 are clamped.
    #[must_use]
    pub const fn with_side(mut self, side: i32) -> Self {
        self.side = if side <= 0 { 0 } else { 1 };
        self
    }

    /// Whether `anchor` is a legal ship position.
    #[must_use]
    pub fn contains(&self, anchor: Vector) -> bool {
        let (low, high) = match self.margin {
            BoundsMargin::Extent => (0, self.map_size - self.ship_size),
            BoundsMargin::SideAware => (
                self.ship_size * self.side,
                self.map_size - self.ship_size * (1 - self.side),
            ),
        };
        anchor.coords().iter().all(|&c| low < c && c < high)
    }
}

impl Default for MapBounds {
    fn default() -> Self {
        Self::new(30, 2, BoundsMargin::Extent)
    }
}
