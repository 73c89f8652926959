use std::fmt;

/// Integer 2D vector used for sizes and pixel coordinates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Vec2i {
    /// Horizontal component.
    pub x: i32,
    /// Vertical component.
    pub y: i32,
}

impl Vec2i {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Construct from components.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of pixels covered by a size vector; zero for non-positive extents.
    pub fn area(self) -> usize {
        if self.x <= 0 || self.y <= 0 {
            return 0;
        }
        (self.x as usize) * (self.y as usize)
    }
}

impl fmt::Display for Vec2i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Integer rectangle with an exclusive upper corner.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rect {
    /// Inclusive lower corner.
    pub min: Vec2i,
    /// Exclusive upper corner.
    pub max: Vec2i,
}

impl Rect {
    /// Construct from corners.
    pub const fn new(min: Vec2i, max: Vec2i) -> Self {
        Self { min, max }
    }

    /// Rectangle anchored at the origin with the given size.
    pub const fn from_size(size: Vec2i) -> Self {
        Self {
            min: Vec2i::ZERO,
            max: size,
        }
    }

    /// Convert from a source convention where `max` is the last covered pixel.
    pub fn from_inclusive(min: Vec2i, max_inclusive: Vec2i) -> Self {
        Self {
            min,
            max: Vec2i::new(
                max_inclusive.x.saturating_add(1),
                max_inclusive.y.saturating_add(1),
            ),
        }
    }

    /// Whether the rectangle covers at least one pixel.
    pub fn is_valid(self) -> bool {
        self.max.x > self.min.x && self.max.y > self.min.y
    }

    /// Extent of the rectangle (`max - min`).
    pub fn size(self) -> Vec2i {
        Vec2i::new(
            self.max.x.saturating_sub(self.min.x),
            self.max.y.saturating_sub(self.min.y),
        )
    }
}

impl From<Vec2i> for Rect {
    fn from(size: Vec2i) -> Self {
        Self::from_size(size)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.min, self.max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
