use serde::{Deserialize, Serialize};

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned box described by two opposite corners.
///
/// The corners are stored exactly as captured; neither is guaranteed to be
/// the minimum on any axis, so every containment test normalizes per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub corner_a: Point,
    pub corner_b: Point,
}

impl BoundingBox {
    pub const fn new(corner_a: Point, corner_b: Point) -> Self {
        Self { corner_a, corner_b }
    }

    /// Inclusive containment test, independent of corner capture order.
    pub fn contains(&self, p: Point) -> bool {
        axis_contains(self.corner_a.x, self.corner_b.x, p.x)
            && axis_contains(self.corner_a.y, self.corner_b.y, p.y)
            && axis_contains(self.corner_a.z, self.corner_b.z, p.z)
    }
}

fn axis_contains(a: f64, b: f64, v: f64) -> bool {
    v >= a.min(b) && v <= a.max(b)
}
