// 2D vector helpers for the touch field
//
// Screen convention: +x is right, +y is up.

use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};

/// Vectors shorter than this normalize to zero
const NORMALIZE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for (near) zero vectors
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > NORMALIZE_EPSILON {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Rotated 90 degrees counter-clockwise
    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Angle-linear dot product of the two directions, in -1..=1
///
/// 1 when `b` points along `a`, 0 when perpendicular, -1 when opposite.
pub fn dot_normalized(a: Vec2, b: Vec2) -> f32 {
    let dot = a.normalized().dot(b.normalized()).clamp(-1.0, 1.0);
    dot.asin() / PI * 2.0
}

/// Unit normal of the chord between the two directions
pub fn cross_normalized(a: Vec2, b: Vec2) -> Vec2 {
    (a.normalized() - b.normalized()).perpendicular().normalized()
}

/// Negate positive values, leave zero and negative values alone
pub fn neg(value: f32) -> f32 {
    if value > 0.0 { -value } else { value }
}

/// True when `a` and `b` are strictly closer than `delta`
pub fn approximately(a: f32, b: f32, delta: f32) -> bool {
    (a - b).abs() < delta
}
