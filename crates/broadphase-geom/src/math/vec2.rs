// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::EPSILON;

/// Deterministic 2D vector used for positions, directions, and SAT axes.
///
/// * Components are world-space units and may represent either points or
///   directions depending on the calling context.
/// * Arithmetic uses `f32` so results round identically on every target.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    x: f32,
    y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit vector pointing along the positive X axis.
    pub const UNIT_X: Self = Self::new(1.0, 0.0);

    /// Unit vector pointing along the positive Y axis.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0);

    /// Creates a vector from components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// X component.
    pub const fn x(self) -> f32 {
        self.x
    }

    /// Y component.
    pub const fn y(self) -> f32 {
        self.y
    }

    /// Returns the components as an array.
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Adds two vectors.
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Subtracts another vector.
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scales the vector by a scalar.
    pub fn scale(&self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Negates both components.
    pub fn neg(&self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// Dot product with another vector.
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product `(self, 0) × (other, 0)`.
    pub fn cross(&self, other: &Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Counter-clockwise perpendicular `(-y, x)`.
    pub fn perp(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Vector length (magnitude).
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Squared magnitude of the vector.
    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    /// Normalises the vector, returning the zero vector if length ≤ `EPSILON`.
    ///
    /// Zero-length polygon edges and coincident points produce degenerate
    /// axes; they map to the zero vector, never to NaN.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len <= EPSILON {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Componentwise minimum.
    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Componentwise maximum.
    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Rotates counter-clockwise about the origin by the angle whose
    /// `sin_cos()` is `(sin, cos)`.
    pub fn rotated_by(&self, sin: f32, cos: f32) -> Self {
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

/// Converts a `[f32; 2]` array into a `Vec2` interpreted as `(x, y)`.
///
/// # Examples
/// ```
/// use broadphase_geom::math::Vec2;
/// let v = Vec2::from([1.0, 2.0]);
/// assert_eq!(v.to_array(), [1.0, 2.0]);
/// ```
impl From<[f32; 2]> for Vec2 {
    fn from(value: [f32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_zero_vector_is_zero_not_nan() {
        let n = Vec2::ZERO.normalize();
        assert_eq!(n, Vec2::ZERO);
        assert!(!n.x().is_nan() && !n.y().is_nan());
    }

    #[test]
    fn normalize_yields_unit_length() {
        let n = Vec2::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n.x() - 0.6).abs() < 1e-6 && (n.y() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn perp_is_orthogonal_and_ccw() {
        let v = Vec2::new(2.0, 1.0);
        assert_eq!(v.perp().dot(&v), 0.0);
        assert!(v.cross(&v.perp()) > 0.0);
    }

    #[test]
    fn rotated_quarter_turn_maps_x_to_y() {
        let (sin, cos) = core::f32::consts::FRAC_PI_2.sin_cos();
        let r = Vec2::UNIT_X.rotated_by(sin, cos);
        assert!(r.x().abs() < 1e-6);
        assert!((r.y() - 1.0).abs() < 1e-6);
    }
}
