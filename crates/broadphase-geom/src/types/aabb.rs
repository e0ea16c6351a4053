// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::Vec2;

/// Axis-aligned bounding box in world coordinates.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
/// - Immutable value type: every operation returns a new box.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Constructs an AABB from its minimum and maximum corners.
    ///
    /// # Panics
    /// Panics if any component of `min` is greater than its counterpart in `max`.
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        assert!(
            min.x() <= max.x() && min.y() <= max.y(),
            "invalid AABB: min {min:?} > max {max:?}"
        );
        Self { min, max }
    }

    /// Returns the minimum corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Returns the maximum corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Builds an AABB centered at `center` with half-extents `hx, hy`.
    #[must_use]
    pub fn from_center_half_extents(center: Vec2, hx: f32, hy: f32) -> Self {
        let he = Vec2::new(hx, hy);
        Self::new(center.sub(&he), center.add(&he))
    }

    /// Builds the minimal AABB that contains all `points`.
    ///
    /// # Panics
    /// Panics if `points` is empty.
    #[must_use]
    pub fn from_points(points: &[Vec2]) -> Self {
        assert!(!points.is_empty(), "from_points requires at least one point");
        let mut min = points[0];
        let mut max = points[0];
        for p in &points[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Extent along X.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x() - self.min.x()
    }

    /// Extent along Y.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y() - self.min.y()
    }

    /// Midpoint of the box; the centroid used by the BVH median split.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min.add(&self.max).scale(0.5)
    }

    /// Width times height.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns `true` if this AABB overlaps another (inclusive on edges).
    ///
    /// Symmetric: `a.overlaps(&b) == b.overlaps(&a)`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        // Inclusive so boxes sharing an edge coordinate still pair.
        self.min.x() <= other.max.x()
            && self.max.x() >= other.min.x()
            && self.min.y() <= other.max.y()
            && self.max.y() >= other.min.y()
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x() >= self.min.x()
            && p.x() <= self.max.x()
            && p.y() >= self.min.y()
            && p.y() <= self.max.y()
    }

    /// Returns the smallest box containing both inputs (componentwise min/max).
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(&other.min),
            max: self.max.max(&other.max),
        }
    }

    /// Grows the box by a uniform `margin` on every side.
    ///
    /// # Panics
    /// Panics if `margin` is negative or NaN.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        assert!(margin >= 0.0, "invalid AABB margin: {margin}");
        let delta = Vec2::new(margin, margin);
        Self {
            min: self.min.sub(&delta),
            max: self.max.add(&delta),
        }
    }
}
