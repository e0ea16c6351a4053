// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::f32::consts::{FRAC_PI_2, TAU};

use crate::math::Vec2;
use crate::types::aabb::Aabb;

/// Geometry variant of a [`Shape`].
///
/// The set is closed: triangles are polygons with three vertices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    /// Disc of the given radius centered on the shape position.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
    /// Convex polygon given as an ordered vertex loop.
    Polygon {
        /// Vertices relative to the shape position, before rotation.
        local: Vec<Vec2>,
        /// Cached world-space vertices; refreshed by [`Shape::update_world_verts`].
        world: Vec<Vec2>,
    },
}

/// A collidable 2D shape: pose plus geometry.
///
/// Polygons cache their world-space vertex loop. After changing the pose
/// with [`Shape::set_position`] or [`Shape::set_rotation`] the caller must
/// call [`Shape::update_world_verts`] before computing bounds or running SAT;
/// otherwise the stale loop is used.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    position: Vec2,
    rotation: f32,
    kind: ShapeKind,
}

impl Shape {
    /// Creates a circle at `position`.
    ///
    /// # Panics
    /// Panics if `radius` is negative or NaN.
    pub fn circle(position: Vec2, radius: f32) -> Self {
        assert!(radius >= 0.0, "circle radius must be non-negative, got {radius}");
        Self {
            position,
            rotation: 0.0,
            kind: ShapeKind::Circle { radius },
        }
    }

    /// Creates a convex polygon from a local-space vertex loop.
    ///
    /// # Panics
    /// Panics if fewer than three vertices are supplied.
    pub fn polygon(position: Vec2, rotation: f32, local: Vec<Vec2>) -> Self {
        assert!(
            local.len() >= 3,
            "polygon requires at least three vertices, got {}",
            local.len()
        );
        let mut shape = Self {
            position,
            rotation,
            kind: ShapeKind::Polygon {
                world: Vec::with_capacity(local.len()),
                local,
            },
        };
        shape.update_world_verts();
        shape
    }

    /// Creates a regular polygon with `sides` vertices on a circle of radius `size`.
    ///
    /// The first vertex points straight down (angle `-π/2`).
    pub fn regular_polygon(position: Vec2, size: f32, sides: usize) -> Self {
        let local = (0..sides)
            .map(|i| {
                let angle = i as f32 * TAU / sides as f32 - FRAC_PI_2;
                Vec2::new(size * angle.cos(), size * angle.sin())
            })
            .collect();
        Self::polygon(position, 0.0, local)
    }

    /// Creates an equilateral triangle inscribed in a circle of radius `size`.
    pub fn triangle(position: Vec2, size: f32) -> Self {
        Self::regular_polygon(position, size, 3)
    }

    /// World-space position.
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Rotation in radians.
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Geometry variant.
    pub const fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Returns `true` for circles.
    pub const fn is_circle(&self) -> bool {
        matches!(self.kind, ShapeKind::Circle { .. })
    }

    /// Circle radius, or `None` for polygons.
    pub const fn radius(&self) -> Option<f32> {
        match self.kind {
            ShapeKind::Circle { radius } => Some(radius),
            ShapeKind::Polygon { .. } => None,
        }
    }

    /// Cached world-space vertex loop (empty for circles).
    pub fn world_vertices(&self) -> &[Vec2] {
        match &self.kind {
            ShapeKind::Circle { .. } => &[],
            ShapeKind::Polygon { world, .. } => world,
        }
    }

    /// Local-space vertex loop (empty for circles).
    pub fn local_vertices(&self) -> &[Vec2] {
        match &self.kind {
            ShapeKind::Circle { .. } => &[],
            ShapeKind::Polygon { local, .. } => local,
        }
    }

    /// Moves the shape. Call [`Shape::update_world_verts`] afterwards.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Rotates the shape. Call [`Shape::update_world_verts`] afterwards.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    /// Recomputes the world-space vertex cache from the current pose.
    ///
    /// Each local vertex is rotated by `rotation` then translated by
    /// `position`. No-op for circles.
    pub fn update_world_verts(&mut self) {
        let (sin, cos) = self.rotation.sin_cos();
        let pos = self.position;
        if let ShapeKind::Polygon { local, world } = &mut self.kind {
            world.clear();
            world.extend(local.iter().map(|v| v.rotated_by(sin, cos).add(&pos)));
        }
    }

    /// Computes the world-space AABB from the current pose and vertex cache.
    pub fn compute_aabb(&self) -> Aabb {
        match &self.kind {
            ShapeKind::Circle { radius } => {
                Aabb::from_center_half_extents(self.position, *radius, *radius)
            }
            ShapeKind::Polygon { world, .. } => Aabb::from_points(world),
        }
    }

    /// Point containment test.
    ///
    /// Circles use a squared-distance comparison (boundary inclusive).
    /// Polygons use the crossing-number test against a horizontal ray toward
    /// +X; classification of points lying exactly on an edge is unspecified.
    pub fn contains_point(&self, p: Vec2) -> bool {
        match &self.kind {
            ShapeKind::Circle { radius } => {
                p.sub(&self.position).length_squared() <= radius * radius
            }
            ShapeKind::Polygon { world, .. } => crossing_test(world, p),
        }
    }
}

fn crossing_test(verts: &[Vec2], p: Vec2) -> bool {
    let n = verts.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for (i, vi) in verts.iter().enumerate() {
        let vj = verts[j];
        // Edge straddles the ray's line and the crossing lies right of `p`.
        if (vi.y() > p.y()) != (vj.y() > p.y())
            && p.x() < (vj.x() - vi.x()) * (p.y() - vi.y()) / (vj.y() - vi.y()) + vi.x()
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
