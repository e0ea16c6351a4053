// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::Vec2;
use crate::types::shape::{Shape, ShapeKind};

/// Closed scalar interval produced by projecting a shape onto an axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Interval {
    /// Lower bound.
    pub lo: f32,
    /// Upper bound.
    pub hi: f32,
}

impl Interval {
    /// Inclusive overlap: intervals sharing one endpoint overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }
}

/// Projects a vertex loop onto `axis`.
///
/// An empty loop yields the inverted interval `[+inf, -inf]`, which
/// overlaps nothing.
pub fn project_polygon(verts: &[Vec2], axis: Vec2) -> Interval {
    verts.iter().fold(
        Interval {
            lo: f32::INFINITY,
            hi: f32::NEG_INFINITY,
        },
        |acc, v| {
            let d = v.dot(&axis);
            Interval {
                lo: acc.lo.min(d),
                hi: acc.hi.max(d),
            }
        },
    )
}

/// Projects a circle onto a unit `axis`: `[c·axis - r, c·axis + r]`.
pub fn project_circle(center: Vec2, radius: f32, axis: Vec2) -> Interval {
    let c = center.dot(&axis);
    Interval {
        lo: c - radius,
        hi: c + radius,
    }
}

/// Unit normals of every edge of a closed vertex loop, in edge order.
///
/// Zero-length edges yield the zero vector, whose projections always
/// overlap, so degenerate edges never separate.
pub fn edge_normals(verts: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    let n = verts.len();
    (0..n).map(move |i| verts[(i + 1) % n].sub(&verts[i]).perp().normalize())
}

/// Circle vs circle: squared center distance against squared radius sum.
pub fn circle_vs_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    cb.sub(&ca).length_squared() <= r * r
}

/// Polygon vs polygon over the edge normals of both loops.
pub fn polygon_vs_polygon(a: &[Vec2], b: &[Vec2]) -> bool {
    edge_normals(a)
        .chain(edge_normals(b))
        .all(|axis| project_polygon(a, axis).overlaps(&project_polygon(b, axis)))
}

/// Circle vs polygon over the polygon's edge normals plus the axis from the
/// circle center to the nearest polygon vertex.
pub fn circle_vs_polygon(center: Vec2, radius: f32, poly: &[Vec2]) -> bool {
    let separated = |axis: Vec2| {
        !project_circle(center, radius, axis).overlaps(&project_polygon(poly, axis))
    };
    if edge_normals(poly).any(separated) {
        return false;
    }

    let nearest = poly.iter().min_by(|p, q| {
        let dp = p.sub(&center).length_squared();
        let dq = q.sub(&center).length_squared();
        dp.total_cmp(&dq)
    });
    match nearest {
        Some(v) => !separated(v.sub(&center).normalize()),
        None => false,
    }
}

/// Exact intersection test between two shapes, boundary-inclusive.
///
/// Polygons are read from their cached world vertices.
pub fn shapes_intersect(a: &Shape, b: &Shape) -> bool {
    match (a.kind(), b.kind()) {
        (ShapeKind::Circle { radius: ra }, ShapeKind::Circle { radius: rb }) => {
            circle_vs_circle(a.position(), *ra, b.position(), *rb)
        }
        (ShapeKind::Polygon { world: wa, .. }, ShapeKind::Polygon { world: wb, .. }) => {
            polygon_vs_polygon(wa, wb)
        }
        (ShapeKind::Circle { radius }, ShapeKind::Polygon { world, .. }) => {
            circle_vs_polygon(a.position(), *radius, world)
        }
        (ShapeKind::Polygon { world, .. }, ShapeKind::Circle { radius }) => {
            circle_vs_polygon(b.position(), *radius, world)
        }
    }
}
