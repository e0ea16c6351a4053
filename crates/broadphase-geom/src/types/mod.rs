// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Core geometry types used by the collision passes (AABB, shapes).
//!
//! Determinism notes:
//! - Overlap semantics are inclusive on edges so touching shapes pair up.
//! - World-space vertices are a cache owned by each shape and refreshed
//!   explicitly by the caller once per pose change.

#[doc = "Axis-aligned bounding boxes (world space)."]
pub mod aabb;
#[doc = "Circles and convex polygons with cached world-space vertices."]
pub mod shape;
