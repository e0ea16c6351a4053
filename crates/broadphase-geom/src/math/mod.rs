// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Deterministic 2D vector math.
//!
//! All operations round to `f32`; nothing here consults platform RNGs or
//! fused multiply-add so identical inputs give identical bits.

mod vec2;

pub use vec2::Vec2;

/// Global epsilon used by math routines when detecting degenerate values.
pub const EPSILON: f32 = 1e-6;
