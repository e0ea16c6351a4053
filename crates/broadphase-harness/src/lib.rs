// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scenario harness for the broadphase collision core.
//!
//! Drives seeded bouncing-shape scenes through `CollisionPipeline`, checks
//! the BVH against brute force, and hashes every frame so repeated runs can
//! be compared bit for bit.

pub mod config;
pub mod harness;
pub mod sim;
