// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Seeded bouncing-shape scene that feeds the collision pipeline.
//!
//! Shapes drift at constant velocity, spin slowly and bounce off the world
//! walls. Everything is driven by one seeded `ChaCha8Rng`, so a seed fully
//! determines the scene.

use core::f32::consts::TAU;

use broadphase_geom::{Shape, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Gap kept between shape bounds and the walls when bouncing.
const WALL_MARGIN: f32 = 5.0;
/// Minimum distance of a fresh shape's center from the walls.
pub(crate) const SPAWN_MARGIN: f32 = 60.0;
/// Angular speed in radians per second.
const SPIN_RATE: f32 = 0.5;

/// One moving shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Stable identifier; never reused within a world.
    pub id: u64,
    /// Geometry and pose.
    pub shape: Shape,
    /// Linear velocity in units per second.
    pub velocity: Vec2,
}

/// Owns the bodies and the generator that spawns them.
#[derive(Debug, Clone)]
pub struct SceneWorld {
    bodies: Vec<Body>,
    width: f32,
    height: f32,
    next_id: u64,
    rng: ChaCha8Rng,
}

impl SceneWorld {
    /// Creates an empty `width` by `height` world.
    ///
    /// # Panics
    /// Panics if either dimension does not leave room for the spawn margin.
    pub fn new(seed: u64, width: f32, height: f32) -> Self {
        assert!(
            width > 2.0 * SPAWN_MARGIN && height > 2.0 * SPAWN_MARGIN,
            "world {width}x{height} is too small"
        );
        Self {
            bodies: Vec::new(),
            width,
            height,
            next_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Bodies in index order.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// World width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// World height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns `true` when no bodies remain.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Shape list in body order; index `i` is body `i`.
    pub fn shapes(&self) -> Vec<Shape> {
        self.bodies.iter().map(|b| b.shape.clone()).collect()
    }

    /// Grows with random shapes or truncates from the end until `count` bodies remain.
    pub fn ensure_count(&mut self, count: usize) {
        while self.bodies.len() < count {
            let pos = Vec2::new(
                self.rng.gen_range(SPAWN_MARGIN..self.width - SPAWN_MARGIN),
                self.rng.gen_range(SPAWN_MARGIN..self.height - SPAWN_MARGIN),
            );
            let body = self.random_body(pos);
            self.bodies.push(body);
        }
        self.bodies.truncate(count);
    }

    /// Adds one random shape centered at `pos`; returns its id.
    pub fn spawn_at(&mut self, pos: Vec2) -> u64 {
        let body = self.random_body(pos);
        let id = body.id;
        self.bodies.push(body);
        id
    }

    /// Removes the body at `index`, shifting later bodies down.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Option<Body> {
        (index < self.bodies.len()).then(|| self.bodies.remove(index))
    }

    /// Advances every body by `dt * speed_mult` seconds.
    pub fn update(&mut self, dt: f32, speed_mult: f32) {
        let step = dt * speed_mult;
        let (w, h) = (self.width, self.height);
        for body in &mut self.bodies {
            let shape = &mut body.shape;
            let mut pos = shape.position().add(&body.velocity.scale(step));
            shape.set_position(pos);
            shape.set_rotation(shape.rotation() + SPIN_RATE * step);
            shape.update_world_verts();

            let bounds = shape.compute_aabb();
            let (hw, hh) = (bounds.width() * 0.5, bounds.height() * 0.5);
            let (mut vx, mut vy) = (body.velocity.x(), body.velocity.y());
            let (mut x, mut y) = (pos.x(), pos.y());
            if x - hw < WALL_MARGIN {
                x = WALL_MARGIN + hw;
                vx = vx.abs();
            }
            if x + hw > w - WALL_MARGIN {
                x = w - WALL_MARGIN - hw;
                vx = -vx.abs();
            }
            if y - hh < WALL_MARGIN {
                y = WALL_MARGIN + hh;
                vy = vy.abs();
            }
            if y + hh > h - WALL_MARGIN {
                y = h - WALL_MARGIN - hh;
                vy = -vy.abs();
            }
            body.velocity = Vec2::new(vx, vy);

            if x != pos.x() || y != pos.y() {
                pos = Vec2::new(x, y);
                shape.set_position(pos);
                shape.update_world_verts();
            }
        }
    }

    fn random_body(&mut self, pos: Vec2) -> Body {
        let rng = &mut self.rng;
        let shape = match rng.gen_range(0..3u8) {
            0 => Shape::circle(pos, rng.gen_range(12.0..30.0)),
            1 => Shape::triangle(pos, rng.gen_range(15.0..30.0)),
            _ => {
                let sides = rng.gen_range(4..=7usize);
                Shape::regular_polygon(pos, rng.gen_range(15.0..28.0), sides)
            }
        };
        let speed: f32 = rng.gen_range(30.0..120.0);
        let heading: f32 = rng.gen_range(0.0..TAU);
        let velocity = Vec2::new(heading.cos(), heading.sin()).scale(speed);

        let id = self.next_id;
        self.next_id += 1;
        Body { id, shape, velocity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_scene() {
        let mut a = SceneWorld::new(11, 1400.0, 800.0);
        let mut b = SceneWorld::new(11, 1400.0, 800.0);
        a.ensure_count(25);
        b.ensure_count(25);
        for _ in 0..120 {
            a.update(1.0 / 60.0, 1.0);
            b.update(1.0 / 60.0, 1.0);
        }
        assert_eq!(a.bodies(), b.bodies());
    }

    #[test]
    fn ensure_count_grows_and_truncates() {
        let mut w = SceneWorld::new(3, 600.0, 400.0);
        w.ensure_count(10);
        assert_eq!(w.len(), 10);
        let ids: Vec<u64> = w.bodies().iter().map(|b| b.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        w.ensure_count(4);
        assert_eq!(w.len(), 4);
        w.ensure_count(5);
        assert_eq!(w.bodies()[4].id, 10, "ids are never reused");
    }

    #[test]
    fn spawned_shapes_start_inside_margin() {
        let mut w = SceneWorld::new(8, 1400.0, 800.0);
        w.ensure_count(200);
        for b in w.bodies() {
            let p = b.shape.position();
            assert!((SPAWN_MARGIN..=1400.0 - SPAWN_MARGIN).contains(&p.x()));
            assert!((SPAWN_MARGIN..=800.0 - SPAWN_MARGIN).contains(&p.y()));
            let speed = b.velocity.length();
            assert!((29.9..=120.1).contains(&speed), "speed {speed}");
        }
    }

    #[test]
    fn bodies_stay_inside_walls() {
        let mut w = SceneWorld::new(21, 400.0, 300.0);
        w.ensure_count(20);
        for _ in 0..2_000 {
            w.update(1.0 / 60.0, 3.0);
        }
        for b in w.bodies() {
            let bb = b.shape.compute_aabb();
            assert!(bb.min().x() >= WALL_MARGIN - 1e-3);
            assert!(bb.min().y() >= WALL_MARGIN - 1e-3);
            assert!(bb.max().x() <= 400.0 - WALL_MARGIN + 1e-3);
            assert!(bb.max().y() <= 300.0 - WALL_MARGIN + 1e-3);
        }
    }

    #[test]
    fn spawn_and_remove_track_indices() {
        let mut w = SceneWorld::new(1, 500.0, 500.0);
        w.ensure_count(2);
        let id = w.spawn_at(Vec2::new(250.0, 250.0));
        assert_eq!(w.bodies()[2].shape.position(), Vec2::new(250.0, 250.0));
        assert_eq!(w.remove(0).map(|b| b.id), Some(0));
        assert_eq!(w.bodies()[1].id, id);
        assert!(w.remove(5).is_none());
    }

    #[test]
    fn polygon_cache_tracks_pose_after_update() {
        let mut w = SceneWorld::new(4, 1400.0, 800.0);
        w.ensure_count(30);
        w.update(0.25, 1.0);
        for b in w.bodies().iter().filter(|b| !b.shape.is_circle()) {
            let mut fresh = b.shape.clone();
            fresh.update_world_verts();
            assert_eq!(fresh.world_vertices(), b.shape.world_vertices());
        }
    }
}
