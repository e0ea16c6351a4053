// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end broad then narrow phase scenarios.

use broadphase_geom::{
    classify_pairs, shapes_intersect, Bvh, CollisionPipeline, PairClass, PipelineConfig, Shape,
    Vec2,
};

fn aabbs(shapes: &[Shape]) -> Vec<broadphase_geom::Aabb> {
    shapes.iter().map(Shape::compute_aabb).collect()
}

#[test]
fn circles_touch_at_exact_radius_sum() {
    let a = Shape::circle(Vec2::ZERO, 10.0);
    assert!(shapes_intersect(&a, &Shape::circle(Vec2::new(20.0, 0.0), 10.0)));
    assert!(!shapes_intersect(&a, &Shape::circle(Vec2::new(20.01, 0.0), 10.0)));
}

#[test]
fn separated_circles_never_reach_narrow_phase() {
    let shapes = vec![
        Shape::circle(Vec2::ZERO, 10.0),
        Shape::circle(Vec2::new(25.0, 0.0), 10.0),
    ];
    let b = aabbs(&shapes);
    assert_eq!(b[0].max().x(), 10.0);
    assert_eq!(b[1].min().x(), 15.0);
    assert!(Bvh::build(&b).find_all_pairs().is_empty());
}

#[test]
fn close_circles_pass_both_phases() {
    let shapes = vec![
        Shape::circle(Vec2::ZERO, 10.0),
        Shape::circle(Vec2::new(15.0, 0.0), 10.0),
    ];
    let pairs = Bvh::build(&aabbs(&shapes)).find_all_pairs();
    assert_eq!(pairs, vec![(0, 1)]);
    let report = classify_pairs(&shapes, &pairs);
    assert_eq!(report.class_of((0, 1)), Some(PairClass::Confirmed));
}

#[test]
fn thin_rotated_rectangle_beside_square_is_false_positive() {
    // 2x40 bar along the diagonal y = x; the square sits in the empty
    // upper-left part of the bar's AABB, well off the diagonal.
    let bar = Shape::polygon(
        Vec2::new(20.0, 20.0),
        core::f32::consts::FRAC_PI_4,
        vec![
            Vec2::new(-20.0, -1.0),
            Vec2::new(20.0, -1.0),
            Vec2::new(20.0, 1.0),
            Vec2::new(-20.0, 1.0),
        ],
    );
    let square = Shape::polygon(
        Vec2::new(10.0, 28.0),
        0.0,
        vec![
            Vec2::new(-4.0, -4.0),
            Vec2::new(4.0, -4.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(-4.0, 4.0),
        ],
    );
    let shapes = vec![bar, square];
    let pairs = Bvh::build(&aabbs(&shapes)).find_all_pairs();
    assert_eq!(pairs, vec![(0, 1)], "AABBs must overlap");

    let report = classify_pairs(&shapes, &pairs);
    assert_eq!(report.class_of((0, 1)), Some(PairClass::FalsePositive));
    assert_eq!(report.confirmed_count(), 0);
}

#[test]
fn rotated_triangle_hits_circle_through_pipeline() {
    let mut tri = Shape::triangle(Vec2::new(100.0, 100.0), 20.0);
    tri.set_rotation(0.3);
    tri.update_world_verts();
    let shapes = vec![tri, Shape::circle(Vec2::new(100.0, 112.0), 8.0)];

    let mut pipeline = CollisionPipeline::new(PipelineConfig {
        compare_brute_force: true,
        ..PipelineConfig::default()
    });
    let stats = *pipeline.step(&shapes);
    assert_eq!(stats.broad_phase_pairs, 1);
    assert_eq!(stats.narrow_phase_tests, 1);
    assert_eq!(stats.actual_collisions, 1);
    assert!(!stats.bvh_mismatch);
}
