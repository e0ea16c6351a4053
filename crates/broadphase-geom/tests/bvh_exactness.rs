// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Integration tests for the BVH: pair-set exactness against brute force,
//! query equivalence, structure counts and rebuild determinism.

use broadphase_geom::broad::verify::{verify_pair_set, verify_rebuild_determinism};
use broadphase_geom::{brute_force_pairs, Aabb, BroadPhase, BruteForce, Bvh, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_boxes(seed: u64, n: usize, world: f32, max_half: f32) -> Vec<Aabb> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let c = Vec2::new(rng.gen_range(0.0..world), rng.gen_range(0.0..world));
            let hx = rng.gen_range(0.5..max_half);
            let hy = rng.gen_range(0.5..max_half);
            Aabb::from_center_half_extents(c, hx, hy)
        })
        .collect()
}

fn assert_exact(aabbs: &[Aabb]) {
    let bvh = Bvh::build(aabbs);
    let got = bvh.find_all_pairs();
    let oracle = brute_force_pairs(aabbs);
    assert_eq!(verify_pair_set(&got, &oracle), Ok(()));
    // Both lists are canonical and sorted, so they compare directly too.
    assert_eq!(got, oracle);
}

#[test]
fn exact_for_zero_one_and_two_shapes() {
    assert_exact(&[]);
    assert_exact(&random_boxes(1, 1, 100.0, 5.0));

    let a = Aabb::from_center_half_extents(Vec2::new(0.0, 0.0), 1.0, 1.0);
    let b = Aabb::from_center_half_extents(Vec2::new(1.5, 0.0), 1.0, 1.0);
    let far = Aabb::from_center_half_extents(Vec2::new(50.0, 0.0), 1.0, 1.0);
    assert_exact(&[a, b]);
    assert_exact(&[a, far]);
    assert_eq!(Bvh::build(&[a, b]).find_all_pairs(), vec![(0, 1)]);
}

#[test]
fn exact_for_two_hundred_shapes() {
    for seed in 0..8 {
        assert_exact(&random_boxes(seed, 200, 1000.0, 30.0));
    }
}

#[test]
fn exact_for_all_coincident_boxes() {
    let n = 64;
    let aabbs = vec![Aabb::from_center_half_extents(Vec2::new(3.0, 3.0), 2.0, 2.0); n];
    let pairs = Bvh::build(&aabbs).find_all_pairs();
    assert_eq!(pairs.len(), n * (n - 1) / 2);
    assert_exact(&aabbs);
}

#[test]
fn exact_for_touching_grid() {
    // Unit cells sharing edges and corners with their neighbours.
    let aabbs: Vec<Aabb> = (0..10)
        .flat_map(|y| {
            (0..10).map(move |x| {
                let min = Vec2::new(x as f32, y as f32);
                Aabb::new(min, min.add(&Vec2::new(1.0, 1.0)))
            })
        })
        .collect();
    assert_exact(&aabbs);
}

#[test]
fn pairs_have_no_self_or_duplicate_entries() {
    let aabbs = random_boxes(42, 150, 300.0, 20.0);
    let pairs = Bvh::build(&aabbs).find_all_pairs();
    assert!(pairs.iter().all(|&(a, b)| a < b));
    assert!(pairs.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn query_matches_linear_scan() {
    let aabbs = random_boxes(7, 120, 500.0, 25.0);
    let bvh = Bvh::build(&aabbs);
    let probes = random_boxes(8, 40, 500.0, 60.0);
    for (k, probe) in probes.iter().enumerate() {
        let exclude = (k % 3 == 0).then_some(k);
        let mut got = bvh.query(probe, exclude);
        got.sort_unstable();
        let expected: Vec<usize> = aabbs
            .iter()
            .enumerate()
            .filter(|&(i, b)| Some(i) != exclude && b.overlaps(probe))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, expected, "probe {k}");
    }
}

#[test]
fn node_counts_follow_leaf_count() {
    assert!(Bvh::build(&[]).nodes().is_empty());
    for n in [1usize, 2, 3, 7, 8, 9, 100] {
        let bvh = Bvh::build(&random_boxes(n as u64, n, 200.0, 10.0));
        let stats = bvh.stats();
        assert_eq!(stats.leaf_count, n);
        assert_eq!(stats.internal_count, n - 1);
        assert_eq!(bvh.nodes()[0].subtree_size(), n);
        // Median split: height is ceil(log2 n).
        assert_eq!(bvh.max_depth(), n.next_power_of_two().trailing_zeros() as usize);
    }
}

#[test]
fn rebuild_yields_identical_nodes() {
    let aabbs = random_boxes(99, 200, 800.0, 30.0);
    assert_eq!(verify_rebuild_determinism(&aabbs), Ok(()));
    assert_eq!(Bvh::build(&aabbs).nodes(), Bvh::build(&aabbs).nodes());
}

#[test]
fn broad_phase_implementations_agree() {
    let aabbs = random_boxes(5, 80, 200.0, 15.0);
    let mut impls: Vec<Box<dyn BroadPhase>> = vec![Box::new(Bvh::new()), Box::new(BruteForce::new())];
    let results: Vec<_> = impls
        .iter_mut()
        .map(|bp| {
            bp.rebuild(&aabbs);
            bp.pairs()
        })
        .collect();
    assert_eq!(results[0], results[1]);
}
