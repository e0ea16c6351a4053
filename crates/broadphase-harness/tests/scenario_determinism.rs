// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scenario-level determinism and exactness checks.

use broadphase_geom::{BroadPhaseMode, PairClass};
use broadphase_harness::config::ScenarioPrefs;
use broadphase_harness::harness::{inspect, run_scenario, torture, verify_scenario};

fn prefs(seed: u64, shapes: usize) -> ScenarioPrefs {
    ScenarioPrefs {
        seed,
        shape_count: shapes,
        ..ScenarioPrefs::default()
    }
}

#[test]
fn repeated_runs_produce_identical_digest_chains() {
    let p = prefs(1234, 60);
    let a = run_scenario(&p, 120);
    let b = run_scenario(&p, 120);
    assert_eq!(a.digests.len(), 120);
    assert_eq!(a, b);
}

#[test]
fn different_seeds_diverge() {
    let a = run_scenario(&prefs(1, 30), 10);
    let b = run_scenario(&prefs(2, 30), 10);
    assert_ne!(a.digests, b.digests);
}

#[test]
fn bvh_matches_brute_force_every_tick() {
    let checked = verify_scenario(&prefs(99, 150), 240).unwrap();
    assert_eq!(checked, 240);
}

#[test]
fn comparison_mode_counts_no_mismatches() {
    let p = ScenarioPrefs {
        compare_brute_force: true,
        ..prefs(5, 200)
    };
    let summary = run_scenario(&p, 60);
    assert_eq!(summary.mismatch_ticks, 0);
    assert!(summary.broad_phase_pairs > 0);
}

#[test]
fn dense_scene_hits_every_classification() {
    let p = ScenarioPrefs {
        world_width: 300.0,
        world_height: 300.0,
        ..prefs(17, 80)
    };
    let summary = run_scenario(&p, 30);
    assert!(summary.actual_collisions > 0);
    assert!(summary.false_positives > 0);
    assert_eq!(
        summary.actual_collisions + summary.false_positives,
        summary.broad_phase_pairs
    );
}

#[test]
fn torture_passes_for_a_deterministic_scene() {
    let baseline = torture(&prefs(3, 50), 40, 4).unwrap();
    assert_eq!(baseline.ticks, 40);
}

#[test]
fn inspect_exports_consistent_frame() {
    let p = ScenarioPrefs {
        compare_brute_force: true,
        ..prefs(42, 25)
    };
    let frame = inspect(&p, 10, Some(3)).unwrap();
    assert_eq!(frame.shapes.len(), 25);
    assert_eq!(frame.nodes.len(), 2 * 25 - 1);
    assert_eq!(frame.stats.bvh_node_count, frame.nodes.len());
    assert_eq!(frame.brute_pairs.as_deref(), Some(frame.broad_pairs.as_slice()));
    assert_eq!(frame.classified.len(), frame.broad_pairs.len());
    assert_eq!(
        frame.classified.iter().filter(|c| c.class == PairClass::Confirmed).count(),
        frame.stats.actual_collisions
    );

    let trace = frame.trace.as_ref().unwrap();
    assert!(!trace.steps.is_empty());
    assert!(!trace.candidates.contains(&3));

    // The frame digest matches the last entry of a plain run.
    let run = run_scenario(&p, 10);
    assert_eq!(run.digests.last(), Some(&frame.digest));

    let json = serde_json::to_value(&frame).unwrap();
    assert_eq!(json["prefs"]["mode"], "bvh");
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(49));
}

#[test]
fn brute_force_mode_reports_brute_counts() {
    let p = ScenarioPrefs {
        mode: BroadPhaseMode::BruteForce,
        ..prefs(8, 40)
    };
    let frame = inspect(&p, 5, None).unwrap();
    assert_eq!(frame.stats.brute_force_pairs, Some(frame.broad_pairs.len()));
    assert!(frame.trace.is_none());
}
