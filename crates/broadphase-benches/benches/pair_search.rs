#![allow(missing_docs)]
use broadphase_geom::broad::brute::brute_force_pairs_into;
use broadphase_geom::{Aabb, Bvh, Vec2};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn scattered_boxes(n: usize) -> Vec<Aabb> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5ca7);
    (0..n)
        .map(|_| {
            let c = Vec2::new(rng.gen_range(0.0..1400.0), rng.gen_range(0.0..800.0));
            Aabb::from_center_half_extents(c, 20.0, 20.0)
        })
        .collect()
}

fn bench_spread(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_search/spread");
    for &n in &[30usize, 300, 3_000] {
        let aabbs = scattered_boxes(n);
        let bvh = Bvh::build(&aabbs);
        let mut out = Vec::new();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("bvh_self_query", n), |b| {
            b.iter(|| bvh.find_all_pairs_into(&mut out));
        });
        group.bench_function(BenchmarkId::new("brute_force", n), |b| {
            b.iter(|| brute_force_pairs_into(&aabbs, &mut out));
        });
    }
    group.finish();
}

// All boxes coincide: pruning never fires and the self-query goes quadratic.
fn bench_coincident(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_search/coincident");
    for &n in &[30usize, 300] {
        let aabbs = vec![Aabb::from_center_half_extents(Vec2::ZERO, 5.0, 5.0); n];
        let bvh = Bvh::build(&aabbs);
        let mut out = Vec::new();
        group.bench_function(BenchmarkId::new("bvh_self_query", n), |b| {
            b.iter(|| bvh.find_all_pairs_into(&mut out));
        });
        group.bench_function(BenchmarkId::new("brute_force", n), |b| {
            b.iter(|| brute_force_pairs_into(&aabbs, &mut out));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_spread, bench_coincident);
criterion_main!(benches);
