use bvhbuild::{
    Aabb, BuildSettings, NullMonitor, Point3, PrimInfo, PrimRef, build,
    factories::aabb_node::AabbNodeFactory,
};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};

fn random_prims(count: usize) -> Vec<PrimRef> {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|i| {
            let center = Point3::new(rng.random(), rng.random(), rng.random()) * 100.0;
            let half = 0.01 + rng.random::<f32>() * 0.5;
            let offset = bvhbuild::Vector3::new(half, half, half);
            PrimRef::new(Aabb::new(center - offset, center + offset), 0, i as u32)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let prims = random_prims(100_000);

    let mut group = c.benchmark_group("build_random_100k");
    group.sample_size(10);

    for branching_factor in [2usize, 4, 8] {
        let settings = BuildSettings::builder()
            .branching_factor(branching_factor)
            .build();
        group.bench_function(format!("branching_{branching_factor}"), |b| {
            b.iter_batched(
                || prims.clone(),
                |mut working| {
                    let info = PrimInfo::from_prims(&working);
                    let factory = AabbNodeFactory::new();
                    let root = build(&factory, &NullMonitor, &mut working, info, &settings)
                        .expect("build failed");
                    factory.finish(root)
                },
                BatchSize::LargeInput,
            )
        });
    }

    let sequential = BuildSettings::builder()
        .parallel_threshold(usize::MAX)
        .build();
    group.bench_function("branching_2_sequential", |b| {
        b.iter_batched(
            || prims.clone(),
            |mut working| {
                let info = PrimInfo::from_prims(&working);
                let factory = AabbNodeFactory::new();
                let root = build(&factory, &NullMonitor, &mut working, info, &sequential)
                    .expect("build failed");
                factory.finish(root)
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
