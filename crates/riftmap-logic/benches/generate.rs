use criterion::{black_box, criterion_group, criterion_main, Criterion};

use riftmap_logic::config::SectorSpec;
use riftmap_logic::generate::generate;

fn bench_generate(c: &mut Criterion) {
    let spec = SectorSpec::default();
    let mut seed = 0u64;
    c.bench_function("generate_default_sector", |b| {
        b.iter(|| {
            seed += 1;
            generate(black_box(&spec), seed)
        })
    });
}

fn bench_generate_with_joints(c: &mut Criterion) {
    let mut spec = SectorSpec::default();
    spec.rifts.joint_chance = 0.5;
    c.bench_function("generate_joined_rifts", |b| {
        b.iter(|| generate(black_box(&spec), 42))
    });
}

criterion_group!(benches, bench_generate, bench_generate_with_joints);
criterion_main!(benches);
