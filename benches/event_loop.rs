//! Event-loop throughput of the packing engine at a few densities.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use spherepack::Simulation;

const EVENTS: usize = 10_000;

fn seeded<const D: usize>(n: usize, packing_fraction: f64) -> Simulation<D> {
    let mut sim = Simulation::<D>::with_packing_fraction(n, packing_fraction, 0.0, 0.6, Some(2024))
        .expect("valid parameters");
    sim.create_spheres(1.0).expect("placement");
    sim
}

fn benchmark_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    group.throughput(Throughput::Elements(EVENTS as u64));

    for &pf in &[0.05, 0.15, 0.25] {
        group.bench_with_input(BenchmarkId::new("3d_n1000", pf), &pf, |b, &pf| {
            let mut sim = seeded::<3>(1000, pf);
            b.iter(|| black_box(sim.process(EVENTS).expect("events")));
        });
    }
    group.bench_function("2d_n1000_pf0.4", |b| {
        let mut sim = seeded::<2>(1000, 0.4);
        b.iter(|| black_box(sim.process(EVENTS).expect("events")));
    });
    group.finish();
}

fn benchmark_synchronize(c: &mut Criterion) {
    c.bench_function("synchronize_rescale_3d_n1000", |b| {
        let mut sim = seeded::<3>(1000, 0.2);
        b.iter(|| {
            sim.process(1000).expect("events");
            sim.synchronize(true).expect("synchronize");
        });
    });
}

criterion_group!(benches, benchmark_process, benchmark_synchronize);
criterion_main!(benches);
