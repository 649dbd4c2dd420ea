use criterion::{criterion_group, criterion_main, Criterion};

use ramboir::config::RamboConfig;
use ramboir::core::*;
use ramboir::integrators::compute_decay_width;
use ramboir::kinematics::FourMomentum;
use ramboir::phase_space::generate_phase_space_point;

use rand_pcg::Pcg64;

/// A matrix element that touches every momentum, so that evaluating it is not optimized away.
fn matrix_element(momenta: &[FourMomentum<f64>]) -> f64 {
    momenta
        .windows(2)
        .map(|pair| pair[0].dot(&pair[1]))
        .sum::<f64>()
}

fn benchmark_point(final_state: &FinalState<f64>) {
    // initialize the random number generator
    let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);

    for _ in 0..1_000 {
        let _ = generate_phase_space_point(final_state, &mut rng);
    }
}

fn benchmark_decay_width(final_state: &FinalState<f64>, workers: usize) {
    let config = RamboConfig::builder()
        .workers(workers)
        .seed(0xcafef00dd15ea5e5)
        .build()
        .unwrap();

    let _ = compute_decay_width(final_state, &matrix_element, 100_000, &config);
}

fn criterion_rambo_benchmark(c: &mut Criterion) {
    let massless = FinalState::new(vec![0.0; 4], 10.0).unwrap();
    let massive = FinalState::new(vec![0.1, 0.5, 1.0, 2.0], 10.0).unwrap();

    c.bench_function("point massless 4-body", |b| {
        b.iter(|| benchmark_point(&massless))
    });
    c.bench_function("point massive 4-body", |b| {
        b.iter(|| benchmark_point(&massive))
    });
    c.bench_function("decay width 1 worker", |b| {
        b.iter(|| benchmark_decay_width(&massive, 1))
    });
    c.bench_function("decay width 4 workers", |b| {
        b.iter(|| benchmark_decay_width(&massive, 4))
    });
}

criterion_group!(benches, criterion_rambo_benchmark);
criterion_main!(benches);
