//! Benchmarks for exact inference on the credit network.
//!
//! Run with:
//! - `cargo bench --bench elimination`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use credence_core::engine::elimination::{
    posterior_marginal_with_config, EliminationConfig, EliminationOrder,
};
use credence_core::engine::enumeration::enumerate_posterior;
use credence_core::models::credit_net::{
    credit_net, AGE, ASSETS, CREDIT_WORTHINESS, EDUCATION, GAMBLER, RATIO_OF_DEBTS_TO_INCOME,
    RELIABILITY, FUTURE_INCOME,
};
use credence_core::Evidence;

fn evidence_sets(network: &credence_core::BayesNet) -> Vec<(&'static str, Evidence)> {
    let build = |readings: &[(&str, usize)]| {
        Evidence::from_observations(network, readings.iter().map(|(n, o)| (*n, Some(*o))))
            .expect("evidence")
    };
    vec![
        ("none", Evidence::new()),
        ("roots", build(&[(AGE, 1), (GAMBLER, 1), (EDUCATION, 2)])),
        ("leaf_parents", build(&[(RATIO_OF_DEBTS_TO_INCOME, 0), (RELIABILITY, 1), (FUTURE_INCOME, 0)])),
        ("mixed", build(&[(AGE, 0), (ASSETS, 2)])),
    ]
}

fn bench_elimination_orders(c: &mut Criterion) {
    let network = credit_net().expect("credit net");
    let target = network.id_of(CREDIT_WORTHINESS).expect("target");
    let mut group = c.benchmark_group("credit_worthiness_posterior");

    for (label, evidence) in evidence_sets(&network) {
        for (name, order, prune) in [
            ("reverse_topological", EliminationOrder::ReverseTopological, true),
            ("min_weight", EliminationOrder::MinWeight, true),
            ("reverse_topological_unpruned", EliminationOrder::ReverseTopological, false),
        ] {
            let config = EliminationConfig {
                order,
                prune_barren: prune,
                ..EliminationConfig::default()
            };
            group.bench_with_input(BenchmarkId::new(name, label), &evidence, |b, ev| {
                b.iter(|| {
                    black_box(
                        posterior_marginal_with_config(
                            black_box(&network),
                            black_box(ev),
                            target,
                            &config,
                        )
                        .expect("posterior"),
                    )
                });
            });
        }

        group.bench_with_input(BenchmarkId::new("enumeration", label), &evidence, |b, ev| {
            b.iter(|| {
                black_box(enumerate_posterior(black_box(&network), black_box(ev), target).expect("posterior"))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_elimination_orders);
criterion_main!(benches);
