//! Criterion benchmarks for exact inference on the built-in model.
//!
//! Networks are built once up front; only inference and what-if ranking
//! are measured.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cr_config::{ModelConfig, Policy};
use cr_core::evidence::Evidence;
use cr_core::inference::{infer_with_order, EliminationOrder};
use cr_core::model::{build_network, build_reference_network, generator_for};
use cr_core::sensitivity::analyze_sensitivity;
use cr_math::BetaParams;

const TARGET: &str = "ConcentrationDrop";

fn bench_infer(c: &mut Criterion) {
    let network = build_reference_network(&ModelConfig::default()).expect("valid model");
    let scenarios = [
        ("empty", Evidence::new()),
        (
            "overworked",
            Evidence::resolve(&network, [("Overworked", true)]).expect("valid evidence"),
        ),
        (
            "mistake_observed",
            Evidence::resolve(&network, [("CarelessMistake", true)]).expect("valid evidence"),
        ),
    ];

    let mut group = c.benchmark_group("infer");
    for order in [EliminationOrder::ReverseTopological, EliminationOrder::MinFill] {
        for (name, evidence) in &scenarios {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", order), name),
                evidence,
                |b, ev| {
                    b.iter(|| {
                        let result =
                            infer_with_order(black_box(&network), black_box(ev), TARGET, &order)
                                .expect("inference should succeed");
                        black_box(result.p_yes());
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_sensitivity(c: &mut Criterion) {
    let network = build_reference_network(&ModelConfig::default()).expect("valid model");
    let policy = Policy::default();
    let evidence = Evidence::resolve(
        &network,
        [
            ("Overworked", true),
            ("SleepDeprived", true),
            ("SmartphoneDistraction", true),
        ],
    )
    .expect("valid evidence");

    c.bench_function("what_if/all_factors", |b| {
        b.iter(|| {
            let suggestions = analyze_sensitivity(
                black_box(&network),
                black_box(&evidence),
                TARGET,
                0.95,
                &policy.actionable_factors,
                policy.sensitivity.min_reduction,
            )
            .expect("ranking should succeed");
            black_box(suggestions.len());
        })
    });
}

fn bench_build(c: &mut Criterion) {
    let config = ModelConfig::default();
    let generator = generator_for(&config);
    let params = BetaParams::new(12.0, 9.0).expect("valid params");

    c.bench_function("build_network/learned", |b| {
        b.iter(|| {
            let network = build_network(black_box(&config), black_box(&params), &generator)
                .expect("valid network");
            black_box(network.len());
        })
    });
}

criterion_group!(benches, bench_infer, bench_sensitivity, bench_build);
criterion_main!(benches);
