//! Property-based tests for inference engine invariants.
//!
//! Random small binary networks are checked against full joint enumeration.

use cr_core::evidence::Evidence;
use cr_core::inference::{infer, infer_with_order, EliminationOrder};
use cr_core::network::{Cpt, CptGenerator, Network, NetworkBuilder, SigmoidActivation, BINARY};
use cr_math::BetaParams;
use proptest::prelude::*;

const MAX_PARENTS: usize = 3;

/// Per variable: a parent mask over earlier variables and up to 8 row values.
type NetworkShape = Vec<(u8, Vec<f64>)>;

fn network_shape_strategy() -> impl Strategy<Value = NetworkShape> {
    (2usize..=6).prop_flat_map(|n| {
        prop::collection::vec(
            (any::<u8>(), prop::collection::vec(0.05f64..0.95, 1 << MAX_PARENTS)),
            n,
        )
    })
}

fn var_name(i: usize) -> String {
    format!("X{}", i)
}

fn parents_of(shape: &NetworkShape, i: usize) -> Vec<usize> {
    (0..i)
        .filter(|&j| shape[i].0 & (1 << j) != 0)
        .take(MAX_PARENTS)
        .collect()
}

fn build(shape: &NetworkShape) -> Network {
    let mut builder = NetworkBuilder::new();
    for i in 0..shape.len() {
        builder.add_variable(&var_name(i), BINARY).unwrap();
    }
    for i in 0..shape.len() {
        let parents = parents_of(shape, i);
        for &p in &parents {
            builder.add_edge(&var_name(p), &var_name(i)).unwrap();
        }
        let names: Vec<String> = parents.iter().map(|&p| var_name(p)).collect();
        let rows = &shape[i].1[..1 << parents.len()];
        builder.set_cpt(&var_name(i), Cpt::binary(names, rows)).unwrap();
    }
    builder.build().unwrap()
}

/// P(target = Yes | evidence) by summing the full joint.
fn brute_force(network: &Network, evidence: &[(usize, usize)], target: usize) -> f64 {
    let n = network.len();
    let mut yes = 0.0;
    let mut total = 0.0;
    for assignment in 0..1usize << n {
        let state = |v: usize| (assignment >> v) & 1;
        if evidence.iter().any(|&(v, s)| state(v) != s) {
            continue;
        }
        let mut joint = 1.0;
        for v in 0..n {
            let parent_states: Vec<usize> =
                network.parent_ids(v).iter().map(|&p| state(p)).collect();
            let cards = vec![BINARY; parent_states.len()];
            let row = Cpt::row_index(&parent_states, &cards);
            joint *= network.cpt(v).probability(row, state(v)).unwrap();
        }
        total += joint;
        if state(target) == 1 {
            yes += joint;
        }
    }
    yes / total
}

/// Evidence on every variable whose bit is set in `mask`, except `target`.
fn evidence_from_mask(network: &Network, mask: u8, values: u8, target: usize) -> (Evidence, Vec<(usize, usize)>) {
    let picked: Vec<(usize, usize)> = (0..network.len())
        .filter(|&v| v != target && mask & (1 << v) != 0)
        .map(|v| (v, ((values >> v) & 1) as usize))
        .collect();
    let names: Vec<(String, usize)> = picked.iter().map(|&(v, s)| (var_name(v), s)).collect();
    let evidence =
        Evidence::from_states(network, names.iter().map(|(n, s)| (n.as_str(), *s))).unwrap();
    (evidence, picked)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn marginals_match_joint_enumeration(shape in network_shape_strategy()) {
        let network = build(&shape);
        for target in 0..network.len() {
            let result = infer(&network, &Evidence::new(), &var_name(target)).unwrap();
            let expected = brute_force(&network, &[], target);
            prop_assert!((result.p_yes() - expected).abs() < 1e-6,
                "target={target} got={} expected={expected}", result.p_yes());
            prop_assert!((result.p_no() + result.p_yes() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn posteriors_match_joint_enumeration(
        shape in network_shape_strategy(),
        mask in any::<u8>(),
        values in any::<u8>(),
        target_seed in any::<usize>(),
    ) {
        let network = build(&shape);
        let target = target_seed % network.len();
        let (evidence, picked) = evidence_from_mask(&network, mask, values, target);

        let result = infer(&network, &evidence, &var_name(target)).unwrap();
        let expected = brute_force(&network, &picked, target);
        prop_assert!((result.p_yes() - expected).abs() < 1e-6,
            "got={} expected={expected}", result.p_yes());
    }

    #[test]
    fn elimination_order_does_not_change_result(
        shape in network_shape_strategy(),
        mask in any::<u8>(),
        values in any::<u8>(),
    ) {
        let network = build(&shape);
        let target = network.len() - 1;
        let (evidence, _) = evidence_from_mask(&network, mask, values, target);
        let target_name = var_name(target);

        let hidden: Vec<String> = (0..network.len())
            .map(var_name)
            .filter(|n| *n != target_name && !evidence.contains(n))
            .collect();

        let baseline = infer(&network, &evidence, &target_name).unwrap().p_yes();
        for order in [
            EliminationOrder::MinFill,
            EliminationOrder::Explicit(hidden.clone()),
            EliminationOrder::Explicit(hidden.iter().rev().cloned().collect()),
        ] {
            let p = infer_with_order(&network, &evidence, &target_name, &order)
                .unwrap()
                .p_yes();
            prop_assert!((p - baseline).abs() < 1e-9, "{order:?}: {p} vs {baseline}");
        }
    }

    #[test]
    fn generated_rows_are_monotone_in_active_parents(
        alpha in 0.1f64..100.0,
        beta in 0.1f64..100.0,
    ) {
        let generator = SigmoidActivation::default();
        let params = BetaParams::new(alpha, beta).unwrap();
        let base = params.mean();
        for active in 0..3 {
            prop_assert!(generator.p_yes(base, active) <= generator.p_yes(base, active + 1));
        }

        let parents: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let cpt = generator.generate(&params, &parents);
        for row in cpt.rows() {
            prop_assert!(row[1] >= 0.01 && row[1] <= 0.99);
            prop_assert!((row[0] + row[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn higher_base_rate_never_lowers_a_row(
        a in 0.1f64..50.0,
        b in 0.1f64..50.0,
        extra in 0.0f64..50.0,
    ) {
        let generator = SigmoidActivation::default();
        let parents: Vec<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let low = generator.generate(&BetaParams::new(a, b).unwrap(), &parents);
        let high = generator.generate(&BetaParams::new(a + extra, b).unwrap(), &parents);
        for (l, h) in low.rows().iter().zip(high.rows()) {
            prop_assert!(h[1] + 1e-12 >= l[1]);
        }
    }
}
