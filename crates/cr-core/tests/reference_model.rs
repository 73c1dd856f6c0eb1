//! Hand-checked values on the built-in concentration model.

use cr_config::{ModelConfig, Policy};
use cr_core::diagnosis::{diagnose, DiagnosisRequest, RiskLevel};
use cr_core::evidence::Evidence;
use cr_core::inference::infer;
use cr_core::model::{build_network, build_reference_network, generator_for};
use cr_core::network::Network;
use cr_core::sensitivity::{analyze_sensitivity, DEFAULT_MIN_REDUCTION};
use cr_math::BetaParams;

const TARGET: &str = "ConcentrationDrop";

fn reference() -> Network {
    build_reference_network(&ModelConfig::default()).expect("reference model is valid")
}

fn evidence(net: &Network, obs: &[(&str, bool)]) -> Evidence {
    Evidence::resolve(net, obs.iter().copied()).expect("valid evidence")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn overworked_only() {
    let net = reference();
    let result = infer(&net, &evidence(&net, &[("Overworked", true)]), TARGET).unwrap();
    assert!(close(result.p_yes(), 0.6675), "{}", result.p_yes());
    assert!(close(result.p_no(), 0.3325));
}

#[test]
fn prior_marginals() {
    let net = reference();
    let empty = Evidence::new();
    assert!(close(infer(&net, &empty, TARGET).unwrap().p_yes(), 0.3795));
    assert!(close(
        infer(&net, &empty, "CarelessMistake").unwrap().p_yes(),
        0.28975
    ));
    assert!(close(infer(&net, &empty, "Overworked").unwrap().p_yes(), 0.2));
}

#[test]
fn full_parent_evidence_reads_the_table() {
    let net = reference();
    let all_yes = evidence(
        &net,
        &[
            ("Overworked", true),
            ("SleepDeprived", true),
            ("SmartphoneDistraction", true),
        ],
    );
    assert!(close(infer(&net, &all_yes, TARGET).unwrap().p_yes(), 0.95));

    let all_no = evidence(
        &net,
        &[
            ("Overworked", false),
            ("SleepDeprived", false),
            ("SmartphoneDistraction", false),
        ],
    );
    assert!(close(infer(&net, &all_no, TARGET).unwrap().p_yes(), 0.05));
}

#[test]
fn mistake_evidence_raises_concentration_drop() {
    let net = reference();
    let prior = infer(&net, &Evidence::new(), TARGET).unwrap().p_yes();
    let after = infer(&net, &evidence(&net, &[("CarelessMistake", true)]), TARGET)
        .unwrap()
        .p_yes();
    // 0.6 * 0.3795 / 0.28975
    assert!(close(after, 0.6 * 0.3795 / 0.28975));
    assert!(after > prior);
}

#[test]
fn only_overworked_is_suggested() {
    let net = reference();
    let ev = evidence(
        &net,
        &[
            ("Overworked", true),
            ("SleepDeprived", false),
            ("SmartphoneDistraction", false),
        ],
    );
    let baseline = infer(&net, &ev, TARGET).unwrap().p_yes();
    assert!(close(baseline, 0.40));

    let policy = Policy::default();
    let suggestions = analyze_sensitivity(
        &net,
        &ev,
        TARGET,
        baseline,
        &policy.actionable_factors,
        DEFAULT_MIN_REDUCTION,
    )
    .unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].factor, "Overworked");
    assert!(close(suggestions[0].reduction, 0.35));
    assert!(!suggestions[0].advice.is_empty());
}

#[test]
fn all_factors_ranked_with_ties_in_declaration_order() {
    let net = reference();
    let ev = evidence(
        &net,
        &[
            ("Overworked", true),
            ("SleepDeprived", true),
            ("SmartphoneDistraction", true),
        ],
    );
    let policy = Policy::default();
    let suggestions = analyze_sensitivity(
        &net,
        &ev,
        TARGET,
        0.95,
        &policy.actionable_factors,
        DEFAULT_MIN_REDUCTION,
    )
    .unwrap();

    let factors: Vec<&str> = suggestions.iter().map(|s| s.factor.as_str()).collect();
    assert_eq!(
        factors,
        vec!["Overworked", "SmartphoneDistraction", "SleepDeprived"]
    );
    assert!(close(suggestions[0].reduction, 0.25));
    assert!(close(suggestions[1].reduction, 0.25));
    assert!(close(suggestions[2].reduction, 0.15));
}

#[test]
fn diagnosis_levels_span_the_table() {
    let net = reference();
    let policy = Policy::default();
    let request = |o, s, p| DiagnosisRequest {
        observations: [
            ("Overworked".to_string(), o),
            ("SleepDeprived".to_string(), s),
            ("SmartphoneDistraction".to_string(), p),
        ]
        .into_iter()
        .collect(),
        ..DiagnosisRequest::default()
    };

    let danger = diagnose(&net, &request(true, true, true), &policy, TARGET).unwrap();
    assert_eq!(danger.risk_level, RiskLevel::Danger);
    assert_eq!(danger.risk_score, 0.95);

    let safe = diagnose(&net, &request(false, false, false), &policy, TARGET).unwrap();
    assert_eq!(safe.risk_level, RiskLevel::Safe);
    assert_eq!(safe.advice, policy.advice.safe);
}

#[test]
fn learned_network_with_neutral_prior() {
    let config = ModelConfig::default();
    let params = BetaParams::new(10.0, 10.0).unwrap();
    let net = build_network(&config, &params, &generator_for(&config)).unwrap();

    let all_yes = evidence(
        &net,
        &[
            ("Overworked", true),
            ("SleepDeprived", true),
            ("SmartphoneDistraction", true),
        ],
    );
    let p = infer(&net, &all_yes, TARGET).unwrap().p_yes();
    assert!((p - 0.731_058_578_630_004_9).abs() < 1e-9, "{p}");

    let marginal = infer(&net, &Evidence::new(), TARGET).unwrap().p_yes();
    assert!((marginal - 0.291_711_043_568_990_75).abs() < 1e-9, "{marginal}");
}

#[test]
fn learned_network_is_deterministic() {
    let config = ModelConfig::default();
    let params = BetaParams::new(13.0, 7.0).unwrap();
    let generator = generator_for(&config);
    let a = build_network(&config, &params, &generator).unwrap();
    let b = build_network(&config, &params, &generator).unwrap();
    assert_eq!(a.cpt_of(TARGET).unwrap(), b.cpt_of(TARGET).unwrap());
}
