//! Fuzz target for diagnosis requests against the built-in model.
//!
//! Arbitrary observation names, states and measurements must produce
//! either a diagnosis with a valid distribution or an error.

#![no_main]

use arbitrary::Arbitrary;
use cr_config::{ModelConfig, Policy};
use cr_core::diagnosis::{diagnose, DiagnosisRequest};
use cr_core::model::build_reference_network;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    observations: Vec<(String, bool)>,
    measurements: Vec<(String, f64)>,
    target: String,
    what_if: bool,
}

fuzz_target!(|input: Input| {
    let Ok(network) = build_reference_network(&ModelConfig::default()) else {
        return;
    };
    let request = DiagnosisRequest {
        observations: input.observations.into_iter().collect(),
        measurements: input.measurements.into_iter().collect(),
        what_if: input.what_if,
    };
    let policy = Policy::default();

    for target in [input.target.as_str(), "ConcentrationDrop"] {
        if let Ok(d) = diagnose(&network, &request, &policy, target) {
            assert!((d.p_no + d.p_yes - 1.0).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&d.risk_score));
        }
    }
});
