//! Fuzz target for policy.json configuration parsing.

#![no_main]

use cr_config::model::ModelConfig;
use cr_config::policy::Policy;
use cr_config::validate::{validate_policy, validate_policy_against_model};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(policy) = serde_json::from_slice::<Policy>(data) {
        let _ = validate_policy(&policy);
        let _ = validate_policy_against_model(&policy, &ModelConfig::default());
    }
});
