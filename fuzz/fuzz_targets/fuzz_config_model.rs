//! Fuzz target for model.json parsing and network construction.
//!
//! Any model that passes validation must build; anything else must be
//! rejected with an error, never a panic.

#![no_main]

use cr_config::model::ModelConfig;
use cr_config::validate::validate_model;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(model) = serde_json::from_slice::<ModelConfig>(data) else {
        return;
    };
    if validate_model(&model).is_err() {
        return;
    }
    let _ = cr_core::model::build_reference_network(&model);
});
