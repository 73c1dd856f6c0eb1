//! Concentration Risk Core Library
//!
//! This library provides the inference and learning engine behind `crisk`:
//! - Discrete Bayesian network construction and validation
//! - Exact inference by variable elimination
//! - Beta-Bernoulli learning with durable, atomic persistence
//! - Counterfactual (what-if) ranking of actionable factors
//! - Continuous measurement mapping and the diagnosis pipeline
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod diagnosis;
pub mod evidence;
pub mod exit_codes;
pub mod inference;
pub mod learning;
pub mod logging;
pub mod model;
pub mod network;
pub mod sensitivity;
pub mod snapshot;

pub use diagnosis::{diagnose, Diagnosis, DiagnosisRequest, RiskLevel};
pub use evidence::{map_continuous, Evidence};
pub use inference::{infer, infer_with_order, EliminationOrder, InferenceResult};
pub use learning::{LearningStore, ParamsSnapshot};
pub use model::{build_network, build_reference_network};
pub use network::{Cpt, CptGenerator, Network, NetworkBuilder, SigmoidActivation};
pub use sensitivity::{analyze_sensitivity, ImprovementSuggestion};
pub use snapshot::{NetworkCache, NetworkSnapshot};
