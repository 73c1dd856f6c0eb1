//! Exact inference over validated networks.

pub mod elimination;
pub mod factor;

pub use elimination::{infer, infer_with_order, EliminationOrder, InferenceResult};
pub use factor::Factor;
