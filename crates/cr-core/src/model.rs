//! Network construction from model configuration.
//!
//! Two networks come out of one [`ModelConfig`]:
//! - the reference network, every table exactly as configured
//! - the learned network, where nodes flagged `learned` get their table
//!   from a [`CptGenerator`] fed with the current Beta parameters
//!
//! Both go through [`NetworkBuilder::build`], so a malformed configuration
//! never yields a usable network.

use cr_common::Result;
use cr_config::model::{ModelConfig, NodeConfig};
use cr_math::BetaParams;
use tracing::debug;

use crate::network::{Cpt, CptGenerator, Network, NetworkBuilder, SigmoidActivation, BINARY};

/// Build the network with every table as configured.
pub fn build_reference_network(config: &ModelConfig) -> Result<Network> {
    build_with(config, |node| Cpt::binary(node.parents.clone(), &node.p_yes))
}

/// Build the network for the given learned parameters.
///
/// Deterministic: the same `config`, `params` and `generator` always give
/// the same tables.
pub fn build_network(
    config: &ModelConfig,
    params: &BetaParams,
    generator: &dyn CptGenerator,
) -> Result<Network> {
    debug!(
        alpha = params.alpha,
        beta = params.beta,
        "building learned network"
    );
    build_with(config, |node| {
        if node.learned {
            generator.generate(params, &node.parents)
        } else {
            Cpt::binary(node.parents.clone(), &node.p_yes)
        }
    })
}

/// The generator configured for this model.
pub fn generator_for(config: &ModelConfig) -> SigmoidActivation {
    SigmoidActivation::from(&config.generator)
}

fn build_with(config: &ModelConfig, mut table: impl FnMut(&NodeConfig) -> Cpt) -> Result<Network> {
    let mut builder = NetworkBuilder::new();
    for node in &config.nodes {
        builder.add_variable(&node.name, BINARY)?;
    }
    for node in &config.nodes {
        for parent in &node.parents {
            builder.add_edge(parent, &node.name)?;
        }
    }
    for node in &config.nodes {
        builder.set_cpt(&node.name, table(node))?;
    }
    builder.build()
}
