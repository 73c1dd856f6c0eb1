//! Versioned network snapshots.
//!
//! A request reads `(version, alpha, beta)` from the [`LearningStore`] once
//! and works on the network built from exactly that reading. Networks are
//! cached per version, so the generator only runs again after a committed
//! learning update.

use std::sync::{Arc, Mutex};

use cr_common::{Error, Result};
use cr_config::ModelConfig;
use tracing::debug;

use crate::learning::{LearningStore, ParamsSnapshot};
use crate::model::{build_network, generator_for};
use crate::network::{CptGenerator, Network};

/// One immutable network and the parameters it was built from.
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    pub params: ParamsSnapshot,
    pub network: Arc<Network>,
}

/// Cache of the learned network keyed by store version.
pub struct NetworkCache {
    config: ModelConfig,
    generator: Box<dyn CptGenerator>,
    cached: Mutex<Option<NetworkSnapshot>>,
}

impl NetworkCache {
    /// Cache using the generator configured in `config`.
    pub fn new(config: ModelConfig) -> Self {
        let generator = Box::new(generator_for(&config));
        Self::with_generator(config, generator)
    }

    pub fn with_generator(config: ModelConfig, generator: Box<dyn CptGenerator>) -> Self {
        Self {
            config,
            generator,
            cached: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The network for the store's current parameters.
    pub fn snapshot(&self, store: &LearningStore) -> Result<NetworkSnapshot> {
        let params = store.snapshot()?;
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| Error::Persistence("network cache mutex poisoned".to_string()))?;

        if let Some(hit) = cached.as_ref() {
            if hit.params == params {
                return Ok(hit.clone());
            }
        }

        debug!(version = params.version, "rebuilding learned network");
        let network = build_network(&self.config, &params.params(), self.generator.as_ref())?;
        let snapshot = NetworkSnapshot {
            params,
            network: Arc::new(network),
        };
        *cached = Some(snapshot.clone());
        Ok(snapshot)
    }
}

impl std::fmt::Debug for NetworkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkCache")
            .field("target", &self.config.target)
            .finish_non_exhaustive()
    }
}
