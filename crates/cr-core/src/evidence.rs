//! Typed evidence and continuous-measurement mapping.
//!
//! Raw observations arrive as `name -> bool` (or `name -> f64` for
//! measurements). They are validated once against the network's variable
//! registry and turned into [`Evidence`], which the inference engine accepts
//! without re-parsing.

use std::collections::BTreeMap;

use cr_common::{Error, Result};
use cr_math::{clip_probability, normal_sf, PROB_CEIL, PROB_FLOOR};
use serde::Serialize;
use tracing::warn;

use crate::network::{Network, VariableId, NO, YES};

/// Threshold applied to the clipped survival probability.
pub const MAPPING_THRESHOLD: f64 = 0.5;

/// Observed states keyed by variable name.
///
/// Iteration order is by name, so two equal evidence sets always produce
/// the same reductions in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Evidence {
    states: BTreeMap<String, usize>,
}

impl Evidence {
    /// Empty evidence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate boolean observations against `network`.
    pub fn resolve<'a, I>(network: &Network, observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        Self::from_states(
            network,
            observations
                .into_iter()
                .map(|(name, yes)| (name, if yes { YES } else { NO })),
        )
    }

    /// Validate explicit state indices against `network`.
    pub fn from_states<'a, I>(network: &Network, states: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let mut evidence = Self::new();
        for (name, state) in states {
            check_state(network, name, state)?;
            if evidence.states.insert(name.to_string(), state).is_some() {
                warn!(variable = name, "duplicate observation rejected");
                return Err(Error::evidence(format!(
                    "variable '{}' observed more than once",
                    name
                )));
            }
        }
        Ok(evidence)
    }

    /// The same evidence with `name` forced to `state`.
    pub fn with_state(&self, name: &str, state: usize) -> Self {
        let mut next = self.clone();
        next.states.insert(name.to_string(), state);
        next
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.states.get(name).copied()
    }

    pub fn is_yes(&self, name: &str) -> bool {
        self.get(name) == Some(YES)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.states.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Evidence as `(id, state)` pairs for `network`.
    ///
    /// Re-checks every entry, since an `Evidence` may have been resolved
    /// against a different snapshot.
    pub(crate) fn assignments(&self, network: &Network) -> Result<Vec<(VariableId, usize)>> {
        self.iter()
            .map(|(name, state)| check_state(network, name, state))
            .collect()
    }
}

fn check_state(network: &Network, name: &str, state: usize) -> Result<(VariableId, usize)> {
    let Some(id) = network.id_of(name) else {
        warn!(variable = name, "unknown evidence variable");
        return Err(Error::evidence(format!("unknown variable '{}'", name)));
    };
    let cardinality = network.variable(id).cardinality;
    if state >= cardinality {
        warn!(variable = name, state, cardinality, "invalid evidence state");
        return Err(Error::evidence(format!(
            "invalid state {} for '{}' (cardinality {})",
            state, name, cardinality
        )));
    }
    Ok((id, state))
}

/// Probability of the adverse state for a measurement `value`.
///
/// Survival function of `N(mean, std²)` at `value`, clipped to
/// `[0.01, 0.99]`: lower measurements mean higher probability.
pub fn survival_probability(value: f64, mean: f64, std: f64) -> Result<f64> {
    if !value.is_finite() || !mean.is_finite() {
        return Err(Error::evidence(format!(
            "measurement and reference mean must be finite (value {}, mean {})",
            value, mean
        )));
    }
    if !std.is_finite() || std <= 0.0 {
        return Err(Error::evidence(format!(
            "reference standard deviation must be positive, got {}",
            std
        )));
    }
    Ok(clip_probability(
        normal_sf(value, mean, std),
        PROB_FLOOR,
        PROB_CEIL,
    ))
}

/// Map a continuous measurement to a hard boolean observation.
///
/// True (adverse) when the survival probability exceeds 0.5, so a value
/// exactly at the mean maps to false. This discards the graded
/// probability; soft evidence is not propagated.
pub fn map_continuous(value: f64, mean: f64, std: f64) -> Result<bool> {
    Ok(survival_probability(value, mean, std)? > MAPPING_THRESHOLD)
}
