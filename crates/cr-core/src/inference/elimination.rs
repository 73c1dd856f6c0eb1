//! Exact inference by variable elimination.
//!
//! 1. One factor per variable from its table.
//! 2. Every factor is reduced by the evidence.
//! 3. Hidden variables (neither target nor evidence) are eliminated one at a
//!    time: multiply the factors mentioning it, sum it out.
//! 4. The remaining factors are multiplied and normalized.
//!
//! The result does not depend on the elimination order beyond floating point
//! rounding; [`EliminationOrder`] only changes the cost.

use std::collections::{BTreeSet, HashSet};

use cr_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::factor::Factor;
use crate::evidence::Evidence;
use crate::network::{Network, VariableId, NO, YES};

/// Strategy for ordering hidden variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationOrder {
    /// Children before parents.
    #[default]
    ReverseTopological,
    /// Greedy: always the variable adding the fewest fill edges.
    MinFill,
    /// Caller-provided order; must name exactly the hidden variables.
    Explicit(Vec<String>),
}

/// Posterior distribution of one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub target: String,
    /// Indexed by state; sums to 1.
    pub probabilities: Vec<f64>,
}

impl InferenceResult {
    pub fn p_no(&self) -> f64 {
        self.probabilities.get(NO).copied().unwrap_or(0.0)
    }

    pub fn p_yes(&self) -> f64 {
        self.probabilities.get(YES).copied().unwrap_or(0.0)
    }
}

/// `P(target | evidence)` with the default elimination order.
pub fn infer(network: &Network, evidence: &Evidence, target: &str) -> Result<InferenceResult> {
    infer_with_order(network, evidence, target, &EliminationOrder::default())
}

/// `P(target | evidence)` eliminating hidden variables in `order`.
pub fn infer_with_order(
    network: &Network,
    evidence: &Evidence,
    target: &str,
    order: &EliminationOrder,
) -> Result<InferenceResult> {
    let target_id = network
        .id_of(target)
        .ok_or_else(|| Error::unknown_variable(target))?;
    let assignments = evidence.assignments(network)?;
    if evidence.contains(target) {
        return Err(Error::evidence(format!(
            "target '{}' is also observed",
            target
        )));
    }

    let mut factors: Vec<Factor> = (0..network.len())
        .map(|id| {
            assignments
                .iter()
                .fold(Factor::from_cpt(network, id), |f, &(var, state)| {
                    f.reduce(var, state)
                })
        })
        .collect();

    let observed: HashSet<VariableId> = assignments.iter().map(|&(id, _)| id).collect();
    let hidden: Vec<VariableId> = network
        .topological_order()
        .iter()
        .copied()
        .filter(|&id| id != target_id && !observed.contains(&id))
        .collect();
    let sequence = elimination_sequence(network, &factors, &hidden, order)?;

    debug!(
        query = target,
        evidence = assignments.len(),
        hidden = sequence.len(),
        "variable elimination started"
    );

    for var in sequence {
        let (touching, rest): (Vec<Factor>, Vec<Factor>) =
            factors.into_iter().partition(|f| f.contains(var));
        factors = rest;
        let joint = touching
            .iter()
            .fold(Factor::unit(), |acc, f| acc.product(f));
        let marginal = joint.sum_out(var);
        trace!(
            variable = %network.variable(var).name,
            consumed = touching.len(),
            scope = marginal.scope().len(),
            "eliminated"
        );
        factors.push(marginal);
    }

    let result = factors
        .iter()
        .fold(Factor::unit(), |acc, f| acc.product(f));
    if result.scope() != [target_id] {
        return Err(Error::NumericalInstability(format!(
            "elimination left scope of {} variables instead of the target",
            result.scope().len()
        )));
    }

    let total = result.total();
    if !total.is_finite() {
        return Err(Error::NumericalInstability(format!(
            "non-finite evidence mass {}",
            total
        )));
    }
    if total <= 0.0 {
        return Err(Error::evidence("zero-probability evidence"));
    }

    let probabilities: Vec<f64> = result.values().iter().map(|v| v / total).collect();
    debug!(query = target, mass = total, ?probabilities, "variable elimination finished");

    Ok(InferenceResult {
        target: target.to_string(),
        probabilities,
    })
}

fn elimination_sequence(
    network: &Network,
    factors: &[Factor],
    hidden: &[VariableId],
    order: &EliminationOrder,
) -> Result<Vec<VariableId>> {
    match order {
        EliminationOrder::ReverseTopological => Ok(hidden.iter().rev().copied().collect()),
        EliminationOrder::MinFill => Ok(min_fill(network.len(), factors, hidden)),
        EliminationOrder::Explicit(names) => {
            let mut sequence = Vec::with_capacity(names.len());
            for name in names {
                let id = network
                    .id_of(name)
                    .ok_or_else(|| Error::evidence(format!("unknown variable '{}'", name)))?;
                if !hidden.contains(&id) || sequence.contains(&id) {
                    return Err(Error::evidence(format!(
                        "elimination order entry '{}' is not a remaining hidden variable",
                        name
                    )));
                }
                sequence.push(id);
            }
            if sequence.len() != hidden.len() {
                return Err(Error::evidence(format!(
                    "elimination order names {} of {} hidden variables",
                    sequence.len(),
                    hidden.len()
                )));
            }
            Ok(sequence)
        }
    }
}

/// Greedy min-fill over the interaction graph of the reduced factors.
///
/// Ties go to the variable that comes first in `hidden`.
fn min_fill(n: usize, factors: &[Factor], hidden: &[VariableId]) -> Vec<VariableId> {
    let mut adjacent: Vec<BTreeSet<VariableId>> = vec![BTreeSet::new(); n];
    for factor in factors {
        for &a in factor.scope() {
            for &b in factor.scope() {
                if a != b {
                    adjacent[a].insert(b);
                }
            }
        }
    }

    let mut remaining: Vec<VariableId> = hidden.to_vec();
    let mut sequence = Vec::with_capacity(hidden.len());
    while !remaining.is_empty() {
        let pos = remaining
            .iter()
            .enumerate()
            .min_by_key(|&(i, &v)| (fill_in(&adjacent, v), i))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let v = remaining.remove(pos);

        let neighbours: Vec<VariableId> = adjacent[v].iter().copied().collect();
        for &a in &neighbours {
            adjacent[a].remove(&v);
            for &b in &neighbours {
                if a != b {
                    adjacent[a].insert(b);
                }
            }
        }
        adjacent[v].clear();
        sequence.push(v);
    }
    sequence
}

fn fill_in(adjacent: &[BTreeSet<VariableId>], v: VariableId) -> usize {
    let neighbours: Vec<VariableId> = adjacent[v].iter().copied().collect();
    let mut missing = 0;
    for (i, &a) in neighbours.iter().enumerate() {
        for &b in &neighbours[i + 1..] {
            if !adjacent[a].contains(&b) {
                missing += 1;
            }
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_reference_network;
    use crate::network::{Cpt, NetworkBuilder, BINARY};
    use cr_config::ModelConfig;

    fn reference() -> Network {
        build_reference_network(&ModelConfig::default()).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn overworked_alone() {
        let net = reference();
        let ev = Evidence::resolve(&net, [("Overworked", true)]).unwrap();
        let r = infer(&net, &ev, "ConcentrationDrop").unwrap();
        assert!(close(r.p_yes(), 0.6675), "{}", r.p_yes());
        assert!(close(r.p_no() + r.p_yes(), 1.0));
    }

    #[test]
    fn prior_marginal_without_evidence() {
        let net = reference();
        let r = infer(&net, &Evidence::new(), "Overworked").unwrap();
        assert!(close(r.p_yes(), 0.2));
    }

    #[test]
    fn diagnostic_reasoning_through_child() {
        // Upward inference: observing a mistake raises P(ConcentrationDrop).
        let net = reference();
        let prior = infer(&net, &Evidence::new(), "ConcentrationDrop").unwrap();
        let ev = Evidence::resolve(&net, [("CarelessMistake", true)]).unwrap();
        let post = infer(&net, &ev, "ConcentrationDrop").unwrap();
        assert!(post.p_yes() > prior.p_yes());
    }

    #[test]
    fn orders_agree() {
        let net = reference();
        let ev = Evidence::resolve(&net, [("SleepDeprived", true)]).unwrap();
        let a = infer_with_order(&net, &ev, "CarelessMistake", &EliminationOrder::ReverseTopological)
            .unwrap();
        let b = infer_with_order(&net, &ev, "CarelessMistake", &EliminationOrder::MinFill).unwrap();
        let c = infer_with_order(
            &net,
            &ev,
            "CarelessMistake",
            &EliminationOrder::Explicit(vec![
                "Overworked".into(),
                "ConcentrationDrop".into(),
                "SmartphoneDistraction".into(),
            ]),
        )
        .unwrap();
        assert!(close(a.p_yes(), b.p_yes()));
        assert!(close(a.p_yes(), c.p_yes()));
    }

    #[test]
    fn unknown_target() {
        let net = reference();
        let err = infer(&net, &Evidence::new(), "Burnout").unwrap_err();
        assert!(matches!(err, Error::UnknownVariable { .. }));
    }

    #[test]
    fn target_in_evidence() {
        let net = reference();
        let ev = Evidence::resolve(&net, [("ConcentrationDrop", true)]).unwrap();
        assert!(matches!(
            infer(&net, &ev, "ConcentrationDrop"),
            Err(Error::Evidence(_))
        ));
    }

    #[test]
    fn explicit_order_must_cover_hidden_variables() {
        let net = reference();
        let ev = Evidence::new();
        let short = EliminationOrder::Explicit(vec!["Overworked".into()]);
        assert!(infer_with_order(&net, &ev, "ConcentrationDrop", &short).is_err());

        let with_target = EliminationOrder::Explicit(vec![
            "CarelessMistake".into(),
            "Overworked".into(),
            "SleepDeprived".into(),
            "SmartphoneDistraction".into(),
            "ConcentrationDrop".into(),
        ]);
        assert!(infer_with_order(&net, &ev, "ConcentrationDrop", &with_target).is_err());
    }

    #[test]
    fn zero_probability_evidence() {
        let mut b = NetworkBuilder::new();
        b.add_variable("A", BINARY).unwrap();
        b.add_variable("B", BINARY).unwrap();
        b.add_variable("C", BINARY).unwrap();
        b.add_edge("A", "B").unwrap();
        b.set_cpt("A", Cpt::binary_prior(0.0)).unwrap();
        b.set_cpt("B", Cpt::binary(vec!["A".into()], &[0.3, 0.6])).unwrap();
        b.set_cpt("C", Cpt::binary_prior(0.5)).unwrap();
        let net = b.build().unwrap();

        let ev = Evidence::resolve(&net, [("A", true)]).unwrap();
        let err = infer(&net, &ev, "B").unwrap_err();
        assert_eq!(err.to_string(), "evidence error: zero-probability evidence");
    }

    #[test]
    fn evidence_from_other_network_is_rechecked() {
        let mut b = NetworkBuilder::new();
        b.add_variable("Other", BINARY).unwrap();
        b.set_cpt("Other", Cpt::binary_prior(0.5)).unwrap();
        let other = b.build().unwrap();
        let ev = Evidence::resolve(&other, [("Other", true)]).unwrap();

        let err = infer(&reference(), &ev, "ConcentrationDrop").unwrap_err();
        assert!(matches!(err, Error::Evidence(_)));
    }

    #[test]
    fn min_fill_prefers_leaves() {
        let net = reference();
        let factors: Vec<Factor> = (0..net.len()).map(|id| Factor::from_cpt(&net, id)).collect();
        let hidden: Vec<VariableId> = net.topological_order().to_vec();
        let seq = min_fill(net.len(), &factors, &hidden);
        assert_eq!(seq.len(), hidden.len());
        // Eliminating ConcentrationDrop first would connect all four others.
        let drop = net.id_of("ConcentrationDrop").unwrap();
        assert_ne!(seq[0], drop);
    }
}
