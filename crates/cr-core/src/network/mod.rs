//! Validated discrete Bayesian networks.
//!
//! A [`Network`] can only be obtained from [`NetworkBuilder::build`], which
//! runs every structural check. Holders of a `Network` may therefore rely on:
//! - the edge set is acyclic and a topological order is available
//! - every variable has exactly one table
//! - each table's parents are exactly the variable's incoming edges
//! - every table row is a distribution within [`NORMALIZATION_TOLERANCE`]
//!
//! Networks are immutable once built and are shared across threads behind
//! an `Arc`.

pub mod cpt;
pub mod generator;

pub use cpt::{binary_combination, Cpt, NORMALIZATION_TOLERANCE};
pub use generator::{CptGenerator, SigmoidActivation};

use std::collections::{HashMap, HashSet};

use cr_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, trace};

/// Index of a variable inside one network.
pub type VariableId = usize;

/// Number of states of every variable in this system (No = 0, Yes = 1).
pub const BINARY: usize = 2;

/// State index of "No".
pub const NO: usize = 0;

/// State index of "Yes".
pub const YES: usize = 1;

/// A discrete random variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub cardinality: usize,
}

/// Incrementally assembles a network; nothing is usable until [`build`](Self::build).
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    variables: Vec<Variable>,
    index: HashMap<String, VariableId>,
    edges: Vec<(VariableId, VariableId)>,
    cpts: HashMap<VariableId, Cpt>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable. Names are unique.
    pub fn add_variable(&mut self, name: &str, cardinality: usize) -> Result<VariableId> {
        if name.is_empty() {
            return Err(Error::structural("variable names must be non-empty"));
        }
        if self.index.contains_key(name) {
            return Err(Error::structural(format!("duplicate variable '{}'", name)));
        }
        if cardinality < 2 {
            return Err(Error::structural(format!(
                "variable '{}' needs at least 2 states, got {}",
                name, cardinality
            )));
        }
        let id = self.variables.len();
        self.variables.push(Variable {
            name: name.to_string(),
            cardinality,
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare the dependency `parent → child`.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.lookup(parent)?;
        let c = self.lookup(child)?;
        if p == c {
            return Err(Error::structural(format!("cycle at {} -> {}", parent, child)));
        }
        if self.edges.contains(&(p, c)) {
            return Err(Error::structural(format!(
                "duplicate edge {} -> {}",
                parent, child
            )));
        }
        self.edges.push((p, c));
        Ok(())
    }

    /// Attach (or replace) the table of a variable.
    pub fn set_cpt(&mut self, variable: &str, cpt: Cpt) -> Result<()> {
        let id = self.lookup(variable)?;
        self.cpts.insert(id, cpt);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<VariableId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::structural(format!("undeclared variable '{}'", name)))
    }

    /// Validate and freeze the network.
    ///
    /// Checks run in a fixed order: acyclicity, table presence and scope,
    /// table shape, normalization. The first failure is returned.
    pub fn build(self) -> Result<Network> {
        let NetworkBuilder {
            variables,
            index,
            edges,
            mut cpts,
        } = self;
        let n = variables.len();

        let mut incoming: Vec<Vec<VariableId>> = vec![Vec::new(); n];
        let mut outgoing: Vec<Vec<VariableId>> = vec![Vec::new(); n];
        for &(p, c) in &edges {
            incoming[c].push(p);
            outgoing[p].push(c);
        }

        let topo = topological_sort(&incoming, &outgoing).map_err(|cycle| {
            Error::structural(format!("cycle at {}", names(&variables, &cycle).join(" -> ")))
        })?;

        let mut ordered_cpts = Vec::with_capacity(n);
        let mut parent_ids = Vec::with_capacity(n);

        for (id, var) in variables.iter().enumerate() {
            let cpt = cpts.remove(&id).ok_or_else(|| {
                Error::structural(format!("scope mismatch for {}: no table attached", var.name))
            })?;

            let mut ids = Vec::with_capacity(cpt.parents().len());
            for parent in cpt.parents() {
                match index.get(parent) {
                    Some(&pid) if !ids.contains(&pid) => ids.push(pid),
                    Some(_) => {
                        return Err(Error::structural(format!(
                            "scope mismatch for {}: parent '{}' listed twice",
                            var.name, parent
                        )))
                    }
                    None => {
                        return Err(Error::structural(format!(
                            "scope mismatch for {}: unknown parent '{}'",
                            var.name, parent
                        )))
                    }
                }
            }

            let declared: HashSet<VariableId> = incoming[id].iter().copied().collect();
            let table: HashSet<VariableId> = ids.iter().copied().collect();
            if declared != table {
                return Err(Error::structural(format!(
                    "scope mismatch for {}: table parents [{}] but edges declare [{}]",
                    var.name,
                    cpt.parents().join(", "),
                    names(&variables, &incoming[id]).join(", ")
                )));
            }

            let expected_rows: usize = ids.iter().map(|&p| variables[p].cardinality).product();
            if cpt.rows().len() != expected_rows
                || cpt.rows().iter().any(|r| r.len() != var.cardinality)
            {
                return Err(Error::structural(format!(
                    "scope mismatch for {}: expected {} rows of {} states",
                    var.name, expected_rows, var.cardinality
                )));
            }

            if let Some((row, sum)) = cpt.first_unnormalized_row() {
                return Err(Error::structural(format!(
                    "non-normalized table for {}: row {} sums to {}",
                    var.name, row, sum
                )));
            }

            ordered_cpts.push(cpt);
            parent_ids.push(ids);
        }

        debug!(variables = n, edges = edges.len(), "network validated");
        trace!(order = ?names(&variables, &topo), "topological order");

        Ok(Network {
            variables,
            index,
            parents: parent_ids,
            cpts: ordered_cpts,
            topo,
        })
    }
}

fn names(variables: &[Variable], ids: &[VariableId]) -> Vec<String> {
    ids.iter().map(|&i| variables[i].name.clone()).collect()
}

/// Kahn's algorithm with ties broken by declaration order.
///
/// On failure returns one cycle as a closed path `a -> b -> .. -> a`.
fn topological_sort(
    incoming: &[Vec<VariableId>],
    outgoing: &[Vec<VariableId>],
) -> std::result::Result<Vec<VariableId>, Vec<VariableId>> {
    let n = incoming.len();
    let mut indegree: Vec<usize> = incoming.iter().map(Vec::len).collect();
    let mut ready: std::collections::BTreeSet<VariableId> =
        (0..n).filter(|&v| indegree[v] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(v) = ready.pop_first() {
        order.push(v);
        for &c in &outgoing[v] {
            indegree[c] -= 1;
            if indegree[c] == 0 {
                ready.insert(c);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // Every unsorted node has an unsorted parent; walking parents must revisit.
    let sorted: HashSet<VariableId> = order.into_iter().collect();
    let start = (0..n).find(|v| !sorted.contains(v)).unwrap_or(0);
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = incoming[current]
            .iter()
            .copied()
            .find(|p| !sorted.contains(p))
            .unwrap_or(current);
        if let Some(pos) = path.iter().position(|&v| v == next) {
            let mut cycle: Vec<VariableId> = path[pos..].to_vec();
            cycle.reverse();
            cycle.push(cycle[0]);
            return Err(cycle);
        }
        path.push(next);
        current = next;
    }
}

/// An immutable, validated network.
#[derive(Debug, Clone)]
pub struct Network {
    variables: Vec<Variable>,
    index: HashMap<String, VariableId>,
    parents: Vec<Vec<VariableId>>,
    cpts: Vec<Cpt>,
    topo: Vec<VariableId>,
}

impl Network {
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Variable ids in topological order (parents before children).
    pub fn topological_order(&self) -> &[VariableId] {
        &self.topo
    }

    /// Variable names in topological order.
    pub fn topological_names(&self) -> Vec<&str> {
        self.topo
            .iter()
            .map(|&id| self.variables[id].name.as_str())
            .collect()
    }

    /// Parents of `name` in table order.
    pub fn parents_of(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id_of(name).ok_or_else(|| Error::unknown_variable(name))?;
        Ok(self.parents[id]
            .iter()
            .map(|&p| self.variables[p].name.as_str())
            .collect())
    }

    pub fn parent_ids(&self, id: VariableId) -> &[VariableId] {
        &self.parents[id]
    }

    pub fn cpt_of(&self, name: &str) -> Result<&Cpt> {
        let id = self.id_of(name).ok_or_else(|| Error::unknown_variable(name))?;
        Ok(&self.cpts[id])
    }

    pub fn cpt(&self, id: VariableId) -> &Cpt {
        &self.cpts[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_builder() -> NetworkBuilder {
        let mut b = NetworkBuilder::new();
        b.add_variable("A", BINARY).unwrap();
        b.add_variable("B", BINARY).unwrap();
        b.add_edge("A", "B").unwrap();
        b.set_cpt("A", Cpt::binary_prior(0.3)).unwrap();
        b.set_cpt("B", Cpt::binary(vec!["A".into()], &[0.2, 0.7])).unwrap();
        b
    }

    fn structural_message(result: Result<Network>) -> String {
        match result {
            Err(Error::Structural(msg)) => msg,
            other => panic!("expected structural error, got {:?}", other.map(|n| n.len())),
        }
    }

    #[test]
    fn builds_valid_chain() {
        let net = chain_builder().build().unwrap();
        assert_eq!(net.len(), 2);
        assert_eq!(net.topological_names(), vec!["A", "B"]);
        assert_eq!(net.parents_of("B").unwrap(), vec!["A"]);
        assert!(net.parents_of("A").unwrap().is_empty());
        assert_eq!(net.cpt_of("B").unwrap().probability(1, YES), Some(0.7));
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let mut b = NetworkBuilder::new();
        b.add_variable("Child", BINARY).unwrap();
        b.add_variable("Parent", BINARY).unwrap();
        b.add_edge("Parent", "Child").unwrap();
        b.set_cpt("Parent", Cpt::binary_prior(0.5)).unwrap();
        b.set_cpt("Child", Cpt::binary(vec!["Parent".into()], &[0.1, 0.9]))
            .unwrap();
        let net = b.build().unwrap();
        assert_eq!(net.topological_names(), vec!["Parent", "Child"]);
    }

    #[test]
    fn rejects_cycle() {
        let mut b = NetworkBuilder::new();
        for name in ["A", "B", "C"] {
            b.add_variable(name, BINARY).unwrap();
        }
        b.add_edge("A", "B").unwrap();
        b.add_edge("B", "C").unwrap();
        b.add_edge("C", "A").unwrap();
        b.set_cpt("A", Cpt::binary(vec!["C".into()], &[0.5, 0.5])).unwrap();
        b.set_cpt("B", Cpt::binary(vec!["A".into()], &[0.5, 0.5])).unwrap();
        b.set_cpt("C", Cpt::binary(vec!["B".into()], &[0.5, 0.5])).unwrap();
        let msg = structural_message(b.build());
        assert!(msg.starts_with("cycle at "), "{msg}");
        assert!(msg.contains("A") && msg.contains("B") && msg.contains("C"));
    }

    #[test]
    fn rejects_self_loop() {
        let mut b = NetworkBuilder::new();
        b.add_variable("A", BINARY).unwrap();
        assert!(matches!(b.add_edge("A", "A"), Err(Error::Structural(_))));
    }

    #[test]
    fn rejects_scope_mismatch() {
        let mut b = chain_builder();
        b.set_cpt("B", Cpt::binary_prior(0.4)).unwrap();
        let msg = structural_message(b.build());
        assert!(msg.starts_with("scope mismatch"), "{msg}");
    }

    #[test]
    fn rejects_missing_table() {
        let mut b = NetworkBuilder::new();
        b.add_variable("A", BINARY).unwrap();
        let msg = structural_message(b.build());
        assert!(msg.contains("no table"), "{msg}");
    }

    #[test]
    fn rejects_wrong_row_count() {
        let mut b = chain_builder();
        b.set_cpt("B", Cpt::binary(vec!["A".into()], &[0.2])).unwrap();
        let msg = structural_message(b.build());
        assert!(msg.contains("expected 2 rows"), "{msg}");
    }

    #[test]
    fn rejects_non_normalized_table() {
        let mut b = chain_builder();
        b.set_cpt(
            "B",
            Cpt::new(vec!["A".into()], vec![vec![0.8, 0.2], vec![0.5, 0.6]]),
        )
        .unwrap();
        let msg = structural_message(b.build());
        assert!(msg.starts_with("non-normalized table for B"), "{msg}");
    }

    #[test]
    fn rejects_duplicates() {
        let mut b = chain_builder();
        assert!(b.add_variable("A", BINARY).is_err());
        assert!(b.add_edge("A", "B").is_err());
        assert!(b.add_edge("A", "Missing").is_err());
        assert!(b.add_variable("Unary", 1).is_err());
    }

    #[test]
    fn unknown_names_are_reported() {
        let net = chain_builder().build().unwrap();
        assert!(matches!(
            net.parents_of("Z"),
            Err(Error::UnknownVariable { .. })
        ));
        assert!(net.cpt_of("Z").is_err());
    }
}
