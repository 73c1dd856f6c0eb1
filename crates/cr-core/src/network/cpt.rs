//! Conditional probability tables.
//!
//! # Canonical row order
//!
//! A table for `V` with parents `(p1, .., pk)` has one row per joint parent
//! assignment. Rows are enumerated row-major with parents in declared
//! order and the LAST declared parent varying fastest:
//!
//! ```text
//! parents (A, B), binary:   row 0 = A0 B0
//!                           row 1 = A0 B1
//!                           row 2 = A1 B0
//!                           row 3 = A1 B1
//! ```
//!
//! Each row is a distribution over `V`'s states. Flattening the rows gives
//! a factor over scope `[p1, .., pk, V]` in the same row-major layout, which
//! is the layout every [`Factor`](crate::inference::Factor) uses. Evidence is
//! matched against factor scopes by variable id, never by position.

use serde::{Deserialize, Serialize};

/// Tolerance on the per-row sum.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// A conditional probability table for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpt {
    parents: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Cpt {
    /// Build a table from explicit rows in canonical order.
    ///
    /// Shape and normalization are checked when the network is built.
    pub fn new(parents: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { parents, rows }
    }

    /// Build a binary table from P(Yes) per parent combination.
    pub fn binary(parents: Vec<String>, p_yes: &[f64]) -> Self {
        let rows = p_yes.iter().map(|&p| vec![1.0 - p, p]).collect();
        Self { parents, rows }
    }

    /// Prior of a parentless binary variable.
    pub fn binary_prior(p_yes: f64) -> Self {
        Self::binary(Vec::new(), &[p_yes])
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// P(V = state | parent combination `row`).
    pub fn probability(&self, row: usize, state: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(state)).copied()
    }

    /// Row index for a full parent assignment (states in declared order).
    pub fn row_index(parent_states: &[usize], parent_cards: &[usize]) -> usize {
        parent_states
            .iter()
            .zip(parent_cards)
            .fold(0, |acc, (&state, &card)| acc * card + state)
    }

    /// Flattened values in scope order `[parents.., V]`.
    pub fn flattened(&self) -> Vec<f64> {
        self.rows.iter().flatten().copied().collect()
    }

    /// First row whose entries are not a distribution, with its sum.
    pub(crate) fn first_unnormalized_row(&self) -> Option<(usize, f64)> {
        self.rows.iter().enumerate().find_map(|(i, row)| {
            let sum: f64 = row.iter().sum();
            let in_range = row.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p));
            if !in_range || (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
                Some((i, sum))
            } else {
                None
            }
        })
    }
}

/// Parent states of binary row `row` for `k` parents, in declared order.
pub fn binary_combination(row: usize, k: usize) -> Vec<usize> {
    (0..k).map(|i| (row >> (k - 1 - i)) & 1).collect()
}
