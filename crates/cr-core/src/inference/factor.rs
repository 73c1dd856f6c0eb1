//! Factors over discrete variables.
//!
//! Values are stored row-major over `scope`, last variable fastest, which is
//! the same layout as a flattened [`Cpt`](crate::network::Cpt) with scope
//! `[parents.., V]`.

use crate::network::{Network, VariableId};

/// A non-negative function over joint assignments of `scope`.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    scope: Vec<VariableId>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

impl Factor {
    /// Factor with explicit layout. `values.len()` must equal the product of `cards`.
    pub fn new(scope: Vec<VariableId>, cards: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(scope.len(), cards.len());
        debug_assert_eq!(values.len(), cards.iter().product::<usize>());
        Self {
            scope,
            cards,
            values,
        }
    }

    /// The multiplicative identity: empty scope, value 1.
    pub fn unit() -> Self {
        Self::new(Vec::new(), Vec::new(), vec![1.0])
    }

    /// The table of `id` as a factor over `[parents.., id]`.
    pub fn from_cpt(network: &Network, id: VariableId) -> Self {
        let mut scope = network.parent_ids(id).to_vec();
        scope.push(id);
        let cards = scope
            .iter()
            .map(|&v| network.variable(v).cardinality)
            .collect();
        Self::new(scope, cards, network.cpt(id).flattened())
    }

    pub fn scope(&self) -> &[VariableId] {
        &self.scope
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn contains(&self, var: VariableId) -> bool {
        self.scope.contains(&var)
    }

    /// Sum of all entries.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Fix `var` to `state` and drop it from the scope.
    pub fn reduce(&self, var: VariableId, state: usize) -> Factor {
        let Some(pos) = self.position(var) else {
            return self.clone();
        };
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        scope.remove(pos);
        cards.remove(pos);

        let mut values = Vec::with_capacity(self.values.len() / self.cards[pos]);
        let mut assignment = vec![0; self.scope.len()];
        for &value in &self.values {
            if assignment[pos] == state {
                values.push(value);
            }
            advance(&mut assignment, &self.cards);
        }
        Factor::new(scope, cards, values)
    }

    /// Pointwise product over the union of both scopes.
    pub fn product(&self, other: &Factor) -> Factor {
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        for (&v, &card) in other.scope.iter().zip(&other.cards) {
            if !scope.contains(&v) {
                scope.push(v);
                cards.push(card);
            }
        }

        let self_map = projection(&scope, &self.scope, &self.cards);
        let other_map = projection(&scope, &other.scope, &other.cards);

        let size: usize = cards.iter().product();
        let mut values = Vec::with_capacity(size);
        let mut assignment = vec![0; scope.len()];
        for _ in 0..size {
            let a = offset(&assignment, &self_map);
            let b = offset(&assignment, &other_map);
            values.push(self.values[a] * other.values[b]);
            advance(&mut assignment, &cards);
        }
        Factor::new(scope, cards, values)
    }

    /// Marginalize `var` out of the scope.
    pub fn sum_out(&self, var: VariableId) -> Factor {
        let Some(pos) = self.position(var) else {
            return self.clone();
        };
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        scope.remove(pos);
        cards.remove(pos);

        let kept: Vec<usize> = (0..self.scope.len()).filter(|&i| i != pos).collect();
        let kept_strides = strides(&cards);

        let mut values = vec![0.0; cards.iter().product()];
        let mut assignment = vec![0; self.scope.len()];
        for &value in &self.values {
            let idx: usize = kept
                .iter()
                .zip(&kept_strides)
                .map(|(&i, &s)| assignment[i] * s)
                .sum();
            values[idx] += value;
            advance(&mut assignment, &self.cards);
        }
        Factor::new(scope, cards, values)
    }

    fn position(&self, var: VariableId) -> Option<usize> {
        self.scope.iter().position(|&v| v == var)
    }
}

/// Row-major strides, last dimension fastest.
fn strides(cards: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cards[i + 1];
    }
    strides
}

/// For each variable of `sub`, its position in `full` and its stride in `sub`.
fn projection(full: &[VariableId], sub: &[VariableId], sub_cards: &[usize]) -> Vec<(usize, usize)> {
    let sub_strides = strides(sub_cards);
    sub.iter()
        .zip(sub_strides)
        .filter_map(|(v, stride)| full.iter().position(|f| f == v).map(|pos| (pos, stride)))
        .collect()
}

fn offset(assignment: &[usize], map: &[(usize, usize)]) -> usize {
    map.iter().map(|&(pos, stride)| assignment[pos] * stride).sum()
}

/// Odometer increment, last position fastest.
fn advance(assignment: &mut [usize], cards: &[usize]) {
    for i in (0..assignment.len()).rev() {
        assignment[i] += 1;
        if assignment[i] < cards[i] {
            return;
        }
        assignment[i] = 0;
    }
}
