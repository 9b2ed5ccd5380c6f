//! # Conditional Probability Tables
//!
//! A [`Cpt`] maps every combination of parent outcomes to a probability vector
//! over the child's own outcomes. Tables are immutable once built.
//!
//! ## Layout
//!
//! Values are stored flat and row-major: one row per parent-value tuple, rows
//! in lexicographic tuple order (first parent most significant, last parent
//! fastest), and within a row one entry per child outcome. This is exactly the
//! axis order `[parent_1, .., parent_k, child]`, so a table can be lifted into
//! an inference factor without reshuffling.
//!
//! A root variable has no parents and therefore a single row: its prior.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::engine::errors::InferenceError;

/// Allowed deviation of a row sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Parent-major nested probability table.
///
/// `Branch` has one entry per outcome of the next parent (first parent
/// outermost), `Leaf` is the probability vector for a full parent tuple.
/// A root table is a bare `Leaf`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum NestedTable {
    Leaf(Vec<f64>),
    Branch(Vec<NestedTable>),
}

impl NestedTable {
    /// Builds a one-parent table from its rows.
    pub fn rows(rows: Vec<Vec<f64>>) -> Self {
        NestedTable::Branch(rows.into_iter().map(NestedTable::Leaf).collect())
    }
}

/// An immutable conditional probability table.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    cardinality: usize,
    parent_cardinalities: SmallVec<[usize; 4]>,
    values: Vec<f64>,
}

impl Cpt {
    /// Builds the table of a root variable from its prior vector.
    pub fn prior(probabilities: Vec<f64>) -> Result<Self, InferenceError> {
        Self::from_rows(&[], vec![probabilities])
    }

    /// Builds a table from rows listed in lexicographic parent-tuple order.
    ///
    /// The child's cardinality is taken from the row length; all rows must
    /// agree on it.
    pub fn from_rows(
        parent_cardinalities: &[usize],
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, InferenceError> {
        let expected_rows = row_count_for(parent_cardinalities)?;
        if rows.len() != expected_rows {
            return Err(InferenceError::ShapeError(format!(
                "expected {} rows for parent cardinalities {:?}, got {}",
                expected_rows,
                parent_cardinalities,
                rows.len()
            )));
        }

        let cardinality = rows.first().map(Vec::len).unwrap_or(0);
        if cardinality == 0 {
            return Err(InferenceError::ShapeError(
                "probability vectors must not be empty".into(),
            ));
        }

        let mut values = Vec::with_capacity(expected_rows * cardinality);
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != cardinality {
                return Err(InferenceError::ShapeError(format!(
                    "row {} has {} entries, expected {}",
                    row_idx,
                    row.len(),
                    cardinality
                )));
            }
            validate_distribution(&row, || {
                format!("row {:?}", tuple_of(row_idx, parent_cardinalities))
            })?;
            values.extend(row);
        }

        Ok(Self {
            cardinality,
            parent_cardinalities: parent_cardinalities.iter().copied().collect(),
            values,
        })
    }

    /// Builds a table from explicit `(parent tuple, vector)` entries.
    ///
    /// The keys must cover the Cartesian product of the parent cardinalities
    /// exactly once each; entry order is irrelevant.
    pub fn from_entries<I>(parent_cardinalities: &[usize], entries: I) -> Result<Self, InferenceError>
    where
        I: IntoIterator<Item = (Vec<usize>, Vec<f64>)>,
    {
        let expected_rows = row_count_for(parent_cardinalities)?;
        let mut slots: Vec<Option<Vec<f64>>> = vec![None; expected_rows];
        let mut seen = HashSet::with_capacity(expected_rows);

        for (key, vector) in entries {
            let idx = row_index_for(parent_cardinalities, &key).ok_or_else(|| {
                InferenceError::ShapeError(format!(
                    "key {:?} is outside the parent space {:?}",
                    key, parent_cardinalities
                ))
            })?;
            if !seen.insert(idx) {
                return Err(InferenceError::ShapeError(format!(
                    "key {:?} appears more than once",
                    key
                )));
            }
            slots[idx] = Some(vector);
        }

        let mut rows = Vec::with_capacity(expected_rows);
        for (idx, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(row) => rows.push(row),
                None => {
                    return Err(InferenceError::ShapeError(format!(
                        "missing row for parent values {:?}",
                        tuple_of(idx, parent_cardinalities)
                    )))
                }
            }
        }
        Self::from_rows(parent_cardinalities, rows)
    }

    /// Builds a table from a parent-major nested table.
    pub fn from_nested(
        parent_cardinalities: &[usize],
        table: &NestedTable,
    ) -> Result<Self, InferenceError> {
        let mut rows = Vec::new();
        flatten_nested(table, parent_cardinalities, 0, &mut rows)?;
        Self::from_rows(parent_cardinalities, rows)
    }

    /// Number of outcomes of the child variable.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Cardinalities of the parents, in parent order.
    pub fn parent_cardinalities(&self) -> &[usize] {
        &self.parent_cardinalities
    }

    /// Number of parent-value tuples (rows).
    pub fn row_count(&self) -> usize {
        self.values.len() / self.cardinality
    }

    /// Returns the probability vector for one parent-value tuple.
    pub fn row(&self, parent_values: &[usize]) -> Result<&[f64], InferenceError> {
        let idx = row_index_for(&self.parent_cardinalities, parent_values).ok_or_else(|| {
            InferenceError::ShapeError(format!(
                "parent values {:?} do not match parent cardinalities {:?}",
                parent_values, self.parent_cardinalities
            ))
        })?;
        let start = idx * self.cardinality;
        Ok(&self.values[start..start + self.cardinality])
    }

    /// P(child = outcome | parents = parent_values).
    pub fn probability(&self, parent_values: &[usize], outcome: usize) -> Result<f64, InferenceError> {
        let row = self.row(parent_values)?;
        row.get(outcome).copied().ok_or_else(|| {
            InferenceError::ShapeError(format!(
                "outcome {} outside table cardinality {}",
                outcome, self.cardinality
            ))
        })
    }

    /// Flat values in `[parents.., child]` row-major order.
    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }
}

fn row_count_for(parent_cardinalities: &[usize]) -> Result<usize, InferenceError> {
    parent_cardinalities
        .iter()
        .try_fold(1usize, |acc, &card| {
            if card == 0 {
                None
            } else {
                acc.checked_mul(card)
            }
        })
        .ok_or_else(|| {
            InferenceError::ShapeError(format!(
                "invalid parent cardinalities {:?}",
                parent_cardinalities
            ))
        })
}

/// Mixed-radix row index, first parent most significant.
fn row_index_for(parent_cardinalities: &[usize], key: &[usize]) -> Option<usize> {
    if key.len() != parent_cardinalities.len() {
        return None;
    }
    let mut idx = 0usize;
    for (&value, &card) in key.iter().zip(parent_cardinalities) {
        if value >= card {
            return None;
        }
        idx = idx * card + value;
    }
    Some(idx)
}

fn tuple_of(mut row_idx: usize, parent_cardinalities: &[usize]) -> Vec<usize> {
    let mut tuple = vec![0; parent_cardinalities.len()];
    for (slot, &card) in tuple.iter_mut().zip(parent_cardinalities).rev() {
        if card > 0 {
            *slot = row_idx % card;
            row_idx /= card;
        }
    }
    tuple
}

fn flatten_nested(
    table: &NestedTable,
    parent_cardinalities: &[usize],
    depth: usize,
    rows: &mut Vec<Vec<f64>>,
) -> Result<(), InferenceError> {
    match (table, parent_cardinalities.get(depth)) {
        (NestedTable::Leaf(vector), None) => {
            rows.push(vector.clone());
            Ok(())
        }
        (NestedTable::Branch(children), Some(&card)) => {
            if children.len() != card {
                return Err(InferenceError::ShapeError(format!(
                    "table level {} has {} branches, parent has {} outcomes",
                    depth,
                    children.len(),
                    card
                )));
            }
            for child in children {
                flatten_nested(child, parent_cardinalities, depth + 1, rows)?;
            }
            Ok(())
        }
        (NestedTable::Leaf(_), Some(_)) => Err(InferenceError::ShapeError(format!(
            "table is nested {} levels deep, expected {}",
            depth,
            parent_cardinalities.len()
        ))),
        (NestedTable::Branch(_), None) => Err(InferenceError::ShapeError(format!(
            "table is nested deeper than its {} parents",
            parent_cardinalities.len()
        ))),
    }
}

fn validate_distribution(
    vector: &[f64],
    describe: impl Fn() -> String,
) -> Result<(), InferenceError> {
    if let Some(bad) = vector.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(InferenceError::ShapeError(format!(
            "{} contains invalid probability {}",
            describe(),
            bad
        )));
    }
    let total: f64 = vector.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(InferenceError::ShapeError(format!(
            "{} sums to {}, expected 1",
            describe(),
            total
        )));
    }
    Ok(())
}
