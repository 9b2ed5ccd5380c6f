//! # Network Definition
//!
//! The directed acyclic graph of discrete random variables and their
//! conditional probability tables.
//!
//! ## Construction
//!
//! Networks are assembled with [`NetworkBuilder`]:
//!
//! - [`NetworkBuilder::add_variable`] declares a variable with its cardinality
//!   and parents. Parents must already be declared, names must be unique.
//! - [`NetworkBuilder::attach_cpt`] attaches a [`Cpt`] whose shape must match
//!   the declared parents and cardinality exactly.
//! - [`NetworkBuilder::build`] checks that every variable has a table, runs a
//!   topological sort (rejecting cycles) and freezes the result into a
//!   [`BayesNet`].
//!
//! A built [`BayesNet`] is immutable and `Send + Sync`, so it can be shared
//! read-only across concurrent queries.
//!
//! ## Example
//!
//! ```rust
//! use credence_core::engine::cpt::Cpt;
//! use credence_core::engine::network::NetworkBuilder;
//!
//! let mut builder = NetworkBuilder::new();
//! builder.add_variable("Gambler", 2, &[]).unwrap();
//! builder.add_variable("Debts", 2, &["Gambler"]).unwrap();
//! builder.attach_cpt("Gambler", Cpt::prior(vec![0.3, 0.7]).unwrap()).unwrap();
//! builder
//!     .attach_cpt(
//!         "Debts",
//!         Cpt::from_rows(&[2], vec![vec![0.1, 0.9], vec![0.7, 0.3]]).unwrap(),
//!     )
//!     .unwrap();
//! let network = builder.build().unwrap();
//! assert_eq!(network.len(), 2);
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::engine::cpt::Cpt;
use crate::engine::errors::InferenceError;

/// A unique identifier for a variable in a network.
///
/// Ids are dense, assigned in declaration order, and implement `Ord` for
/// stable, deterministic iteration.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A discrete random variable with its parents and table.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    name: Arc<str>,
    cardinality: usize,
    parents: SmallVec<[VariableId; 4]>,
    outcomes: Option<Vec<Arc<str>>>,
    cpt: Cpt,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of discrete outcomes.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Parents in table order.
    pub fn parents(&self) -> &[VariableId] {
        &self.parents
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn cpt(&self) -> &Cpt {
        &self.cpt
    }

    /// Display label of an outcome, if labels were declared.
    pub fn outcome_label(&self, outcome: usize) -> Option<&str> {
        self.outcomes
            .as_ref()
            .and_then(|labels| labels.get(outcome))
            .map(|label| label.as_ref())
    }

    /// Checks that `outcome` is a valid index for this variable.
    pub fn check_outcome(&self, outcome: usize) -> Result<(), InferenceError> {
        if outcome < self.cardinality {
            Ok(())
        } else {
            Err(InferenceError::OutOfRange {
                variable: self.name.to_string(),
                index: outcome,
                cardinality: self.cardinality,
            })
        }
    }
}

#[derive(Debug, Clone)]
struct PendingVariable {
    name: Arc<str>,
    cardinality: usize,
    parents: SmallVec<[VariableId; 4]>,
    outcomes: Option<Vec<Arc<str>>>,
    cpt: Option<Cpt>,
}

/// Incremental, validating constructor for [`BayesNet`].
#[derive(Debug, Default, Clone)]
pub struct NetworkBuilder {
    pending: Vec<PendingVariable>,
    index: FxHashMap<Arc<str>, VariableId>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable.
    ///
    /// # Errors
    ///
    /// `StructuralError` if the name is taken, a parent is unknown or listed
    /// twice, or the cardinality is zero.
    pub fn add_variable(
        &mut self,
        name: &str,
        cardinality: usize,
        parents: &[&str],
    ) -> Result<VariableId, InferenceError> {
        if self.index.contains_key(name) {
            return Err(InferenceError::StructuralError(format!(
                "variable '{}' is already defined",
                name
            )));
        }
        if cardinality == 0 {
            return Err(InferenceError::StructuralError(format!(
                "variable '{}' must have at least one outcome",
                name
            )));
        }

        let mut parent_ids: SmallVec<[VariableId; 4]> = SmallVec::with_capacity(parents.len());
        for parent in parents {
            let parent_id = *self.index.get(*parent).ok_or_else(|| {
                InferenceError::StructuralError(format!(
                    "variable '{}' references unknown parent '{}'",
                    name, parent
                ))
            })?;
            if parent_ids.contains(&parent_id) {
                return Err(InferenceError::StructuralError(format!(
                    "variable '{}' lists parent '{}' more than once",
                    name, parent
                )));
            }
            parent_ids.push(parent_id);
        }

        let id = VariableId(u32::try_from(self.pending.len()).map_err(|_| {
            InferenceError::StructuralError("too many variables".into())
        })?);
        let name: Arc<str> = Arc::from(name);
        self.index.insert(name.clone(), id);
        self.pending.push(PendingVariable {
            name,
            cardinality,
            parents: parent_ids,
            outcomes: None,
            cpt: None,
        });
        Ok(id)
    }

    /// Attaches display labels to a variable's outcomes.
    pub fn set_outcome_labels(&mut self, name: &str, labels: &[&str]) -> Result<(), InferenceError> {
        let pending = self.pending_mut(name)?;
        if labels.len() != pending.cardinality {
            return Err(InferenceError::ShapeError(format!(
                "variable '{}' has {} outcomes but {} labels were given",
                name,
                pending.cardinality,
                labels.len()
            )));
        }
        pending.outcomes = Some(labels.iter().map(|label| Arc::from(*label)).collect());
        Ok(())
    }

    /// Attaches the conditional probability table of a declared variable.
    ///
    /// # Errors
    ///
    /// `ShapeError` if the table's parent space or row length does not match
    /// the declaration. `StructuralError` if the variable is unknown or
    /// already has a table.
    pub fn attach_cpt(&mut self, name: &str, cpt: Cpt) -> Result<(), InferenceError> {
        let expected: SmallVec<[usize; 4]> = {
            let pending = self.pending_ref(name)?;
            pending
                .parents
                .iter()
                .map(|parent| self.pending[parent.index()].cardinality)
                .collect()
        };

        let pending = self.pending_mut(name)?;
        if pending.cpt.is_some() {
            return Err(InferenceError::StructuralError(format!(
                "variable '{}' already has a CPT",
                name
            )));
        }
        if cpt.parent_cardinalities() != expected.as_slice() {
            return Err(InferenceError::ShapeError(format!(
                "CPT for '{}' is keyed by parent cardinalities {:?}, expected {:?}",
                name,
                cpt.parent_cardinalities(),
                expected.as_slice()
            )));
        }
        if cpt.cardinality() != pending.cardinality {
            return Err(InferenceError::ShapeError(format!(
                "CPT for '{}' has vectors of length {}, expected {}",
                name,
                cpt.cardinality(),
                pending.cardinality
            )));
        }
        pending.cpt = Some(cpt);
        Ok(())
    }

    /// Validates and freezes the network.
    pub fn build(self) -> Result<BayesNet, InferenceError> {
        let parent_lists: Vec<Vec<usize>> = self
            .pending
            .iter()
            .map(|p| p.parents.iter().map(|id| id.index()).collect())
            .collect();
        let order = topological_sort(&parent_lists).map_err(|stuck| {
            let names: Vec<&str> = stuck.iter().map(|&i| &*self.pending[i].name).collect();
            InferenceError::StructuralError(format!("cycle among variables {:?}", names))
        })?;

        let mut children: Vec<Vec<VariableId>> = vec![Vec::new(); self.pending.len()];
        let mut variables = Vec::with_capacity(self.pending.len());
        for (idx, pending) in self.pending.into_iter().enumerate() {
            let id = VariableId(idx as u32);
            let cpt = pending.cpt.ok_or_else(|| {
                InferenceError::ShapeError(format!("variable '{}' has no CPT", pending.name))
            })?;
            for parent in &pending.parents {
                children[parent.index()].push(id);
            }
            variables.push(Variable {
                id,
                name: pending.name,
                cardinality: pending.cardinality,
                parents: pending.parents,
                outcomes: pending.outcomes,
                cpt,
            });
        }

        let topological: Vec<VariableId> = order.into_iter().map(|i| VariableId(i as u32)).collect();
        let mut position = vec![0usize; topological.len()];
        for (pos, id) in topological.iter().enumerate() {
            position[id.index()] = pos;
        }

        #[cfg(feature = "tracing")]
        {
            let names: Vec<&str> = topological
                .iter()
                .map(|id| variables[id.index()].name())
                .collect();
            tracing::debug!(variables = variables.len(), order = ?names, "built Bayesian network");
        }

        Ok(BayesNet {
            variables,
            index: self.index,
            children,
            topological,
            position,
        })
    }

    fn pending_ref(&self, name: &str) -> Result<&PendingVariable, InferenceError> {
        let id = self.lookup(name)?;
        Ok(&self.pending[id.index()])
    }

    fn pending_mut(&mut self, name: &str) -> Result<&mut PendingVariable, InferenceError> {
        let id = self.lookup(name)?;
        Ok(&mut self.pending[id.index()])
    }

    fn lookup(&self, name: &str) -> Result<VariableId, InferenceError> {
        self.index.get(name).copied().ok_or_else(|| {
            InferenceError::StructuralError(format!("variable '{}' is not declared", name))
        })
    }
}

/// An immutable, validated Bayesian network.
#[derive(Debug, Clone)]
pub struct BayesNet {
    variables: Vec<Variable>,
    index: FxHashMap<Arc<str>, VariableId>,
    children: Vec<Vec<VariableId>>,
    topological: Vec<VariableId>,
    position: Vec<usize>,
}

impl BayesNet {
    /// Variables in id (declaration) order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|id| &self.variables[id.index()])
    }

    /// Resolves a name to an id, failing with `UnknownVariable`.
    pub fn id_of(&self, name: &str) -> Result<VariableId, InferenceError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| InferenceError::UnknownVariable(name.to_string()))
    }

    /// Looks up a variable by id, failing with `UnknownVariable`.
    pub fn resolve(&self, id: VariableId) -> Result<&Variable, InferenceError> {
        self.variable(id)
            .ok_or_else(|| InferenceError::UnknownVariable(format!("{:?}", id)))
    }

    /// Deterministic topological order: parents before children, ties broken
    /// by declaration order.
    pub fn topological_order(&self) -> &[VariableId] {
        &self.topological
    }

    /// Position of a variable in [`Self::topological_order`].
    pub fn topological_position(&self, id: VariableId) -> usize {
        self.position[id.index()]
    }

    pub fn children(&self, id: VariableId) -> &[VariableId] {
        self.children
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Marks every seed and every ancestor of a seed.
    pub(crate) fn ancestral_mask(&self, seeds: impl IntoIterator<Item = VariableId>) -> Vec<bool> {
        let mut mask = vec![false; self.variables.len()];
        let mut stack: Vec<VariableId> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut mask[id.index()], true) {
                continue;
            }
            stack.extend(self.variables[id.index()].parents.iter().copied());
        }
        mask
    }
}

/// Kahn's algorithm over dense indices, always releasing the smallest ready
/// index first. On a cycle, returns the indices that could not be ordered.
pub(crate) fn topological_sort(parent_lists: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let n = parent_lists.len();
    let mut in_degree: Vec<usize> = parent_lists.iter().map(Vec::len).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (child, parents) in parent_lists.iter().enumerate() {
        for &parent in parents {
            children[parent].push(child);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &children[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err((0..n).filter(|&i| in_degree[i] > 0).collect())
    }
}
