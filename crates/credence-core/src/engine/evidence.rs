//! Evidence binding.
//!
//! An [`Evidence`] is a sparse assignment of observed outcomes to a subset of
//! a network's variables. It is a mapping, not a log: binding a variable
//! twice keeps only the latest outcome, and binding `None` clears it.
//! Variables that are not bound are latent.
//!
//! Evidence is a plain per-query value. It holds no reference to the network,
//! so the engine re-checks it against the network it is evaluated on.

use std::collections::BTreeMap;

use crate::engine::errors::InferenceError;
use crate::engine::network::{BayesNet, VariableId};

/// Observed outcomes keyed by variable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Evidence {
    observed: BTreeMap<VariableId, usize>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds evidence from `(name, optional outcome)` readings.
    ///
    /// `None` readings leave the variable latent.
    pub fn from_observations<'a, I>(network: &BayesNet, readings: I) -> Result<Self, InferenceError>
    where
        I: IntoIterator<Item = (&'a str, Option<usize>)>,
    {
        let mut evidence = Self::new();
        for (name, outcome) in readings {
            evidence.bind(network, name, outcome)?;
        }
        Ok(evidence)
    }

    /// Binds (or with `None`, clears) the observation of a named variable.
    ///
    /// # Errors
    ///
    /// `UnknownVariable` if the network has no such variable, `OutOfRange` if
    /// the outcome is not in `[0, cardinality)`. On error the evidence is
    /// left unchanged.
    pub fn bind(
        &mut self,
        network: &BayesNet,
        name: &str,
        outcome: Option<usize>,
    ) -> Result<(), InferenceError> {
        let id = network.id_of(name)?;
        match outcome {
            Some(outcome) => self.observe(network, id, outcome),
            None => {
                self.clear(id);
                Ok(())
            }
        }
    }

    /// Binds an observation by variable id.
    pub fn observe(
        &mut self,
        network: &BayesNet,
        id: VariableId,
        outcome: usize,
    ) -> Result<(), InferenceError> {
        network.resolve(id)?.check_outcome(outcome)?;
        self.observed.insert(id, outcome);
        Ok(())
    }

    /// Removes the observation of a variable, returning the old outcome.
    pub fn clear(&mut self, id: VariableId) -> Option<usize> {
        self.observed.remove(&id)
    }

    pub fn get(&self, id: VariableId) -> Option<usize> {
        self.observed.get(&id).copied()
    }

    pub fn is_observed(&self, id: VariableId) -> bool {
        self.observed.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Observations in variable-id order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, usize)> + '_ {
        self.observed.iter().map(|(id, outcome)| (*id, *outcome))
    }

    /// Checks every binding against `network`.
    pub fn validate(&self, network: &BayesNet) -> Result<(), InferenceError> {
        for (id, outcome) in self.iter() {
            network.resolve(id)?.check_outcome(outcome)?;
        }
        Ok(())
    }

    /// Dense view indexed by variable id.
    pub(crate) fn dense(&self, network: &BayesNet) -> Vec<Option<usize>> {
        let mut dense = vec![None; network.len()];
        for (id, outcome) in self.iter() {
            if let Some(slot) = dense.get_mut(id.index()) {
                *slot = Some(outcome);
            }
        }
        dense
    }
}
