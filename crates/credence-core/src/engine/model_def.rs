//! Declarative network definitions.
//!
//! A [`NetworkDef`] describes a whole network as data: every variable with
//! its cardinality, parents, optional outcome labels and a nested probability
//! table. Unlike [`NetworkBuilder`], variables may be listed in any order;
//! [`NetworkDef::build`] sorts them topologically first and reports cycles.
//!
//! With the `serde` feature a definition can be loaded from JSON:
//!
//! ```json
//! { "variables": [
//!     { "name": "Gambler", "cardinality": 2, "table": [0.3, 0.7] },
//!     { "name": "Debts", "cardinality": 2, "parents": ["Gambler"],
//!       "table": [[0.1, 0.9], [0.7, 0.3]] }
//! ] }
//! ```

use rustc_hash::FxHashMap;

use crate::engine::cpt::{Cpt, NestedTable};
use crate::engine::errors::InferenceError;
use crate::engine::network::{topological_sort, BayesNet, NetworkBuilder};

/// One variable of a declarative definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDef {
    pub name: String,
    pub cardinality: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parents: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub outcomes: Option<Vec<String>>,
    pub table: NestedTable,
}

/// A whole network as data.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkDef {
    pub variables: Vec<VariableDef>,
}

impl NetworkDef {
    /// Validates the definition and builds the network.
    ///
    /// # Errors
    ///
    /// `StructuralError` on duplicate names, unknown or repeated parents, or a
    /// cycle; `ShapeError` when a table does not match its declaration.
    pub fn build(&self) -> Result<BayesNet, InferenceError> {
        let mut positions: FxHashMap<&str, usize> = FxHashMap::default();
        for (idx, def) in self.variables.iter().enumerate() {
            if positions.insert(def.name.as_str(), idx).is_some() {
                return Err(InferenceError::StructuralError(format!(
                    "variable '{}' is defined more than once",
                    def.name
                )));
            }
        }

        let mut parent_lists = Vec::with_capacity(self.variables.len());
        for def in &self.variables {
            let parents = def
                .parents
                .iter()
                .map(|parent| {
                    positions.get(parent.as_str()).copied().ok_or_else(|| {
                        InferenceError::StructuralError(format!(
                            "variable '{}' references unknown parent '{}'",
                            def.name, parent
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            parent_lists.push(parents);
        }

        let order = topological_sort(&parent_lists).map_err(|stuck| {
            let names: Vec<&str> = stuck
                .iter()
                .map(|&idx| self.variables[idx].name.as_str())
                .collect();
            InferenceError::StructuralError(format!("cycle among variables {:?}", names))
        })?;

        let mut builder = NetworkBuilder::new();
        for &idx in &order {
            let def = &self.variables[idx];
            let parents: Vec<&str> = def.parents.iter().map(String::as_str).collect();
            builder.add_variable(&def.name, def.cardinality, &parents)?;
            if let Some(labels) = &def.outcomes {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                builder.set_outcome_labels(&def.name, &labels)?;
            }

            let parent_cardinalities: Vec<usize> = parent_lists[idx]
                .iter()
                .map(|&parent| self.variables[parent].cardinality)
                .collect();
            let cpt = Cpt::from_nested(&parent_cardinalities, &def.table).map_err(|err| match err {
                InferenceError::ShapeError(msg) => {
                    InferenceError::ShapeError(format!("table of '{}': {}", def.name, msg))
                }
                other => other,
            })?;
            builder.attach_cpt(&def.name, cpt)?;
        }
        builder.build()
    }
}
