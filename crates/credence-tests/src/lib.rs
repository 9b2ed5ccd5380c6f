//! Shared fixtures for the credence integration and property tests.

use credence_core::{BayesNet, Cpt, InferenceError, NestedTable, NetworkBuilder, NetworkDef, VariableDef};

/// The classic Cloudy / Sprinkler / Rain / WetGrass network.
pub fn sprinkler() -> BayesNet {
    let def = |name: &str, parents: &[&str], labels: &[&str], table: NestedTable| VariableDef {
        name: name.into(),
        cardinality: 2,
        parents: parents.iter().map(|p| p.to_string()).collect(),
        outcomes: Some(labels.iter().map(|l| l.to_string()).collect()),
        table,
    };
    NetworkDef {
        variables: vec![
            def("Cloudy", &[], &["No", "Yes"], NestedTable::Leaf(vec![0.5, 0.5])),
            def(
                "Sprinkler",
                &["Cloudy"],
                &["Off", "On"],
                NestedTable::rows(vec![vec![0.5, 0.5], vec![0.9, 0.1]]),
            ),
            def(
                "Rain",
                &["Cloudy"],
                &["No", "Yes"],
                NestedTable::rows(vec![vec![0.8, 0.2], vec![0.2, 0.8]]),
            ),
            def(
                "WetGrass",
                &["Sprinkler", "Rain"],
                &["Dry", "Wet"],
                NestedTable::Branch(vec![
                    NestedTable::rows(vec![vec![1.0, 0.0], vec![0.1, 0.9]]),
                    NestedTable::rows(vec![vec![0.1, 0.9], vec![0.01, 0.99]]),
                ]),
            ),
        ],
    }
    .build()
    .expect("sprinkler network is valid")
}

/// `Switch -> Light` where an open switch never lights the lamp.
///
/// Observing `Switch = 0` together with `Light = 1` has probability zero.
pub fn switch_and_light() -> BayesNet {
    let mut builder = NetworkBuilder::new();
    builder.add_variable("Switch", 2, &[]).expect("switch");
    builder.add_variable("Light", 2, &["Switch"]).expect("light");
    builder
        .attach_cpt("Switch", Cpt::prior(vec![0.4, 0.6]).expect("prior"))
        .expect("attach");
    builder
        .attach_cpt(
            "Light",
            Cpt::from_rows(&[2], vec![vec![1.0, 0.0], vec![0.05, 0.95]]).expect("rows"),
        )
        .expect("attach");
    builder.build().expect("switch network is valid")
}

/// Raw material for a random network, generated by property tests.
///
/// Variable `i` is named `V{i}` and may only take parents among `V0..Vi`,
/// so any shape is acyclic by construction.
#[derive(Debug, Clone)]
pub struct RandomShape {
    pub cardinalities: Vec<usize>,
    /// Bit `j` of `parent_masks[i]` makes `Vj` a parent of `Vi` when `j < i`.
    pub parent_masks: Vec<u32>,
    /// Positive weights, cycled to fill every CPT row before normalizing.
    pub weights: Vec<f64>,
}

pub const MAX_RANDOM_PARENTS: usize = 3;

impl RandomShape {
    pub fn name(idx: usize) -> String {
        format!("V{}", idx)
    }

    /// Parent indices of variable `idx`, at most [`MAX_RANDOM_PARENTS`].
    pub fn parents_of(&self, idx: usize) -> Vec<usize> {
        let mask = self.parent_masks.get(idx).copied().unwrap_or(0);
        (0..idx.min(32))
            .filter(|j| mask & (1 << j) != 0)
            .take(MAX_RANDOM_PARENTS)
            .collect()
    }

    pub fn build(&self) -> Result<BayesNet, InferenceError> {
        let mut builder = NetworkBuilder::new();
        let mut cursor = 0usize;
        let mut next_weight = || {
            let w = if self.weights.is_empty() {
                1.0
            } else {
                self.weights[cursor % self.weights.len()]
            };
            cursor += 1;
            w
        };

        for (idx, &cardinality) in self.cardinalities.iter().enumerate() {
            let parents = self.parents_of(idx);
            let names: Vec<String> = parents.iter().map(|&p| Self::name(p)).collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            builder.add_variable(&Self::name(idx), cardinality, &name_refs)?;

            let parent_cards: Vec<usize> = parents.iter().map(|&p| self.cardinalities[p]).collect();
            let rows_needed: usize = parent_cards.iter().product();
            let rows = (0..rows_needed)
                .map(|_| {
                    let raw: Vec<f64> = (0..cardinality).map(|_| next_weight()).collect();
                    let total: f64 = raw.iter().sum();
                    raw.into_iter().map(|w| w / total).collect()
                })
                .collect();
            builder.attach_cpt(&Self::name(idx), Cpt::from_rows(&parent_cards, rows)?)?;
        }
        builder.build()
    }
}

/// Absolute-tolerance comparison of two distributions.
pub fn assert_distributions_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() <= tolerance,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }
}
