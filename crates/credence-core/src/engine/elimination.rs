//! Exact posterior marginals by variable elimination.
//!
//! For a query variable `Q` and evidence `e`, the engine:
//!
//! 1. lifts every relevant CPT into a factor, reducing observed axes;
//! 2. eliminates each remaining latent variable `V` by multiplying the
//!    factors that mention `V` and summing `V` out;
//! 3. multiplies what is left into an unnormalized table over `Q` and
//!    normalizes it.
//!
//! The unnormalized total is `P(e)`. When it is zero the evidence is
//! contradictory and the query fails with [`InferenceError::Contradiction`]
//! instead of returning `0/0`.
//!
//! Cost is exponential in the width of the largest intermediate factor, which
//! depends on the elimination order. The default reverse-topological order is
//! adequate for shallow networks with few parents per variable;
//! [`EliminationOrder`] is the extension point for other heuristics.
//!
//! The engine is a pure function of `(network, evidence, query, config)`: all
//! factors are local to the call, so concurrent queries on a shared network
//! need no synchronization.

use smallvec::SmallVec;

use crate::engine::errors::InferenceError;
use crate::engine::evidence::Evidence;
use crate::engine::factor::Factor;
use crate::engine::network::{BayesNet, Variable, VariableId};

/// Strategy for choosing which latent variable to eliminate next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EliminationOrder {
    /// Children before parents, ties by declaration order.
    #[default]
    ReverseTopological,
    /// Greedy: the variable whose summed-out factor is smallest, ties by
    /// topological position.
    MinWeight,
    /// Caller-supplied order. Must list every latent variable that needs
    /// elimination exactly once; observed or pruned variables are skipped,
    /// the query variable is rejected.
    Custom(Vec<VariableId>),
}

/// Configuration for variable elimination.
#[derive(Debug, Clone, PartialEq)]
pub struct EliminationConfig {
    pub order: EliminationOrder,
    /// Drop variables that are neither the query, observed, nor an ancestor
    /// of either. Their factors sum to one, so the result is unchanged.
    pub prune_barren: bool,
    /// An unnormalized posterior whose total is at or below this value is
    /// treated as contradictory evidence.
    pub contradiction_threshold: f64,
}

impl Default for EliminationConfig {
    fn default() -> Self {
        Self {
            order: EliminationOrder::ReverseTopological,
            prune_barren: true,
            contradiction_threshold: f64::MIN_POSITIVE,
        }
    }
}

impl EliminationConfig {
    /// Default configuration with a different elimination order.
    pub fn with_order(order: EliminationOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if !self.contradiction_threshold.is_finite() || self.contradiction_threshold < 0.0 {
            return Err(InferenceError::ValidationError(
                "elimination: contradiction_threshold must be finite and >= 0".into(),
            ));
        }
        if let EliminationOrder::Custom(order) = &self.order {
            for (idx, id) in order.iter().enumerate() {
                if order[..idx].contains(id) {
                    return Err(InferenceError::ValidationError(format!(
                        "elimination: custom order lists {:?} more than once",
                        id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Normalized distribution over the outcomes of one variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PosteriorMarginal {
    variable: VariableId,
    name: String,
    probabilities: Vec<f64>,
}

impl PosteriorMarginal {
    pub(crate) fn from_parts(variable: &Variable, probabilities: Vec<f64>) -> Self {
        Self {
            variable: variable.id(),
            name: variable.name().to_string(),
            probabilities,
        }
    }

    fn point_mass(variable: &Variable, outcome: usize) -> Self {
        let mut probabilities = vec![0.0; variable.cardinality()];
        probabilities[outcome] = 1.0;
        Self::from_parts(variable, probabilities)
    }

    pub fn variable(&self) -> VariableId {
        self.variable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Posterior probability of one outcome.
    pub fn probability(&self, outcome: usize) -> Result<f64, InferenceError> {
        self.probabilities
            .get(outcome)
            .copied()
            .ok_or_else(|| InferenceError::OutOfRange {
                variable: self.name.clone(),
                index: outcome,
                cardinality: self.probabilities.len(),
            })
    }

    /// Index of the most probable outcome (lowest index on ties).
    pub fn most_likely(&self) -> usize {
        self.probabilities
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (idx, &p)| {
                if p > best.1 {
                    (idx, p)
                } else {
                    best
                }
            })
            .0
    }
}

/// Runtime diagnostics for one elimination run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EliminationDiagnostics {
    /// Variables in the order they were summed out.
    pub order: Vec<VariableId>,
    /// Variables kept after barren-variable pruning.
    pub relevant_variables: usize,
    /// Factors built from CPTs.
    pub initial_factors: usize,
    /// Most axes of any intermediate product.
    pub max_factor_width: usize,
    /// Most entries of any intermediate product.
    pub max_factor_size: usize,
    /// Unnormalized total, i.e. the probability of the evidence.
    pub evidence_probability: f64,
}

/// Posterior marginal of `query` with default configuration.
pub fn posterior_marginal(
    network: &BayesNet,
    evidence: &Evidence,
    query: VariableId,
) -> Result<PosteriorMarginal, InferenceError> {
    posterior_marginal_with_config(network, evidence, query, &EliminationConfig::default())
}

/// Posterior marginal of `query` with explicit configuration.
pub fn posterior_marginal_with_config(
    network: &BayesNet,
    evidence: &Evidence,
    query: VariableId,
    config: &EliminationConfig,
) -> Result<PosteriorMarginal, InferenceError> {
    posterior_marginal_with_diagnostics(network, evidence, query, config).map(|(marginal, _)| marginal)
}

/// Posterior marginal of `query` with explicit configuration and diagnostics.
pub fn posterior_marginal_with_diagnostics(
    network: &BayesNet,
    evidence: &Evidence,
    query: VariableId,
    config: &EliminationConfig,
) -> Result<(PosteriorMarginal, EliminationDiagnostics), InferenceError> {
    config.validate()?;
    let target = network.resolve(query)?;
    evidence.validate(network)?;
    let observed = evidence.dense(network);

    let relevant = if config.prune_barren {
        network.ancestral_mask(std::iter::once(query).chain(evidence.iter().map(|(id, _)| id)))
    } else {
        vec![true; network.len()]
    };

    let mut factors = Vec::new();
    let mut hidden = Vec::new();
    for &id in network.topological_order() {
        if !relevant[id.index()] {
            continue;
        }
        let variable = network.resolve(id)?;
        factors.push(Factor::from_cpt(network, variable, &observed)?);
        if id != query && observed[id.index()].is_none() {
            hidden.push(id);
        }
    }

    let mut diagnostics = EliminationDiagnostics {
        order: Vec::with_capacity(hidden.len()),
        relevant_variables: relevant.iter().filter(|keep| **keep).count(),
        initial_factors: factors.len(),
        max_factor_width: 0,
        max_factor_size: 0,
        evidence_probability: 0.0,
    };

    let mut remaining = initial_order(&config.order, hidden, query)?;
    while !remaining.is_empty() {
        let next = match config.order {
            EliminationOrder::MinWeight => min_weight_position(network, &remaining, &factors),
            _ => 0,
        };
        let variable = remaining.remove(next);
        eliminate(&mut factors, variable, &mut diagnostics)?;
        diagnostics.order.push(variable);
    }

    let joint = factors
        .iter()
        .try_fold(Factor::unit(), |acc, factor| acc.product(factor))?;
    if joint.scope().iter().any(|id| *id != query) {
        return Err(InferenceError::Internal(format!(
            "elimination: residual factor over {:?} after eliminating all latent variables",
            joint.scope()
        )));
    }
    diagnostics.evidence_probability = joint.total();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        query = target.name(),
        eliminated = diagnostics.order.len(),
        max_factor_width = diagnostics.max_factor_width,
        max_factor_size = diagnostics.max_factor_size,
        evidence_probability = diagnostics.evidence_probability,
        "variable elimination finished"
    );

    let marginal = match observed[query.index()] {
        Some(outcome) => {
            let total = diagnostics.evidence_probability;
            if !total.is_finite() || total <= config.contradiction_threshold {
                return Err(contradiction(network, evidence));
            }
            PosteriorMarginal::point_mass(target, outcome)
        }
        None => {
            let probabilities = joint
                .normalized(config.contradiction_threshold)
                .ok_or_else(|| contradiction(network, evidence))?;
            if probabilities.len() != target.cardinality() {
                return Err(InferenceError::Internal(format!(
                    "elimination: posterior over '{}' has {} entries, expected {}",
                    target.name(),
                    probabilities.len(),
                    target.cardinality()
                )));
            }
            PosteriorMarginal::from_parts(target, probabilities)
        }
    };

    Ok((marginal, diagnostics))
}

fn initial_order(
    order: &EliminationOrder,
    hidden: Vec<VariableId>,
    query: VariableId,
) -> Result<Vec<VariableId>, InferenceError> {
    match order {
        EliminationOrder::ReverseTopological => Ok(hidden.into_iter().rev().collect()),
        EliminationOrder::MinWeight => Ok(hidden),
        EliminationOrder::Custom(custom) => {
            if custom.contains(&query) {
                return Err(InferenceError::ValidationError(format!(
                    "elimination: custom order must not contain the query variable {:?}",
                    query
                )));
            }
            let missing: Vec<VariableId> = hidden
                .iter()
                .filter(|id| !custom.contains(id))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(InferenceError::ValidationError(format!(
                    "elimination: custom order omits latent variables {:?}",
                    missing
                )));
            }
            Ok(custom
                .iter()
                .filter(|id| hidden.contains(id))
                .copied()
                .collect())
        }
    }
}

fn eliminate(
    factors: &mut Vec<Factor>,
    variable: VariableId,
    diagnostics: &mut EliminationDiagnostics,
) -> Result<(), InferenceError> {
    let (mentioning, rest): (Vec<Factor>, Vec<Factor>) =
        factors.drain(..).partition(|factor| factor.mentions(variable));
    *factors = rest;

    let combined = mentioning
        .iter()
        .try_fold(Factor::unit(), |acc, factor| acc.product(factor))?;
    diagnostics.max_factor_width = diagnostics.max_factor_width.max(combined.width());
    diagnostics.max_factor_size = diagnostics.max_factor_size.max(combined.len());

    factors.push(combined.sum_out(variable));
    Ok(())
}

/// Position in `candidates` of the variable whose elimination produces the
/// smallest factor.
fn min_weight_position(network: &BayesNet, candidates: &[VariableId], factors: &[Factor]) -> usize {
    let mut best = (0usize, usize::MAX, usize::MAX);
    for (pos, &candidate) in candidates.iter().enumerate() {
        let mut neighbors: SmallVec<[(VariableId, usize); 8]> = SmallVec::new();
        for factor in factors.iter().filter(|f| f.mentions(candidate)) {
            for (id, card) in factor.scope().iter().zip(factor.cardinalities()) {
                if *id != candidate && !neighbors.iter().any(|(n, _)| n == id) {
                    neighbors.push((*id, *card));
                }
            }
        }
        let weight = neighbors
            .iter()
            .fold(1usize, |acc, (_, card)| acc.saturating_mul(*card));
        let rank = network.topological_position(candidate);
        if (weight, rank) < (best.1, best.2) {
            best = (pos, weight, rank);
        }
    }
    best.0
}

pub(crate) fn contradiction(network: &BayesNet, evidence: &Evidence) -> InferenceError {
    let bound: Vec<String> = evidence
        .iter()
        .map(|(id, outcome)| match network.variable(id) {
            Some(variable) => format!("{}={}", variable.name(), outcome),
            None => format!("{:?}={}", id, outcome),
        })
        .collect();
    InferenceError::Contradiction(format!(
        "evidence [{}] has zero probability under the model",
        bound.join(", ")
    ))
}
