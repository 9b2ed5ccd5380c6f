//! Brute-force inference by enumerating the full joint distribution.
//!
//! Deliberately independent of the factor machinery: it walks every
//! assignment of the latent variables and multiplies CPT entries along the
//! chain rule. Exponential in the number of latent variables, so it serves
//! as a reference oracle for small networks rather than a query engine.

use crate::engine::elimination::{contradiction, PosteriorMarginal};
use crate::engine::errors::InferenceError;
use crate::engine::evidence::Evidence;
use crate::engine::network::{BayesNet, VariableId};

/// Upper bound on the number of joint assignments enumerated per query.
pub const MAX_ENUMERATED_STATES: usize = 1 << 24;

/// P(X = assignment) for a full assignment indexed by variable id.
pub fn joint_probability(network: &BayesNet, assignment: &[usize]) -> Result<f64, InferenceError> {
    if assignment.len() != network.len() {
        return Err(InferenceError::ValidationError(format!(
            "joint_probability: assignment has {} values for {} variables",
            assignment.len(),
            network.len()
        )));
    }

    let mut parent_values = Vec::new();
    let mut probability = 1.0;
    for variable in network.variables() {
        let outcome = assignment[variable.id().index()];
        variable.check_outcome(outcome)?;
        parent_values.clear();
        parent_values.extend(variable.parents().iter().map(|p| assignment[p.index()]));
        probability *= variable.cpt().probability(&parent_values, outcome)?;
    }
    Ok(probability)
}

/// Posterior marginal of `query` by summing the full joint over every
/// assignment consistent with `evidence`.
pub fn enumerate_posterior(
    network: &BayesNet,
    evidence: &Evidence,
    query: VariableId,
) -> Result<PosteriorMarginal, InferenceError> {
    let target = network.resolve(query)?;
    evidence.validate(network)?;

    let mut assignment: Vec<usize> = evidence
        .dense(network)
        .into_iter()
        .map(|observed| observed.unwrap_or(0))
        .collect();
    let latent: Vec<(usize, usize)> = network
        .variables()
        .iter()
        .filter(|v| !evidence.is_observed(v.id()))
        .map(|v| (v.id().index(), v.cardinality()))
        .collect();

    let states = latent
        .iter()
        .try_fold(1usize, |acc, (_, card)| acc.checked_mul(*card))
        .filter(|states| *states <= MAX_ENUMERATED_STATES)
        .ok_or_else(|| {
            InferenceError::ValidationError(format!(
                "enumeration: more than {} joint states",
                MAX_ENUMERATED_STATES
            ))
        })?;

    let mut totals = vec![0.0; target.cardinality()];
    for _ in 0..states {
        totals[assignment[query.index()]] += joint_probability(network, &assignment)?;

        for &(idx, card) in latent.iter().rev() {
            assignment[idx] += 1;
            if assignment[idx] < card {
                break;
            }
            assignment[idx] = 0;
        }
    }

    let total: f64 = totals.iter().sum();
    if !(total > 0.0) {
        return Err(contradiction(network, evidence));
    }
    Ok(PosteriorMarginal::from_parts(
        target,
        totals.into_iter().map(|p| p / total).collect(),
    ))
}
