//! Query façade: the probability of one outcome of a fixed target variable.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::engine::elimination::{
    posterior_marginal_with_config, EliminationConfig, PosteriorMarginal,
};
use crate::engine::errors::InferenceError;
use crate::engine::evidence::Evidence;
use crate::engine::network::{BayesNet, VariableId};

/// A reusable query against one target variable of a shared network.
///
/// Holds only a borrowed network and configuration; every call builds its
/// own factors, so one `BeliefQuery` can serve many threads.
#[derive(Debug, Clone)]
pub struct BeliefQuery<'n> {
    network: &'n BayesNet,
    target: VariableId,
    config: EliminationConfig,
}

impl<'n> BeliefQuery<'n> {
    /// Targets the variable called `target`.
    pub fn new(network: &'n BayesNet, target: &str) -> Result<Self, InferenceError> {
        let target = network.id_of(target)?;
        Ok(Self {
            network,
            target,
            config: EliminationConfig::default(),
        })
    }

    /// Replaces the elimination configuration.
    pub fn with_config(mut self, config: EliminationConfig) -> Result<Self, InferenceError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn network(&self) -> &'n BayesNet {
        self.network
    }

    pub fn target(&self) -> VariableId {
        self.target
    }

    pub fn config(&self) -> &EliminationConfig {
        &self.config
    }

    /// Full posterior over the target's outcomes.
    pub fn posterior(&self, evidence: &Evidence) -> Result<PosteriorMarginal, InferenceError> {
        posterior_marginal_with_config(self.network, evidence, self.target, &self.config)
    }

    /// P(target = outcome | evidence).
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `outcome` is not a valid index for the target; any
    /// evidence or contradiction error from the engine unchanged.
    pub fn probability(&self, evidence: &Evidence, outcome: usize) -> Result<f64, InferenceError> {
        self.network.resolve(self.target)?.check_outcome(outcome)?;
        self.posterior(evidence)?.probability(outcome)
    }

    /// P(target = outcome | readings) for `(name, optional outcome)` readings.
    pub fn probability_of<'a, I>(&self, readings: I, outcome: usize) -> Result<f64, InferenceError>
    where
        I: IntoIterator<Item = (&'a str, Option<usize>)>,
    {
        let evidence = Evidence::from_observations(self.network, readings)?;
        self.probability(&evidence, outcome)
    }

    /// Evaluates independent queries, one per evidence set, in input order.
    ///
    /// With the `rayon` feature the queries run in parallel.
    pub fn posterior_batch(
        &self,
        evidences: &[Evidence],
    ) -> Vec<Result<PosteriorMarginal, InferenceError>> {
        #[cfg(feature = "rayon")]
        {
            evidences
                .par_iter()
                .map(|evidence| self.posterior(evidence))
                .collect()
        }

        #[cfg(not(feature = "rayon"))]
        {
            evidences
                .iter()
                .map(|evidence| self.posterior(evidence))
                .collect()
        }
    }
}
