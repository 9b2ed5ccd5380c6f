//! Property tests: variable elimination agrees with full-joint enumeration on
//! random small networks, whatever the order or pruning setting.

use credence_core::engine::elimination::{
    posterior_marginal, posterior_marginal_with_config, EliminationConfig, EliminationOrder,
};
use credence_core::engine::enumeration::enumerate_posterior;
use credence_core::{BayesNet, BeliefQuery, Cpt, Evidence, InferenceError, VariableId};
use credence_tests::{assert_distributions_close, RandomShape};
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-9;

fn arb_shape() -> impl Strategy<Value = RandomShape> {
    (2usize..=6).prop_flat_map(|n| {
        (
            prop::collection::vec(2usize..=3, n),
            prop::collection::vec(any::<u32>(), n),
            prop::collection::vec(0.05f64..1.0, 1..16),
        )
            .prop_map(|(cardinalities, parent_masks, weights)| RandomShape {
                cardinalities,
                parent_masks,
                weights,
            })
    })
}

/// A network, evidence readings and a query index.
fn arb_case() -> impl Strategy<Value = (BayesNet, Evidence, VariableId)> {
    (
        arb_shape(),
        prop::collection::vec(prop::option::weighted(0.4, 0usize..3), 6),
        0usize..6,
    )
        .prop_map(|(shape, readings, query)| {
            let net = shape.build().expect("random shape is valid");
            let mut evidence = Evidence::new();
            for (variable, reading) in net.variables().iter().zip(readings) {
                if let Some(outcome) = reading {
                    evidence
                        .observe(&net, variable.id(), outcome % variable.cardinality())
                        .expect("in range");
                }
            }
            let target = VariableId((query % net.len()) as u32);
            (net, evidence, target)
        })
}

fn latent_order(net: &BayesNet, target: VariableId, rotate: usize, reverse: bool) -> Vec<VariableId> {
    let mut order: Vec<VariableId> = net
        .variables()
        .iter()
        .map(|v| v.id())
        .filter(|id| *id != target)
        .collect();
    if !order.is_empty() {
        let k = rotate % order.len();
        order.rotate_left(k);
    }
    if reverse {
        order.reverse();
    }
    order
}

proptest! {
    #[test]
    fn elimination_matches_enumeration((net, evidence, target) in arb_case()) {
        let fast = posterior_marginal(&net, &evidence, target).expect("elimination");
        let slow = enumerate_posterior(&net, &evidence, target).expect("enumeration");
        assert_distributions_close(fast.probabilities(), slow.probabilities(), TOLERANCE);
    }

    #[test]
    fn posterior_is_a_distribution((net, evidence, target) in arb_case()) {
        let marginal = posterior_marginal(&net, &evidence, target).expect("posterior");
        let total: f64 = marginal.probabilities().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-12);
        prop_assert!(marginal.probabilities().iter().all(|p| (0.0..=1.0).contains(p)));
        prop_assert_eq!(
            marginal.probabilities().len(),
            net.variable(target).expect("target").cardinality()
        );
    }

    #[test]
    fn orders_and_pruning_do_not_change_the_answer(
        (net, evidence, target) in arb_case(),
        rotate in 0usize..8,
        reverse in any::<bool>(),
    ) {
        let reference = posterior_marginal(&net, &evidence, target).expect("reference");
        let configs = vec![
            EliminationConfig::with_order(EliminationOrder::MinWeight),
            EliminationConfig::with_order(EliminationOrder::Custom(
                latent_order(&net, target, rotate, reverse),
            )),
            EliminationConfig {
                prune_barren: false,
                ..EliminationConfig::default()
            },
        ];
        for config in configs {
            let marginal = posterior_marginal_with_config(&net, &evidence, target, &config)
                .expect("posterior");
            assert_distributions_close(marginal.probabilities(), reference.probabilities(), TOLERANCE);
        }
    }

    #[test]
    fn observed_query_is_a_point_mass((net, mut evidence, target) in arb_case(), outcome in 0usize..3) {
        let cardinality = net.variable(target).expect("target").cardinality();
        let outcome = outcome % cardinality;
        evidence.observe(&net, target, outcome).expect("observe");
        let marginal = posterior_marginal(&net, &evidence, target).expect("posterior");
        for (idx, p) in marginal.probabilities().iter().enumerate() {
            prop_assert_eq!(*p, if idx == outcome { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn batch_matches_sequential_queries(shape in arb_shape(), outcomes in prop::collection::vec(0usize..3, 1..6)) {
        let net = shape.build().expect("network");
        let target = RandomShape::name(net.len() - 1);
        let query = BeliefQuery::new(&net, &target).expect("query");
        let root = net.variables()[0].id();
        let evidences: Vec<Evidence> = outcomes
            .iter()
            .map(|&o| {
                let mut ev = Evidence::new();
                ev.observe(&net, root, o % net.variables()[0].cardinality()).expect("observe");
                ev
            })
            .collect();

        let batch = query.posterior_batch(&evidences);
        prop_assert_eq!(batch.len(), evidences.len());
        for (result, evidence) in batch.into_iter().zip(&evidences) {
            let single = query.posterior(evidence).expect("single");
            prop_assert_eq!(result.expect("batch"), single);
        }
    }

    #[test]
    fn unnormalized_rows_are_rejected(
        row in prop::collection::vec(0.05f64..1.0, 2..5),
        scale in 1.1f64..3.0,
    ) {
        let total: f64 = row.iter().sum();
        let scaled: Vec<f64> = row.iter().map(|w| w / total * scale).collect();
        prop_assert!(matches!(Cpt::prior(scaled), Err(InferenceError::ShapeError(_))));

        let normalized: Vec<f64> = row.iter().map(|w| w / total).collect();
        prop_assert!(Cpt::prior(normalized).is_ok());
    }

    #[test]
    fn every_stored_row_sums_to_one(shape in arb_shape()) {
        let net = shape.build().expect("network");
        for variable in net.variables() {
            let cpt = variable.cpt();
            for row_idx in 0..cpt.row_count() {
                let mut key = Vec::with_capacity(cpt.parent_cardinalities().len());
                let mut rest = row_idx;
                for &card in cpt.parent_cardinalities().iter().rev() {
                    key.push(rest % card);
                    rest /= card;
                }
                key.reverse();
                let row = cpt.row(&key).expect("row");
                let total: f64 = row.iter().sum();
                prop_assert!((total - 1.0).abs() < 1e-6);
            }
        }
    }
}
