//! Integration tests: JSON network definitions, contradictory evidence and
//! batched queries.

use credence_core::engine::elimination::{
    posterior_marginal, posterior_marginal_with_diagnostics, EliminationConfig,
};
use credence_core::models::credit_net::{
    credit_net, CreditApplicant, CREDIT_WORTHINESS, GAMBLER, WORTHY,
};
use credence_core::{BeliefQuery, Evidence, InferenceError, NetworkDef};
use credence_tests::{assert_distributions_close, sprinkler, switch_and_light};

const TOLERANCE: f64 = 1e-9;

const SPRINKLER_JSON: &str = r#"{
  "variables": [
    { "name": "WetGrass", "cardinality": 2, "parents": ["Sprinkler", "Rain"],
      "outcomes": ["Dry", "Wet"],
      "table": [[[1.0, 0.0], [0.1, 0.9]], [[0.1, 0.9], [0.01, 0.99]]] },
    { "name": "Rain", "cardinality": 2, "parents": ["Cloudy"],
      "table": [[0.8, 0.2], [0.2, 0.8]] },
    { "name": "Sprinkler", "cardinality": 2, "parents": ["Cloudy"],
      "table": [[0.5, 0.5], [0.9, 0.1]] },
    { "name": "Cloudy", "cardinality": 2, "table": [0.5, 0.5] }
  ]
}"#;

#[test]
fn json_definition_loads_in_any_declaration_order() {
    let def: NetworkDef = serde_json::from_str(SPRINKLER_JSON).expect("valid JSON");
    let net = def.build().expect("network");
    assert_eq!(net.len(), 4);

    let order: Vec<&str> = net
        .topological_order()
        .iter()
        .map(|id| net.variable(*id).expect("variable").name())
        .collect();
    assert_eq!(order.first(), Some(&"Cloudy"));
    assert_eq!(order.last(), Some(&"WetGrass"));

    let wet = net.variable_by_name("WetGrass").expect("wet grass");
    assert_eq!(wet.outcome_label(1), Some("Wet"));
    assert_eq!(net.variable_by_name("Rain").expect("rain").outcome_label(0), None);
}

#[test]
fn json_and_builder_networks_answer_alike() {
    let from_json = serde_json::from_str::<NetworkDef>(SPRINKLER_JSON)
        .expect("valid JSON")
        .build()
        .expect("network");
    let built = sprinkler();

    for net in [&from_json, &built] {
        let query = BeliefQuery::new(net, "Rain").expect("query");
        let p = query.probability_of([("WetGrass", Some(1))], 1).expect("p");
        assert!((p - 0.7079276773296246).abs() < TOLERANCE, "got {}", p);

        let query = BeliefQuery::new(net, "Sprinkler").expect("query");
        let p = query.probability_of([("WetGrass", Some(1))], 1).expect("p");
        assert!((p - 0.4297635605006954).abs() < TOLERANCE, "got {}", p);

        // Explaining away: rain makes the sprinkler less likely.
        let p = query
            .probability_of([("WetGrass", Some(1)), ("Rain", Some(1))], 1)
            .expect("p");
        assert!((p - 0.1944990176817289).abs() < TOLERANCE, "got {}", p);
    }
}

#[test]
fn evidence_probability_is_reported() {
    let net = sprinkler();
    let mut evidence = Evidence::new();
    evidence.bind(&net, "WetGrass", Some(1)).expect("bind");
    let (marginal, diagnostics) = posterior_marginal_with_diagnostics(
        &net,
        &evidence,
        net.id_of("Cloudy").expect("cloudy"),
        &EliminationConfig::default(),
    )
    .expect("posterior");
    assert!((diagnostics.evidence_probability - 0.6471).abs() < TOLERANCE);
    assert!((marginal.probabilities()[1] - 0.5757997218358832).abs() < TOLERANCE);
}

#[test]
fn malformed_json_tables_are_shape_errors() {
    let json = r#"{ "variables": [
        { "name": "A", "cardinality": 2, "table": [0.5, 0.5] },
        { "name": "B", "cardinality": 2, "parents": ["A"], "table": [[0.5, 0.5]] }
    ] }"#;
    let err = serde_json::from_str::<NetworkDef>(json)
        .expect("valid JSON")
        .build()
        .unwrap_err();
    assert!(matches!(err, InferenceError::ShapeError(_)), "got {:?}", err);
    assert!(err.is_construction_error());
}

#[test]
fn definition_survives_a_json_round_trip() {
    let def: NetworkDef = serde_json::from_str(SPRINKLER_JSON).expect("valid JSON");
    let text = serde_json::to_string(&def).expect("serialize");
    let again: NetworkDef = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(def, again);
}

#[test]
fn impossible_evidence_is_a_contradiction() {
    let net = switch_and_light();
    let mut evidence = Evidence::new();
    evidence.bind(&net, "Switch", Some(0)).expect("bind");
    evidence.bind(&net, "Light", Some(1)).expect("bind");

    for name in ["Switch", "Light"] {
        let err = posterior_marginal(&net, &evidence, net.id_of(name).expect("id")).unwrap_err();
        assert!(matches!(err, InferenceError::Contradiction(_)), "got {:?}", err);
    }
}

#[test]
fn deterministic_rows_still_answer_consistent_evidence() {
    let net = switch_and_light();
    let query = BeliefQuery::new(&net, "Switch").expect("query");

    let p = query.probability_of([("Light", Some(1))], 1).expect("p");
    assert!((p - 1.0).abs() < TOLERANCE);

    let p = query.probability_of([("Light", Some(0))], 0).expect("p");
    assert!((p - 0.4 / 0.43).abs() < TOLERANCE);
}

#[test]
fn batch_reports_each_result_separately() {
    let net = switch_and_light();
    let query = BeliefQuery::new(&net, "Light").expect("query");

    let good = Evidence::from_observations(&net, [("Switch", Some(1))]).expect("evidence");
    let bad = Evidence::from_observations(&net, [("Switch", Some(0)), ("Light", Some(1))])
        .expect("evidence");
    let results = query.posterior_batch(&[Evidence::new(), bad, good]);

    assert_eq!(results.len(), 3);
    let prior = results[0].as_ref().expect("prior");
    assert_distributions_close(prior.probabilities(), &[0.43, 0.57], TOLERANCE);
    assert!(matches!(results[1], Err(InferenceError::Contradiction(_))));
    let lit = results[2].as_ref().expect("switch on");
    assert_distributions_close(lit.probabilities(), &[0.05, 0.95], TOLERANCE);
}

#[test]
fn credit_batch_over_applicants() {
    let net = credit_net().expect("credit net");
    let query = BeliefQuery::new(&net, CREDIT_WORTHINESS).expect("query");

    let applicants = [
        CreditApplicant::default(),
        CreditApplicant {
            gambler: Some(0),
            ..CreditApplicant::default()
        },
        CreditApplicant::from_readings(&[Some(0), Some(1), Some(1), Some(2)]).expect("readings"),
    ];
    let evidences: Vec<Evidence> = applicants
        .iter()
        .map(|a| a.to_evidence(&net).expect("evidence"))
        .collect();
    let expected = [0.5129842710075004, 0.2848949548499981, 0.6968730299999999];

    for (result, expected) in query.posterior_batch(&evidences).into_iter().zip(expected) {
        let p = result.expect("posterior").probability(WORTHY).expect("p");
        assert!((p - expected).abs() < TOLERANCE, "expected {}, got {}", expected, p);
    }

    let gambler = Evidence::from_observations(&net, [(GAMBLER, Some(0))]).expect("evidence");
    assert_eq!(evidences[1], gambler);
}

#[test]
fn posterior_serializes_with_its_variable_name() {
    let net = sprinkler();
    let marginal = posterior_marginal(&net, &Evidence::new(), net.id_of("Rain").expect("rain"))
        .expect("posterior");
    let value = serde_json::to_value(&marginal).expect("serialize");
    assert_eq!(value["name"], "Rain");
    let probabilities = value["probabilities"].as_array().expect("array");
    assert_eq!(probabilities.len(), 2);
}
