//! The credit-worthiness network.
//!
//! Eleven discrete variables:
//!
//! ```text
//! Age ──┬─> PaymentHistory ─┐
//!       ├───────────────────┼─> Reliability ─────────┐
//! Gender ───────────────────┘                        │
//! Gambler ─> RatioOfDebtsToIncome ───────────────────┼─> CreditWorthiness
//! Education ─┬─> Income ─┬─> Assets ─┐               │
//!            │           └───────────┼─> FutureIncome┘
//!            └───────────────────────┘
//! ```
//!
//! Outcome index 1 of `CreditWorthiness` is "worthy".

use crate::engine::cpt::{Cpt, NestedTable};
use crate::engine::errors::InferenceError;
use crate::engine::evidence::Evidence;
use crate::engine::network::{BayesNet, NetworkBuilder};
use crate::engine::query::BeliefQuery;

pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const GAMBLER: &str = "Gambler";
pub const EDUCATION: &str = "Education";
pub const PAYMENT_HISTORY: &str = "PaymentHistory";
pub const RATIO_OF_DEBTS_TO_INCOME: &str = "RatioOfDebtsToIncome";
pub const INCOME: &str = "Income";
pub const ASSETS: &str = "Assets";
pub const RELIABILITY: &str = "Reliability";
pub const FUTURE_INCOME: &str = "FutureIncome";
pub const CREDIT_WORTHINESS: &str = "CreditWorthiness";

/// Outcome index of a credit-worthy applicant.
pub const WORTHY: usize = 1;

/// Observable readings in console input order.
pub const READING_ORDER: [&str; 10] = [
    AGE,
    GENDER,
    GAMBLER,
    EDUCATION,
    PAYMENT_HISTORY,
    RATIO_OF_DEBTS_TO_INCOME,
    INCOME,
    ASSETS,
    RELIABILITY,
    FUTURE_INCOME,
];

/// Optional readings about one applicant. `None` means unobserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditApplicant {
    pub age: Option<usize>,
    pub gender: Option<usize>,
    pub gambler: Option<usize>,
    pub education: Option<usize>,
    pub payment_history: Option<usize>,
    pub ratio_of_debts_to_income: Option<usize>,
    pub income: Option<usize>,
    pub assets: Option<usize>,
    pub reliability: Option<usize>,
    pub future_income: Option<usize>,
}

impl CreditApplicant {
    /// Builds an applicant from readings in [`READING_ORDER`]. Missing
    /// trailing readings are unobserved.
    pub fn from_readings(readings: &[Option<usize>]) -> Result<Self, InferenceError> {
        if readings.len() > READING_ORDER.len() {
            return Err(InferenceError::ValidationError(format!(
                "expected at most {} readings, got {}",
                READING_ORDER.len(),
                readings.len()
            )));
        }
        let at = |idx: usize| readings.get(idx).copied().flatten();
        Ok(Self {
            age: at(0),
            gender: at(1),
            gambler: at(2),
            education: at(3),
            payment_history: at(4),
            ratio_of_debts_to_income: at(5),
            income: at(6),
            assets: at(7),
            reliability: at(8),
            future_income: at(9),
        })
    }

    /// `(variable name, reading)` pairs in [`READING_ORDER`].
    pub fn readings(&self) -> [(&'static str, Option<usize>); 10] {
        [
            (AGE, self.age),
            (GENDER, self.gender),
            (GAMBLER, self.gambler),
            (EDUCATION, self.education),
            (PAYMENT_HISTORY, self.payment_history),
            (RATIO_OF_DEBTS_TO_INCOME, self.ratio_of_debts_to_income),
            (INCOME, self.income),
            (ASSETS, self.assets),
            (RELIABILITY, self.reliability),
            (FUTURE_INCOME, self.future_income),
        ]
    }

    pub fn to_evidence(&self, network: &BayesNet) -> Result<Evidence, InferenceError> {
        Evidence::from_observations(network, self.readings())
    }
}

/// P(CreditWorthiness = worthy | applicant readings).
pub fn credit_worthiness(
    network: &BayesNet,
    applicant: &CreditApplicant,
) -> Result<f64, InferenceError> {
    BeliefQuery::new(network, CREDIT_WORTHINESS)?.probability_of(applicant.readings(), WORTHY)
}

/// Builds the credit network with its fixed tables.
pub fn credit_net() -> Result<BayesNet, InferenceError> {
    let mut b = NetworkBuilder::new();

    b.add_variable(AGE, 3, &[])?;
    b.add_variable(GENDER, 2, &[])?;
    b.add_variable(GAMBLER, 2, &[])?;
    b.add_variable(EDUCATION, 3, &[])?;
    b.add_variable(PAYMENT_HISTORY, 3, &[AGE])?;
    b.add_variable(RATIO_OF_DEBTS_TO_INCOME, 2, &[GAMBLER])?;
    b.add_variable(INCOME, 3, &[EDUCATION])?;
    b.add_variable(ASSETS, 3, &[INCOME])?;
    b.add_variable(RELIABILITY, 2, &[AGE, GENDER, PAYMENT_HISTORY])?;
    b.add_variable(FUTURE_INCOME, 2, &[EDUCATION, INCOME, ASSETS])?;
    b.add_variable(
        CREDIT_WORTHINESS,
        2,
        &[RATIO_OF_DEBTS_TO_INCOME, RELIABILITY, FUTURE_INCOME],
    )?;

    b.set_outcome_labels(AGE, &["Young", "Middle", "Old"])?;
    b.set_outcome_labels(GENDER, &["Male", "Female"])?;
    b.set_outcome_labels(GAMBLER, &["Gambler", "NotGambler"])?;
    b.set_outcome_labels(EDUCATION, &["Elementary", "Secondary", "Higher"])?;
    b.set_outcome_labels(PAYMENT_HISTORY, &["Unacceptable", "Acceptable", "Excellent"])?;
    b.set_outcome_labels(RATIO_OF_DEBTS_TO_INCOME, &["Low", "High"])?;
    b.set_outcome_labels(INCOME, &["Low", "Medium", "High"])?;
    b.set_outcome_labels(ASSETS, &["Low", "Medium", "High"])?;
    b.set_outcome_labels(RELIABILITY, &["Unreliable", "Reliable"])?;
    b.set_outcome_labels(FUTURE_INCOME, &["Low", "High"])?;
    b.set_outcome_labels(CREDIT_WORTHINESS, &["Unworthy", "Worthy"])?;

    b.attach_cpt(AGE, Cpt::prior(vec![0.35, 0.5, 0.15])?)?;
    b.attach_cpt(GENDER, Cpt::prior(vec![0.5, 0.5])?)?;
    b.attach_cpt(GAMBLER, Cpt::prior(vec![0.3, 0.7])?)?;
    b.attach_cpt(EDUCATION, Cpt::prior(vec![0.1, 0.6, 0.3])?)?;

    // Age
    b.attach_cpt(
        PAYMENT_HISTORY,
        Cpt::from_rows(
            &[3],
            vec![
                vec![0.5, 0.4, 0.1],
                vec![0.2, 0.5, 0.3],
                vec![0.1, 0.4, 0.5],
            ],
        )?,
    )?;
    // Gambler
    b.attach_cpt(
        RATIO_OF_DEBTS_TO_INCOME,
        Cpt::from_rows(&[2], vec![vec![0.1, 0.9], vec![0.7, 0.3]])?,
    )?;
    // Education
    b.attach_cpt(
        INCOME,
        Cpt::from_rows(
            &[3],
            vec![
                vec![0.75, 0.2, 0.05],
                vec![0.2, 0.6, 0.2],
                vec![0.1, 0.5, 0.4],
            ],
        )?,
    )?;
    // Income
    b.attach_cpt(
        ASSETS,
        Cpt::from_rows(
            &[3],
            vec![
                vec![0.8, 0.15, 0.05],
                vec![0.3, 0.6, 0.1],
                vec![0.1, 0.4, 0.5],
            ],
        )?,
    )?;

    // Age x Gender x PaymentHistory
    let reliability = NestedTable::Branch(vec![
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.05, 0.95]]),
            NestedTable::rows(vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.05, 0.95]]),
        ]),
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.9, 0.1], vec![0.3, 0.7], vec![0.2, 0.8]]),
            NestedTable::rows(vec![vec![0.7, 0.3], vec![0.2, 0.8], vec![0.05, 0.95]]),
        ]),
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.8, 0.2], vec![0.2, 0.8], vec![0.1, 0.9]]),
            NestedTable::rows(vec![vec![0.6, 0.4], vec![0.15, 0.85], vec![0.01, 0.99]]),
        ]),
    ]);
    b.attach_cpt(RELIABILITY, Cpt::from_nested(&[3, 2, 3], &reliability)?)?;

    // Education x Income x Assets
    let future_income = NestedTable::Branch(vec![
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.99, 0.01], vec![0.88, 0.12], vec![0.8, 0.2]]),
            NestedTable::rows(vec![vec![0.85, 0.15], vec![0.75, 0.25], vec![0.7, 0.3]]),
            NestedTable::rows(vec![vec![0.8, 0.2], vec![0.7, 0.3], vec![0.6, 0.4]]),
        ]),
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.9, 0.1], vec![0.8, 0.2], vec![0.7, 0.3]]),
            NestedTable::rows(vec![vec![0.8, 0.2], vec![0.7, 0.3], vec![0.6, 0.4]]),
            NestedTable::rows(vec![vec![0.7, 0.3], vec![0.6, 0.4], vec![0.5, 0.5]]),
        ]),
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.3, 0.7], vec![0.4, 0.6], vec![0.5, 0.5]]),
            NestedTable::rows(vec![vec![0.3, 0.7], vec![0.2, 0.8], vec![0.1, 0.9]]),
            NestedTable::rows(vec![vec![0.2, 0.8], vec![0.1, 0.9], vec![0.05, 0.95]]),
        ]),
    ]);
    b.attach_cpt(FUTURE_INCOME, Cpt::from_nested(&[3, 3, 3], &future_income)?)?;

    // RatioOfDebtsToIncome x Reliability x FutureIncome
    let credit_worthiness = NestedTable::Branch(vec![
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.4, 0.6], vec![0.2, 0.8]]),
            NestedTable::rows(vec![vec![0.3, 0.7], vec![0.01, 0.99]]),
        ]),
        NestedTable::Branch(vec![
            NestedTable::rows(vec![vec![0.99, 0.01], vec![0.7, 0.3]]),
            NestedTable::rows(vec![vec![0.8, 0.2], vec![0.6, 0.4]]),
        ]),
    ]);
    b.attach_cpt(
        CREDIT_WORTHINESS,
        Cpt::from_nested(&[2, 2, 2], &credit_worthiness)?,
    )?;

    b.build()
}
