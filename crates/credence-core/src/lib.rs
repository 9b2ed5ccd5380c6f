//! # Credence Core
//!
//! Exact inference over discrete Bayesian networks.
//!
//! ## Architecture
//!
//! - **engine**: CPT store, network definition, evidence binding, the
//!   variable-elimination engine and the query façade
//! - **models**: ready-made networks (the credit-worthiness network)
//!
//! ## Usage
//!
//! ```rust
//! use credence_core::models::credit_net::{credit_net, credit_worthiness, CreditApplicant};
//!
//! let network = credit_net().expect("valid network");
//! let applicant = CreditApplicant {
//!     age: Some(0),
//!     education: Some(2),
//!     ..CreditApplicant::default()
//! };
//! let p = credit_worthiness(&network, &applicant).expect("consistent evidence");
//! assert!((0.0..=1.0).contains(&p));
//! ```

#![forbid(unsafe_code)]

pub mod engine;
pub mod models;

// Re-export commonly used types
pub use engine::cpt::{Cpt, NestedTable};
pub use engine::elimination::{
    posterior_marginal, EliminationConfig, EliminationOrder, PosteriorMarginal,
};
pub use engine::errors::InferenceError;
pub use engine::evidence::Evidence;
pub use engine::model_def::{NetworkDef, VariableDef};
pub use engine::network::{BayesNet, NetworkBuilder, Variable, VariableId};
pub use engine::query::BeliefQuery;
