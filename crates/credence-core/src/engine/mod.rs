//! The inference engine for discrete Bayesian networks.
//!
//! This module provides:
//! - **errors**: Error types for construction and query failures
//! - **cpt**: Conditional probability tables keyed by parent-value tuples
//! - **network**: The validated, immutable DAG of variables
//! - **model_def**: Declarative (data-driven) network definitions
//! - **evidence**: Sparse observed-outcome bindings
//! - **factor**: Inference-time tables and their algebra
//! - **elimination**: Exact posterior marginals by variable elimination
//! - **enumeration**: Full-joint enumeration, the reference oracle
//! - **query**: The single-target query façade

pub mod cpt;
pub mod elimination;
pub mod enumeration;
pub mod errors;
pub mod evidence;
pub mod factor;
pub mod model_def;
pub mod network;
pub mod query;
