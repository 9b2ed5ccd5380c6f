//! Error types for network construction and inference.

use thiserror::Error;

/// Errors that can occur while building a network, binding evidence, or
/// running a query.
///
/// Match with a wildcard arm: later releases may add variants.
///
/// Construction errors (`StructuralError`, `ShapeError`) are fatal for the
/// network being built. Query errors (`UnknownVariable`, `OutOfRange`,
/// `Contradiction`) are reported per call and leave the network untouched.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Malformed graph: cycle, unknown parent, duplicate variable.
    #[error("structural error: {0}")]
    StructuralError(String),

    /// CPT dimensions or normalization do not match the declared variable.
    #[error("shape error: {0}")]
    ShapeError(String),

    /// A variable name or id that the network does not define.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// An outcome index outside `[0, cardinality)`.
    #[error("outcome {index} out of range for '{variable}' (cardinality {cardinality})")]
    OutOfRange {
        variable: String,
        index: usize,
        cardinality: usize,
    },

    /// The evidence has zero joint probability under the model.
    #[error("contradictory evidence: {0}")]
    Contradiction(String),

    /// Invalid engine configuration or declarative input.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A broken engine invariant. Never caused by caller input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InferenceError {
    /// Returns true for errors raised while building a network.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            InferenceError::StructuralError(_) | InferenceError::ShapeError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_variable() {
        let err = InferenceError::OutOfRange {
            variable: "Age".into(),
            index: 3,
            cardinality: 3,
        };
        assert_eq!(
            err.to_string(),
            "outcome 3 out of range for 'Age' (cardinality 3)"
        );
        assert!(!err.is_construction_error());
    }

    #[test]
    fn construction_errors_are_classified() {
        assert!(InferenceError::StructuralError("cycle".into()).is_construction_error());
        assert!(InferenceError::ShapeError("rows".into()).is_construction_error());
        assert!(!InferenceError::Contradiction("zero".into()).is_construction_error());
    }

    #[test]
    fn invariant_violations_are_not_construction_errors() {
        let err = InferenceError::Internal("residual factor".into());
        assert_eq!(err.to_string(), "internal error: residual factor");
        assert!(!err.is_construction_error());
    }
}
