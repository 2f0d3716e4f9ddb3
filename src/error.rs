// src/error.rs
//
// Error types for the chain solvers.
//
// Only genuine failures live here. Missing measurement outcomes (no soliton,
// too few points to fit) are `kinematics::Missing`, not errors.

use crate::ode::OdeError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// A physical or numerical parameter violates its constraint.
    #[error("parameter `{field}` violates constraint: {constraint}")]
    InvalidParameter {
        field: &'static str,
        constraint: &'static str,
    },

    /// A chain needs at least one site.
    #[error("spin chain must contain at least one site")]
    EmptyChain,

    /// Two per-site buffers disagree on the number of sites.
    #[error("site count mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// The adaptive stepper could not advance the LLG system.
    #[error("integration failed: {0}")]
    Integration(#[from] OdeError),

    /// A persisted trajectory record has an inconsistent shape.
    #[error("malformed trajectory record: {0}")]
    MalformedTrajectory(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_parameter() {
        let err = ChainError::InvalidParameter {
            field: "alpha",
            constraint: "alpha >= 0",
        };
        assert_eq!(
            err.to_string(),
            "parameter `alpha` violates constraint: alpha >= 0"
        );
    }

    #[test]
    fn ode_errors_convert() {
        let err: ChainError = OdeError::MaxStepsExceeded { t: 1.5, steps: 10 }.into();
        assert!(matches!(err, ChainError::Integration(_)));
        assert!(err.to_string().starts_with("integration failed"));
    }
}
