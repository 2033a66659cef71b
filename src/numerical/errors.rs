//! error taxonomy of the engine: validation errors, numerical breakdowns and non-fatal warnings
use crate::numerical::solve_result::IterationStep;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// machine-checkable kind of every failure and warning the engine can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    // input validation
    InvalidBracket,
    InsufficientData,
    DuplicateNodes,
    UnknownFunctionId,
    UnknownMethodId,
    InvalidParameter,
    OutOfDomain,
    DivergentIntegral,
    UnequalSpacing,
    NoApplicableModel,
    SingularMatrix,
    // numerical breakdown
    ZeroDerivative,
    ZeroDivisor,
    SingularJacobian,
    CorrectorDivergence,
    DivergenceDetected,
    // non-convergence and advisories
    IterationLimitExceeded,
    ConvergenceFailure,
    ExtrapolationWarning,
    WeakCorrelation,
    StepRefinementExhausted,
    StepToleranceNotMet,
    ContractionNotGuaranteed,
    DiagonalDominanceNotReached,
}

/// whatever was computed before a breakdown stopped the solver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PartialTrace {
    Steps(Vec<IterationStep>),
    Points(Vec<(f64, f64)>),
}

impl PartialTrace {
    pub fn len(&self) -> usize {
        match self {
            PartialTrace::Steps(steps) => steps.len(),
            PartialTrace::Points(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(
        "function values at the interval endpoints must have opposite signs: \
         f({a}) = {fa}, f({b}) = {fb}"
    )]
    InvalidBracket { a: f64, b: f64, fa: f64, fb: f64 },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("interpolation nodes must be distinct, x = {0} occurs more than once")]
    DuplicateNodes(f64),

    #[error("unknown {registry} id {id}")]
    UnknownFunctionId { registry: &'static str, id: usize },

    #[error("unknown {component} method id {id}")]
    UnknownMethodId { component: &'static str, id: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("interval [{lower}, {upper}] is outside the domain of {function}")]
    OutOfDomain {
        lower: f64,
        upper: f64,
        function: &'static str,
    },

    #[error("integral of {function} diverges at x = {point}")]
    DivergentIntegral { point: f64, function: &'static str },

    #[error("finite differences need equally spaced nodes")]
    UnequalSpacing,

    #[error("no approximation model could be fitted to the data")]
    NoApplicableModel,

    #[error("matrix of the linear system is singular, det = {determinant}")]
    SingularMatrix { determinant: f64 },

    #[error("{kind:?}: {message}")]
    Breakdown {
        kind: ErrorKind,
        message: String,
        partial: PartialTrace,
    },
}

impl EngineError {
    pub fn breakdown(kind: ErrorKind, message: impl Into<String>, partial: PartialTrace) -> Self {
        EngineError::Breakdown {
            kind,
            message: message.into(),
            partial,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidBracket { .. } => ErrorKind::InvalidBracket,
            EngineError::InsufficientData(_) => ErrorKind::InsufficientData,
            EngineError::DuplicateNodes(_) => ErrorKind::DuplicateNodes,
            EngineError::UnknownFunctionId { .. } => ErrorKind::UnknownFunctionId,
            EngineError::UnknownMethodId { .. } => ErrorKind::UnknownMethodId,
            EngineError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            EngineError::OutOfDomain { .. } => ErrorKind::OutOfDomain,
            EngineError::DivergentIntegral { .. } => ErrorKind::DivergentIntegral,
            EngineError::UnequalSpacing => ErrorKind::UnequalSpacing,
            EngineError::NoApplicableModel => ErrorKind::NoApplicableModel,
            EngineError::SingularMatrix { .. } => ErrorKind::SingularMatrix,
            EngineError::Breakdown { kind, .. } => *kind,
        }
    }

    /// trace accumulated before a numerical breakdown; validation errors have none
    pub fn partial_trace(&self) -> Option<&PartialTrace> {
        match self {
            EngineError::Breakdown { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// recoverable conditions attached to a successful result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Warning {
    IterationLimitExceeded { cap: usize },
    ConvergenceFailure { subintervals: usize },
    ExtrapolationWarning { point: f64, min: f64, max: f64 },
    WeakCorrelation { r: f64 },
    StepRefinementExhausted { halvings: usize },
    StepToleranceNotMet { runge_error: f64, tolerance: f64 },
    ContractionNotGuaranteed { q: f64 },
    DiagonalDominanceNotReached,
}

impl Warning {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Warning::IterationLimitExceeded { .. } => ErrorKind::IterationLimitExceeded,
            Warning::ConvergenceFailure { .. } => ErrorKind::ConvergenceFailure,
            Warning::ExtrapolationWarning { .. } => ErrorKind::ExtrapolationWarning,
            Warning::WeakCorrelation { .. } => ErrorKind::WeakCorrelation,
            Warning::StepRefinementExhausted { .. } => ErrorKind::StepRefinementExhausted,
            Warning::StepToleranceNotMet { .. } => ErrorKind::StepToleranceNotMet,
            Warning::ContractionNotGuaranteed { .. } => ErrorKind::ContractionNotGuaranteed,
            Warning::DiagonalDominanceNotReached => ErrorKind::DiagonalDominanceNotReached,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::IterationLimitExceeded { cap } => {
                write!(f, "iteration limit of {} reached before tolerance was met", cap)
            }
            Warning::ConvergenceFailure { subintervals } => write!(
                f,
                "tolerance not met with {} subintervals, returning best estimate",
                subintervals
            ),
            Warning::ExtrapolationWarning { point, min, max } => write!(
                f,
                "point {} lies outside the data range [{}, {}]",
                point, min, max
            ),
            Warning::WeakCorrelation { r } => {
                write!(f, "no strong linear dependency detected, r = {}", r)
            }
            Warning::StepRefinementExhausted { halvings } => {
                write!(f, "step was halved {} times without meeting tolerance", halvings)
            }
            Warning::StepToleranceNotMet {
                runge_error,
                tolerance,
            } => write!(
                f,
                "Runge error {} exceeds tolerance {} at the requested step",
                runge_error, tolerance
            ),
            Warning::ContractionNotGuaranteed { q } => {
                write!(f, "iteration function is not a contraction on the interval, q = {}", q)
            }
            Warning::DiagonalDominanceNotReached => write!(
                f,
                "rows cannot be permuted to a diagonally dominant matrix, iterations may diverge"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_keeps_partial_trace() {
        let err = EngineError::breakdown(
            ErrorKind::ZeroDerivative,
            "derivative vanished",
            PartialTrace::Points(vec![(0.0, 1.0), (0.1, 0.9)]),
        );
        assert_eq!(err.kind(), ErrorKind::ZeroDerivative);
        assert_eq!(err.partial_trace().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_validation_errors_have_no_trace() {
        let err = EngineError::UnknownFunctionId {
            registry: "equation",
            id: 42,
        };
        assert_eq!(err.kind(), ErrorKind::UnknownFunctionId);
        assert!(err.partial_trace().is_none());
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_warning_kinds() {
        assert_eq!(
            Warning::IterationLimitExceeded { cap: 100 }.kind(),
            ErrorKind::IterationLimitExceeded
        );
        assert_eq!(
            Warning::ExtrapolationWarning {
                point: 5.0,
                min: 0.0,
                max: 1.0
            }
            .kind(),
            ErrorKind::ExtrapolationWarning
        );
        let coarse = Warning::StepToleranceNotMet {
            runge_error: 0.02,
            tolerance: 1e-6,
        };
        assert_eq!(coarse.kind(), ErrorKind::StepToleranceNotMet);
        assert!(coarse.to_string().contains("0.02"));
        assert_eq!(
            Warning::DiagonalDominanceNotReached.kind(),
            ErrorKind::DiagonalDominanceNotReached
        );
        let err = EngineError::SingularMatrix { determinant: 0.0 };
        assert_eq!(err.kind(), ErrorKind::SingularMatrix);
        assert!(err.partial_trace().is_none());
    }
}
