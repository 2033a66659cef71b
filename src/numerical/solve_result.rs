//! result structures shared by the solvers. All of them are built once per call and returned whole.
use crate::Utils::trace_table::steps_table;
use crate::numerical::errors::{EngineError, ErrorKind, Warning};
use serde::Serialize;

/// one row of a solver trace, in chronological order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IterationStep {
    HalfDivision {
        iteration: usize,
        a: f64,
        b: f64,
        x: f64,
        fa: f64,
        fb: f64,
        fx: f64,
        abs_diff: f64,
    },
    SimpleIteration {
        iteration: usize,
        x_k: f64,
        x_k_plus_one: f64,
        phi_x_k: f64,
        f_x_k_plus_one: f64,
        abs_diff: f64,
    },
    Newton {
        iteration: usize,
        x_k: f64,
        f_x_k: f64,
        f_prime_x_k: f64,
        x_k_plus_one: f64,
        abs_diff: f64,
    },
    Secant {
        iteration: usize,
        x_k_minus_one: f64,
        x_k: f64,
        x_k_plus_one: f64,
        f_x_k_plus_one: f64,
        abs_diff: f64,
    },
    System {
        iteration: usize,
        x_k: f64,
        y_k: f64,
        dx: f64,
        dy: f64,
        update_norm: f64,
        residual_norm: f64,
    },
    Quadrature {
        iteration: usize,
        subintervals: usize,
        value: f64,
        runge_error: f64,
    },
    /// one sweep of simple iteration for a linear system
    Jacobi {
        iteration: usize,
        x: Vec<f64>,
        max_error: f64,
    },
}

impl IterationStep {
    pub fn iteration(&self) -> usize {
        match self {
            IterationStep::HalfDivision { iteration, .. }
            | IterationStep::SimpleIteration { iteration, .. }
            | IterationStep::Newton { iteration, .. }
            | IterationStep::Secant { iteration, .. }
            | IterationStep::System { iteration, .. }
            | IterationStep::Quadrature { iteration, .. }
            | IterationStep::Jacobi { iteration, .. } => *iteration,
        }
    }

    /// column titles of the trace table for this kind of step
    pub fn headers(&self) -> Vec<&'static str> {
        match self {
            IterationStep::HalfDivision { .. } => {
                vec!["№", "a", "b", "x", "f(a)", "f(b)", "f(x)", "|a-b|"]
            }
            IterationStep::SimpleIteration { .. } => {
                vec!["№", "x_k", "x_k+1", "φ(x_k)", "f(x_k+1)", "|x_k+1-x_k|"]
            }
            IterationStep::Newton { .. } => {
                vec!["№", "x_k", "f(x_k)", "f'(x_k)", "x_k+1", "|x_k+1-x_k|"]
            }
            IterationStep::Secant { .. } => {
                vec!["№", "x_k-1", "x_k", "x_k+1", "f(x_k+1)", "|x_k+1-x_k|"]
            }
            IterationStep::System { .. } => {
                vec!["№", "x_k", "y_k", "dx", "dy", "|dx,dy|", "|F|"]
            }
            IterationStep::Quadrature { .. } => vec!["№", "n", "I_n", "Runge error"],
            IterationStep::Jacobi { .. } => vec!["№", "x_k", "max |x_k - x_k-1|"],
        }
    }

    pub fn row(&self) -> Vec<String> {
        let fmt = |v: &f64| format!("{:.8}", v);
        match self {
            IterationStep::HalfDivision {
                iteration,
                a,
                b,
                x,
                fa,
                fb,
                fx,
                abs_diff,
            } => {
                let mut row = vec![iteration.to_string()];
                row.extend([a, b, x, fa, fb, fx, abs_diff].iter().map(|v| fmt(*v)));
                row
            }
            IterationStep::SimpleIteration {
                iteration,
                x_k,
                x_k_plus_one,
                phi_x_k,
                f_x_k_plus_one,
                abs_diff,
            } => {
                let mut row = vec![iteration.to_string()];
                row.extend(
                    [x_k, x_k_plus_one, phi_x_k, f_x_k_plus_one, abs_diff]
                        .iter()
                        .map(|v| fmt(*v)),
                );
                row
            }
            IterationStep::Newton {
                iteration,
                x_k,
                f_x_k,
                f_prime_x_k,
                x_k_plus_one,
                abs_diff,
            } => {
                let mut row = vec![iteration.to_string()];
                row.extend(
                    [x_k, f_x_k, f_prime_x_k, x_k_plus_one, abs_diff]
                        .iter()
                        .map(|v| fmt(*v)),
                );
                row
            }
            IterationStep::Secant {
                iteration,
                x_k_minus_one,
                x_k,
                x_k_plus_one,
                f_x_k_plus_one,
                abs_diff,
            } => {
                let mut row = vec![iteration.to_string()];
                row.extend(
                    [x_k_minus_one, x_k, x_k_plus_one, f_x_k_plus_one, abs_diff]
                        .iter()
                        .map(|v| fmt(*v)),
                );
                row
            }
            IterationStep::System {
                iteration,
                x_k,
                y_k,
                dx,
                dy,
                update_norm,
                residual_norm,
            } => {
                let mut row = vec![iteration.to_string()];
                row.extend(
                    [x_k, y_k, dx, dy, update_norm, residual_norm]
                        .iter()
                        .map(|v| fmt(*v)),
                );
                row
            }
            IterationStep::Quadrature {
                iteration,
                subintervals,
                value,
                runge_error,
            } => vec![
                iteration.to_string(),
                subintervals.to_string(),
                fmt(value),
                format!("{:.3e}", runge_error),
            ],
            IterationStep::Jacobi {
                iteration,
                x,
                max_error,
            } => vec![
                iteration.to_string(),
                format!("[{}]", x.iter().map(fmt).collect::<Vec<_>>().join(", ")),
                format!("{:.3e}", max_error),
            ],
        }
    }
}

/// outcome of a scalar root search or of a numerical integration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    pub method_id: usize,
    pub function_id: Option<usize>,
    /// root for equations, integral for quadrature
    pub value: f64,
    /// f(root) for equations, None for quadrature
    pub function_value: Option<f64>,
    /// iterations for equations, subintervals used for quadrature
    pub iterations: usize,
    pub error_value: f64,
    pub steps: Vec<IterationStep>,
    pub message: Option<String>,
    pub warnings: Vec<Warning>,
    /// analytic value when the registry knows one (integrals)
    pub exact_value: Option<f64>,
}

impl SolveResult {
    /// false when the solver stopped at its cap instead of meeting the tolerance
    pub fn converged(&self) -> bool {
        !self.warnings.iter().any(|w| {
            matches!(
                w.kind(),
                ErrorKind::IterationLimitExceeded | ErrorKind::ConvergenceFailure
            )
        })
    }

    pub fn has_warning(&self, kind: ErrorKind) -> bool {
        self.warnings.iter().any(|w| w.kind() == kind)
    }

    /// trace rendered as a pretty table
    pub fn table(&self) -> String {
        steps_table(&self.steps)
    }
}

/// outcome of Newton's method for a system of two equations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSolveResult {
    pub function_id: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub iterations: usize,
    /// Euclidean norm of the last update
    pub error_value: f64,
    /// Euclidean norm of (f1, f2) at the returned point
    pub residual_norm: f64,
    pub steps: Vec<IterationStep>,
    pub warnings: Vec<Warning>,
}

impl SystemSolveResult {
    pub fn converged(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| w.kind() == ErrorKind::IterationLimitExceeded)
    }

    pub fn table(&self) -> String {
        steps_table(&self.steps)
    }
}

/// paired x and y samples of the same length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DataSet {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<DataSet, EngineError> {
        if x.len() != y.len() {
            return Err(EngineError::InsufficientData(format!(
                "x and y must have the same length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidParameter(
                "data must contain only finite numbers".to_string(),
            ));
        }
        Ok(DataSet { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        let min = self.x.iter().copied().reduce(f64::min)?;
        let max = self.x.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_rejects_mismatched_lengths() {
        let err = DataSet::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_dataset_rejects_nan() {
        let err = DataSet::new(vec![1.0, f64::NAN], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_dataset_range() {
        let data = DataSet::new(vec![3.0, -1.0, 2.0], vec![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(data.x_range(), Some((-1.0, 3.0)));
        assert_eq!(data.points()[1], (-1.0, 0.0));
    }

    #[test]
    fn test_step_row_matches_headers() {
        let step = IterationStep::Newton {
            iteration: 1,
            x_k: 1.0,
            f_x_k: -1.0,
            f_prime_x_k: 2.0,
            x_k_plus_one: 1.5,
            abs_diff: 0.5,
        };
        assert_eq!(step.row().len(), step.headers().len());
        let step = IterationStep::Quadrature {
            iteration: 0,
            subintervals: 4,
            value: 0.3,
            runge_error: 1e-3,
        };
        assert_eq!(step.row().len(), step.headers().len());
        let step = IterationStep::Jacobi {
            iteration: 2,
            x: vec![1.0, -0.5],
            max_error: 0.25,
        };
        assert_eq!(step.row().len(), step.headers().len());
        assert_eq!(step.row()[1], "[1.00000000, -0.50000000]");
    }

    #[test]
    fn test_converged_flag() {
        let mut result = SolveResult {
            method_id: 0,
            function_id: Some(0),
            value: 1.0,
            function_value: Some(0.0),
            iterations: 3,
            error_value: 1e-4,
            steps: vec![],
            message: None,
            warnings: vec![],
            exact_value: None,
        };
        assert!(result.converged());
        result
            .warnings
            .push(Warning::IterationLimitExceeded { cap: 3 });
        assert!(!result.converged());
        assert!(result.has_warning(ErrorKind::IterationLimitExceeded));
    }
}
