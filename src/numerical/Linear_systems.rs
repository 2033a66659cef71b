//! Simple (Jacobi) iteration for a square linear system A x = b. The rows are first
//! permuted towards diagonal dominance; the iteration matrix C and the per-component
//! errors of the last sweep are returned with the solution.
//! ```
//! use RustedCompMath::numerical::Linear_systems::{JacobiSolver, LinearSystem};
//! let system = LinearSystem::from_rows(
//!     vec![vec![2.0, 2.0, 10.0], vec![10.0, 1.0, 1.0], vec![2.0, 10.0, 1.0]],
//!     vec![14.0, 12.0, 13.0],
//! )
//! .unwrap();
//! let res = JacobiSolver::new().solve(&system, 1e-8).unwrap();
//! assert!(res.solution.iter().all(|x| (x - 1.0).abs() < 1e-7));
//! assert_eq!(res.permutation, vec![2, 0, 1]);
//! ```
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::{matrix_table, steps_table};
use crate::numerical::errors::{EngineError, ErrorKind, PartialTrace, Warning};
use crate::numerical::solve_result::IterationStep;
use itertools::Itertools;
use log::{debug, error, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// coefficient matrix and right-hand side of A x = b
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

fn parse_number(token: &str, what: &str) -> Result<f64, EngineError> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::InvalidParameter(format!("invalid {}: '{}'", what, token)))
}

impl LinearSystem {
    pub fn new(matrix: DMatrix<f64>, rhs: DVector<f64>) -> Result<LinearSystem, EngineError> {
        let n = matrix.nrows();
        if n == 0 {
            return Err(EngineError::InsufficientData(
                "linear system needs at least one equation".to_string(),
            ));
        }
        if matrix.ncols() != n {
            return Err(EngineError::InvalidParameter(format!(
                "coefficient matrix must be square, got {}x{}",
                n,
                matrix.ncols()
            )));
        }
        if rhs.len() != n {
            return Err(EngineError::InvalidParameter(format!(
                "right-hand side has {} entries for {} equations",
                rhs.len(),
                n
            )));
        }
        if matrix.iter().chain(rhs.iter()).any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidParameter(
                "coefficients must be finite numbers".to_string(),
            ));
        }
        Ok(LinearSystem { matrix, rhs })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, rhs: Vec<f64>) -> Result<LinearSystem, EngineError> {
        let n = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != n) {
            return Err(EngineError::InvalidParameter(format!(
                "every row must have {} coefficients, got {}",
                n,
                row.len()
            )));
        }
        let matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(matrix, DVector::from_vec(rhs))
    }

    /// Text form: the order n, then n lines `a_i1 ... a_in b_i`, then the tolerance.
    /// Decimal commas are accepted.
    pub fn parse(document: &str) -> Result<(LinearSystem, f64), EngineError> {
        let document = document.replace(',', ".");
        let mut lines = document.lines().map(str::trim).filter(|l| !l.is_empty());
        let missing = |what: &str| EngineError::InsufficientData(format!("missing {}", what));

        let n_line = lines.next().ok_or_else(|| missing("system order"))?;
        let n: usize = n_line.parse().map_err(|_| {
            EngineError::InvalidParameter(format!("invalid system order: '{}'", n_line))
        })?;
        let mut rows = Vec::with_capacity(n);
        let mut rhs = Vec::with_capacity(n);
        for i in 0..n {
            let line = lines
                .next()
                .ok_or_else(|| missing(&format!("row {} of {}", i + 1, n)))?;
            let mut values = line
                .split_whitespace()
                .map(|token| parse_number(token, "coefficient"))
                .collect::<Result<Vec<f64>, _>>()?;
            if values.len() != n + 1 {
                return Err(EngineError::InvalidParameter(format!(
                    "row {} must hold {} coefficients and b, got {} numbers",
                    i + 1,
                    n,
                    values.len()
                )));
            }
            rhs.extend(values.pop());
            rows.push(values);
        }
        let tolerance_line = lines.next().ok_or_else(|| missing("tolerance"))?;
        let tolerance = parse_number(tolerance_line, "tolerance")?;
        Ok((Self::from_rows(rows, rhs)?, tolerance))
    }

    pub fn size(&self) -> usize {
        self.matrix.nrows()
    }

    /// |a_ii| >= Σ_{j≠i} |a_ij| for every row, strictly for at least one
    pub fn is_diagonally_dominant(&self) -> bool {
        let mut strict = false;
        for i in 0..self.size() {
            let off: f64 = (0..self.size())
                .filter(|&j| j != i)
                .map(|j| self.matrix[(i, j)].abs())
                .sum();
            let diagonal = self.matrix[(i, i)].abs();
            if diagonal < off {
                return false;
            }
            strict |= diagonal > off;
        }
        strict
    }

    /// Target position of every row in a diagonally dominant reordering. Row i goes to the
    /// first column j whose entry outweighs the rest of the row; None if two rows claim the
    /// same column, a row has no such entry, or no row is strictly dominant.
    pub fn dominant_permutation(&self) -> Option<Vec<usize>> {
        let n = self.size();
        let mut target = Vec::with_capacity(n);
        let mut strict = false;
        for i in 0..n {
            let sum: f64 = self.matrix.row(i).iter().map(|v| v.abs()).sum();
            let j = (0..n).find(|&j| 2.0 * self.matrix[(i, j)].abs() >= sum)?;
            strict |= 2.0 * self.matrix[(i, j)].abs() > sum;
            target.push(j);
        }
        let distinct = target.iter().unique().count() == n;
        (strict && distinct).then_some(target)
    }

    /// rows moved so that row i of `self` becomes row `target[i]`
    pub fn permuted(&self, target: &[usize]) -> LinearSystem {
        let n = self.size();
        let mut matrix: DMatrix<f64> = DMatrix::zeros(n, n);
        let mut rhs: DVector<f64> = DVector::zeros(n);
        for (i, &j) in target.iter().enumerate() {
            matrix.set_row(j, &self.matrix.row(i));
            rhs[j] = self.rhs[i];
        }
        LinearSystem { matrix, rhs }
    }

    /// c_ij = -a_ij / a_ii off the diagonal, zero on it
    pub fn iteration_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.size(), self.size(), |i, j| {
            if i == j {
                0.0
            } else {
                -self.matrix[(i, j)] / self.matrix[(i, i)]
            }
        })
    }
}

fn to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearSolveResult {
    pub solution: Vec<f64>,
    /// |x_i^(k) - x_i^(k-1)| of the last sweep, per component
    pub errors: Vec<f64>,
    pub iterations: usize,
    pub determinant: f64,
    /// target row of every input row; the identity when no reordering was done
    pub permutation: Vec<usize>,
    /// coefficient rows and b in the order the iteration used
    pub matrix: Vec<Vec<f64>>,
    pub rhs: Vec<f64>,
    pub c_matrix: Vec<Vec<f64>>,
    pub steps: Vec<IterationStep>,
    pub warnings: Vec<Warning>,
}

impl LinearSolveResult {
    pub fn converged(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| w.kind() == ErrorKind::IterationLimitExceeded)
    }

    pub fn has_warning(&self, kind: ErrorKind) -> bool {
        self.warnings.iter().any(|w| w.kind() == kind)
    }

    pub fn table(&self) -> String {
        steps_table(&self.steps)
    }

    /// the reordered system as `A | b`
    pub fn matrix_table(&self) -> String {
        matrix_table(&self.matrix, Some(self.rhs.as_slice()))
    }
}

pub struct JacobiSolver {
    pub max_iterations: usize,
    /// lower bound of |det A| relative to the product of the row norms
    pub determinant_floor: f64,
    pub divisor_floor: f64,
    pub divergence_bound: f64,
}

impl JacobiSolver {
    pub fn new() -> Self {
        Self::from(&EngineConfig::default())
    }

    /// x^(k+1) = C x^(k) + d, d_i = b_i / a_ii, starting from x^(0) = 0;
    /// stops when every component moved by at most `tolerance`
    pub fn solve(
        &self,
        system: &LinearSystem,
        tolerance: f64,
    ) -> Result<LinearSolveResult, EngineError> {
        if !(tolerance > 0.0) || !tolerance.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                tolerance
            )));
        }
        let n = system.size();
        info!("solving linear system of order {}", n);

        // Hadamard: |det A| <= Π ||a_i||, so the ratio does not depend on scaling
        let determinant = system.matrix.determinant();
        let hadamard: f64 = system.matrix.row_iter().map(|row| row.norm()).product();
        if !(determinant.abs() > self.determinant_floor * hadamard) {
            error!("matrix is singular, det = {}", determinant);
            return Err(EngineError::SingularMatrix { determinant });
        }

        let mut warnings = Vec::new();
        let (permutation, working) = if system.is_diagonally_dominant() {
            ((0..n).collect::<Vec<usize>>(), system.clone())
        } else if let Some(target) = system.dominant_permutation() {
            info!("rows reordered to {:?}", target);
            let working = system.permuted(&target);
            (target, working)
        } else {
            warn!("cannot reach diagonal dominance, iterating on the rows as given");
            warnings.push(Warning::DiagonalDominanceNotReached);
            ((0..n).collect::<Vec<usize>>(), system.clone())
        };

        let small_pivot = |i: &usize| !(working.matrix[(*i, *i)].abs() >= self.divisor_floor);
        if let Some(i) = (0..n).find(small_pivot) {
            error!("zero on the diagonal in row {}", i + 1);
            return Err(EngineError::breakdown(
                ErrorKind::ZeroDivisor,
                format!("a_{0}{0} = {1}", i + 1, working.matrix[(i, i)]),
                PartialTrace::Steps(Vec::new()),
            ));
        }

        let c = working.iteration_matrix();
        let d = DVector::from_fn(n, |i, _| working.rhs[i] / working.matrix[(i, i)]);
        debug!("C = {}", c);

        let mut x: DVector<f64> = DVector::zeros(n);
        let mut errors = DVector::from_element(n, f64::INFINITY);
        let mut steps = Vec::new();
        for iteration in 1..=self.max_iterations {
            let next = &c * &x + &d;
            errors = (&next - &x).abs();
            x = next;
            if x.iter().any(|v| !v.is_finite() || v.abs() > self.divergence_bound) {
                error!("iterates left the bound {} at sweep {}", self.divergence_bound, iteration);
                return Err(EngineError::breakdown(
                    ErrorKind::DivergenceDetected,
                    format!("iterates left the bound {}", self.divergence_bound),
                    PartialTrace::Steps(steps),
                ));
            }
            let max_error = errors.max();
            steps.push(IterationStep::Jacobi {
                iteration,
                x: x.iter().copied().collect(),
                max_error,
            });
            debug!("iteration = {}, error = {}", iteration, max_error);
            if max_error <= tolerance {
                break;
            }
        }
        if !(errors.max() <= tolerance) {
            warn!("Maximum number of iterations reached. No solution found.");
            warnings.push(Warning::IterationLimitExceeded {
                cap: self.max_iterations,
            });
        }
        info!("solution {:?} after {} iterations", x.as_slice(), steps.len());
        debug!("\n{}", steps_table(&steps));
        Ok(LinearSolveResult {
            solution: x.iter().copied().collect(),
            errors: errors.iter().copied().collect(),
            iterations: steps.len(),
            determinant,
            permutation,
            matrix: to_rows(&working.matrix),
            rhs: working.rhs.iter().copied().collect(),
            c_matrix: to_rows(&c),
            steps,
            warnings,
        })
    }
}

impl Default for JacobiSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&EngineConfig> for JacobiSolver {
    fn from(config: &EngineConfig) -> Self {
        JacobiSolver {
            max_iterations: config.max_iterations,
            determinant_floor: config.determinant_floor,
            divisor_floor: config.divisor_floor,
            divergence_bound: config.divergence_bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dominant() -> LinearSystem {
        LinearSystem::from_rows(
            vec![
                vec![10.0, 1.0, 1.0],
                vec![2.0, 10.0, 1.0],
                vec![2.0, 2.0, 10.0],
            ],
            vec![12.0, 13.0, 14.0],
        )
        .unwrap()
    }

    #[test]
    fn test_dominant_system_matches_lu() {
        let system = dominant();
        let res = JacobiSolver::new().solve(&system, 1e-10).unwrap();
        let lu = system.matrix.clone().lu().solve(&system.rhs).unwrap();
        for (x, expected) in res.solution.iter().zip(lu.iter()) {
            assert_relative_eq!(*x, *expected, epsilon = 1e-9);
        }
        assert!(res.converged());
        assert!(res.warnings.is_empty());
        assert_eq!(res.permutation, vec![0, 1, 2]);
        assert!(res.errors.iter().all(|e| *e <= 1e-10));
        assert_eq!(res.iterations, res.steps.len());
        assert_relative_eq!(res.determinant, lu_det(&system), epsilon = 1e-9);
    }

    fn lu_det(system: &LinearSystem) -> f64 {
        system.matrix.clone().lu().determinant()
    }

    #[test]
    fn test_iteration_matrix() {
        let res = JacobiSolver::new().solve(&dominant(), 1e-6).unwrap();
        assert_eq!(res.c_matrix[0], vec![0.0, -0.1, -0.1]);
        assert_eq!(res.c_matrix[1], vec![-0.2, 0.0, -0.1]);
        assert_eq!(res.c_matrix[2], vec![-0.2, -0.2, 0.0]);
    }

    #[test]
    fn test_rows_are_reordered_to_dominance() {
        // [[1, 3], [2, 1]] x = [4, 3] has x = (1, 1); swapping rows makes it dominant
        let system =
            LinearSystem::from_rows(vec![vec![1.0, 3.0], vec![2.0, 1.0]], vec![4.0, 3.0]).unwrap();
        assert!(!system.is_diagonally_dominant());
        let res = JacobiSolver::new().solve(&system, 1e-9).unwrap();
        assert_eq!(res.permutation, vec![1, 0]);
        assert_eq!(res.matrix, vec![vec![2.0, 1.0], vec![1.0, 3.0]]);
        assert_eq!(res.rhs, vec![3.0, 4.0]);
        assert!(res.warnings.is_empty());
        assert_relative_eq!(res.solution[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(res.solution[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_singular_matrix() {
        let system =
            LinearSystem::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).unwrap();
        let err = JacobiSolver::new().solve(&system, 1e-6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SingularMatrix);
        assert!(err.partial_trace().is_none());
        // scaling does not hide a nonsingular matrix
        let tiny = LinearSystem::new(dominant().matrix * 1e-6, dominant().rhs * 1e-6).unwrap();
        assert!(JacobiSolver::new().solve(&tiny, 1e-8).is_ok());
    }

    #[test]
    fn test_non_dominant_system_still_iterates() {
        // both rows pick column 1, yet the spectral radius of C is sqrt(0.2)
        let system =
            LinearSystem::from_rows(vec![vec![1.0, 2.0], vec![0.1, 1.0]], vec![3.0, 1.1]).unwrap();
        assert!(system.dominant_permutation().is_none());
        let res = JacobiSolver::new().solve(&system, 1e-9).unwrap();
        assert!(res.has_warning(ErrorKind::DiagonalDominanceNotReached));
        assert!(res.converged());
        assert_relative_eq!(res.solution[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(res.solution[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_growing_iterates_hit_the_cap() {
        // spectral radius sqrt(1.5): the sweeps grow but stay below the divergence bound
        let system =
            LinearSystem::from_rows(vec![vec![1.0, 3.0], vec![1.0, 2.0]], vec![4.0, 3.0]).unwrap();
        let res = JacobiSolver::new().solve(&system, 1e-6).unwrap();
        assert_eq!(res.iterations, 100);
        assert!(!res.converged());
        assert!(res.has_warning(ErrorKind::DiagonalDominanceNotReached));
        assert!(res.has_warning(ErrorKind::IterationLimitExceeded));
    }

    #[test]
    fn test_zero_diagonal_without_dominance() {
        let system = LinearSystem::from_rows(
            vec![
                vec![0.0, 1.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 1.0, 0.0],
            ],
            vec![2.0, 2.0, 2.0],
        )
        .unwrap();
        // rows 1 and 2 both claim column 0, and no row is strictly dominant
        assert!(system.dominant_permutation().is_none());
        let err = JacobiSolver::new().solve(&system, 1e-6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroDivisor);
    }

    #[test]
    fn test_parse_text_form() {
        let document = "3\n2 2 10 14\n10 1 1 12\n2 10 1 13\n0,001\n";
        let (system, tolerance) = LinearSystem::parse(document).unwrap();
        assert_eq!(system.size(), 3);
        assert_eq!(tolerance, 0.001);
        assert_eq!(system.rhs[1], 12.0);
        assert_eq!(system.dominant_permutation(), Some(vec![2, 0, 1]));
        let res = JacobiSolver::new().solve(&system, tolerance).unwrap();
        assert!(res.matrix_table().contains("10"));
        assert!(res.table().contains("max |x_k - x_k-1|"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        let err = LinearSystem::parse("2\n1 2 3\n4 5\n0.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = LinearSystem::parse("2\n1 2 3\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        let err = LinearSystem::parse("2\n1 x 3\n4 5 6\n0.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = LinearSystem::parse("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_shape_validation() {
        let err = LinearSystem::from_rows(vec![vec![1.0, 2.0], vec![3.0]], vec![1.0, 2.0])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = LinearSystem::from_rows(vec![], vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        let err = LinearSystem::from_rows(vec![vec![1.0]], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = JacobiSolver::new().solve(&dominant(), 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
