//! Newton's method for a system of two nonlinear equations in two unknowns.
//! ```
//! use RustedCompMath::numerical::Nonlinear_systems::SystemNewtonSolver;
//! use RustedCompMath::numerical::functions_registry::EquationSystem;
//! let solver = SystemNewtonSolver::new();
//! let res = solver.solve(&EquationSystem::CircleParabola, (1.0, 1.0), 1e-8).unwrap();
//! assert!(res.residual_norm < 1e-8);
//! ```
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::steps_table;
use crate::numerical::errors::{EngineError, ErrorKind, PartialTrace, Warning};
use crate::numerical::functions_registry::NonlinearSystem2;
use crate::numerical::solve_result::{IterationStep, SystemSolveResult};
use log::{debug, error, info, warn};
use nalgebra::{Matrix2, Vector2};

pub struct SystemNewtonSolver {
    pub max_iterations: usize,
    pub determinant_floor: f64,
    pub divergence_bound: f64,
}

impl SystemNewtonSolver {
    pub fn new() -> Self {
        Self::from(&EngineConfig::default())
    }

    fn residual<S: NonlinearSystem2>(system: &S, x: f64, y: f64) -> Vector2<f64> {
        let [f1, f2] = system.values(x, y);
        Vector2::new(f1, f2)
    }

    fn jacobian<S: NonlinearSystem2>(system: &S, x: f64, y: f64) -> Matrix2<f64> {
        let [[a, b], [c, d]] = system.jacobian(x, y);
        Matrix2::new(a, b, c, d)
    }

    /// (x, y)_{k+1} = (x, y)_k - J^{-1} F, stops when |Δ| < tolerance
    pub fn solve<S>(
        &self,
        system: &S,
        initial_guess: (f64, f64),
        tolerance: f64,
    ) -> Result<SystemSolveResult, EngineError>
    where
        S: NonlinearSystem2,
    {
        if !(tolerance > 0.0) || !tolerance.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                tolerance
            )));
        }
        if !initial_guess.0.is_finite() || !initial_guess.1.is_finite() {
            return Err(EngineError::InvalidParameter(
                "initial guess must be finite".to_string(),
            ));
        }
        info!("solving system {} from {:?}", system.name(), initial_guess);

        let mut point = Vector2::new(initial_guess.0, initial_guess.1);
        let mut steps = Vec::new();
        let mut last_norm = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            let f = Self::residual(system, point[0], point[1]);
            let j = Self::jacobian(system, point[0], point[1]);
            let det = j.determinant();
            if !(det.abs() >= self.determinant_floor) {
                error!("Jacobian is singular at ({}, {}), det = {}", point[0], point[1], det);
                return Err(EngineError::breakdown(
                    ErrorKind::SingularJacobian,
                    format!("det(J) = {} at ({}, {})", det, point[0], point[1]),
                    PartialTrace::Steps(steps),
                ));
            }
            let Some(j_inv) = j.try_inverse() else {
                return Err(EngineError::breakdown(
                    ErrorKind::SingularJacobian,
                    format!("Jacobian cannot be inverted at ({}, {})", point[0], point[1]),
                    PartialTrace::Steps(steps),
                ));
            };
            let delta = j_inv * f;
            point -= delta;
            if point.iter().any(|v| !v.is_finite() || v.abs() > self.divergence_bound) {
                return Err(EngineError::breakdown(
                    ErrorKind::DivergenceDetected,
                    format!("iterates left the bound {}", self.divergence_bound),
                    PartialTrace::Steps(steps),
                ));
            }
            let update_norm = delta.norm();
            let residual_norm = Self::residual(system, point[0], point[1]).norm();
            steps.push(IterationStep::System {
                iteration,
                x_k: point[0],
                y_k: point[1],
                dx: -delta[0],
                dy: -delta[1],
                update_norm,
                residual_norm,
            });
            debug!("iteration = {}, error = {}", iteration, update_norm);
            if update_norm > last_norm && iteration > 1 {
                warn!("Error is increasing");
            }
            last_norm = update_norm;
            if update_norm < tolerance {
                return Ok(self.finish(point, update_norm, residual_norm, steps, Vec::new()));
            }
        }
        warn!("Maximum number of iterations reached. No solution found.");
        let residual_norm = Self::residual(system, point[0], point[1]).norm();
        Ok(self.finish(
            point,
            last_norm,
            residual_norm,
            steps,
            vec![Warning::IterationLimitExceeded {
                cap: self.max_iterations,
            }],
        ))
    }

    fn finish(
        &self,
        point: Vector2<f64>,
        error_value: f64,
        residual_norm: f64,
        steps: Vec<IterationStep>,
        warnings: Vec<Warning>,
    ) -> SystemSolveResult {
        info!(
            "solution ({}, {}), |F| = {}, iterations = {}",
            point[0],
            point[1],
            residual_norm,
            steps.len()
        );
        debug!("\n{}", steps_table(&steps));
        SystemSolveResult {
            function_id: None,
            x: point[0],
            y: point[1],
            iterations: steps.len(),
            error_value,
            residual_norm,
            steps,
            warnings,
        }
    }
}

impl Default for SystemNewtonSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&EngineConfig> for SystemNewtonSolver {
    fn from(config: &EngineConfig) -> Self {
        SystemNewtonSolver {
            max_iterations: config.max_iterations,
            determinant_floor: config.determinant_floor,
            divergence_bound: config.divergence_bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::functions_registry::{EquationSystem, FunctionSpec};
    use approx::assert_relative_eq;

    /// the same equation written twice, so J has two equal rows
    struct Duplicated;

    impl NonlinearSystem2 for Duplicated {
        fn values(&self, x: f64, y: f64) -> [f64; 2] {
            let f = x * x + y * y - 4.0;
            [f, f]
        }

        fn jacobian(&self, x: f64, y: f64) -> [[f64; 2]; 2] {
            [[2.0 * x, 2.0 * y], [2.0 * x, 2.0 * y]]
        }
    }

    #[test]
    fn test_circle_parabola() {
        let solver = SystemNewtonSolver::new();
        let res = solver
            .solve(&EquationSystem::CircleParabola, (1.0, 1.0), 1e-10)
            .unwrap();
        // x^2 = y/3 turns the circle into 3y^2 + y - 12 = 0
        let y = (-1.0 + 145f64.sqrt()) / 6.0;
        assert_relative_eq!(res.y, y, epsilon = 1e-9);
        assert_relative_eq!(res.x, (y / 3.0).sqrt(), epsilon = 1e-9);
        assert!(res.converged());
        assert!(res.residual_norm < 1e-9);
        assert_eq!(res.steps.len(), res.iterations);
    }

    #[test]
    fn test_trigonometric_system() {
        let solver = SystemNewtonSolver::new();
        let system = EquationSystem::lookup(2).unwrap();
        let res = solver.solve(&system, (0.0, 0.0), 1e-9).unwrap();
        let [f1, f2] = system.values(res.x, res.y);
        assert!(f1.abs() < 1e-8 && f2.abs() < 1e-8);
    }

    #[test]
    fn test_duplicated_equations_are_singular() {
        let solver = SystemNewtonSolver::new();
        let err = solver.solve(&Duplicated, (1.0, 1.0), 1e-6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SingularJacobian);
        assert!(err.partial_trace().unwrap().is_empty());
    }

    #[test]
    fn test_iteration_cap() {
        let solver = SystemNewtonSolver {
            max_iterations: 2,
            ..SystemNewtonSolver::new()
        };
        let res = solver
            .solve(&EquationSystem::CircleParabola, (3.0, 3.0), 1e-15)
            .unwrap();
        assert_eq!(res.iterations, 2);
        assert!(!res.converged());
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let solver = SystemNewtonSolver::new();
        let err = solver
            .solve(&EquationSystem::Hyperbolic, (1.0, 1.0), -1.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
