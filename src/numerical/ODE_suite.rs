//! Initial value problem y' = f(x, y), y(x0) = y0 on [x0, xn], solved three ways on the
//! same grid x_i = x0 + i h: Euler, extended (midpoint) Euler and Milne's predictor-corrector
//! with Runge-Kutta 4 starting values. The three methods run in parallel.
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::series_table;
use crate::numerical::errors::{EngineError, ErrorKind, PartialTrace, Warning};
use crate::numerical::functions_registry::OdeFunction;
use log::{debug, error, info, warn};
use serde::Serialize;
use strum_macros::{EnumIter, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, Serialize)]
#[repr(usize)]
pub enum OdeMethod {
    Euler = 0,
    ExtendedEuler = 1,
    Milne = 2,
}

impl OdeMethod {
    pub fn from_id(id: usize) -> Result<Self, EngineError> {
        Self::from_repr(id).ok_or(EngineError::UnknownMethodId {
            component: "ode",
            id,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OdeMethod::Euler => "Euler",
            OdeMethod::ExtendedEuler => "ExtendedEuler",
            OdeMethod::Milne => "Milne",
        }
    }

    /// order of accuracy, used in the Runge estimate
    pub fn order(&self) -> i32 {
        match self {
            OdeMethod::Euler => 1,
            OdeMethod::ExtendedEuler => 2,
            OdeMethod::Milne => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdeTrace {
    pub method_name: String,
    /// step actually used (smaller than requested after refinement)
    pub step: f64,
    pub points: Vec<(f64, f64)>,
    pub display_equation: String,
    /// |y_h(xn) - y_{h/2}(xn)| / (2^p - 1)
    pub runge_error: f64,
    /// max |y_i - y(x_i)| when the exact solution is known
    pub max_abs_error: Option<f64>,
    pub warnings: Vec<Warning>,
}

impl OdeTrace {
    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }

    /// false when the Runge error is still above the tolerance
    pub fn converged(&self) -> bool {
        !self.warnings.iter().any(|w| {
            matches!(
                w.kind(),
                ErrorKind::StepToleranceNotMet | ErrorKind::StepRefinementExhausted
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdeSolution {
    #[serde(rename = "Euler")]
    pub euler: OdeTrace,
    #[serde(rename = "ExtendedEuler")]
    pub extended_euler: OdeTrace,
    #[serde(rename = "Milne")]
    pub milne: OdeTrace,
    pub integration_constant: Option<f64>,
    pub exact_display: Option<String>,
    pub exact_points: Option<Vec<(f64, f64)>>,
}

impl OdeSolution {
    pub fn trace(&self, method: OdeMethod) -> &OdeTrace {
        match method {
            OdeMethod::Euler => &self.euler,
            OdeMethod::ExtendedEuler => &self.extended_euler,
            OdeMethod::Milne => &self.milne,
        }
    }
}

/// the initial value problem itself
#[derive(Debug, Clone, Copy)]
pub struct IvpProblem {
    pub x0: f64,
    pub y0: f64,
    pub xn: f64,
    pub step: f64,
    pub tolerance: f64,
}

impl IvpProblem {
    fn validate(&self) -> Result<(), EngineError> {
        if [self.x0, self.y0, self.xn].iter().any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidParameter(
                "x0, y0 and xn must be finite".to_string(),
            ));
        }
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.x0 >= self.xn {
            return Err(EngineError::InvalidParameter(format!(
                "interval must satisfy x0 < xn, got [{}, {}]",
                self.x0, self.xn
            )));
        }
        if grid_size(self.x0, self.xn, self.step) == 0 {
            return Err(EngineError::InvalidParameter(format!(
                "step {} is larger than the interval [{}, {}]",
                self.step, self.x0, self.xn
            )));
        }
        Ok(())
    }
}

/// number of whole steps of size h that fit into [x0, xn]
fn grid_size(x0: f64, xn: f64, h: f64) -> usize {
    ((xn - x0) / h + 1e-9).floor() as usize
}

fn diverged(method: OdeMethod, points: Vec<(f64, f64)>) -> EngineError {
    EngineError::breakdown(
        ErrorKind::DivergenceDetected,
        format!("{} produced a non-finite value", method.name()),
        PartialTrace::Points(points),
    )
}

fn euler_points<F: OdeFunction>(
    f: &F,
    x0: f64,
    y0: f64,
    h: f64,
    n: usize,
) -> Result<Vec<(f64, f64)>, EngineError> {
    let mut points = Vec::with_capacity(n + 1);
    points.push((x0, y0));
    let mut y = y0;
    for i in 0..n {
        let x = x0 + i as f64 * h;
        y += h * f.rhs(x, y);
        if !y.is_finite() {
            return Err(diverged(OdeMethod::Euler, points));
        }
        points.push((x0 + (i + 1) as f64 * h, y));
    }
    Ok(points)
}

/// y_{i+1} = y_i + h f(x_i + h/2, y_i + h/2 f(x_i, y_i))
fn extended_euler_points<F: OdeFunction>(
    f: &F,
    x0: f64,
    y0: f64,
    h: f64,
    n: usize,
) -> Result<Vec<(f64, f64)>, EngineError> {
    let mut points = Vec::with_capacity(n + 1);
    points.push((x0, y0));
    let mut y = y0;
    for i in 0..n {
        let x = x0 + i as f64 * h;
        let half = y + h / 2.0 * f.rhs(x, y);
        y += h * f.rhs(x + h / 2.0, half);
        if !y.is_finite() {
            return Err(diverged(OdeMethod::ExtendedEuler, points));
        }
        points.push((x0 + (i + 1) as f64 * h, y));
    }
    Ok(points)
}

fn rk4_step<F: OdeFunction>(f: &F, x: f64, y: f64, h: f64) -> f64 {
    let k1 = h * f.rhs(x, y);
    let k2 = h * f.rhs(x + h / 2.0, y + k1 / 2.0);
    let k3 = h * f.rhs(x + h / 2.0, y + k2 / 2.0);
    let k4 = h * f.rhs(x + h, y + k3);
    y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0
}

#[derive(Debug, Clone)]
pub struct OdeSolver {
    pub max_corrector_iterations: usize,
    pub refine_step: bool,
    pub max_step_halvings: usize,
}

impl From<&EngineConfig> for OdeSolver {
    fn from(config: &EngineConfig) -> Self {
        OdeSolver {
            max_corrector_iterations: config.max_corrector_iterations,
            refine_step: config.refine_ode_step,
            max_step_halvings: config.max_step_halvings,
        }
    }
}

impl Default for OdeSolver {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl OdeSolver {
    /// Milne: RK4 for y1..y3, then predictor
    /// y_{i+1}^(0) = y_{i-3} + 4h/3 (2f_{i-2} - f_{i-1} + 2f_i)
    /// and corrector y_{i+1} = y_{i-1} + h/3 (f_{i-1} + 4f_i + f_{i+1}) iterated to the tolerance
    pub fn milne_points<F: OdeFunction>(
        &self,
        f: &F,
        x0: f64,
        y0: f64,
        h: f64,
        n: usize,
        tolerance: f64,
    ) -> Result<Vec<(f64, f64)>, EngineError> {
        let x_at = |i: usize| x0 + i as f64 * h;
        let mut points = Vec::with_capacity(n + 1);
        points.push((x0, y0));
        let mut slopes = vec![f.rhs(x0, y0)];
        for i in 0..n.min(3) {
            let y = rk4_step(f, x_at(i), points[i].1, h);
            if !y.is_finite() {
                return Err(diverged(OdeMethod::Milne, points));
            }
            points.push((x_at(i + 1), y));
            slopes.push(f.rhs(x_at(i + 1), y));
        }
        for i in 3..n {
            let x_next = x_at(i + 1);
            let predicted = points[i - 3].1
                + 4.0 * h / 3.0 * (2.0 * slopes[i - 2] - slopes[i - 1] + 2.0 * slopes[i]);
            let corrector = |y_next: f64| {
                points[i - 1].1
                    + h / 3.0 * (slopes[i - 1] + 4.0 * slopes[i] + f.rhs(x_next, y_next))
            };
            let mut previous = predicted;
            let mut corrected = corrector(previous);
            let mut iterations = 1;
            loop {
                if !previous.is_finite() || !corrected.is_finite() {
                    error!("Milne produced a non-finite value at x = {}", x_next);
                    return Err(diverged(OdeMethod::Milne, points));
                }
                if (corrected - previous).abs() <= tolerance {
                    break;
                }
                if iterations >= self.max_corrector_iterations {
                    return Err(EngineError::breakdown(
                        ErrorKind::CorrectorDivergence,
                        format!(
                            "corrector did not settle at x = {} after {} iterations",
                            x_next, iterations
                        ),
                        PartialTrace::Points(points),
                    ));
                }
                previous = corrected;
                corrected = corrector(previous);
                iterations += 1;
            }
            debug!("Milne x = {}, corrector iterations = {}", x_next, iterations);
            points.push((x_next, corrected));
            slopes.push(f.rhs(x_next, corrected));
        }
        Ok(points)
    }

    fn run<F: OdeFunction>(
        &self,
        method: OdeMethod,
        f: &F,
        problem: &IvpProblem,
        h: f64,
    ) -> Result<Vec<(f64, f64)>, EngineError> {
        let n = grid_size(problem.x0, problem.xn, h);
        match method {
            OdeMethod::Euler => euler_points(f, problem.x0, problem.y0, h, n),
            OdeMethod::ExtendedEuler => extended_euler_points(f, problem.x0, problem.y0, h, n),
            OdeMethod::Milne => {
                self.milne_points(f, problem.x0, problem.y0, h, n, problem.tolerance)
            }
        }
    }

    /// Runge estimate at the last common grid point of the runs with h and h/2
    fn runge_error(method: OdeMethod, coarse: &[(f64, f64)], fine: &[(f64, f64)]) -> f64 {
        let coarse_end = coarse.last().map(|p| p.1).unwrap_or(f64::NAN);
        let fine_end = fine
            .get(2 * (coarse.len() - 1))
            .map(|p| p.1)
            .unwrap_or(f64::NAN);
        (coarse_end - fine_end).abs() / (2f64.powi(method.order()) - 1.0)
    }

    /// one method over the whole interval, with optional step halving for the one-step methods
    pub fn trace<F: OdeFunction>(
        &self,
        method: OdeMethod,
        f: &F,
        problem: &IvpProblem,
    ) -> Result<OdeTrace, EngineError> {
        let mut h = problem.step;
        let mut points = self.run(method, f, problem, h)?;
        let mut fine = self.run(method, f, problem, h / 2.0)?;
        let mut runge_error = Self::runge_error(method, &points, &fine);
        let mut warnings = Vec::new();
        if self.refine_step && method != OdeMethod::Milne {
            let mut halvings = 0;
            while !(runge_error <= problem.tolerance) {
                if halvings >= self.max_step_halvings {
                    warn!(
                        "{}: tolerance not met after {} step halvings",
                        method.name(),
                        halvings
                    );
                    warnings.push(Warning::StepRefinementExhausted { halvings });
                    break;
                }
                h /= 2.0;
                halvings += 1;
                points = fine;
                fine = self.run(method, f, problem, h / 2.0)?;
                runge_error = Self::runge_error(method, &points, &fine);
            }
            debug!("{}: step refined to {}", method.name(), h);
        } else if !(runge_error <= problem.tolerance) {
            warn!(
                "{}: Runge error {} exceeds tolerance {}",
                method.name(),
                runge_error,
                problem.tolerance
            );
            warnings.push(Warning::StepToleranceNotMet {
                runge_error,
                tolerance: problem.tolerance,
            });
        }
        let max_abs_error = f
            .integration_constant(problem.x0, problem.y0)
            .and_then(|c| {
                points
                    .iter()
                    .map(|&(x, y)| f.exact_solution(x, c).map(|exact| (exact - y).abs()))
                    .try_fold(0.0_f64, |acc, e| e.map(|e| acc.max(e)))
            });
        Ok(OdeTrace {
            method_name: method.name().to_string(),
            step: h,
            points,
            display_equation: f.name().to_string(),
            runge_error,
            max_abs_error,
            warnings,
        })
    }

    /// all three methods on the same problem, run concurrently
    pub fn solve_ode<F>(&self, f: &F, problem: IvpProblem) -> Result<OdeSolution, EngineError>
    where
        F: OdeFunction + Sync,
    {
        problem.validate()?;
        info!(
            "solving {} on [{}, {}], y({}) = {}, h = {}",
            f.name(),
            problem.x0,
            problem.xn,
            problem.x0,
            problem.y0,
            problem.step
        );
        let (euler, (extended_euler, milne)) = rayon::join(
            || self.trace(OdeMethod::Euler, f, &problem),
            || {
                rayon::join(
                    || self.trace(OdeMethod::ExtendedEuler, f, &problem),
                    || self.trace(OdeMethod::Milne, f, &problem),
                )
            },
        );
        let (euler, extended_euler, milne) = (euler?, extended_euler?, milne?);

        let integration_constant = f.integration_constant(problem.x0, problem.y0);
        let exact_display = integration_constant.and_then(|c| f.exact_display(c));
        let exact_points = integration_constant.and_then(|c| {
            let n = grid_size(problem.x0, problem.xn, problem.step);
            (0..=n)
                .map(|i| {
                    let x = problem.x0 + i as f64 * problem.step;
                    f.exact_solution(x, c).map(|y| (x, y))
                })
                .collect::<Option<Vec<_>>>()
        });
        debug!(
            "\n{}",
            series_table(
                "x",
                &[
                    ("Euler", euler.points.as_slice()),
                    ("ExtendedEuler", extended_euler.points.as_slice()),
                    ("Milne", milne.points.as_slice()),
                ]
            )
        );
        info!(
            "y(xn): Euler {:?}, ExtendedEuler {:?}, Milne {:?}",
            euler.last(),
            extended_euler.last(),
            milne.last()
        );
        Ok(OdeSolution {
            euler,
            extended_euler,
            milne,
            integration_constant,
            exact_display,
            exact_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::functions_registry::{ClosureOde, FunctionSpec, OdeEquation};
    use approx::assert_relative_eq;

    /// y' = -2y, y = C e^{-2x}
    struct Decay;

    impl OdeFunction for Decay {
        fn rhs(&self, _x: f64, y: f64) -> f64 {
            -2.0 * y
        }

        fn name(&self) -> &str {
            "y' = -2y"
        }

        fn integration_constant(&self, x0: f64, y0: f64) -> Option<f64> {
            Some(y0 * (2.0 * x0).exp())
        }

        fn exact_solution(&self, x: f64, c: f64) -> Option<f64> {
            Some(c * (-2.0 * x).exp())
        }
    }

    fn unit_problem(step: f64) -> IvpProblem {
        IvpProblem {
            x0: 0.0,
            y0: 1.0,
            xn: 1.0,
            step,
            tolerance: 1e-6,
        }
    }

    #[test]
    fn test_milne_beats_euler_on_decay() {
        let solution = OdeSolver::default().solve_ode(&Decay, unit_problem(0.1)).unwrap();
        let exact = (-2.0f64).exp();
        let (x_euler, y_euler) = solution.euler.last().unwrap();
        let (x_milne, y_milne) = solution.milne.last().unwrap();
        assert_relative_eq!(x_euler, 1.0, epsilon = 1e-12);
        assert_relative_eq!(x_milne, 1.0, epsilon = 1e-12);
        assert!((y_milne - exact).abs() < (y_euler - exact).abs());
        assert!((y_milne - exact).abs() < 1e-4);
        let (_, y_ext) = solution.extended_euler.last().unwrap();
        assert!((y_ext - exact).abs() < (y_euler - exact).abs());
    }

    #[test]
    fn test_traces_share_the_grid() {
        let solution = OdeSolver::default().solve_ode(&Decay, unit_problem(0.1)).unwrap();
        for method in [OdeMethod::Euler, OdeMethod::ExtendedEuler, OdeMethod::Milne] {
            let trace = solution.trace(method);
            assert_eq!(trace.points.len(), 11);
            assert_eq!(trace.method_name, method.name());
            assert_eq!(trace.display_equation, "y' = -2y");
            for (i, (x, _)) in trace.points.iter().enumerate() {
                assert_relative_eq!(*x, i as f64 * 0.1, epsilon = 1e-12);
            }
        }
        assert!(solution.exact_display.is_none());
        assert_eq!(solution.exact_points.as_ref().map(|p| p.len()), Some(11));
    }

    #[test]
    fn test_registry_equation_exact_solution() {
        let ode = OdeEquation::lookup(0).unwrap();
        let solution = OdeSolver::default()
            .solve_ode(
                &ode,
                IvpProblem {
                    x0: 0.0,
                    y0: 1.0,
                    xn: 2.0,
                    step: 0.05,
                    tolerance: 1e-8,
                },
            )
            .unwrap();
        assert_relative_eq!(solution.integration_constant.unwrap(), 0.75, epsilon = 1e-12);
        assert!(solution.exact_display.unwrap().contains("+0.7500000000e^{-2x}"));
        let euler_err = solution.euler.max_abs_error.unwrap();
        let milne_err = solution.milne.max_abs_error.unwrap();
        assert!(milne_err < euler_err);
        assert!(solution.milne.runge_error < solution.euler.runge_error);
    }

    #[test]
    fn test_step_refinement() {
        let solver = OdeSolver {
            refine_step: true,
            ..OdeSolver::default()
        };
        let problem = IvpProblem {
            tolerance: 1e-3,
            ..unit_problem(0.1)
        };
        let trace = solver.trace(OdeMethod::Euler, &Decay, &problem).unwrap();
        assert!(trace.step < 0.1);
        assert!(trace.runge_error <= 1e-3);
        assert!(trace.warnings.is_empty());

        let stingy = OdeSolver {
            refine_step: true,
            max_step_halvings: 1,
            ..OdeSolver::default()
        };
        let problem = IvpProblem {
            tolerance: 1e-12,
            ..unit_problem(0.1)
        };
        let trace = stingy.trace(OdeMethod::Euler, &Decay, &problem).unwrap();
        assert_eq!(trace.warnings, vec![Warning::StepRefinementExhausted { halvings: 1 }]);
        assert_relative_eq!(trace.step, 0.05, epsilon = 1e-15);
    }

    #[test]
    fn test_stiff_problem_breaks_the_corrector() {
        let stiff = ClosureOde::new(|_x, y| -100.0 * y, "y' = -100y");
        let err = OdeSolver::default()
            .solve_ode(&stiff, unit_problem(0.1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorrectorDivergence);
        assert_eq!(err.partial_trace().unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_problems() {
        let solver = OdeSolver::default();
        for problem in [
            IvpProblem { step: 0.0, ..unit_problem(0.1) },
            IvpProblem { tolerance: -1.0, ..unit_problem(0.1) },
            IvpProblem { xn: -1.0, ..unit_problem(0.1) },
            unit_problem(2.0),
        ] {
            let err = solver.solve_ode(&Decay, problem).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
        assert_eq!(OdeMethod::from_id(3).unwrap_err().kind(), ErrorKind::UnknownMethodId);
    }

    #[test]
    fn test_serialized_keys() {
        let solution = OdeSolver::default().solve_ode(&Decay, unit_problem(0.25)).unwrap();
        let json = serde_json::to_value(&solution).unwrap();
        assert!(json.get("Euler").is_some());
        assert!(json.get("ExtendedEuler").is_some());
        assert!(json["Milne"]["points"].is_array());
    }

    #[test]
    fn test_milne_stops_on_non_finite_rhs() {
        let broken = ClosureOde::new(
            |x, y| if x > 0.55 { f64::NAN } else { -2.0 * y },
            "y' = -2y, undefined past 0.55",
        );
        let solver = OdeSolver::default();
        let err = solver
            .milne_points(&broken, 0.0, 1.0, 0.1, 10, 1e-6)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivergenceDetected);
        let Some(PartialTrace::Points(points)) = err.partial_trace() else {
            panic!("expected the points computed before the breakdown");
        };
        assert_eq!(points.len(), 6);
        assert!(points.iter().all(|(_, y)| y.is_finite()));
        let euler = euler_points(&broken, 0.0, 1.0, 0.1, 10).unwrap_err();
        assert_eq!(euler.kind(), ErrorKind::DivergenceDetected);
    }

    #[test]
    fn test_coarse_step_is_flagged_without_refinement() {
        let ode = OdeEquation::lookup(0).unwrap();
        let problem = IvpProblem {
            tolerance: 1e-6,
            ..unit_problem(0.1)
        };
        let solution = OdeSolver::default().solve_ode(&ode, problem).unwrap();
        for trace in [&solution.euler, &solution.extended_euler] {
            assert!(trace.runge_error > 1e-6);
            assert!(!trace.converged());
            assert!(
                trace
                    .warnings
                    .iter()
                    .any(|w| w.kind() == ErrorKind::StepToleranceNotMet)
            );
        }

        let refining = OdeSolver {
            refine_step: true,
            ..OdeSolver::default()
        };
        let loose = IvpProblem {
            tolerance: 1e-2,
            ..unit_problem(0.1)
        };
        let trace = refining.trace(OdeMethod::Euler, &ode, &loose).unwrap();
        assert!(trace.converged());
        assert!(trace.runge_error <= 1e-2);
    }
}
