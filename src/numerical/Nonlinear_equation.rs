//! Root finding for a single nonlinear equation f(x) = 0: half-division, simple iteration,
//! Newton and secant. Every method returns the whole iteration trace.
//! ```
//! use RustedCompMath::numerical::Nonlinear_equation::{
//!     RootFindingConfig, RootMethod, RootStart, ScalarRootFinder,
//! };
//! use RustedCompMath::numerical::functions_registry::FunctionWithDerivative;
//! let f = FunctionWithDerivative::new(|x| x * x - 2.0, |x| 2.0 * x, "x^2 - 2");
//! let solver = ScalarRootFinder::with_config(RootFindingConfig::default());
//! let result = solver.solve(RootMethod::Newton, &f, RootStart::Estimate(1.0), 1e-6).unwrap();
//! assert!((result.value - 2f64.sqrt()).abs() < 1e-6);
//! ```
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::steps_table;
use crate::numerical::errors::{EngineError, ErrorKind, PartialTrace, Warning};
use crate::numerical::functions_registry::NonlinearFunction;
use crate::numerical::solve_result::{IterationStep, SolveResult};
use log::{debug, error, info, warn};
use serde::Serialize;
use strum_macros::{EnumIter, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, Serialize)]
#[repr(usize)]
pub enum RootMethod {
    HalfDivision = 0,
    SimpleIteration = 1,
    Newton = 2,
    Secant = 3,
}

impl RootMethod {
    pub fn from_id(id: usize) -> Result<Self, EngineError> {
        Self::from_repr(id).ok_or(EngineError::UnknownMethodId {
            component: "root finder",
            id,
        })
    }

    pub fn id(&self) -> usize {
        *self as usize
    }
}

/// where the search starts: an interval [a, b] or a single initial estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootStart {
    Bracket(f64, f64),
    Estimate(f64),
}

impl RootStart {
    fn is_finite(&self) -> bool {
        match *self {
            RootStart::Bracket(a, b) => a.is_finite() && b.is_finite(),
            RootStart::Estimate(x0) => x0.is_finite(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootFindingConfig {
    pub max_iterations: usize,
    pub derivative_floor: f64,
    pub divisor_floor: f64,
    pub divergence_bound: f64,
}

impl Default for RootFindingConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RootFindingConfig {
    fn from(config: &EngineConfig) -> Self {
        RootFindingConfig {
            max_iterations: config.max_iterations,
            derivative_floor: config.derivative_floor,
            divisor_floor: config.divisor_floor,
            divergence_bound: config.divergence_bound,
        }
    }
}

pub struct ScalarRootFinder {
    config: RootFindingConfig,
}

impl ScalarRootFinder {
    pub fn new() -> Self {
        Self {
            config: RootFindingConfig::default(),
        }
    }

    pub fn with_config(config: RootFindingConfig) -> Self {
        Self { config }
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.config.max_iterations = max_iterations;
    }

    /// dispatch to the chosen method after checking the common inputs
    pub fn solve<F>(
        &self,
        method: RootMethod,
        function: &F,
        start: RootStart,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: NonlinearFunction,
    {
        if !(tolerance > 0.0) || !tolerance.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                tolerance
            )));
        }
        if !start.is_finite() {
            return Err(EngineError::InvalidParameter(
                "starting values must be finite".to_string(),
            ));
        }
        info!("solving {} = 0 with {:?}, start {:?}", function.name(), method, start);
        let result = match method {
            RootMethod::HalfDivision => match start {
                RootStart::Bracket(a, b) => self.half_division(function, a, b, tolerance),
                RootStart::Estimate(_) => Err(EngineError::InvalidParameter(
                    "half-division needs an interval [a, b]".to_string(),
                )),
            },
            RootMethod::SimpleIteration => self.simple_iteration(function, start, tolerance),
            RootMethod::Newton => self.newton(function, start, tolerance),
            RootMethod::Secant => self.secant(function, start, tolerance),
        };
        match &result {
            Ok(res) => {
                info!(
                    "root = {}, f(root) = {:?}, iterations = {}",
                    res.value, res.function_value, res.iterations
                );
                debug!("\n{}", steps_table(&res.steps));
            }
            Err(e) => error!("{:?} failed: {}", method, e),
        }
        result
    }

    /// bisection; the bracket keeps opposite signs at its ends on every step
    pub fn half_division<F>(
        &self,
        function: &F,
        mut a: f64,
        mut b: f64,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: NonlinearFunction,
    {
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let mut fa = function.evaluate(a);
        let mut fb = function.evaluate(b);
        if !(fa * fb < 0.0) {
            return Err(EngineError::InvalidBracket { a, b, fa, fb });
        }

        let mut steps = Vec::new();
        let mut iteration = 0;
        while (b - a).abs() >= tolerance && iteration < self.config.max_iterations {
            iteration += 1;
            let x = (a + b) / 2.0;
            let fx = function.evaluate(x);
            steps.push(IterationStep::HalfDivision {
                iteration,
                a,
                b,
                x,
                fa,
                fb,
                fx,
                abs_diff: (a - b).abs(),
            });
            debug!("iteration {}: [{}, {}], x = {}, f(x) = {}", iteration, a, b, x, fx);
            if fx == 0.0 {
                a = x;
                b = x;
                break;
            }
            if fx.signum() == fa.signum() {
                a = x;
                fa = fx;
            } else {
                b = x;
                fb = fx;
            }
        }
        let root = (a + b) / 2.0;
        let error_value = (b - a).abs();
        let mut warnings = Vec::new();
        if error_value >= tolerance {
            warn!("half-division stopped after {} iterations", iteration);
            warnings.push(Warning::IterationLimitExceeded {
                cap: self.config.max_iterations,
            });
        }
        Ok(self.build_result(
            RootMethod::HalfDivision,
            function,
            root,
            error_value,
            steps,
            warnings,
        ))
    }

    /// fixed point iteration x = φ(x) with φ(x) = x + λ f(x), λ chosen from f' at the start
    pub fn simple_iteration<F>(
        &self,
        function: &F,
        start: RootStart,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: NonlinearFunction,
    {
        let slope = |x: f64| {
            function.derivative(x).ok_or_else(|| {
                EngineError::InvalidParameter(format!(
                    "simple iteration needs the derivative of {}",
                    function.name()
                ))
            })
        };
        let (mut x, d_start, ends) = match start {
            RootStart::Bracket(a, b) => {
                let (da, db) = (slope(a)?, slope(b)?);
                if da.abs() >= db.abs() {
                    (a, da, vec![a, b])
                } else {
                    (b, db, vec![a, b])
                }
            }
            RootStart::Estimate(x0) => (x0, slope(x0)?, vec![x0]),
        };
        if d_start.abs() < self.config.derivative_floor {
            return Err(EngineError::breakdown(
                ErrorKind::ZeroDerivative,
                format!("f'({}) = {} is too small to build φ", x, d_start),
                PartialTrace::Steps(Vec::new()),
            ));
        }
        let lambda = -1.0 / d_start;
        let phi = |x: f64| x + lambda * function.evaluate(x);

        let mut warnings = Vec::new();
        let mut q: f64 = 0.0;
        for &end in &ends {
            q = q.max((1.0 + lambda * slope(end)?).abs());
        }
        if q >= 1.0 {
            warn!("|φ'| reaches {} on the interval, convergence is not guaranteed", q);
            warnings.push(Warning::ContractionNotGuaranteed { q });
        }
        debug!("λ = {}, q = {}", lambda, q);

        let mut steps = Vec::new();
        let mut last_diff = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            let phi_x = phi(x);
            let x_next = phi_x;
            let abs_diff = (x_next - x).abs();
            if !x_next.is_finite() || x_next.abs() > self.config.divergence_bound {
                error!("simple iteration diverged at iteration {}", iteration);
                return Err(EngineError::breakdown(
                    ErrorKind::DivergenceDetected,
                    format!("iterates left the bound {}", self.config.divergence_bound),
                    PartialTrace::Steps(steps),
                ));
            }
            steps.push(IterationStep::SimpleIteration {
                iteration,
                x_k: x,
                x_k_plus_one: x_next,
                phi_x_k: phi_x,
                f_x_k_plus_one: function.evaluate(x_next),
                abs_diff,
            });
            if abs_diff > last_diff && iteration > 1 {
                warn!("Error is increasing");
            }
            last_diff = abs_diff;
            x = x_next;
            if abs_diff < tolerance {
                return Ok(self.build_result(
                    RootMethod::SimpleIteration,
                    function,
                    x,
                    abs_diff,
                    steps,
                    warnings,
                ));
            }
        }
        warn!("Maximum number of iterations reached. No solution found.");
        warnings.push(Warning::IterationLimitExceeded {
            cap: self.config.max_iterations,
        });
        Ok(self.build_result(
            RootMethod::SimpleIteration,
            function,
            x,
            last_diff,
            steps,
            warnings,
        ))
    }

    /// start point for Newton inside a bracket: the end where f(x)·f''(x) > 0
    fn fourier_start<F>(function: &F, a: f64, b: f64) -> f64
    where
        F: NonlinearFunction,
    {
        let fourier = |x: f64| {
            function
                .second_derivative(x)
                .map(|d2| function.evaluate(x) * d2 > 0.0)
                .unwrap_or(false)
        };
        if fourier(a) {
            a
        } else if fourier(b) {
            b
        } else {
            (a + b) / 2.0
        }
    }

    pub fn newton<F>(
        &self,
        function: &F,
        start: RootStart,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: NonlinearFunction,
    {
        let mut x = match start {
            RootStart::Bracket(a, b) => Self::fourier_start(function, a, b),
            RootStart::Estimate(x0) => x0,
        };
        if function.derivative(x).is_none() {
            return Err(EngineError::InvalidParameter(format!(
                "Newton's method needs the derivative of {} at x = {}",
                function.name(),
                x
            )));
        }
        let mut steps = Vec::new();
        let mut last_diff = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            let fx = function.evaluate(x);
            let Some(dfx) = function.derivative(x) else {
                error!("derivative is undefined at x = {}", x);
                return Err(EngineError::breakdown(
                    ErrorKind::ZeroDerivative,
                    format!("f'({}) is undefined", x),
                    PartialTrace::Steps(steps),
                ));
            };
            if !(dfx.abs() >= self.config.derivative_floor) {
                error!("derivative vanished at x = {}", x);
                return Err(EngineError::breakdown(
                    ErrorKind::ZeroDerivative,
                    format!("f'({}) = {}", x, dfx),
                    PartialTrace::Steps(steps),
                ));
            }
            let x_next = x - fx / dfx;
            if !x_next.is_finite() || x_next.abs() > self.config.divergence_bound {
                return Err(EngineError::breakdown(
                    ErrorKind::DivergenceDetected,
                    format!("iterates left the bound {}", self.config.divergence_bound),
                    PartialTrace::Steps(steps),
                ));
            }
            let abs_diff = (x_next - x).abs();
            steps.push(IterationStep::Newton {
                iteration,
                x_k: x,
                f_x_k: fx,
                f_prime_x_k: dfx,
                x_k_plus_one: x_next,
                abs_diff,
            });
            debug!("iteration = {}, x = {}, error = {}", iteration, x_next, abs_diff);
            if abs_diff > last_diff && iteration > 1 {
                warn!("Error is increasing");
            }
            last_diff = abs_diff;
            x = x_next;
            if abs_diff < tolerance {
                return Ok(self.build_result(
                    RootMethod::Newton,
                    function,
                    x,
                    abs_diff,
                    steps,
                    Vec::new(),
                ));
            }
        }
        warn!("Maximum number of iterations reached. No solution found.");
        Ok(self.build_result(
            RootMethod::Newton,
            function,
            x,
            last_diff,
            steps,
            vec![Warning::IterationLimitExceeded {
                cap: self.config.max_iterations,
            }],
        ))
    }

    pub fn secant<F>(
        &self,
        function: &F,
        start: RootStart,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: NonlinearFunction,
    {
        let (mut x_prev, mut x) = match start {
            RootStart::Bracket(a, b) => (a, b),
            RootStart::Estimate(x0) => (x0, x0 + 0.01 * x0.abs().max(1.0)),
        };
        let mut f_prev = function.evaluate(x_prev);
        let mut fx = function.evaluate(x);
        let mut steps = Vec::new();
        let mut last_diff = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            let denominator = fx - f_prev;
            if !(denominator.abs() >= self.config.divisor_floor) {
                error!("secant denominator vanished at iteration {}", iteration);
                return Err(EngineError::breakdown(
                    ErrorKind::ZeroDivisor,
                    format!("f({}) - f({}) = {}", x, x_prev, denominator),
                    PartialTrace::Steps(steps),
                ));
            }
            let x_next = x - fx * (x - x_prev) / denominator;
            if !x_next.is_finite() || x_next.abs() > self.config.divergence_bound {
                return Err(EngineError::breakdown(
                    ErrorKind::DivergenceDetected,
                    format!("iterates left the bound {}", self.config.divergence_bound),
                    PartialTrace::Steps(steps),
                ));
            }
            let f_next = function.evaluate(x_next);
            let abs_diff = (x_next - x).abs();
            steps.push(IterationStep::Secant {
                iteration,
                x_k_minus_one: x_prev,
                x_k: x,
                x_k_plus_one: x_next,
                f_x_k_plus_one: f_next,
                abs_diff,
            });
            debug!("iteration = {}, x = {}, error = {}", iteration, x_next, abs_diff);
            last_diff = abs_diff;
            x_prev = x;
            f_prev = fx;
            x = x_next;
            fx = f_next;
            if abs_diff < tolerance {
                return Ok(self.build_result(
                    RootMethod::Secant,
                    function,
                    x,
                    abs_diff,
                    steps,
                    Vec::new(),
                ));
            }
        }
        warn!("Maximum number of iterations reached. No solution found.");
        Ok(self.build_result(
            RootMethod::Secant,
            function,
            x,
            last_diff,
            steps,
            vec![Warning::IterationLimitExceeded {
                cap: self.config.max_iterations,
            }],
        ))
    }

    fn build_result<F>(
        &self,
        method: RootMethod,
        function: &F,
        root: f64,
        error_value: f64,
        steps: Vec<IterationStep>,
        warnings: Vec<Warning>,
    ) -> SolveResult
    where
        F: NonlinearFunction,
    {
        let message = if warnings.is_empty() {
            None
        } else {
            Some(
                warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };
        SolveResult {
            method_id: method.id(),
            function_id: None,
            value: root,
            function_value: Some(function.evaluate(root)),
            iterations: steps.len(),
            error_value,
            steps,
            message,
            warnings,
            exact_value: None,
        }
    }
}

impl Default for ScalarRootFinder {
    fn default() -> Self {
        Self::new()
    }
}
