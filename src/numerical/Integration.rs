//! Composite quadrature with step halving: the number of subintervals is doubled until the
//! Runge estimate |I_2n - I_n| / (2^p - 1) drops below the tolerance.
//!
//! Improper integrals are handled through the integrand's singular points: if the
//! antiderivative is finite at such a point the interval is split around it (shifted by
//! `singularity_offset`) and the pieces are summed, otherwise the integral diverges.
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::steps_table;
use crate::numerical::errors::{EngineError, ErrorKind, PartialTrace, Warning};
use crate::numerical::functions_registry::Integrable;
use crate::numerical::solve_result::{IterationStep, SolveResult};
use log::{debug, info, warn};
use serde::Serialize;
use strum_macros::{EnumIter, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, Serialize)]
#[repr(usize)]
pub enum IntegrationMethod {
    LeftRectangles = 0,
    RightRectangles = 1,
    MiddleRectangles = 2,
    Trapezoid = 3,
    Simpson = 4,
}

impl IntegrationMethod {
    pub fn from_id(id: usize) -> Result<Self, EngineError> {
        Self::from_repr(id).ok_or(EngineError::UnknownMethodId {
            component: "integration",
            id,
        })
    }

    pub fn id(&self) -> usize {
        *self as usize
    }

    /// order p of the rule, used in the Runge estimate
    pub fn order(&self) -> i32 {
        match self {
            IntegrationMethod::LeftRectangles | IntegrationMethod::RightRectangles => 1,
            IntegrationMethod::MiddleRectangles | IntegrationMethod::Trapezoid => 2,
            IntegrationMethod::Simpson => 4,
        }
    }

    /// composite rule with n subintervals of [a, b]
    pub fn composite<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64, n: usize) -> f64 {
        let h = (b - a) / n as f64;
        let node = |i: usize| a + i as f64 * h;
        match self {
            IntegrationMethod::LeftRectangles => h * (0..n).map(|i| f(node(i))).sum::<f64>(),
            IntegrationMethod::RightRectangles => {
                h * (1..=n).map(|i| f(node(i))).sum::<f64>()
            }
            IntegrationMethod::MiddleRectangles => {
                h * (0..n).map(|i| f(a + (i as f64 + 0.5) * h)).sum::<f64>()
            }
            IntegrationMethod::Trapezoid => {
                let inner: f64 = (1..n).map(|i| f(node(i))).sum();
                h * ((f(a) + f(b)) / 2.0 + inner)
            }
            IntegrationMethod::Simpson => {
                let odd: f64 = (1..n).step_by(2).map(|i| f(node(i))).sum();
                let even: f64 = (2..n).step_by(2).map(|i| f(node(i))).sum();
                h / 3.0 * (f(a) + f(b) + 4.0 * odd + 2.0 * even)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Integrator {
    pub initial_subintervals: usize,
    pub max_subintervals: usize,
    pub singularity_offset: f64,
}

impl From<&EngineConfig> for Integrator {
    fn from(config: &EngineConfig) -> Self {
        Integrator {
            initial_subintervals: config.initial_subintervals,
            max_subintervals: config.max_subintervals,
            singularity_offset: config.singularity_offset,
        }
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// outcome of the halving loop on one piece of the interval
struct PieceResult {
    value: f64,
    runge_error: f64,
    subintervals: usize,
    converged: bool,
}

impl Integrator {
    pub fn integrate<F>(
        &self,
        method: IntegrationMethod,
        function: &F,
        lower: f64,
        upper: f64,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError>
    where
        F: Integrable,
    {
        if !(tolerance > 0.0) || !tolerance.is_finite() {
            return Err(EngineError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                tolerance
            )));
        }
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(EngineError::InvalidParameter(format!(
                "integration bounds must satisfy lower < upper, got [{}, {}]",
                lower, upper
            )));
        }
        let (domain_lower, domain_upper) = function.domain();
        if lower < domain_lower || upper > domain_upper {
            return Err(EngineError::OutOfDomain {
                lower,
                upper,
                function: "integrand",
            });
        }
        let pieces = self.split_at_singularities(function, lower, upper)?;
        info!(
            "integrating {} over [{}, {}] with {:?}, {} piece(s)",
            function.name(),
            lower,
            upper,
            method,
            pieces.len()
        );

        let mut steps = Vec::new();
        let mut value = 0.0;
        let mut error_value = 0.0;
        let mut subintervals = 0;
        let mut warnings = Vec::new();
        for (a, b) in pieces {
            let piece = self.halve_until_converged(method, function, a, b, tolerance, &mut steps)?;
            value += piece.value;
            error_value += piece.runge_error;
            subintervals += piece.subintervals;
            if !piece.converged {
                warn!(
                    "tolerance {} not met on [{}, {}] with {} subintervals",
                    tolerance, a, b, piece.subintervals
                );
                warnings.push(Warning::ConvergenceFailure {
                    subintervals: piece.subintervals,
                });
            }
        }
        let exact_value = match (function.antiderivative(lower), function.antiderivative(upper)) {
            (Some(fl), Some(fu)) if fl.is_finite() && fu.is_finite() => Some(fu - fl),
            _ => None,
        };
        info!("integral = {}, subintervals = {}", value, subintervals);
        debug!("\n{}", steps_table(&steps));
        let message = (!warnings.is_empty()).then(|| {
            warnings
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        });
        Ok(SolveResult {
            method_id: method.id(),
            function_id: None,
            value,
            function_value: None,
            iterations: subintervals,
            error_value,
            steps,
            message,
            warnings,
            exact_value,
        })
    }

    /// pieces of [lower, upper] that avoid the singular points by `singularity_offset`
    fn split_at_singularities<F>(
        &self,
        function: &F,
        lower: f64,
        upper: f64,
    ) -> Result<Vec<(f64, f64)>, EngineError>
    where
        F: Integrable,
    {
        let mut points: Vec<f64> = function
            .singular_points()
            .into_iter()
            .filter(|p| *p >= lower && *p <= upper)
            .collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup();

        let delta = self.singularity_offset;
        let mut pieces = Vec::new();
        let mut left = lower;
        for p in points {
            let finite = function
                .antiderivative(p)
                .map(|v| v.is_finite())
                .unwrap_or(false);
            if !finite {
                return Err(EngineError::DivergentIntegral {
                    point: p,
                    function: "integrand",
                });
            }
            if p - delta > left {
                pieces.push((left, p - delta));
            }
            left = p + delta;
        }
        if left < upper {
            pieces.push((left, upper));
        }
        if pieces.is_empty() {
            return Err(EngineError::InvalidParameter(
                "interval is too narrow around a singular point".to_string(),
            ));
        }
        Ok(pieces)
    }

    fn halve_until_converged<F>(
        &self,
        method: IntegrationMethod,
        function: &F,
        a: f64,
        b: f64,
        tolerance: f64,
        steps: &mut Vec<IterationStep>,
    ) -> Result<PieceResult, EngineError>
    where
        F: Integrable,
    {
        let f = |x: f64| function.evaluate(x);
        let mut n = self.initial_subintervals.max(1);
        if method == IntegrationMethod::Simpson && n % 2 == 1 {
            n += 1;
        }
        let runge_divisor = 2f64.powi(method.order()) - 1.0;
        let mut previous = method.composite(f, a, b, n);
        if !previous.is_finite() {
            return Err(not_finite(a, b, steps));
        }
        let mut runge_error = f64::INFINITY;
        while 2 * n <= self.max_subintervals {
            n *= 2;
            let current = method.composite(f, a, b, n);
            if !current.is_finite() {
                return Err(not_finite(a, b, steps));
            }
            runge_error = (current - previous).abs() / runge_divisor;
            steps.push(IterationStep::Quadrature {
                iteration: steps.len() + 1,
                subintervals: n,
                value: current,
                runge_error,
            });
            debug!("n = {}, I = {}, runge error = {}", n, current, runge_error);
            previous = current;
            if runge_error < tolerance {
                return Ok(PieceResult {
                    value: current,
                    runge_error,
                    subintervals: n,
                    converged: true,
                });
            }
        }
        Ok(PieceResult {
            value: previous,
            runge_error,
            subintervals: n,
            converged: false,
        })
    }
}

fn not_finite(a: f64, b: f64, steps: &[IterationStep]) -> EngineError {
    EngineError::breakdown(
        ErrorKind::DivergenceDetected,
        format!("integrand is not finite on the grid over [{}, {}]", a, b),
        PartialTrace::Steps(steps.to_vec()),
    )
}
