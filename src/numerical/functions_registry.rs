//! Fixed registries of the functions the engine can be asked about by id, plus the traits the
//! solvers are generic over. The registries are closed enums, so a lookup is a plain match and
//! nothing is built at runtime; any caller type implementing the traits works with the solvers too.
//!
//! | registry | ids |
//! |---|---|
//! | [`ScalarEquation`] | 0..=3 |
//! | [`EquationSystem`] | 0..=2 |
//! | [`Integrand`] | 0..=5 |
//! | [`OdeEquation`] | 0..=2 |
//! | [`SampleFunction`] | 0..=2 |
use crate::numerical::errors::EngineError;
use std::f64::consts::PI;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, FromRepr};

//////////////////////////////////TRAITS//////////////////////////////////////////////

/// a scalar function f(x) whose roots or integral we want
pub trait NonlinearFunction {
    fn evaluate(&self, x: f64) -> f64;

    /// analytic f'(x) when available
    fn derivative(&self, _x: f64) -> Option<f64> {
        None
    }

    /// analytic f''(x) when available
    fn second_derivative(&self, _x: f64) -> Option<f64> {
        None
    }

    /// name or formula used in logs and traces
    fn name(&self) -> &str {
        "unnamed_function"
    }
}

/// scalar function that can be integrated: knows where it is defined and where it blows up
pub trait Integrable: NonlinearFunction {
    fn antiderivative(&self, _x: f64) -> Option<f64> {
        None
    }

    /// closed interval outside of which the function is undefined
    fn domain(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    /// points of infinite discontinuity
    fn singular_points(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// system of two equations f1(x, y) = 0, f2(x, y) = 0
pub trait NonlinearSystem2 {
    fn values(&self, x: f64, y: f64) -> [f64; 2];

    /// [[df1/dx, df1/dy], [df2/dx, df2/dy]]
    fn jacobian(&self, x: f64, y: f64) -> [[f64; 2]; 2];

    fn name(&self) -> &str {
        "unnamed_system"
    }
}

/// right-hand side of y' = f(x, y), optionally with a known general solution y(x; C)
pub trait OdeFunction {
    fn rhs(&self, x: f64, y: f64) -> f64;

    fn name(&self) -> &str {
        "y' = f(x, y)"
    }

    /// integration constant of the solution passing through (x0, y0)
    fn integration_constant(&self, _x0: f64, _y0: f64) -> Option<f64> {
        None
    }

    fn exact_solution(&self, _x: f64, _c: f64) -> Option<f64> {
        None
    }

    fn exact_display(&self, _c: f64) -> Option<String> {
        None
    }
}

/// what every registry enum offers: id, display string and lookup by id
pub trait FunctionSpec: Sized + Copy {
    const REGISTRY: &'static str;

    fn id(&self) -> usize;

    fn display(&self) -> &'static str;

    fn from_id(id: usize) -> Option<Self>;

    fn all() -> Vec<Self>;

    fn lookup(id: usize) -> Result<Self, EngineError> {
        Self::from_id(id).ok_or(EngineError::UnknownFunctionId {
            registry: Self::REGISTRY,
            id,
        })
    }
}

//////////////////////////////////CLOSURE WRAPPERS//////////////////////////////////////

/// closure wrapper without derivatives
pub struct ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    func: F,
    name: String,
}

impl<F> ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(func: F, name: &str) -> Self {
        Self {
            func,
            name: name.to_string(),
        }
    }
}

impl<F> NonlinearFunction for ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> Integrable for ClosureFunction<F> where F: Fn(f64) -> f64 {}

/// closure wrapper with analytic first derivative and, optionally, second derivative
pub struct FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    func: F,
    derivative_func: D,
    second_derivative_func: Option<Box<dyn Fn(f64) -> f64>>,
    name: String,
}

impl<F, D> FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    pub fn new(func: F, derivative_func: D, name: &str) -> Self {
        Self {
            func,
            derivative_func,
            second_derivative_func: None,
            name: name.to_string(),
        }
    }

    pub fn with_second_derivative(mut self, second: impl Fn(f64) -> f64 + 'static) -> Self {
        self.second_derivative_func = Some(Box::new(second));
        self
    }
}

impl<F, D> NonlinearFunction for FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        Some((self.derivative_func)(x))
    }

    fn second_derivative(&self, x: f64) -> Option<f64> {
        self.second_derivative_func.as_ref().map(|f| f(x))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F, D> Integrable for FunctionWithDerivative<F, D>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
}

/// closure wrapper for an ODE right-hand side
pub struct ClosureOde<F>
where
    F: Fn(f64, f64) -> f64,
{
    rhs: F,
    name: String,
}

impl<F> ClosureOde<F>
where
    F: Fn(f64, f64) -> f64,
{
    pub fn new(rhs: F, name: &str) -> Self {
        Self {
            rhs,
            name: name.to_string(),
        }
    }
}

impl<F> OdeFunction for ClosureOde<F>
where
    F: Fn(f64, f64) -> f64,
{
    fn rhs(&self, x: f64, y: f64) -> f64 {
        (self.rhs)(x, y)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//////////////////////////////////SCALAR EQUATIONS//////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr)]
#[repr(usize)]
pub enum ScalarEquation {
    Cubic = 0,
    ShiftedCubic = 1,
    Exponential = 2,
    Sine = 3,
}

impl FunctionSpec for ScalarEquation {
    const REGISTRY: &'static str = "equation";

    fn id(&self) -> usize {
        *self as usize
    }

    fn display(&self) -> &'static str {
        match self {
            ScalarEquation::Cubic => "1.62x^3 - 8.15x^2 + 4.39x + 4.29",
            ScalarEquation::ShiftedCubic => "x^3 - x + 4",
            ScalarEquation::Exponential => "e^x - 5",
            ScalarEquation::Sine => "\\sin(2x) + \\frac{\\pi}{4}",
        }
    }

    fn from_id(id: usize) -> Option<Self> {
        Self::from_repr(id)
    }

    fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl NonlinearFunction for ScalarEquation {
    fn evaluate(&self, x: f64) -> f64 {
        match self {
            ScalarEquation::Cubic => 1.62 * x.powi(3) - 8.15 * x.powi(2) + 4.39 * x + 4.29,
            ScalarEquation::ShiftedCubic => x.powi(3) - x + 4.0,
            ScalarEquation::Exponential => x.exp() - 5.0,
            ScalarEquation::Sine => (2.0 * x).sin() + PI / 4.0,
        }
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        let d = match self {
            ScalarEquation::Cubic => 4.86 * x.powi(2) - 16.3 * x + 4.39,
            ScalarEquation::ShiftedCubic => 3.0 * x.powi(2) - 1.0,
            ScalarEquation::Exponential => x.exp(),
            ScalarEquation::Sine => 2.0 * (2.0 * x).cos(),
        };
        Some(d)
    }

    fn second_derivative(&self, x: f64) -> Option<f64> {
        let d2 = match self {
            ScalarEquation::Cubic => 9.72 * x - 16.3,
            ScalarEquation::ShiftedCubic => 6.0 * x,
            ScalarEquation::Exponential => x.exp(),
            ScalarEquation::Sine => -4.0 * (2.0 * x).sin(),
        };
        Some(d2)
    }

    fn name(&self) -> &str {
        self.display()
    }
}

//////////////////////////////////SYSTEMS///////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr)]
#[repr(usize)]
pub enum EquationSystem {
    CircleParabola = 0,
    Hyperbolic = 1,
    Trigonometric = 2,
}

impl FunctionSpec for EquationSystem {
    const REGISTRY: &'static str = "system";

    fn id(&self) -> usize {
        *self as usize
    }

    fn display(&self) -> &'static str {
        match self {
            EquationSystem::CircleParabola => {
                "\\begin{cases} x^2 + y^2 - 4 = 0 \\\\ -3x^2 + y = 0 \\end{cases}"
            }
            EquationSystem::Hyperbolic => {
                "\\begin{cases} x^2 + x - y^2 - 0.15 = 0 \\\\ x^2 - y + y^2 + 0.17 = 0 \\end{cases}"
            }
            EquationSystem::Trigonometric => {
                "\\begin{cases} 2y - \\cos(x + 1) = 0 \\\\ x + \\sin(y) + 0.4 = 0 \\end{cases}"
            }
        }
    }

    fn from_id(id: usize) -> Option<Self> {
        Self::from_repr(id)
    }

    fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl NonlinearSystem2 for EquationSystem {
    fn values(&self, x: f64, y: f64) -> [f64; 2] {
        match self {
            EquationSystem::CircleParabola => [x * x + y * y - 4.0, -3.0 * x * x + y],
            EquationSystem::Hyperbolic => [x * x + x - y * y - 0.15, x * x - y + y * y + 0.17],
            EquationSystem::Trigonometric => [2.0 * y - (x + 1.0).cos(), x + y.sin() + 0.4],
        }
    }

    fn jacobian(&self, x: f64, y: f64) -> [[f64; 2]; 2] {
        match self {
            EquationSystem::CircleParabola => [[2.0 * x, 2.0 * y], [-6.0 * x, 1.0]],
            EquationSystem::Hyperbolic => [[2.0 * x + 1.0, -2.0 * y], [2.0 * x, 2.0 * y - 1.0]],
            EquationSystem::Trigonometric => [[(x + 1.0).sin(), 2.0], [1.0, y.cos()]],
        }
    }

    fn name(&self) -> &str {
        self.display()
    }
}

//////////////////////////////////INTEGRANDS////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr)]
#[repr(usize)]
pub enum Integrand {
    Polynomial = 0,
    Sine = 1,
    Linear = 2,
    ScaledLogistic = 3,
    Hyperbola = 4,
    SqrtHyperbola = 5,
}

impl FunctionSpec for Integrand {
    const REGISTRY: &'static str = "integrand";

    fn id(&self) -> usize {
        *self as usize
    }

    fn display(&self) -> &'static str {
        match self {
            Integrand::Polynomial => "x^3 - 3x^2 + 7x - 10",
            Integrand::Sine => "\\sin(x)",
            Integrand::Linear => "x",
            Integrand::ScaledLogistic => "\\frac{x}{\\sqrt{1 + x^2}}",
            Integrand::Hyperbola => "\\frac{1}{x}",
            Integrand::SqrtHyperbola => "\\frac{1}{\\sqrt{x}}",
        }
    }

    fn from_id(id: usize) -> Option<Self> {
        Self::from_repr(id)
    }

    fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl NonlinearFunction for Integrand {
    fn evaluate(&self, x: f64) -> f64 {
        match self {
            Integrand::Polynomial => x.powi(3) - 3.0 * x.powi(2) + 7.0 * x - 10.0,
            Integrand::Sine => x.sin(),
            Integrand::Linear => x,
            Integrand::ScaledLogistic => x / (1.0 + x * x).sqrt(),
            Integrand::Hyperbola => 1.0 / x,
            Integrand::SqrtHyperbola => 1.0 / x.sqrt(),
        }
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        let d = match self {
            Integrand::Polynomial => 3.0 * x.powi(2) - 6.0 * x + 7.0,
            Integrand::Sine => x.cos(),
            Integrand::Linear => 1.0,
            Integrand::ScaledLogistic => (1.0 + x * x).powf(-1.5),
            Integrand::Hyperbola => -1.0 / (x * x),
            Integrand::SqrtHyperbola => -0.5 * x.powf(-1.5),
        };
        Some(d)
    }

    fn name(&self) -> &str {
        self.display()
    }
}

impl Integrable for Integrand {
    fn antiderivative(&self, x: f64) -> Option<f64> {
        let value = match self {
            Integrand::Polynomial => 0.25 * x.powi(4) - x.powi(3) + 3.5 * x.powi(2) - 10.0 * x,
            Integrand::Sine => -x.cos(),
            Integrand::Linear => 0.5 * x * x,
            Integrand::ScaledLogistic => (1.0 + x * x).sqrt(),
            Integrand::Hyperbola => x.abs().ln(),
            Integrand::SqrtHyperbola => 2.0 * x.sqrt(),
        };
        Some(value)
    }

    fn domain(&self) -> (f64, f64) {
        match self {
            Integrand::SqrtHyperbola => (0.0, f64::INFINITY),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    fn singular_points(&self) -> Vec<f64> {
        match self {
            Integrand::Hyperbola | Integrand::SqrtHyperbola => vec![0.0],
            _ => Vec::new(),
        }
    }
}

//////////////////////////////////ODE RIGHT-HAND SIDES//////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr)]
#[repr(usize)]
pub enum OdeEquation {
    QuadraticSource = 0,
    CubicSource = 1,
    CosineGrowth = 2,
}

impl OdeEquation {
    /// particular solution of the linear equations y' = p(x) - 2y
    fn particular(&self, x: f64) -> f64 {
        match self {
            OdeEquation::QuadraticSource => 0.5 * x * x - 0.5 * x + 0.25,
            OdeEquation::CubicSource => 0.5 * x.powi(3) - 0.75 * x * x + 0.75 * x - 0.375,
            OdeEquation::CosineGrowth => 0.0,
        }
    }
}

impl FunctionSpec for OdeEquation {
    const REGISTRY: &'static str = "ode";

    fn id(&self) -> usize {
        *self as usize
    }

    fn display(&self) -> &'static str {
        match self {
            OdeEquation::QuadraticSource => "y' = x^2 - 2y",
            OdeEquation::CubicSource => "y' = x^3 - 2y",
            OdeEquation::CosineGrowth => "y' = y \\cos(x)",
        }
    }

    fn from_id(id: usize) -> Option<Self> {
        Self::from_repr(id)
    }

    fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl OdeFunction for OdeEquation {
    fn rhs(&self, x: f64, y: f64) -> f64 {
        match self {
            OdeEquation::QuadraticSource => x * x - 2.0 * y,
            OdeEquation::CubicSource => x.powi(3) - 2.0 * y,
            OdeEquation::CosineGrowth => y * x.cos(),
        }
    }

    fn name(&self) -> &str {
        self.display()
    }

    fn integration_constant(&self, x0: f64, y0: f64) -> Option<f64> {
        let c = match self {
            OdeEquation::QuadraticSource | OdeEquation::CubicSource => {
                (y0 - self.particular(x0)) * (2.0 * x0).exp()
            }
            OdeEquation::CosineGrowth => y0 * (-x0.sin()).exp(),
        };
        c.is_finite().then_some(c)
    }

    fn exact_solution(&self, x: f64, c: f64) -> Option<f64> {
        let y = match self {
            OdeEquation::QuadraticSource | OdeEquation::CubicSource => {
                self.particular(x) + c * (-2.0 * x).exp()
            }
            OdeEquation::CosineGrowth => c * x.sin().exp(),
        };
        Some(y)
    }

    fn exact_display(&self, c: f64) -> Option<String> {
        let s = match self {
            OdeEquation::QuadraticSource => {
                format!(
                    "y = \\frac{{x^2}}{{2}} - \\frac{{x}}{{2}} + \\frac{{1}}{{4}} {:+.10}e^{{-2x}}",
                    c
                )
            }
            OdeEquation::CubicSource => format!(
                concat!(
                    "y = \\frac{{x^3}}{{2}} - \\frac{{3x^2}}{{4}} + \\frac{{3x}}{{4}}",
                    " - \\frac{{3}}{{8}} {:+.10}e^{{-2x}}"
                ),
                c
            ),
            OdeEquation::CosineGrowth => format!("y = {:.10}e^{{\\sin(x)}}", c),
        };
        Some(s)
    }
}

//////////////////////////////////INTERPOLATION SAMPLES/////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr)]
#[repr(usize)]
pub enum SampleFunction {
    Sin = 0,
    Cos = 1,
    Tan = 2,
}

impl FunctionSpec for SampleFunction {
    const REGISTRY: &'static str = "sample function";

    fn id(&self) -> usize {
        *self as usize
    }

    fn display(&self) -> &'static str {
        match self {
            SampleFunction::Sin => "\\sin(x)",
            SampleFunction::Cos => "\\cos(x)",
            SampleFunction::Tan => "\\tan(x)",
        }
    }

    fn from_id(id: usize) -> Option<Self> {
        Self::from_repr(id)
    }

    fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

impl NonlinearFunction for SampleFunction {
    fn evaluate(&self, x: f64) -> f64 {
        match self {
            SampleFunction::Sin => x.sin(),
            SampleFunction::Cos => x.cos(),
            SampleFunction::Tan => x.tan(),
        }
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        let d = match self {
            SampleFunction::Sin => x.cos(),
            SampleFunction::Cos => -x.sin(),
            SampleFunction::Tan => 1.0 / x.cos().powi(2),
        };
        Some(d)
    }

    fn name(&self) -> &str {
        self.display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::errors::ErrorKind;
    use approx::assert_relative_eq;

    fn central_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-6;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn test_lookup_known_and_unknown_ids() {
        assert_eq!(ScalarEquation::lookup(2).unwrap(), ScalarEquation::Exponential);
        assert_eq!(Integrand::lookup(5).unwrap(), Integrand::SqrtHyperbola);
        let err = ScalarEquation::lookup(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunctionId);
        let err = OdeEquation::lookup(99).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunctionId);
    }

    #[test]
    fn test_ids_are_contiguous() {
        for (i, eq) in ScalarEquation::all().iter().enumerate() {
            assert_eq!(eq.id(), i);
        }
        assert_eq!(EquationSystem::all().len(), 3);
        assert_eq!(Integrand::all().len(), 6);
        assert_eq!(OdeEquation::all().len(), 3);
        assert_eq!(SampleFunction::all().len(), 3);
    }

    #[test]
    fn test_scalar_derivatives_match_finite_differences() {
        for eq in ScalarEquation::all() {
            for x in [-1.3, 0.2, 0.9, 2.4] {
                let numeric = central_difference(|t| eq.evaluate(t), x);
                assert_relative_eq!(eq.derivative(x).unwrap(), numeric, epsilon = 1e-5);
                let numeric2 = central_difference(|t| eq.derivative(t).unwrap(), x);
                assert_relative_eq!(eq.second_derivative(x).unwrap(), numeric2, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_jacobians_match_finite_differences() {
        let h = 1e-6;
        for system in EquationSystem::all() {
            let (x, y) = (0.7, -0.4);
            let j = system.jacobian(x, y);
            let fx_plus = system.values(x + h, y);
            let fx_minus = system.values(x - h, y);
            let fy_plus = system.values(x, y + h);
            let fy_minus = system.values(x, y - h);
            for row in 0..2 {
                assert_relative_eq!(
                    j[row][0],
                    (fx_plus[row] - fx_minus[row]) / (2.0 * h),
                    epsilon = 1e-5
                );
                assert_relative_eq!(
                    j[row][1],
                    (fy_plus[row] - fy_minus[row]) / (2.0 * h),
                    epsilon = 1e-5
                );
            }
        }
    }

    #[test]
    fn test_antiderivatives_differentiate_back() {
        for integrand in Integrand::all() {
            for x in [0.3, 1.1, 2.5] {
                let numeric = central_difference(|t| integrand.antiderivative(t).unwrap(), x);
                assert_relative_eq!(integrand.evaluate(x), numeric, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_integrand_domains() {
        assert_eq!(Integrand::SqrtHyperbola.domain().0, 0.0);
        assert_eq!(Integrand::Hyperbola.singular_points(), vec![0.0]);
        assert!(Integrand::Sine.singular_points().is_empty());
        assert!(Integrand::Hyperbola.antiderivative(0.0).unwrap().is_infinite());
        assert_eq!(Integrand::SqrtHyperbola.antiderivative(0.0), Some(0.0));
    }

    #[test]
    fn test_ode_exact_solutions_satisfy_equation() {
        for ode in OdeEquation::all() {
            let c = ode.integration_constant(0.5, 1.5).unwrap();
            assert_relative_eq!(ode.exact_solution(0.5, c).unwrap(), 1.5, epsilon = 1e-12);
            for x in [0.0, 0.8, 1.7] {
                let y = ode.exact_solution(x, c).unwrap();
                let dy = central_difference(|t| ode.exact_solution(t, c).unwrap(), x);
                assert_relative_eq!(dy, ode.rhs(x, y), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_display_strings_carry_coefficients() {
        assert!(ScalarEquation::Cubic.display().contains("8.15x^2"));
        assert!(Integrand::Polynomial.display().contains("7x"));
        let shown = OdeEquation::QuadraticSource.exact_display(2.0).unwrap();
        assert!(shown.contains("+2.0000000000e^{-2x}"));
        assert_eq!(OdeEquation::CosineGrowth.name(), "y' = y \\cos(x)");
    }

    #[test]
    fn test_closure_wrappers() {
        let f = FunctionWithDerivative::new(|x| x * x - 2.0, |x| 2.0 * x, "x^2 - 2")
            .with_second_derivative(|_| 2.0);
        assert_eq!(f.derivative(3.0), Some(6.0));
        assert_eq!(f.second_derivative(3.0), Some(2.0));
        let g = ClosureFunction::new(|x| x, "x");
        assert_eq!(g.derivative(1.0), None);
        assert_eq!(g.name(), "x");
        let ode = ClosureOde::new(|_x, y| -2.0 * y, "y' = -2y");
        assert_eq!(ode.rhs(0.0, 1.0), -2.0);
        assert!(ode.integration_constant(0.0, 1.0).is_none());
    }
}
