//! numerical methods engine: nonlinear equations and systems, quadrature,
//! least-squares approximation, interpolation and IVP for ODEs
/// errors, breakdown partial traces and non-fatal warnings
pub mod errors;
/// result structures shared by the solvers: iteration steps, SolveResult, DataSet
pub mod solve_result;
/// fixed registries of equations, systems, integrands and ODEs addressed by integer id
pub mod functions_registry;
/// Example#1
/// ```
/// use RustedCompMath::numerical::Nonlinear_equation::{RootMethod, RootStart, ScalarRootFinder};
/// use RustedCompMath::numerical::functions_registry::FunctionWithDerivative;
/// let f = FunctionWithDerivative::new(|x| x * x - 2.0, |x| 2.0 * x, "x^2 - 2");
/// let res = ScalarRootFinder::new()
///     .solve(RootMethod::Newton, &f, RootStart::Estimate(1.0), 1e-8)
///     .unwrap();
/// assert!((res.value - 2f64.sqrt()).abs() < 1e-8);
/// println!("{}", res.table());
/// ```
pub mod Nonlinear_equation;
/// Newton's method for systems of two equations
pub mod Nonlinear_systems;
/// Jacobi iteration for linear systems after reordering rows towards diagonal dominance
pub mod Linear_systems;
/// composite quadrature rules with Runge-rule refinement
pub mod Integration;
/// least-squares fitting of linear, polynomial, exponential, logarithmic and power models
pub mod Approximation;
/// Lagrange and Newton interpolating polynomials
pub mod Interpolation;
/// Euler, extended Euler and Milne for y' = f(x, y)
pub mod ODE_suite;
/// one entry point per component, everything selected by ids
pub mod engine;
/// `{ error, result }` envelope for JSON callers
pub mod response;
