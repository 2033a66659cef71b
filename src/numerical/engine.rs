//! Id-driven entry points: each call picks a registered function and an algorithm by
//! small integer ids and returns the result structure of that component.
//! ```
//! use RustedCompMath::numerical::engine::ComputeEngine;
//! use RustedCompMath::numerical::Nonlinear_equation::RootStart;
//! use RustedCompMath::Utils::engine_config::EngineConfig;
//! let engine = ComputeEngine::new(EngineConfig::default()).unwrap();
//! // e^x - 5 = 0 by half-division
//! let res = engine.solve_equation(0, 2, RootStart::Bracket(1.0, 2.0), 1e-6).unwrap();
//! assert!((res.value - 5f64.ln()).abs() < 1e-5);
//! ```
use crate::Utils::engine_config::EngineConfig;
use crate::Utils::logger::init_from_settings;
use crate::numerical::Approximation::{
    ApproximationModel, ApproximationReport, ApproximationResult, LeastSquaresApproximator,
};
use crate::numerical::Integration::{IntegrationMethod, Integrator};
use crate::numerical::Interpolation::{InterpolationMethod, InterpolationResult, Interpolator};
use crate::numerical::Linear_systems::{JacobiSolver, LinearSolveResult, LinearSystem};
use crate::numerical::Nonlinear_equation::{
    RootFindingConfig, RootMethod, RootStart, ScalarRootFinder,
};
use crate::numerical::Nonlinear_systems::SystemNewtonSolver;
use crate::numerical::ODE_suite::{IvpProblem, OdeSolution, OdeSolver};
use crate::numerical::errors::EngineError;
use crate::numerical::functions_registry::{
    EquationSystem, FunctionSpec, Integrand, OdeEquation, SampleFunction, ScalarEquation,
};
use crate::numerical::solve_result::{DataSet, SolveResult, SystemSolveResult};

#[derive(Debug, Clone)]
pub struct ComputeEngine {
    config: EngineConfig,
}

impl ComputeEngine {
    /// validated configuration; the engine never changes it afterwards
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(ComputeEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// install the logger described by `log_level`/`log_file`; false if logging is off
    pub fn init_logging(&self) -> Result<bool, EngineError> {
        init_from_settings(&self.config.log_level, self.config.log_file.as_deref())
    }

    pub fn solve_equation(
        &self,
        method_id: usize,
        function_id: usize,
        start: RootStart,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError> {
        let method = RootMethod::from_id(method_id)?;
        let equation = ScalarEquation::lookup(function_id)?;
        let finder = ScalarRootFinder::with_config(RootFindingConfig::from(&self.config));
        let mut result = finder.solve(method, &equation, start, tolerance)?;
        result.function_id = Some(function_id);
        Ok(result)
    }

    pub fn solve_system(
        &self,
        function_id: usize,
        initial_guess: (f64, f64),
        tolerance: f64,
    ) -> Result<SystemSolveResult, EngineError> {
        let system = EquationSystem::lookup(function_id)?;
        let solver = SystemNewtonSolver::from(&self.config);
        let mut result = solver.solve(&system, initial_guess, tolerance)?;
        result.function_id = Some(function_id);
        Ok(result)
    }

    /// rows of A with the matching entries of b, solved by simple iteration
    pub fn solve_linear(
        &self,
        rows: Vec<Vec<f64>>,
        rhs: Vec<f64>,
        tolerance: f64,
    ) -> Result<LinearSolveResult, EngineError> {
        let system = LinearSystem::from_rows(rows, rhs)?;
        JacobiSolver::from(&self.config).solve(&system, tolerance)
    }

    /// same as `solve_linear`, with the system and tolerance given in text form
    pub fn solve_linear_text(&self, document: &str) -> Result<LinearSolveResult, EngineError> {
        let (system, tolerance) = LinearSystem::parse(document)?;
        JacobiSolver::from(&self.config).solve(&system, tolerance)
    }

    pub fn integrate(
        &self,
        method_id: usize,
        function_id: usize,
        lower: f64,
        upper: f64,
        tolerance: f64,
    ) -> Result<SolveResult, EngineError> {
        let method = IntegrationMethod::from_id(method_id)?;
        let integrand = Integrand::lookup(function_id)?;
        let mut result =
            Integrator::from(&self.config).integrate(method, &integrand, lower, upper, tolerance)?;
        result.function_id = Some(function_id);
        Ok(result)
    }

    /// every applicable model family, best one first in the report
    pub fn approximate(
        &self,
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> Result<ApproximationReport, EngineError> {
        let data = DataSet::new(x, y)?;
        LeastSquaresApproximator::from(&self.config).approximate(&data)
    }

    pub fn approximate_with(
        &self,
        model_id: usize,
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> Result<ApproximationResult, EngineError> {
        let model = ApproximationModel::from_id(model_id)?;
        let data = DataSet::new(x, y)?;
        LeastSquaresApproximator::from(&self.config).approximate_with(model, &data)
    }

    pub fn interpolate(
        &self,
        method_id: usize,
        x: Vec<f64>,
        y: Vec<f64>,
        point: f64,
        nodes_amount: Option<usize>,
    ) -> Result<InterpolationResult, EngineError> {
        let method = InterpolationMethod::from_id(method_id)?;
        let data = DataSet::new(x, y)?;
        Interpolator::interpolate(method, &data, point, nodes_amount)
    }

    /// equally spaced nodes of a registered sample function
    pub fn sample_function(
        &self,
        function_id: usize,
        start: f64,
        end: f64,
        nodes_amount: usize,
    ) -> Result<DataSet, EngineError> {
        let function = SampleFunction::lookup(function_id)?;
        Interpolator::sample_function(&function, start, end, nodes_amount)
    }

    /// sample a registered function on [start, end] and interpolate it at `point`
    pub fn interpolate_function(
        &self,
        method_id: usize,
        function_id: usize,
        start: f64,
        end: f64,
        nodes_amount: usize,
        point: f64,
    ) -> Result<InterpolationResult, EngineError> {
        let method = InterpolationMethod::from_id(method_id)?;
        let data = self.sample_function(function_id, start, end, nodes_amount)?;
        Interpolator::interpolate(method, &data, point, None)
    }

    pub fn solve_ode(
        &self,
        function_id: usize,
        y0: f64,
        x0: f64,
        xn: f64,
        step: f64,
        tolerance: f64,
    ) -> Result<OdeSolution, EngineError> {
        let equation = OdeEquation::lookup(function_id)?;
        OdeSolver::from(&self.config).solve_ode(
            &equation,
            IvpProblem {
                x0,
                y0,
                xn,
                step,
                tolerance,
            },
        )
    }
}

impl Default for ComputeEngine {
    fn default() -> Self {
        ComputeEngine {
            config: EngineConfig::default(),
        }
    }
}
