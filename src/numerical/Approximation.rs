//! Least-squares approximation of tabulated data by a family of models
//! (polynomials of degree 1..=3, exponential, logarithmic, power).
//!
//! Polynomials are fitted through the normal equations, solved by LU decomposition.
//! The two-parameter nonlinear models are linearised by taking logarithms and fitted as
//! straight lines:
//! - exponential `y = a e^{bx}`: ln y = ln a + b x, needs y > 0
//! - logarithmic `y = a + b ln x`: needs x > 0
//! - power `y = a x^b`: ln y = ln a + b ln x, needs x > 0 and y > 0
//!
//! The best model is the one with the smallest standard deviation
//! `sqrt(Σ ε_i^2 / n)`, ties going to the simpler model.
use crate::Utils::engine_config::EngineConfig;
use crate::numerical::errors::{EngineError, Warning};
use crate::numerical::solve_result::DataSet;
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, Serialize)]
#[repr(usize)]
pub enum ApproximationModel {
    Linear = 0,
    Quadratic = 1,
    Cubic = 2,
    Exponential = 3,
    Logarithmic = 4,
    Power = 5,
}

impl ApproximationModel {
    pub fn from_id(id: usize) -> Result<Self, EngineError> {
        Self::from_repr(id).ok_or(EngineError::UnknownMethodId {
            component: "approximation",
            id,
        })
    }

    pub fn id(&self) -> usize {
        *self as usize
    }

    pub fn parameters(&self) -> usize {
        match self {
            ApproximationModel::Quadratic => 3,
            ApproximationModel::Cubic => 4,
            _ => 2,
        }
    }

    /// reason the model cannot be fitted to the data, if any
    fn inapplicable(&self, data: &DataSet) -> Option<String> {
        let distinct = data
            .x
            .iter()
            .map(|v| v.to_bits())
            .unique()
            .count();
        if distinct < self.parameters() {
            return Some(format!(
                "{:?} needs {} distinct x values, got {}",
                self,
                self.parameters(),
                distinct
            ));
        }
        let x_positive = data.x.iter().all(|&v| v > 0.0);
        let y_positive = data.y.iter().all(|&v| v > 0.0);
        match self {
            ApproximationModel::Exponential if !y_positive => {
                Some("exponential model needs y > 0".to_string())
            }
            ApproximationModel::Logarithmic if !x_positive => {
                Some("logarithmic model needs x > 0".to_string())
            }
            ApproximationModel::Power if !(x_positive && y_positive) => {
                Some("power model needs x > 0 and y > 0".to_string())
            }
            _ => None,
        }
    }

    pub fn evaluate(&self, coefficients: &[f64], x: f64) -> f64 {
        match self {
            ApproximationModel::Linear
            | ApproximationModel::Quadratic
            | ApproximationModel::Cubic => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * x + c),
            ApproximationModel::Exponential => coefficients[0] * (coefficients[1] * x).exp(),
            ApproximationModel::Logarithmic => coefficients[0] + coefficients[1] * x.ln(),
            ApproximationModel::Power => coefficients[0] * x.powf(coefficients[1]),
        }
    }

    /// LaTeX-style formula with the coefficients printed to 10 decimals
    pub fn display(&self, coefficients: &[f64]) -> String {
        match self {
            ApproximationModel::Linear
            | ApproximationModel::Quadratic
            | ApproximationModel::Cubic => {
                let mut terms: Vec<String> = Vec::new();
                for (power, &c) in coefficients.iter().enumerate() {
                    if c == 0.0 && power != 0 {
                        continue;
                    }
                    let mut term = if terms.is_empty() {
                        format!("{:.10}", c)
                    } else {
                        format!("{:+.10}", c)
                    };
                    match power {
                        0 => {}
                        1 => term.push('x'),
                        p => term.push_str(&format!("x^{}", p)),
                    }
                    terms.push(term);
                }
                terms.join("")
            }
            ApproximationModel::Exponential => {
                format!("{:.10}e^{{{:.10}x}}", coefficients[0], coefficients[1])
            }
            ApproximationModel::Logarithmic => {
                format!("{:.10}{:+.10}\\ln(x)", coefficients[0], coefficients[1])
            }
            ApproximationModel::Power => {
                format!("{:.10}x^{{{:.10}}}", coefficients[0], coefficients[1])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub phi_x: f64,
    pub epsilon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproximationResult {
    pub model: ApproximationModel,
    pub model_id: usize,
    /// polynomials: a0, a1, ... ; two-parameter models: a, b
    pub coefficients: Vec<f64>,
    pub phi_values: Vec<f64>,
    /// y_i - φ(x_i)
    pub differences: Vec<f64>,
    pub standard_deviation: f64,
    pub pearson_correlation: Option<f64>,
    pub coefficient_of_determination: Option<f64>,
    pub display_formula: String,
    pub data_points: Vec<DataPoint>,
    pub warnings: Vec<Warning>,
}

impl ApproximationResult {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.model.evaluate(&self.coefficients, x)
    }

    /// samples of the fitted model for plotting
    pub fn curve(&self, start: f64, end: f64, samples: usize) -> Vec<(f64, f64)> {
        if samples < 2 {
            return vec![(start, self.evaluate(start))];
        }
        let step = (end - start) / (samples - 1) as f64;
        (0..samples)
            .map(|i| {
                let x = start + i as f64 * step;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedModel {
    pub model: ApproximationModel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproximationReport {
    pub best: ApproximationResult,
    /// every model that could be fitted, in id order
    pub candidates: Vec<ApproximationResult>,
    pub skipped: Vec<SkippedModel>,
}

/// coefficients c0..c_degree of the polynomial fit, lowest power first
fn polynomial_least_squares(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let m = degree + 1;
    let a = DMatrix::from_fn(m, m, |i, j| {
        x.iter().map(|v| v.powi((i + j) as i32)).sum::<f64>()
    });
    let b = DVector::from_fn(m, |i, _| {
        x.iter()
            .zip(y.iter())
            .map(|(xv, yv)| xv.powi(i as i32) * yv)
            .sum::<f64>()
    });
    let solution = a.lu().solve(&b)?;
    solution
        .iter()
        .all(|c| c.is_finite())
        .then(|| solution.iter().copied().collect())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson r between two samples; None when either has zero variance
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let (ma, mb) = (mean(a), mean(b));
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    let n = a.len() as f64;
    let flat = |variance: f64, m: f64| variance / n <= (1e-12 * m.abs().max(1.0)).powi(2);
    if flat(va, ma) || flat(vb, mb) {
        return None;
    }
    let r = cov / (va * vb).sqrt();
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

#[derive(Debug, Clone)]
pub struct LeastSquaresApproximator {
    pub weak_correlation: f64,
}

impl From<&EngineConfig> for LeastSquaresApproximator {
    fn from(config: &EngineConfig) -> Self {
        LeastSquaresApproximator {
            weak_correlation: config.weak_correlation,
        }
    }
}

impl Default for LeastSquaresApproximator {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl LeastSquaresApproximator {
    fn check_data(data: &DataSet) -> Result<(), EngineError> {
        if data.len() < 2 {
            return Err(EngineError::InsufficientData(format!(
                "approximation needs at least 2 points, got {}",
                data.len()
            )));
        }
        Ok(())
    }

    fn coefficients(model: ApproximationModel, data: &DataSet) -> Option<Vec<f64>> {
        let ln = |v: &[f64]| v.iter().map(|t| t.ln()).collect::<Vec<f64>>();
        match model {
            ApproximationModel::Linear => polynomial_least_squares(&data.x, &data.y, 1),
            ApproximationModel::Quadratic => polynomial_least_squares(&data.x, &data.y, 2),
            ApproximationModel::Cubic => polynomial_least_squares(&data.x, &data.y, 3),
            ApproximationModel::Exponential => {
                let line = polynomial_least_squares(&data.x, &ln(&data.y), 1)?;
                Some(vec![line[0].exp(), line[1]])
            }
            ApproximationModel::Logarithmic => polynomial_least_squares(&ln(&data.x), &data.y, 1),
            ApproximationModel::Power => {
                let line = polynomial_least_squares(&ln(&data.x), &ln(&data.y), 1)?;
                Some(vec![line[0].exp(), line[1]])
            }
        }
    }

    /// fit a single model
    pub fn approximate_with(
        &self,
        model: ApproximationModel,
        data: &DataSet,
    ) -> Result<ApproximationResult, EngineError> {
        Self::check_data(data)?;
        if let Some(reason) = model.inapplicable(data) {
            return Err(EngineError::InsufficientData(reason));
        }
        let coefficients = Self::coefficients(model, data).ok_or_else(|| {
            EngineError::InsufficientData(format!("normal equations of {:?} are singular", model))
        })?;
        let n = data.len() as f64;
        let phi_values: Vec<f64> = data
            .x
            .iter()
            .map(|&x| model.evaluate(&coefficients, x))
            .collect();
        let differences: Vec<f64> = data
            .y
            .iter()
            .zip(phi_values.iter())
            .map(|(y, phi)| y - phi)
            .collect();
        let ss_res: f64 = differences.iter().map(|e| e * e).sum();
        let standard_deviation = (ss_res / n).sqrt();
        let y_mean = mean(&data.y);
        let ss_tot: f64 = data.y.iter().map(|y| (y - y_mean).powi(2)).sum();
        let coefficient_of_determination = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);
        let pearson_correlation = pearson(&data.y, &phi_values);

        let mut warnings = Vec::new();
        if let Some(r) = pearson_correlation {
            if r.abs() < self.weak_correlation {
                warn!("{:?}: no strong linear dependency detected, r = {}", model, r);
                warnings.push(Warning::WeakCorrelation { r });
            }
        }
        let data_points = data
            .points()
            .into_iter()
            .zip(phi_values.iter().zip(differences.iter()))
            .map(|((x, y), (&phi_x, &epsilon))| DataPoint {
                x,
                y,
                phi_x,
                epsilon,
            })
            .collect();
        debug!(
            "{:?}: coefficients {:?}, S = {}, r = {:?}",
            model, coefficients, standard_deviation, pearson_correlation
        );
        Ok(ApproximationResult {
            model,
            model_id: model.id(),
            display_formula: model.display(&coefficients),
            coefficients,
            phi_values,
            differences,
            standard_deviation,
            pearson_correlation,
            coefficient_of_determination,
            data_points,
            warnings,
        })
    }

    /// fit every applicable model and pick the one with the smallest standard deviation
    pub fn approximate(&self, data: &DataSet) -> Result<ApproximationReport, EngineError> {
        Self::check_data(data)?;
        info!("approximating {} points", data.len());
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        for model in ApproximationModel::iter() {
            match self.approximate_with(model, data) {
                Ok(fit) if fit.standard_deviation.is_finite() => candidates.push(fit),
                Ok(fit) => {
                    warn!("{:?} skipped: standard deviation is not finite", model);
                    skipped.push(SkippedModel {
                        model,
                        reason: format!("standard deviation {}", fit.standard_deviation),
                    });
                }
                Err(e) => {
                    warn!("{:?} skipped: {}", model, e);
                    skipped.push(SkippedModel {
                        model,
                        reason: e.to_string(),
                    });
                }
            }
        }
        let mut best: Option<&ApproximationResult> = None;
        for fit in &candidates {
            let better = match best {
                None => true,
                Some(current) => {
                    let margin = 1e-12 * current.standard_deviation.max(1.0);
                    fit.standard_deviation < current.standard_deviation - margin
                }
            };
            if better {
                best = Some(fit);
            }
        }
        let best = best.cloned().ok_or(EngineError::NoApplicableModel)?;
        info!(
            "best model {:?}: {} (S = {})",
            best.model, best.display_formula, best.standard_deviation
        );
        Ok(ApproximationReport {
            best,
            candidates,
            skipped,
        })
    }
}
