//! Polynomial interpolation through tabulated nodes: Lagrange form, Newton's divided
//! ("separated") differences and Newton's forward finite differences for equally spaced nodes.
//! ```
//! use RustedCompMath::numerical::Interpolation::{Interpolator, InterpolationMethod};
//! use RustedCompMath::numerical::solve_result::DataSet;
//! let data = DataSet::new(vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 1.0]).unwrap();
//! let res = Interpolator::interpolate(InterpolationMethod::NewtonSeparated, &data, 0.5, None)
//!     .unwrap();
//! assert!((res.interpolated_value - 0.25).abs() < 1e-12);
//! ```
use crate::numerical::errors::{EngineError, Warning};
use crate::numerical::functions_registry::NonlinearFunction;
use crate::numerical::solve_result::DataSet;
use log::{debug, info, warn};
use serde::Serialize;
use strum_macros::{EnumIter, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, Serialize)]
#[repr(usize)]
pub enum InterpolationMethod {
    Lagrange = 0,
    NewtonSeparated = 1,
    NewtonFinite = 2,
}

impl InterpolationMethod {
    pub fn from_id(id: usize) -> Result<Self, EngineError> {
        Self::from_repr(id).ok_or(EngineError::UnknownMethodId {
            component: "interpolation",
            id,
        })
    }

    pub fn id(&self) -> usize {
        *self as usize
    }
}

fn lagrange_interpolate(x: f64, x_vals: &[f64], y_vals: &[f64]) -> f64 {
    let n = x_vals.len();
    let mut result = 0.0;
    for i in 0..n {
        let mut term = y_vals[i];
        for j in 0..n {
            if i != j {
                term *= (x - x_vals[j]) / (x_vals[i] - x_vals[j]);
            }
        }
        result += term;
    }
    result
}

/// Newton divided difference coefficients f[x0], f[x0,x1], ...
pub fn divided_differences(x_vals: &[f64], y_vals: &[f64]) -> Vec<f64> {
    let n = x_vals.len();
    let mut coef = y_vals.to_vec();
    for j in 1..n {
        for i in (j..n).rev() {
            coef[i] = (coef[i] - coef[i - 1]) / (x_vals[i] - x_vals[i - j]);
        }
    }
    coef
}

/// Evaluate Newton interpolating polynomial using Horner's method
fn newton_interpolate(x: f64, x_vals: &[f64], coef: &[f64]) -> f64 {
    let n = coef.len();
    let mut result = coef[n - 1];
    for i in (0..n - 1).rev() {
        result = result * (x - x_vals[i]) + coef[i];
    }
    result
}

/// triangular table: row 0 is y, row k holds the k-th finite differences (n - k entries)
pub fn finite_differences(y_vals: &[f64]) -> Vec<Vec<f64>> {
    let mut table = vec![y_vals.to_vec()];
    for k in 1..y_vals.len() {
        let previous = &table[k - 1];
        let row: Vec<f64> = previous.windows(2).map(|w| w[1] - w[0]).collect();
        table.push(row);
    }
    table
}

/// forward Newton formula in t = (x - x0)/h: Σ Δ^k y0 / k! · t(t-1)...(t-k+1)
fn newton_finite_interpolate(x: f64, x_vals: &[f64], table: &[Vec<f64>]) -> f64 {
    if x_vals.len() == 1 {
        return table[0][0];
    }
    let h = x_vals[1] - x_vals[0];
    let t = (x - x_vals[0]) / h;
    let mut result = table[0][0];
    let mut term = 1.0;
    for (k, row) in table.iter().enumerate().skip(1) {
        term *= (t - (k - 1) as f64) / k as f64;
        result += term * row[0];
    }
    result
}

fn factor(v: f64) -> String {
    if v < 0.0 {
        format!("(x + {})", -v)
    } else {
        format!("(x - {})", v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationResult {
    pub method: InterpolationMethod,
    pub method_id: usize,
    pub point: f64,
    pub interpolated_value: f64,
    pub difference_table: Vec<Vec<f64>>,
    pub divided_differences: Vec<f64>,
    /// nodes actually used, sorted by x
    pub nodes: DataSet,
    pub display_formula: String,
    pub warnings: Vec<Warning>,
}

impl InterpolationResult {
    /// value of the interpolating polynomial at x
    pub fn evaluate(&self, x: f64) -> f64 {
        match self.method {
            InterpolationMethod::Lagrange => lagrange_interpolate(x, &self.nodes.x, &self.nodes.y),
            InterpolationMethod::NewtonSeparated => {
                newton_interpolate(x, &self.nodes.x, &self.divided_differences)
            }
            InterpolationMethod::NewtonFinite => {
                newton_finite_interpolate(x, &self.nodes.x, &self.difference_table)
            }
        }
    }

    /// the polynomial sampled over the node range, for plotting
    pub fn curve(&self, samples: usize) -> Vec<(f64, f64)> {
        let Some((min, max)) = self.nodes.x_range() else {
            return Vec::new();
        };
        if samples < 2 || min == max {
            return vec![(min, self.evaluate(min))];
        }
        let step = (max - min) / (samples - 1) as f64;
        (0..samples)
            .map(|i| {
                let x = min + i as f64 * step;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

pub struct Interpolator;

impl Interpolator {
    /// sort the nodes, reject duplicates and keep the `nodes_amount` nodes nearest to `point`
    pub fn select_nodes(
        data: &DataSet,
        point: f64,
        nodes_amount: Option<usize>,
    ) -> Result<DataSet, EngineError> {
        if data.is_empty() {
            return Err(EngineError::InsufficientData(
                "interpolation needs at least one node".to_string(),
            ));
        }
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.sort_by(|&i, &j| data.x[i].total_cmp(&data.x[j]));
        if let Some(w) = order.windows(2).find(|w| data.x[w[0]] == data.x[w[1]]) {
            return Err(EngineError::DuplicateNodes(data.x[w[0]]));
        }
        if let Some(amount) = nodes_amount {
            if amount == 0 {
                return Err(EngineError::InvalidParameter(
                    "nodes_amount must be positive".to_string(),
                ));
            }
            if amount < order.len() {
                // stable sort keeps the lower index first on equal distances
                let mut by_distance: Vec<usize> = (0..order.len()).collect();
                by_distance.sort_by(|&i, &j| {
                    let di = (data.x[order[i]] - point).abs();
                    let dj = (data.x[order[j]] - point).abs();
                    di.total_cmp(&dj)
                });
                let mut chosen: Vec<usize> = by_distance.into_iter().take(amount).collect();
                chosen.sort_unstable();
                order = chosen.into_iter().map(|k| order[k]).collect();
            }
        }
        let x = order.iter().map(|&i| data.x[i]).collect();
        let y = order.iter().map(|&i| data.y[i]).collect();
        DataSet::new(x, y)
    }

    fn check_equal_spacing(x: &[f64]) -> Result<(), EngineError> {
        if x.len() < 3 {
            return Ok(());
        }
        let h = x[1] - x[0];
        let uniform = x
            .windows(2)
            .all(|w| ((w[1] - w[0]) - h).abs() <= 1e-9 * h.abs());
        if uniform {
            Ok(())
        } else {
            Err(EngineError::UnequalSpacing)
        }
    }

    fn display(
        method: InterpolationMethod,
        nodes: &DataSet,
        divided: &[f64],
        table: &[Vec<f64>],
    ) -> String {
        let x = &nodes.x;
        match method {
            InterpolationMethod::Lagrange => (0..x.len())
                .map(|i| {
                    let numerator: String = (0..x.len())
                        .filter(|&j| j != i)
                        .map(|j| factor(x[j]))
                        .collect();
                    let denominator: String = (0..x.len())
                        .filter(|&j| j != i)
                        .map(|j| format!("({} - {})", x[i], x[j]))
                        .collect();
                    if numerator.is_empty() {
                        format!("{}", nodes.y[i])
                    } else {
                        format!("{} \\cdot \\frac{{{}}}{{{}}}", nodes.y[i], numerator, denominator)
                    }
                })
                .collect::<Vec<_>>()
                .join(" + "),
            InterpolationMethod::NewtonSeparated => {
                let mut terms = vec![format!("{}", divided[0])];
                let mut product = String::new();
                for i in 1..x.len() {
                    product.push_str(&factor(x[i - 1]));
                    terms.push(format!("{} \\cdot {}", divided[i], product));
                }
                terms.join(" + ")
            }
            InterpolationMethod::NewtonFinite => {
                let mut terms = vec![format!("{}", table[0][0])];
                if x.len() > 1 {
                    let h = x[1] - x[0];
                    let mut product = String::new();
                    for (k, row) in table.iter().enumerate().skip(1) {
                        if k == 1 {
                            product.push('t');
                        } else {
                            product.push_str(&format!("(t - {})", k - 1));
                        }
                        terms.push(format!("\\frac{{{}}}{{{}!}} {}", row[0], k, product));
                    }
                    return format!(
                        "{}, \\quad t = \\frac{{{}}}{{{}}}",
                        terms.join(" + "),
                        factor(x[0]),
                        h
                    );
                }
                terms.join(" + ")
            }
        }
    }

    pub fn interpolate(
        method: InterpolationMethod,
        data: &DataSet,
        point: f64,
        nodes_amount: Option<usize>,
    ) -> Result<InterpolationResult, EngineError> {
        if !point.is_finite() {
            return Err(EngineError::InvalidParameter(
                "interpolation point must be finite".to_string(),
            ));
        }
        let nodes = Self::select_nodes(data, point, nodes_amount)?;
        if method == InterpolationMethod::NewtonFinite {
            Self::check_equal_spacing(&nodes.x)?;
        }
        info!(
            "interpolating at {} with {:?} on {} nodes",
            point,
            method,
            nodes.len()
        );
        let mut warnings = Vec::new();
        // a subset of nodes near the point does not make it an extrapolation
        if let Some((min, max)) = data.x_range() {
            if point < min || point > max {
                warn!("point {} lies outside [{}, {}], extrapolating", point, min, max);
                warnings.push(Warning::ExtrapolationWarning { point, min, max });
            }
        }
        let difference_table = finite_differences(&nodes.y);
        let divided = divided_differences(&nodes.x, &nodes.y);
        let display_formula = Self::display(method, &nodes, &divided, &difference_table);
        let mut result = InterpolationResult {
            method,
            method_id: method.id(),
            point,
            interpolated_value: f64::NAN,
            difference_table,
            divided_differences: divided,
            nodes,
            display_formula,
            warnings,
        };
        result.interpolated_value = result.evaluate(point);
        debug!("P({}) = {}", point, result.interpolated_value);
        Ok(result)
    }

    /// `nodes_amount` equally spaced nodes of a function over [start, end]
    pub fn sample_function<F: NonlinearFunction>(
        function: &F,
        start: f64,
        end: f64,
        nodes_amount: usize,
    ) -> Result<DataSet, EngineError> {
        if nodes_amount < 2 {
            return Err(EngineError::InvalidParameter(
                "at least 2 nodes are needed to sample a function".to_string(),
            ));
        }
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(EngineError::InvalidParameter(format!(
                "sampling interval must satisfy start < end, got [{}, {}]",
                start, end
            )));
        }
        let step = (end - start) / (nodes_amount - 1) as f64;
        let x: Vec<f64> = (0..nodes_amount).map(|i| start + step * i as f64).collect();
        let y = x.iter().map(|&v| function.evaluate(v)).collect();
        DataSet::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::errors::ErrorKind;
    use crate::numerical::functions_registry::{FunctionSpec, SampleFunction};
    use approx::assert_relative_eq;

    fn cubic_data() -> DataSet {
        let x: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let y = x.iter().map(|v| v * v * v - 2.0 * v + 1.0).collect();
        DataSet::new(x, y).unwrap()
    }

    #[test]
    fn test_round_trip_at_nodes() {
        let data = cubic_data();
        for id in 0..3 {
            let method = InterpolationMethod::from_id(id).unwrap();
            for i in 0..data.len() {
                let res = Interpolator::interpolate(method, &data, data.x[i], None).unwrap();
                assert_relative_eq!(res.interpolated_value, data.y[i], epsilon = 1e-12);
                assert!(res.warnings.is_empty());
            }
        }
    }

    #[test]
    fn test_methods_agree_between_nodes() {
        let data = cubic_data();
        let point = 1.3;
        let exact = point * point * point - 2.0 * point + 1.0;
        for id in 0..3 {
            let method = InterpolationMethod::from_id(id).unwrap();
            let res = Interpolator::interpolate(method, &data, point, None).unwrap();
            assert_relative_eq!(res.interpolated_value, exact, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_difference_table_shape() {
        let res =
            Interpolator::interpolate(InterpolationMethod::NewtonFinite, &cubic_data(), 0.7, None)
                .unwrap();
        let n = res.nodes.len();
        assert_eq!(res.difference_table.len(), n);
        for (k, row) in res.difference_table.iter().enumerate() {
            assert_eq!(row.len(), n - k);
        }
        // third differences of a cubic are constant: 6 h^3 = 0.75
        for v in &res.difference_table[3] {
            assert_relative_eq!(*v, 0.75, epsilon = 1e-12);
        }
        for v in &res.difference_table[4] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unsorted_nodes_are_sorted_and_duplicates_rejected() {
        let data = DataSet::new(vec![2.0, 0.0, 1.0], vec![4.0, 0.0, 1.0]).unwrap();
        let res =
            Interpolator::interpolate(InterpolationMethod::Lagrange, &data, 1.5, None).unwrap();
        assert_eq!(res.nodes.x, vec![0.0, 1.0, 2.0]);
        assert_relative_eq!(res.interpolated_value, 2.25, epsilon = 1e-12);

        let data = DataSet::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]).unwrap();
        let err = Interpolator::interpolate(InterpolationMethod::NewtonSeparated, &data, 0.5, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateNodes);
    }

    #[test]
    fn test_nearest_node_selection() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = x.iter().map(|v| v * v).collect();
        let data = DataSet::new(x, y).unwrap();
        let nodes = Interpolator::select_nodes(&data, 6.2, Some(3)).unwrap();
        assert_eq!(nodes.x, vec![5.0, 6.0, 7.0]);
        let nodes = Interpolator::select_nodes(&data, 4.5, Some(3)).unwrap();
        assert_eq!(nodes.x, vec![3.0, 4.0, 5.0]);
        let nodes = Interpolator::select_nodes(&data, 4.5, Some(50)).unwrap();
        assert_eq!(nodes.len(), 10);
        let err = Interpolator::select_nodes(&data, 4.5, Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_extrapolation_is_advisory() {
        let res = Interpolator::interpolate(
            InterpolationMethod::NewtonSeparated,
            &cubic_data(),
            3.0,
            None,
        )
        .unwrap();
        assert_eq!(res.warnings[0].kind(), ErrorKind::ExtrapolationWarning);
        assert_relative_eq!(res.interpolated_value, 22.0, epsilon = 1e-9);
    }

    #[test]
    fn test_extrapolation_is_judged_on_all_nodes() {
        let data =
            DataSet::new(vec![0.0, 1.0, 2.0, 10.0], vec![0.0, 1.0, 4.0, 100.0]).unwrap();
        // the two nearest nodes are 1 and 2, yet 4.5 lies inside the data
        let res =
            Interpolator::interpolate(InterpolationMethod::Lagrange, &data, 4.5, Some(2)).unwrap();
        assert_eq!(res.nodes.x, vec![1.0, 2.0]);
        assert!(res.warnings.is_empty());
        assert_relative_eq!(res.interpolated_value, 11.5, epsilon = 1e-12);
        let res =
            Interpolator::interpolate(InterpolationMethod::Lagrange, &data, 12.0, Some(2)).unwrap();
        assert_eq!(
            res.warnings,
            vec![Warning::ExtrapolationWarning {
                point: 12.0,
                min: 0.0,
                max: 10.0
            }]
        );
    }

    #[test]
    fn test_finite_differences_need_equal_spacing() {
        let data = DataSet::new(vec![0.0, 0.3, 0.7, 1.2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let err = Interpolator::interpolate(InterpolationMethod::NewtonFinite, &data, 0.5, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnequalSpacing);
    }

    #[test]
    fn test_sampled_sine() {
        let sin = SampleFunction::lookup(0).unwrap();
        let data = Interpolator::sample_function(&sin, 0.0, std::f64::consts::PI, 5).unwrap();
        assert_relative_eq!(data.y[2], 1.0, epsilon = 1e-15);
        let res =
            Interpolator::interpolate(InterpolationMethod::NewtonSeparated, &data, 1.0, Some(4))
                .unwrap();
        assert_eq!(res.nodes.len(), 4);
        assert!((res.interpolated_value - 1f64.sin()).abs() < 1e-2);
        assert_eq!(res.curve(20).len(), 20);
        assert!(res.display_formula.contains("(x - 0)"));
    }

    #[test]
    fn test_display_formulas() {
        let data = DataSet::new(vec![-1.0, 0.0, 1.0], vec![1.0, 0.0, 1.0]).unwrap();
        let res =
            Interpolator::interpolate(InterpolationMethod::NewtonSeparated, &data, 0.5, None)
                .unwrap();
        assert_eq!(
            res.display_formula,
            "1 + -1 \\cdot (x + 1) + 1 \\cdot (x + 1)(x - 0)"
        );
        let res =
            Interpolator::interpolate(InterpolationMethod::Lagrange, &data, 0.5, None).unwrap();
        assert!(
            res.display_formula
                .starts_with("1 \\cdot \\frac{(x - 0)(x - 1)}{(-1 - 0)(-1 - 1)}")
        );
        let res =
            Interpolator::interpolate(InterpolationMethod::NewtonFinite, &data, 0.5, None).unwrap();
        assert!(res.display_formula.ends_with("t = \\frac{(x + 1)}{1}"));
    }
}
