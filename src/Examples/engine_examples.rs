// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]

use crate::Utils::engine_config::EngineConfig;
use crate::Utils::trace_table::series_table;
use crate::numerical::Nonlinear_equation::RootStart;
use crate::numerical::engine::ComputeEngine;
use crate::numerical::errors::EngineError;
use crate::numerical::functions_registry::{FunctionSpec, Integrand, ScalarEquation};
use crate::numerical::response::Response;

pub fn engine_examples(example: usize) -> Result<(), EngineError> {
    let engine = ComputeEngine::new(EngineConfig::default())?;
    match example {
        0 => {
            // 1.62x^3 - 8.15x^2 + 4.39x + 4.29 = 0 on [1, 2] by all four root finders
            println!("equation: {}", ScalarEquation::Cubic.display());
            for method_id in 0..4 {
                let res = engine.solve_equation(method_id, 0, RootStart::Bracket(1.0, 2.0), 1e-6)?;
                println!(
                    "method {}: root = {}, f(root) = {:?}, iterations = {}",
                    method_id, res.value, res.function_value, res.iterations
                );
                println!("{}", res.table());
            }
        }
        1 => {
            // x^2 + y^2 = 4, y = 3x^2
            let res = engine.solve_system(0, (1.0, 1.0), 1e-8)?;
            println!("x = {}, y = {}, |F| = {}", res.x, res.y, res.residual_norm);
            println!("{}", res.table());
        }
        2 => {
            // every quadrature rule on the same integral
            let integrand = Integrand::Polynomial;
            for method_id in 0..5 {
                let res = engine.integrate(method_id, integrand.id(), 1.0, 3.0, 1e-4)?;
                println!(
                    "rule {}: I = {} (exact {:?}), subintervals = {}, warnings = {:?}",
                    method_id, res.value, res.exact_value, res.iterations, res.warnings
                );
            }
            // improper integral of 1/sqrt(x) over [0, 1]
            let res = engine.integrate(2, 5, 0.0, 1.0, 1e-4)?;
            println!("int_0^1 1/sqrt(x) dx = {}", res.value);
        }
        3 => {
            let x = vec![1.1, 2.3, 3.7, 4.5, 5.4, 6.8, 7.5];
            let y = vec![2.73, 5.12, 7.74, 8.91, 10.59, 12.75, 13.43];
            let report = engine.approximate(x, y)?;
            for fit in &report.candidates {
                println!(
                    "{:?}: {}, S = {}, r = {:?}",
                    fit.model, fit.display_formula, fit.standard_deviation, fit.pearson_correlation
                );
            }
            println!("best: {}", report.best.display_formula);
        }
        4 => {
            let x = vec![0.1, 0.2, 0.3, 0.4, 0.5];
            let y = vec![1.25, 2.38, 3.79, 5.44, 7.14];
            for method_id in 0..3 {
                let res = engine.interpolate(method_id, x.clone(), y.clone(), 0.35, None)?;
                println!("P(0.35) = {}, {}", res.interpolated_value, res.display_formula);
            }
            // sin on [0, pi] sampled at 6 nodes
            let res = engine.interpolate_function(1, 0, 0.0, std::f64::consts::PI, 6, 1.0)?;
            println!("sin(1) ~ {}", res.interpolated_value);
        }
        5 => {
            // y' = x^2 - 2y, y(0) = 1 on [0, 1]
            let solution = engine.solve_ode(0, 1.0, 0.0, 1.0, 0.1, 1e-6)?;
            println!("exact: {:?}", solution.exact_display);
            let exact = solution.exact_points.clone().unwrap_or_default();
            println!(
                "{}",
                series_table(
                    "x",
                    &[
                        ("Euler", solution.euler.points.as_slice()),
                        ("ExtendedEuler", solution.extended_euler.points.as_slice()),
                        ("Milne", solution.milne.points.as_slice()),
                        ("exact", exact.as_slice()),
                    ]
                )
            );
            let response = Response::ok(solution);
            match response.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => println!("serialization failed: {}", e),
            }
        }
        6 => {
            // rows given out of order; they are swapped back to diagonal dominance
            let document = "3\n2 2 10 14\n10 1 1 12\n2 10 1 13\n0,0001";
            let res = engine.solve_linear_text(document)?;
            println!("{}", res.matrix_table());
            println!("C = {:?}", res.c_matrix);
            println!("{}", res.table());
            println!(
                "x = {:?}, errors = {:?}, iterations = {}",
                res.solution, res.errors, res.iterations
            );
        }
        _ => {
            println!("example {} does not exist", example);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_examples_run() {
        for example in 0..7 {
            engine_examples(example).unwrap();
        }
    }
}
