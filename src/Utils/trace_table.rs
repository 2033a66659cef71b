use crate::numerical::solve_result::IterationStep;
use tabled::{builder::Builder, settings::Style};

/// render a solver trace as a table; the header is taken from the first step
pub fn steps_table(steps: &[IterationStep]) -> String {
    let Some(first) = steps.first() else {
        return String::from("(empty trace)");
    };
    let mut builder = Builder::default();
    builder.push_record(first.headers().into_iter().map(String::from));
    for step in steps {
        builder.push_record(step.row());
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

/// render (x, y) series side by side, one column per named series
pub fn series_table(x_name: &str, series: &[(&str, &[(f64, f64)])]) -> String {
    let mut builder = Builder::default();
    let mut header = vec![x_name.to_string()];
    header.extend(series.iter().map(|(name, _)| name.to_string()));
    builder.push_record(header);
    let rows = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    for i in 0..rows {
        let x = series
            .iter()
            .find_map(|(_, s)| s.get(i).map(|p| p.0))
            .unwrap_or(f64::NAN);
        let mut row = vec![format!("{:.6}", x)];
        for (_, s) in series {
            row.push(
                s.get(i)
                    .map(|p| format!("{:.8}", p.1))
                    .unwrap_or_default(),
            );
        }
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

/// coefficient rows, optionally followed by a `b` column
pub fn matrix_table(rows: &[Vec<f64>], rhs: Option<&[f64]>) -> String {
    let mut builder = Builder::default();
    for (i, row) in rows.iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
        if let Some(b) = rhs.and_then(|rhs| rhs.get(i)) {
            record.push(format!("| {}", b));
        }
        builder.push_record(record);
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}
