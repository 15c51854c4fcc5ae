use std::{fmt::Write, fs, path::Path};

use anyhow::{Context, Result};

use crate::tables::{self, Entry, MarkdownTable};

const COLUMN_PADDING: &str = "  ";

/// Per-test values of every accelerator, i.e. every column after the
/// interpreter baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
  pub title: String,
  pub columns: Vec<String>,
  /// `(test, one value per column)`.
  pub rows: Vec<(String, Vec<f64>)>,
  /// Uncertainty of each value in `rows`, NaN where unknown.
  pub errors: Vec<Vec<f64>>,
}

/// What a result file says about the accelerators.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
  /// Compilation CPU seconds.
  pub compilation: Series,
  /// Baseline execution time divided by the accelerator's.
  pub speedup: Series,
}

/// Column names after `Algorithm` and the baseline.
fn accelerators(table: &MarkdownTable) -> Vec<String> {
  table.header.iter().skip(2).cloned().collect()
}

/// Fails unless every body row has one cell per header column.
fn check_width(table: &MarkdownTable) -> Result<()> {
  for row in &table.body {
    if row.len() != table.header.len() {
      anyhow::bail!(
        "row {:?} has {} cell(s) but the header has {}",
        row.first().map(String::as_str).unwrap_or_default(),
        row.len(),
        table.header.len()
      );
    }
  }

  Ok(())
}

fn compilation_series(table: &MarkdownTable, entries: &[Entry]) -> Series {
  Series {
    title: "compilation time [s]".to_string(),
    columns: accelerators(table),
    rows: entries
      .iter()
      .map(|entry| (entry.test.clone(), (1..entry.values.len()).map(|i| entry.seconds(i)).collect()))
      .collect(),
    errors: entries
      .iter()
      .map(|entry| (1..entry.errors.len()).map(|i| entry.error_seconds(i)).collect())
      .collect(),
  }
}

/// `baseline / time`, with the relative errors of both terms added in
/// quadrature.
fn speedup(baseline: f64, baseline_error: f64, time: f64, time_error: f64) -> (f64, f64) {
  let speedup = baseline / time;
  let relative = (baseline_error / baseline).hypot(time_error / time);

  (speedup, speedup * relative)
}

fn speedup_series(table: &MarkdownTable, entries: &[Entry]) -> Series {
  let (rows, errors): (Vec<(String, Vec<f64>)>, Vec<Vec<f64>>) = entries
    .iter()
    .map(|entry| {
      let (speedups, errors): (Vec<f64>, Vec<f64>) = (1..entry.values.len())
        .map(|i| speedup(entry.seconds(0), entry.error_seconds(0), entry.seconds(i), entry.error_seconds(i)))
        .unzip();

      ((entry.test.clone(), speedups), errors)
    })
    .unzip();

  Series {
    title: "speedup".to_string(),
    columns: accelerators(table),
    rows,
    errors,
  }
}

/// Reads the compilation table (first) and execution table (second) of a
/// markdown result file.
pub fn analyze(text: &str) -> Result<Report> {
  let tables = tables::collect_tables(text);
  let [compilation, execution, ..] = tables.as_slice() else {
    anyhow::bail!("expected a compilation and an execution table, found {} table(s)", tables.len());
  };

  check_width(compilation).context("compilation table")?;
  check_width(execution).context("execution table")?;

  let compilation_entries = tables::compilation_entries(&compilation.body).context("compilation table")?;
  let execution_entries = tables::execution_entries(&execution.body).context("execution table")?;

  Ok(Report {
    compilation: compilation_series(compilation, &compilation_entries),
    speedup: speedup_series(execution, &execution_entries),
  })
}

fn format_series(out: &mut String, series: &Series) -> Result<()> {
  let width = series
    .rows
    .iter()
    .map(|(test, _)| test.len())
    .chain(series.columns.iter().map(String::len))
    .chain(std::iter::once("test".len()))
    .max()
    .unwrap_or_default();

  writeln!(out, "{}", series.title)?;
  writeln!(out, "{}", "=".repeat(series.title.len()))?;
  writeln!(out)?;

  let header = std::iter::once("test")
    .chain(series.columns.iter().map(String::as_str))
    .map(|col| format!("{col:<width$}"))
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING);
  writeln!(out, "{header}")?;
  writeln!(out, "{}", "-".repeat(header.len()))?;

  for ((test, values), errors) in series.rows.iter().zip(&series.errors) {
    let row = std::iter::once(format!("{test:<width$}"))
      .chain(values.iter().zip(errors).map(|(value, error)| {
        let cell = match (value.is_finite(), error.is_finite()) {
          (true, true) => format!("{value:.2} ± {error:.2}"),
          (true, false) => format!("{value:.2}"),
          (false, _) => "-".to_string(),
        };

        format!("{cell:>width$}")
      }))
      .collect::<Vec<_>>()
      .join(COLUMN_PADDING);

    writeln!(out, "{row}")?;
  }

  Ok(())
}

pub fn format(report: &Report) -> Result<String> {
  let mut out = String::new();

  format_series(&mut out, &report.compilation)?;
  writeln!(out)?;
  format_series(&mut out, &report.speedup)?;

  Ok(out)
}

/// Analyzes and formats the result file at `path`.
pub fn report(path: &Path) -> Result<String> {
  let text = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
  let report = analyze(&text).context("analyze")?;

  format(&report)
}
