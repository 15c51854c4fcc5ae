use clap::ValueEnum;

use crate::{
  parse::{Timing, Unit},
  stats::RunResult,
};

const COLUMN_WIDTH: usize = 25;
const MISSING: &str = "-";

/// Output format of the result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
  #[default]
  Markdown,
  Latex,
}

impl Format {
  fn cell_separator(self) -> &'static str {
    match self {
      Format::Markdown => " | ",
      Format::Latex => " & ",
    }
  }

  fn row_separator(self) -> &'static str {
    match self {
      Format::Markdown => "\n",
      Format::Latex => "\\\\\n\\hline\n",
    }
  }

  pub fn heading(self, title: &str) -> String {
    match self {
      Format::Markdown => format!("## {title}"),
      Format::Latex => format!("\\textbf{{{title}}}"),
    }
  }

  /// Joins padded cells into a single row.
  pub fn row<S: AsRef<str>>(self, cells: &[S]) -> String {
    cells
      .iter()
      .map(|cell| format!("{:<COLUMN_WIDTH$}", cell.as_ref()))
      .collect::<Vec<_>>()
      .join(self.cell_separator())
  }
}

/// A result table, built row by row and rendered once at the end.
#[derive(Debug, Clone)]
pub struct Table {
  format: Format,
  rows: Vec<String>,
}

impl Table {
  /// Starts a table whose header is `Algorithm` followed by `columns`.
  pub fn new<S: AsRef<str>>(format: Format, columns: &[S]) -> Self {
    let header: Vec<&str> = std::iter::once("Algorithm")
      .chain(columns.iter().map(|column| column.as_ref()))
      .collect();

    let mut rows = vec![format.row(&header)];

    if format == Format::Markdown {
      let divider = vec!["-".repeat(COLUMN_WIDTH); header.len()];
      rows.push(format.row(&divider));
    }

    Self { format, rows }
  }

  pub fn push(&mut self, cells: &[String]) -> &str {
    self.rows.push(self.format.row(cells));
    &self.rows[self.rows.len() - 1]
  }

  pub fn render(&self) -> String {
    self.rows.join(self.format.row_separator())
  }
}

/// Compilation row: the test name, then CPU seconds per case.
pub fn compilation_cells(name: &str, results: &[RunResult]) -> Vec<String> {
  std::iter::once(name.to_string())
    .chain(results.iter().map(|result| match result.compilation {
      Some(seconds) => format!("{seconds:.2}"),
      None => MISSING.to_string(),
    }))
    .collect()
}

/// Picks the unit a row of timings is displayed in: the mean of the unit
/// indices, rounded half to even. Seconds if nothing was measured.
pub fn display_unit<'a, I: IntoIterator<Item = &'a Timing>>(timings: I) -> Unit {
  let (sum, count) = timings
    .into_iter()
    .fold((0, 0), |(sum, count), timing| (sum + timing.unit.index(), count + 1));

  if count == 0 {
    return Unit::Sec;
  }

  let mean = sum as f64 / count as f64;

  Unit::from_index(mean.round_ties_even() as usize).unwrap_or(Unit::Ns)
}

/// Rescales every timing of a row to their common display unit.
pub fn harmonize(timings: &[Option<Timing>]) -> (Unit, Vec<Option<Timing>>) {
  let unit = display_unit(timings.iter().flatten());
  let rescaled = timings.iter().map(|timing| timing.map(|t| t.rescale(unit))).collect();

  (unit, rescaled)
}

/// Execution row: `<name> (<unit>)`, then one time per case in that unit.
pub fn execution_cells(name: &str, results: &[RunResult]) -> Vec<String> {
  let timings: Vec<_> = results.iter().map(|result| result.execution).collect();
  let (unit, timings) = harmonize(&timings);

  std::iter::once(format!("{name} ({unit})"))
    .chain(timings.into_iter().map(|timing| match timing {
      Some(Timing {
        value,
        stddev: Some(stddev),
        ..
      }) => format!("{value:.2} $\\pm$ {stddev:.2}"),
      Some(Timing { value, .. }) => format!("{value:.2}"),
      None => MISSING.to_string(),
    }))
    .collect()
}
