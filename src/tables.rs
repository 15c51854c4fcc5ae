use thiserror::Error;

use crate::parse::Unit;

/// Display names of the accelerator columns found in published reports.
const NEAT_NAMES: &[(&str, &str)] = &[
  ("python", "Python"),
  ("numba", "Numba"),
  ("pythran_gnu", "Pythran (g++)"),
  ("pythran_intel", "Pythran (icx)"),
  ("pyccel_fortran_gnu", "Pyccel (Fortran, gfortran)"),
  ("pyccel_c_gnu", "Pyccel (C, gcc)"),
  ("pyccel_fortran_intel", "Pyccel (Fortran, ifort)"),
  ("pyccel_c_intel", "Pyccel (C, icc)"),
];

const PLUS_MINUS: [&str; 2] = ["$\\pm$", "±"];

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
  #[error("row {0:?} has no cells")]
  EmptyRow(String),
  #[error("invalid number {0:?}")]
  InvalidNumber(String),
  #[error("{0:?} does not end with a parenthesized unit")]
  MissingUnit(String),
  #[error("unknown unit in {0:?}")]
  UnknownUnit(String),
}

/// A markdown table split into trimmed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownTable {
  pub header: Vec<String>,
  pub body: Vec<Vec<String>>,
}

/// One row of a result table, as numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub test: String,
  /// One value per column, NaN where the cell was `-`.
  pub values: Vec<f64>,
  /// Error term of each value, NaN where the cell had none.
  pub errors: Vec<f64>,
  /// Seconds per unit of `values` and `errors`.
  pub factor: f64,
}

impl Entry {
  /// Value of column `index` in seconds.
  pub fn seconds(&self, index: usize) -> f64 {
    self.values.get(index).map_or(f64::NAN, |value| value * self.factor)
  }

  /// Error term of column `index` in seconds.
  pub fn error_seconds(&self, index: usize) -> f64 {
    self.errors.get(index).map_or(f64::NAN, |error| error * self.factor)
  }
}

fn neaten(name: &str) -> String {
  NEAT_NAMES
    .iter()
    .find(|(raw, _)| *raw == name)
    .map_or(name, |(_, neat)| *neat)
    .to_string()
}

/// Splits a table line on `|`, dropping the empty cells produced by outer
/// pipes.
fn split_row(line: &str) -> Vec<String> {
  let line = line.trim();
  let line = line.strip_prefix('|').unwrap_or(line);
  let line = line.strip_suffix('|').unwrap_or(line);

  line.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Unpacks the lines of one table: the first is the header, the second the
/// divider, the rest the body.
pub fn unpack_table<S: AsRef<str>>(lines: &[S]) -> MarkdownTable {
  let header = lines
    .first()
    .map(|line| split_row(line.as_ref()).iter().map(|name| neaten(name)).collect())
    .unwrap_or_default();
  let body = lines.iter().skip(2).map(|line| split_row(line.as_ref())).collect();

  MarkdownTable { header, body }
}

/// Collects every table of a markdown document. A table is a maximal run of
/// consecutive lines containing `|`.
pub fn collect_tables(text: &str) -> Vec<MarkdownTable> {
  let mut tables = Vec::new();
  let mut current: Vec<&str> = Vec::new();

  for line in text.lines() {
    if line.contains('|') {
      current.push(line);
    } else if !current.is_empty() {
      tables.push(unpack_table(&current));
      current.clear();
    }
  }

  if !current.is_empty() {
    tables.push(unpack_table(&current));
  }

  tables
}

fn number(cell: &str) -> Result<f64, TableError> {
  let cell = cell.trim();
  if cell == "-" {
    return Ok(f64::NAN);
  }

  cell.parse().map_err(|_| TableError::InvalidNumber(cell.to_string()))
}

fn split_row_name(row: &[String]) -> Result<(&str, &[String]), TableError> {
  row
    .split_first()
    .map(|(name, cells)| (name.as_str(), cells))
    .ok_or_else(|| TableError::EmptyRow(row.join("|")))
}

/// Entries of a compilation table. Cells are seconds or `-`.
pub fn compilation_entries(body: &[Vec<String>]) -> Result<Vec<Entry>, TableError> {
  body
    .iter()
    .map(|row| {
      let (name, cells) = split_row_name(row)?;
      let values = cells.iter().map(|cell| number(cell)).collect::<Result<Vec<_>, _>>()?;

      Ok(Entry {
        test: name.to_string(),
        errors: vec![f64::NAN; values.len()],
        values,
        factor: 1.0,
      })
    })
    .collect()
}

/// Splits `Name (unit)` into the name and seconds per unit.
fn name_and_factor(label: &str) -> Result<(String, f64), TableError> {
  let missing = || TableError::MissingUnit(label.to_string());

  let (name, rest) = label.split_once('(').ok_or_else(missing)?;
  let (unit, _) = rest.split_once(')').ok_or_else(missing)?;
  let unit: Unit = unit
    .trim()
    .parse()
    .map_err(|_| TableError::UnknownUnit(label.to_string()))?;

  Ok((name.trim().to_string(), unit.factor()))
}

/// Splits `value $\pm$ error` into its two numbers.
fn value_and_error(cell: &str) -> Result<(f64, f64), TableError> {
  for separator in PLUS_MINUS {
    if let Some((value, error)) = cell.split_once(separator) {
      return Ok((number(value)?, number(error)?));
    }
  }

  Ok((number(cell)?, f64::NAN))
}

/// Entries of an execution table. The first cell is `Name (unit)`, the others
/// are values in that unit, optionally followed by an error term.
pub fn execution_entries(body: &[Vec<String>]) -> Result<Vec<Entry>, TableError> {
  body
    .iter()
    .map(|row| {
      let (label, cells) = split_row_name(row)?;
      let (test, factor) = name_and_factor(label)?;
      let (values, errors): (Vec<f64>, Vec<f64>) = cells
        .iter()
        .map(|cell| value_and_error(cell))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

      Ok(Entry {
        test,
        values,
        errors,
        factor,
      })
    })
    .collect()
}
