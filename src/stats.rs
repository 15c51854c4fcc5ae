use crate::parse::Timing;

/// Outcome of one (test, case) cell. A `None` measurement means the step
/// failed or was skipped, and renders as `-`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
  /// CPU seconds spent compiling.
  pub compilation: Option<f64>,
  pub execution: Option<Timing>,
  /// First failure of the cell, with its context chain.
  pub error: Option<String>,
}

impl RunResult {
  pub fn failed(error: &anyhow::Error) -> Self {
    Self {
      error: Some(format!("{error:#}")),
      ..Self::default()
    }
  }

  /// Records a failure without discarding what was already measured.
  pub fn record_error(&mut self, error: &anyhow::Error) {
    if self.error.is_none() {
      self.error = Some(format!("{error:#}"));
    }
  }
}

/// Results of every case for a single test, in case declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResults {
  pub name: String,
  pub cells: Vec<RunResult>,
}

impl TestResults {
  pub fn failures(&self) -> usize {
    self.cells.iter().filter(|cell| cell.error.is_some()).count()
  }
}
