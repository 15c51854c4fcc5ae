use std::{io::Write, path::Path, time::Duration};

use anyhow::{Context, Result};

use crate::{
  cases::TestCase,
  config::Case,
  ext::{CommandExt, StatusExt},
  invocation::Invocation,
  parse::{self, Timing},
  stats::RunResult,
  toolchain::Toolchain,
};

/// What to measure, and how.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
  /// Time the compilation step.
  pub compilation: bool,
  /// Time the execution step.
  pub execution: bool,
  /// Use `pyperf` instead of `timeit`.
  pub precise: bool,
  /// Kill external tools running longer than this.
  pub timeout: Option<Duration>,
  /// Log commands and their full output.
  pub verbose: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      compilation: true,
      execution: true,
      precise: false,
      timeout: None,
      verbose: false,
    }
  }
}

/// The import statement and test specific setup run before the timed call.
pub fn setup_code(test: &TestCase, case: &Case) -> String {
  let module = match case {
    Case::Numba => test.numba_module(),
    _ => test.module().to_string(),
  };

  format!(
    "from {module} import {};{}",
    test.imports.join(", "),
    test.setup.replace('\n', "")
  )
}

/// Measures single cells. Every failure of an external tool ends up in the
/// returned [`RunResult`]; only writing to the log can fail the call itself.
pub struct Runner<'a> {
  pub settings: &'a Settings,
  pub toolchain: &'a Toolchain,
  pub log: &'a mut dyn Write,
}

impl Runner<'_> {
  /// Runs `test` under `case` inside the staging directory `dir`.
  pub fn run(&mut self, test: &TestCase, case: &Case, dir: &Path) -> Result<RunResult> {
    writeln!(self.log, "-------------------")?;
    writeln!(self.log, "    {}", case.name())?;
    writeln!(self.log, "-------------------")?;

    let toolchain = self.toolchain;
    let setup = setup_code(test, case);
    let interpreter = match case {
      Case::Pypy => toolchain.pypy(),
      _ => Ok(toolchain.python.as_path()),
    };

    let compilation = match case {
      Case::Pyccel { config, language } => toolchain.pyccel().and_then(|pyccel| {
        self.compile(
          &Invocation::Pyccel {
            pyccel,
            config,
            language,
            source: test.basename,
          },
          dir,
        )
      }),
      Case::Pythran { config } => toolchain.pythran().and_then(|pythran| {
        self.compile(
          &Invocation::Pythran {
            pythran,
            config,
            source: test.basename,
          },
          dir,
        )
      }),
      Case::Numba if self.settings.compilation => {
        let interpreter = toolchain.python.as_path();
        self.probe_compilation(interpreter, &setup, test.call, dir).map(Some)
      }
      _ => Ok(None),
    };

    let mut result = RunResult::default();

    match compilation {
      Err(error) => {
        writeln!(self.log, "Compilation Error!")?;
        writeln!(self.log, "{error:#}")?;
        result = RunResult::failed(&error);
      }
      Ok(seconds) => {
        result.compilation = seconds;

        if self.settings.execution {
          match interpreter.and_then(|interpreter| self.execute(interpreter, &setup, test.call, dir)) {
            Ok(timing) => result.execution = Some(timing),
            Err(error) => {
              writeln!(self.log, "Execution Error!")?;
              writeln!(self.log, "{error:#}")?;
              result.record_error(&error);
            }
          }
        }
      }
    }

    if case.builds_artifacts() {
      self.clean(dir);
    }

    Ok(result)
  }

  /// Compiles ahead of time, returning the CPU seconds spent when
  /// compilation is being timed.
  fn compile(&mut self, invocation: &Invocation, dir: &Path) -> Result<Option<f64>> {
    if self.settings.verbose {
      writeln!(self.log, "{invocation}")?;
    }

    let mut command = invocation.command(dir);
    let (captured, seconds) = if self.settings.compilation {
      let (captured, seconds) = command.capture_cpu_time(self.settings.timeout)?;
      (captured, Some(seconds))
    } else {
      (command.capture(self.settings.timeout)?, None)
    };

    if !captured.status.success() || self.settings.verbose {
      writeln!(self.log, "{}", captured.stdout)?;
      writeln!(self.log, "{}", captured.stderr)?;
    }

    captured
      .status
      .check_success()
      .with_context(|| invocation.to_string())?;

    if let Some(seconds) = seconds {
      writeln!(self.log, "Compilation CPU time : {seconds}")?;
    }

    Ok(seconds)
  }

  /// Numba compiles on the first call, so its compilation time is measured
  /// from inside the interpreter.
  fn probe_compilation(&mut self, interpreter: &Path, setup: &str, call: &str, dir: &Path) -> Result<f64> {
    let invocation = Invocation::CompileProbe {
      interpreter,
      setup,
      call,
    };

    if self.settings.verbose {
      writeln!(self.log, "{invocation}")?;
    }

    let stdout = invocation
      .command(dir)
      .capture(self.settings.timeout)?
      .into_stdout()
      .with_context(|| invocation.to_string())?;
    let seconds = parse::parse_seconds(&stdout).context("parse compilation time")?;

    writeln!(self.log, "Compilation Process time : {seconds}")?;

    Ok(seconds)
  }

  fn execute(&mut self, interpreter: &Path, setup: &str, call: &str, dir: &Path) -> Result<Timing> {
    let invocation = Invocation::Timeit {
      interpreter,
      precise: self.settings.precise,
      setup,
      call,
    };

    if self.settings.verbose {
      writeln!(self.log, "{invocation}")?;
    }

    let stdout = invocation
      .command(dir)
      .capture(self.settings.timeout)?
      .into_stdout()
      .with_context(|| invocation.to_string())?;

    if self.settings.verbose {
      writeln!(self.log, "{stdout}")?;
    }

    let timing = if self.settings.precise {
      parse::parse_pyperf(&stdout)
    } else {
      parse::parse_timeit(&stdout)
    };

    timing.context("parse timing")
  }

  /// Removes build artifacts. Failures are ignored.
  fn clean(&mut self, dir: &Path) {
    let Ok(pyccel_clean) = self.toolchain.pyccel_clean() else {
      return;
    };

    let _ = Invocation::Clean { pyccel_clean }
      .command(dir)
      .capture(self.settings.timeout);
  }
}
