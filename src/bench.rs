use std::{
  fmt::Write as _,
  fs::{self, File},
  io::{self, LineWriter, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
  cases::TestCase,
  config::Case,
  format::{self, Format, Table},
  run::{Runner, Settings},
  stats::TestResults,
  toolchain::Toolchain,
};

const BANNER: &str = "===========================================";

/// Opens the run log: stdout in verbose mode, `path` otherwise.
pub fn open_log(verbose: bool, path: &Path) -> Result<Box<dyn Write>> {
  if verbose {
    return Ok(Box::new(io::stdout()));
  }

  let file = File::create(path).with_context(|| format!("create {path:?}"))?;

  Ok(Box::new(LineWriter::new(file)))
}

pub struct Bench {
  settings: Settings,
  format: Format,
  cases: Vec<Case>,
  toolchain: Toolchain,
  /// Directory holding the kernel sources.
  code_dir: PathBuf,
  /// Parent of the per-test staging directories.
  work_dir: PathBuf,
  log: Box<dyn Write>,
  compilation: Table,
  execution: Table,
  /// Results collected for each test, in run order.
  pub results: Vec<TestResults>,
}

impl Bench {
  pub fn new(
    settings: Settings,
    format: Format,
    cases: Vec<Case>,
    toolchain: Toolchain,
    code_dir: PathBuf,
    work_dir: PathBuf,
    log: Box<dyn Write>,
  ) -> Self {
    let names: Vec<String> = cases.iter().map(Case::name).collect();

    Self {
      settings,
      format,
      compilation: Table::new(format, &names),
      execution: Table::new(format, &names),
      cases,
      toolchain,
      code_dir,
      work_dir,
      log,
      results: Vec::new(),
    }
  }

  /// Runs every case on every test, one after the other.
  pub fn bench(&mut self, tests: &[TestCase]) -> Result<()> {
    for test in tests {
      eprintln!("benchmarking {:?}", test.name);
      self.bench_test(test).with_context(|| format!("bench {:?}", test.name))?;
    }

    self.log.flush().context("flush log")?;

    Ok(())
  }

  fn bench_test(&mut self, test: &TestCase) -> Result<()> {
    writeln!(self.log, "{BANNER}")?;
    writeln!(self.log, "    {}", test.name)?;
    writeln!(self.log, "{BANNER}")?;

    let dir = self.stage(test).context("stage")?;

    let mut runner = Runner {
      settings: &self.settings,
      toolchain: &self.toolchain,
      log: &mut *self.log,
    };

    let mut cells = Vec::with_capacity(self.cases.len());
    for case in &self.cases {
      eprintln!("  running {:?}", case.name());

      let result = runner.run(test, case, &dir)?;
      if let Some(error) = &result.error {
        eprintln!("    failed: {error}");
      }

      cells.push(result);
    }

    if self.settings.compilation {
      let row = self.compilation.push(&format::compilation_cells(test.name, &cells));
      if self.settings.verbose {
        writeln!(self.log, "{row}")?;
      }
    }

    if self.settings.execution {
      let row = self.execution.push(&format::execution_cells(test.name, &cells));
      if self.settings.verbose {
        writeln!(self.log, "{row}")?;
      }
    }

    self.results.push(TestResults {
      name: test.name.to_string(),
      cells,
    });

    Ok(())
  }

  /// Copies the kernel and its Numba variant into `<work dir>/<symbol>`. The
  /// directory is reused if it already exists.
  fn stage(&self, test: &TestCase) -> Result<PathBuf> {
    let dir = self.work_dir.join(test.staging_name());
    fs::create_dir_all(&dir).with_context(|| format!("create_dir {dir:?}"))?;

    for basename in [test.basename.to_string(), test.numba_basename()] {
      let source = self.code_dir.join(&basename);
      fs::copy(&source, dir.join(&basename)).with_context(|| format!("copy {source:?}"))?;
    }

    Ok(dir)
  }

  /// Renders the enabled tables, each under its own heading.
  pub fn render(&self) -> Result<String> {
    let mut out = String::new();

    if self.settings.compilation {
      writeln!(out, "{}", self.format.heading("Compilation time"))?;
      writeln!(out, "{}", self.compilation.render())?;
    }

    writeln!(out)?;

    if self.settings.execution {
      writeln!(out, "{}", self.format.heading("Execution time"))?;
      writeln!(out, "{}", self.execution.render())?;
    }

    Ok(out)
  }

  pub fn write_results(&self, path: &Path) -> Result<()> {
    fs::write(path, self.render().context("render")?).with_context(|| format!("write {path:?}"))
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::run::tests::{toolchain, TIMEIT};

  const TESTS: &[TestCase] = &[
    TestCase {
      name: "Ackermann",
      basename: "ackermann_mod.py",
      imports: &["ackermann"],
      setup: "",
      call: "a = ackermann(3,8)",
    },
    TestCase {
      name: "Euler",
      basename: "euler_mod.py",
      imports: &["euler_humps_test"],
      setup: "",
      call: "err = euler_humps_test(0., 2000., 1000000)",
    },
  ];

  struct Fixture {
    _bin: TempDir,
    root: TempDir,
    bench: Bench,
  }

  /// A bench over [`TESTS`] with python, numba and one pyccel case. The
  /// stand-in compiler fails for the Euler kernel only.
  fn fixture(settings: Settings, format: Format) -> Fixture {
    let bin = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let code_dir = root.path().join("code");
    fs::create_dir(&code_dir).unwrap();
    for test in TESTS {
      fs::write(code_dir.join(test.basename), "").unwrap();
      fs::write(code_dir.join(test.numba_basename()), "").unwrap();
    }

    let python = format!("if [ \"$1\" = \"-c\" ]; then echo 1.5; else {TIMEIT}; fi");
    let compiler = "case \"$4\" in euler*) exit 1;; esac";
    let toolchain = toolchain(bin.path(), &python, compiler, "exit 1");

    let cases = vec![
      Case::Python,
      Case::Numba,
      Case::Pyccel {
        config: bin.path().join("pyccel_gnu.json"),
        language: "c".to_string(),
      },
    ];

    let bench = Bench::new(
      settings,
      format,
      cases,
      toolchain,
      code_dir,
      root.path().join("tmp"),
      Box::new(io::sink()),
    );

    Fixture {
      _bin: bin,
      root,
      bench,
    }
  }

  fn cells(line: &str) -> Vec<&str> {
    line.split(" | ").map(str::trim).collect()
  }

  #[test]
  fn one_aligned_row_per_test() {
    let mut fixture = fixture(Settings::default(), Format::Markdown);
    fixture.bench.bench(TESTS).unwrap();

    let rendered = fixture.bench.render().unwrap();
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "## Compilation time");
    assert_eq!(cells(lines[1]), ["Algorithm", "python", "numba", "pyccel_gnu_c"]);
    assert_eq!(cells(lines[3])[..3], ["Ackermann", "-", "1.50"]);
    assert_eq!(cells(lines[4]), ["Euler", "-", "1.50", "-"]);
    assert_eq!(lines[5], "");
    assert_eq!(lines[6], "## Execution time");
    assert_eq!(cells(lines[9]), ["Ackermann (\\textmu s)", "12.50", "12.50", "12.50"]);
    assert_eq!(cells(lines[10]), ["Euler (\\textmu s)", "12.50", "12.50", "-"]);
    assert_eq!(lines.len(), 11);

    let euler = &fixture.bench.results[1];
    assert_eq!(euler.cells.len(), 3);
    assert!(euler.cells[2].error.is_some());
  }

  #[test]
  fn staging_directories_are_reused() {
    let mut fixture = fixture(Settings::default(), Format::Markdown);
    let tmp = fixture.root.path().join("tmp");

    fixture.bench.bench(TESTS).unwrap();
    fixture.bench.bench(&TESTS[..1]).unwrap();

    let staged = tmp.join("ackermann");
    assert!(staged.join("ackermann_mod.py").exists());
    assert!(staged.join("numba_ackermann_mod.py").exists());
    assert!(staged.join("cleaned").exists());
    assert!(tmp.join("euler_humps_test").join("euler_mod.py").exists());
  }

  #[test]
  fn missing_source_is_fatal() {
    let mut fixture = fixture(Settings::default(), Format::Markdown);
    let missing = TestCase {
      name: "Splines",
      basename: "splines.py",
      imports: &["Spline"],
      setup: "",
      call: "s.eval(x, y)",
    };

    assert!(fixture.bench.bench(&[missing]).is_err());
  }

  #[test]
  fn execution_only_latex() {
    let settings = Settings {
      compilation: false,
      ..Settings::default()
    };
    let mut fixture = fixture(settings, Format::Latex);
    fixture.bench.bench(TESTS).unwrap();

    let rendered = fixture.bench.render().unwrap();

    assert!(rendered.starts_with("\n\\textbf{Execution time}\n"));
    assert!(!rendered.contains("Compilation time"));
    assert_eq!(rendered.matches("\\\\\n\\hline\n").count(), TESTS.len());

    let path = fixture.root.path().join("bench.out");
    fixture.bench.write_results(&path).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), rendered);
  }
}
