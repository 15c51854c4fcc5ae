mod bench;
mod cases;
mod config;
mod ext;
mod format;
mod invocation;
mod parse;
mod report;
mod run;
mod stats;
mod tables;
mod toolchain;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use self::{
  bench::Bench,
  config::CaseOptions,
  format::Format,
  run::Settings,
  toolchain::Toolchain,
};

/// Compares Python, PyPy, Pythran, Numba and Pyccel on a suite of numerical
/// kernels.
#[derive(Parser)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Runs the benchmark suite and writes the result tables.
  Bench {
    /// Time with pyperf (more accurate but much slower).
    #[arg(long)]
    pyperf: bool,
    /// Don't time the compilation step.
    #[arg(long)]
    no_compilation: bool,
    /// Don't time the execution step.
    #[arg(long)]
    no_execution: bool,
    /// Also run the test cases with pypy.
    #[arg(long)]
    pypy: bool,
    /// Don't run the numba tests.
    #[arg(long)]
    no_numba: bool,
    /// Configuration files for pythran, one case each.
    #[arg(long, num_args = 0.., value_name = "FILE")]
    pythran_config_files: Vec<PathBuf>,
    /// Compiler configuration files for pyccel, one case per language.
    #[arg(long, num_args = 0.., value_name = "FILE")]
    pyccel_config_files: Vec<PathBuf>,
    /// Format of the output tables.
    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    output: Format,
    /// Log commands and their output to stdout instead of the log file.
    #[arg(long)]
    verbose: bool,
    /// Directory containing the kernel sources.
    #[arg(long, default_value = "./tests")]
    code_dir: PathBuf,
    /// Kill external tools running longer than this many seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
    #[arg(long, default_value = "bench.log")]
    log_file: PathBuf,
    #[arg(long, default_value = "bench.out")]
    result_file: PathBuf,
  },
  /// Prints compilation times and speedups from markdown result files.
  Report {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
}

fn main() -> Result<()> {
  match Args::parse().command {
    Command::Bench {
      pyperf,
      no_compilation,
      no_execution,
      pypy,
      no_numba,
      pythran_config_files,
      pyccel_config_files,
      output,
      verbose,
      code_dir,
      timeout,
      log_file,
      result_file,
    } => {
      if !code_dir.is_dir() {
        anyhow::bail!("{code_dir:?} does not exist");
      }

      let cases = config::cases(&CaseOptions {
        pypy,
        numba: !no_numba,
        pythran_configs: pythran_config_files,
        pyccel_configs: pyccel_config_files,
      })
      .context("cases")?;
      let toolchain = Toolchain::resolve(&cases).context("toolchain")?;

      let settings = Settings {
        compilation: !no_compilation,
        execution: !no_execution,
        precise: pyperf,
        timeout: timeout.map(Duration::from_secs),
        verbose,
      };

      let log = bench::open_log(verbose, &log_file).context("open log")?;
      let mut bench = Bench::new(settings, output, cases, toolchain, code_dir, PathBuf::from("tmp"), log);
      bench.bench(cases::TEST_CASES).context("bench")?;
      bench.write_results(&result_file).context("write results")?;

      for results in &bench.results {
        if results.failures() > 0 {
          eprintln!("{:?}: {} failed cell(s)", results.name, results.failures());
        }
      }
    }
    Command::Report { files } => {
      for file in files {
        println!("{file:?}");
        println!("{}", report::report(&file).with_context(|| format!("report {file:?}"))?);
      }
    }
  }

  Ok(())
}
