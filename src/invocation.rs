use std::{
  ffi::OsString,
  fmt,
  path::Path,
  process::{Command, Stdio},
};

/// Every external command the driver runs. Each variant knows its program,
/// argument vector and environment overrides; nothing goes through a shell.
#[derive(Debug, Clone)]
pub enum Invocation<'a> {
  /// `pyccel --compiler-config=<config> --language=<language> --verbose <source>`
  Pyccel {
    pyccel: &'a Path,
    config: &'a Path,
    language: &'a str,
    source: &'a str,
  },
  /// `pythran -v <source>`, configured through `PYTHRANRC`.
  Pythran {
    pythran: &'a Path,
    config: &'a Path,
    source: &'a str,
  },
  /// Runs the kernel twice in one interpreter and prints the CPU time of the
  /// first, compiling, call minus the second one.
  CompileProbe {
    interpreter: &'a Path,
    setup: &'a str,
    call: &'a str,
  },
  /// `python -m timeit` or, when `precise`, `python -m pyperf timeit`.
  Timeit {
    interpreter: &'a Path,
    precise: bool,
    setup: &'a str,
    call: &'a str,
  },
  /// `pyccel-clean -s`, removes build artifacts from the working directory.
  Clean { pyccel_clean: &'a Path },
}

impl Invocation<'_> {
  pub fn program(&self) -> &Path {
    match self {
      Invocation::Pyccel { pyccel, .. } => pyccel,
      Invocation::Pythran { pythran, .. } => pythran,
      Invocation::CompileProbe { interpreter, .. } | Invocation::Timeit { interpreter, .. } => interpreter,
      Invocation::Clean { pyccel_clean } => pyccel_clean,
    }
  }

  pub fn args(&self) -> Vec<OsString> {
    match self {
      Invocation::Pyccel {
        config,
        language,
        source,
        ..
      } => {
        let mut compiler_config = OsString::from("--compiler-config=");
        compiler_config.push(config);

        vec![
          compiler_config,
          format!("--language={language}").into(),
          "--verbose".into(),
          source.into(),
        ]
      }
      Invocation::Pythran { source, .. } => vec!["-v".into(), source.into()],
      Invocation::CompileProbe { setup, call, .. } => {
        let script = format!(
          "{setup}import resource; \
           t0 = resource.getrusage(resource.RUSAGE_SELF); {call}; \
           t1 = resource.getrusage(resource.RUSAGE_SELF); {call}; \
           t2 = resource.getrusage(resource.RUSAGE_SELF); \
           print(2*t1.ru_utime-t0.ru_utime-t2.ru_utime + 2*t1.ru_stime-t0.ru_stime-t2.ru_stime)"
        );

        vec!["-c".into(), script.into()]
      }
      Invocation::Timeit {
        precise, setup, call, ..
      } => {
        let timeit: &[&str] = if *precise {
          &["pyperf", "timeit", "--copy-env", "--fast"]
        } else {
          &["timeit"]
        };

        let mut args: Vec<OsString> = vec!["-m".into()];
        args.extend(timeit.iter().map(OsString::from));
        args.extend(["-s".into(), setup.into(), call.into()]);

        args
      }
      Invocation::Clean { .. } => vec!["-s".into()],
    }
  }

  /// Environment variables set on top of the inherited environment.
  pub fn envs(&self) -> Vec<(&'static str, OsString)> {
    match self {
      Invocation::Pythran { config, .. } => vec![("PYTHRANRC", config.as_os_str().to_owned())],
      _ => Vec::new(),
    }
  }

  /// Builds the command, running in `dir`, with stdin closed.
  pub fn command(&self, dir: &Path) -> Command {
    let mut command = Command::new(self.program());
    command
      .current_dir(dir)
      .args(self.args())
      .envs(self.envs())
      .stdin(Stdio::null());

    command
  }
}

impl fmt::Display for Invocation<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let envs = self.envs();
    for (key, value) in &envs {
      write!(f, "{key}={value:?} ")?;
    }

    write!(f, "{:?}", self.program())?;
    for arg in self.args() {
      write!(f, " {arg:?}")?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;

  #[test]
  fn pyccel_arguments() {
    let pyccel = PathBuf::from("/usr/bin/pyccel");
    let config = PathBuf::from("/configs/gnu.json");
    let invocation = Invocation::Pyccel {
      pyccel: &pyccel,
      config: &config,
      language: "fortran",
      source: "rk4_mod.py",
    };

    assert_eq!(invocation.program(), pyccel);
    assert_eq!(
      invocation.args(),
      [
        "--compiler-config=/configs/gnu.json",
        "--language=fortran",
        "--verbose",
        "rk4_mod.py"
      ]
      .map(OsString::from)
    );
    assert!(invocation.envs().is_empty());
  }

  #[test]
  fn pythran_selects_its_config_through_the_environment() {
    let pythran = PathBuf::from("pythran");
    let config = PathBuf::from("/configs/pythran_intel.rc");
    let invocation = Invocation::Pythran {
      pythran: &pythran,
      config: &config,
      source: "md_mod.py",
    };

    assert_eq!(invocation.args(), ["-v", "md_mod.py"].map(OsString::from));
    assert_eq!(invocation.envs(), [("PYTHRANRC", OsString::from("/configs/pythran_intel.rc"))]);
  }

  #[test]
  fn timeit_modes() {
    let python = PathBuf::from("python3");
    let timeit = |precise| {
      Invocation::Timeit {
        interpreter: &python,
        precise,
        setup: "from rk4_mod import rk4_humps_test;",
        call: "err = rk4_humps_test(0., 2000., 1000000)",
      }
      .args()
    };

    assert_eq!(
      timeit(false),
      [
        "-m",
        "timeit",
        "-s",
        "from rk4_mod import rk4_humps_test;",
        "err = rk4_humps_test(0., 2000., 1000000)"
      ]
      .map(OsString::from)
    );
    assert_eq!(timeit(true)[..5], ["-m", "pyperf", "timeit", "--copy-env", "--fast"].map(OsString::from));
    assert_eq!(timeit(true).len(), 8);
  }

  #[test]
  fn compile_probe_runs_the_call_twice() {
    let python = PathBuf::from("python3");
    let args = Invocation::CompileProbe {
      interpreter: &python,
      setup: "from numba_md_mod import md;",
      call: "p, k = md(3, 100, 200, 0.1)",
    }
    .args();

    assert_eq!(args[0], "-c");
    let script = args[1].to_string_lossy();
    assert!(script.starts_with("from numba_md_mod import md;import resource;"));
    assert_eq!(script.matches("p, k = md(3, 100, 200, 0.1)").count(), 2);
  }
}
