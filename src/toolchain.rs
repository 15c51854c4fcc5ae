use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Case;

/// Absolute paths of the external executables a run needs.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
  pub python: PathBuf,
  pub pypy: Option<PathBuf>,
  pub pyccel: Option<PathBuf>,
  pub pythran: Option<PathBuf>,
  pub pyccel_clean: Option<PathBuf>,
}

fn find(executable: &str) -> Result<PathBuf> {
  which::which(executable).with_context(|| format!("the `{executable}` executable was not found in $PATH"))
}

impl Toolchain {
  /// Looks up every executable required by `cases`. A missing executable is
  /// an error.
  pub fn resolve(cases: &[Case]) -> Result<Self> {
    Self::resolve_with(cases, find)
  }

  /// Like [`Toolchain::resolve`], looking executables up with `find`.
  fn resolve_with(cases: &[Case], find: impl Fn(&str) -> Result<PathBuf>) -> Result<Self> {
    let needs = |f: fn(&Case) -> bool| cases.iter().any(f);

    let mut toolchain = Toolchain {
      python: find("python3")?,
      ..Toolchain::default()
    };

    if needs(|case| matches!(case, Case::Pypy)) {
      toolchain.pypy = Some(find("pypy")?);
    }
    if needs(|case| matches!(case, Case::Pyccel { .. })) {
      toolchain.pyccel = Some(find("pyccel")?);
    }
    if needs(|case| matches!(case, Case::Pythran { .. })) {
      toolchain.pythran = Some(find("pythran")?);
    }
    if needs(Case::builds_artifacts) {
      toolchain.pyccel_clean = Some(find("pyccel-clean")?);
    }

    Ok(toolchain)
  }

  pub fn pypy(&self) -> Result<&Path> {
    resolved(&self.pypy, "pypy")
  }

  pub fn pyccel(&self) -> Result<&Path> {
    resolved(&self.pyccel, "pyccel")
  }

  pub fn pythran(&self) -> Result<&Path> {
    resolved(&self.pythran, "pythran")
  }

  pub fn pyccel_clean(&self) -> Result<&Path> {
    resolved(&self.pyccel_clean, "pyccel-clean")
  }
}

fn resolved<'a>(path: &'a Option<PathBuf>, executable: &str) -> Result<&'a Path> {
  path
    .as_deref()
    .with_context(|| format!("`{executable}` was not looked up"))
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  /// Resolves every executable to `/opt/bin/<name>`, recording the lookups.
  fn lookups(cases: &[Case]) -> (Toolchain, Vec<String>) {
    let seen = RefCell::new(Vec::new());
    let toolchain = Toolchain::resolve_with(cases, |executable| {
      seen.borrow_mut().push(executable.to_string());
      Ok(Path::new("/opt/bin").join(executable))
    })
    .unwrap();

    (toolchain, seen.into_inner())
  }

  #[test]
  fn only_needed_tools_are_required() {
    let (toolchain, seen) = lookups(&[Case::Python, Case::Numba]);

    assert_eq!(seen, ["python3"]);
    assert_eq!(toolchain.python, Path::new("/opt/bin/python3"));
    assert!(toolchain.pypy().is_err());
    assert!(toolchain.pyccel().is_err());
    assert!(toolchain.pythran().is_err());
    assert!(toolchain.pyccel_clean().is_err());
  }

  #[test]
  fn compilers_bring_the_cleanup_tool() {
    let cases = [
      Case::Python,
      Case::Pypy,
      Case::Pythran {
        config: PathBuf::from("pythran_gnu.rc"),
      },
    ];
    let (toolchain, seen) = lookups(&cases);

    assert_eq!(seen, ["python3", "pypy", "pythran", "pyccel-clean"]);
    assert_eq!(toolchain.pythran().unwrap(), Path::new("/opt/bin/pythran"));
    assert!(toolchain.pyccel().is_err());
  }

  #[test]
  fn lookup_failure_is_fatal() {
    let cases = [Case::Python, Case::Pypy];
    let error = Toolchain::resolve_with(&cases, |executable| match executable {
      "pypy" => anyhow::bail!("no {executable}"),
      _ => Ok(PathBuf::from(executable)),
    })
    .unwrap_err();

    assert!(format!("{error:#}").contains("no pypy"));
  }

  #[test]
  fn missing_executable_is_fatal() {
    let missing = find("accel-bench-no-such-tool").unwrap_err();
    assert!(format!("{missing:#}").contains("accel-bench-no-such-tool"));
  }
}
