use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// One column of the result tables: a way of running the kernels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Case {
  /// CPython, the baseline.
  Python,
  Pypy,
  /// Pythran with a configuration file, passed via `PYTHRANRC`.
  Pythran { config: PathBuf },
  Numba,
  /// Pyccel with a compiler configuration, targeting `language`.
  Pyccel { config: PathBuf, language: String },
}

impl Case {
  /// Column header of the case.
  pub fn name(&self) -> String {
    match self {
      Case::Python => "python".to_string(),
      Case::Pypy => "pypy".to_string(),
      Case::Numba => "numba".to_string(),
      Case::Pythran { config } => file_stem(config),
      Case::Pyccel { config, language } => format!("{}_{language}", file_stem(config)),
    }
  }

  /// Whether the case compiles the kernel ahead of time, leaving a shared
  /// library and generated sources behind.
  pub fn builds_artifacts(&self) -> bool {
    matches!(self, Case::Pythran { .. } | Case::Pyccel { .. })
  }
}

fn file_stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

/// Which cases to benchmark, straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct CaseOptions {
  pub pypy: bool,
  pub numba: bool,
  pub pythran_configs: Vec<PathBuf>,
  pub pyccel_configs: Vec<PathBuf>,
}

/// Returns the target languages of a Pyccel configuration file, in file
/// order. The file is either a single object naming its target `language`,
/// or a mapping with one entry per language.
pub fn pyccel_languages(path: &Path) -> Result<Vec<String>> {
  let contents = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
  let config: Map<String, Value> =
    serde_json::from_str(&contents).with_context(|| format!("{path:?} is not a JSON object"))?;

  let languages = match config.get("language") {
    Some(Value::String(language)) => vec![language.clone()],
    _ => config.keys().cloned().collect(),
  };

  if languages.is_empty() {
    anyhow::bail!("{path:?} does not name any language");
  }

  Ok(languages)
}

/// Derives the cases in declaration order: python, pypy, pythran configs,
/// numba, pyccel configs expanded per language.
pub fn cases(options: &CaseOptions) -> Result<Vec<Case>> {
  let mut cases = vec![Case::Python];

  if options.pypy {
    cases.push(Case::Pypy);
  }

  for config in &options.pythran_configs {
    let config = fs::canonicalize(config).with_context(|| format!("pythran config {config:?}"))?;
    fs::read_to_string(&config).with_context(|| format!("read {config:?}"))?;

    cases.push(Case::Pythran { config });
  }

  if options.numba {
    cases.push(Case::Numba);
  }

  for config in &options.pyccel_configs {
    let config = fs::canonicalize(config).with_context(|| format!("pyccel config {config:?}"))?;

    for language in pyccel_languages(&config)? {
      cases.push(Case::Pyccel {
        config: config.clone(),
        language,
      });
    }
  }

  Ok(cases)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use tempfile::{Builder, NamedTempFile, TempDir};

  use super::*;

  fn json_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn per_language_schema_keeps_file_order() {
    let dir = TempDir::new().unwrap();
    let path = json_file(&dir, "gnu.json", r#"{"fortran": {"exec": "gfortran"}, "c": {"exec": "gcc"}}"#);

    assert_eq!(pyccel_languages(&path).unwrap(), ["fortran", "c"]);
  }

  #[test]
  fn single_language_schema() {
    let dir = TempDir::new().unwrap();
    let path = json_file(&dir, "intel.json", r#"{"language": "c", "exec": "icx"}"#);

    assert_eq!(pyccel_languages(&path).unwrap(), ["c"]);
  }

  #[test]
  fn malformed_configs_are_fatal() {
    let dir = TempDir::new().unwrap();

    assert!(pyccel_languages(&json_file(&dir, "empty.json", "{}")).is_err());
    assert!(pyccel_languages(&json_file(&dir, "list.json", r#"["c"]"#)).is_err());
    assert!(pyccel_languages(&json_file(&dir, "broken.json", r#"{"c": "#)).is_err());
    assert!(pyccel_languages(&dir.path().join("missing.json")).is_err());
  }

  #[test]
  fn declaration_order_and_names() {
    let dir = TempDir::new().unwrap();
    let gnu = json_file(&dir, "pyccel_gnu.json", r#"{"fortran": {}, "c": {}}"#);
    let mut pythranrc = Builder::new().prefix("pythran_gnu").suffix(".rc").tempfile_in(dir.path()).unwrap();
    writeln!(pythranrc, "[compiler]").unwrap();

    let options = CaseOptions {
      pypy: true,
      numba: true,
      pythran_configs: vec![pythranrc.path().to_path_buf()],
      pyccel_configs: vec![gnu],
    };

    let cases = cases(&options).unwrap();
    let names: Vec<_> = cases.iter().map(Case::name).collect();
    let pythran_name = pythranrc.path().file_stem().unwrap().to_string_lossy().into_owned();

    assert_eq!(
      names,
      [
        "python".to_string(),
        "pypy".to_string(),
        pythran_name,
        "numba".to_string(),
        "pyccel_gnu_fortran".to_string(),
        "pyccel_gnu_c".to_string(),
      ]
    );
    assert!(cases.iter().filter(|case| case.builds_artifacts()).count() == 3);
    assert!(matches!(&cases[2], Case::Pythran { config } if config.is_absolute()));
  }

  #[test]
  fn baseline_only() {
    let cases = cases(&CaseOptions::default()).unwrap();
    assert_eq!(cases, [Case::Python]);
  }

  #[test]
  fn missing_pythran_config_is_fatal() {
    let file = NamedTempFile::new().unwrap();
    let missing = file.path().with_extension("does-not-exist");

    let options = CaseOptions {
      pythran_configs: vec![missing],
      ..CaseOptions::default()
    };

    assert!(cases(&options).is_err());
  }
}
