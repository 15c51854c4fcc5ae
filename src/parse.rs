use std::fmt;

use regex::Regex;
use thiserror::Error;

/// Time units reported by `timeit` and `pyperf`, ordered from coarsest to
/// finest. The discriminant is the power of 1000 relative to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unit {
  Sec = 0,
  Ms = 1,
  Us = 2,
  Ns = 3,
}

impl Unit {
  pub const ALL: [Unit; 4] = [Unit::Sec, Unit::Ms, Unit::Us, Unit::Ns];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(index: usize) -> Option<Unit> {
    Self::ALL.get(index).copied()
  }

  /// Label used in the execution table row names.
  pub fn label(self) -> &'static str {
    match self {
      Unit::Sec => "s",
      Unit::Ms => "ms",
      Unit::Us => "\\textmu s",
      Unit::Ns => "ns",
    }
  }

  /// Seconds per unit.
  pub fn factor(self) -> f64 {
    match self {
      Unit::Sec => 1.0,
      Unit::Ms => 1e-3,
      Unit::Us => 1e-6,
      Unit::Ns => 1e-9,
    }
  }

  /// Factor that converts a value in `self` into `target`.
  pub fn scale_to(self, target: Unit) -> f64 {
    1000f64.powi(target as i32 - self as i32)
  }
}

impl std::str::FromStr for Unit {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sec" | "s" => Ok(Unit::Sec),
      "msec" | "ms" => Ok(Unit::Ms),
      "usec" | "us" | "µs" | "\\textmu s" => Ok(Unit::Us),
      "nsec" | "ns" => Ok(Unit::Ns),
      other => Err(ParseError::UnknownUnit(other.to_string())),
    }
  }
}

impl fmt::Display for Unit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// A single execution time measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
  /// Best time (standard mode) or mean (high precision mode).
  pub value: f64,
  /// Only reported in high precision mode.
  pub stddev: Option<f64>,
  pub unit: Unit,
}

impl Timing {
  /// Expresses this timing in `unit`.
  pub fn rescale(&self, unit: Unit) -> Timing {
    let factor = self.unit.scale_to(unit);

    Timing {
      value: self.value * factor,
      stddev: self.stddev.map(|s| s * factor),
      unit,
    }
  }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
  #[error("no timing line found in {0:?}")]
  NoMatch(String),
  #[error("unknown time unit {0:?}")]
  UnknownUnit(String),
  #[error("invalid number {0:?}")]
  InvalidNumber(String),
  #[error("mean is in {mean} but stddev is in {stddev}")]
  UnitMismatch { mean: Unit, stddev: Unit },
}

fn number(s: &str) -> Result<f64, ParseError> {
  s.parse().map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

/// Parses the report of `python -m timeit`, e.g.
/// `1000 loops, best of 5: 123.45 usec per loop`.
pub fn parse_timeit(output: &str) -> Result<Timing, ParseError> {
  let regex = Regex::new(r"([0-9]+) loops?, best of ([0-9]+): ([0-9.]+) (\w*)").expect("Always valid");
  let captures = regex
    .captures(output)
    .ok_or_else(|| ParseError::NoMatch(output.trim().to_string()))?;

  Ok(Timing {
    value: number(&captures[3])?,
    stddev: None,
    unit: captures[4].parse()?,
  })
}

/// Parses the report of `python -m pyperf timeit`, e.g.
/// `Mean +- std dev: 123.45 ms +- 1.20 ms`.
pub fn parse_pyperf(output: &str) -> Result<Timing, ParseError> {
  let regex = Regex::new(r"([0-9.]+) (\w\w\w?) \+- ([0-9.]+) (\w\w\w?)").expect("Always valid");
  let captures = regex
    .captures(output)
    .ok_or_else(|| ParseError::NoMatch(output.trim().to_string()))?;

  let mean: Unit = captures[2].parse()?;
  let stddev: Unit = captures[4].parse()?;
  if mean != stddev {
    return Err(ParseError::UnitMismatch { mean, stddev });
  }

  Ok(Timing {
    value: number(&captures[1])?,
    stddev: Some(number(&captures[3])?),
    unit: mean,
  })
}

/// Parses the single float printed by the Numba compilation probe.
pub fn parse_seconds(output: &str) -> Result<f64, ParseError> {
  let line = output.trim();
  let seconds = line.lines().last().unwrap_or_default().trim();

  number(seconds)
}
