/// A single kernel of the benchmark suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
  /// Row label in the result tables.
  pub name: &'static str,
  /// Source file inside the code directory. The Numba variant lives next to
  /// it as `numba_<basename>`.
  pub basename: &'static str,
  /// Symbols imported from the kernel module. The first one also names the
  /// staging directory.
  pub imports: &'static [&'static str],
  /// Statements run once before timing.
  pub setup: &'static str,
  /// Statement being timed.
  pub call: &'static str,
}

impl TestCase {
  /// Module name of the kernel source, i.e. the basename without `.py`.
  pub fn module(&self) -> &'static str {
    self.basename.strip_suffix(".py").unwrap_or(self.basename)
  }

  pub fn numba_basename(&self) -> String {
    format!("numba_{}", self.basename)
  }

  pub fn numba_module(&self) -> String {
    format!("numba_{}", self.module())
  }

  /// Name of the `tmp/` subdirectory the test is staged into.
  pub fn staging_name(&self) -> &'static str {
    self.imports.first().copied().unwrap_or_else(|| self.module())
  }
}

pub const TEST_CASES: &[TestCase] = &[
  TestCase {
    name: "Ackermann",
    basename: "ackermann_mod.py",
    imports: &["ackermann"],
    setup: "import sys; sys.setrecursionlimit(3000);",
    call: "a = ackermann(3,8)",
  },
  TestCase {
    name: "Bellman Ford",
    basename: "bellman_ford_mod.py",
    imports: &["bellman_ford_test"],
    setup: "",
    call: "err = bellman_ford_test()",
  },
  TestCase {
    name: "Dijkstra",
    basename: "dijkstra.py",
    imports: &["dijkstra_distance_test"],
    setup: "",
    call: "d = dijkstra_distance_test()",
  },
  TestCase {
    name: "Euler",
    basename: "euler_mod.py",
    imports: &["euler_humps_test"],
    setup: "",
    call: "err = euler_humps_test(0., 2000., 1000000)",
  },
  TestCase {
    name: "Midpoint Explicit",
    basename: "midpoint_explicit_mod.py",
    imports: &["midpoint_explicit_humps_test"],
    setup: "",
    call: "err = midpoint_explicit_humps_test(0., 2000., 1000000)",
  },
  TestCase {
    name: "Midpoint Fixed",
    basename: "midpoint_fixed_mod.py",
    imports: &["midpoint_fixed_humps_test"],
    setup: "",
    call: "err = midpoint_fixed_humps_test(0., 2000., 1000000)",
  },
  TestCase {
    name: "RK4",
    basename: "rk4_mod.py",
    imports: &["rk4_humps_test"],
    setup: "",
    call: "err = rk4_humps_test(0., 2000., 1000000)",
  },
  TestCase {
    name: "FD - L Convection",
    basename: "linearconv_1d_mod.py",
    imports: &["linearconv_1d"],
    setup: "",
    call: "x, u = linearconv_1d(2001, 0.0003, 3000)",
  },
  TestCase {
    name: "FD - NL Convection",
    basename: "nonlinearconv_1d_mod.py",
    imports: &["nonlinearconv_1d"],
    setup: "",
    call: "x, u = nonlinearconv_1d(2001, 0.00035, 3000)",
  },
  TestCase {
    name: "FD - Poisson",
    basename: "poisson_2d_mod.py",
    imports: &["poisson_2d"],
    setup: "",
    call: "x, y, phi = poisson_2d(150, 150, 200)",
  },
  TestCase {
    name: "FD - Laplace",
    basename: "laplace_2d_mod.py",
    imports: &["laplace_2d"],
    setup: "",
    call: "x, y, phi, niter = laplace_2d(150, 150, 5e-5, 5000)",
  },
  TestCase {
    name: "M-D",
    basename: "md_mod.py",
    imports: &["md"],
    setup: "",
    call: "p, k = md(3, 100, 200, 0.1)",
  },
  TestCase {
    name: "Splines",
    basename: "splines.py",
    imports: &["Spline"],
    setup: "import numpy as np; s = Spline(5, knots = np.linspace(0,1, 1000), coeffs = np.ones(1000)); x = np.random.rand(100000); y = np.empty(100000);",
    call: "s.eval(x, y)",
  },
];

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn staging_directories_are_unique() {
    let names: HashSet<_> = TEST_CASES.iter().map(TestCase::staging_name).collect();
    assert_eq!(names.len(), TEST_CASES.len());
  }

  #[test]
  fn numba_variant_names() {
    let dijkstra = TEST_CASES.iter().find(|t| t.name == "Dijkstra").unwrap();
    assert_eq!(dijkstra.module(), "dijkstra");
    assert_eq!(dijkstra.numba_module(), "numba_dijkstra");
    assert_eq!(dijkstra.numba_basename(), "numba_dijkstra.py");
  }
}
