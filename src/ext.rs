use std::{
  fs::File,
  io::{Read, Seek},
  mem::MaybeUninit,
  process::{Command, ExitStatus, Stdio},
  time::Duration,
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

#[extend::ext(name = StatusExt)]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

/// Everything a finished child process left behind.
#[derive(Debug)]
pub struct Captured {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

impl Captured {
  /// Returns stdout, or an error carrying stderr if the exit status was
  /// non-zero.
  pub fn into_stdout(self) -> Result<String> {
    self
      .status
      .check_success()
      .with_context(|| format!("stderr: {}", self.stderr.trim_end()))?;

    Ok(self.stdout)
  }
}

fn read_back(mut file: File) -> Result<String> {
  let mut bytes = Vec::new();
  file.rewind().context("rewind")?;
  file.read_to_end(&mut bytes).context("read")?;

  Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// User plus system CPU seconds of every terminated and waited-for child of
/// this process.
pub fn children_cpu_time() -> Result<f64> {
  let mut usage = MaybeUninit::<libc::rusage>::uninit();
  let ret = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, usage.as_mut_ptr()) };
  if ret != 0 {
    return Err(std::io::Error::last_os_error()).context("getrusage");
  }
  let usage = unsafe { usage.assume_init() };

  let seconds = |time: libc::timeval| time.tv_sec as f64 + time.tv_usec as f64 * 1e-6;

  Ok(seconds(usage.ru_utime) + seconds(usage.ru_stime))
}

#[extend::ext(name = CommandExt)]
pub impl Command {
  /// Runs the command to completion, capturing stdout and stderr. Output goes
  /// through temporary files so that neither pipe can fill up and block the
  /// child while we wait on it.
  ///
  /// With a `timeout`, a child still running after it is killed and an error
  /// is returned. Without one, this blocks for as long as the child runs.
  fn capture(&mut self, timeout: Option<Duration>) -> Result<Captured> {
    let stdout = tempfile::tempfile().context("stdout tempfile")?;
    let stderr = tempfile::tempfile().context("stderr tempfile")?;

    let mut child = self
      .stdout(Stdio::from(stdout.try_clone().context("clone stdout")?))
      .stderr(Stdio::from(stderr.try_clone().context("clone stderr")?))
      .spawn()
      .context("spawn")?;

    let status = match timeout {
      None => child.wait().context("wait")?,
      Some(timeout) => match child.wait_timeout(timeout).context("wait")? {
        Some(status) => status,
        None => {
          child.kill().context("kill after timeout")?;
          child.wait().context("wait after kill")?;

          anyhow::bail!("timed out after {timeout:?}");
        }
      },
    };

    Ok(Captured {
      status,
      stdout: read_back(stdout).context("stdout")?,
      stderr: read_back(stderr).context("stderr")?,
    })
  }

  /// Like [`CommandExt::capture`], additionally returning the CPU seconds the
  /// child (and its own children) spent, from this process's resource
  /// accounting.
  fn capture_cpu_time(&mut self, timeout: Option<Duration>) -> Result<(Captured, f64)> {
    let before = children_cpu_time()?;
    let captured = self.capture(timeout)?;
    let after = children_cpu_time()?;

    Ok((captured, after - before))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn captures_both_streams() {
    let captured = Command::new("sh")
      .args(["-c", "echo out; echo err >&2; exit 3"])
      .capture(None)
      .unwrap();

    assert_eq!(captured.stdout, "out\n");
    assert_eq!(captured.stderr, "err\n");
    assert_eq!(captured.status.code(), Some(3));

    let error = captured.into_stdout().unwrap_err();
    assert!(format!("{error:#}").contains("err"));
  }

  #[test]
  fn timeout_kills_the_child() {
    let result = Command::new("sleep").arg("10").capture(Some(Duration::from_millis(100)));

    assert!(format!("{:#}", result.unwrap_err()).contains("timed out"));
  }

  #[test]
  fn cpu_time_is_accounted() {
    let (captured, cpu) = Command::new("sh")
      .args(["-c", "i=0; while [ $i -lt 20000 ]; do i=$((i+1)); done"])
      .capture_cpu_time(None)
      .unwrap();

    assert!(captured.status.success());
    assert!(cpu >= 0.0);
    assert!(children_cpu_time().unwrap() >= cpu);
  }
}
