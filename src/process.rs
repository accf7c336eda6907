//! Running capp command line tools and daemons.
//!
//! Process execution sits behind [`CommandRunner`] so capp libraries can be
//! driven by a fake in tests. [`run_safe`] layers the daemon retry contract
//! on top of any runner: a CLI that can't reach its daemon fails at once,
//! one whose daemon is still warming up is retried a bounded number of times.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CappError;

/// Exact stderr of a CLI whose daemon isn't running.
pub const NOT_CONNECTED_SIGNATURE: &str = "error: couldn't connect to server";

/// Marker, in stdout or stderr, of a daemon that is still starting up (RPC error -28).
pub const WARMING_UP_SIGNATURE: &str = "error code: -28";

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn ok(stdout: &str) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn is_not_connected(&self) -> bool {
        self.stderr.trim() == NOT_CONNECTED_SIGNATURE
    }

    pub fn is_warming_up(&self) -> bool {
        self.stdout.contains(WARMING_UP_SIGNATURE) || self.stderr.contains(WARMING_UP_SIGNATURE)
    }
}

/// Runs an external command to completion and captures its output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, CappError>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, CappError> {
        debug!(program = %program.display(), ?args, "running");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CappError::Spawn {
                program: program.to_path_buf(),
                source: e,
            })?;
        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// How long to keep retrying a daemon that is still starting up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            delay: Duration::from_secs(5),
        }
    }
}

/// Run once, then apply the daemon retry contract.
///
/// - stderr exactly [`NOT_CONNECTED_SIGNATURE`]: [`CappError::DaemonUnreachable`], no retry.
/// - output containing [`WARMING_UP_SIGNATURE`]: sleep `policy.delay` and rerun,
///   up to `policy.attempts` times; [`CappError::DaemonStuck`] when exhausted.
/// - anything else, including other non-zero exits, is returned as is.
pub fn run_safe(
    runner: &dyn CommandRunner,
    program: &Path,
    args: &[String],
    policy: RetryPolicy,
) -> Result<ProcessOutput, CappError> {
    let output = checked(runner, program, args)?;
    if !output.is_warming_up() {
        return Ok(output);
    }

    for attempt in 1..=policy.attempts {
        warn!(
            program = %program.display(),
            attempt,
            max = policy.attempts,
            "daemon still starting up, retrying"
        );
        std::thread::sleep(policy.delay);
        let retried = checked(runner, program, args)?;
        if !retried.is_warming_up() {
            return Ok(retried);
        }
    }

    Err(CappError::DaemonStuck {
        program: program.to_path_buf(),
        attempts: policy.attempts,
    })
}

fn checked(
    runner: &dyn CommandRunner,
    program: &Path,
    args: &[String],
) -> Result<ProcessOutput, CappError> {
    let output = runner.run(program, args)?;
    if output.is_not_connected() {
        return Err(CappError::DaemonUnreachable {
            program: PathBuf::from(program),
        });
    }
    Ok(output)
}
