//! Launcher abstraction for invoking the external experiment script.
//!
//! The [`Launcher`] trait decouples unit sequencing from process spawning.
//! Tests use recording launchers that never start a process.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::plan::Phase;
use crate::core::types::UnitKey;
use crate::io::process::run_command_to_log;

/// What a finished invocation reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stderr: String,
}

impl LaunchOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Abstraction over how phases are executed.
///
/// Implementations are shared by every worker thread.
pub trait Launcher: Send + Sync {
    /// Run one phase to completion. An `Err` means the phase could not be run at all.
    fn launch(&self, key: &UnitKey, phase: &Phase) -> Result<LaunchOutput>;
}

/// Launcher that spawns the experiment script directly.
#[derive(Debug, Clone)]
pub struct ScriptLauncher {
    pub script: PathBuf,
    /// Run the script through this program (e.g. `bash`) instead of executing it directly.
    pub interpreter: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub stderr_limit_bytes: usize,
}

impl Launcher for ScriptLauncher {
    #[instrument(skip_all, fields(phase = %phase.name))]
    fn launch(&self, key: &UnitKey, phase: &Phase) -> Result<LaunchOutput> {
        let log_path = phase
            .call
            .log_target()
            .ok_or_else(|| anyhow!("phase {} of {key} has no log path", phase.name))?;
        debug!(command = %phase.call.render(&self.script), "launching script");

        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.args(phase.call.args());

        let output = run_command_to_log(cmd, log_path, self.timeout, self.stderr_limit_bytes)
            .with_context(|| format!("run {}", self.script.display()))?;

        if output.timed_out {
            warn!(timeout = ?self.timeout, "script timed out");
        } else if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "script failed");
        }

        Ok(LaunchOutput {
            exit_code: output.status.code(),
            timed_out: output.timed_out,
            stderr: output.stderr_text(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::core::call::CallSpec;
    use crate::core::types::{Adversary, ExperimentKind, PhaseName};

    fn key() -> UnitKey {
        UnitKey {
            kind: ExperimentKind::Specific,
            adversary: Adversary::Ahtn,
            seed: 0,
        }
    }

    fn sh_launcher(dir: &Path, body: &str) -> ScriptLauncher {
        let script = dir.join("fake.sh");
        fs::write(&script, format!("{body}\n")).expect("write script");
        ScriptLauncher {
            script,
            interpreter: Some(PathBuf::from("sh")),
            timeout: None,
            stderr_limit_bytes: 1024,
        }
    }

    fn phase(dir: &Path) -> Phase {
        Phase {
            name: PhaseName::Train,
            call: CallSpec {
                p1_seed: Some(9),
                p1_bin_out: true,
                log_path: Some(dir.join("train.log")),
                ..CallSpec::default()
            },
        }
    }

    #[test]
    fn passes_arguments_and_redirects_stdout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let launcher = sh_launcher(temp.path(), "printf '%s\\n' \"$*\"");

        let output = launcher.launch(&key(), &phase(temp.path())).expect("launch");
        assert!(output.success());
        let log = fs::read_to_string(temp.path().join("train.log")).expect("read log");
        assert_eq!(log, "-s1 9 -b1\n");
    }

    #[test]
    fn captures_failure_status_and_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let launcher = sh_launcher(temp.path(), "echo boom >&2; exit 4");

        let output = launcher.launch(&key(), &phase(temp.path())).expect("launch");
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(4));
        assert!(output.stderr.contains("boom"));
    }

    #[test]
    fn missing_script_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let launcher = ScriptLauncher {
            script: temp.path().join("does-not-exist.sh"),
            interpreter: None,
            timeout: None,
            stderr_limit_bytes: 1024,
        };

        let err = launcher
            .launch(&key(), &phase(temp.path()))
            .expect_err("spawn should fail");
        assert!(format!("{err:#}").contains("spawn command"));
    }
}
