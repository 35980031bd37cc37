//! Test-only launchers and fixtures.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::layout::{Layout, weights_path};
use crate::core::plan::Phase;
use crate::core::types::{Adversary, PhaseName, UnitKey};
use crate::core::validate::ExperimentRequest;
use crate::io::launcher::{LaunchOutput, Launcher};

/// Script path used when rendering recorded calls.
pub const FAKE_SCRIPT: &str = "rlexperiment.sh";

/// One call observed by [`RecordingLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub key: UnitKey,
    pub phase: PhaseName,
    /// Command line rendered against [`FAKE_SCRIPT`].
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scripted {
    Fail,
    Error,
}

/// Launcher that records every call instead of spawning a process.
///
/// Training phases that request binary output get an empty weights file, so
/// the working directory looks like a real run afterwards.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    calls: Mutex<Vec<RecordedCall>>,
    scripted: Vec<(Option<Adversary>, PhaseName, Scripted)>,
    panic_on: Option<UnitKey>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with status 1 on `phase` (for `adversary`, or for every adversary if `None`).
    pub fn fail_on(mut self, adversary: Option<Adversary>, phase: PhaseName) -> Self {
        self.scripted.push((adversary, phase, Scripted::Fail));
        self
    }

    /// Return a launch error on `phase`, as if the script could not be started.
    pub fn error_on(mut self, adversary: Option<Adversary>, phase: PhaseName) -> Self {
        self.scripted.push((adversary, phase, Scripted::Error));
        self
    }

    /// Panic inside the first phase of `key`.
    pub fn panic_on(mut self, key: UnitKey) -> Self {
        self.panic_on = Some(key);
        self
    }

    /// Calls recorded so far, in launch order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn scripted_for(&self, key: &UnitKey, phase: PhaseName) -> Option<Scripted> {
        self.scripted
            .iter()
            .find(|(adversary, scripted_phase, _)| {
                *scripted_phase == phase && adversary.is_none_or(|a| a == key.adversary)
            })
            .map(|(_, _, scripted)| *scripted)
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, key: &UnitKey, phase: &Phase) -> Result<LaunchOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                key: *key,
                phase: phase.name,
                command: phase.call.render(Path::new(FAKE_SCRIPT)),
            });

        if self.panic_on == Some(*key) {
            panic!("scripted panic for {key}");
        }

        match self.scripted_for(key, phase.name) {
            Some(Scripted::Error) => Err(anyhow!("scripted launch error for {key}")),
            Some(Scripted::Fail) => Ok(LaunchOutput {
                exit_code: Some(1),
                timed_out: false,
                stderr: "scripted failure\n".to_string(),
            }),
            None => {
                if phase.call.p1_bin_out
                    && let Some(dir) = &phase.call.p1_dir
                {
                    fs::write(weights_path(dir), b"")?;
                }
                Ok(LaunchOutput {
                    exit_code: Some(0),
                    timed_out: false,
                    stderr: String::new(),
                })
            }
        }
    }
}

/// A [`Layout`] whose output root lives in a temporary directory.
pub struct TestLayout {
    _temp: TempDir,
    pub layout: Layout,
}

impl TestLayout {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let layout = Layout::new(temp.path().join("results"), temp.path().join("configs"));
        Ok(Self {
            _temp: temp,
            layout,
        })
    }
}

/// Build a raw request from string slices.
pub fn request(kinds: &[&str], adversaries: &[&str], iterations: i64) -> ExperimentRequest {
    ExperimentRequest {
        kinds: kinds.iter().map(|s| s.to_string()).collect(),
        adversaries: adversaries.iter().map(|s| s.to_string()).collect(),
        iterations,
    }
}
