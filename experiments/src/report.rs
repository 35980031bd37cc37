//! Per-phase, per-unit and per-run results.
//!
//! Reports are plain data collected from worker threads. A failure in one
//! unit is recorded here and never propagated to its siblings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::types::{Adversary, ExperimentKind, PhaseName, UnitKey};
use crate::io::launcher::LaunchOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Exited with status 0.
    Succeeded,
    /// Exited with a non-zero status or was killed by a signal.
    Failed,
    /// Killed after exceeding the phase timeout.
    TimedOut,
    /// Could not be started (missing script, unwritable log, ...).
    Errored,
    /// Not run because an earlier phase of the unit did not succeed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: PhaseName,
    pub status: PhaseStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Captured stderr or the launch error.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl PhaseReport {
    pub fn finished(phase: PhaseName, output: LaunchOutput, duration_ms: u64) -> Self {
        let status = if output.timed_out {
            PhaseStatus::TimedOut
        } else if output.success() {
            PhaseStatus::Succeeded
        } else {
            PhaseStatus::Failed
        };
        Self {
            phase,
            status,
            exit_code: output.exit_code,
            duration_ms,
            detail: output.stderr,
        }
    }

    pub fn errored(phase: PhaseName, error: String, duration_ms: u64) -> Self {
        Self {
            phase,
            status: PhaseStatus::Errored,
            exit_code: None,
            duration_ms,
            detail: error,
        }
    }

    pub fn skipped(phase: PhaseName) -> Self {
        Self {
            phase,
            status: PhaseStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
            detail: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == PhaseStatus::Succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    #[serde(flatten)]
    pub key: UnitKey,
    pub working_dir: PathBuf,
    pub phases: Vec<PhaseReport>,
    /// Set when the unit's task panicked instead of returning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panic: Option<String>,
}

impl UnitReport {
    pub fn panicked(key: UnitKey, working_dir: PathBuf, message: String) -> Self {
        Self {
            key,
            working_dir,
            phases: Vec::new(),
            panic: Some(message),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.panic.is_none()
            && !self.phases.is_empty()
            && self.phases.iter().all(PhaseReport::succeeded)
    }

    /// First phase that did not succeed, if any.
    pub fn first_failure(&self) -> Option<&PhaseReport> {
        self.phases.iter().find(|phase| !phase.succeeded())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdversaryReport {
    pub adversary: Adversary,
    pub units: Vec<UnitReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindReport {
    pub kind: ExperimentKind,
    pub adversaries: Vec<AdversaryReport>,
}

/// Everything a run produced, persisted as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub kinds: Vec<KindReport>,
}

impl RunReport {
    pub fn units(&self) -> impl Iterator<Item = &UnitReport> {
        self.kinds
            .iter()
            .flat_map(|kind| kind.adversaries.iter())
            .flat_map(|adversary| adversary.units.iter())
    }

    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    pub fn failed_units(&self) -> Vec<&UnitReport> {
        self.units().filter(|unit| !unit.succeeded()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.units().all(UnitReport::succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u32) -> UnitKey {
        UnitKey {
            kind: ExperimentKind::Specific,
            adversary: Adversary::Ahtn,
            seed,
        }
    }

    fn output(exit_code: Option<i32>, timed_out: bool) -> LaunchOutput {
        LaunchOutput {
            exit_code,
            timed_out,
            stderr: String::new(),
        }
    }

    #[test]
    fn classifies_launch_outputs() {
        let ok = PhaseReport::finished(PhaseName::Train, output(Some(0), false), 5);
        assert_eq!(ok.status, PhaseStatus::Succeeded);

        let failed = PhaseReport::finished(PhaseName::Train, output(Some(2), false), 5);
        assert_eq!(failed.status, PhaseStatus::Failed);

        let signalled = PhaseReport::finished(PhaseName::Train, output(None, false), 5);
        assert_eq!(signalled.status, PhaseStatus::Failed);

        let timed_out = PhaseReport::finished(PhaseName::Train, output(None, true), 5);
        assert_eq!(timed_out.status, PhaseStatus::TimedOut);
    }

    #[test]
    fn unit_success_requires_every_phase() {
        let mut unit = UnitReport {
            key: key(0),
            working_dir: PathBuf::from("out/specific/AHTN/rep_0"),
            phases: vec![
                PhaseReport::finished(PhaseName::Train, output(Some(0), false), 1),
                PhaseReport::finished(PhaseName::Test, output(Some(0), false), 1),
            ],
            panic: None,
        };
        assert!(unit.succeeded());

        unit.phases[1] = PhaseReport::skipped(PhaseName::Test);
        assert!(!unit.succeeded());
        assert_eq!(unit.first_failure().map(|p| p.phase), Some(PhaseName::Test));

        let panicked = UnitReport::panicked(key(1), PathBuf::from("x"), "boom".to_string());
        assert!(!panicked.succeeded());
    }

    #[test]
    fn unit_report_flattens_key_in_json() {
        let unit = UnitReport::panicked(key(3), PathBuf::from("w"), "boom".to_string());
        let value = serde_json::to_value(&unit).expect("json");
        assert_eq!(value["kind"], "specific");
        assert_eq!(value["adversary"], "AHTN");
        assert_eq!(value["seed"], 3);
        assert_eq!(value["panic"], "boom");
    }
}
