//! Path conventions for configuration inputs and experiment outputs.

use std::path::{Path, PathBuf};

use crate::core::types::{Adversary, ExperimentKind, UnitKey};

/// Weights file written by a training phase into its working directory.
pub const WEIGHTS_FILE: &str = "weights_0.bin";
/// Run-level report written at the output root.
pub const SUMMARY_FILE: &str = "summary.json";

/// Configuration directory of the fixed nemesis baseline opponent.
pub const NEMESIS_BASELINE: &str = "PuppetMCTS";
/// Configuration directory of the nemesis self-play agent.
pub const NEMESIS_SELF_PLAY: &str = "Metabot";

/// Roots from which every input and output path is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub output_root: PathBuf,
    pub config_dir: PathBuf,
}

impl Layout {
    pub fn new(output_root: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            config_dir: config_dir.into(),
        }
    }

    /// `<output>/<kind>/<adversary>/rep_<seed>`.
    pub fn working_dir(&self, key: &UnitKey) -> PathBuf {
        self.output_root
            .join(key.kind.name())
            .join(key.adversary.name())
            .join(format!("rep_{}", key.seed))
    }

    /// `<config_dir>/<kind>/<profile>/<phase>.properties`.
    pub fn properties(&self, kind: ExperimentKind, profile: &str, phase: &str) -> PathBuf {
        self.config_dir
            .join(kind.name())
            .join(profile)
            .join(format!("{phase}.properties"))
    }

    pub fn adversary_properties(
        &self,
        kind: ExperimentKind,
        adversary: Adversary,
        phase: &str,
    ) -> PathBuf {
        self.properties(kind, adversary.name(), phase)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_root.join(SUMMARY_FILE)
    }
}

pub fn weights_path(working_dir: &Path) -> PathBuf {
    working_dir.join(WEIGHTS_FILE)
}
