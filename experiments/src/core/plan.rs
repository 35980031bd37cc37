//! Phase sequences for each experiment kind.
//!
//! Phases within a unit are ordered by data dependency: every phase after the
//! first reads the weights artifact written by the phase before it.

use crate::core::call::CallSpec;
use crate::core::layout::{Layout, NEMESIS_BASELINE, NEMESIS_SELF_PLAY, weights_path};
use crate::core::types::{ExperimentKind, PhaseName, UnitKey};

/// One planned subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: PhaseName,
    pub call: CallSpec,
}

/// Build the ordered phase list for a unit.
pub fn unit_phases(layout: &Layout, key: &UnitKey) -> Vec<Phase> {
    match key.kind {
        ExperimentKind::Specific => specific_phases(layout, key),
        ExperimentKind::Nemesis => nemesis_phases(layout, key),
    }
}

fn specific_phases(layout: &Layout, key: &UnitKey) -> Vec<Phase> {
    let wd = layout.working_dir(key);
    let kind = ExperimentKind::Specific;

    let train = CallSpec {
        config: Some(layout.adversary_properties(kind, key.adversary, "train")),
        p1_seed: Some(key.seed),
        p1_bin_out: true,
        p1_dir: Some(wd.clone()),
        output_path: Some(wd.join("train-results.txt")),
        log_path: Some(wd.join("train.log")),
        ..CallSpec::default()
    };
    let test = test_call(layout, key);

    vec![
        Phase {
            name: PhaseName::Train,
            call: train,
        },
        Phase {
            name: PhaseName::Test,
            call: test,
        },
    ]
}

fn nemesis_phases(layout: &Layout, key: &UnitKey) -> Vec<Phase> {
    let wd = layout.working_dir(key);
    let kind = ExperimentKind::Nemesis;

    let baseline = CallSpec {
        config: Some(layout.properties(kind, NEMESIS_BASELINE, "train")),
        p1_seed: Some(key.seed),
        p1_bin_out: true,
        p1_dir: Some(wd.clone()),
        output_path: Some(wd.join("puppet-train-results.txt")),
        log_path: Some(wd.join("puppet-train.log")),
        ..CallSpec::default()
    };
    // The self-play agent overwrites the baseline's weights file in place.
    let self_play = CallSpec {
        config: Some(layout.properties(kind, NEMESIS_SELF_PLAY, "train")),
        p1_seed: Some(key.seed),
        p2_seed: Some(key.seed),
        p2_bin_in: Some(weights_path(&wd)),
        p1_bin_out: true,
        p1_dir: Some(wd.clone()),
        output_path: Some(wd.join("metabot-train-results.txt")),
        log_path: Some(wd.join("metabot-train.log")),
        ..CallSpec::default()
    };
    let test = test_call(layout, key);

    vec![
        Phase {
            name: PhaseName::BaselineTrain,
            call: baseline,
        },
        Phase {
            name: PhaseName::SelfPlayTrain,
            call: self_play,
        },
        Phase {
            name: PhaseName::Test,
            call: test,
        },
    ]
}

/// Test the unit's final weights against the adversary's test configuration.
fn test_call(layout: &Layout, key: &UnitKey) -> CallSpec {
    let wd = layout.working_dir(key);
    CallSpec {
        config: Some(layout.adversary_properties(key.kind, key.adversary, "test")),
        p1_seed: Some(key.seed),
        p1_bin_in: Some(weights_path(&wd)),
        output_path: Some(wd.join("test-results.txt")),
        log_path: Some(wd.join("test.log")),
        ..CallSpec::default()
    }
}
