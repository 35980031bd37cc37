//! Experiment vocabulary shared by planning, execution and reporting.
//!
//! Names are part of the on-disk layout and of the CLI surface, so
//! `name()` and `parse()` must stay inverse to each other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which configuration subtree and phase sequence a unit uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    /// Train against one adversary, then test against the same adversary.
    Specific,
    /// Train a fixed baseline, self-play against it, then test against the adversary.
    Nemesis,
}

impl ExperimentKind {
    /// Every kind, in canonical launch order.
    pub const ALL: [ExperimentKind; 2] = [ExperimentKind::Specific, ExperimentKind::Nemesis];

    pub fn name(self) -> &'static str {
        match self {
            ExperimentKind::Specific => "specific",
            ExperimentKind::Nemesis => "nemesis",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named opponent strategy the external tool can be configured to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Adversary {
    #[serde(rename = "AHTN")]
    Ahtn,
    NaiveMCTS,
    PuppetAB,
    PuppetMCTS,
    StrategyTactics,
}

impl Adversary {
    pub const ALL: [Adversary; 5] = [
        Adversary::Ahtn,
        Adversary::NaiveMCTS,
        Adversary::PuppetAB,
        Adversary::PuppetMCTS,
        Adversary::StrategyTactics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Adversary::Ahtn => "AHTN",
            Adversary::NaiveMCTS => "NaiveMCTS",
            Adversary::PuppetAB => "PuppetAB",
            Adversary::PuppetMCTS => "PuppetMCTS",
            Adversary::StrategyTactics => "StrategyTactics",
        }
    }

    /// Case-sensitive: names must match the configuration directory names exactly.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|adv| adv.name() == name)
    }
}

impl fmt::Display for Adversary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One subprocess call within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseName {
    Train,
    BaselineTrain,
    SelfPlayTrain,
    Test,
}

impl PhaseName {
    pub fn name(self) -> &'static str {
        match self {
            PhaseName::Train => "train",
            PhaseName::BaselineTrain => "baseline-train",
            PhaseName::SelfPlayTrain => "self-play-train",
            PhaseName::Test => "test",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of one (kind, adversary, seed) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub kind: ExperimentKind,
    pub adversary: Adversary,
    pub seed: u32,
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/rep_{}", self.kind, self.adversary, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ExperimentKind::ALL {
            assert_eq!(ExperimentKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(ExperimentKind::parse("Specific"), None);
    }

    #[test]
    fn adversary_parse_is_case_sensitive() {
        assert_eq!(Adversary::parse("AHTN"), Some(Adversary::Ahtn));
        assert_eq!(Adversary::parse("ahtn"), None);
        assert_eq!(Adversary::parse("Unknown"), None);
    }

    #[test]
    fn adversary_serializes_as_config_name() {
        let json = serde_json::to_string(&Adversary::Ahtn).expect("json");
        assert_eq!(json, "\"AHTN\"");
        let json = serde_json::to_string(&PhaseName::SelfPlayTrain).expect("json");
        assert_eq!(json, "\"self-play-train\"");
    }
}
