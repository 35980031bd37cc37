//! Request validation: the single gate between user input and any work.

use anyhow::{Result, bail};

use crate::core::types::{Adversary, ExperimentKind, UnitKey};

/// Raw experiment selection, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentRequest {
    pub kinds: Vec<String>,
    pub adversaries: Vec<String>,
    /// Signed so that zero and negative counts reach validation instead of the parser.
    pub iterations: i64,
}

/// Validated selection. Construct via [`validate_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPlan {
    /// Deduplicated, in canonical order.
    pub kinds: Vec<ExperimentKind>,
    /// Deduplicated, in request order.
    pub adversaries: Vec<Adversary>,
    pub iterations: u32,
}

impl ExperimentPlan {
    pub fn unit_count(&self) -> usize {
        self.kinds.len() * self.adversaries.len() * self.iterations as usize
    }

    /// Every unit key, grouped kind-major then adversary then seed.
    pub fn unit_keys(&self) -> Vec<UnitKey> {
        let mut keys = Vec::with_capacity(self.unit_count());
        for &kind in &self.kinds {
            for &adversary in &self.adversaries {
                for seed in 0..self.iterations {
                    keys.push(UnitKey {
                        kind,
                        adversary,
                        seed,
                    });
                }
            }
        }
        keys
    }
}

/// Check a request against the fixed kind and adversary sets.
///
/// All violations are collected and reported in one error.
pub fn validate_request(request: &ExperimentRequest) -> Result<ExperimentPlan> {
    let mut errors = Vec::new();

    if request.kinds.is_empty() {
        errors.push("no experiments selected".to_string());
    }
    let mut kinds = Vec::new();
    for name in &request.kinds {
        match ExperimentKind::parse(name) {
            Some(kind) => kinds.push(kind),
            None => errors.push(format!(
                "unsupported experiment '{name}' (expected one of: {})",
                join_names(ExperimentKind::ALL.iter().map(|k| k.name()))
            )),
        }
    }
    kinds.sort();
    kinds.dedup();

    if request.adversaries.is_empty() {
        errors.push("no adversaries selected".to_string());
    }
    let mut adversaries: Vec<Adversary> = Vec::new();
    for name in &request.adversaries {
        match Adversary::parse(name) {
            Some(adversary) if !adversaries.contains(&adversary) => adversaries.push(adversary),
            Some(_) => {}
            None => errors.push(format!(
                "unsupported adversary '{name}' (expected one of: {})",
                join_names(Adversary::ALL.iter().map(|a| a.name()))
            )),
        }
    }

    let iterations = if request.iterations <= 0 {
        errors.push(format!(
            "iterations must be a positive integer, got {}",
            request.iterations
        ));
        0
    } else {
        u32::try_from(request.iterations).unwrap_or_else(|_| {
            errors.push(format!("iterations too large: {}", request.iterations));
            0
        })
    };

    if !errors.is_empty() {
        bail!("invalid experiment request:\n- {}", errors.join("\n- "));
    }

    Ok(ExperimentPlan {
        kinds,
        adversaries,
        iterations,
    })
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
