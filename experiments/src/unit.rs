//! Execution of one (kind, adversary, seed) unit.
//!
//! A unit owns its working directory exclusively and runs its phases strictly
//! in order. The first phase that does not succeed stops the unit: later
//! phases would read a missing or stale weights artifact.

use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::core::layout::Layout;
use crate::core::plan::unit_phases;
use crate::core::types::UnitKey;
use crate::io::launcher::Launcher;
use crate::io::workdir::ensure_working_dir;
use crate::report::{PhaseReport, UnitReport};

/// Run every phase of `key` and report how each went.
pub fn run_unit<L: Launcher + ?Sized>(layout: &Layout, key: UnitKey, launcher: &L) -> UnitReport {
    let span = info_span!(
        "unit",
        kind = %key.kind,
        adversary = %key.adversary,
        seed = key.seed
    );
    let _entered = span.enter();

    let working_dir = layout.working_dir(&key);
    ensure_working_dir(&working_dir);

    let phases = unit_phases(layout, &key);
    let mut reports = Vec::with_capacity(phases.len());
    let mut blocked = false;

    for phase in &phases {
        if blocked {
            reports.push(PhaseReport::skipped(phase.name));
            continue;
        }

        info!(phase = %phase.name, "starting phase");
        let started = Instant::now();
        let result = launcher.launch(&key, phase);
        let duration_ms = started.elapsed().as_millis() as u64;

        let report = match result {
            Ok(output) => PhaseReport::finished(phase.name, output, duration_ms),
            Err(err) => PhaseReport::errored(phase.name, format!("{err:#}"), duration_ms),
        };

        if report.succeeded() {
            info!(phase = %phase.name, duration_ms, "phase finished");
        } else {
            warn!(
                phase = %phase.name,
                status = ?report.status,
                exit_code = ?report.exit_code,
                duration_ms,
                "phase did not succeed, skipping remaining phases"
            );
            blocked = true;
        }
        reports.push(report);
    }

    let report = UnitReport {
        key,
        working_dir,
        phases: reports,
        panic: None,
    };
    if report.succeeded() {
        info!("experiment done");
    } else {
        warn!("experiment failed");
    }
    report
}
