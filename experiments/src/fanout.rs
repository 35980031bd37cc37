//! Two-level fan-out of units onto the worker pool.
//!
//! The outer level groups one batch per adversary, the inner level one task
//! per seed. Spawning never blocks: every unit is queued up front and the
//! pool decides how many run at once. Joining walks the same tree, so a
//! batch completes only when all of its units have.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::core::layout::Layout;
use crate::core::types::{Adversary, ExperimentKind, UnitKey};
use crate::io::launcher::Launcher;
use crate::pool::{TaskHandle, WorkerPool};
use crate::report::{AdversaryReport, KindReport, UnitReport};
use crate::unit::run_unit;

/// Queued units for one adversary.
pub struct AdversaryBatch {
    adversary: Adversary,
    layout: Arc<Layout>,
    tasks: Vec<(UnitKey, TaskHandle<UnitReport>)>,
}

impl AdversaryBatch {
    /// Queue one unit per seed in `0..iterations`.
    pub fn spawn<L: Launcher + 'static>(
        pool: &WorkerPool,
        layout: &Arc<Layout>,
        launcher: &Arc<L>,
        kind: ExperimentKind,
        adversary: Adversary,
        iterations: u32,
    ) -> Self {
        let tasks = (0..iterations)
            .map(|seed| {
                let key = UnitKey {
                    kind,
                    adversary,
                    seed,
                };
                let layout = Arc::clone(layout);
                let launcher = Arc::clone(launcher);
                let handle = pool.spawn(move || run_unit(&layout, key, launcher.as_ref()));
                (key, handle)
            })
            .collect::<Vec<_>>();
        debug!(%kind, %adversary, units = tasks.len(), "adversary batch queued");
        Self {
            adversary,
            layout: Arc::clone(layout),
            tasks,
        }
    }

    /// Wait for every unit. A panicked unit is reported as failed.
    pub fn join(self) -> AdversaryReport {
        let units = self
            .tasks
            .into_iter()
            .map(|(key, handle)| match handle.join() {
                Ok(report) => report,
                Err(err) => {
                    error!(unit = %key, err = %err, "unit task did not complete");
                    UnitReport::panicked(key, self.layout.working_dir(&key), format!("{err:#}"))
                }
            })
            .collect();
        AdversaryReport {
            adversary: self.adversary,
            units,
        }
    }
}

/// Queued adversary batches for one experiment kind.
pub struct KindBatch {
    kind: ExperimentKind,
    batches: Vec<AdversaryBatch>,
}

impl KindBatch {
    pub fn spawn<L: Launcher + 'static>(
        pool: &WorkerPool,
        layout: &Arc<Layout>,
        launcher: &Arc<L>,
        kind: ExperimentKind,
        adversaries: &[Adversary],
        iterations: u32,
    ) -> Self {
        info!(%kind, "launching experiments");
        let batches = adversaries
            .iter()
            .map(|&adversary| {
                AdversaryBatch::spawn(pool, layout, launcher, kind, adversary, iterations)
            })
            .collect();
        Self { kind, batches }
    }

    pub fn join(self) -> KindReport {
        let adversaries: Vec<AdversaryReport> =
            self.batches.into_iter().map(AdversaryBatch::join).collect();
        let failed = adversaries
            .iter()
            .flat_map(|batch| batch.units.iter())
            .filter(|unit| !unit.succeeded())
            .count();
        info!(kind = %self.kind, failed, "experiments finished");
        KindReport {
            kind: self.kind,
            adversaries,
        }
    }
}
