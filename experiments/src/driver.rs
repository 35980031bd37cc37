//! Top-level orchestration: validate, fan out, join, report.
//!
//! Validation fails closed. Nothing is spawned and no directory is created
//! unless the whole request is valid.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::core::layout::Layout;
use crate::core::validate::{ExperimentPlan, ExperimentRequest, validate_request};
use crate::fanout::KindBatch;
use crate::io::launcher::Launcher;
use crate::pool::WorkerPool;
use crate::report::RunReport;

/// Where and how wide to run.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub layout: Layout,
    /// Upper bound on concurrently running units.
    pub max_parallel: usize,
}

/// Validate `request`, then run it.
pub fn run_request<L: Launcher + 'static>(
    request: &ExperimentRequest,
    launcher: Arc<L>,
    options: &DriverOptions,
) -> Result<RunReport> {
    let plan = validate_request(request)?;
    run_experiments(&plan, launcher, options)
}

/// Run every unit of an already validated plan and wait for all of them.
#[instrument(skip_all, fields(units = plan.unit_count(), max_parallel = options.max_parallel))]
pub fn run_experiments<L: Launcher + 'static>(
    plan: &ExperimentPlan,
    launcher: Arc<L>,
    options: &DriverOptions,
) -> Result<RunReport> {
    let start_time = Utc::now();
    let started = Instant::now();

    // Never start more workers than there are units to run.
    let workers = options.max_parallel.min(plan.unit_count()).max(1);
    let pool = WorkerPool::new(workers).context("start worker pool")?;
    let layout = Arc::new(options.layout.clone());

    let batches: Vec<KindBatch> = plan
        .kinds
        .iter()
        .map(|&kind| {
            KindBatch::spawn(
                &pool,
                &layout,
                &launcher,
                kind,
                &plan.adversaries,
                plan.iterations,
            )
        })
        .collect();
    let kinds = batches.into_iter().map(KindBatch::join).collect();

    let report = RunReport {
        start_time: start_time.to_rfc3339(),
        end_time: Utc::now().to_rfc3339(),
        duration_secs: started.elapsed().as_secs_f64(),
        kinds,
    };

    let failed = report.failed_units().len();
    if failed > 0 {
        warn!(
            failed,
            units = report.unit_count(),
            "experiments done with failures"
        );
    } else {
        info!(units = report.unit_count(), "experiments done");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Adversary, ExperimentKind};
    use crate::test_support::{RecordingLauncher, TestLayout, request};

    #[test]
    fn invalid_request_spawns_nothing() {
        let env = TestLayout::new().expect("layout");
        let launcher = Arc::new(RecordingLauncher::new());
        let options = DriverOptions {
            layout: env.layout.clone(),
            max_parallel: 4,
        };

        let err = run_request(&request(&["specific"], &["AHTN"], 0), launcher.clone(), &options)
            .expect_err("invalid");
        assert!(err.to_string().contains("invalid experiment request"));
        assert!(launcher.calls().is_empty());
        assert!(!env.layout.output_root.join("specific").exists());
    }

    #[test]
    fn report_preserves_kind_and_adversary_order() {
        let env = TestLayout::new().expect("layout");
        let launcher = Arc::new(RecordingLauncher::new());
        let options = DriverOptions {
            layout: env.layout.clone(),
            max_parallel: 3,
        };

        let report = run_request(
            &request(&["nemesis", "specific"], &["StrategyTactics", "AHTN"], 2),
            launcher.clone(),
            &options,
        )
        .expect("run");

        let kinds: Vec<ExperimentKind> = report.kinds.iter().map(|k| k.kind).collect();
        assert_eq!(kinds, vec![ExperimentKind::Specific, ExperimentKind::Nemesis]);
        let adversaries: Vec<Adversary> = report.kinds[0]
            .adversaries
            .iter()
            .map(|a| a.adversary)
            .collect();
        assert_eq!(adversaries, vec![Adversary::StrategyTactics, Adversary::Ahtn]);
        assert_eq!(report.unit_count(), 8);
        assert!(report.all_succeeded());
        assert_eq!(launcher.calls().len(), 2 * 2 * 2 + 2 * 2 * 3);
    }
}
