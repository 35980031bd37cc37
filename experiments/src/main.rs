//! Experiment orchestration CLI.
//!
//! Runs the external train/test script for every selected experiment kind,
//! adversary and seed, writing results under `<output>/<kind>/<adversary>/rep_<seed>/`
//! and a run summary to `<output>/summary.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use experiments::core::layout::Layout;
use experiments::core::plan::unit_phases;
use experiments::core::types::{Adversary, ExperimentKind};
use experiments::core::validate::{ExperimentPlan, ExperimentRequest, validate_request};
use experiments::driver::{DriverOptions, run_experiments};
use experiments::exit_codes;
use experiments::io::config::{DEFAULT_CONFIG_PATH, HarnessConfig, load_config, load_config_file};
use experiments::io::launcher::ScriptLauncher;
use experiments::io::summary::write_summary;
use experiments::logging;
use experiments::report::RunReport;

#[derive(Parser, Debug)]
#[command(
    name = "experiments",
    version,
    about = "Run RL train/test experiments against a set of adversaries"
)]
struct Cli {
    /// Experiment kinds to run (specific, nemesis).
    #[arg(short, long, num_args = 0.., default_values = default_kinds())]
    experiments: Vec<String>,

    /// Adversaries to run against.
    #[arg(short, long, num_args = 0.., default_values = default_adversaries())]
    adversaries: Vec<String>,

    /// Seeds per adversary [default: from config, 5].
    #[arg(short, long, allow_negative_numbers = true)]
    iterations: Option<i64>,

    /// Root of the results tree [default: from config, experiment-results].
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Harness config file (TOML) [default: experiments.toml, used only if present].
    #[arg(long)]
    config: Option<PathBuf>,

    /// External train/test executable.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Root of the `.properties` configuration tree.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Maximum number of units running at once.
    #[arg(short = 'j', long)]
    max_parallel: Option<usize>,

    /// Kill any single phase running longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print every command that would run, then exit without running anything.
    #[arg(long)]
    dry_run: bool,
}

fn default_kinds() -> Vec<&'static str> {
    ExperimentKind::ALL.iter().map(|kind| kind.name()).collect()
}

fn default_adversaries() -> Vec<&'static str> {
    Adversary::ALL.iter().map(|adv| adv.name()).collect()
}

impl Cli {
    /// Layer command-line overrides on top of the file config.
    fn apply_overrides(&self, mut cfg: HarnessConfig) -> Result<HarnessConfig> {
        if let Some(script) = &self.script {
            cfg.script = script.clone();
        }
        if let Some(config_dir) = &self.config_dir {
            cfg.config_dir = config_dir.clone();
        }
        if let Some(output) = &self.output {
            cfg.output = output.clone();
        }
        if let Some(iterations) = self.iterations {
            cfg.iterations = iterations;
        }
        if let Some(max_parallel) = self.max_parallel {
            cfg.max_parallel = Some(max_parallel);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            cfg.phase_timeout_secs = Some(timeout_secs);
        }
        cfg.validate().context("invalid harness configuration")?;
        Ok(cfg)
    }

    fn load_config(&self) -> Result<HarnessConfig> {
        match &self.config {
            Some(path) => load_config_file(path),
            None => load_config(Path::new(DEFAULT_CONFIG_PATH)),
        }
    }

    fn request(&self, cfg: &HarnessConfig) -> ExperimentRequest {
        ExperimentRequest {
            kinds: self.experiments.clone(),
            adversaries: self.adversaries.clone(),
            iterations: cfg.iterations,
        }
    }
}

fn main() {
    logging::init();
    // clap exits usage errors with 2, which is FAILED here.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let cfg = cli.load_config()?;
    let cfg = cli.apply_overrides(cfg)?;
    let plan = validate_request(&cli.request(&cfg))?;
    let layout = Layout::new(&cfg.output, &cfg.config_dir);

    if cli.dry_run {
        print_plan(&plan, &layout, &cfg.script);
        return Ok(exit_codes::OK);
    }

    let launcher = Arc::new(ScriptLauncher {
        script: cfg.script.clone(),
        interpreter: cfg.interpreter.clone(),
        timeout: cfg.phase_timeout(),
        stderr_limit_bytes: cfg.stderr_limit_bytes,
    });
    let options = DriverOptions {
        layout,
        max_parallel: cfg.worker_count(),
    };
    let report = run_experiments(&plan, launcher, &options)?;

    // Units have run by now, so nothing below may report INVALID.
    let summary_path = options.layout.summary_path();
    let summary_written = match write_summary(&summary_path, &report) {
        Ok(()) => true,
        Err(err) => {
            error!("write run summary failed: {err:#}");
            eprintln!("write run summary: {err:#}");
            false
        }
    };
    print_report(&report, summary_written.then_some(summary_path.as_path()));

    if summary_written && report.all_succeeded() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILED)
    }
}

fn print_plan(plan: &ExperimentPlan, layout: &Layout, script: &Path) {
    for key in plan.unit_keys() {
        for phase in unit_phases(layout, &key) {
            println!("{}", phase.call.render(script));
        }
    }
}

fn print_report(report: &RunReport, summary_path: Option<&Path>) {
    let failed = report.failed_units();
    println!(
        "summary: units={} succeeded={} failed={} duration_secs={:.2}",
        report.unit_count(),
        report.unit_count() - failed.len(),
        failed.len(),
        report.duration_secs
    );
    for unit in failed {
        match (&unit.panic, unit.first_failure()) {
            (Some(message), _) => println!("failed: {} panicked: {message}", unit.key),
            (None, Some(phase)) => println!(
                "failed: {} phase={} status={:?} exit_code={:?}",
                unit.key, phase.phase, phase.status, phase.exit_code
            ),
            (None, None) => println!("failed: {}", unit.key),
        }
    }
    if let Some(path) = summary_path {
        println!("summary: {}", path.display());
    }
}
