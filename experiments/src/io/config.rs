//! Harness configuration stored in `experiments.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

/// Default location of the harness config, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "experiments.toml";

/// Harness configuration (TOML).
///
/// Missing fields default to the values the experiment scripts have always
/// used. Command-line flags override whatever is loaded here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// External train/test executable.
    pub script: PathBuf,

    /// Program used to run `script` (e.g. `bash`). Unset executes the script directly.
    pub interpreter: Option<PathBuf>,

    /// Root of the per-kind, per-adversary `.properties` tree.
    pub config_dir: PathBuf,

    /// Root of the results tree.
    pub output: PathBuf,

    /// Default number of seeds per adversary.
    pub iterations: i64,

    /// Maximum units running at once. `None` uses the available parallelism.
    pub max_parallel: Option<usize>,

    /// Kill a phase that runs longer than this. `None` waits forever.
    pub phase_timeout_secs: Option<u64>,

    /// Stderr kept in memory per phase for the run summary.
    pub stderr_limit_bytes: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("./rlexperiment.sh"),
            interpreter: None,
            config_dir: PathBuf::from("ijcai-experiments"),
            output: PathBuf::from("experiment-results"),
            iterations: 5,
            max_parallel: None,
            phase_timeout_secs: None,
            stderr_limit_bytes: 64 * 1024,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.script.as_os_str().is_empty() {
            return Err(anyhow!("script must be non-empty"));
        }
        if self.config_dir.as_os_str().is_empty() {
            return Err(anyhow!("config_dir must be non-empty"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(anyhow!("output must be non-empty"));
        }
        if self.max_parallel == Some(0) {
            return Err(anyhow!("max_parallel must be > 0"));
        }
        if self.phase_timeout_secs == Some(0) {
            return Err(anyhow!("phase_timeout_secs must be > 0"));
        }
        if self.stderr_limit_bytes == 0 {
            return Err(anyhow!("stderr_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Worker count after resolving the `None` default.
    pub fn worker_count(&self) -> usize {
        self.max_parallel.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`. Use this for
/// the implicit default path only.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    load_config_file(path)
}

/// Load config from a TOML file the user named explicitly. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        bail!("config file {} not found", path.display());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_config_file(&temp.path().join("typo.toml")).expect_err("missing");
        assert!(err.to_string().contains("typo.toml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("experiments.toml");
        fs::write(&path, "max_parallel = 4\nphase_timeout_secs = 3600\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_parallel, Some(4));
        assert_eq!(cfg.worker_count(), 4);
        assert_eq!(cfg.phase_timeout(), Some(Duration::from_secs(3600)));
        assert_eq!(cfg.script, HarnessConfig::default().script);
    }

    #[test]
    fn rejects_zero_parallelism() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("experiments.toml");
        fs::write(&path, "max_parallel = 0\n").expect("write");

        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("max_parallel must be > 0"));
    }
}
