//! Run summary persisted as `<output>/summary.json`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::report::RunReport;

/// Atomically write the summary (temp file + rename).
pub fn write_summary(path: &Path, report: &RunReport) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(report).context("serialize summary")?;
    payload.push('\n');

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)
        .with_context(|| format!("write temp summary {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace summary {}", path.display()))?;
    Ok(())
}

pub fn load_summary(path: &Path) -> Result<RunReport> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
