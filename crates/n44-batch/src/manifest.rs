use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one market day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    /// `ok` or `error`
    pub status: String,
    pub error: Option<String>,
    pub output_dir: String,
    pub converged_hours: usize,
    pub failed_hours: Vec<usize>,
    /// Ingestion and hourly-loop warnings, mostly zero-filled market values
    pub warning_count: usize,
}

impl DayRecord {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub num_days: usize,
    pub success: usize,
    pub failure: usize,
    pub warning_count: usize,
    pub days: Vec<DayRecord>,
}

impl RunManifest {
    pub fn new(start: NaiveDate, end: NaiveDate, days: Vec<DayRecord>) -> Self {
        let success = days.iter().filter(|day| day.is_ok()).count();
        Self {
            created_at: Utc::now(),
            start,
            end,
            num_days: days.len(),
            success,
            failure: days.len() - success,
            warning_count: days.iter().map(|day| day.warning_count).sum(),
            days,
        }
    }
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let file =
        File::open(path).with_context(|| format!("opening run manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run manifest '{}'", path.display()))
}
