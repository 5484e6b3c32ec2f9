use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use n44_algo::{HourlyUpdateEngine, WARNINGS_FILE};
use n44_core::{N44Error, WarningLog};
use n44_io::{
    ingest_feed, ingest_tabular, list_snapshots, read_case, write_market_sheets, write_records,
    DirectoryFeed, FeedSource, FtpFeed, IngestResult, TabularSet,
};
use n44_solver_common::{GridSolver, RecordingSolver, SubprocessSolver, DEFAULT_BRIDGE};

use crate::config::{FeedConfig, FeedSourceKind, RunConfig, SolverConfig, SolverKind};
use crate::manifest::{write_run_manifest, DayRecord, RunManifest};

pub const MANIFEST_FILE: &str = "run_manifest.json";
pub const RECORDS_DIR: &str = "records";

/// Where the market data of a day comes from.
pub enum MarketSource {
    Feed(Box<dyn FeedSource>),
    /// Sheets in `<dir>/N44_<YYYYMMDD>/`, or directly in `dir`
    Tabular { dir: PathBuf, extension: String },
}

impl MarketSource {
    pub fn from_config(feed: &FeedConfig) -> Result<Self> {
        let source = match feed.source {
            FeedSourceKind::Ftp => {
                let password = feed.resolved_password().ok_or_else(|| {
                    N44Error::Config("feed.password or N44_FEED_PASSWORD is required".into())
                })?;
                let ftp = FtpFeed::new(feed.user.clone(), password).with_host(&feed.host, feed.port);
                MarketSource::Feed(Box::new(ftp))
            }
            FeedSourceKind::Directory => {
                MarketSource::Feed(Box::new(DirectoryFeed::new(feed.require_dir()?)))
            }
            FeedSourceKind::Tabular => MarketSource::Tabular {
                dir: feed.require_dir()?.to_path_buf(),
                extension: feed.extension.clone(),
            },
        };
        Ok(source)
    }

    pub fn ingest(&mut self, date: NaiveDate) -> Result<IngestResult> {
        match self {
            MarketSource::Feed(feed) => ingest_feed(feed.as_mut(), date),
            MarketSource::Tabular { dir, extension } => {
                let per_day = dir.join(day_dir_name(date));
                let sheets = if per_day.is_dir() { per_day } else { dir.clone() };
                ingest_tabular(&TabularSet::in_dir_with_extension(&sheets, extension), date)
            }
        }
    }
}

/// Build the configured solver. A bridge program that cannot be found is a
/// fatal [`N44Error::Solver`].
pub fn build_solver(config: &SolverConfig) -> Result<Box<dyn GridSolver>> {
    match config.kind {
        SolverKind::Recording => Ok(Box::new(RecordingSolver::new())),
        SolverKind::Subprocess => {
            let program = match &config.program {
                Some(program) => program.clone(),
                None => SubprocessSolver::find_program(DEFAULT_BRIDGE)
                    .map_err(|err| N44Error::Solver(err.to_string()))?,
            };
            Ok(Box::new(SubprocessSolver::new(program, config.args.clone())))
        }
    }
}

pub fn day_dir_name(date: NaiveDate) -> String {
    format!("N44_{}", date.format("%Y%m%d"))
}

pub fn day_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(day_dir_name(date))
}

/// Summary returned after the run so callers can log success/failure counts
/// and the manifest location.
#[derive(Debug)]
pub struct RunSummary {
    pub success: usize,
    pub failure: usize,
    pub warning_count: usize,
    pub manifest_path: PathBuf,
    pub days: Vec<DayRecord>,
}

/// Run every day from `start` to `end` inclusive with the source and solver
/// described by `config`.
pub fn run_range(config: &RunConfig, start: NaiveDate, end: NaiveDate) -> Result<RunSummary> {
    let mut source = MarketSource::from_config(&config.feed)?;
    let mut solver = build_solver(&config.solver)?;
    run_range_with(config, &mut source, solver.as_mut(), start, end)
}

/// Run a date range against an explicit source and solver.
///
/// A failing day is recorded in the manifest and the run moves on, unless
/// the error is fatal (see [`N44Error::is_fatal`]): then the manifest of the
/// days so far is written and the error returned.
pub fn run_range_with(
    config: &RunConfig,
    source: &mut MarketSource,
    solver: &mut dyn GridSolver,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RunSummary> {
    if end < start {
        return Err(N44Error::Validation(format!(
            "end date {} is before start date {}",
            end, start
        ))
        .into());
    }
    let root = &config.output.root;
    fs::create_dir_all(root)
        .with_context(|| format!("creating output root '{}'", root.display()))?;
    let manifest_path = root.join(MANIFEST_FILE);

    let mut days = Vec::new();
    for date in start.iter_days().take_while(|date| *date <= end) {
        match run_day(config, source, solver, date) {
            Ok(record) => days.push(record),
            Err(err) => {
                let fatal = err
                    .downcast_ref::<N44Error>()
                    .is_some_and(N44Error::is_fatal);
                error!(%date, fatal, "day failed: {:#}", err);
                if fatal {
                    write_run_manifest(&manifest_path, &RunManifest::new(start, end, days))?;
                    return Err(err.context(format!("run stopped at {}", date)));
                }
                days.push(DayRecord {
                    date,
                    status: "error".to_string(),
                    error: Some(format!("{:#}", err)),
                    output_dir: day_dir(root, date).display().to_string(),
                    converged_hours: 0,
                    failed_hours: Vec::new(),
                    warning_count: 0,
                });
            }
        }
    }

    let manifest = RunManifest::new(start, end, days);
    write_run_manifest(&manifest_path, &manifest)?;
    info!(
        days = manifest.num_days,
        success = manifest.success,
        failure = manifest.failure,
        warnings = manifest.warning_count,
        "run finished"
    );
    Ok(RunSummary {
        success: manifest.success,
        failure: manifest.failure,
        warning_count: manifest.warning_count,
        manifest_path,
        days: manifest.days,
    })
}

/// Ingest, update and report one market day into `N44_<YYYYMMDD>/`.
pub fn run_day(
    config: &RunConfig,
    source: &mut MarketSource,
    solver: &mut dyn GridSolver,
    date: NaiveDate,
) -> Result<DayRecord> {
    let dir = day_dir(&config.output.root, date);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating day directory '{}'", dir.display()))?;
    info!(%date, dir = %dir.display(), "processing market day");

    let ingest = source.ingest(date)?;
    let mut warnings = WarningLog::with_file(dir.join(WARNINGS_FILE));
    for issue in ingest.diagnostics.warnings() {
        warnings.warn(&issue.category, &issue.to_string());
    }

    if config.output.write_market_sheets {
        write_market_sheets(&ingest.dataset, &dir)?;
    }

    let outcome = HourlyUpdateEngine::new(solver, &ingest.dataset, &config.solver.base_case, &dir)
        .with_limits(config.limits.clone())
        .with_max_buses(config.solver.max_buses)
        .with_warning_log(warnings)
        .run()?;

    if config.output.write_records {
        emit_records(&dir)?;
    }

    let failed_hours: Vec<usize> = outcome.failed_hours().collect();
    if !failed_hours.is_empty() {
        warn!(%date, hours = ?failed_hours, "hours without convergence");
    }
    Ok(DayRecord {
        date,
        status: "ok".to_string(),
        error: None,
        output_dir: dir.display().to_string(),
        converged_hours: outcome.converged_hours,
        failed_hours,
        warning_count: outcome.warning_count,
    })
}

/// Write Modelica records for every `.raw` snapshot of a day directory into
/// its `records/` subdirectory. Returns the number of files written.
pub fn emit_records(day_dir: &Path) -> Result<usize> {
    let records = day_dir.join(RECORDS_DIR);
    let mut written = 0;
    for snapshot in list_snapshots(day_dir)? {
        let case = read_case(&snapshot)?;
        written += write_records(&case, &records)?.len();
    }
    info!(dir = %records.display(), files = written, "wrote records");
    Ok(written)
}
