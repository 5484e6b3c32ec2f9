//! # n44-batch: Day runner for the N44 market-to-grid pipeline
//!
//! Runs one or more market days end to end: ingest the market data, write
//! the market sheets, drive the hourly update against the solver and record
//! the outcome of every day in `run_manifest.json`.
//!
//! ```text
//! <root>/
//!   run_manifest.json
//!   N44_20160304/
//!     Production_NO.xlsx ... Exchange_FI.xlsx
//!     warnings.txt
//!     h0_before_PF.raw  h0_after_PF.raw ...
//!     PSSE_in_out.xlsx
//!     records/          (optional)
//! ```

pub mod config;
pub mod manifest;
pub mod runner;
pub mod telemetry;

pub use config::{
    load_run_config, parse_date, save_run_config, FeedConfig, FeedSourceKind, LoggingConfig,
    OutputConfig, RunConfig, SolverConfig, SolverKind,
};
pub use manifest::{load_run_manifest, write_run_manifest, DayRecord, RunManifest};
pub use runner::{
    build_solver, day_dir, emit_records, run_day, run_range, run_range_with, MarketSource,
    RunSummary, MANIFEST_FILE,
};
pub use telemetry::init_tracing;
