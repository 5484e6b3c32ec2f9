//! # n44-algo: Hourly market-to-grid update for the N44 model
//!
//! - [`HourlyUpdateEngine`]: pushes one day of market schedules into a
//!   [`n44_solver_common::GridSolver`] hour by hour and collects the outcome
//! - [`validate`]: advisory limit checks on a solved state
//! - [`SummaryReport`]: the per-run sheet with scheduled and solved values
//!
//! ## Example
//!
//! ```ignore
//! use n44_algo::HourlyUpdateEngine;
//! use n44_solver_common::RecordingSolver;
//!
//! let mut solver = RecordingSolver::new();
//! let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, "N44_BC.sav", "out/N44_20160304")
//!     .run()?;
//! println!("{} of 24 hours converged", outcome.converged_hours);
//! ```

pub mod report;
pub mod update;
pub mod validation;

pub use report::{ReportValue, SummaryReport, NO_CONVERGENCE, SUMMARY_FILE};
pub use update::{
    after_snapshot, before_snapshot, net_interchange, DayOutcome, HourResult, HourlyUpdateEngine,
    Interchange, DEFAULT_MAX_BUSES, TEMP_CASE, WARNINGS_FILE,
};
pub use validation::{validate, validate_with, LimitConfig, Violation};
