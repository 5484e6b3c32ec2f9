//! Consolidated per-run summary workbook.
//!
//! Column 1 holds row labels, every hour owns three columns starting at
//! column 2 (`2 + 3h ..= 4 + 3h`). Rows are fixed:
//!
//! | Row | Content |
//! |-----|---------|
//! | 1 | `hour h` |
//! | 2 | scheduled production / consumption / exchange headers |
//! | 3-12 | one row per area |
//! | 14 | additional-load headers |
//! | 15-27 | one row per exchange load (P, Q) |
//! | 30 | post-solve headers |
//! | 31-40 | solved generation / load / interchange per area |
//! | 42 | `Convergence` |
//! | 43 | `Bus voltage problem` or `No convergence` |
//! | 45-47 | generator P, Q and loading flags |
//! | 48 | branch flags for rate A, B and C |

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use serde::Serialize;

use n44_core::{areas, exchange_loads, round_to};
use n44_solver_common::{AreaTotals, RatingClass};

use crate::validation::Violation;

/// File name of the flushed report.
pub const SUMMARY_FILE: &str = "PSSE_in_out.xlsx";

pub const ROW_HOUR: usize = 1;
pub const ROW_SCHEDULE_HEADERS: usize = 2;
pub const ROW_AREAS: usize = 3;
pub const ROW_LOAD_HEADERS: usize = 14;
pub const ROW_LOADS: usize = 15;
pub const ROW_RESULT_HEADERS: usize = 30;
pub const ROW_RESULTS: usize = 31;
pub const ROW_CONVERGENCE: usize = 42;
pub const ROW_STATUS: usize = 43;
pub const ROW_GENERATOR_P: usize = 45;
pub const ROW_GENERATOR_Q: usize = 46;
pub const ROW_GENERATOR_LOADING: usize = 47;
pub const ROW_BRANCH: usize = 48;

pub const NO_CONVERGENCE: &str = "No convergence";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Number(value) => write!(f, "{}", value),
            ReportValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ReportValue {
    fn from(value: f64) -> Self {
        ReportValue::Number(value)
    }
}

impl From<&str> for ReportValue {
    fn from(text: &str) -> Self {
        ReportValue::Text(text.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(text: String) -> Self {
        ReportValue::Text(text)
    }
}

/// Sparse sheet addressed by 1-based `(row, column)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    cells: BTreeMap<(usize, usize), ReportValue>,
}

impl Default for SummaryReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryReport {
    /// Empty report with the row labels in column 1.
    pub fn new() -> Self {
        let mut report = Self {
            cells: BTreeMap::new(),
        };
        for (i, area) in areas().iter().enumerate() {
            report.set(ROW_AREAS + i, 1, area.label);
            report.set(ROW_RESULTS + i, 1, area.label);
        }
        report.set(ROW_LOAD_HEADERS, 1, "Additional loads");
        for (i, load) in exchange_loads().iter().enumerate() {
            report.set(ROW_LOADS + i, 1, load.label());
        }
        report.set(ROW_RESULT_HEADERS, 1, "Results after power flow");
        report
    }

    /// First column of the block owned by `hour`.
    pub fn hour_column(hour: usize) -> usize {
        2 + 3 * hour
    }

    pub fn set(&mut self, row: usize, column: usize, value: impl Into<ReportValue>) {
        self.cells.insert((row, column), value.into());
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&ReportValue> {
        self.cells.get(&(row, column))
    }

    pub fn text(&self, row: usize, column: usize) -> Option<&str> {
        match self.get(row, column) {
            Some(ReportValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, row: usize, column: usize) -> Option<f64> {
        match self.get(row, column) {
            Some(ReportValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn write_hour_headers(&mut self, hour: usize) {
        let col = Self::hour_column(hour);
        self.set(ROW_HOUR, col, format!("hour {}", hour));
        self.set(ROW_SCHEDULE_HEADERS, col, "Scheduled Production [MWh]");
        self.set(ROW_SCHEDULE_HEADERS, col + 1, "Scheduled Consumption [MWh]");
        self.set(ROW_SCHEDULE_HEADERS, col + 2, "Scheduled Exchange [MWh]");
        self.set(ROW_LOAD_HEADERS, col, "Active Power [MW]");
        self.set(ROW_LOAD_HEADERS, col + 1, "Reactive Power [Mvar]");
        self.set(ROW_RESULT_HEADERS, col, "Solved Production [MWh]");
        self.set(ROW_RESULT_HEADERS, col + 1, "Solved Consumption [MWh]");
        self.set(ROW_RESULT_HEADERS, col + 2, "Solved Exchange [MWh]");
    }

    /// Scheduled values pushed to the solver for the `index`-th area.
    pub fn record_area_schedule(
        &mut self,
        hour: usize,
        index: usize,
        production: f64,
        consumption: f64,
        exchange: f64,
    ) {
        let col = Self::hour_column(hour);
        let row = ROW_AREAS + index;
        self.set(row, col, production);
        self.set(row, col + 1, consumption);
        self.set(row, col + 2, exchange);
    }

    pub fn record_exchange_load(&mut self, hour: usize, index: usize, p: f64, q: f64) {
        let col = Self::hour_column(hour);
        self.set(ROW_LOADS + index, col, p);
        self.set(ROW_LOADS + index, col + 1, q);
    }

    /// Solved totals, placed on the row of the area with the same number.
    /// Areas unknown to the mapping are ignored.
    pub fn record_area_totals(&mut self, hour: usize, totals: &[AreaTotals]) {
        let col = Self::hour_column(hour);
        for total in totals {
            let Some(index) = areas().iter().position(|a| a.number == total.number) else {
                continue;
            };
            let row = ROW_RESULTS + index;
            self.set(row, col, round_to(total.generation, 0));
            self.set(row, col + 1, round_to(total.load, 0));
            self.set(row, col + 2, round_to(total.interchange, 0));
        }
    }

    pub fn record_convergence(&mut self, hour: usize, converged: bool) {
        let col = Self::hour_column(hour);
        if converged {
            self.set(ROW_CONVERGENCE, col, "Convergence");
        } else {
            self.set(ROW_STATUS, col, NO_CONVERGENCE);
        }
    }

    pub fn record_violations(&mut self, hour: usize, violations: &[Violation]) {
        let col = Self::hour_column(hour);
        for violation in violations {
            let (row, column) = match violation {
                Violation::BusVoltage => (ROW_STATUS, col),
                Violation::GeneratorActivePower => (ROW_GENERATOR_P, col),
                Violation::GeneratorReactivePower => (ROW_GENERATOR_Q, col),
                Violation::GeneratorOverload => (ROW_GENERATOR_LOADING, col),
                Violation::BranchOverload(RatingClass::A) => (ROW_BRANCH, col),
                Violation::BranchOverload(RatingClass::B) => (ROW_BRANCH, col + 1),
                Violation::BranchOverload(RatingClass::C) => (ROW_BRANCH, col + 2),
            };
            self.set(row, column, violation.message());
        }
    }

    /// Number of cells in `row` holding exactly `text`.
    pub fn count_text(&self, row: usize, text: &str) -> usize {
        self.cells
            .range((row, 0)..(row + 1, 0))
            .filter(|(_, value)| matches!(value, ReportValue::Text(t) if t == text))
            .count()
    }

    /// Write the sheet as a single-worksheet xlsx workbook.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for ((row, column), value) in &self.cells {
            let (row, column) = (*row as u32 - 1, *column as u16 - 1);
            match value {
                ReportValue::Number(number) => sheet.write_number(row, column, *number)?,
                ReportValue::Text(text) => sheet.write_string(row, column, text.as_str())?,
            };
        }
        workbook
            .save(path)
            .with_context(|| format!("writing summary report {}", path.display()))?;
        Ok(())
    }
}
