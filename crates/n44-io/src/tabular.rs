//! Market data from spreadsheet exports, one sheet per country and quantity.
//!
//! Sheet layout (1-based rows):
//!
//! | Row | Column 1 | Columns 2.. |
//! |-----|----------|-------------|
//! | 1 | label, e.g. `Production in MWh/h` | |
//! | 2 | date | area or link ids (`NO1`, `NO1 - SE3`) |
//! | 3-26 | hour label | hourly values |
//! | 27 | `SUM` (optional, ignored) | totals |
//!
//! Spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read through
//! `calamine`, `.csv` files through the `csv` crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use n44_core::{Country, Diagnostics, MarketDataset, QuantityCode, HOURS};
use tracing::{debug, info};

use crate::ingest::{insert_checked, parse_value, IngestResult};

/// First row holding hourly values (0-based).
const FIRST_VALUE_ROW: usize = 2;
const HEADER_ROW: usize = 1;

/// Single cell of a sheet, independent of the file format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Some(value) = parse_value(trimmed) {
            Cell::Number(value)
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => parse_value(text),
            Cell::Empty => None,
        }
    }

    fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(value) => Some(value.to_string()),
            Cell::Text(text) => Some(text.clone()),
        }
    }

    fn is_sum_marker(&self) -> bool {
        matches!(self, Cell::Text(text) if text.trim().eq_ignore_ascii_case("sum"))
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Float(value) => Cell::Number(*value),
            Data::Int(value) => Cell::Number(*value as f64),
            Data::String(text) => Cell::from_text(text),
            Data::Bool(flag) => Cell::Text(flag.to_string()),
            _ => Cell::Empty,
        }
    }
}

/// The nine files making up one day of tabular market data.
#[derive(Debug, Clone, Default)]
pub struct TabularSet {
    files: BTreeMap<(Country, QuantityCode), PathBuf>,
}

impl TabularSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, country: Country, code: QuantityCode, path: impl AsRef<Path>) -> Self {
        self.files.insert((country, code), path.as_ref().to_path_buf());
        self
    }

    /// Conventional names in `dir`: `Production_NO.xlsx`, `Exchange_FI.xlsx`, ...
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::in_dir_with_extension(dir, "xlsx")
    }

    pub fn in_dir_with_extension(dir: impl AsRef<Path>, extension: &str) -> Self {
        let dir = dir.as_ref();
        let mut set = Self::new();
        for country in Country::all() {
            for code in QuantityCode::all() {
                let name = format!("{}.{}", sheet_stem(*country, *code), extension);
                set = set.with(*country, *code, dir.join(name));
            }
        }
        set
    }

    pub fn path(&self, country: Country, code: QuantityCode) -> Option<&Path> {
        self.files.get(&(country, code)).map(PathBuf::as_path)
    }
}

/// `<Family>_<CC>`, shared with the sheet writer.
pub fn sheet_stem(country: Country, code: QuantityCode) -> String {
    format!("{}_{}", code.family(), country.code())
}

/// Read the first worksheet (or the whole CSV file) into a grid of cells.
pub fn read_grid(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv_grid(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_grid(path),
        other => bail!(
            "unsupported market sheet format '{}' for {}; expected xlsx, xls, ods or csv",
            other,
            path.display()
        ),
    }
}

fn read_workbook_grid(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .with_context(|| format!("no sheets found in {}", path.display()))?;
    let range = workbook
        .worksheet_range(&first)
        .with_context(|| format!("reading sheet '{}' of {}", first, path.display()))?;

    // Ranges start at the first used cell; re-anchor to A1.
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let mut grid = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(Cell::from));
        grid.push(cells);
    }
    Ok(grid)
}

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        grid.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(grid)
}

/// Extract one quantity table from a grid into `dataset`.
///
/// Finland publishes a single production and consumption column whose header
/// varies; it is always stored under `FI`.
pub fn parse_grid(
    grid: &[Vec<Cell>],
    country: Country,
    code: QuantityCode,
    dataset: &mut MarketDataset,
    diagnostics: &mut Diagnostics,
) -> usize {
    let Some(header) = grid.get(HEADER_ROW) else {
        diagnostics.add_warning_with_entity(
            "parse",
            "sheet has no header row",
            &sheet_stem(country, code),
        );
        return 0;
    };

    let value_rows: Vec<&Vec<Cell>> = grid
        .iter()
        .skip(FIRST_VALUE_ROW)
        .take_while(|row| !row.first().is_some_and(Cell::is_sum_marker))
        .take(HOURS)
        .collect();

    let single_area = country == Country::Finland && code != QuantityCode::Exchange;
    let mut stored = 0;

    for (col, cell) in header.iter().enumerate().skip(1) {
        let Some(label) = cell.as_label() else {
            continue;
        };
        let id = if single_area { "FI".to_string() } else { label };

        let mut values = Vec::with_capacity(HOURS);
        for (hour, row) in value_rows.iter().enumerate() {
            match row.get(col).and_then(Cell::as_number) {
                Some(value) => values.push(value),
                None => {
                    diagnostics.add_warning_at_hour(
                        "missing-data",
                        "empty cell, filled with zero",
                        &id,
                        hour,
                    );
                    values.push(0.0);
                }
            }
        }

        insert_checked(dataset, diagnostics, country, code, &id, &values);
        stored += 1;
        if single_area {
            break;
        }
    }

    debug!(%country, %code, columns = stored, "parsed market sheet");
    stored
}

/// Build the dataset of `date` from the nine sheets of `set`.
pub fn ingest_tabular(set: &TabularSet, date: NaiveDate) -> Result<IngestResult> {
    let mut dataset = MarketDataset::new(date);
    let mut diagnostics = Diagnostics::new();

    for country in Country::all() {
        for code in QuantityCode::all() {
            let Some(path) = set.path(*country, *code) else {
                diagnostics.add_warning_with_entity(
                    "missing-data",
                    "no sheet configured",
                    &sheet_stem(*country, *code),
                );
                continue;
            };
            let grid = read_grid(path)?;
            parse_grid(&grid, *country, *code, &mut dataset, &mut diagnostics);
        }
    }

    info!(%date, series = dataset.len(), warnings = diagnostics.warning_count(), "read market sheets");
    Ok(IngestResult::new(dataset, diagnostics))
}
