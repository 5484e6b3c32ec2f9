use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use n44_core::{Country, MarketDataset, QuantityCode, HOURS};
use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::tabular::sheet_stem;

/// Extension of the written market sheets.
pub const SHEET_EXTENSION: &str = "xlsx";

/// Write one workbook per country and quantity (`Production_NO.xlsx`, ...)
/// in the layout read by [`crate::tabular`], with a trailing `SUM` row.
pub fn write_market_sheets(dataset: &MarketDataset, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating market sheet directory {}", dir.display()))?;

    let mut written = Vec::new();
    for country in Country::all() {
        for code in QuantityCode::all() {
            let path = dir.join(format!("{}.{}", sheet_stem(*country, *code), SHEET_EXTENSION));
            write_sheet(dataset, *country, *code, &path)
                .with_context(|| format!("writing market sheet {}", path.display()))?;
            written.push(path);
        }
    }
    debug!(dir = %dir.display(), sheets = written.len(), "wrote market sheets");
    Ok(written)
}

fn write_sheet(
    dataset: &MarketDataset,
    country: Country,
    code: QuantityCode,
    path: &Path,
) -> Result<()> {
    let series = dataset.series(country, code);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_stem(country, code))?;

    sheet.write_string(0, 0, format!("{} in MWh/h", code.family()))?;
    sheet.write_string(1, 0, dataset.date().format("%Y-%m-%d").to_string())?;

    let sum_row = (HOURS + 2) as u32;
    sheet.write_string(sum_row, 0, "SUM")?;
    for hour in 0..HOURS {
        sheet.write_string(hour as u32 + 2, 0, format!("{} - {}", hour, hour + 1))?;
    }

    for (index, (id, values)) in series.iter().enumerate() {
        let col = index as u16 + 1;
        sheet.write_string(1, col, id.as_str())?;
        for (hour, value) in values.iter().enumerate() {
            sheet.write_number(hour as u32 + 2, col, *value)?;
        }
        sheet.write_number(sum_row, col, values.iter().sum::<f64>())?;
    }

    workbook.save(path)?;
    Ok(())
}
