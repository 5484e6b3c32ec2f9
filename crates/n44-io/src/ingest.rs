use n44_core::{Country, Diagnostics, MarketDataset, QuantityCode, SeriesFit};
use serde::Serialize;

/// Market data for one day together with what went wrong while reading it.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub dataset: MarketDataset,
    pub diagnostics: Diagnostics,
}

impl IngestResult {
    pub fn new(dataset: MarketDataset, diagnostics: Diagnostics) -> Self {
        Self {
            dataset,
            diagnostics,
        }
    }
}

/// Parse an hourly value written with either `.` or `,` as decimal separator.
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .or_else(|_| trimmed.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|value| value.is_finite())
}

/// Store a series and note in `diagnostics` if it had to be padded or truncated.
pub(crate) fn insert_checked(
    dataset: &mut MarketDataset,
    diagnostics: &mut Diagnostics,
    country: Country,
    code: QuantityCode,
    id: &str,
    values: &[f64],
) {
    let entity = format!("{}/{}/{}", country, code, id);
    match dataset.insert_series(country, code, id, values) {
        SeriesFit::Exact => {}
        SeriesFit::Padded { missing } => diagnostics.add_warning_with_entity(
            "missing-data",
            &format!("{} hourly values missing, filled with zero", missing),
            &entity,
        ),
        SeriesFit::Truncated { extra } => diagnostics.add_warning_with_entity(
            "series-length",
            &format!("{} values beyond hour 23 ignored", extra),
            &entity,
        ),
    }
}
