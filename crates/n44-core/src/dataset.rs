//! In-memory representation of one day of Nordic market schedules.
//!
//! A [`MarketDataset`] is a single three-level mapping
//! `Country -> QuantityCode -> area/link id -> 24 hourly values`. The leaf is
//! a fixed-size array so the "exactly 24 values" invariant holds by
//! construction; readers report through [`SeriesFit`] whether they had to pad
//! or truncate what the source delivered.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{N44Error, N44Result};

/// Hours in a market day.
pub const HOURS: usize = 24;

/// One value per hour, hour 0 first.
pub type HourlySeries = [f64; HOURS];

/// Series of one quantity for one country, keyed by area or link id.
pub type SeriesMap = BTreeMap<String, HourlySeries>;

static EMPTY_SERIES: Lazy<SeriesMap> = Lazy::new(SeriesMap::new);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "NO")]
    Norway,
    #[serde(rename = "SE")]
    Sweden,
    #[serde(rename = "FI")]
    Finland,
}

impl Country {
    pub fn all() -> &'static [Country] {
        &[Country::Norway, Country::Sweden, Country::Finland]
    }

    /// Two-letter code used as area prefix (`NO`, `SE`, `FI`).
    pub fn code(&self) -> &'static str {
        match self {
            Country::Norway => "NO",
            Country::Sweden => "SE",
            Country::Finland => "FI",
        }
    }

    pub fn from_code(code: &str) -> N44Result<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NO" => Ok(Country::Norway),
            "SE" => Ok(Country::Sweden),
            "FI" => Ok(Country::Finland),
            other => Err(N44Error::Validation(format!(
                "unknown country code '{}'; supported values: NO, SE, FI",
                other
            ))),
        }
    }

    /// Country owning an area or link id, taken from its first two letters.
    pub fn of_area(area: &str) -> N44Result<Self> {
        let prefix = area.get(0..2).ok_or_else(|| {
            N44Error::Validation(format!("area id '{}' is too short for a country prefix", area))
        })?;
        Self::from_code(prefix)
    }

    /// File name prefix of the country's operating-data feed.
    pub fn feed_prefix(&self) -> &'static str {
        match self {
            Country::Norway => "pono",
            Country::Sweden => "pose",
            Country::Finland => "pofi",
        }
    }

    /// Directory of the country on the operating-data feed.
    pub fn feed_dir(&self) -> &'static str {
        match self {
            Country::Norway => "Norway",
            Country::Sweden => "Sweden",
            Country::Finland => "Finland",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Market quantity families published per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantityCode {
    /// Scheduled production
    #[serde(rename = "PS")]
    Production,
    /// Scheduled consumption (forecast balance)
    #[serde(rename = "FB")]
    Consumption,
    /// Scheduled cross-border exchange
    #[serde(rename = "UT")]
    Exchange,
}

impl QuantityCode {
    pub fn all() -> &'static [QuantityCode] {
        &[
            QuantityCode::Production,
            QuantityCode::Consumption,
            QuantityCode::Exchange,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            QuantityCode::Production => "PS",
            QuantityCode::Consumption => "FB",
            QuantityCode::Exchange => "UT",
        }
    }

    /// Sub-type letter the feed writes in the second field of a record.
    pub fn subtype(&self) -> &'static str {
        &self.code()[0..1]
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "PS" => Some(QuantityCode::Production),
            "FB" => Some(QuantityCode::Consumption),
            "UT" => Some(QuantityCode::Exchange),
            _ => None,
        }
    }

    /// Sheet family name used by the tabular files.
    pub fn family(&self) -> &'static str {
        match self {
            QuantityCode::Production => "Production",
            QuantityCode::Consumption => "Consumption",
            QuantityCode::Exchange => "Exchange",
        }
    }
}

impl fmt::Display for QuantityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How a source sequence was fitted into a [`HourlySeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFit {
    Exact,
    /// Fewer than 24 values; the trailing hours were set to zero.
    Padded { missing: usize },
    /// More than 24 values; the surplus was dropped.
    Truncated { extra: usize },
}

/// Normalize an area or link id as written by the different sources.
///
/// Spreadsheets write links as `"NO1 - SE3"`, the feed as `"NO1_SE3"`.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().replace(" - ", "_")
}

/// Fit a variable-length sequence into a full day.
pub fn fit_hours(values: &[f64]) -> (HourlySeries, SeriesFit) {
    let mut series = [0.0; HOURS];
    let n = values.len().min(HOURS);
    series[..n].copy_from_slice(&values[..n]);
    let fit = match values.len() {
        len if len == HOURS => SeriesFit::Exact,
        len if len < HOURS => SeriesFit::Padded {
            missing: HOURS - len,
        },
        len => SeriesFit::Truncated { extra: len - HOURS },
    };
    (series, fit)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataset {
    date: NaiveDate,
    data: BTreeMap<Country, BTreeMap<QuantityCode, SeriesMap>>,
}

impl MarketDataset {
    /// Empty dataset with every country and quantity present.
    pub fn new(date: NaiveDate) -> Self {
        let data = Country::all()
            .iter()
            .map(|country| {
                let codes = QuantityCode::all()
                    .iter()
                    .map(|code| (*code, SeriesMap::new()))
                    .collect();
                (*country, codes)
            })
            .collect();
        Self { date, data }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Store `values` under `(country, code, id)`, replacing any previous
    /// series. The id is normalized with [`normalize_id`].
    pub fn insert_series(
        &mut self,
        country: Country,
        code: QuantityCode,
        id: &str,
        values: &[f64],
    ) -> SeriesFit {
        let (series, fit) = fit_hours(values);
        self.series_mut(country, code).insert(normalize_id(id), series);
        fit
    }

    pub fn series(&self, country: Country, code: QuantityCode) -> &SeriesMap {
        self.data
            .get(&country)
            .and_then(|codes| codes.get(&code))
            .unwrap_or(&EMPTY_SERIES)
    }

    pub fn get(&self, country: Country, code: QuantityCode, id: &str) -> Option<&HourlySeries> {
        self.series(country, code).get(id)
    }

    /// Value of `id` at `hour`; `None` if the id is absent or the hour is out of range.
    pub fn value(&self, country: Country, code: QuantityCode, id: &str, hour: usize) -> Option<f64> {
        self.get(country, code, id)
            .and_then(|series| series.get(hour).copied())
    }

    pub fn ids(&self, country: Country, code: QuantityCode) -> impl Iterator<Item = &str> {
        self.series(country, code).keys().map(String::as_str)
    }

    /// Iterate over every leaf as `(country, code, id, series)`.
    pub fn iter(&self) -> impl Iterator<Item = (Country, QuantityCode, &str, &HourlySeries)> {
        self.data.iter().flat_map(|(country, codes)| {
            codes.iter().flat_map(move |(code, series)| {
                series
                    .iter()
                    .map(move |(id, values)| (*country, *code, id.as_str(), values))
            })
        })
    }

    /// Number of leaf series across all countries and quantities.
    pub fn len(&self) -> usize {
        self.data
            .values()
            .flat_map(|codes| codes.values())
            .map(|series| series.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn series_mut(&mut self, country: Country, code: QuantityCode) -> &mut SeriesMap {
        self.data
            .entry(country)
            .or_default()
            .entry(code)
            .or_default()
    }
}
