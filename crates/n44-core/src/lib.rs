//! # n44-core: Market data model for the Nordic 44-bus pipeline
//!
//! Holds one day of Nordic day-ahead market schedules and the static mapping
//! from market areas onto the N44 transmission model.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use n44_core::*;
//!
//! let date = NaiveDate::from_ymd_opt(2016, 3, 4).unwrap();
//! let mut dataset = MarketDataset::new(date);
//! dataset.insert_series(Country::Sweden, QuantityCode::Exchange, "SE3_FI", &[100.0; 24]);
//!
//! let se3_fi = exchange_loads().iter().find(|e| e.bus == 3020).unwrap();
//! let hit = se3_fi
//!     .lookup()
//!     .resolve(dataset.series(Country::Sweden, QuantityCode::Exchange), 0)
//!     .unwrap();
//! assert_eq!(hit.value, 100.0);
//! ```
//!
//! ## Modules
//!
//! - [`dataset`] - `Country -> QuantityCode -> id -> [f64; 24]` market data
//! - [`mapping`] - Area and exchange-load tables, link flipping, tiered lookup
//! - [`power`] - Rounding and power-factor conversions
//! - [`diagnostics`] - Warnings collected during ingestion and the hourly loop
//! - [`error`] - [`N44Error`] and [`N44Result`]

pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod mapping;
pub mod power;

pub use dataset::{
    fit_hours, normalize_id, Country, HourlySeries, MarketDataset, QuantityCode, SeriesFit,
    SeriesMap, HOURS,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity, WarningLog};
pub use error::{N44Error, N44Result};
pub use mapping::{
    area, areas, exchange_loads, flip_link, AreaRecord, ExchangeLoad, LinkKind, Resolved, TieredLookup,
    DEFAULT_POWER_FACTOR,
};
pub use power::{reactive_power, round_to, ROUND_DIGITS};
