//! # n44-io: Market feeds, market sheets and solved-case files
//!
//! ## Market data
//!
//! - [`nordpool`] - weekly `.sdv` operating-data feed, fetched over FTP
//!   ([`nordpool::FtpFeed`]) or from a local mirror ([`nordpool::DirectoryFeed`])
//! - [`tabular`] - one spreadsheet or CSV file per country and quantity
//! - [`sheets`] - writes a dataset back as xlsx workbooks in the tabular layout
//!
//! Both readers return an [`IngestResult`]: the dataset plus the warnings
//! raised while filling it. Missing values are zero-filled, never fatal.
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use n44_io::nordpool::{ingest_feed, DirectoryFeed};
//!
//! fn main() -> anyhow::Result<()> {
//!     let date = NaiveDate::from_ymd_opt(2016, 3, 4).unwrap();
//!     let mut mirror = DirectoryFeed::new("mirror");
//!     let result = ingest_feed(&mut mirror, date)?;
//!     println!("{} series, {}", result.dataset.len(), result.diagnostics.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Solved cases
//!
//! - [`case`] - PSS/E RAW v33 snapshot reader
//! - [`record`] - Modelica record emission

pub mod case;
pub mod ingest;
pub mod nordpool;
pub mod record;
pub mod sheets;
pub mod tabular;

pub use case::{list_snapshots, read_case, CaseData};
pub use ingest::IngestResult;
pub use nordpool::{ingest_feed, DirectoryFeed, FeedLocation, FeedSource, FtpFeed};
pub use record::{write_records, RecordKind};
pub use sheets::{write_market_sheets, SHEET_EXTENSION};
pub use tabular::{ingest_tabular, TabularSet};
