//! Operating-data feed of the Nordic power exchange.
//!
//! Each country publishes one semicolon-delimited `.sdv` file per ISO week:
//!
//! ```text
//! PS;P;...;...;<weekday>;...;<area id>;<h0>;<h1>;...;<h23>
//! ```
//!
//! Only records of the target weekday with one of the quantity codes
//! (`PS`/`P`, `FB`/`F`, `UT`/`U`) are kept. Files are reached through a
//! [`FeedSource`], either the remote FTP server or a local mirror with the
//! same directory layout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use n44_core::{Country, Diagnostics, MarketDataset, N44Error, QuantityCode};
use suppaftp::FtpStream;
use tracing::{debug, info};

use crate::ingest::{insert_checked, parse_value, IngestResult};

pub const DEFAULT_FTP_HOST: &str = "ftp.nordpoolspot.com";
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Root directory of the operating data on the feed.
const FEED_ROOT: &str = "Operating_data";

/// Files before this year live in a per-year subdirectory.
const ARCHIVE_LAYOUT_BEFORE: i32 = 2016;

/// Where the records of a target date are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLocation {
    /// Year used in the file name and archive directory
    pub year: i32,
    /// ISO week
    pub week: u32,
    /// Monday = 1
    pub weekday: u32,
    archived: bool,
}

impl FeedLocation {
    /// The first days of January can belong to ISO week 53; those records
    /// are published in the file of the previous year.
    ///
    /// The rule applies to every week-53 date, so late-December dates of a
    /// 53-week year also resolve one year back: 2020-12-31 reads
    /// `pose1953.sdv`.
    pub fn for_date(date: NaiveDate) -> Self {
        let week = date.iso_week().week();
        let year = if week == 53 {
            date.year() - 1
        } else {
            date.year()
        };
        Self {
            year,
            week,
            weekday: date.weekday().number_from_monday(),
            archived: date.year() < ARCHIVE_LAYOUT_BEFORE,
        }
    }

    /// `<prefix><YY><WW>.sdv`, e.g. `pose1609.sdv`.
    pub fn file_name(&self, country: Country) -> String {
        format!(
            "{}{:02}{:02}.sdv",
            country.feed_prefix(),
            self.year.rem_euclid(100),
            self.week
        )
    }

    /// Path relative to the feed root, e.g. `Operating_data/Sweden/pose1609.sdv`.
    pub fn remote_path(&self, country: Country) -> String {
        if self.archived {
            format!(
                "{}/{}/{}/{}",
                FEED_ROOT,
                country.feed_dir(),
                self.year,
                self.file_name(country)
            )
        } else {
            format!(
                "{}/{}/{}",
                FEED_ROOT,
                country.feed_dir(),
                self.file_name(country)
            )
        }
    }
}

/// Anything that can hand out the raw text of a feed file.
pub trait FeedSource {
    fn fetch(&mut self, location: &FeedLocation, country: Country) -> Result<String>;
}

/// Remote FTP feed. The connection is opened on first use and reused for
/// every country of the run.
pub struct FtpFeed {
    host: String,
    port: u16,
    user: String,
    password: String,
    stream: Option<FtpStream>,
}

impl FtpFeed {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_FTP_HOST.to_string(),
            port: DEFAULT_FTP_PORT,
            user: user.into(),
            password: password.into(),
            stream: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn connected(&mut self) -> Result<&mut FtpStream> {
        if self.stream.is_none() {
            let address = format!("{}:{}", self.host, self.port);
            let mut stream = FtpStream::connect(&address)
                .with_context(|| format!("connecting to market feed {}", address))?;
            stream
                .login(&self.user, &self.password)
                .map_err(|err| N44Error::Authentication {
                    host: self.host.clone(),
                    message: err.to_string(),
                })?;
            info!(host = %self.host, user = %self.user, "logged in to market feed");
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .context("market feed connection not available")
    }

    /// Log out and drop the connection. Errors on quit are ignored.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.quit();
        }
    }
}

impl FeedSource for FtpFeed {
    fn fetch(&mut self, location: &FeedLocation, country: Country) -> Result<String> {
        let path = location.remote_path(country);
        let host = self.host.clone();
        let stream = self.connected()?;
        debug!(%host, %path, "retrieving feed file");
        let bytes = stream
            .retr_as_buffer(&path)
            .with_context(|| format!("retrieving '{}' from {}", path, host))?
            .into_inner();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for FtpFeed {
    fn drop(&mut self) {
        self.close();
    }
}

/// Local mirror of the feed with the same relative paths.
#[derive(Debug, Clone)]
pub struct DirectoryFeed {
    root: PathBuf,
}

impl DirectoryFeed {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, location: &FeedLocation, country: Country) -> PathBuf {
        self.root.join(location.remote_path(country))
    }
}

impl FeedSource for DirectoryFeed {
    fn fetch(&mut self, location: &FeedLocation, country: Country) -> Result<String> {
        let path = self.path_for(location, country);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("reading feed file '{}'", path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Parse the records of one country's feed file for `weekday` into `dataset`.
///
/// Returns the number of records stored.
pub fn parse_sdv(
    text: &str,
    weekday: u32,
    country: Country,
    dataset: &mut MarketDataset,
    diagnostics: &mut Diagnostics,
) -> usize {
    let weekday = weekday.to_string();
    let mut stored = 0;

    for (line_no, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() <= 3 || fields.get(4).map(|f| f.trim()) != Some(weekday.as_str()) {
            continue;
        }
        let Some(code) = QuantityCode::from_code(fields[0]) else {
            continue;
        };
        if fields[1].trim() != code.subtype() {
            continue;
        }
        let Some(id) = fields.get(6).map(|f| f.trim()).filter(|f| !f.is_empty()) else {
            diagnostics.add_warning_at_line("parse", "record without area id", line_no + 1);
            continue;
        };

        let mut values = Vec::with_capacity(24);
        for raw in fields.iter().skip(7).filter(|f| !f.trim().is_empty()) {
            match parse_value(raw) {
                Some(value) => values.push(value),
                None => {
                    diagnostics.add_warning_at_line(
                        "parse",
                        &format!("unreadable value '{}' for {}, filled with zero", raw.trim(), id),
                        line_no + 1,
                    );
                    values.push(0.0);
                }
            }
        }

        insert_checked(dataset, diagnostics, country, code, id, &values);
        stored += 1;
    }

    stored
}

/// Build the dataset of `date` from the feed files of all three countries.
pub fn ingest_feed(source: &mut dyn FeedSource, date: NaiveDate) -> Result<IngestResult> {
    let location = FeedLocation::for_date(date);
    let mut dataset = MarketDataset::new(date);
    let mut diagnostics = Diagnostics::new();

    for country in Country::all() {
        let text = source.fetch(&location, *country).with_context(|| {
            format!(
                "fetching {} market data for {}",
                country,
                location.file_name(*country)
            )
        })?;
        let stored = parse_sdv(&text, location.weekday, *country, &mut dataset, &mut diagnostics);
        info!(%country, file = %location.file_name(*country), records = stored, "parsed feed file");
        if stored == 0 {
            diagnostics.add_warning_with_entity(
                "missing-data",
                &format!("no records for weekday {}", location.weekday),
                &location.file_name(*country),
            );
        }
    }

    Ok(IngestResult::new(dataset, diagnostics))
}
