//! Run configuration.
//!
//! Stored as TOML; every section and field is optional and falls back to the
//! defaults below.
//!
//! ```toml
//! [feed]
//! source = "ftp"
//! user = "operator"
//!
//! [solver]
//! kind = "subprocess"
//! base_case = "N44_BC.sav"
//!
//! [output]
//! root = "runs"
//! write_records = true
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use n44_algo::{LimitConfig, DEFAULT_MAX_BUSES};
use n44_core::{N44Error, N44Result};
use n44_io::nordpool::{DEFAULT_FTP_HOST, DEFAULT_FTP_PORT};
use n44_io::SHEET_EXTENSION;

/// Environment variable overriding `feed.password`.
pub const PASSWORD_ENV: &str = "N44_FEED_PASSWORD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub feed: FeedConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub limits: LimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSourceKind {
    /// Remote operating-data feed
    #[default]
    Ftp,
    /// Local mirror of the feed layout
    Directory,
    /// Market sheets, one directory per day
    Tabular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub source: FeedSourceKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Mirror root for `directory`, sheet root for `tabular`
    pub dir: Option<PathBuf>,
    /// Sheet file extension for `tabular`
    pub extension: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: FeedSourceKind::Ftp,
            host: DEFAULT_FTP_HOST.to_string(),
            port: DEFAULT_FTP_PORT,
            user: String::new(),
            password: None,
            dir: None,
            extension: SHEET_EXTENSION.to_string(),
        }
    }
}

impl FeedConfig {
    /// Password from [`PASSWORD_ENV`] if set, else the configured one.
    pub fn resolved_password(&self) -> Option<String> {
        env::var(PASSWORD_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| self.password.clone())
    }

    /// Directory of a `directory` or `tabular` source.
    pub fn require_dir(&self) -> N44Result<&Path> {
        self.dir.as_deref().ok_or_else(|| {
            N44Error::Config(format!(
                "feed source '{}' needs feed.dir",
                self.source.as_str()
            ))
        })
    }
}

impl FeedSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSourceKind::Ftp => "ftp",
            FeedSourceKind::Directory => "directory",
            FeedSourceKind::Tabular => "tabular",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Bridge program speaking the JSON-lines protocol
    #[default]
    Subprocess,
    /// In-memory stand-in, every hour converges
    Recording,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Bridge program; looked up in ~/.n44/solvers and PATH when unset
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub max_buses: usize,
    pub base_case: PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::Subprocess,
            program: None,
            args: Vec::new(),
            max_buses: DEFAULT_MAX_BUSES,
            base_case: PathBuf::from("N44_BC.sav"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: PathBuf,
    /// Emit Modelica records for every snapshot of a day
    pub write_records: bool,
    pub write_market_sheets: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            write_records: false,
            write_market_sheets: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load a run configuration. Unreadable or malformed files fail with
/// [`N44Error::Config`].
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        N44Error::Config(format!("reading run config '{}': {}", path.display(), err))
    })?;
    let config: RunConfig = toml::from_str(&contents).map_err(|err| {
        N44Error::Config(format!("parsing run config '{}': {}", path.display(), err))
    })?;
    Ok(config)
}

pub fn save_run_config(path: &Path, config: &RunConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory '{}'", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("serializing run config to TOML")?;
    fs::write(path, contents)
        .with_context(|| format!("writing run config '{}'", path.display()))?;
    Ok(())
}

/// Parse a `YYYY-MM-DD` target date.
pub fn parse_date(text: &str) -> N44Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| N44Error::InvalidDate(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.feed.host, "ftp.nordpoolspot.com");
        assert_eq!(config.solver.max_buses, 50_000);
        assert_eq!(config.limits.vmax, 1.05);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections() {
        let toml = r#"
            [feed]
            source = "directory"
            dir = "mirror"

            [solver]
            kind = "recording"

            [limits]
            branch_limit = 90.0
        "#;
        let config: RunConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.feed.source, FeedSourceKind::Directory);
        assert_eq!(config.feed.require_dir().unwrap(), Path::new("mirror"));
        assert_eq!(config.feed.port, 21);
        assert_eq!(config.solver.kind, SolverKind::Recording);
        assert_eq!(config.limits.branch_limit, 90.0);
        assert_eq!(config.limits.vmin, 0.95);
        assert!(config.output.write_market_sheets);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("n44.toml");
        let mut config = RunConfig::default();
        config.output.root = PathBuf::from("/data/n44");
        config.output.write_records = true;
        config.solver.args = vec!["--quiet".into()];
        save_run_config(&path, &config).unwrap();
        assert_eq!(load_run_config(&path).unwrap(), config);
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n44.toml");
        fs::write(&path, "[solver]\nmax_buses = \"many\"\n").unwrap();
        let err = load_run_config(&path).unwrap_err();
        let typed = err.downcast_ref::<N44Error>().unwrap();
        assert!(matches!(typed, N44Error::Config(_)));
        assert!(typed.is_fatal());
    }

    #[test]
    fn tabular_source_needs_dir() {
        let feed = FeedConfig {
            source: FeedSourceKind::Tabular,
            ..FeedConfig::default()
        };
        assert!(matches!(feed.require_dir(), Err(N44Error::Config(_))));
    }

    #[test]
    fn dates() {
        assert_eq!(
            parse_date("2016-03-04").unwrap(),
            NaiveDate::from_ymd_opt(2016, 3, 4).unwrap()
        );
        assert!(matches!(parse_date("2016-13-01"), Err(N44Error::InvalidDate(_))));
        assert!(matches!(parse_date("04.03.2016"), Err(N44Error::InvalidDate(_))));
    }
}
