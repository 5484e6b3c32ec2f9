//! Diagnostics collected while ingesting market data and running the hourly
//! loop.
//!
//! Missing market values never stop a run: they are zero-filled and recorded
//! here. [`Diagnostics`] is the in-memory collection returned by the readers;
//! [`WarningLog`] additionally appends every warning to a plain-text file so
//! operators can inspect data-quality problems after the fact.
//!
//! # Example
//!
//! ```
//! use n44_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("missing-data", "no UT value, filled with zero", "SE3_FI");
//! diag.add_warning_at_hour("missing-data", "no FB value, filled with zero", "NO1", 7);
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.issues_by_category("missing-data").count(), 2);
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but operation continued (e.g., zero-filled value)
    Warning,
    /// Could not complete element/operation (e.g., malformed record)
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "missing-data", "parse")
    pub category: String,
    pub message: String,
    /// Line number for file-based operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Hour of the day (0-based) the issue refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<usize>,
    /// Entity reference (e.g., "SE3_FI", "Bus 3020")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            line: None,
            hour: None,
            entity: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_hour(mut self, hour: usize) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(hour) = self.hour {
            write!(f, " at hour {}", hour)?;
        }
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for an operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_at_line(&mut self, category: &str, message: &str, line: usize) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_line(line));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_warning_at_hour(&mut self, category: &str, message: &str, entity: &str, hour: usize) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Warning, category, message)
                .with_entity(entity)
                .with_hour(hour),
        );
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// Warning sink for the hourly loop.
///
/// Every warning is emitted through `tracing`, kept in memory and, when a
/// file is attached, appended to it as one line. A failing append is logged
/// and otherwise ignored: the warning itself is still counted.
#[derive(Debug, Default)]
pub struct WarningLog {
    diagnostics: Diagnostics,
    file: Option<PathBuf>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append warnings to `path` as they arrive.
    pub fn with_file(path: impl AsRef<Path>) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            file: Some(path.as_ref().to_path_buf()),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Record that `entity` had no value at `hour` and zero was used.
    pub fn missing_data(&mut self, entity: &str, hour: usize) {
        let message = format!("Missing data for {} at hour {}", entity, hour);
        warn!(entity, hour, "missing market data, filling in zero");
        self.append_line(&message);
        self.diagnostics
            .add_warning_at_hour("missing-data", "missing market data, filled with zero", entity, hour);
    }

    /// Record a free-form warning.
    pub fn warn(&mut self, category: &str, message: &str) {
        warn!(category, "{}", message);
        self.append_line(message);
        self.diagnostics.add_warning(category, message);
    }

    pub fn count(&self) -> usize {
        self.diagnostics.warning_count()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn append_line(&self, line: &str) {
        let Some(path) = &self.file else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "could not append to warning log");
        }
    }
}
