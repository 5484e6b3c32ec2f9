//! Modelica record files describing a solved case.
//!
//! Each category is written as one record block:
//!
//! ```text
//! record h0_after_PF_voltages
//!    extends Modelica.Icons.Record;
//! // Bus number 5500
//!    parameter Real V5500 = 1.020000;
//!    parameter Real A5500 = -3.100000;
//! end h0_after_PF_voltages;
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::case::CaseData;

/// One record category: file suffix, record suffix and per-entry layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Voltages,
    Machines,
    Loads,
    Trafos,
}

impl RecordKind {
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Voltages,
            RecordKind::Machines,
            RecordKind::Loads,
            RecordKind::Trafos,
        ]
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            RecordKind::Voltages => "Voltages",
            RecordKind::Machines => "Machines",
            RecordKind::Loads => "Loads",
            RecordKind::Trafos => "Trafos",
        }
    }

    fn record_suffix(&self) -> &'static str {
        match self {
            RecordKind::Voltages => "voltages",
            RecordKind::Machines => "machines",
            RecordKind::Loads => "loads",
            RecordKind::Trafos => "trafos",
        }
    }

    fn comment(&self) -> &'static str {
        match self {
            RecordKind::Voltages => "Bus number",
            RecordKind::Machines => "Machine",
            RecordKind::Loads => "Load",
            RecordKind::Trafos => "2WindingTrafo",
        }
    }

    fn prefixes(&self) -> (&'static str, &'static str) {
        match self {
            RecordKind::Voltages => ("V", "A"),
            RecordKind::Machines => ("P", "Q"),
            RecordKind::Loads => ("PL", "QL"),
            RecordKind::Trafos => ("t1_", "t2_"),
        }
    }

    /// `<case>_<Suffix>.mo`
    pub fn file_name(&self, case_name: &str) -> String {
        format!("{}_{}.mo", case_name, self.file_suffix())
    }
}

/// Render one record block of `case`.
pub fn render(case: &CaseData, kind: RecordKind) -> String {
    let entries: Vec<(String, f64, f64)> = match kind {
        RecordKind::Voltages => case
            .buses
            .iter()
            .map(|(bus, v)| (bus.to_string(), v.vm, v.va))
            .collect(),
        RecordKind::Machines => case
            .machines
            .iter()
            .map(|(key, m)| (key.clone(), m.p, m.q))
            .collect(),
        RecordKind::Loads => case
            .loads
            .iter()
            .map(|(key, l)| (key.clone(), l.p, l.q))
            .collect(),
        RecordKind::Trafos => case
            .trafos
            .iter()
            .map(|(key, t)| (key.clone(), t.t1, t.t2))
            .collect(),
    };

    let record = format!("{}_{}", case.name, kind.record_suffix());
    let (first, second) = kind.prefixes();
    let mut out = String::new();
    let _ = writeln!(out, "record {}", record);
    let _ = writeln!(out, "   extends Modelica.Icons.Record;");
    for (key, a, b) in entries {
        let _ = writeln!(out, "// {} {}", kind.comment(), key);
        let _ = writeln!(out, "   parameter Real {}{} = {:.6};", first, key, a);
        let _ = writeln!(out, "   parameter Real {}{} = {:.6};", second, key, b);
    }
    let _ = writeln!(out, "end {};", record);
    out
}

/// Write the four record files of `case` into `dir`.
pub fn write_records(case: &CaseData, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating record directory {}", dir.display()))?;
    let mut written = Vec::with_capacity(RecordKind::all().len());
    for kind in RecordKind::all() {
        let path = dir.join(kind.file_name(&case.name));
        fs::write(&path, render(case, *kind))
            .with_context(|| format!("writing record file {}", path.display()))?;
        written.push(path);
    }
    debug!(case = %case.name, dir = %dir.display(), "wrote record files");
    Ok(written)
}
