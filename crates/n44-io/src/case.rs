//! Reader for solved-case snapshots in PSS/E RAW (v33) format.
//!
//! Only the quantities needed for record emission are extracted: bus voltage
//! magnitude and angle, machine and load power, and the winding ratios of
//! two-winding transformers. Sections after the transformer data are not read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

/// Number of header lines before the bus data.
const HEADER_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BusVoltage {
    /// Magnitude in pu
    pub vm: f64,
    /// Angle in degrees
    pub va: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerInjection {
    pub p: f64,
    pub q: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TapRatios {
    pub t1: f64,
    pub t2: f64,
}

/// Extracted contents of one snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaseData {
    /// File stem, used as record name
    pub name: String,
    pub buses: BTreeMap<u32, BusVoltage>,
    /// Keyed `<bus>_<id>`
    pub machines: BTreeMap<String, PowerInjection>,
    /// Keyed `<bus>_<id>`, total actual load at the solved voltage
    pub loads: BTreeMap<String, PowerInjection>,
    /// Keyed `<from>_<to>`
    pub trafos: BTreeMap<String, TapRatios>,
    /// Records that could not be read
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Bus,
    Load,
    FixedShunt,
    Generator,
    Branch,
    Transformer,
    Done,
}

impl Section {
    fn next(self) -> Self {
        match self {
            Section::Bus => Section::Load,
            Section::Load => Section::FixedShunt,
            Section::FixedShunt => Section::Generator,
            Section::Generator => Section::Branch,
            Section::Branch => Section::Transformer,
            Section::Transformer | Section::Done => Section::Done,
        }
    }
}

/// List the `.raw` files of a directory in name order. A file path is
/// returned as the only element.
pub fn list_snapshots(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("listing snapshots in {}", path.display()))?
    {
        let entry = entry?;
        let file = entry.path();
        let is_raw = file
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("raw"));
        if is_raw && file.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

pub fn read_case(path: &Path) -> Result<CaseData> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading PSSE RAW '{}'; ensure file exists", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("case")
        .to_string();
    Ok(parse_case(&name, &contents))
}

pub fn parse_case(name: &str, contents: &str) -> CaseData {
    let mut case = CaseData {
        name: name.to_string(),
        ..CaseData::default()
    };
    let mut section = Section::Bus;
    let mut lines = contents.lines().skip(HEADER_LINES);

    while let Some(line) = lines.next() {
        if section == Section::Done || line.trim_start().starts_with('Q') {
            break;
        }
        let tokens = tokenize(line);
        let Some(first) = tokens.first() else {
            continue;
        };
        if first == "0" {
            section = section.next();
            continue;
        }

        let parsed = match section {
            Section::Bus => parse_bus(&tokens).map(|(bus, voltage)| {
                case.buses.insert(bus, voltage);
            }),
            Section::Load => parse_load(&tokens, &case.buses).map(|(key, load)| {
                case.loads.insert(key, load);
            }),
            Section::Generator => parse_machine(&tokens).map(|(key, machine)| {
                case.machines.insert(key, machine);
            }),
            Section::Transformer => {
                let three_winding = field::<u32>(&tokens, 2).is_some_and(|k| k != 0);
                let rest: Vec<Vec<String>> = lines
                    .by_ref()
                    .take(if three_winding { 4 } else { 3 })
                    .map(tokenize)
                    .collect();
                if three_winding {
                    Some(())
                } else {
                    parse_two_winding(&tokens, &rest).map(|(key, ratios)| {
                        case.trafos.insert(key, ratios);
                    })
                }
            }
            Section::FixedShunt | Section::Branch => Some(()),
            Section::Done => None,
        };
        if parsed.is_none() {
            case.skipped += 1;
        }
    }

    debug!(
        case = %case.name,
        buses = case.buses.len(),
        machines = case.machines.len(),
        loads = case.loads.len(),
        trafos = case.trafos.len(),
        skipped = case.skipped,
        "parsed PSSE RAW"
    );
    case
}

fn parse_bus(tokens: &[String]) -> Option<(u32, BusVoltage)> {
    let bus = field::<u32>(tokens, 0)?;
    let vm = field(tokens, 7).unwrap_or(1.0);
    let va = field(tokens, 8).unwrap_or(0.0);
    Some((bus, BusVoltage { vm, va }))
}

fn parse_load(
    tokens: &[String],
    buses: &BTreeMap<u32, BusVoltage>,
) -> Option<(String, PowerInjection)> {
    let bus = field::<u32>(tokens, 0)?;
    let id = tokens.get(1)?.trim();
    let v = buses.get(&bus).map(|b| b.vm).unwrap_or(1.0);
    let value = |idx| field::<f64>(tokens, idx).unwrap_or(0.0);

    // constant power + constant current + constant admittance parts
    let p = value(5) + value(7) * v + value(9) * v * v;
    let q = value(6) + value(8) * v - value(10) * v * v;
    Some((format!("{}_{}", bus, id), PowerInjection { p, q }))
}

fn parse_machine(tokens: &[String]) -> Option<(String, PowerInjection)> {
    let bus = field::<u32>(tokens, 0)?;
    let id = tokens.get(1)?.trim();
    let p = field(tokens, 2).unwrap_or(0.0);
    let q = field(tokens, 3).unwrap_or(0.0);
    Some((format!("{}_{}", bus, id), PowerInjection { p, q }))
}

fn parse_two_winding(first: &[String], rest: &[Vec<String>]) -> Option<(String, TapRatios)> {
    let from = field::<u32>(first, 0)?;
    let to = field::<u32>(first, 1)?;
    let t1 = field(rest.get(1)?, 0)?;
    let t2 = field(rest.get(2)?, 0)?;
    Some((format!("{}_{}", from, to), TapRatios { t1, t2 }))
}

fn field<T: std::str::FromStr>(tokens: &[String], idx: usize) -> Option<T> {
    tokens.get(idx).and_then(|token| token.trim().parse().ok())
}

/// Split a RAW data line into fields.
///
/// Fields are separated by commas or blanks; quoted strings keep their
/// content and `/` outside quotes starts a comment.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut ended_by_blank = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                in_token = true;
            }
            '/' => break,
            ',' => {
                if in_token || !ended_by_blank {
                    tokens.push(std::mem::take(&mut current));
                }
                in_token = false;
                ended_by_blank = false;
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                    ended_by_blank = true;
                }
            }
            c => {
                current.push(c);
                in_token = true;
                ended_by_blank = false;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
