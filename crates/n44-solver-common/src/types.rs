//! Commands sent to and states read back from the power-flow solver.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// New active/reactive demand of one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadUpdate {
    pub bus: u32,
    pub id: String,
    /// MW
    pub p: f64,
    /// Mvar
    pub q: f64,
}

/// Net interchange target of a control area, held by its swing bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaInterchange {
    pub number: u32,
    pub bus: u32,
    /// MW, positive = export
    pub net: f64,
    pub name: String,
}

/// Scale total generation and load of an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaScaling {
    pub number: u32,
    /// Total generation, MW
    pub production: f64,
    /// Total load, MW
    pub consumption: f64,
    /// Total reactive load, Mvar
    pub reactive: f64,
}

/// Post-solve totals of a control area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaTotals {
    pub number: u32,
    pub generation: f64,
    pub load: f64,
    pub interchange: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusVoltage {
    pub bus: u32,
    /// pu
    pub vm: f64,
}

/// Operating point and limits of a machine after a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    pub bus: u32,
    pub id: String,
    pub p: f64,
    pub q: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub qmin: f64,
    pub qmax: f64,
    /// Machine base, MVA
    pub mbase: f64,
}

impl MachineState {
    /// Apparent power, MVA.
    pub fn mva(&self) -> f64 {
        self.p.hypot(self.q)
    }
}

/// Branch thermal rating set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingClass {
    A,
    B,
    C,
}

impl RatingClass {
    pub fn all() -> &'static [RatingClass] {
        &[RatingClass::A, RatingClass::B, RatingClass::C]
    }
}

impl fmt::Display for RatingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RatingClass::A => "A",
            RatingClass::B => "B",
            RatingClass::C => "C",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchLoading {
    pub from: u32,
    pub to: u32,
    pub id: String,
    /// Percent of the rating
    pub percent: f64,
}

/// Everything the post-solve checks look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolvedState {
    pub voltages: Vec<BusVoltage>,
    pub machines: Vec<MachineState>,
    pub branch_loading: BTreeMap<RatingClass, Vec<BranchLoading>>,
}

impl SolvedState {
    pub fn branches(&self, rating: RatingClass) -> &[BranchLoading] {
        self.branch_loading
            .get(&rating)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One request line of the bridge protocol. The recording solver logs the
/// same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Initialize { max_buses: usize },
    LoadCase { path: String },
    ChangeLoad(LoadUpdate),
    SetAreaInterchange(AreaInterchange),
    ScaleArea(AreaScaling),
    Solve,
    Converged,
    BusVoltages,
    AreaTotals,
    Machines,
    BranchLoading { rating: RatingClass },
    WriteSnapshot { path: String },
    SaveCase { path: String },
    Close,
}

impl Command {
    /// Protocol name, e.g. `load_case`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::LoadCase { .. } => "load_case",
            Command::ChangeLoad(_) => "change_load",
            Command::SetAreaInterchange(_) => "set_area_interchange",
            Command::ScaleArea(_) => "scale_area",
            Command::Solve => "solve",
            Command::Converged => "converged",
            Command::BusVoltages => "bus_voltages",
            Command::AreaTotals => "area_totals",
            Command::Machines => "machines",
            Command::BranchLoading { .. } => "branch_loading",
            Command::WriteSnapshot { .. } => "write_snapshot",
            Command::SaveCase { .. } => "save_case",
            Command::Close => "close",
        }
    }
}

/// Reply line of the bridge protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
