//! In-memory solver that records every command.
//!
//! Used as a stand-in for the power-flow engine: convergence per solve and
//! the solved state are scripted, snapshots and saved cases are written as
//! JSON command logs so the file layout of a run can be inspected.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::solver::GridSolver;
use crate::types::{
    AreaInterchange, AreaScaling, AreaTotals, BranchLoading, BusVoltage, Command, LoadUpdate,
    MachineState, RatingClass, SolvedState,
};

#[derive(Debug, Default)]
pub struct RecordingSolver {
    commands: Vec<Command>,
    /// Commands since the last case load, written by `write_snapshot`
    pending: Vec<Command>,
    convergence: VecDeque<bool>,
    last_converged: bool,
    solves: usize,
    fail_solve_at: Option<usize>,
    state: SolvedState,
    area_totals: Option<Vec<AreaTotals>>,
    interchange: BTreeMap<u32, f64>,
    scaling: BTreeMap<u32, AreaScaling>,
    loaded_cases: Vec<PathBuf>,
    initialized: bool,
    closed: bool,
}

impl RecordingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome of successive solves; solves beyond the script converge.
    pub fn with_convergence(mut self, script: impl IntoIterator<Item = bool>) -> Self {
        self.convergence = script.into_iter().collect();
        self
    }

    pub fn with_state(mut self, state: SolvedState) -> Self {
        self.state = state;
        self
    }

    /// Fixed area totals. Without them the totals echo the last scaling and
    /// interchange commands.
    pub fn with_area_totals(mut self, totals: Vec<AreaTotals>) -> Self {
        self.area_totals = Some(totals);
        self
    }

    /// Make the n-th solve call (0-based) fail with an engine error.
    pub fn fail_solve_at(mut self, call: usize) -> Self {
        self.fail_solve_at = Some(call);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn loaded_cases(&self) -> &[PathBuf] {
        &self.loaded_cases
    }

    pub fn solve_count(&self) -> usize {
        self.solves
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, command: Command) -> SolverResult<()> {
        if !self.initialized && !matches!(command, Command::Initialize { .. }) {
            return Err(SolverError::NotRunning);
        }
        debug!(cmd = command.name(), "recorded solver command");
        self.pending.push(command.clone());
        self.commands.push(command);
        Ok(())
    }

    fn write_log(&self, path: &Path) -> SolverResult<()> {
        let mut text = String::new();
        for command in &self.pending {
            text.push_str(&serde_json::to_string(command)?);
            text.push('\n');
        }
        fs::write(path, text)?;
        Ok(())
    }
}

impl GridSolver for RecordingSolver {
    fn initialize(&mut self, max_buses: usize) -> SolverResult<()> {
        self.record(Command::Initialize { max_buses })?;
        self.initialized = true;
        self.closed = false;
        Ok(())
    }

    fn load_case(&mut self, path: &Path) -> SolverResult<()> {
        self.record(Command::LoadCase {
            path: path.to_string_lossy().into_owned(),
        })?;
        if !path.is_file() {
            return Err(SolverError::Rejected {
                command: "load_case".into(),
                message: format!("case file {} not found", path.display()),
            });
        }
        self.pending.clear();
        self.loaded_cases.push(path.to_path_buf());
        Ok(())
    }

    fn change_load(&mut self, update: &LoadUpdate) -> SolverResult<()> {
        self.record(Command::ChangeLoad(update.clone()))
    }

    fn set_area_interchange(&mut self, target: &AreaInterchange) -> SolverResult<()> {
        self.interchange.insert(target.number, target.net);
        self.record(Command::SetAreaInterchange(target.clone()))
    }

    fn scale_area(&mut self, scaling: &AreaScaling) -> SolverResult<()> {
        self.scaling.insert(scaling.number, scaling.clone());
        self.record(Command::ScaleArea(scaling.clone()))
    }

    fn solve(&mut self) -> SolverResult<()> {
        self.record(Command::Solve)?;
        let call = self.solves;
        self.solves += 1;
        if self.fail_solve_at == Some(call) {
            return Err(SolverError::Rejected {
                command: "solve".into(),
                message: "scripted engine failure".into(),
            });
        }
        self.last_converged = self.convergence.pop_front().unwrap_or(true);
        Ok(())
    }

    fn converged(&mut self) -> SolverResult<bool> {
        self.record(Command::Converged)?;
        Ok(self.last_converged)
    }

    fn bus_voltages(&mut self) -> SolverResult<Vec<BusVoltage>> {
        self.record(Command::BusVoltages)?;
        Ok(self.state.voltages.clone())
    }

    fn area_totals(&mut self) -> SolverResult<Vec<AreaTotals>> {
        self.record(Command::AreaTotals)?;
        if let Some(totals) = &self.area_totals {
            return Ok(totals.clone());
        }
        let echoed = self
            .scaling
            .values()
            .map(|scaling| AreaTotals {
                number: scaling.number,
                generation: scaling.production,
                load: scaling.consumption,
                interchange: self.interchange.get(&scaling.number).copied().unwrap_or(0.0),
            })
            .collect();
        Ok(echoed)
    }

    fn machines(&mut self) -> SolverResult<Vec<MachineState>> {
        self.record(Command::Machines)?;
        Ok(self.state.machines.clone())
    }

    fn branch_loading(&mut self, rating: RatingClass) -> SolverResult<Vec<BranchLoading>> {
        self.record(Command::BranchLoading { rating })?;
        Ok(self.state.branches(rating).to_vec())
    }

    fn write_snapshot(&mut self, path: &Path) -> SolverResult<()> {
        self.record(Command::WriteSnapshot {
            path: path.to_string_lossy().into_owned(),
        })?;
        self.write_log(path)
    }

    fn save_case(&mut self, path: &Path) -> SolverResult<()> {
        self.record(Command::SaveCase {
            path: path.to_string_lossy().into_owned(),
        })?;
        self.write_log(path)
    }

    fn close(&mut self) -> SolverResult<()> {
        if self.initialized {
            self.record(Command::Close)?;
        }
        self.initialized = false;
        self.closed = true;
        Ok(())
    }
}
