use std::path::Path;

use crate::error::SolverResult;
use crate::types::{
    AreaInterchange, AreaScaling, AreaTotals, BranchLoading, BusVoltage, LoadUpdate,
    MachineState, RatingClass, SolvedState,
};

/// External power-flow engine holding the working case.
///
/// The pipeline never computes a power flow itself: it pushes load,
/// interchange and scaling commands, asks for a solve and reads the solved
/// state back. Calls are blocking and strictly sequential.
pub trait GridSolver {
    /// Start the engine for cases of up to `max_buses` buses.
    fn initialize(&mut self, max_buses: usize) -> SolverResult<()>;

    /// Replace the working case with a saved case or RAW file.
    fn load_case(&mut self, path: &Path) -> SolverResult<()>;

    fn change_load(&mut self, update: &LoadUpdate) -> SolverResult<()>;

    fn set_area_interchange(&mut self, target: &AreaInterchange) -> SolverResult<()>;

    fn scale_area(&mut self, scaling: &AreaScaling) -> SolverResult<()>;

    /// Run the power flow. Non-convergence is not an error; query
    /// [`GridSolver::converged`] afterwards.
    fn solve(&mut self) -> SolverResult<()>;

    fn converged(&mut self) -> SolverResult<bool>;

    fn bus_voltages(&mut self) -> SolverResult<Vec<BusVoltage>>;

    fn area_totals(&mut self) -> SolverResult<Vec<AreaTotals>>;

    fn machines(&mut self) -> SolverResult<Vec<MachineState>>;

    fn branch_loading(&mut self, rating: RatingClass) -> SolverResult<Vec<BranchLoading>>;

    /// Write the working case as a RAW snapshot.
    fn write_snapshot(&mut self, path: &Path) -> SolverResult<()>;

    /// Save the working case so it can be reloaded with [`GridSolver::load_case`].
    fn save_case(&mut self, path: &Path) -> SolverResult<()>;

    fn close(&mut self) -> SolverResult<()>;

    /// Collect everything the post-solve checks need.
    fn solved_state(&mut self) -> SolverResult<SolvedState> {
        let mut state = SolvedState {
            voltages: self.bus_voltages()?,
            machines: self.machines()?,
            ..SolvedState::default()
        };
        for rating in RatingClass::all() {
            state
                .branch_loading
                .insert(*rating, self.branch_loading(*rating)?);
        }
        Ok(state)
    }
}
