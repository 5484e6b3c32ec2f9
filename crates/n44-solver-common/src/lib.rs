//! Interface to the external power-flow solver.
//!
//! The N44 pipeline prepares inputs and interprets outputs; the power flow
//! itself, case loading and network queries live in an external engine
//! reached through the [`GridSolver`] trait.
//!
//! # Implementations
//!
//! | Type | Use |
//! |------|-----|
//! | [`SubprocessSolver`] | Bridge program speaking JSON lines over stdin/stdout |
//! | [`RecordingSolver`] | In-memory stand-in with scripted convergence |
//!
//! ```text
//! n44 ──stdin──> bridge ──> power-flow engine
//!     <─stdout──
//! ```

pub mod error;
pub mod recording;
pub mod solver;
pub mod subprocess;
pub mod types;

pub use error::{ExitCode, SolverError, SolverResult};
pub use recording::RecordingSolver;
pub use solver::GridSolver;
pub use subprocess::{SubprocessSolver, DEFAULT_BRIDGE};
pub use types::{
    AreaInterchange, AreaScaling, AreaTotals, BranchLoading, BusVoltage, Command, LoadUpdate,
    MachineState, RatingClass, Reply, SolvedState,
};
