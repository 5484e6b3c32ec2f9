//! Solver bridge running as a child process.
//!
//! The bridge wraps the actual power-flow engine and speaks a line protocol
//! over stdin/stdout: one JSON [`Command`] per request line, one JSON
//! [`Reply`] per response line. Logs go to stderr.
//!
//! ```text
//! n44 ──stdin──>  {"cmd":"solve"}            bridge
//!     <─stdout──  {"ok":true,"result":null}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command as Process, Stdio};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ExitCode, SolverError, SolverResult};
use crate::solver::GridSolver;
use crate::types::{
    AreaInterchange, AreaScaling, AreaTotals, BranchLoading, BusVoltage, Command, LoadUpdate,
    MachineState, RatingClass, Reply,
};

/// Bridge program looked up when none is configured.
pub const DEFAULT_BRIDGE: &str = "n44-psse-bridge";

struct Running {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct SubprocessSolver {
    program: PathBuf,
    args: Vec<String>,
    running: Option<Running>,
}

impl SubprocessSolver {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            running: None,
        }
    }

    /// Find a bridge program in standard locations.
    ///
    /// Search order:
    /// 1. ~/.n44/solvers/<name>
    /// 2. System PATH
    pub fn find_program(name: &str) -> SolverResult<PathBuf> {
        if let Some(home) = dirs::home_dir() {
            let candidate = home.join(".n44").join("solvers").join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        if let Ok(path) = which::which(name) {
            return Ok(path);
        }

        Err(SolverError::NotInstalled {
            program: name.to_string(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn spawn(&mut self) -> SolverResult<()> {
        let mut child = Process::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(SolverError::ProcessStart)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SolverError::Protocol("bridge stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SolverError::Protocol("bridge stdout not captured".into()))?;

        info!(program = %self.program.display(), pid = child.id(), "started solver bridge");
        self.running = Some(Running {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        });
        Ok(())
    }

    /// Send one command and decode the `result` of its reply.
    fn request<T: DeserializeOwned>(&mut self, command: Command) -> SolverResult<T> {
        let running = self.running.as_mut().ok_or(SolverError::NotRunning)?;

        let line = serde_json::to_string(&command)?;
        debug!(cmd = command.name(), "solver request");
        writeln!(running.stdin, "{}", line)?;
        running.stdin.flush()?;

        let mut response = String::new();
        if running.stdout.read_line(&mut response)? == 0 {
            return Err(SolverError::Protocol(format!(
                "bridge closed its output while handling '{}'",
                command.name()
            )));
        }

        let reply: Reply = serde_json::from_str(response.trim())?;
        if !reply.ok {
            return Err(SolverError::Rejected {
                command: command.name().to_string(),
                message: reply.error.unwrap_or_else(|| "no message".into()),
            });
        }
        Ok(serde_json::from_value(reply.result)?)
    }

    fn send(&mut self, command: Command) -> SolverResult<()> {
        self.request::<serde_json::Value>(command).map(|_| ())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl GridSolver for SubprocessSolver {
    fn initialize(&mut self, max_buses: usize) -> SolverResult<()> {
        if self.running.is_none() {
            self.spawn()?;
        }
        self.send(Command::Initialize { max_buses })
    }

    fn load_case(&mut self, path: &Path) -> SolverResult<()> {
        self.send(Command::LoadCase {
            path: path_string(path),
        })
    }

    fn change_load(&mut self, update: &LoadUpdate) -> SolverResult<()> {
        self.send(Command::ChangeLoad(update.clone()))
    }

    fn set_area_interchange(&mut self, target: &AreaInterchange) -> SolverResult<()> {
        self.send(Command::SetAreaInterchange(target.clone()))
    }

    fn scale_area(&mut self, scaling: &AreaScaling) -> SolverResult<()> {
        self.send(Command::ScaleArea(scaling.clone()))
    }

    fn solve(&mut self) -> SolverResult<()> {
        self.send(Command::Solve)
    }

    fn converged(&mut self) -> SolverResult<bool> {
        self.request(Command::Converged)
    }

    fn bus_voltages(&mut self) -> SolverResult<Vec<BusVoltage>> {
        self.request(Command::BusVoltages)
    }

    fn area_totals(&mut self) -> SolverResult<Vec<AreaTotals>> {
        self.request(Command::AreaTotals)
    }

    fn machines(&mut self) -> SolverResult<Vec<MachineState>> {
        self.request(Command::Machines)
    }

    fn branch_loading(&mut self, rating: RatingClass) -> SolverResult<Vec<BranchLoading>> {
        self.request(Command::BranchLoading { rating })
    }

    fn write_snapshot(&mut self, path: &Path) -> SolverResult<()> {
        self.send(Command::WriteSnapshot {
            path: path_string(path),
        })
    }

    fn save_case(&mut self, path: &Path) -> SolverResult<()> {
        self.send(Command::SaveCase {
            path: path_string(path),
        })
    }

    fn close(&mut self) -> SolverResult<()> {
        if self.running.is_none() {
            return Ok(());
        }
        let sent = self.send(Command::Close);
        let Some(Running { mut child, stdin, .. }) = self.running.take() else {
            return sent;
        };
        drop(stdin);
        let status = child.wait()?;
        let exit_code = ExitCode::from_raw(status.code().unwrap_or(-1));
        if !exit_code.is_success() {
            return Err(SolverError::ProcessFailed {
                exit_code,
                message: format!("bridge exited with {}", status),
            });
        }
        info!(program = %self.program.display(), "solver bridge closed");
        sent
    }
}

impl Drop for SubprocessSolver {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            warn!(program = %self.program.display(), "solver bridge not closed, killing it");
            let _ = running.child.kill();
            let _ = running.child.wait();
        }
    }
}
