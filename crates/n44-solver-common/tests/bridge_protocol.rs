#![cfg(unix)]

use std::fs;
use std::path::Path;

use n44_solver_common::{GridSolver, LoadUpdate, SolverError, SubprocessSolver};

const BRIDGE: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"cmd":"bus_voltages"'*) echo '{"ok":true,"result":[{"bus":5500,"vm":1.02}]}' ;;
    *'"cmd":"converged"'*) echo '{"ok":true,"result":true}' ;;
    *'"cmd":"load_case"'*) echo '{"ok":false,"error":"no such case"}' ;;
    *'"cmd":"close"'*) echo '{"ok":true}'; exit 0 ;;
    *) echo '{"ok":true}' ;;
  esac
done
"#;

fn bridge(dir: &Path) -> SubprocessSolver {
    let script = dir.join("bridge.sh");
    fs::write(&script, BRIDGE).unwrap();
    SubprocessSolver::new("sh", vec![script.to_string_lossy().into_owned()])
}

#[test]
fn round_trip_over_stdio() {
    let dir = tempfile::tempdir().unwrap();
    let mut solver = bridge(dir.path());

    solver.initialize(50_000).unwrap();
    assert!(solver.is_running());
    solver
        .change_load(&LoadUpdate {
            bus: 3020,
            id: "1".into(),
            p: -100.0,
            q: -32.8684,
        })
        .unwrap();
    solver.solve().unwrap();
    assert!(solver.converged().unwrap());

    let voltages = solver.bus_voltages().unwrap();
    assert_eq!(voltages.len(), 1);
    assert_eq!(voltages[0].bus, 5500);

    solver.close().unwrap();
    assert!(!solver.is_running());
}

#[test]
fn rejected_command_carries_message() {
    let dir = tempfile::tempdir().unwrap();
    let mut solver = bridge(dir.path());
    solver.initialize(100).unwrap();

    let err = solver.load_case(Path::new("missing.sav")).unwrap_err();
    match err {
        SolverError::Rejected { command, message } => {
            assert_eq!(command, "load_case");
            assert_eq!(message, "no such case");
        }
        other => panic!("unexpected error: {other}"),
    }
    solver.close().unwrap();
}
