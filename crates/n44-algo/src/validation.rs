//! Post-solve limit checks.
//!
//! The checks are advisory: a violation never stops the hourly loop, it only
//! lands as a flag in the summary report.

use std::fmt;

use serde::{Deserialize, Serialize};

use n44_solver_common::{RatingClass, SolvedState};

/// Thresholds applied to a solved state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Lowest acceptable bus voltage, pu
    pub vmin: f64,
    /// Highest acceptable bus voltage, pu
    pub vmax: f64,
    /// Branch loading in percent of the rating counted as overloaded
    pub branch_limit: f64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            vmin: 0.95,
            vmax: 1.05,
            branch_limit: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Violation {
    BusVoltage,
    GeneratorActivePower,
    GeneratorReactivePower,
    GeneratorOverload,
    BranchOverload(RatingClass),
}

impl Violation {
    /// Flag text written to the summary report.
    pub fn message(&self) -> &'static str {
        match self {
            Violation::BusVoltage => "Bus voltage problem",
            Violation::GeneratorActivePower => "Generator active power output problem",
            Violation::GeneratorReactivePower => "Generator reactive power output problem",
            Violation::GeneratorOverload => "Generator overloading problem",
            Violation::BranchOverload(RatingClass::A) => "Branch overloading problem (Rate A)",
            Violation::BranchOverload(RatingClass::B) => "Branch overloading problem (Rate B)",
            Violation::BranchOverload(RatingClass::C) => "Branch overloading problem (Rate C)",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Check a solved state against the default limits.
pub fn validate(state: &SolvedState) -> Vec<Violation> {
    validate_with(state, &LimitConfig::default())
}

/// Check a solved state. Each kind of violation is reported at most once, in
/// a fixed order: voltage, generator P, Q and loading, then branch ratings
/// A, B and C.
pub fn validate_with(state: &SolvedState, limits: &LimitConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    if state
        .voltages
        .iter()
        .any(|bus| bus.vm < limits.vmin || bus.vm > limits.vmax)
    {
        violations.push(Violation::BusVoltage);
    }

    let machines = &state.machines;
    if machines.iter().any(|m| m.p <= m.pmin || m.p >= m.pmax) {
        violations.push(Violation::GeneratorActivePower);
    }
    if machines.iter().any(|m| m.q <= m.qmin || m.q >= m.qmax) {
        violations.push(Violation::GeneratorReactivePower);
    }
    if machines.iter().any(|m| m.mva() >= m.mbase) {
        violations.push(Violation::GeneratorOverload);
    }

    for rating in RatingClass::all() {
        if state
            .branches(*rating)
            .iter()
            .any(|branch| branch.percent >= limits.branch_limit)
        {
            violations.push(Violation::BranchOverload(*rating));
        }
    }

    violations
}
