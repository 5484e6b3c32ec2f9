//! Hourly update engine.
//!
//! Drives the external solver through the 24 hours of one market day. Each
//! hour pushes the exchange loads, the area interchange targets and the area
//! scaling, writes a snapshot, solves and records the outcome in the
//! [`SummaryReport`]. A converged hour becomes the base of the next one; after
//! a non-converged hour the last known-good case is reloaded.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use n44_core::{
    areas, exchange_loads, reactive_power, AreaRecord, Country, Diagnostics, HourlySeries,
    MarketDataset, N44Error, QuantityCode, SeriesMap, TieredLookup, WarningLog, HOURS,
};
use n44_solver_common::{AreaInterchange, AreaScaling, GridSolver, LoadUpdate};

use crate::report::{SummaryReport, SUMMARY_FILE};
use crate::validation::{validate_with, LimitConfig, Violation};

/// Case the solved state is saved to between hours.
pub const TEMP_CASE: &str = "temp.sav";
/// Warning log of a day, next to the snapshots.
pub const WARNINGS_FILE: &str = "warnings.txt";
/// Bus capacity requested from the solver.
pub const DEFAULT_MAX_BUSES: usize = 50_000;

pub fn before_snapshot(hour: usize) -> String {
    format!("h{}_before_PF.raw", hour)
}

pub fn after_snapshot(hour: usize) -> String {
    format!("h{}_after_PF.raw", hour)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourResult {
    pub hour: usize,
    pub converged: bool,
    /// Empty for non-converged hours; the validator only runs on solved cases
    pub violations: Vec<Violation>,
    pub before_snapshot: PathBuf,
    pub after_snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DayOutcome {
    pub hours: Vec<HourResult>,
    pub report: SummaryReport,
    /// Missing market values and other problems met during the loop
    pub warnings: Diagnostics,
    pub warning_count: usize,
    pub converged_hours: usize,
    pub summary_path: PathBuf,
}

impl DayOutcome {
    pub fn failed_hours(&self) -> impl Iterator<Item = usize> + '_ {
        self.hours.iter().filter(|h| !h.converged).map(|h| h.hour)
    }
}

/// Net interchange of an area and the links that had no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Interchange {
    pub net: f64,
    pub missing: Vec<String>,
}

/// Positive links minus negative links, each looked up as published or
/// flipped with inverted sign. Links found under neither id count as zero.
pub fn net_interchange(exchange: &SeriesMap, area: &AreaRecord, hour: usize) -> Interchange {
    let mut interchange = Interchange {
        net: 0.0,
        missing: Vec::new(),
    };
    let terms = area
        .positive
        .iter()
        .map(|link| (link, 1.0))
        .chain(area.negative.iter().map(|link| (link, -1.0)));
    for (link, sign) in terms {
        match TieredLookup::canonical_or_flipped(link).resolve(exchange, hour) {
            Some(hit) => interchange.net += sign * hit.value,
            None => interchange.missing.push(link.to_string()),
        }
    }
    interchange
}

/// Runs one market day against a solver.
///
/// The solver is borrowed mutably for the whole day and the dataset is never
/// modified: consumption netting of exchange loads is kept in an overlay.
pub struct HourlyUpdateEngine<'a> {
    solver: &'a mut dyn GridSolver,
    dataset: &'a MarketDataset,
    base_case: PathBuf,
    output_dir: PathBuf,
    max_buses: usize,
    limits: LimitConfig,
    warnings: WarningLog,
    /// Exchange values added to an area's scheduled consumption, per hour
    netting: BTreeMap<&'static str, HourlySeries>,
}

impl<'a> HourlyUpdateEngine<'a> {
    pub fn new(
        solver: &'a mut dyn GridSolver,
        dataset: &'a MarketDataset,
        base_case: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let output_dir = output_dir.into();
        Self {
            solver,
            dataset,
            base_case: base_case.into(),
            warnings: WarningLog::with_file(output_dir.join(WARNINGS_FILE)),
            output_dir,
            max_buses: DEFAULT_MAX_BUSES,
            limits: LimitConfig::default(),
            netting: BTreeMap::new(),
        }
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_buses(mut self, max_buses: usize) -> Self {
        self.max_buses = max_buses;
        self
    }

    /// Replace the warning log, e.g. to keep appending to one already used
    /// during ingestion.
    pub fn with_warning_log(mut self, warnings: WarningLog) -> Self {
        self.warnings = warnings;
        self
    }

    /// Update, solve and validate hours 0..23, then flush the summary report.
    ///
    /// Solver start-up and base-case loading fail with [`N44Error::Solver`].
    /// Any other solver error aborts the day with the hour as context.
    pub fn run(mut self) -> Result<DayOutcome> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("creating output directory {}", self.output_dir.display())
        })?;
        info!(
            date = %self.dataset.date(),
            base_case = %self.base_case.display(),
            "starting hourly update"
        );

        self.solver.initialize(self.max_buses).map_err(|err| {
            N44Error::Solver(format!("failed to initialize solver: {}", err))
        })?;
        if let Err(err) = self.solver.load_case(&self.base_case) {
            self.close_quietly();
            return Err(N44Error::Solver(format!(
                "failed to load base case {}: {}",
                self.base_case.display(),
                err
            ))
            .into());
        }

        let mut report = SummaryReport::new();
        let hours = match self.run_hours(&mut report) {
            Ok(hours) => hours,
            Err(err) => {
                self.close_quietly();
                if let Err(cleanup) = self.remove_temp_case() {
                    warn!(error = %cleanup, "removing scratch case after failure");
                }
                return Err(err);
            }
        };
        self.solver.close().context("closing solver")?;
        self.remove_temp_case()?;

        let summary_path = self.output_dir.join(SUMMARY_FILE);
        report.flush(&summary_path)?;

        let converged_hours = hours.iter().filter(|h| h.converged).count();
        let warnings = self.warnings.into_diagnostics();
        info!(
            date = %self.dataset.date(),
            converged_hours,
            warnings = warnings.warning_count(),
            "hourly update finished"
        );

        Ok(DayOutcome {
            warning_count: warnings.warning_count(),
            warnings,
            hours,
            report,
            converged_hours,
            summary_path,
        })
    }

    fn run_hours(&mut self, report: &mut SummaryReport) -> Result<Vec<HourResult>> {
        let temp = self.output_dir.join(TEMP_CASE);
        let mut last_good = self.base_case.clone();
        let mut hours = Vec::with_capacity(HOURS);

        for hour in 0..HOURS {
            let result = self
                .run_hour(hour, report, &temp)
                .with_context(|| format!("solver failed during hour {}", hour))?;
            if result.converged {
                last_good = temp.clone();
            } else {
                self.solver.load_case(&last_good).with_context(|| {
                    format!(
                        "reloading {} after hour {}",
                        last_good.display(),
                        hour
                    )
                })?;
            }
            hours.push(result);
        }
        Ok(hours)
    }

    fn run_hour(
        &mut self,
        hour: usize,
        report: &mut SummaryReport,
        temp: &Path,
    ) -> Result<HourResult> {
        info!(hour, "updating hour");
        report.write_hour_headers(hour);

        self.push_exchange_loads(hour, report)?;
        self.push_areas(hour, report)?;

        let before = self.output_dir.join(before_snapshot(hour));
        self.solver.write_snapshot(&before)?;
        self.solver.solve()?;

        if !self.solver.converged()? {
            warn!(hour, "power flow did not converge");
            report.record_convergence(hour, false);
            return Ok(HourResult {
                hour,
                converged: false,
                violations: Vec::new(),
                before_snapshot: before,
                after_snapshot: None,
            });
        }
        report.record_convergence(hour, true);

        let after = self.output_dir.join(after_snapshot(hour));
        self.solver.write_snapshot(&after)?;

        let totals = self.solver.area_totals()?;
        report.record_area_totals(hour, &totals);

        let state = self.solver.solved_state()?;
        let violations = validate_with(&state, &self.limits);
        if !violations.is_empty() {
            debug!(hour, count = violations.len(), "limit violations");
        }
        report.record_violations(hour, &violations);

        self.solver.save_case(temp)?;
        self.solver.load_case(temp)?;

        Ok(HourResult {
            hour,
            converged: true,
            violations,
            before_snapshot: before,
            after_snapshot: Some(after),
        })
    }

    /// Exchanges modelled as loads: `P = -value`, and the value is netted
    /// into the owning area's consumption.
    fn push_exchange_loads(&mut self, hour: usize, report: &mut SummaryReport) -> Result<()> {
        for (index, load) in exchange_loads().iter().enumerate() {
            let value = self.resolve(load.country(), QuantityCode::Exchange, &load.lookup(), hour);
            let p = -value;
            let q = reactive_power(p, load.power_factor);

            self.netting
                .entry(load.consumption_area())
                .or_insert([0.0; HOURS])[hour] += value;

            report.record_exchange_load(hour, index, p, q);
            self.solver.change_load(&LoadUpdate {
                bus: load.bus,
                id: load.device_id.to_string(),
                p,
                q,
            })?;
        }
        Ok(())
    }

    fn push_areas(&mut self, hour: usize, report: &mut SummaryReport) -> Result<()> {
        for (index, area) in areas().iter().enumerate() {
            let net = self.net_interchange(area, hour);
            self.solver.set_area_interchange(&AreaInterchange {
                number: area.number,
                bus: area.bus,
                net,
                name: area.name.to_string(),
            })?;

            let production = self.scheduled(area, QuantityCode::Production, hour);
            let consumption = self.scheduled(area, QuantityCode::Consumption, hour)
                + self.netted(area.name, hour);
            self.solver.scale_area(&AreaScaling {
                number: area.number,
                production,
                consumption,
                reactive: reactive_power(consumption, area.power_factor),
            })?;

            report.record_area_schedule(hour, index, production, consumption, net);
        }
        Ok(())
    }

    fn net_interchange(&mut self, area: &AreaRecord, hour: usize) -> f64 {
        let country = area.country();
        let exchange = self.dataset.series(country, QuantityCode::Exchange);
        let interchange = net_interchange(exchange, area, hour);
        for link in &interchange.missing {
            let entity = format!("{}/{}/{}", country, QuantityCode::Exchange, link);
            self.warnings.missing_data(&entity, hour);
        }
        interchange.net
    }

    fn scheduled(&mut self, area: &AreaRecord, code: QuantityCode, hour: usize) -> f64 {
        let lookup = TieredLookup::new().then(area.name, 1.0);
        self.resolve(area.country(), code, &lookup, hour)
    }

    fn netted(&self, area: &str, hour: usize) -> f64 {
        self.netting.get(area).map(|series| series[hour]).unwrap_or(0.0)
    }

    /// Value of the first matching candidate, or zero with a warning.
    fn resolve(
        &mut self,
        country: Country,
        code: QuantityCode,
        lookup: &TieredLookup,
        hour: usize,
    ) -> f64 {
        match lookup.resolve(self.dataset.series(country, code), hour) {
            Some(hit) => {
                if hit.tier > 0 {
                    debug!(key = %hit.key, primary = lookup.primary(), hour, "fallback link id");
                }
                hit.value
            }
            None => {
                let entity = format!("{}/{}/{}", country, code, lookup.primary());
                self.warnings.missing_data(&entity, hour);
                0.0
            }
        }
    }

    fn remove_temp_case(&self) -> Result<()> {
        let temp = self.output_dir.join(TEMP_CASE);
        if temp.exists() {
            fs::remove_file(&temp).with_context(|| format!("removing {}", temp.display()))?;
        }
        Ok(())
    }

    fn close_quietly(&mut self) {
        if let Err(err) = self.solver.close() {
            warn!(error = %err, "closing solver after failure");
        }
    }
}
