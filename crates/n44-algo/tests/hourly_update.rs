use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use n44_algo::{
    net_interchange, HourlyUpdateEngine, LimitConfig, Violation, NO_CONVERGENCE, SUMMARY_FILE,
    TEMP_CASE, WARNINGS_FILE,
};
use n44_core::{area, areas, reactive_power, AreaRecord, Country, MarketDataset, N44Error, QuantityCode};
use n44_solver_common::{AreaTotals, BusVoltage, Command, RecordingSolver, SolvedState};

fn market_day() -> MarketDataset {
    let date = NaiveDate::from_ymd_opt(2016, 3, 4).unwrap();
    let mut dataset = MarketDataset::new(date);
    dataset.insert_series(Country::Sweden, QuantityCode::Exchange, "SE3_FI", &[100.0; 24]);
    dataset.insert_series(Country::Sweden, QuantityCode::Production, "SE3", &[8000.0; 24]);
    dataset.insert_series(Country::Sweden, QuantityCode::Consumption, "SE3", &[9000.0; 24]);
    dataset.insert_series(Country::Norway, QuantityCode::Exchange, "NO1_SE3", &[500.0; 24]);
    dataset
}

fn base_case(dir: &Path) -> PathBuf {
    let path = dir.join("N44_BC.sav");
    fs::write(&path, "").unwrap();
    path
}

fn scalings(solver: &RecordingSolver, number: u32) -> Vec<(f64, f64)> {
    solver
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::ScaleArea(s) if s.number == number => Some((s.production, s.consumption)),
            _ => None,
        })
        .collect()
}

#[test]
fn exchange_load_is_inverted_and_netted_into_consumption() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let out = dir.path().join("N44_20160304");
    let dataset = market_day();
    let mut solver = RecordingSolver::new();

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &out)
        .run()
        .unwrap();

    let first_load = solver
        .commands()
        .iter()
        .find_map(|command| match command {
            Command::ChangeLoad(update) if update.bus == 3020 => Some(update.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_load.id, "1");
    assert_eq!(first_load.p, -100.0);
    assert_eq!(first_load.q, -32.8684);

    let se3 = scalings(&solver, 23);
    assert_eq!(se3.len(), 24);
    assert_eq!(se3[0], (8000.0, 9100.0));

    // The dataset itself keeps the published consumption.
    assert_eq!(
        dataset.value(Country::Sweden, QuantityCode::Consumption, "SE3", 0),
        Some(9000.0)
    );

    assert_eq!(outcome.report.number(15, 2), Some(-100.0));
    assert_eq!(outcome.report.number(15, 3), Some(-32.8684));
    assert_eq!(outcome.report.number(10, 3), Some(9100.0));
}

#[test]
fn converged_day_fills_every_hour_block() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let out = dir.path().join("N44_20160304");
    let dataset = market_day();
    let totals: Vec<AreaTotals> = areas()
        .iter()
        .map(|a| AreaTotals {
            number: a.number,
            generation: 1000.4,
            load: 900.6,
            interchange: 99.8,
        })
        .collect();
    let mut solver = RecordingSolver::new().with_area_totals(totals);

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &out)
        .run()
        .unwrap();

    assert_eq!(outcome.converged_hours, 24);
    assert_eq!(outcome.report.count_text(43, NO_CONVERGENCE), 0);
    for hour in 0..24 {
        let col = 2 + 3 * hour;
        assert_eq!(outcome.report.text(1, col), Some(format!("hour {}", hour).as_str()));
        assert_eq!(outcome.report.text(42, col), Some("Convergence"));
        assert_eq!(outcome.report.number(31, col), Some(1000.0));
        assert_eq!(outcome.report.number(40, col + 1), Some(901.0));
        assert_eq!(outcome.report.number(35, col + 2), Some(100.0));
        assert!(out.join(format!("h{}_before_PF.raw", hour)).is_file());
        assert!(out.join(format!("h{}_after_PF.raw", hour)).is_file());
    }

    assert!(out.join(SUMMARY_FILE).is_file());
    assert!(!out.join(TEMP_CASE).exists());
    assert!(solver.is_closed());
}

#[test]
fn high_voltage_raises_a_single_flag() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let out = dir.path().join("day");
    let dataset = market_day();
    let state = SolvedState {
        voltages: vec![
            BusVoltage { bus: 5500, vm: 1.0 },
            BusVoltage { bus: 3020, vm: 1.06 },
        ],
        ..SolvedState::default()
    };
    let mut solver = RecordingSolver::new().with_state(state);

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &out)
        .run()
        .unwrap();

    for result in &outcome.hours {
        assert_eq!(result.violations, vec![Violation::BusVoltage]);
    }
    assert_eq!(outcome.report.count_text(43, "Bus voltage problem"), 24);
    for row in 45..=48 {
        assert_eq!(outcome.report.count_text(row, "Generator active power output problem"), 0);
    }
    assert_eq!(outcome.report.get(48, 2), None);
}

#[test]
fn configured_limits_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let dataset = market_day();
    let state = SolvedState {
        voltages: vec![BusVoltage { bus: 3020, vm: 1.06 }],
        ..SolvedState::default()
    };
    let mut solver = RecordingSolver::new().with_state(state);
    let limits = LimitConfig {
        vmax: 1.1,
        ..LimitConfig::default()
    };

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, dir.path().join("day"))
        .with_limits(limits)
        .run()
        .unwrap();

    assert!(outcome.hours.iter().all(|h| h.violations.is_empty()));
}

#[test]
fn non_convergence_continues_from_last_good_case() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let out = dir.path().join("day");
    let temp = out.join(TEMP_CASE);
    let dataset = market_day();
    let mut solver = RecordingSolver::new().with_convergence([false, true, false]);

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &out)
        .run()
        .unwrap();

    assert_eq!(outcome.hours.len(), 24);
    assert_eq!(outcome.converged_hours, 22);
    assert_eq!(outcome.failed_hours().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(outcome.report.count_text(43, NO_CONVERGENCE), 2);
    assert_eq!(outcome.report.text(43, 2), Some(NO_CONVERGENCE));
    assert_eq!(outcome.report.text(43, 8), Some(NO_CONVERGENCE));
    assert!(outcome.hours[0].violations.is_empty());
    assert!(outcome.hours[0].after_snapshot.is_none());
    assert!(!out.join("h0_after_PF.raw").exists());

    let loaded = solver.loaded_cases();
    // initial load, reload after hour 0, saved hour 1, reload after hour 2
    assert_eq!(loaded[0], base);
    assert_eq!(loaded[1], base);
    assert_eq!(loaded[2], temp);
    assert_eq!(loaded[3], temp);
    assert_eq!(scalings(&solver, 23).len(), 24);
}

#[test]
fn solver_error_aborts_the_day() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let dataset = market_day();
    let mut solver = RecordingSolver::new().fail_solve_at(3);

    let day = dir.path().join("day");
    let err = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &day)
        .run()
        .unwrap_err();

    assert!(format!("{:#}", err).contains("hour 3"));
    assert!(err.downcast_ref::<N44Error>().is_none());
    assert_eq!(solver.solve_count(), 4);
    assert!(solver.is_closed());
    // Hours 0..2 saved a scratch case before the failure.
    assert!(solver.loaded_cases().iter().any(|case| case.ends_with(TEMP_CASE)));
    assert!(!day.join(TEMP_CASE).exists());
    assert!(day.join("h3_before_PF.raw").is_file());
}

#[test]
fn missing_base_case_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = market_day();
    let mut solver = RecordingSolver::new();

    let err = HourlyUpdateEngine::new(
        &mut solver,
        &dataset,
        dir.path().join("missing.sav"),
        dir.path().join("day"),
    )
    .run()
    .unwrap_err();

    let typed = err.downcast_ref::<N44Error>().unwrap();
    assert!(matches!(typed, N44Error::Solver(_)));
    assert!(typed.is_fatal());
    assert_eq!(solver.solve_count(), 0);
}

#[test]
fn missing_values_are_zero_filled_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let base = base_case(dir.path());
    let out = dir.path().join("day");
    let dataset = market_day();
    let mut solver = RecordingSolver::new();

    let outcome = HourlyUpdateEngine::new(&mut solver, &dataset, &base, &out)
        .run()
        .unwrap();

    assert!(outcome.warning_count > 0);
    let log = fs::read_to_string(out.join(WARNINGS_FILE)).unwrap();
    assert!(log.contains("Missing data for NO/UT/NO_DK at hour 0"));
    assert!(log.contains("Missing data for NO/PS/NO1 at hour 23"));
    assert_eq!(log.lines().count(), outcome.warning_count);

    let no1 = scalings(&solver, 11);
    assert_eq!(no1[0], (0.0, 0.0));
}

#[test]
fn net_interchange_ignores_link_order() {
    let date = NaiveDate::from_ymd_opt(2016, 3, 4).unwrap();
    let mut dataset = MarketDataset::new(date);
    dataset.insert_series(Country::Norway, QuantityCode::Exchange, "NO1_SE3", &[500.0; 24]);
    dataset.insert_series(Country::Norway, QuantityCode::Exchange, "NO1_NO2", &[300.0; 24]);
    dataset.insert_series(Country::Norway, QuantityCode::Exchange, "NO5_NO1", &[50.0; 24]);
    let exchange = dataset.series(Country::Norway, QuantityCode::Exchange);

    let no1 = *area("NO1").unwrap();
    let permuted = AreaRecord {
        negative: &["NO1_NO3", "NO1_NO5", "NO1_SE3", "NO1_NO2"],
        ..no1
    };

    let published = net_interchange(exchange, &no1, 7);
    let reordered = net_interchange(exchange, &permuted, 7);
    assert_eq!(published.net, -750.0);
    assert_eq!(reordered.net, published.net);
    assert_eq!(published.missing, vec!["NO1_NO3".to_string()]);
    assert_eq!(reordered.missing, published.missing);
}

#[test]
fn reactive_power_matches_rounded_formula() {
    let active = -123.456;
    let expected = (active * 0.95f64.acos().tan() * 10_000.0).round() / 10_000.0;
    assert_eq!(reactive_power(active, 0.95), expected);
}
