use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use chrono::NaiveDate;
use n44_batch::{
    day_dir, emit_records, load_run_manifest, run_range_with, FeedConfig, FeedSourceKind,
    MarketSource, RunConfig,
};
use n44_core::{Country, N44Error};
use n44_io::nordpool::{FeedLocation, FeedSource};
use n44_io::tabular::read_grid;
use n44_solver_common::RecordingSolver;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hours(base: f64) -> String {
    (0..24)
        .map(|h| format!("{}", base + h as f64))
        .collect::<Vec<_>>()
        .join(";")
}

/// Feed mirror with records for every weekday of the week of `date`.
fn write_mirror(root: &Path, date: NaiveDate) {
    let location = FeedLocation::for_date(date);
    let feeds = [
        (Country::Norway, vec![("PS;P", "NO1", 3000.0), ("FB;F", "NO1", 3500.0), ("UT;U", "NO1_SE3", 500.0)]),
        (Country::Sweden, vec![("PS;P", "SE3", 8000.0), ("FB;F", "SE3", 9000.0), ("UT;U", "SE3_FI", 100.0)]),
        (Country::Finland, vec![("PS;P", "FI", 7000.0), ("FB;F", "FI", 8000.0)]),
    ];
    for (country, records) in feeds {
        let mut lines = Vec::new();
        for weekday in 1..=7 {
            for (code, id, base) in &records {
                lines.push(format!("{};x;x;{};x;{};{}", code, weekday, id, hours(*base)));
            }
        }
        let path = root.join(location.remote_path(country));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, lines.join("\n")).unwrap();
    }
}

fn config(root: &Path, base_case: PathBuf) -> RunConfig {
    let mut config = RunConfig::default();
    config.output.root = root.to_path_buf();
    config.solver.base_case = base_case;
    config
}

fn base_case(dir: &Path) -> PathBuf {
    let path = dir.join("N44_BC.sav");
    fs::write(&path, "").unwrap();
    path
}

fn mirror_source(dir: &Path) -> MarketSource {
    MarketSource::from_config(&FeedConfig {
        source: FeedSourceKind::Directory,
        dir: Some(dir.to_path_buf()),
        ..FeedConfig::default()
    })
    .unwrap()
}

#[test]
fn two_days_from_a_feed_mirror() {
    let tmp = tempfile::tempdir().unwrap();
    let mirror = tmp.path().join("mirror");
    write_mirror(&mirror, ymd(2016, 3, 4));
    let out = tmp.path().join("out");
    let config = config(&out, base_case(tmp.path()));
    let mut source = mirror_source(&mirror);
    let mut solver = RecordingSolver::new();

    let summary =
        run_range_with(&config, &mut source, &mut solver, ymd(2016, 3, 4), ymd(2016, 3, 5))
            .unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.failure, 0);
    assert!(summary.warning_count > 0);

    let day = day_dir(&out, ymd(2016, 3, 4));
    assert!(day.ends_with("N44_20160304"));
    for file in [
        "PSSE_in_out.xlsx",
        "warnings.txt",
        "Consumption_SE.xlsx",
        "Exchange_NO.xlsx",
        "h0_before_PF.raw",
        "h23_after_PF.raw",
    ] {
        assert!(day.join(file).is_file(), "missing {}", file);
    }
    assert!(!day.join("temp.sav").exists());
    assert!(!day.join("records").exists());

    let manifest = load_run_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest.num_days, 2);
    assert_eq!(manifest.days[1].date, ymd(2016, 3, 5));
    assert_eq!(manifest.days[0].converged_hours, 24);
    assert_eq!(manifest.warning_count, summary.warning_count);
    assert_eq!(
        manifest.days[0].warning_count,
        fs::read_to_string(day.join("warnings.txt")).unwrap().lines().count()
    );
}

#[test]
fn missing_feed_file_fails_only_that_day() {
    let tmp = tempfile::tempdir().unwrap();
    let mirror = tmp.path().join("mirror");
    write_mirror(&mirror, ymd(2016, 3, 4));
    let config = config(&tmp.path().join("out"), base_case(tmp.path()));
    let mut source = mirror_source(&mirror);
    let mut solver = RecordingSolver::new();

    // Sunday of week 9, then Monday of week 10 which has no files.
    let summary =
        run_range_with(&config, &mut source, &mut solver, ymd(2016, 3, 6), ymd(2016, 3, 7))
            .unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 1);
    let failed = &summary.days[1];
    assert_eq!(failed.status, "error");
    assert!(failed.error.as_deref().unwrap().contains("pono1610.sdv"));
}

#[test]
fn missing_base_case_stops_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let mirror = tmp.path().join("mirror");
    write_mirror(&mirror, ymd(2016, 3, 4));
    let out = tmp.path().join("out");
    let config = config(&out, tmp.path().join("missing.sav"));
    let mut source = mirror_source(&mirror);
    let mut solver = RecordingSolver::new();

    let err = run_range_with(&config, &mut source, &mut solver, ymd(2016, 3, 4), ymd(2016, 3, 5))
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<N44Error>(), Some(N44Error::Solver(_))));
    let manifest = load_run_manifest(&out.join("run_manifest.json")).unwrap();
    assert_eq!(manifest.num_days, 0);
}

#[test]
fn market_sheets_replay_as_tabular_source() {
    let tmp = tempfile::tempdir().unwrap();
    let mirror = tmp.path().join("mirror");
    write_mirror(&mirror, ymd(2016, 3, 4));
    let base = base_case(tmp.path());
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");

    let mut solver = RecordingSolver::new();
    run_range_with(
        &config(&first, base.clone()),
        &mut mirror_source(&mirror),
        &mut solver,
        ymd(2016, 3, 4),
        ymd(2016, 3, 4),
    )
    .unwrap();

    // Default extension: the sheets written by the first run as they are.
    let mut tabular = MarketSource::from_config(&FeedConfig {
        source: FeedSourceKind::Tabular,
        dir: Some(first.clone()),
        ..FeedConfig::default()
    })
    .unwrap();
    let summary = run_range_with(
        &config(&second, base),
        &mut tabular,
        &mut solver,
        ymd(2016, 3, 4),
        ymd(2016, 3, 4),
    )
    .unwrap();
    assert_eq!(summary.success, 1);

    let first_day = day_dir(&first, ymd(2016, 3, 4));
    let second_day = day_dir(&second, ymd(2016, 3, 4));
    for sheet in [
        "Consumption_SE.xlsx",
        "Exchange_SE.xlsx",
        "Production_NO.xlsx",
        "PSSE_in_out.xlsx",
    ] {
        let original = read_grid(&first_day.join(sheet)).unwrap();
        let replayed = read_grid(&second_day.join(sheet)).unwrap();
        assert!(original.len() > 2, "{} is empty", sheet);
        assert_eq!(original, replayed, "{} differs", sheet);
    }
}

/// Feed that rejects every login and counts the attempts.
struct RejectingFeed {
    attempts: Rc<Cell<usize>>,
}

impl FeedSource for RejectingFeed {
    fn fetch(&mut self, _location: &FeedLocation, _country: Country) -> Result<String> {
        self.attempts.set(self.attempts.get() + 1);
        Err(N44Error::Authentication {
            host: "ftp.example.org".into(),
            message: "530 Login incorrect".into(),
        }
        .into())
    }
}

#[test]
fn authentication_failure_stops_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let config = config(&out, base_case(tmp.path()));
    let attempts = Rc::new(Cell::new(0));
    let mut source = MarketSource::Feed(Box::new(RejectingFeed {
        attempts: Rc::clone(&attempts),
    }));
    let mut solver = RecordingSolver::new();

    let err = run_range_with(&config, &mut source, &mut solver, ymd(2016, 3, 4), ymd(2016, 3, 6))
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<N44Error>(),
        Some(N44Error::Authentication { .. })
    ));
    assert!(format!("{:#}", err).contains("run stopped at 2016-03-04"));
    assert_eq!(attempts.get(), 1);
    assert!(solver.commands().is_empty());
    assert!(!day_dir(&out, ymd(2016, 3, 5)).exists());
    assert!(!day_dir(&out, ymd(2016, 3, 6)).exists());
    let manifest = load_run_manifest(&out.join("run_manifest.json")).unwrap();
    assert_eq!(manifest.num_days, 0);
}

#[test]
fn end_before_start_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), base_case(tmp.path()));
    let mut source = mirror_source(tmp.path());
    let mut solver = RecordingSolver::new();
    let err = run_range_with(&config, &mut source, &mut solver, ymd(2016, 3, 5), ymd(2016, 3, 4))
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<N44Error>(), Some(N44Error::Validation(_))));
}

#[test]
fn records_for_every_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = "\
0,   100.00, 33, 0, 1, 50.00     / PSS(R)E-33.5
NORDIC 44
HOUR 0
 5500,'NO1 400     ', 400.0000,3,  11,   1,   1,1.02000,  -3.1000,1.10000,0.90000,1.10000,0.90000
0 / END OF BUS DATA, BEGIN LOAD DATA
Q
";
    fs::write(tmp.path().join("h0_after_PF.raw"), raw).unwrap();
    fs::write(tmp.path().join("h0_before_PF.raw"), raw).unwrap();
    fs::write(tmp.path().join("PSSE_in_out.xlsx"), "ignored").unwrap();

    assert_eq!(emit_records(tmp.path()).unwrap(), 8);
    let voltages =
        fs::read_to_string(tmp.path().join("records").join("h0_after_PF_Voltages.mo")).unwrap();
    assert!(voltages.contains("parameter Real V5500 = 1.020000;"));
    assert!(voltages.contains("parameter Real A5500 = -3.100000;"));
}
