use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use dau_scenario::data::{week_end_dates, DataLoader, DATE_COLUMN};
use dau_scenario::scenario::engine::{
    CON_WUU, CURR, CURR_NEW, DUU_CALC, DU_CALC, ENGAGEMENT, ENGAGEMENT_NEW, INSTALLS,
    INSTALLS_CALCULATED, NET_GROWTH, NEW_WUU, NURR, NURR_NEW, RET_WUU, TOTAL_GROWTH,
    TOTAL_LAPSE, WUU_CALC,
};
use dau_scenario::scenario::{RecalcError, ScenarioDrivers, ScenarioEngine, ScenarioTable};
use polars::prelude::*;
use proptest::prelude::*;

fn weeks(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 7).expect("valid date");
    (0..n).map(|i| start + Duration::weeks(i as i64)).collect()
}

fn full_row() -> Vec<(&'static str, Vec<f64>)> {
    vec![
        (INSTALLS, vec![1000.0]),
        (NURR, vec![0.40]),
        (CURR, vec![0.60]),
        (ENGAGEMENT, vec![25.0]),
        (CON_WUU, vec![500.0]),
        (NEW_WUU, vec![300.0]),
        (RET_WUU, vec![200.0]),
        (DU_CALC, vec![1.0]),
        (TOTAL_GROWTH, vec![50.0]),
        (TOTAL_LAPSE, vec![-10.0]),
    ]
}

fn values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap_or_else(|_| panic!("missing column {name}"))
        .cast(&DataType::Float64)
        .expect("numeric column")
        .f64()
        .expect("f64 column")
        .into_iter()
        .map(|v| v.expect("non-null value"))
        .collect()
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

#[test]
fn worked_scenario_matches_hand_computed_values() {
    let base = ScenarioTable::from_columns(&weeks(1), full_row()).expect("base table");
    let drivers = ScenarioDrivers::new(1.1, 0.05, -0.1);

    let derived = ScenarioEngine::recalculate(&base, &drivers).expect("recalculate");

    assert_relative_eq!(values(&derived, INSTALLS_CALCULATED)[0], 1100.0, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, NURR_NEW)[0], 0.42, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, CURR_NEW)[0], 0.63, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, ENGAGEMENT_NEW)[0], 22.5, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, WUU_CALC)[0], 1000.0, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, DUU_CALC)[0], 225.0, max_relative = 1e-12);
    assert_relative_eq!(values(&derived, NET_GROWTH)[0], 40.0, max_relative = 1e-12);
}

#[test]
fn identity_drivers_reproduce_sources() {
    let base = ScenarioTable::from_columns(&weeks(1), full_row()).expect("base table");
    let derived =
        ScenarioEngine::recalculate(&base, &ScenarioDrivers::default()).expect("recalculate");

    assert_eq!(values(&derived, INSTALLS_CALCULATED), values(&base, INSTALLS));
    assert_eq!(values(&derived, NURR_NEW), values(&base, NURR));
    assert_eq!(values(&derived, CURR_NEW), values(&base, CURR));
    assert_eq!(values(&derived, ENGAGEMENT_NEW), values(&base, ENGAGEMENT));
}

#[test]
fn each_missing_wuu_source_drops_wuu_calc() {
    for dropped in [CON_WUU, NEW_WUU, RET_WUU] {
        let columns = full_row()
            .into_iter()
            .filter(|(name, _)| *name != dropped)
            .collect();
        let base = ScenarioTable::from_columns(&weeks(1), columns).expect("base table");

        let derived =
            ScenarioEngine::recalculate(&base, &ScenarioDrivers::default()).expect("recalculate");

        assert!(!has_column(&derived, WUU_CALC), "wuu_calc present without {dropped}");
        assert!(!has_column(&derived, DUU_CALC), "duu_calc present without {dropped}");
        assert!(has_column(&derived, NET_GROWTH));
    }
}

#[test]
fn duu_calc_is_gated_on_du_calc() {
    let columns = full_row()
        .into_iter()
        .filter(|(name, _)| *name != DU_CALC)
        .collect();
    let base = ScenarioTable::from_columns(&weeks(1), columns).expect("base table");

    let derived =
        ScenarioEngine::recalculate(&base, &ScenarioDrivers::default()).expect("recalculate");

    assert!(has_column(&derived, WUU_CALC));
    assert!(has_column(&derived, ENGAGEMENT_NEW));
    assert!(!has_column(&derived, DUU_CALC));
}

#[test]
fn duu_calc_needs_engagement() {
    let columns = full_row()
        .into_iter()
        .filter(|(name, _)| *name != ENGAGEMENT)
        .collect();
    let base = ScenarioTable::from_columns(&weeks(1), columns).expect("base table");

    let derived =
        ScenarioEngine::recalculate(&base, &ScenarioDrivers::default()).expect("recalculate");

    assert!(!has_column(&derived, ENGAGEMENT_NEW));
    assert!(!has_column(&derived, DUU_CALC));
}

#[test]
fn table_without_recognized_columns_passes_through() {
    let base = ScenarioTable::from_columns(&weeks(3), vec![("other", vec![1.0, 2.0, 3.0])])
        .expect("base table");

    let derived =
        ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(1.4, 0.2, -0.2))
            .expect("recalculate");

    assert!(derived.equals(&base));
}

#[test]
fn text_column_surfaces_as_data_quality_error() {
    let base = df!(
        DATE_COLUMN => weeks(1),
        TOTAL_GROWTH => [50.0],
        TOTAL_LAPSE => ["n/a"]
    )
    .expect("base table");

    let err = ScenarioEngine::recalculate(&base, &ScenarioDrivers::default())
        .expect_err("text column must fail");
    match err {
        RecalcError::NonNumericColumn {
            column, operation, ..
        } => {
            assert_eq!(column, TOTAL_LAPSE);
            assert_eq!(operation, NET_GROWTH);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn blank_sheet_column_yields_missing_net_growth() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("DAU_Model_imapct.csv");
    std::fs::write(
        &path,
        "week_end_date,total_growth,total_lapse\n2024-01-07,50,\n2024-01-14,60,\n",
    )
    .expect("write sheet");

    let base = DataLoader::read_sheet(&path).expect("read sheet");
    let derived =
        ScenarioEngine::recalculate(&base, &ScenarioDrivers::default()).expect("recalculate");

    let net = derived.column(NET_GROWTH).expect("net_growth column");
    assert_eq!(net.dtype(), &DataType::Float64);
    assert_eq!(net.null_count(), 2);
}

#[test]
fn recalculation_starts_from_the_base_every_time() {
    let base = ScenarioTable::from_columns(&weeks(1), full_row()).expect("base table");
    let snapshot = base.clone();

    let first = ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(1.5, 0.25, 0.25))
        .expect("first recalculation");
    let second = ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(1.5, 0.25, 0.25))
        .expect("second recalculation");

    assert!(first.equals_missing(&second));
    assert!(base.equals_missing(&snapshot));
    assert!(!has_column(&base, INSTALLS_CALCULATED));
}

#[test]
fn batch_matches_one_by_one() {
    let base = ScenarioTable::from_columns(&weeks(1), full_row()).expect("base table");
    let scenarios = vec![
        ScenarioDrivers::new(0.5, -0.25, -0.25),
        ScenarioDrivers::default(),
        ScenarioDrivers::new(1.5, 0.25, 0.25),
    ];

    let batch = ScenarioEngine::recalculate_many(&base, &scenarios).expect("batch");

    assert_eq!(batch.len(), scenarios.len());
    for (drivers, derived) in scenarios.iter().zip(&batch) {
        let single = ScenarioEngine::recalculate(&base, drivers).expect("single");
        assert!(derived.equals_missing(&single));
    }
}

#[test]
fn out_of_range_drivers_are_plain_arithmetic() {
    let base = ScenarioTable::from_columns(&weeks(1), full_row()).expect("base table");
    let derived = ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(-2.0, -1.0, 3.0))
        .expect("recalculate");

    assert_relative_eq!(values(&derived, INSTALLS_CALCULATED)[0], -2000.0);
    assert_relative_eq!(values(&derived, NURR_NEW)[0], 0.0);
    assert_relative_eq!(values(&derived, ENGAGEMENT_NEW)[0], 100.0);
    assert_relative_eq!(values(&derived, DUU_CALC)[0], 1000.0);
}

fn base_table(rows: &[(f64, f64, f64)]) -> DataFrame {
    let dates = weeks(rows.len());
    ScenarioTable::from_columns(
        &dates,
        vec![
            (INSTALLS, rows.iter().map(|r| r.0).collect()),
            (NURR, rows.iter().map(|r| r.1).collect()),
            (ENGAGEMENT, rows.iter().map(|r| r.2).collect()),
        ],
    )
    .expect("base table")
}

proptest! {
    #[test]
    fn rows_and_dates_stay_aligned(
        rows in prop::collection::vec((0.0f64..1e6, 0.0f64..1.0, 0.0f64..100.0), 0..40),
        install_multiplier in 0.5f64..1.5,
        retention_delta in -0.25f64..0.25,
        engagement_delta in -0.25f64..0.25
    ) {
        let base = base_table(&rows);
        let drivers = ScenarioDrivers::new(install_multiplier, retention_delta, engagement_delta);

        let derived = ScenarioEngine::recalculate(&base, &drivers).expect("recalculate");

        prop_assert_eq!(derived.height(), base.height());
        prop_assert_eq!(
            week_end_dates(&derived).expect("dates"),
            week_end_dates(&base).expect("dates")
        );
    }

    #[test]
    fn larger_multiplier_means_more_installs(
        rows in prop::collection::vec((1.0f64..1e6, 0.0f64..1.0, 0.0f64..100.0), 1..40),
        low in 0.5f64..1.0,
        step in 0.01f64..0.5
    ) {
        let base = base_table(&rows);
        let fixed = (0.1, -0.1);

        let lower = ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(low, fixed.0, fixed.1))
            .expect("recalculate");
        let higher =
            ScenarioEngine::recalculate(&base, &ScenarioDrivers::new(low + step, fixed.0, fixed.1))
                .expect("recalculate");

        for (a, b) in values(&lower, INSTALLS_CALCULATED)
            .into_iter()
            .zip(values(&higher, INSTALLS_CALCULATED))
        {
            prop_assert!(b > a);
        }
    }
}
