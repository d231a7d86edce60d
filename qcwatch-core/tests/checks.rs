use std::time::Duration;

use qcwatch_core::{
    Bounds, CheckOptions, DeltaCheck, Frame, IncidentRecord, Monitor, OutlierCheck, Signal, Timestamp,
    TimestampCheck,
};

const OCT_17_2016: i64 = 1_476_662_400;
const JAN_1_2017: i64 = 1_483_228_800;

fn at(day: i64, h: i64, m: i64) -> Timestamp {
    Timestamp::from_secs(day + h * 3600 + m * 60)
}

fn hourly(day: i64, n: i64) -> Vec<Timestamp> {
    (0..n).map(|h| at(day, h, 0)).collect()
}

/// (variable, start, end, run length, description)
fn summary(records: &[IncidentRecord]) -> Vec<(&str, Timestamp, Timestamp, u64, &str)> {
    records
        .iter()
        .map(|r| {
            (
                r.variable_name.as_str(),
                r.start_time,
                r.end_time,
                r.run_length,
                r.error_description.as_str(),
            )
        })
        .collect()
}

fn gappy_session() -> Monitor {
    let index = vec![at(OCT_17_2016, 1, 5), at(OCT_17_2016, 3, 3), at(OCT_17_2016, 3, 50)];
    let frame = Frame::new(index)
        .with_column("A", vec![0.0, 2.0, 3.0])
        .unwrap()
        .with_column("B", vec![4.0, f64::NAN, 6.0])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Test"), false).unwrap();
    m
}

#[test]
fn exact_times_reindex_onto_first_timestamp() {
    let mut m = gappy_session();
    m.check_timestamp(&TimestampCheck::new(3600)).unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![("", at(OCT_17_2016, 2, 5), at(OCT_17_2016, 3, 5), 2, "Missing timestamp")]
    );
    assert_eq!(m.frame().n_rows(), 3);
}

#[test]
fn exact_times_with_expected_start() {
    let mut m = gappy_session();
    let check = TimestampCheck::new(3600).expected_start(at(OCT_17_2016, 1, 0));
    m.check_timestamp(&check).unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![("", at(OCT_17_2016, 1, 0), at(OCT_17_2016, 3, 0), 3, "Missing timestamp")]
    );
}

#[test]
fn inexact_times_need_one_sample_per_bin() {
    let mut m = gappy_session();
    m.check_timestamp(&TimestampCheck::new(3600).exact_times(false)).unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![("", at(OCT_17_2016, 2, 0), at(OCT_17_2016, 2, 0), 1, "Missing timestamp")]
    );
    // the frame keeps its original timestamps
    assert_eq!(m.frame().index()[0], at(OCT_17_2016, 1, 5));
}

#[test]
fn duplicate_and_gap_on_hourly_grid() {
    let index: Vec<Timestamp> = [0, 1, 2, 3, 4, 6, 7, 7, 8].iter().map(|h| at(JAN_1_2017, *h, 0)).collect();
    let frame = Frame::new(index).with_column("A", vec![1.0; 9]).unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Simple"), true).unwrap();
    m.check_timestamp(&TimestampCheck::new(3600)).unwrap();

    assert_eq!(
        summary(m.incidents()),
        vec![
            ("", at(JAN_1_2017, 7, 0), at(JAN_1_2017, 7, 0), 1, "Duplicate timestamp"),
            ("", at(JAN_1_2017, 5, 0), at(JAN_1_2017, 5, 0), 1, "Missing timestamp"),
        ]
    );
    assert_eq!(m.frame().n_rows(), 9);

    // the inserted row is missing data, but was already reported
    m.check_missing(None, 1).unwrap();
    assert_eq!(m.incidents().len(), 2);
}

#[test]
fn nonmonotonic_rows_are_reported_then_sorted() {
    let index: Vec<Timestamp> = [0, 1, 3, 2, 4].iter().map(|h| at(JAN_1_2017, *h, 0)).collect();
    let frame = Frame::new(index)
        .with_column("A", vec![0.0, 1.0, 3.0, 2.0, 4.0])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, None, true).unwrap();
    m.check_timestamp(&TimestampCheck::new(3600)).unwrap();

    assert_eq!(
        summary(m.incidents()),
        vec![("", at(JAN_1_2017, 2, 0), at(JAN_1_2017, 2, 0), 1, "Nonmonotonic timestamp")]
    );
    assert_eq!(m.frame().column(0).unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn timestamp_check_clears_time_filter() {
    let mut m = gappy_session();
    m.add_time_filter(vec![true, false, true]).unwrap();
    m.check_timestamp(&TimestampCheck::new(3600)).unwrap();
    assert!(m.time_filter().is_none());
    assert_eq!(m.notes().len(), 1);
}

#[test]
fn zero_frequency_is_an_error() {
    let mut m = gappy_session();
    assert!(m.check_timestamp(&TimestampCheck::new(0)).is_err());
}

#[test]
fn range_check_reports_each_side() {
    let frame = Frame::new(hourly(JAN_1_2017, 3))
        .with_column("A", vec![-0.1, 0.5, 1.2])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Simple"), true).unwrap();
    m.check_range(&Bounds::between(0.0, 1.0), Some("A"), &CheckOptions::default())
        .unwrap();

    assert_eq!(
        summary(m.incidents()),
        vec![
            ("A", at(JAN_1_2017, 0, 0), at(JAN_1_2017, 0, 0), 1, "Data < lower bound, 0"),
            ("A", at(JAN_1_2017, 2, 0), at(JAN_1_2017, 2, 0), 1, "Data > upper bound, 1"),
        ]
    );
}

#[test]
fn increment_check_flags_flat_runs() {
    let frame = Frame::new(hourly(JAN_1_2017, 6))
        .with_column("A", vec![0.1, 0.2, 0.5, 0.5, 0.5, 0.7])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Simple"), true).unwrap();
    m.check_increment(&Bounds::at_least(0.0001), Some("A"), &Default::default())
        .unwrap();

    assert_eq!(
        summary(m.incidents()),
        vec![("A", at(JAN_1_2017, 3, 0), at(JAN_1_2017, 4, 0), 2, "|Increment| < lower bound, 0.0001")]
    );
}

fn delta_session() -> Monitor {
    let a = vec![
        0.5, -0.3, 0.2, 0.0, 0.5, -0.45, 0.35, -0.4, 0.5, 1.5, 0.5, -0.5, 0.5, -0.5, 5.0, 6.0, 10.0, 10.5, 10.0,
        10.3, 10.0, 10.8, 10.0, 9.9,
    ];
    let b = vec![
        0.0,
        1.0,
        2.2,
        3.0,
        3.8,
        5.0,
        6.0,
        7.1,
        8.0,
        9.0,
        10.0,
        5.0,
        -2.0,
        1.0,
        0.0,
        0.5,
        0.0,
        5.0,
        3.0,
        9.5,
        8.2,
        7.0,
        f64::NAN,
        5.0,
    ];
    let frame = Frame::new(hourly(JAN_1_2017, 24))
        .with_column("A", a)
        .unwrap()
        .with_column("B", b)
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Test"), true).unwrap();
    m
}

fn delta_check(window_secs: u64, absolute_value: bool) -> DeltaCheck {
    DeltaCheck {
        window: Duration::from_secs(window_secs),
        absolute_value,
        ..Default::default()
    }
}

#[test]
fn delta_dead_sensor() {
    let mut m = delta_session();
    m.check_delta(&Bounds::at_least(1.0), None, &delta_check(5 * 3600 + 1, true))
        .unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![
            ("A", at(JAN_1_2017, 0, 0), at(JAN_1_2017, 5, 0), 6, "|Delta| < lower bound, 1"),
            ("A", at(JAN_1_2017, 16, 0), at(JAN_1_2017, 23, 0), 8, "|Delta| < lower bound, 1"),
        ]
    );
}

#[test]
fn delta_abrupt_change() {
    let mut m = delta_session();
    m.check_delta(&Bounds::at_most(7.0), None, &delta_check(3 * 3600 + 1, true))
        .unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![
            ("A", at(JAN_1_2017, 13, 0), at(JAN_1_2017, 16, 0), 4, "|Delta| > upper bound, 7"),
            ("B", at(JAN_1_2017, 10, 0), at(JAN_1_2017, 12, 0), 3, "|Delta| > upper bound, 7"),
            ("B", at(JAN_1_2017, 16, 0), at(JAN_1_2017, 19, 0), 4, "|Delta| > upper bound, 7"),
        ]
    );
}

#[test]
fn delta_abrupt_positive_change() {
    let mut m = delta_session();
    m.check_delta(&Bounds::at_most(7.0), None, &delta_check(3 * 3600 + 1, false))
        .unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![
            ("A", at(JAN_1_2017, 13, 0), at(JAN_1_2017, 16, 0), 4, "Delta > upper bound, 7"),
            ("B", at(JAN_1_2017, 16, 0), at(JAN_1_2017, 19, 0), 4, "Delta > upper bound, 7"),
        ]
    );
}

#[test]
fn delta_abrupt_negative_change() {
    let mut m = delta_session();
    m.check_delta(&Bounds::at_least(-7.0), None, &delta_check(3 * 3600 + 1, false))
        .unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![("B", at(JAN_1_2017, 10, 0), at(JAN_1_2017, 12, 0), 3, "Delta < lower bound, -7")]
    );
}

#[test]
fn outlier_against_whole_column_statistics() {
    let a = vec![
        112.0,
        114.0,
        113.0,
        132.0,
        134.0,
        127.0,
        150.0,
        120.0,
        117.0,
        112.0,
        107.0,
        99.0,
        140.0,
        98.0,
        88.0,
        98.0,
        106.0,
        110.0,
        107.0,
        79.0,
        102.0,
        115.0,
        f64::NAN,
        91.0,
    ];
    let frame = Frame::new(hourly(JAN_1_2017, 24)).with_column("A", a).unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Test"), true).unwrap();
    let check = OutlierCheck {
        window: None,
        absolute_value: false,
        ..Default::default()
    };
    m.check_outlier(&Bounds::between(-1.9, 1.9), None, &check).unwrap();

    assert_eq!(
        summary(m.incidents()),
        vec![
            ("A", at(JAN_1_2017, 19, 0), at(JAN_1_2017, 19, 0), 1, "Outlier < lower bound, -1.9"),
            ("A", at(JAN_1_2017, 6, 0), at(JAN_1_2017, 6, 0), 1, "Outlier > upper bound, 1.9"),
        ]
    );
}

#[test]
fn composite_signal_checked_like_any_column() {
    let frame = Frame::new(hourly(JAN_1_2017, 4))
        .with_column("C", vec![0.0, 0.5, 0.9, 0.1])
        .unwrap()
        .with_column("D", vec![0.0, 0.1, 0.2, 0.9])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Simple"), false).unwrap();
    m.add_translation([("Wave".to_string(), vec!["C".to_string(), "D".to_string()])].into(), Some("Simple"));

    let model = m.evaluate("Wave Model", "{ELAPSED_TIME} / 36000").unwrap();
    assert!(m.add_signal("Wave Model", model));
    let error = m.evaluate("Wave Absolute Error", "abs({Wave} - {Wave Model})").unwrap();
    let Signal::Columns(columns) = &error else {
        panic!("expected columns");
    };
    assert_eq!(columns[0].0, "Wave Absolute Error 1");
    assert!(m.add_signal("Wave Absolute Error", error));

    m.check_range(&Bounds::at_most(0.25), Some("Wave Absolute Error"), &CheckOptions::default())
        .unwrap();
    let records = m.incidents();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].system_name, "");
    assert_eq!(records[0].variable_name, "Wave Absolute Error 1");
    // |C - model| = [0, 0.4, 0.7, 0.2]
    assert_eq!((records[0].start_time, records[0].run_length), (at(JAN_1_2017, 1, 0), 2));
    assert_eq!(records[1].variable_name, "Wave Absolute Error 2");
    assert_eq!(records[1].start_time, at(JAN_1_2017, 3, 0));
}

#[test]
fn time_filter_from_clock_time_expression() {
    let index: Vec<Timestamp> = (0..96).map(|q| at(JAN_1_2017, 0, q * 15)).collect();
    let frame = Frame::new(index).with_column("A", vec![2.0; 96]).unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, Some("Simple"), true).unwrap();

    let signal = m
        .evaluate("Time Filter", "({CLOCK_TIME} > 3*3600) & ({CLOCK_TIME} < 21*3600)")
        .unwrap();
    let filter = signal.to_filter().unwrap();
    assert_eq!(filter.iter().filter(|f| **f).count(), 71);
    m.add_time_filter(filter).unwrap();

    m.check_range(&Bounds::at_most(1.0), Some("A"), &CheckOptions::default())
        .unwrap();
    assert_eq!(
        summary(m.incidents()),
        vec![("A", at(JAN_1_2017, 3, 15), at(JAN_1_2017, 20, 45), 71, "Data > upper bound, 1")]
    );
}

#[test]
fn rolling_mean_smooths_before_checking() {
    let frame = Frame::new(hourly(JAN_1_2017, 4))
        .with_column("A", vec![0.0, 2.0, 0.0, 0.0])
        .unwrap();
    let mut m = Monitor::new();
    m.add_frame(frame, None, true).unwrap();
    let options = CheckOptions::default().rolling_mean(Duration::from_secs(2 * 3600));
    m.check_range(&Bounds::at_most(1.5), Some("A"), &options).unwrap();
    assert!(m.incidents().is_empty());
    m.check_range(&Bounds::at_most(1.5), Some("A"), &CheckOptions::default())
        .unwrap();
    assert_eq!(m.incidents().len(), 1);
}
