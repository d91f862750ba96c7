// bodyscale - Handler integration tests
//
// The tests are organized into categories:
// 1. Propagation
// 2. Notification contract
// 3. Sensor problems
// 4. Expiry and age
// 5. Formulas through the handler

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use bodyscale::{
    BodyScaleConfig, BodyScaleError, Constraints, Gender, ManualClock, Metric, MetricValue,
    MetricsHandler, ProblemKind, SensorProblem, SensorRole, SensorState,
};
use chrono::NaiveDate;

const WEIGHT: &str = "sensor.scale_weight";
const IMPEDANCE: &str = "sensor.scale_impedance";
const LAST_TIME: &str = "sensor.scale_last_time";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock() -> Rc<ManualClock> {
    Rc::new(ManualClock::new(date(2024, 6, 1)))
}

/// Male, 170 cm, 30 years old on the clock's day
fn male_config() -> BodyScaleConfig {
    BodyScaleConfig::new(170, date(1994, 1, 1), Gender::Male, WEIGHT)
        .with_impedance_sensor(IMPEDANCE)
        .with_last_measurement_time_sensor(LAST_TIME)
}

fn male_handler(clock: &Rc<ManualClock>) -> MetricsHandler {
    MetricsHandler::with_clock(male_config(), clock.clone()).unwrap()
}

fn push(handler: &mut MetricsHandler, entity_id: &str, state: &str) {
    handler
        .on_state_changed(entity_id, &SensorState::new(state))
        .unwrap();
}

fn number(handler: &MetricsHandler, metric: Metric) -> f64 {
    handler
        .current(metric)
        .and_then(|v| v.as_f64())
        .unwrap_or_else(|| panic!("{} has no numeric value", metric))
}

fn record(handler: &mut MetricsHandler, metric: Metric) -> Rc<RefCell<Vec<MetricValue>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    handler.subscribe(metric, move |value| sink.borrow_mut().push(value.clone()));
    seen
}

// ============================================================================
// Propagation
// ============================================================================

#[test]
fn test_full_wave_weight_then_impedance() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    assert!(handler.current(Metric::BodyScore).is_none());

    push(&mut handler, IMPEDANCE, "500");

    assert_relative_eq!(number(&handler, Metric::Bmi), 24.2);
    assert_relative_eq!(number(&handler, Metric::Bmr), 1529.0);
    assert_relative_eq!(number(&handler, Metric::VisceralFat), 11.0);
    assert_relative_eq!(number(&handler, Metric::Lbm), 55.8);
    assert_relative_eq!(number(&handler, Metric::FatPercentage), 21.5);
    assert_relative_eq!(number(&handler, Metric::WaterPercentage), 53.9);
    assert_relative_eq!(number(&handler, Metric::BoneMass), 2.8);
    assert_relative_eq!(number(&handler, Metric::MuscleMass), 52.18);
    assert_relative_eq!(number(&handler, Metric::MetabolicAge), 30.0);
    assert_relative_eq!(number(&handler, Metric::ProteinPercentage), 20.7);
    assert_relative_eq!(number(&handler, Metric::FatMassToIdealWeight), 0.38);
    assert_relative_eq!(number(&handler, Metric::BodyScore), 73.0);
    assert_eq!(
        handler.current(Metric::BodyType),
        Some(MetricValue::from("balanced"))
    );
}

#[test]
fn test_full_wave_order_independent() {
    let clock = clock();
    let mut first = male_handler(&clock);
    push(&mut first, WEIGHT, "70");
    push(&mut first, IMPEDANCE, "500");

    let mut second = male_handler(&clock);
    push(&mut second, IMPEDANCE, "500");
    push(&mut second, WEIGHT, "70");

    for metric in Metric::ALL {
        assert_eq!(first.value(metric), second.value(metric), "{}", metric);
    }
}

#[test]
fn test_unrounded_values_feed_formulas() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    push(&mut handler, WEIGHT, "70");
    push(&mut handler, IMPEDANCE, "500");

    let score = handler.value(Metric::BodyScore).and_then(|v| v.as_f64());
    assert_relative_eq!(score.unwrap(), 72.98806760000001, epsilon = 1e-9);
}

#[test]
fn test_obese_female_wave() {
    let clock = clock();
    let config = BodyScaleConfig::new(160, date(1979, 1, 1), Gender::Female, WEIGHT)
        .with_impedance_sensor(IMPEDANCE);
    let mut handler = MetricsHandler::with_clock(config, clock.clone()).unwrap();

    push(&mut handler, WEIGHT, "80");
    push(&mut handler, IMPEDANCE, "600");

    assert_relative_eq!(number(&handler, Metric::BodyScore), 39.0);
    assert_eq!(
        handler.current(Metric::BodyType),
        Some(MetricValue::from("overweight"))
    );
    assert!(number(&handler, Metric::FatMassToIdealWeight) < 0.0);
}

#[test]
fn test_weight_only_device() {
    let clock = clock();
    let config = BodyScaleConfig::new(170, date(1994, 1, 1), Gender::Male, WEIGHT);
    let mut handler = MetricsHandler::with_clock(config, clock.clone()).unwrap();

    push(&mut handler, WEIGHT, "70");

    assert_eq!(
        handler.available(),
        vec![
            Metric::Status,
            Metric::Age,
            Metric::Weight,
            Metric::Bmi,
            Metric::Bmr,
            Metric::VisceralFat
        ]
    );
}

// ============================================================================
// Notification contract
// ============================================================================

#[test]
fn test_update_metric_idempotent() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let seen = record(&mut handler, Metric::Weight);

    assert!(handler.update_metric(Metric::Weight, MetricValue::Number(70.0)));
    assert!(!handler.update_metric(Metric::Weight, MetricValue::Number(70.0)));

    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_repeated_reading_notifies_once() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let bmi = record(&mut handler, Metric::Bmi);

    push(&mut handler, WEIGHT, "70");
    push(&mut handler, WEIGHT, "70");

    assert_eq!(*bmi.borrow(), vec![MetricValue::Number(24.2)]);
}

#[test]
fn test_body_score_notified_once_per_wave() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let score = record(&mut handler, Metric::BodyScore);

    push(&mut handler, WEIGHT, "70");
    push(&mut handler, IMPEDANCE, "500");

    assert_eq!(*score.borrow(), vec![MetricValue::Number(73.0)]);
}

#[test]
fn test_late_subscription() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    let early = record(&mut handler, Metric::Bmi);
    assert!(early.borrow().is_empty());

    push(&mut handler, WEIGHT, "70");
    assert_eq!(early.borrow().len(), 1);

    let late = record(&mut handler, Metric::Bmi);
    assert_eq!(*late.borrow(), vec![MetricValue::Number(24.2)]);
}

#[test]
fn test_status_subscriber_gets_none_immediately() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let status = record(&mut handler, Metric::Status);
    assert_eq!(*status.borrow(), vec![MetricValue::from("none")]);
}

#[test]
fn test_unsubscribe_keeps_others() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    let kept = record(&mut handler, Metric::Weight);
    let dropped = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&dropped);
    let subscription = handler.subscribe(Metric::Weight, move |_| *counter.borrow_mut() += 1);

    assert!(handler.unsubscribe(subscription));
    push(&mut handler, WEIGHT, "70");

    assert_eq!(*dropped.borrow(), 0);
    assert_eq!(kept.borrow().len(), 1);
    assert_eq!(handler.subscriber_count(Metric::Weight), 1);
}

// ============================================================================
// Sensor problems
// ============================================================================

#[test]
fn test_sticky_last_good_value() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    push(&mut handler, WEIGHT, "500");

    assert_eq!(handler.value(Metric::Weight), Some(MetricValue::Number(70.0)));
    assert_eq!(handler.status(), "weight_high");
    assert_eq!(
        handler.current(Metric::Status),
        Some(MetricValue::from("weight_high"))
    );

    push(&mut handler, WEIGHT, "71");
    assert_eq!(handler.status(), "none");
    assert_eq!(handler.value(Metric::Weight), Some(MetricValue::Number(71.0)));
}

#[test]
fn test_low_reading() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    push(&mut handler, WEIGHT, "5");
    assert_eq!(handler.status(), "weight_low");
    assert!(handler.value(Metric::Weight).is_none());
}

#[test]
fn test_status_deduplicated() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let status = record(&mut handler, Metric::Status);

    push(&mut handler, WEIGHT, "500");
    push(&mut handler, WEIGHT, "500");

    assert_eq!(
        *status.borrow(),
        vec![MetricValue::from("none"), MetricValue::from("weight_high")]
    );
}

#[test]
fn test_status_ordered_by_sensor() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, IMPEDANCE, "10");
    push(&mut handler, WEIGHT, "500");

    assert_eq!(handler.status(), "weight_high_and_impedance_low");
    assert_eq!(
        handler.problems(),
        vec![
            SensorProblem {
                role: SensorRole::Weight,
                kind: ProblemKind::High
            },
            SensorProblem {
                role: SensorRole::Impedance,
                kind: ProblemKind::Low
            },
        ]
    );
}

#[test]
fn test_new_problem_replaces_old() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "5");
    push(&mut handler, WEIGHT, "500");
    assert_eq!(handler.status(), "weight_high");
}

#[test]
fn test_unavailable_and_invalid_format() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    handler
        .on_state_changed(WEIGHT, &SensorState::unavailable())
        .unwrap();
    push(&mut handler, IMPEDANCE, "abc");
    push(&mut handler, LAST_TIME, "not a date");

    assert_eq!(
        handler.status(),
        "weight_unavailable_and_impedance_invalid_format_and_last_time_invalid_format"
    );
    assert_eq!(handler.value(Metric::Weight), Some(MetricValue::Number(70.0)));
    assert!(handler.value(Metric::Impedance).is_none());
}

#[test]
fn test_unknown_state_is_silent() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let status = record(&mut handler, Metric::Status);

    handler
        .on_state_changed(WEIGHT, &SensorState::unknown())
        .unwrap();

    assert_eq!(status.borrow().len(), 1);
    assert_eq!(handler.status(), "none");
}

#[test]
fn test_unknown_entity_is_fatal() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let result = handler.on_state_changed("sensor.kitchen", &SensorState::new("70"));
    assert!(matches!(result, Err(BodyScaleError::UnknownSensor { .. })));
}

#[test]
fn test_pound_conversion() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    handler
        .on_state_changed(WEIGHT, &SensorState::new("150").with_unit("lb"))
        .unwrap();

    let weight = handler.value(Metric::Weight).and_then(|v| v.as_f64());
    assert_relative_eq!(weight.unwrap(), 68.0388555, epsilon = 1e-9);
    assert_relative_eq!(number(&handler, Metric::Weight), 68.04);
}

#[test]
fn test_pound_conversion_before_validation() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    // 400 lb is 181 kg, inside the kilogram range
    handler
        .on_state_changed(WEIGHT, &SensorState::new("400").with_unit("lb"))
        .unwrap();
    assert_eq!(handler.status(), "none");

    handler
        .on_state_changed(WEIGHT, &SensorState::new("500").with_unit("lb"))
        .unwrap();
    assert_eq!(handler.status(), "weight_high");
}

#[test]
fn test_last_measurement_time() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, LAST_TIME, "2024-05-31T07:45:00+02:00");

    let timestamp = handler
        .current(Metric::LastMeasurementTime)
        .and_then(|v| v.as_timestamp())
        .unwrap();
    assert_eq!(timestamp.to_rfc3339(), "2024-05-31T07:45:00+02:00");
}

#[test]
fn test_last_measurement_time_short_forms() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let timestamp = |handler: &MetricsHandler| {
        handler
            .current(Metric::LastMeasurementTime)
            .and_then(|v| v.as_timestamp())
            .map(|t| t.to_rfc3339())
    };

    push(&mut handler, LAST_TIME, "2024-05-31T07:45+02:00");
    assert_eq!(handler.status(), "none");
    assert_eq!(timestamp(&handler).as_deref(), Some("2024-05-31T07:45:00+02:00"));

    // the manual clock runs in UTC
    push(&mut handler, LAST_TIME, "2024-05-31T07:45");
    assert_eq!(timestamp(&handler).as_deref(), Some("2024-05-31T07:45:00+00:00"));

    push(&mut handler, LAST_TIME, "2024-05-31");
    assert_eq!(handler.status(), "none");
    assert_eq!(timestamp(&handler).as_deref(), Some("2024-05-31T00:00:00+00:00"));
}

#[test]
fn test_infinite_weight_is_high() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    push(&mut handler, WEIGHT, "inf");
    assert_eq!(handler.status(), "weight_high");

    push(&mut handler, WEIGHT, "-inf");
    assert_eq!(handler.status(), "weight_low");
    assert_eq!(handler.current(Metric::Weight), Some(MetricValue::Number(70.0)));

    push(&mut handler, WEIGHT, "nan");
    assert_eq!(handler.status(), "weight_invalid");
}

// ============================================================================
// Expiry and age
// ============================================================================

#[test]
fn test_metrics_expire() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    clock.advance(Duration::from_secs(61));

    assert!(handler.current(Metric::Weight).is_none());
    assert!(handler.current(Metric::Bmi).is_none());
    assert_eq!(handler.status(), "none");
    assert!(handler.current(Metric::Status).is_some());

    // weight is gone, so impedance alone computes nothing new
    push(&mut handler, IMPEDANCE, "500");
    assert!(handler.current(Metric::Lbm).is_none());

    push(&mut handler, WEIGHT, "70");
    assert!(handler.current(Metric::BodyScore).is_some());
}

#[test]
fn test_repeated_reading_refreshes_dependents() {
    let clock = clock();
    let mut handler = male_handler(&clock);

    push(&mut handler, WEIGHT, "70");
    clock.advance(Duration::from_secs(50));
    push(&mut handler, WEIGHT, "70");
    clock.advance(Duration::from_secs(50));

    assert!(handler.current(Metric::Weight).is_some());
    assert!(handler.current(Metric::Bmi).is_some());
}

#[test]
fn test_custom_ttl() {
    let clock = clock();
    let config = male_config().with_constraints(Constraints {
        metric_ttl_secs: 5,
        ..Constraints::default()
    });
    let mut handler = MetricsHandler::with_clock(config, clock.clone()).unwrap();

    push(&mut handler, WEIGHT, "70");
    clock.advance(Duration::from_secs(5));
    assert!(handler.current(Metric::Weight).is_none());
}

#[test]
fn test_birthday_updates_age() {
    let clock = clock();
    let mut handler = male_handler(&clock);
    let age = record(&mut handler, Metric::Age);

    push(&mut handler, WEIGHT, "70");
    assert_relative_eq!(number(&handler, Metric::Bmr), 1529.0);

    clock.set_today(date(2025, 6, 1));
    handler.refresh_age();

    assert_eq!(
        *age.borrow(),
        vec![MetricValue::Integer(30), MetricValue::Integer(31)]
    );
    assert_relative_eq!(number(&handler, Metric::Bmr), 1520.0);
}

// ============================================================================
// Formulas through the handler
// ============================================================================

#[test]
fn test_female_bmi_golden() {
    let clock = clock();
    let config = BodyScaleConfig::new(165, date(1999, 1, 1), Gender::Female, WEIGHT);
    let mut handler = MetricsHandler::with_clock(config, clock.clone()).unwrap();

    push(&mut handler, WEIGHT, "65");

    let bmi = handler.value(Metric::Bmi).and_then(|v| v.as_f64()).unwrap();
    assert_relative_eq!(bmi, 23.875114784205696, epsilon = 1e-12);
    assert_relative_eq!(number(&handler, Metric::Bmi), 23.9);
}

#[test]
fn test_bmi_clamped_with_wide_constraints() {
    let clock = clock();
    let config = male_config().with_constraints(Constraints {
        weight_min: 0.5,
        weight_max: 600.0,
        ..Constraints::default()
    });
    let mut handler = MetricsHandler::with_clock(config, clock.clone()).unwrap();

    push(&mut handler, WEIGHT, "1");
    assert_eq!(handler.value(Metric::Bmi), Some(MetricValue::Number(10.0)));

    push(&mut handler, WEIGHT, "500");
    assert_eq!(handler.value(Metric::Bmi), Some(MetricValue::Number(90.0)));
}

#[test]
fn test_invalid_configuration_rejected() {
    let clock = clock();
    let config = BodyScaleConfig::new(300, date(1994, 1, 1), Gender::Male, WEIGHT);
    let result = MetricsHandler::with_clock(config, clock.clone());
    assert!(matches!(result, Err(BodyScaleError::InvalidConfig(_))));
}
