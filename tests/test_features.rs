//! Integration tests for causal feature construction

use chrono::{Duration, NaiveDate};
use loadcast::prelude::*;

fn series(values: &[f64]) -> RawSeries {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let covariates = Covariates {
                temperature: 20.0 + (i % 7) as f64,
                ..Covariates::default()
            };
            Observation::new(start + Duration::hours(i as i64), covariates, [v, 2.0 * v, 1.0])
        })
        .collect()
}

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 37) % 101) as f64).collect()
}

#[test]
fn test_row_count_is_n_minus_warmup() {
    let builder = FeatureBuilder::default();
    for n in [25, 48, 100, 200] {
        let table = builder.build(&series(&ramp(n))).unwrap();
        assert_eq!(table.n_rows(), n - 24, "n = {}", n);
    }
}

#[test]
fn test_changing_future_leaves_past_rows_unchanged() {
    let base = ramp(120);
    let mut altered = base.clone();
    for v in altered.iter_mut().skip(90) {
        *v += 1000.0;
    }

    let builder = FeatureBuilder::default();
    let a = builder.build(&series(&base)).unwrap();
    let b = builder.build(&series(&altered)).unwrap();

    // raw row 90 is feature row 66; every earlier row must be identical
    let cut = 90 - 24;
    assert_eq!(a.values().slice(ndarray::s![..cut, ..]), b.values().slice(ndarray::s![..cut, ..]));
    assert_ne!(a.values().row(cut), b.values().row(cut));
}

#[test]
fn test_target_is_last_and_is_zone_sum() {
    let values = ramp(60);
    let table = FeatureBuilder::default().build(&series(&values)).unwrap();

    assert_eq!(table.schema().target_index(), table.n_cols() - 1);
    assert_eq!(table.schema().target_name(), "total_power");
    for (k, &t) in table.target().iter().enumerate() {
        assert_eq!(t, 3.0 * values[k + 24] + 1.0);
    }
}

#[test]
fn test_lag_columns_reference_past() {
    let values = ramp(80);
    let table = FeatureBuilder::default().build(&series(&values)).unwrap();
    let schema = table.schema();
    let lag1 = table.column(schema.index_of("total_power_lag_1").unwrap());
    let lag24 = table.column(schema.index_of("total_power_lag_24").unwrap());

    for k in 0..table.n_rows() {
        let i = k + 24;
        assert_eq!(lag1[k], 3.0 * values[i - 1] + 1.0);
        assert_eq!(lag24[k], 3.0 * values[i - 24] + 1.0);
    }
}

#[test]
fn test_cyclical_and_weekend_columns() {
    let table = FeatureBuilder::default().build(&series(&ramp(24 * 10))).unwrap();
    let schema = table.schema();
    let sin_hour = table.column(schema.index_of("sin_hour").unwrap());
    let cos_hour = table.column(schema.index_of("cos_hour").unwrap());
    let weekend = table.column(schema.index_of("is_weekend").unwrap());

    for k in 0..table.n_rows() {
        assert!((sin_hour[k].powi(2) + cos_hour[k].powi(2) - 1.0).abs() < 1e-12);
        assert!(weekend[k] == 0.0 || weekend[k] == 1.0);
    }
    // 2023-06-03 is a Saturday
    let saturday_noon = table
        .timestamps()
        .iter()
        .position(|ts| ts.to_string() == "2023-06-03 12:00:00")
        .unwrap();
    assert_eq!(weekend[saturday_noon], 1.0);
}

#[test]
fn test_duplicate_and_unsorted_input_is_canonicalised() {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let mut observations: Vec<Observation> = (0..40)
        .map(|i| Observation::new(start + Duration::hours(i), Covariates::default(), [i as f64, 0.0, 0.0]))
        .collect();
    observations.reverse();
    observations.push(Observation::new(start + Duration::hours(5), Covariates::default(), [999.0, 0.0, 0.0]));

    let series = RawSeries::new(observations);
    assert_eq!(series.len(), 40);
    let ts: Vec<_> = series.timestamps().collect();
    assert!(ts.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_custom_config_changes_warmup() {
    let builder = FeatureBuilder::new(FeatureConfig::new(vec![1, 2, 3], 6));
    let table = builder.build(&series(&ramp(50))).unwrap();
    // max(3, 6 - 1) = 5
    assert_eq!(table.n_rows(), 45);
    assert_eq!(table.n_cols(), 5 + 6 + 1 + 3 + 2 + 1);
}
