//! Raw observations and the causally ordered series built from them

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of exogenous covariates carried by every observation
pub const N_COVARIATES: usize = 5;

/// Covariate names, in feature-table order
pub const COVARIATE_NAMES: [&str; N_COVARIATES] = [
    "temperature",
    "humidity",
    "wind_speed",
    "general_diffuse_flows",
    "diffuse_flows",
];

/// Exogenous weather covariates for one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Covariates {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub general_diffuse_flows: f64,
    pub diffuse_flows: f64,
}

impl Covariates {
    /// Values in `COVARIATE_NAMES` order
    pub fn to_array(&self) -> [f64; N_COVARIATES] {
        [
            self.temperature,
            self.humidity,
            self.wind_speed,
            self.general_diffuse_flows,
            self.diffuse_flows,
        ]
    }
}

/// One timestamped reading: covariates plus per-zone power draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub covariates: Covariates,
    pub zone_power: [f64; 3],
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, covariates: Covariates, zone_power: [f64; 3]) -> Self {
        Self {
            timestamp,
            covariates,
            zone_power,
        }
    }

    /// Aggregate target: sum of the zone readings
    pub fn total_power(&self) -> f64 {
        self.zone_power.iter().sum()
    }
}

/// Observations in strictly increasing timestamp order.
///
/// Construction sorts and drops repeated timestamps (the first occurrence
/// wins), so every derived computation sees the canonical order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSeries {
    observations: Vec<Observation>,
}

impl RawSeries {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        // stable sort keeps the first duplicate in input order
        observations.sort_by_key(|o| o.timestamp);
        let before = observations.len();
        observations.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);

        let dropped = before - observations.len();
        if dropped > 0 {
            warn!(dropped, "Dropped observations with duplicate timestamps");
        }

        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.observations.iter().map(|o| o.timestamp)
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.first().map(|o| o.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|o| o.timestamp)
    }

    /// Aggregate target for every observation
    pub fn total_power(&self) -> Vec<f64> {
        self.observations.iter().map(Observation::total_power).collect()
    }
}

impl FromIterator<Observation> for RawSeries {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn obs(hour: u32, zone1: f64) -> Observation {
        Observation::new(at(hour), Covariates::default(), [zone1, 2.0, 3.0])
    }

    #[test]
    fn test_total_power_sums_zones() {
        assert_eq!(obs(0, 1.0).total_power(), 6.0);
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let series = RawSeries::new(vec![obs(3, 30.0), obs(1, 10.0), obs(2, 20.0), obs(1, 99.0)]);

        assert_eq!(series.len(), 3);
        let hours: Vec<NaiveDateTime> = series.timestamps().collect();
        assert_eq!(hours, vec![at(1), at(2), at(3)]);
        // first occurrence of the duplicated hour is kept
        assert_eq!(series.observations()[0].zone_power[0], 10.0);
    }

    #[test]
    fn test_covariate_order() {
        let c = Covariates {
            temperature: 1.0,
            humidity: 2.0,
            wind_speed: 3.0,
            general_diffuse_flows: 4.0,
            diffuse_flows: 5.0,
        };
        assert_eq!(c.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(COVARIATE_NAMES[0], "temperature");
    }
}
