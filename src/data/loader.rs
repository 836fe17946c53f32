//! Loading raw power readings from CSV or an in-memory DataFrame

use crate::data::series::{Covariates, Observation, RawSeries};
use crate::error::{LoadcastError, Result, Stage};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Parse a timestamp written in any of the supported formats.
///
/// Offsets in RFC 3339 input are normalised to UTC; every other format is
/// taken as naive local time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Source column names for each field of an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub timestamp: String,
    pub temperature: String,
    pub humidity: String,
    pub wind_speed: String,
    pub general_diffuse_flows: String,
    pub diffuse_flows: String,
    pub zones: [String; 3],
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "Datetime".to_string(),
            temperature: "Temperature".to_string(),
            humidity: "Humidity".to_string(),
            wind_speed: "WindSpeed".to_string(),
            general_diffuse_flows: "GeneralDiffuseFlows".to_string(),
            diffuse_flows: "DiffuseFlows".to_string(),
            zones: [
                "PowerConsumption_Zone1".to_string(),
                "PowerConsumption_Zone2".to_string(),
                "PowerConsumption_Zone3".to_string(),
            ],
        }
    }
}

/// Builds a [`RawSeries`] from tabular input
#[derive(Debug, Clone, Default)]
pub struct SeriesLoader {
    mapping: ColumnMapping,
    infer_schema_length: Option<usize>,
}

impl SeriesLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<RawSeries> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length.unwrap_or(1000)))
            .into_reader_with_file_handle(file)
            .finish()?;

        info!(path = %path.display(), rows = df.height(), "Loaded CSV");
        self.from_dataframe(&df)
    }

    /// Convert a DataFrame into a sorted, deduplicated series.
    ///
    /// Null readings become NaN; the feature builder drops the rows they
    /// touch. A missing or unparseable timestamp fails the load.
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<RawSeries> {
        let m = &self.mapping;
        let timestamps = self.timestamp_column(df, &m.timestamp)?;

        let temperature = self.numeric_column(df, &m.temperature)?;
        let humidity = self.numeric_column(df, &m.humidity)?;
        let wind_speed = self.numeric_column(df, &m.wind_speed)?;
        let general = self.numeric_column(df, &m.general_diffuse_flows)?;
        let diffuse = self.numeric_column(df, &m.diffuse_flows)?;
        let zone1 = self.numeric_column(df, &m.zones[0])?;
        let zone2 = self.numeric_column(df, &m.zones[1])?;
        let zone3 = self.numeric_column(df, &m.zones[2])?;

        let observations: Vec<Observation> = (0..df.height())
            .map(|i| {
                Observation::new(
                    timestamps[i],
                    Covariates {
                        temperature: temperature[i],
                        humidity: humidity[i],
                        wind_speed: wind_speed[i],
                        general_diffuse_flows: general[i],
                        diffuse_flows: diffuse[i],
                    },
                    [zone1[i], zone2[i], zone3[i]],
                )
            })
            .collect();

        let series = RawSeries::new(observations);
        debug!(rows = series.len(), "Built raw series");
        Ok(series)
    }

    fn column<'a>(&self, df: &'a DataFrame, name: &str) -> Result<&'a Series> {
        df.column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| LoadcastError::input(Stage::Loader, format!("missing column '{}'", name)))
    }

    fn numeric_column(&self, df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let series = self.column(df, name)?.cast(&DataType::Float64)?;
        let ca = series.f64()?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    fn timestamp_column(&self, df: &DataFrame, name: &str) -> Result<Vec<NaiveDateTime>> {
        let series = self.column(df, name)?.cast(&DataType::String)?;
        let ca = series.str()?;

        ca.into_iter()
            .enumerate()
            .map(|(row, value)| {
                let raw = value.ok_or_else(|| {
                    LoadcastError::input(Stage::Loader, format!("missing timestamp at row {}", row))
                })?;
                parse_timestamp(raw).ok_or_else(|| {
                    LoadcastError::input(
                        Stage::Loader,
                        format!("unparseable timestamp '{}' at row {}", raw, row),
                    )
                })
            })
            .collect()
    }
}
