// src/config.rs
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Open Power System Data, 15 minute resolution, one column per country/metric.
pub const DATASET_URL: &str =
    "https://data.open-power-system-data.org/time_series/latest/time_series_15min_singleindex.csv";

pub const DEFAULT_BROKER: &str = "0.0.0.0:1883";
pub const DEFAULT_TOPIC: &str = "sensor";
pub const DEFAULT_CLIENT_ID: &str = "loadfeed";
pub const DEFAULT_PACING_MS: u64 = 1000;

/// First column of the dataset.
pub const TIMESTAMP_COLUMN: &str = "utc_timestamp";
pub const LOAD_ACTUAL_METRIC: &str = "load_actual_entsoe_transparency";
pub const LOAD_FORECAST_METRIC: &str = "load_forecast_entsoe_transparency";

pub static DEFAULT_COUNTRIES: &[&str] = &["DE", "AT", "HU", "NL", "BE", "LU"];
pub static DEFAULT_METRICS: &[&str] = &[LOAD_ACTUAL_METRIC, LOAD_FORECAST_METRIC];

/// Rows at or before this instant are dropped.
pub fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0)
        .single()
        .expect("2018-01-01T00:00:00Z is a valid instant")
}

/// How the extractor turns a row with several country column-groups into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    /// One record per country present in the row.
    #[default]
    PerCountry,
    /// One record per row; the last matched column decides the country and
    /// overwrites load fields written earlier in the sweep.
    LastWriteWins,
}

/// Immutable run configuration, threaded from `main` into every stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset_url: String,
    /// `host:port` or `tcp://host:port`
    pub broker: String,
    pub topic: String,
    pub client_id: String,
    pub countries: Vec<String>,
    pub metrics: Vec<String>,
    pub cutoff: DateTime<Utc>,
    pub pacing_ms: u64,
    pub grouping: Grouping,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: DATASET_URL.to_string(),
            broker: DEFAULT_BROKER.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            cutoff: default_cutoff(),
            pacing_ms: DEFAULT_PACING_MS,
            grouping: Grouping::default(),
        }
    }
}

impl Config {
    /// Load a YAML file; keys that are absent keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)
            .map_err(|e| Error::config(format!("parsing YAML config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.countries.is_empty() {
            return Err(Error::config("at least one country code is required"));
        }
        if self.metrics.is_empty() {
            return Err(Error::config("at least one metric name is required"));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::config("topic must not be empty"));
        }
        if self.broker.trim().is_empty() {
            return Err(Error::config("broker address must not be empty"));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
