use std::fs::File;
use std::io;
use std::path::{Path,PathBuf};

use chrono::naive::NaiveDate;
use serde::Deserialize;

use super::error::Result;
use super::locale::Locale;
use super::rt::EstimatorParams;
use super::trend::DEFAULT_DISCOUNT;


#[derive(Deserialize,Clone,Debug,PartialEq)]
#[serde(default)]
pub struct Config {
    pub graph_path: PathBuf,
    pub cache_path: PathBuf,
    pub cache_minutes: u64,
    pub locales: Vec<Locale>,
    pub forecast: ForecastConfig,
}

#[derive(Deserialize,Clone,Debug,PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    pub smoothing_window: usize,
    pub r_window_size: usize,
    pub quantiles: (f64,f64,f64),
    pub horizon: usize,
    pub discount: f64,
    pub band: f64,
    /// Fixes the Poisson draws; fresh entropy on every run when absent.
    pub seed: Option<u64>,
    /// Defaults to the day after the last daily observation.
    pub start_date: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
	Self {
	    graph_path: PathBuf::from("graphs"),
	    cache_path: PathBuf::from("cache"),
	    cache_minutes: 30,
	    locales: vec![Locale::Bg, Locale::En],
	    forecast: ForecastConfig::default(),
	}
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
	Self {
	    smoothing_window: 21,
	    r_window_size: 7,
	    quantiles: (0.05, 0.5, 0.95),
	    horizon: 14,
	    discount: DEFAULT_DISCOUNT,
	    band: 0.05,
	    seed: None,
	    start_date: None,
	}
    }
}

impl ForecastConfig {
    pub fn estimator(&self) -> EstimatorParams {
	EstimatorParams {
	    smoothing_window: self.smoothing_window,
	    r_window_size: self.r_window_size,
	    quantiles: self.quantiles,
	    ..EstimatorParams::default()
	}
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
	match path {
	    None => Ok(Self::default()),
	    Some(path) => Ok(serde_json::from_reader(io::BufReader::new(File::open(path)?))?)
	}
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
	let config = Config::load(None).unwrap();
	assert_eq!(config, Config::default());
	assert_eq!(config.forecast.horizon, 14);
	assert_eq!(config.forecast.estimator().smoothing_window, 21);
	assert_eq!(config.locales, vec![Locale::Bg, Locale::En]);
    }

    #[test]
    fn partial_file_keeps_defaults() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	write!(file, r#"{{"locales": ["en"], "forecast": {{"seed": 42, "start_date": "2021-11-03"}}}}"#).unwrap();
	let config = Config::load(Some(file.path())).unwrap();
	assert_eq!(config.locales, vec![Locale::En]);
	assert_eq!(config.forecast.seed, Some(42));
	assert_eq!(config.forecast.start_date, NaiveDate::from_ymd_opt(2021, 11, 3));
	assert_eq!(config.forecast.r_window_size, 7);
	assert_eq!(config.graph_path, PathBuf::from("graphs"));
    }

    #[test]
    fn malformed_file_is_an_error() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	write!(file, "{{ not json").unwrap();
	assert!(Config::load(Some(file.path())).is_err());
    }

}
