mod graph;
mod error;
mod config;
mod locale;
mod bulgaria;
mod serial;
mod rt;
mod trend;
mod renewal;
mod weekly;
mod forecast;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use chrono::naive::NaiveDate;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info,error};
use tracing_subscriber::{layer::SubscriberExt,util::SubscriberInitExt};

use bulgaria::Variable;
use config::Config;
use graph::Series;
use error::Result;


#[derive(Parser,Debug)]
#[command(name = "covid19-forecast-bg", version,
	  about = "Rt estimate, 14-day case forecast and weekly charts for Bulgaria")]
struct Args {
    /// JSON configuration file; built-in defaults when absent.
    config: Option<PathBuf>,
}


fn main() -> Result<()> {

    let args = Args::parse();

    tracing_subscriber::registry()
	.with(tracing_subscriber::fmt::layer())
	.with(tracing_subscriber::EnvFilter::try_from_default_env()
	      .unwrap_or_else(|_| "covid19_forecast_bg=info".into()))
	.init();

    let config = Config::load(args.config.as_deref())?;
    let generated = Local::now().naive_local().date();

    fs::create_dir_all(&config.graph_path)?;

    if let Err(err) = week_case_graphs(&config, generated) {
	error!("week case graphs: {}", err);
    }

    if let Err(err) = places_cases_graphs(&config, generated) {
	error!("places cases graphs: {}", err);
    }

    if let Err(err) = forecast_graphs(&config, generated) {
	error!("forecast graphs: {}", err);
    }

    if let Err(err) = active_cases_graphs(&config, generated) {
	error!("active cases graphs: {}", err);
    }

    if let Err(err) = positive_tests_graphs(&config, generated) {
	error!("positive tests graphs: {}", err);
    }

    Ok(())

}


fn cache_ttl(config: &Config) -> Duration {
    Duration::from_secs(config.cache_minutes * 60)
}


fn week_case_graphs(config: &Config, generated: NaiveDate) -> Result<()> {

    let rows = bulgaria::week_cases(&config.cache_path, cache_ttl(config))?;

    let groups = vec![
	("WeeklyInfectedCured", vec![Variable::Infected, Variable::Cured]),
	("WeeklyHospitalizedIntensiveCareFatal",
	 vec![Variable::Hospitalized, Variable::IntensiveCare, Variable::Fatal]),
    ];

    for locale in &config.locales {
	for (name,vars) in &groups {
	    graph::week_cases_graph(&config.graph_path, *locale, generated, name, &rows, vars)?;
	}
    }

    Ok(())

}


fn places_cases_graphs(config: &Config, generated: NaiveDate) -> Result<()> {

    let rows = bulgaria::week_places_cases(&config.cache_path, cache_ttl(config))?;

    for locale in &config.locales {
	graph::places_cases_graph(&config.graph_path, *locale, generated, &rows)?;
    }

    Ok(())

}


fn forecast_graphs(config: &Config, generated: NaiveDate) -> Result<()> {

    let daily = bulgaria::date_diff_cases(&config.cache_path, cache_ttl(config))?;
    let weeks = bulgaria::infected_weeks(&bulgaria::week_cases(&config.cache_path, cache_ttl(config))?);
    let start = forecast::start_date(&daily, &config.forecast)?;

    info!("Forecasting {} days from {}", config.forecast.horizon, start);

    let mut rng = match config.forecast.seed {
	Some(seed) => StdRng::seed_from_u64(seed),
	None => StdRng::from_entropy()
    };

    let result = forecast::run(&daily, &weeks, start, &config.forecast, &mut rng)?;

    for locale in &config.locales {
	graph::forecast_graph(&config.graph_path, *locale, generated,
			      config.forecast.band, &result)?;
    }

    Ok(())

}


fn active_cases_graphs(config: &Config, generated: NaiveDate) -> Result<()> {

    let data = bulgaria::date_active_cases(&config.cache_path, cache_ttl(config))?;

    for locale in &config.locales {
	graph::active_cases_graph(&config.graph_path, *locale, generated, &data)?;
    }

    Ok(())

}


fn positive_tests_graphs(config: &Config, generated: NaiveDate) -> Result<()> {

    let data = bulgaria::date_positive_tests(&config.cache_path, cache_ttl(config))?;
    let weeks = bulgaria::weekly_positive_tests(&data);

    for locale in &config.locales {
	graph::positive_tests_graph(&config.graph_path, *locale, generated, &weeks)?;
    }

    Ok(())

}


/// Trailing moving average; the first days average over what is available.
fn average(data: &Series, avg: usize) -> Series {
    let mut sum = 0.0;
    (0..data.len()).map(|i| {
	sum += data[i].1 - if i >= avg {data[i-avg].1} else {0.0};
	(data[i].0, sum / avg.min(i+1) as f64)
    }).collect()
}

#[derive(Clone,Debug)]
pub struct NaiveDateRange(NaiveDate,Option<NaiveDate>);

impl Iterator for NaiveDateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<NaiveDate> {
	match self.1.map_or(true, |end| self.0 <= end) {
	    false => None,
	    true => {
		let current = self.0;
		self.0 = self.0.succ_opt()?;
		Some(current)
	    }
	}
    }
}
