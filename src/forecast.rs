use chrono::Duration;
use chrono::naive::NaiveDate;
use rand::Rng;
use tracing::{debug,info};

use super::config::ForecastConfig;
use super::error::{Result,Error};
use super::graph::Series;
use super::renewal::{self,CaseProjection};
use super::rt::{self,RtRow};
use super::serial::SerialInterval;
use super::trend::{self,RtForecast,Scenario};
use super::weekly::{self,Reconciled,WeekCases};


/// Everything the forecast chart needs, computed from scratch.
#[derive(Clone,Debug)]
pub struct Forecast {
    pub rt: Vec<RtRow>,
    pub rt_forecast: RtForecast,
    pub projection: CaseProjection,
    pub weekly: Reconciled,
}


pub fn start_date(daily: &Series, config: &ForecastConfig) -> Result<NaiveDate> {
    match config.start_date {
	Some(date) => Ok(date),
	None => daily.last().map(|(date,_)| *date + Duration::days(1)).ok_or(Error::MissingData)
    }
}


pub fn run<R: Rng + ?Sized>(daily: &Series, week_cases: &[WeekCases], start: NaiveDate,
			    config: &ForecastConfig, rng: &mut R) -> Result<Forecast> {

    let si = SerialInterval::standard()?;
    debug!("Serial interval over {} days, {} with positive weight", si.len(), si.support());

    let rt = rt::drop_undefined(rt::estimate(daily, &si, &config.estimator())?);
    info!("Estimated Rt for {} days", rt.len());

    let anchor = start - Duration::days(1);
    let rt_forecast = trend::forecast_rt(&rt, anchor, config.horizon,
					 config.discount, config.band)?;
    debug!("Rt forecast from {}: {:?}", rt_forecast.start, rt_forecast.central);

    let tail = renewal::observed_tail(daily, start, si.support());
    let projection = renewal::project_scenarios(&tail, &rt_forecast, &si, rng)?;
    for scenario in Scenario::ALL.iter() {
	debug!("Projected {} cases: {:?}", scenario.name(), projection.scenario(*scenario));
    }

    let weekly = weekly::reconcile(week_cases, &projection, start)?;
    info!("Weekly forecast boundary: {:?}", weekly.boundary);

    Ok(Forecast { rt, rt_forecast, projection, weekly })

}


#[cfg(test)]
mod tests {

    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::NaiveDateRange;

    fn flat_daily(days: usize) -> Series {
	NaiveDateRange(NaiveDate::from_ymd_opt(2021, 9, 1).unwrap(), None)
	    .take(days).map(|date| (date, 100.0)).collect()
    }

    #[test]
    fn flat_epidemic_end_to_end() {
	let daily = flat_daily(60);
	let config = ForecastConfig::default();
	let start = start_date(&daily, &config).unwrap();
	assert_eq!(start, NaiveDate::from_ymd_opt(2021, 10, 31).unwrap());

	let week_cases = vec![
	    WeekCases { date: NaiveDate::from_ymd_opt(2021, 10, 24).unwrap(), infected: 700.0 },
	];
	let mut rng = StdRng::seed_from_u64(60);
	let forecast = run(&daily, &week_cases, start, &config, &mut rng).unwrap();

	assert!(forecast.rt.iter().all(|row| (row.rt_median - 1.0).abs() < 0.02));
	assert_eq!(forecast.rt_forecast.len(), 14);
	assert_eq!(forecast.rt_forecast.start, start);
	for rt in &forecast.rt_forecast.central {
	    assert!((rt - 1.0).abs() < 0.02, "{}", rt);
	}

	let mean = forecast.projection.central.iter().sum::<u64>() as f64 / 14.0;
	assert!((mean - 100.0).abs() < 15.0, "{}", mean);

	// 2021-10-31 is a Sunday with no weekly row yet
	assert!(matches!(forecast.weekly.boundary,
			 weekly::Boundary::CarriedForward { value, .. } if value == 700.0));
    }

    #[test]
    fn projected_counts_average_out_to_incidence() {
	let daily = flat_daily(60);
	let config = ForecastConfig::default();
	let start = start_date(&daily, &config).unwrap();
	let week_cases = vec![
	    WeekCases { date: NaiveDate::from_ymd_opt(2021, 10, 31).unwrap(), infected: 650.0 },
	];
	let mut rng = StdRng::seed_from_u64(1);
	let runs = 100;
	let mut total = 0.0;
	for _ in 0..runs {
	    let forecast = run(&daily, &week_cases, start, &config, &mut rng).unwrap();
	    total += forecast.projection.central.iter().sum::<u64>() as f64 / 14.0;
	}
	assert!((total / runs as f64 - 100.0).abs() < 5.0);
    }

    #[test]
    fn explicit_start_must_have_an_anchor() {
	let daily = flat_daily(60);
	let config = ForecastConfig {
	    start_date: NaiveDate::from_ymd_opt(2022, 1, 1),
	    ..ForecastConfig::default()
	};
	let start = start_date(&daily, &config).unwrap();
	let mut rng = StdRng::seed_from_u64(0);
	assert!(matches!(run(&daily, &[], start, &config, &mut rng),
			 Err(Error::MissingAnchor(_))));
    }

    #[test]
    fn short_history_propagates() {
	let daily = flat_daily(20);
	let config = ForecastConfig::default();
	let start = start_date(&daily, &config).unwrap();
	let mut rng = StdRng::seed_from_u64(0);
	assert!(matches!(run(&daily, &[], start, &config, &mut rng),
			 Err(Error::InsufficientHistory { .. })));
    }

}
