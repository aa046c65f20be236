//! Instantaneous reproduction number estimated from daily incidence.
//!
//! The raw counts are smoothed with a trailing moving average, then each
//! date gets the Gamma posterior of Rt over a trailing window (Cori et al.,
//! 2013). Rows are only emitted once both the smoothing window and the Rt
//! window are complete.

use chrono::Duration;
use chrono::naive::NaiveDate;
use statrs::distribution::{Gamma,ContinuousCDF};

use super::error::{Result,Error};
use super::graph::Series;
use super::serial::SerialInterval;
use super::average;


#[derive(Clone,Debug)]
pub struct EstimatorParams {
    pub smoothing_window: usize,
    pub r_window_size: usize,
    pub quantiles: (f64,f64,f64),
    pub prior_shape: f64,
    pub prior_scale: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
	Self {
	    smoothing_window: 21,
	    r_window_size: 7,
	    quantiles: (0.05, 0.5, 0.95),
	    prior_shape: 1.0,
	    prior_scale: 5.0,
	}
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct RtRow {
    pub date: NaiveDate,
    pub cases: f64,
    pub smoothed_cases: f64,
    pub rt_q05: f64,
    pub rt_median: f64,
    pub rt_q95: f64,
}

impl RtRow {
    pub fn is_defined(&self) -> bool {
	self.rt_q05.is_finite() && self.rt_median.is_finite() && self.rt_q95.is_finite()
    }
}


pub fn estimate(series: &Series, si: &SerialInterval, params: &EstimatorParams) -> Result<Vec<RtRow>> {

    let (q_low,q_mid,q_high) = params.quantiles;

    if params.smoothing_window == 0 || params.r_window_size == 0 {
	return Err(Error::InvalidParameter("window sizes must be positive"));
    }
    if !(0.0 < q_low && q_low <= q_mid && q_mid <= q_high && q_high < 1.0) {
	return Err(Error::InvalidParameter("quantiles must be ordered within (0, 1)"));
    }
    if !(params.prior_shape > 0.0 && params.prior_scale > 0.0) {
	return Err(Error::InvalidParameter("prior must be positive"));
    }

    let offset = params.smoothing_window + params.r_window_size;
    if series.len() <= offset {
	return Err(Error::InsufficientHistory { needed: offset + 1, available: series.len() });
    }

    for i in 1..series.len() {
	if series[i].0 != series[i-1].0 + Duration::days(1) {
	    return Err(Error::Discontinuity(series[i].0));
	}
    }

    let smoothed = average(series, params.smoothing_window);
    let pressure = infection_pressure(&smoothed, si);

    (offset..series.len()).map(|t| {

	let window = t + 1 - params.r_window_size..=t;
	let incidence: f64 = smoothed[window.clone()].iter().map(|(_,v)| v).sum();
	let expected: f64 = pressure[window].iter().sum();

	let (rt_q05,rt_median,rt_q95) = match incidence > 0.0 && expected > 0.0 {
	    false => (f64::NAN, f64::NAN, f64::NAN),
	    true => {
		let posterior = Gamma::new(params.prior_shape + incidence,
					   1.0 / params.prior_scale + expected)?;
		(posterior.inverse_cdf(q_low),
		 posterior.inverse_cdf(q_mid),
		 posterior.inverse_cdf(q_high))
	    }
	};

	Ok(RtRow {
	    date: series[t].0,
	    cases: series[t].1,
	    smoothed_cases: smoothed[t].1,
	    rt_q05, rt_median, rt_q95
	})

    }).collect()

}


/// Rows with finite Rt only.
pub fn drop_undefined(rows: Vec<RtRow>) -> Vec<RtRow> {
    rows.into_iter().filter(RtRow::is_defined).collect()
}


fn infection_pressure(smoothed: &Series, si: &SerialInterval) -> Vec<f64> {
    (0..smoothed.len()).map(
	|t| (1..=t).map(|s| si.weight(s) * smoothed[t-s].1).sum()
    ).collect()
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::NaiveDateRange;

    fn series(start: NaiveDate, values: &[f64]) -> Series {
	NaiveDateRange(start, None).zip(values.iter().copied()).collect()
    }

    fn day0() -> NaiveDate {
	NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
    }

    #[test]
    fn flat_incidence_gives_unit_rt() {
	let si = SerialInterval::standard().unwrap();
	let rows = estimate(&series(day0(), &[100.0; 60]), &si, &EstimatorParams::default()).unwrap();
	assert_eq!(rows.len(), 60 - 28);
	for row in &rows {
	    assert!((row.rt_median - 1.0).abs() < 0.02, "{:?}", row);
	    assert!((row.smoothed_cases - 100.0).abs() < 1e-9);
	}
    }

    #[test]
    fn first_date_skips_both_windows() {
	let si = SerialInterval::standard().unwrap();
	let rows = estimate(&series(day0(), &[50.0; 40]), &si, &EstimatorParams::default()).unwrap();
	assert_eq!(rows[0].date, day0() + Duration::days(21 + 7));
	for pair in rows.windows(2) {
	    assert_eq!(pair[1].date, pair[0].date + Duration::days(1));
	}
    }

    #[test]
    fn quantiles_are_ordered() {
	let si = SerialInterval::standard().unwrap();
	let values: Vec<f64> = (0..80).map(|i| (20.0 * (1.05f64).powi(i)).round()).collect();
	let rows = estimate(&series(day0(), &values), &si, &EstimatorParams::default()).unwrap();
	assert!(!rows.is_empty());
	for row in rows.iter().filter(|r| r.is_defined()) {
	    assert!(row.rt_q05 <= row.rt_median, "{:?}", row);
	    assert!(row.rt_median <= row.rt_q95, "{:?}", row);
	    assert!(row.rt_q05 >= 0.0);
	}
	// a growing epidemic reproduces above one
	assert!(rows.last().unwrap().rt_median > 1.0);
    }

    #[test]
    fn zero_incidence_is_undefined_not_an_error() {
	let si = SerialInterval::standard().unwrap();
	let mut values = vec![0.0; 50];
	values.extend(vec![10.0; 10]);
	let rows = estimate(&series(day0(), &values), &si, &EstimatorParams::default()).unwrap();
	assert!(!rows[0].is_defined());
	assert!(rows[0].rt_median.is_nan());
	assert!(rows.last().unwrap().is_defined());
	let defined = drop_undefined(rows.clone());
	assert!(defined.len() < rows.len());
	assert!(defined.iter().all(RtRow::is_defined));
    }

    #[test]
    fn short_series_is_insufficient() {
	let si = SerialInterval::standard().unwrap();
	match estimate(&series(day0(), &[10.0; 28]), &si, &EstimatorParams::default()) {
	    Err(Error::InsufficientHistory { needed, available }) => {
		assert_eq!(needed, 29);
		assert_eq!(available, 28);
	    },
	    other => panic!("unexpected {:?}", other)
	}
    }

    #[test]
    fn gaps_are_rejected() {
	let si = SerialInterval::standard().unwrap();
	let mut data = series(day0(), &[10.0; 40]);
	data.remove(12);
	assert!(matches!(estimate(&data, &si, &EstimatorParams::default()),
			 Err(Error::Discontinuity(_))));
    }

    #[test]
    fn rejects_unordered_quantiles() {
	let si = SerialInterval::standard().unwrap();
	let params = EstimatorParams { quantiles: (0.5, 0.05, 0.95), ..Default::default() };
	assert!(matches!(estimate(&series(day0(), &[10.0; 40]), &si, &params),
			 Err(Error::InvalidParameter(_))));
    }

}
