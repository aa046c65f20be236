//! Discounted local linear trend filter for the Rt medians.
//!
//! The state is a level/slope pair with its posterior covariance. Each
//! observation evolves the state with `G = [[1, 1], [0, 1]]`, inflates the
//! covariance by `1 / discount` instead of adding an explicit evolution
//! variance, and learns the observational variance on the fly (West &
//! Harrison, ch. 4). Forecasts are the straight line from the last state.

use chrono::Duration;
use chrono::naive::NaiveDate;
use nalgebra::{Matrix2,Vector2};
use tracing::debug;

use super::error::{Result,Error};
use super::rt::RtRow;


pub const DEFAULT_DISCOUNT: f64 = 0.9;
pub const MIN_TREND_OBSERVATIONS: usize = 5;

const PRIOR_VARIANCE: f64 = 100.0;


#[derive(Clone,Debug,PartialEq)]
pub struct TrendState {
    mean: Vector2<f64>,
    covariance: Matrix2<f64>,
    obs_variance: f64,
    dof: f64,
    discount: f64,
    observations: usize,
}

impl TrendState {

    pub fn new(first: f64, discount: f64) -> Result<Self> {
	if !(discount > 0.0 && discount <= 1.0) {
	    return Err(Error::InvalidParameter("discount must lie in (0, 1]"));
	}
	if !first.is_finite() {
	    return Err(Error::InvalidParameter("trend observation must be finite"));
	}
	Ok(Self {
	    mean: Vector2::new(first, 0.0),
	    covariance: Matrix2::identity() * PRIOR_VARIANCE,
	    obs_variance: 1.0,
	    dof: 1.0,
	    discount,
	    observations: 1,
	})
    }

    pub fn update(&self, observation: f64) -> Self {

	let evolution = Matrix2::new(1.0, 1.0,
				     0.0, 1.0);

	let prior_mean = evolution * self.mean;
	let prior_cov = evolution * self.covariance * evolution.transpose() / self.discount;

	let forecast_var = prior_cov[(0,0)] + self.obs_variance;
	let error = observation - prior_mean[0];
	let gain: Vector2<f64> = prior_cov.column(0).into_owned() / forecast_var;

	let dof = self.dof + 1.0;
	let obs_variance = self.obs_variance
	    + self.obs_variance / dof * (error * error / forecast_var - 1.0);
	let rescale = obs_variance / self.obs_variance;

	Self {
	    mean: prior_mean + gain * error,
	    covariance: (prior_cov - gain * gain.transpose() * forecast_var) * rescale,
	    obs_variance,
	    dof,
	    discount: self.discount,
	    observations: self.observations + 1,
	}

    }

    /// `level + h * slope` for `h = 1..=horizon`.
    pub fn extrapolate(&self, horizon: usize) -> Vec<f64> {
	(1..=horizon).map(|h| self.level() + h as f64 * self.slope()).collect()
    }

    pub fn level(&self) -> f64 {
	self.mean[0]
    }

    pub fn slope(&self) -> f64 {
	self.mean[1]
    }

    pub fn observations(&self) -> usize {
	self.observations
    }

    pub fn obs_variance(&self) -> f64 {
	self.obs_variance
    }

}


pub fn fit(observations: &[f64], discount: f64) -> Result<TrendState> {
    if observations.len() < MIN_TREND_OBSERVATIONS {
	return Err(Error::InsufficientHistory { needed: MIN_TREND_OBSERVATIONS,
						available: observations.len() });
    }
    if observations.iter().any(|v| !v.is_finite()) {
	return Err(Error::InvalidParameter("trend observations must be finite"));
    }
    let state = TrendState::new(observations[0], discount)?;
    Ok(observations[1..].iter().fold(state, |state,obs| state.update(*obs)))
}


#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Scenario {
    Central,
    Increase,
    Decline,
}

impl Scenario {

    pub const ALL: [Scenario; 3] = [Self::Central, Self::Increase, Self::Decline];

    pub fn name(&self) -> &'static str {
	match self {
	    Self::Central => "central",
	    Self::Increase => "increase",
	    Self::Decline => "decline"
	}
    }

}


#[derive(Clone,Debug,PartialEq)]
pub struct RtForecast {
    pub start: NaiveDate,
    pub central: Vec<f64>,
    pub increase: Vec<f64>,
    pub decline: Vec<f64>,
}

impl RtForecast {

    /// Derives the two outer scenarios as `central ± central * band`.
    /// A negative central value flips the band; nothing is clamped.
    pub fn from_central(start: NaiveDate, central: Vec<f64>, band: f64) -> Self {
	Self {
	    start,
	    increase: central.iter().map(|rt| rt + rt * band).collect(),
	    decline: central.iter().map(|rt| rt - rt * band).collect(),
	    central
	}
    }

    pub fn scenario(&self, scenario: Scenario) -> &[f64] {
	match scenario {
	    Scenario::Central => &self.central,
	    Scenario::Increase => &self.increase,
	    Scenario::Decline => &self.decline
	}
    }

    pub fn len(&self) -> usize {
	self.central.len()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
	(0..self.len()).map(move |i| self.start + Duration::days(i as i64))
    }

}


/// Fits the trend to all medians up to and including `anchor` and
/// projects `horizon` days starting the day after.
pub fn forecast_rt(rows: &[RtRow], anchor: NaiveDate, horizon: usize,
		   discount: f64, band: f64) -> Result<RtForecast> {

    let end = rows.iter().position(|row| row.date == anchor)
	.ok_or(Error::MissingAnchor(anchor))?;

    if let Some(row) = rows[..=end].iter().find(|row| !row.rt_median.is_finite()) {
	return Err(Error::UndefinedRt(row.date));
    }

    let medians: Vec<f64> = rows[..=end].iter().map(|row| row.rt_median).collect();
    let state = fit(&medians, discount)?;
    debug!("Trend over {} medians: level {:.3}, slope {:.4}, observation variance {:.5}",
	   state.observations(), state.level(), state.slope(), state.obs_variance());

    Ok(RtForecast::from_central(anchor + Duration::days(1), state.extrapolate(horizon), band))

}
