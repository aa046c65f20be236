//! Renewal-equation case projection.
//!
//! Every projected day draws from a Poisson distribution whose mean is the
//! forecast Rt times the serial-interval weighted sum of all earlier days,
//! observed and projected. Draws depend on the caller's random source, so
//! two calls only agree when they are handed identically seeded sources.

use chrono::naive::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution,Poisson};

use super::error::{Result,Error};
use super::graph::Series;
use super::serial::SerialInterval;
use super::trend::{RtForecast,Scenario};


#[derive(Clone,Debug,PartialEq)]
pub struct CaseProjection {
    pub start: NaiveDate,
    pub central: Vec<u64>,
    pub increase: Vec<u64>,
    pub decline: Vec<u64>,
}

impl CaseProjection {

    pub fn scenario(&self, scenario: Scenario) -> &[u64] {
	match scenario {
	    Scenario::Central => &self.central,
	    Scenario::Increase => &self.increase,
	    Scenario::Decline => &self.decline
	}
    }

    pub fn len(&self) -> usize {
	self.central.len()
    }

}


/// The last `length` observed counts strictly before `before`.
pub fn observed_tail(series: &Series, before: NaiveDate, length: usize) -> Vec<f64> {
    let observed: Vec<f64> = series.iter()
	.filter(|(date,_)| *date < before)
	.map(|(_,cases)| *cases)
	.collect();
    observed[observed.len().saturating_sub(length)..].to_vec()
}


pub fn project<R: Rng + ?Sized>(tail: &[f64], rt: &[f64], si: &SerialInterval,
				rng: &mut R) -> Result<Vec<u64>> {

    let mut history: Vec<f64> = tail.to_vec();
    let mut projected = Vec::with_capacity(rt.len());

    for (day,rt) in rt.iter().enumerate() {

	let pressure: f64 = history.iter().rev().enumerate()
	    .map(|(j,cases)| si.weight(j + 1) * cases)
	    .sum();
	let mean = rt * pressure;

	let cases = match mean {
	    m if m == 0.0 => 0,
	    m if m.is_finite() && m > 0.0 => Poisson::new(m)?.sample(rng) as u64,
	    m => return Err(Error::InvalidPoissonMean { day, mean: m })
	};

	history.push(cases as f64);
	projected.push(cases);

    }

    Ok(projected)

}


/// Runs the projector once per scenario, each on its own Rt trajectory.
pub fn project_scenarios<R: Rng + ?Sized>(tail: &[f64], forecast: &RtForecast,
					  si: &SerialInterval, rng: &mut R) -> Result<CaseProjection> {
    Ok(CaseProjection {
	start: forecast.start,
	central: project(tail, forecast.scenario(Scenario::Central), si, rng)?,
	increase: project(tail, forecast.scenario(Scenario::Increase), si, rng)?,
	decline: project(tail, forecast.scenario(Scenario::Decline), si, rng)?,
    })
}
