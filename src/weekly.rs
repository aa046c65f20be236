use std::collections::BTreeMap;

use chrono::{Datelike,Duration};
use chrono::naive::NaiveDate;

use super::error::{Result,Error};
use super::renewal::CaseProjection;
use super::trend::Scenario;


#[derive(Clone,Debug,PartialEq)]
pub struct WeekCases {
    pub date: NaiveDate,
    pub infected: f64,
}

#[derive(Clone,Debug,PartialEq)]
pub struct WeeklyRow {
    pub week_ending: NaiveDate,
    pub central: f64,
    pub increase: f64,
    pub decline: f64,
}

impl WeeklyRow {
    fn flat(week_ending: NaiveDate, value: f64) -> Self {
	Self { week_ending, central: value, increase: value, decline: value }
    }
}

/// How the week containing the forecast start was joined to the observations.
#[derive(Clone,Debug,PartialEq)]
pub enum Boundary {
    /// No observation for the boundary week yet: the previous week was
    /// set to the latest observed weekly value.
    CarriedForward { week_ending: NaiveDate, value: f64 },
    /// The boundary week was partially observed and scaled to seven days.
    ProRated { week_ending: NaiveDate, observed: f64, days_elapsed: u32, value: f64 },
}

#[derive(Clone,Debug,PartialEq)]
pub struct Reconciled {
    pub actual: Vec<WeekCases>,
    pub forecast: Vec<WeeklyRow>,
    pub boundary: Boundary,
}


/// Sunday closing the Monday-based week of `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    date + Duration::days(6 - date.weekday().num_days_from_monday() as i64)
}


/// Daily scenarios to week-ending-Sunday totals: mean of the days present
/// in each week, times seven.
pub fn resample(projection: &CaseProjection) -> Vec<WeeklyRow> {

    let mut weeks: BTreeMap<NaiveDate,([f64; 3],usize)> = BTreeMap::new();

    for i in 0..projection.len() {
	let date = projection.start + Duration::days(i as i64);
	let (sums,n) = weeks.entry(week_ending(date)).or_insert(([0.0; 3], 0));
	for (k,scenario) in Scenario::ALL.iter().enumerate() {
	    sums[k] += projection.scenario(*scenario)[i] as f64;
	}
	*n += 1;
    }

    weeks.into_iter().map(|(week_ending,(sums,n))| WeeklyRow {
	week_ending,
	central: sums[0] / n as f64 * 7.0,
	increase: sums[1] / n as f64 * 7.0,
	decline: sums[2] / n as f64 * 7.0,
    }).collect()

}


pub fn reconcile(actual: &[WeekCases], projection: &CaseProjection,
		 start: NaiveDate) -> Result<Reconciled> {

    let mut actual = actual.to_vec();
    actual.sort_by_key(|week| week.date);

    let mut forecast: BTreeMap<NaiveDate,WeeklyRow> = resample(projection).into_iter()
	.map(|row| (row.week_ending, row)).collect();

    let days_elapsed = start.weekday().num_days_from_monday() + 1;
    let end_of_week = week_ending(start);

    let boundary = match actual.iter_mut().find(|week| week.date == end_of_week) {
	None => {
	    let latest = actual.iter().rev().find(|week| week.date <= end_of_week)
		.ok_or(Error::MissingData)?;
	    let previous_week = end_of_week - Duration::weeks(1);
	    forecast.insert(previous_week, WeeklyRow::flat(previous_week, latest.infected));
	    Boundary::CarriedForward { week_ending: previous_week, value: latest.infected }
	},
	Some(week) => {
	    let observed = week.infected;
	    let value = observed / days_elapsed as f64 * 7.0;
	    week.infected = value;
	    if let Some(row) = forecast.get_mut(&end_of_week) {
		*row = WeeklyRow::flat(end_of_week, value);
	    }
	    Boundary::ProRated { week_ending: end_of_week, observed, days_elapsed, value }
	}
    };

    Ok(Reconciled {
	actual,
	forecast: forecast.into_iter().map(|(_,row)| row).collect(),
	boundary
    })

}
