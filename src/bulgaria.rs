use std::fs;
use std::path::Path;
use std::time::Duration;
use std::collections::BTreeMap;

use chrono::{NaiveDateTime,Weekday};
use chrono::naive::NaiveDate;
use serde::Deserialize;
use tracing::{info,warn};

use super::error::{Result,Error};
use super::graph::Series;
use super::weekly::{self,WeekCases};
use super::NaiveDateRange;


const BASE_URL: &str = "https://raw.githubusercontent.com/COVID-19-Bulgaria\
			/covid-database/master/Bulgaria";

const DATE_DIFF_CASES: &str = "DateDiffCasesDataset.json";
const DATE_ACTIVE_CASES: &str = "DateActiveCasesDataset.json";
const WEEK_CASES: &str = "WeekCasesDataset.csv";
const WEEK_PLACES_CASES: &str = "WeekPlacesCasesDataset.csv";
const DATE_POSITIVE_TESTS: &str = "DatePositiveTestsDataset.csv";


#[derive(Deserialize,Debug)]
struct WeekRecord {
    year: i32,
    week: u32,
    #[serde(default)]
    infected: Option<f64>,
    #[serde(default)]
    cured: Option<f64>,
    #[serde(default)]
    fatal: Option<f64>,
    #[serde(default)]
    hospitalized: Option<f64>,
    #[serde(default)]
    intensive_care: Option<f64>,
}

#[derive(Deserialize,Debug)]
struct PlaceWeekRecord {
    year: i32,
    week: u32,
    place: String,
    #[serde(default)]
    infected: Option<f64>,
    #[serde(default)]
    infected_avg: Option<f64>,
}

/// Some dumps wrap each value in a one-element list.
#[derive(Deserialize,Debug)]
#[serde(untagged)]
enum Cell {
    Value(Option<f64>),
    Nested(Vec<Option<f64>>),
}

impl Cell {
    fn value(self) -> Option<f64> {
	match self {
	    Self::Value(value) => value,
	    Self::Nested(values) => values.into_iter().next().flatten()
	}
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct WeekRow {
    pub date: NaiveDate,
    pub infected: Option<f64>,
    pub cured: Option<f64>,
    pub fatal: Option<f64>,
    pub hospitalized: Option<f64>,
    pub intensive_care: Option<f64>,
}

#[derive(Clone,Debug,PartialEq)]
pub struct PlaceWeek {
    pub date: NaiveDate,
    pub place: String,
    pub infected: Option<f64>,
    pub infected_avg: Option<f64>,
}

pub enum Variable {
    Infected,
    Cured,
    Fatal,
    Hospitalized,
    IntensiveCare,
}

impl Variable {

    pub fn key(&self) -> &'static str {
	match self {
	    Self::Infected => "cases.infected",
	    Self::Cured => "cases.cured",
	    Self::Fatal => "cases.fatal",
	    Self::Hospitalized => "cases.hospitalized",
	    Self::IntensiveCare => "cases.intensive_care"
	}
    }

    pub fn get(&self, row: &WeekRow) -> Option<f64> {
	match self {
	    Self::Infected => row.infected,
	    Self::Cured => row.cured,
	    Self::Fatal => row.fatal,
	    Self::Hospitalized => row.hospitalized,
	    Self::IntensiveCare => row.intensive_care
	}
    }

}

#[derive(Deserialize,Clone,Debug,PartialEq)]
pub struct PositiveTests {
    pub date: NaiveDate,
    #[serde(default)]
    pub pcr_tests: f64,
    #[serde(default)]
    pub antigen_tests: f64,
    #[serde(default)]
    pub positive_pcr_tests: f64,
    #[serde(default)]
    pub positive_antigen_tests: f64,
    #[serde(default)]
    pub positive_percentage: Option<f64>,
    #[serde(default)]
    pub pcr_positive_percentage: Option<f64>,
    #[serde(default)]
    pub antigen_positive_percentage: Option<f64>,
}

#[derive(Clone,Debug,PartialEq)]
pub struct WeeklyTests {
    pub week_ending: NaiveDate,
    pub pcr_tests: f64,
    pub antigen_tests: f64,
    pub positive_pcr_tests: f64,
    pub positive_antigen_tests: f64,
    pub positive_percentage: Option<f64>,
    pub pcr_positive_percentage: Option<f64>,
    pub antigen_positive_percentage: Option<f64>,
    pub total_tests: f64,
    pub total_positive_tests: f64,
}


pub fn date_diff_cases(cache_path: &Path, ttl: Duration) -> Result<Series> {
    parse_date_diff_cases(&cached(cache_path, DATE_DIFF_CASES, ttl)?, "infected")
}

pub fn date_active_cases(cache_path: &Path, ttl: Duration) -> Result<Series> {
    parse_active_cases(&cached(cache_path, DATE_ACTIVE_CASES, ttl)?)
}

pub fn week_cases(cache_path: &Path, ttl: Duration) -> Result<Vec<WeekRow>> {
    parse_week_cases(&cached(cache_path, WEEK_CASES, ttl)?)
}

pub fn week_places_cases(cache_path: &Path, ttl: Duration) -> Result<Vec<PlaceWeek>> {
    parse_week_places_cases(&cached(cache_path, WEEK_PLACES_CASES, ttl)?)
}

pub fn date_positive_tests(cache_path: &Path, ttl: Duration) -> Result<Vec<PositiveTests>> {
    parse_positive_tests(&cached(cache_path, DATE_POSITIVE_TESTS, ttl)?)
}


/// Column-oriented JSON (`{column: {date: value}}`) to a gap-free daily
/// series of one column. Missing days and nulls count as zero.
pub fn parse_date_diff_cases(text: &str, column: &str) -> Result<Series> {

    let mut by_date = BTreeMap::new();
    for (date,value) in parse_column(text, column)? {
	*by_date.entry(date).or_insert(0.0) += value.unwrap_or(0.0);
    }

    let date_range = NaiveDateRange(*by_date.keys().min().ok_or(Error::MissingData)?,
				    Some(*by_date.keys().max().ok_or(Error::MissingData)?));

    Ok(date_range.map(
	|date| (date, by_date.remove(&date).unwrap_or(0.0))
    ).collect())

}


/// Active cases per reported day. Unreported days are left out, not zeroed.
pub fn parse_active_cases(text: &str) -> Result<Series> {
    let mut series: Series = parse_column(text, "active")?.into_iter()
	.filter_map(|(date,value)| value.map(|active| (date, active)))
	.collect();
    series.sort_by_key(|(date,_)| *date);
    series.dedup_by_key(|(date,_)| *date);
    Ok(series)
}


fn parse_column(text: &str, column: &str) -> Result<Vec<(NaiveDate,Option<f64>)>> {
    let mut data: BTreeMap<String,BTreeMap<String,Cell>> = serde_json::from_str(text)?;
    data.remove(column).ok_or(Error::MissingData)?.into_iter()
	.map(|(key,cell)| Ok((parse_key_date(&key)?, cell.value())))
	.collect()
}


pub fn parse_week_cases(text: &str) -> Result<Vec<WeekRow>> {
    let mut rows = csv::Reader::from_reader(text.as_bytes()).deserialize::<WeekRecord>().map(|record| {
	let record = record?;
	Ok(WeekRow {
	    date: iso_week_sunday(record.year, record.week)?,
	    infected: record.infected,
	    cured: record.cured,
	    fatal: record.fatal,
	    hospitalized: record.hospitalized,
	    intensive_care: record.intensive_care,
	})
    }).collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|row| row.date);
    Ok(rows)
}


pub fn parse_week_places_cases(text: &str) -> Result<Vec<PlaceWeek>> {
    let mut rows = csv::Reader::from_reader(text.as_bytes()).deserialize::<PlaceWeekRecord>().map(|record| {
	let record = record?;
	Ok(PlaceWeek {
	    date: iso_week_sunday(record.year, record.week)?,
	    place: record.place,
	    infected: record.infected,
	    infected_avg: record.infected_avg,
	})
    }).collect::<Result<Vec<_>>>()?;
    rows.sort_by(|a,b| a.date.cmp(&b.date).then_with(|| a.place.cmp(&b.place)));
    Ok(rows)
}


pub fn parse_positive_tests(text: &str) -> Result<Vec<PositiveTests>> {
    let mut rows = csv::Reader::from_reader(text.as_bytes()).deserialize()
	.collect::<std::result::Result<Vec<PositiveTests>,_>>()?;
    rows.sort_by_key(|row| row.date);
    Ok(rows)
}


/// Weekly infected totals for the reconciliation step.
pub fn infected_weeks(rows: &[WeekRow]) -> Vec<WeekCases> {
    rows.iter().filter_map(
	|row| row.infected.map(|infected| WeekCases { date: row.date, infected })
    ).collect()
}


/// Daily test records summed per week ending Sunday; percentages are
/// averaged over the days that report them.
pub fn weekly_positive_tests(rows: &[PositiveTests]) -> Vec<WeeklyTests> {

    let mut weeks: BTreeMap<NaiveDate,Vec<&PositiveTests>> = BTreeMap::new();
    for row in rows {
	weeks.entry(weekly::week_ending(row.date)).or_insert_with(Vec::new).push(row);
    }

    weeks.into_iter().map(|(week_ending,days)| {
	let sum = |f: fn(&PositiveTests) -> f64| days.iter().map(|d| f(d)).sum::<f64>();
	let mean = |f: fn(&PositiveTests) -> Option<f64>| {
	    let values: Vec<f64> = days.iter().filter_map(|d| f(d)).collect();
	    match values.is_empty() {
		true => None,
		false => Some(values.iter().sum::<f64>() / values.len() as f64)
	    }
	};
	let pcr_tests = sum(|d| d.pcr_tests);
	let antigen_tests = sum(|d| d.antigen_tests);
	let positive_pcr_tests = sum(|d| d.positive_pcr_tests);
	let positive_antigen_tests = sum(|d| d.positive_antigen_tests);
	WeeklyTests {
	    week_ending,
	    pcr_tests,
	    antigen_tests,
	    positive_pcr_tests,
	    positive_antigen_tests,
	    positive_percentage: mean(|d| d.positive_percentage),
	    pcr_positive_percentage: mean(|d| d.pcr_positive_percentage),
	    antigen_positive_percentage: mean(|d| d.antigen_positive_percentage),
	    total_tests: pcr_tests + antigen_tests,
	    total_positive_tests: positive_pcr_tests + positive_antigen_tests,
	}
    }).collect()

}


fn iso_week_sunday(year: i32, week: u32) -> Result<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)
	.ok_or_else(|| Error::InvalidDate(format!("{}-W{}", year, week)))
}


fn parse_key_date(key: &str) -> Result<NaiveDate> {
    match key.parse::<i64>() {
	Ok(millis) => NaiveDateTime::from_timestamp_opt(millis.div_euclid(1000), 0)
	    .map(|dt| dt.date())
	    .ok_or_else(|| Error::InvalidDate(key.to_string())),
	Err(_) => Ok(NaiveDate::parse_from_str(key.get(..10).unwrap_or(key), "%Y-%m-%d")?)
    }
}


fn cached(cache_path: &Path, name: &str, ttl: Duration) -> Result<String> {

    let cache_path = cache_path.join("bulgaria");
    let cache_file = cache_path.join(name);

    if cache_file.exists() && fs::metadata(&cache_file)?.modified()?.elapsed()? < ttl {
	match fs::read_to_string(&cache_file) {
	    Ok(contents) => return Ok(contents),
	    Err(err) => warn!("Ignoring unreadable cache file {:?}: {}", cache_file, err)
	}
    }

    let data = download(name)?;
    fs::create_dir_all(&cache_path)?;
    fs::write(&cache_file, &data)?;
    Ok(data)

}


fn download(name: &str) -> Result<String> {

    info!("Downloading {}...", name);

    let res = reqwest::blocking::get(&format!("{}/{}", BASE_URL, name))?;

    match res.status().as_u16() {
	200 => Ok(res.text()?),
	_ => Err(Error::HttpError(res.status())),
    }

}
