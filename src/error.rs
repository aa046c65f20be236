use std::{io,time,fmt};
use std::convert::From;

use chrono::naive::NaiveDate;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    CSV(csv::Error),
    JSON(serde_json::Error),
    Reqwest(reqwest::Error),
    HttpError(reqwest::StatusCode),
    SystemTime(time::SystemTimeError),
    ParseDate(chrono::format::ParseError),
    Stats(statrs::StatsError),
    Poisson(rand_distr::PoissonError),
    InsufficientHistory { needed: usize, available: usize },
    Discontinuity(NaiveDate),
    MissingAnchor(NaiveDate),
    UndefinedRt(NaiveDate),
    InvalidPoissonMean { day: usize, mean: f64 },
    InvalidSerialInterval,
    InvalidParameter(&'static str),
    InvalidDate(String),
    MissingData,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
	Self::IO(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
	Self::CSV(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
	Self::JSON(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
	Self::Reqwest(err)
    }
}

impl From<time::SystemTimeError> for Error {
    fn from(err: time::SystemTimeError) -> Self {
	Self::SystemTime(err)
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
	Self::ParseDate(err)
    }
}

impl From<statrs::StatsError> for Error {
    fn from(err: statrs::StatsError) -> Self {
	Self::Stats(err)
    }
}

impl From<rand_distr::PoissonError> for Error {
    fn from(err: rand_distr::PoissonError) -> Self {
	Self::Poisson(err)
    }
}


impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	match self {
	    Self::IO(err) => write!(f, "I/O error: {}", err),
	    Self::CSV(err) => write!(f, "CSV error: {}", err),
	    Self::JSON(err) => write!(f, "JSON error: {}", err),
            Self::Reqwest(err) => write!(f, "Request error: {}", err),
	    Self::HttpError(err) => write!(f, "HTTP error: {}", err),
	    Self::SystemTime(err) => write!(f, "System Time error: {}", err),
	    Self::ParseDate(err) => write!(f, "Date parse error: {}", err),
	    Self::Stats(err) => write!(f, "Statistics error: {}", err),
	    Self::Poisson(err) => write!(f, "Poisson error: {}", err),
	    Self::InsufficientHistory { needed, available } =>
		write!(f, "Insufficient history: need {} observations, have {}", needed, available),
	    Self::Discontinuity(date) => write!(f, "Daily series has a gap before {}", date),
	    Self::MissingAnchor(date) => write!(f, "No Rt estimate for anchor date {}", date),
	    Self::UndefinedRt(date) => write!(f, "Undefined Rt on {}", date),
	    Self::InvalidPoissonMean { day, mean } =>
		write!(f, "Invalid Poisson mean {} on projected day {}", mean, day),
	    Self::InvalidSerialInterval => write!(f, "Serial interval has no positive weight"),
	    Self::InvalidParameter(name) => write!(f, "Invalid parameter: {}", name),
	    Self::InvalidDate(date) => write!(f, "Invalid date: {}", date),
	    Self::MissingData => write!(f, "No data!"),
	}
    }
}

impl std::error::Error for Error {}
