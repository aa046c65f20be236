//! Discrete serial interval distribution used as the renewal kernel.

use statrs::distribution::{Gamma,ContinuousCDF};

use super::error::{Result,Error};


/// Mean generation time of SARS-CoV-2 in days.
pub const SI_MEAN: f64 = 4.8;
/// Standard deviation of the generation time in days.
pub const SI_SD: f64 = 2.3;
/// Last day covered by the discretised distribution.
pub const SI_DAYS: usize = 30;


#[derive(Clone,Debug,PartialEq)]
pub struct SerialInterval {
    weights: Vec<f64>,
}

impl SerialInterval {

    /// Gamma generation time with `SI_MEAN`/`SI_SD`, discretised over
    /// days `1..=SI_DAYS`. Day 0 carries no weight.
    pub fn standard() -> Result<Self> {
	let shape = (SI_MEAN / SI_SD).powi(2);
	let rate = SI_MEAN / SI_SD.powi(2);
	let gamma = Gamma::new(shape, rate)?;
	let weights = (0..=SI_DAYS).map(|k| match k {
	    0 => 0.0,
	    k => gamma.cdf(k as f64) - gamma.cdf((k - 1) as f64)
	}).collect();
	Self::from_weights(weights)
    }

    pub fn from_weights(weights: Vec<f64>) -> Result<Self> {
	if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
	    return Err(Error::InvalidSerialInterval);
	}
	let total: f64 = weights.iter().sum();
	match total > 0.0 {
	    false => Err(Error::InvalidSerialInterval),
	    true => Ok(Self { weights: weights.into_iter().map(|w| w / total).collect() })
	}
    }

    /// Probability mass at `days_ago`, zero past the end of the table.
    pub fn weight(&self, days_ago: usize) -> f64 {
	self.weights.get(days_ago).copied().unwrap_or(0.0)
    }

    #[cfg(test)]
    pub fn weights(&self) -> &[f64] {
	&self.weights
    }

    pub fn len(&self) -> usize {
	self.weights.len()
    }

    /// One past the last index with positive weight.
    pub fn support(&self) -> usize {
	self.weights.iter().rposition(|w| *w > 0.0).map_or(0, |i| i + 1)
    }

}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn standard_weights_sum_to_one() {
	let si = SerialInterval::standard().unwrap();
	let total: f64 = si.weights().iter().sum();
	assert!((total - 1.0).abs() < 1e-9);
	assert_eq!(si.len(), SI_DAYS + 1);
	assert_eq!(si.weight(0), 0.0);
	assert!(si.weights().iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn standard_mass_is_concentrated_near_mean() {
	let si = SerialInterval::standard().unwrap();
	let mean: f64 = si.weights().iter().enumerate()
	    .map(|(k,w)| k as f64 * w).sum();
	assert!((mean - SI_MEAN).abs() < 0.75, "mean {}", mean);
	let mode = (0..si.len()).max_by(
	    |a,b| si.weight(*a).partial_cmp(&si.weight(*b)).unwrap()).unwrap();
	assert!(mode >= 3 && mode <= 6, "mode {}", mode);
    }

    #[test]
    fn weight_is_zero_padded() {
	let si = SerialInterval::from_weights(vec![0.0, 1.0, 3.0]).unwrap();
	assert_eq!(si.weight(1), 0.25);
	assert_eq!(si.weight(2), 0.75);
	assert_eq!(si.weight(3), 0.0);
	assert_eq!(si.weight(1000), 0.0);
	assert_eq!(si.support(), 3);
    }

    #[test]
    fn support_ignores_trailing_zeros() {
	let si = SerialInterval::from_weights(vec![0.0, 0.5, 0.5, 0.0, 0.0]).unwrap();
	assert_eq!(si.len(), 5);
	assert_eq!(si.support(), 3);
    }

    #[test]
    fn rejects_degenerate_weights() {
	assert!(matches!(SerialInterval::from_weights(vec![]),
			 Err(Error::InvalidSerialInterval)));
	assert!(matches!(SerialInterval::from_weights(vec![0.0, 0.0]),
			 Err(Error::InvalidSerialInterval)));
	assert!(matches!(SerialInterval::from_weights(vec![0.5, -0.1]),
			 Err(Error::InvalidSerialInterval)));
    }

}
