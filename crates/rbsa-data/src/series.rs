//! Named, time-indexed return series.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::Array1;

/// A named sequence of periodic returns on a strictly increasing date index.
///
/// Missing observations are stored as `NaN` until the series is aligned and
/// cleaned against an asset universe.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Array1<f64>,
}

impl ReturnSeries {
    /// Create a series, validating the index.
    ///
    /// # Errors
    /// Returns [`DataError::DimensionMismatch`] when `dates` and `values` differ
    /// in length and [`DataError::UnorderedIndex`] when the dates are not
    /// strictly increasing.
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(DataError::DimensionMismatch {
                expected: dates.len(),
                actual: values.len(),
            });
        }
        check_strictly_increasing(&name, &dates)?;
        Ok(Self {
            name,
            dates,
            values: Array1::from(values),
        })
    }

    /// Series name (fund or asset ticker).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return values, `NaN` marking a missing observation.
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Whether any observation is missing.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Value on a given date, if the date is in the index.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// Same name and index with replacement values.
    pub fn with_values(&self, values: Array1<f64>) -> Result<Self> {
        if values.len() != self.dates.len() {
            return Err(DataError::DimensionMismatch {
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            name: self.name.clone(),
            dates: self.dates.clone(),
            values,
        })
    }

    /// Drop missing observations.
    pub fn dropna(&self) -> Self {
        let (dates, values): (Vec<NaiveDate>, Vec<f64>) = self
            .dates
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(d, v)| (*d, *v))
            .unzip();
        Self {
            name: self.name.clone(),
            dates,
            values: Array1::from(values),
        }
    }

    /// Sample standard deviation (ddof = 1) of the non-missing values.
    pub fn std_dev(&self) -> f64 {
        sample_std(self.values.iter().copied().filter(|v| v.is_finite()))
    }
}

/// Sample standard deviation with one degree of freedom removed.
pub(crate) fn sample_std(values: impl Iterator<Item = f64>) -> f64 {
    let v: Vec<f64> = values.collect();
    if v.len() < 2 {
        return f64::NAN;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    (ss / (n - 1.0)).sqrt()
}

pub(crate) fn check_strictly_increasing(name: &str, dates: &[NaiveDate]) -> Result<()> {
    match dates.windows(2).position(|w| w[0] >= w[1]) {
        Some(i) => Err(DataError::UnorderedIndex {
            name: name.to_string(),
            position: i + 1,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, 28).unwrap()
    }

    #[test]
    fn test_new_validates_length() {
        let err = ReturnSeries::new("FUND", vec![date(1), date(2)], vec![0.01]);
        assert!(matches!(err, Err(DataError::DimensionMismatch { expected: 2, actual: 1 })));
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let err = ReturnSeries::new("FUND", vec![date(1), date(1)], vec![0.01, 0.02]);
        assert!(matches!(err, Err(DataError::UnorderedIndex { position: 1, .. })));
    }

    #[test]
    fn test_dropna_and_lookup() {
        let s = ReturnSeries::new(
            "FUND",
            vec![date(1), date(2), date(3)],
            vec![0.01, f64::NAN, 0.03],
        )
        .unwrap();
        assert!(s.has_missing());
        let clean = s.dropna();
        assert_eq!(clean.len(), 2);
        assert!(!clean.has_missing());
        assert_eq!(clean.get(date(3)), Some(0.03));
        assert_eq!(clean.get(date(2)), None);
    }

    #[test]
    fn test_std_dev() {
        let s = ReturnSeries::new("X", vec![date(1), date(2), date(3)], vec![1.0, 2.0, 3.0])
            .unwrap();
        assert_relative_eq!(s.std_dev(), 1.0, epsilon = 1e-12);
    }
}
