//! Validated observation sets for the fitting routines
//!
//! The fitters in this crate all consume tabular data: three equal-length
//! numeric columns. This module defines the two dataset types and performs
//! all input validation up front, so the numerical code can assume
//! well-formed data and never silently propagate NaN or Inf.
//!
//! - [`DepthProfile`]: temperature vs. depth, with per-point temperature
//!   errors. Input to the quadratic fitters and likelihood evaluators.
//! - [`TemperatureTimeline`]: temperature vs. year, with per-point
//!   prediction errors. Input to the Gaussian-process regression.

use crate::error::{Error, Result};

/// Minimum number of observations: the quadratic model has three free
/// parameters, so fewer points cannot constrain a fit.
pub const MIN_POINTS: usize = 3;

/// Checks the shared column invariants: equal lengths, at least
/// [`MIN_POINTS`] rows, strictly positive error values, all finite.
fn validate_columns(x: &[f64], y: &[f64], errors: &[f64]) -> Result<()> {
    if x.len() != y.len() || y.len() != errors.len() || x.len() < MIN_POINTS {
        return Err(Error::ShapeMismatch {
            depths: x.len(),
            temperatures: y.len(),
            errors: errors.len(),
        });
    }

    for (index, &value) in errors.iter().enumerate() {
        // NaN is caught by the finiteness check.
        if value <= 0.0 || !value.is_finite() {
            return Err(Error::InvalidNoise { index, value });
        }
    }

    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(Error::Algebra("non-finite value in input columns"));
    }

    Ok(())
}

/// An ordered set of ice-core observations: temperature measured at a
/// sequence of depths, each with its own measurement error.
///
/// Corresponds to the conventional tabular columns `Depth`, `Temperature`
/// and `temp_errors`. Construction validates the columns once; a value of
/// this type always satisfies:
/// - all three columns have equal length `N >= 3`,
/// - every temperature error is strictly positive and finite,
/// - every depth and temperature is finite.
///
/// # Example
/// ```
/// # use icetemp::DepthProfile;
/// let profile = DepthProfile::new(
///     vec![0.0, 1.0, 2.0, 3.0],
///     vec![1.0, 4.0, 9.0, 16.0],
///     vec![1.0, 1.0, 1.0, 1.0],
/// ).unwrap();
/// assert_eq!(profile.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DepthProfile {
    depth: Vec<f64>,
    temperature: Vec<f64>,
    temp_error: Vec<f64>,
}

impl DepthProfile {
    /// Creates a validated observation set from its three columns.
    ///
    /// # Parameters
    /// - `depth`: Depth of each measurement.
    /// - `temperature`: Measured temperature at each depth.
    /// - `temp_error`: One-sigma measurement error for each temperature.
    ///
    /// # Errors
    /// - [`Error::ShapeMismatch`]: column lengths differ, or fewer than 3 rows.
    /// - [`Error::InvalidNoise`]: a temperature error is zero, negative, or NaN.
    /// - [`Error::Algebra`]: a depth or temperature is NaN or infinite.
    pub fn new(depth: Vec<f64>, temperature: Vec<f64>, temp_error: Vec<f64>) -> Result<Self> {
        validate_columns(&depth, &temperature, &temp_error)?;
        Ok(Self {
            depth,
            temperature,
            temp_error,
        })
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    /// Always false: a profile holds at least [`MIN_POINTS`] rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// Depth column.
    #[must_use]
    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    /// Temperature column.
    #[must_use]
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Temperature-error column (one sigma per point).
    #[must_use]
    pub fn temp_error(&self) -> &[f64] {
        &self.temp_error
    }

    /// Iterates over `(depth, temperature, temp_error)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.depth
            .iter()
            .zip(&self.temperature)
            .zip(&self.temp_error)
            .map(|((&d, &t), &e)| (d, t, e))
    }
}

/// Temperatures at a fixed depth over a long period of time, with the
/// regression errors attached to each reconstructed temperature.
///
/// Corresponds to the conventional tabular columns `year`, `Temperature`
/// and `prediction_errors`. Input to [`crate::MarginalGp`]. The validation
/// invariants are the same as for [`DepthProfile`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureTimeline {
    year: Vec<f64>,
    temperature: Vec<f64>,
    prediction_error: Vec<f64>,
}

impl TemperatureTimeline {
    /// Creates a validated timeline from its three columns.
    ///
    /// # Errors
    /// Same taxonomy as [`DepthProfile::new`].
    pub fn new(year: Vec<f64>, temperature: Vec<f64>, prediction_error: Vec<f64>) -> Result<Self> {
        validate_columns(&year, &temperature, &prediction_error)?;
        Ok(Self {
            year,
            temperature,
            prediction_error,
        })
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.year.len()
    }

    /// Always false: a timeline holds at least [`MIN_POINTS`] rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
    }

    /// Year column.
    #[must_use]
    pub fn year(&self) -> &[f64] {
        &self.year
    }

    /// Temperature column.
    #[must_use]
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Prediction-error column (one sigma per point).
    #[must_use]
    pub fn prediction_error(&self) -> &[f64] {
        &self.prediction_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_new_valid() {
        let profile = DepthProfile::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![0.5, 0.5, 0.5],
        )
        .unwrap();
        assert_eq!(profile.len(), 3);
        assert!(!profile.is_empty());
    }

    #[test]
    fn test_profile_rejects_unequal_lengths() {
        let err = DepthProfile::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0], vec![0.5, 0.5, 0.5])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_profile_rejects_too_few_points() {
        let err = DepthProfile::new(vec![0.0, 1.0], vec![1.0, 2.0], vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_profile_rejects_zero_error() {
        let err = DepthProfile::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![0.5, 0.0, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNoise { index: 1, .. }));
    }

    #[test]
    fn test_profile_rejects_negative_error() {
        let err = DepthProfile::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![0.5, 0.5, -1.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNoise { index: 2, .. }));
    }

    #[test]
    fn test_profile_rejects_nan_temperature() {
        let err = DepthProfile::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, f64::NAN, 3.0],
            vec![0.5, 0.5, 0.5],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Algebra(_)));
    }

    #[test]
    fn test_profile_iter_order() {
        let profile = DepthProfile::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();
        let triples: Vec<_> = profile.iter().collect();
        assert_eq!(triples[1], (1.0, 2.0, 0.2));
    }

    #[test]
    fn test_timeline_new_valid() {
        let timeline = TemperatureTimeline::new(
            vec![1900.0, 1950.0, 2000.0],
            vec![-30.0, -29.5, -28.0],
            vec![0.2, 0.2, 0.2],
        )
        .unwrap();
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_timeline_rejects_nan_error() {
        let err = TemperatureTimeline::new(
            vec![1900.0, 1950.0, 2000.0],
            vec![-30.0, -29.5, -28.0],
            vec![0.2, f64::NAN, 0.2],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNoise { index: 1, .. }));
    }
}
