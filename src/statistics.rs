//! Descriptive statistics shared by the fitters
//!
//! Small helpers used to summarize posterior draws and data columns.
//!
//! - [`mean`]: Arithmetic mean of a dataset.
//! - [`stddev_and_mean`]: Standard deviation and mean of a dataset.
//! - [`effective_sample_size`]: Autocorrelation-adjusted sample count for
//!   an MCMC chain; a measure of how well the chain mixed.

/// Computes the arithmetic mean of a sequence of values.
///
/// Returns zero if the iterator yields no elements.
///
/// # Examples
/// ```rust
/// let values = vec![1.0, 2.0, 3.0];
/// let m = icetemp::statistics::mean(values.into_iter());
/// assert_eq!(m, 2.0);
/// ```
pub fn mean(data: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0.0;
    for value in data {
        sum += value;
        count += 1.0;
    }
    if count == 0.0 {
        return 0.0;
    }
    sum / count
}

/// Computes the standard deviation of a sequence of values.
/// - Uses the population formula (divides by `N`) rather than `N-1`.
///
/// Also returns the mean, for performance reasons.
///
/// # Returns
/// A `(stddev, mean)` tuple. Both are zero for an empty iterator.
///
/// # Examples
/// ```rust
/// let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// let (sd, mean) = icetemp::statistics::stddev_and_mean(values.into_iter());
/// assert_eq!(sd, 2.0);
/// assert_eq!(mean, 5.0);
/// ```
pub fn stddev_and_mean(data: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = data.collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mean = mean(values.iter().copied());
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (variance.sqrt(), mean)
}

/// Computes the effective sample size of an MCMC chain.
///
/// Correlated draws carry less information than independent ones; the ESS
/// is the equivalent number of independent draws, estimated from the
/// autocorrelation function with Geyer's initial positive sequence
/// truncation (the sum stops at the first non-positive autocorrelation).
///
/// Returns `n` for a chain with no detectable autocorrelation, and zero
/// for chains shorter than two draws or with zero variance.
#[must_use]
pub fn effective_sample_size(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return 0.0;
    }

    let (sd, mean) = stddev_and_mean(chain.iter().copied());
    let variance = sd * sd;
    if variance == 0.0 {
        return 0.0;
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let mut acov = 0.0;
        for i in 0..n - lag {
            acov += (chain[i] - mean) * (chain[i + lag] - mean);
        }
        let rho = acov / (n as f64 * variance);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    n as f64 / (1.0 + 2.0 * rho_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_mean_simple() {
        assert_relative_eq!(mean([1.0, 2.0, 3.0, 4.0].into_iter()), 2.5);
    }

    #[test]
    fn test_stddev_and_mean() {
        let (sd, m) = stddev_and_mean([1.0, 1.0, 1.0].into_iter());
        assert_eq!(sd, 0.0);
        assert_relative_eq!(m, 1.0);
    }

    #[test]
    fn test_ess_independent_chain() {
        // Alternating values are anti-correlated, so the ESS should be at
        // least the nominal count.
        let chain: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(effective_sample_size(&chain) >= 200.0);
    }

    #[test]
    fn test_ess_constant_chain() {
        let chain = vec![3.0; 100];
        assert_eq!(effective_sample_size(&chain), 0.0);
    }

    #[test]
    fn test_ess_correlated_chain() {
        // A slowly varying chain should have far fewer effective samples
        // than nominal.
        let chain: Vec<f64> = (0..500).map(|i| f64::from(i) / 500.0).collect();
        assert!(effective_sample_size(&chain) < 50.0);
    }
}
