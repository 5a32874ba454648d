//! Marginal Gaussian-process regression of temperature over time
//!
//! Infers the temperature-vs-time dependence of a
//! [`TemperatureTimeline`] with a Gaussian process:
//!
//! - constant mean function, fixed at the data mean,
//! - exponentiated-quadratic covariance
//!   `k(x, x') = exp(-(x - x')^2 / (2 * ls^2))`,
//! - observation noise fixed to the per-point prediction errors.
//!
//! The one free hyperparameter, the length scale `ls`, carries a
//! Gamma(1, 0.5) prior. [`MarginalGp::fit`] samples its posterior by
//! random-walk Metropolis over the marginal likelihood (in log space, so
//! positivity is automatic) and conditions the returned model on the
//! posterior mean. [`MarginalGp::with_length_scale`] skips the sampling
//! for callers that already know the hyperparameter, or that only need
//! the model to assemble (the fast path for smoke tests).

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{
    data::TemperatureTimeline,
    error::{Error, Result},
    statistics,
};

/// Shape of the Gamma prior on the length scale.
const LS_PRIOR_SHAPE: f64 = 1.0;

/// Rate of the Gamma prior on the length scale.
const LS_PRIOR_RATE: f64 = 0.5;

/// Chains used for hyperparameter sampling.
const N_CHAINS: usize = 2;

/// Tuning iterations per chain, discarded.
const N_TUNE: usize = 1000;

/// Retained length-scale draws per chain.
const N_DRAWS: usize = 1000;

/// Points in the default prediction grid.
const GRID_POINTS: usize = 100;

/// Fraction of the data range the default grid extends past each end.
const GRID_MARGIN: f64 = 0.2;

/// Exponentiated-quadratic covariance between two time points.
fn expquad(a: f64, b: f64, length_scale: f64) -> f64 {
    let d = a - b;
    (-d * d / (2.0 * length_scale * length_scale)).exp()
}

/// Posterior prediction at a single time point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpPrediction {
    /// Posterior mean of the latent temperature.
    pub mean: f64,
    /// Posterior standard deviation of the latent temperature.
    pub sd: f64,
}

/// A trained marginal Gaussian-process model of temperature over time.
///
/// Holds the training data, the constant mean, the fitted length scale
/// (with its posterior spread when obtained through [`MarginalGp::fit`]),
/// and the Cholesky factorization needed for conditional prediction.
///
/// # Example
/// ```
/// # use icetemp::{MarginalGp, TemperatureTimeline};
/// let timeline = TemperatureTimeline::new(
///     vec![1900.0, 1925.0, 1950.0, 1975.0, 2000.0],
///     vec![-31.0, -30.4, -30.1, -29.2, -28.5],
///     vec![0.3, 0.3, 0.3, 0.3, 0.3],
/// ).unwrap();
/// let gp = MarginalGp::with_length_scale(&timeline, 40.0).unwrap();
/// let grid = gp.default_grid();
/// let predictions = gp.predict(&grid).unwrap();
/// assert_eq!(predictions.len(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct MarginalGp {
    year: Vec<f64>,
    mu: f64,
    length_scale: f64,
    length_scale_sd: f64,
    chol: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
}

impl MarginalGp {
    /// Fits the model, sampling the length-scale posterior.
    ///
    /// Runs 2 Metropolis chains of 1000 tuning plus 1000 retained
    /// iterations over the log length scale, then conditions the model
    /// on the posterior mean. Deterministic for a fixed `seed`.
    ///
    /// # Errors
    /// - [`Error::SingularMatrix`]: the kernel matrix is not positive
    ///   definite at the starting point or at the fitted length scale.
    pub fn fit(timeline: &TemperatureTimeline, seed: u64) -> Result<Self> {
        let mu = statistics::mean(timeline.temperature().iter().copied());

        // Start at the prior mean. The starting point must be usable;
        // later proposals that break the factorization are just rejected.
        let theta0 = (LS_PRIOR_SHAPE / LS_PRIOR_RATE).ln();
        log_posterior(timeline, mu, theta0)?;

        let mut draws = Vec::with_capacity(N_CHAINS * N_DRAWS);
        for c in 0..N_CHAINS {
            run_chain(
                timeline,
                mu,
                theta0,
                seed.wrapping_add(c as u64),
                &mut draws,
            );
        }

        let (sd, mean) = statistics::stddev_and_mean(draws.iter().copied());
        log::debug!("GP length-scale posterior: {mean:.4} +/- {sd:.4}");

        let mut model = Self::with_length_scale(timeline, mean)?;
        model.length_scale_sd = sd;
        Ok(model)
    }

    /// Builds the model at a fixed length scale, without sampling.
    ///
    /// # Errors
    /// - [`Error::Algebra`]: `length_scale` is not strictly positive and
    ///   finite.
    /// - [`Error::SingularMatrix`]: the kernel matrix at this length
    ///   scale is not positive definite.
    pub fn with_length_scale(timeline: &TemperatureTimeline, length_scale: f64) -> Result<Self> {
        if length_scale <= 0.0 || !length_scale.is_finite() {
            return Err(Error::Algebra("length scale must be strictly positive"));
        }

        let n = timeline.len();
        let mu = statistics::mean(timeline.temperature().iter().copied());
        let chol = kernel_cholesky(timeline, length_scale)
            .ok_or(Error::SingularMatrix { n, k: n })?;

        let residual =
            DVector::from_iterator(n, timeline.temperature().iter().map(|t| t - mu));
        let alpha = chol.solve(&residual);

        Ok(Self {
            year: timeline.year().to_vec(),
            mu,
            length_scale,
            length_scale_sd: 0.0,
            chol,
            alpha,
        })
    }

    /// Constant mean of the model (the training-data mean).
    #[must_use]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// The fitted length scale: the posterior mean after [`MarginalGp::fit`],
    /// or the caller's value after [`MarginalGp::with_length_scale`].
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Posterior standard deviation of the length scale. Zero for a
    /// model built with [`MarginalGp::with_length_scale`].
    #[must_use]
    pub fn length_scale_sd(&self) -> f64 {
        self.length_scale_sd
    }

    /// The default prediction grid: 100 evenly spaced time points
    /// covering the training years extended by 20% of their range on
    /// each side.
    #[must_use]
    pub fn default_grid(&self) -> Vec<f64> {
        let min = self.year.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.year.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let lo = min - GRID_MARGIN * range;
        let hi = max + GRID_MARGIN * range;
        let step = (hi - lo) / (GRID_POINTS - 1) as f64;
        (0..GRID_POINTS).map(|i| lo + step * i as f64).collect()
    }

    /// Conditional (noise-free) posterior mean and standard deviation of
    /// the latent temperature at each requested time point.
    ///
    /// # Errors
    /// - [`Error::Algebra`]: a requested time point is NaN or infinite.
    pub fn predict(&self, years: &[f64]) -> Result<Vec<GpPrediction>> {
        if years.iter().any(|y| !y.is_finite()) {
            return Err(Error::Algebra("non-finite prediction point"));
        }

        let n = self.year.len();
        let mut out = Vec::with_capacity(years.len());
        for &x in years {
            let k_star = DVector::from_iterator(
                n,
                self.year.iter().map(|&y| expquad(x, y, self.length_scale)),
            );
            let mean = self.mu + k_star.dot(&self.alpha);
            // k(x, x) = 1 for the unit-amplitude ExpQuad kernel. The
            // subtraction can dip slightly below zero numerically.
            let variance = (1.0 - k_star.dot(&self.chol.solve(&k_star))).max(0.0);
            out.push(GpPrediction {
                mean,
                sd: variance.sqrt(),
            });
        }
        Ok(out)
    }
}

/// Cholesky factorization of the kernel matrix plus the fixed noise
/// diagonal. `None` when the matrix is not positive definite.
fn kernel_cholesky(
    timeline: &TemperatureTimeline,
    length_scale: f64,
) -> Option<Cholesky<f64, Dyn>> {
    let n = timeline.len();
    let year = timeline.year();
    let sigma = timeline.prediction_error();
    let k = DMatrix::from_fn(n, n, |i, j| {
        let noise = if i == j { sigma[i] * sigma[i] } else { 0.0 };
        expquad(year[i], year[j], length_scale) + noise
    });
    Cholesky::new(k)
}

/// Log marginal likelihood of the data at a given length scale.
fn marginal_log_likelihood(
    timeline: &TemperatureTimeline,
    mu: f64,
    length_scale: f64,
) -> Result<f64> {
    let n = timeline.len();
    let chol =
        kernel_cholesky(timeline, length_scale).ok_or(Error::SingularMatrix { n, k: n })?;

    let residual = DVector::from_iterator(n, timeline.temperature().iter().map(|t| t - mu));
    let alpha = chol.solve(&residual);

    let log_det: f64 = chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>() * 2.0;
    let n = n as f64;
    Ok(-0.5 * residual.dot(&alpha)
        - 0.5 * log_det
        - 0.5 * n * (2.0 * std::f64::consts::PI).ln())
}

/// Log posterior density over `theta = ln(length_scale)`: Gamma prior,
/// Jacobian of the log transform, and the marginal likelihood.
fn log_posterior(timeline: &TemperatureTimeline, mu: f64, theta: f64) -> Result<f64> {
    let ls = theta.exp();
    let log_prior = (LS_PRIOR_SHAPE - 1.0) * ls.ln() - LS_PRIOR_RATE * ls;
    Ok(log_prior + theta + marginal_log_likelihood(timeline, mu, ls)?)
}

/// One Metropolis chain over the log length scale, appending retained
/// draws (as length scales) to `draws`.
fn run_chain(
    timeline: &TemperatureTimeline,
    mu: f64,
    theta0: f64,
    seed: u64,
    draws: &mut Vec<f64>,
) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut theta = theta0;
    // Checked by the caller before the chains start.
    let mut logp = log_posterior(timeline, mu, theta).unwrap_or(f64::NEG_INFINITY);
    let mut scale = 0.5_f64;
    let mut window_accepted = 0usize;

    for iter in 0..N_TUNE + N_DRAWS {
        let z: f64 = rng.sample(StandardNormal);
        let proposal = theta + z * scale;
        // A proposal that breaks the factorization has zero posterior
        // density; reject it rather than abort the chain.
        let proposal_logp =
            log_posterior(timeline, mu, proposal).unwrap_or(f64::NEG_INFINITY);
        if rng.gen::<f64>().ln() < proposal_logp - logp {
            theta = proposal;
            logp = proposal_logp;
            window_accepted += 1;
        }

        if iter < N_TUNE {
            if (iter + 1) % 50 == 0 {
                let rate = window_accepted as f64 / 50.0;
                scale = (scale * (rate - 0.3).exp()).clamp(1e-6, 10.0);
                window_accepted = 0;
            }
        } else {
            draws.push(theta.exp());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn timeline() -> TemperatureTimeline {
        TemperatureTimeline::new(
            vec![1900.0, 1920.0, 1940.0, 1960.0, 1980.0, 2000.0],
            vec![-31.0, -30.6, -30.3, -29.6, -29.0, -28.2],
            vec![0.25, 0.25, 0.25, 0.25, 0.25, 0.25],
        )
        .unwrap()
    }

    #[test]
    fn test_with_length_scale_interpolates_training_points() {
        // Nearly noise-free data: the conditional mean must pass through
        // the observations.
        let tl = TemperatureTimeline::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 2.0, 1.5, 0.5],
            vec![1e-4, 1e-4, 1e-4, 1e-4],
        )
        .unwrap();
        let gp = MarginalGp::with_length_scale(&tl, 1.0).unwrap();
        let predictions = gp.predict(tl.year()).unwrap();
        for (p, &y) in predictions.iter().zip(tl.temperature()) {
            assert_abs_diff_eq!(p.mean, y, epsilon = 1e-3);
            assert!(p.sd < 0.05);
        }
    }

    #[test]
    fn test_reverts_to_mean_far_from_data() {
        let gp = MarginalGp::with_length_scale(&timeline(), 20.0).unwrap();
        let far = gp.predict(&[5000.0]).unwrap();
        assert_abs_diff_eq!(far[0].mean, gp.mu(), epsilon = 1e-6);
        assert_abs_diff_eq!(far[0].sd, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_default_grid_span() {
        let gp = MarginalGp::with_length_scale(&timeline(), 20.0).unwrap();
        let grid = gp.default_grid();
        assert_eq!(grid.len(), 100);
        // Range is 100 years, so the grid spans 1880 to 2020.
        assert_abs_diff_eq!(grid[0], 1880.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid[99], 2020.0, epsilon = 1e-9);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let tl = timeline();
        let first = MarginalGp::fit(&tl, 11).unwrap();
        let second = MarginalGp::fit(&tl, 11).unwrap();
        assert_eq!(first.length_scale(), second.length_scale());
        assert_eq!(first.length_scale_sd(), second.length_scale_sd());
    }

    #[test]
    fn test_fit_produces_positive_length_scale() {
        let gp = MarginalGp::fit(&timeline(), 5).unwrap();
        assert!(gp.length_scale() > 0.0);
        assert!(gp.length_scale_sd() > 0.0);
    }

    #[test]
    fn test_singular_kernel_fails() {
        // A huge length scale makes all kernel entries exactly 1.0 in
        // floating point, and the tiny noise vanishes against them.
        let tl = TemperatureTimeline::new(
            vec![0.0, 1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![1e-9, 1e-9, 1e-9],
        )
        .unwrap();
        let err = MarginalGp::with_length_scale(&tl, 1e9).unwrap_err();
        assert!(matches!(err, Error::SingularMatrix { .. }));
    }

    #[test]
    fn test_rejects_bad_length_scale() {
        assert!(MarginalGp::with_length_scale(&timeline(), 0.0).is_err());
        assert!(MarginalGp::with_length_scale(&timeline(), f64::NAN).is_err());
    }

    #[test]
    fn test_predict_rejects_non_finite_point() {
        let gp = MarginalGp::with_length_scale(&timeline(), 20.0).unwrap();
        assert!(gp.predict(&[1950.0, f64::NAN]).is_err());
    }
}
