//! Bayesian quadratic fit via random-walk Metropolis sampling
//!
//! Samples the posterior of `temp = q*depth^2 + m*depth + b` with
//! independent Uniform(-100, 100) priors on all three parameters and a
//! Gaussian likelihood using the per-point temperature errors.
//!
//! The sampler runs [`N_CHAINS`] independent chains from the same initial
//! guess, each with [`N_TUNE`] tuning iterations (during which the
//! proposal scales adapt toward a ~30% acceptance rate) followed by
//! [`N_DRAWS`] retained draws. Adaptation is frozen after tuning, so the
//! retained draws come from a valid fixed-kernel Metropolis chain. The
//! whole run is deterministic for a fixed seed.
//!
//! Convergence is summarized per parameter by the split-chain R-hat
//! statistic and effective sample size; poor mixing is logged as a
//! warning rather than treated as an error.

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{
    data::DepthProfile,
    error::{Error, Result},
    likelihood::quadratic_log_likelihood,
    statistics,
};

/// Half-width of the uniform prior box on each parameter.
pub const PRIOR_BOUND: f64 = 100.0;

/// Number of independent chains.
pub const N_CHAINS: usize = 2;

/// Tuning iterations per chain, discarded from the posterior.
pub const N_TUNE: usize = 2000;

/// Retained draws per chain.
pub const N_DRAWS: usize = 2500;

/// Proposal-scale adaptation target during tuning.
const TARGET_ACCEPTANCE: f64 = 0.3;

/// Iterations per adaptation window during tuning.
const TUNE_WINDOW: usize = 50;

/// R-hat threshold above which mixing is considered poor.
const R_HAT_LIMIT: f64 = 1.05;

/// Starting point for the sampler, one value per quadratic parameter.
///
/// Every field must lie inside the prior support `[-100, 100]`;
/// [`QuadraticPosterior::sample`] rejects a guess outside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    /// Starting value for the `depth^2` coefficient.
    pub q: f64,
    /// Starting value for the `depth` coefficient.
    pub m: f64,
    /// Starting value for the constant term.
    pub b: f64,
}

impl InitialGuess {
    fn validated(self) -> Result<[f64; 3]> {
        for (parameter, value) in [("q", self.q), ("m", self.m), ("b", self.b)] {
            if !value.is_finite() || value.abs() > PRIOR_BOUND {
                return Err(Error::InvalidInitialGuess { parameter, value });
            }
        }
        Ok([self.q, self.m, self.b])
    }
}

/// Draws and acceptance count from one chain, tuning discarded.
struct ChainRun {
    draws: Vec<[f64; 3]>,
    accepted: usize,
}

/// Posterior summary of the Bayesian quadratic fit.
///
/// Parameters are ordered `(q, m, b)`, matching [`crate::QuadraticFit`].
/// Point estimates are posterior means over the draws pooled across
/// chains; uncertainties are the posterior standard deviations.
///
/// # Example
/// ```no_run
/// # use icetemp::{DepthProfile, InitialGuess, QuadraticPosterior};
/// # let profile = DepthProfile::new(vec![0.0, 1.0, 2.0], vec![1.0, 4.0, 9.0], vec![1.0; 3]).unwrap();
/// let guess = InitialGuess { q: 0.0, m: 0.0, b: 0.0 };
/// let posterior = QuadraticPosterior::sample(&profile, guess, 42).unwrap();
/// println!("q = {} +/- {}", posterior.q(), posterior.parameter_errors()[0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticPosterior {
    params: Vector3<f64>,
    errors: Vector3<f64>,
    r_hat: Vector3<f64>,
    ess: Vector3<f64>,
    acceptance_rate: f64,
}

impl QuadraticPosterior {
    /// Samples the posterior for the given profile.
    ///
    /// # Parameters
    /// - `profile`: The observations to condition on.
    /// - `init_guess`: Starting point for every chain.
    /// - `seed`: RNG seed; chain `c` uses `seed + c`. Identical inputs
    ///   and seed reproduce the summary exactly.
    ///
    /// # Errors
    /// - [`Error::InvalidInitialGuess`]: the guess lies outside the
    ///   Uniform(-100, 100) prior support.
    pub fn sample(profile: &DepthProfile, init_guess: InitialGuess, seed: u64) -> Result<Self> {
        let init = init_guess.validated()?;

        let mut chains = Vec::with_capacity(N_CHAINS);
        for c in 0..N_CHAINS {
            chains.push(run_chain(profile, init, seed.wrapping_add(c as u64)));
        }

        let acceptance_rate = chains.iter().map(|c| c.accepted).sum::<usize>() as f64
            / (N_CHAINS * N_DRAWS) as f64;

        let mut params = Vector3::zeros();
        let mut errors = Vector3::zeros();
        let mut r_hat = Vector3::zeros();
        let mut ess = Vector3::zeros();
        for p in 0..3 {
            let pooled = chains.iter().flat_map(|c| c.draws.iter().map(|d| d[p]));
            let (sd, mean) = statistics::stddev_and_mean(pooled);
            params[p] = mean;
            errors[p] = sd;

            let per_chain: Vec<Vec<f64>> = chains
                .iter()
                .map(|c| c.draws.iter().map(|d| d[p]).collect())
                .collect();
            r_hat[p] = split_r_hat(&per_chain);
            ess[p] = per_chain
                .iter()
                .map(|chain| statistics::effective_sample_size(chain))
                .sum();
        }

        let summary = Self {
            params,
            errors,
            r_hat,
            ess,
            acceptance_rate,
        };

        if !summary.mixing_ok() {
            log::warn!(
                "MCMC quadratic fit mixed poorly: r_hat={:?} acceptance={acceptance_rate:.3}",
                summary.r_hat.as_slice(),
            );
        }
        log::debug!(
            "MCMC quadratic fit: q={:.4}+/-{:.4} m={:.4}+/-{:.4} b={:.4}+/-{:.4}",
            params[0],
            errors[0],
            params[1],
            errors[1],
            params[2],
            errors[2],
        );

        Ok(summary)
    }

    /// Posterior mean of the `depth^2` coefficient.
    #[must_use]
    pub fn q(&self) -> f64 {
        self.params[0]
    }

    /// Posterior mean of the `depth` coefficient.
    #[must_use]
    pub fn m(&self) -> f64 {
        self.params[1]
    }

    /// Posterior mean of the constant term.
    #[must_use]
    pub fn b(&self) -> f64 {
        self.params[2]
    }

    /// Posterior means, ordered `(q, m, b)`.
    #[must_use]
    pub fn params(&self) -> &Vector3<f64> {
        &self.params
    }

    /// Posterior standard deviations, ordered `(q, m, b)`.
    #[must_use]
    pub fn parameter_errors(&self) -> &Vector3<f64> {
        &self.errors
    }

    /// Split-chain R-hat per parameter. Values near 1 indicate the
    /// chains agree; above ~1.05 the run should not be trusted.
    #[must_use]
    pub fn r_hat(&self) -> &Vector3<f64> {
        &self.r_hat
    }

    /// Effective sample size per parameter, summed over chains.
    #[must_use]
    pub fn effective_samples(&self) -> &Vector3<f64> {
        &self.ess
    }

    /// Fraction of post-tuning proposals that were accepted.
    #[must_use]
    pub fn acceptance_rate(&self) -> f64 {
        self.acceptance_rate
    }

    /// True when every parameter's R-hat is below 1.05 and its effective
    /// sample size is at least 100.
    #[must_use]
    pub fn mixing_ok(&self) -> bool {
        self.r_hat.iter().all(|r| *r < R_HAT_LIMIT) && self.ess.iter().all(|e| *e >= 100.0)
    }
}

/// Log posterior density up to a constant: the uniform priors contribute
/// nothing inside the box and negative infinity outside it.
fn log_posterior(profile: &DepthProfile, params: [f64; 3]) -> f64 {
    if params.iter().any(|p| p.abs() > PRIOR_BOUND) {
        return f64::NEG_INFINITY;
    }
    quadratic_log_likelihood(profile, params[0], params[1], params[2])
}

/// Runs one chain: tuning with windowed proposal-scale adaptation, then
/// fixed-kernel draws.
fn run_chain(profile: &DepthProfile, init: [f64; 3], seed: u64) -> ChainRun {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut current = init;
    let mut current_logp = log_posterior(profile, current);
    let mut scales = [0.1_f64; 3];
    let mut window_accepted = 0usize;

    // Tuning phase: adjust each scale multiplicatively toward the target
    // acceptance rate once per window.
    for iter in 0..N_TUNE {
        if step(profile, &mut rng, &mut current, &mut current_logp, &scales) {
            window_accepted += 1;
        }
        if (iter + 1) % TUNE_WINDOW == 0 {
            let rate = window_accepted as f64 / TUNE_WINDOW as f64;
            let factor = (rate - TARGET_ACCEPTANCE).exp().clamp(0.5, 2.0);
            for scale in &mut scales {
                *scale = (*scale * factor).clamp(1e-8, PRIOR_BOUND);
            }
            window_accepted = 0;
        }
    }

    // Sampling phase: adaptation frozen.
    let mut draws = Vec::with_capacity(N_DRAWS);
    let mut accepted = 0usize;
    for _ in 0..N_DRAWS {
        if step(profile, &mut rng, &mut current, &mut current_logp, &scales) {
            accepted += 1;
        }
        draws.push(current);
    }

    ChainRun { draws, accepted }
}

/// One Metropolis step with independent Gaussian proposals per
/// coordinate. Returns whether the proposal was accepted.
fn step(
    profile: &DepthProfile,
    rng: &mut Xoshiro256PlusPlus,
    current: &mut [f64; 3],
    current_logp: &mut f64,
    scales: &[f64; 3],
) -> bool {
    let mut proposal = *current;
    for (value, scale) in proposal.iter_mut().zip(scales) {
        let z: f64 = rng.sample(StandardNormal);
        *value += z * scale;
    }

    let proposal_logp = log_posterior(profile, proposal);
    if rng.gen::<f64>().ln() < proposal_logp - *current_logp {
        *current = proposal;
        *current_logp = proposal_logp;
        true
    } else {
        false
    }
}

/// Split-chain R-hat: each chain is halved, then the classic
/// between/within variance ratio is computed over the sub-chains.
fn split_r_hat(chains: &[Vec<f64>]) -> f64 {
    let mut halves: Vec<&[f64]> = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        let mid = chain.len() / 2;
        halves.push(&chain[..mid]);
        halves.push(&chain[mid..mid * 2]);
    }

    let m = halves.len() as f64;
    let len = halves[0].len() as f64;
    if len < 2.0 {
        return f64::NAN;
    }

    let means: Vec<f64> = halves
        .iter()
        .map(|h| statistics::mean(h.iter().copied()))
        .collect();
    let grand_mean = statistics::mean(means.iter().copied());

    // Within-chain variance (unbiased) averaged over sub-chains.
    let within = halves
        .iter()
        .zip(&means)
        .map(|(half, mean)| {
            half.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (len - 1.0)
        })
        .sum::<f64>()
        / m;

    // Between-chain variance of the sub-chain means.
    let between =
        len * means.iter().map(|v| (v - grand_mean).powi(2)).sum::<f64>() / (m - 1.0);

    if within == 0.0 {
        return 1.0;
    }

    let var_plus = (len - 1.0) / len * within + between / len;
    (var_plus / within).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 15 points generated exactly by temp = 0.5 d^2 + 2 d + 1, with
    /// half-degree errors: the posterior is tight around the truth.
    fn synthetic_profile() -> DepthProfile {
        let depth: Vec<f64> = (0..15).map(f64::from).collect();
        let temp: Vec<f64> = depth.iter().map(|d| 0.5 * d * d + 2.0 * d + 1.0).collect();
        let errors = vec![0.5; 15];
        DepthProfile::new(depth, temp, errors).unwrap()
    }

    #[test]
    fn test_recovers_generating_parameters() {
        let profile = synthetic_profile();
        let guess = InitialGuess { q: 0.0, m: 0.0, b: 0.0 };
        let posterior = QuadraticPosterior::sample(&profile, guess, 7).unwrap();

        assert_abs_diff_eq!(posterior.q(), 0.5, epsilon = 0.5);
        assert_abs_diff_eq!(posterior.m(), 2.0, epsilon = 0.5);
        assert_abs_diff_eq!(posterior.b(), 1.0, epsilon = 0.5);
        for sd in posterior.parameter_errors().iter() {
            assert!(*sd > 0.0);
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let profile = synthetic_profile();
        let guess = InitialGuess { q: 0.0, m: 1.0, b: 0.0 };
        let first = QuadraticPosterior::sample(&profile, guess, 42).unwrap();
        let second = QuadraticPosterior::sample(&profile, guess, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_out_of_support_guess() {
        let profile = synthetic_profile();
        let guess = InitialGuess { q: 150.0, m: 0.0, b: 0.0 };
        let err = QuadraticPosterior::sample(&profile, guess, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInitialGuess { parameter: "q", .. }
        ));
    }

    #[test]
    fn test_rejects_nan_guess() {
        let profile = synthetic_profile();
        let guess = InitialGuess { q: 0.0, m: f64::NAN, b: 0.0 };
        assert!(QuadraticPosterior::sample(&profile, guess, 1).is_err());
    }

    #[test]
    fn test_acceptance_rate_reasonable() {
        let profile = synthetic_profile();
        let guess = InitialGuess { q: 0.5, m: 2.0, b: 1.0 };
        let posterior = QuadraticPosterior::sample(&profile, guess, 3).unwrap();
        assert!(posterior.acceptance_rate() > 0.05);
        assert!(posterior.acceptance_rate() < 0.8);
    }

    #[test]
    fn test_split_r_hat_identical_chains() {
        let chain: Vec<f64> = (0..100).map(|i| f64::from(i % 10)).collect();
        let r = split_r_hat(&[chain.clone(), chain]);
        assert_abs_diff_eq!(r, 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_split_r_hat_detects_disagreement() {
        let low: Vec<f64> = (0..100).map(|i| f64::from(i % 10) * 0.01).collect();
        let high: Vec<f64> = low.iter().map(|v| v + 50.0).collect();
        assert!(split_r_hat(&[low, high]) > 10.0);
    }
}
