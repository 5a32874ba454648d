//! Likelihood evaluators for the linear and quadratic temperature models
//!
//! Plain Gaussian likelihoods under independent per-point measurement
//! noise, evaluated at caller-supplied parameter values:
//!
//! - linear model: `temp = m*depth + b`
//! - quadratic model: `temp = q*depth^2 + m*depth + b`
//!
//! Each model comes in two flavors. The `*_log_likelihood` functions sum
//! log densities and are the numerically stable form; the plain
//! `*_likelihood` functions exponentiate that sum, matching the direct
//! product of Gaussian densities. For more than a handful of points the
//! plain likelihood underflows to zero quickly, so prefer the log form in
//! any optimization or sampling loop.

use std::f64::consts::PI;

use crate::data::DepthProfile;

/// Sum of Gaussian log densities for the residuals produced by `model`.
fn gaussian_log_likelihood(profile: &DepthProfile, model: impl Fn(f64) -> f64) -> f64 {
    profile
        .iter()
        .map(|(depth, temp, sigma)| {
            let residual = temp - model(depth);
            -0.5 * (2.0 * PI * sigma * sigma).ln() - residual * residual / (2.0 * sigma * sigma)
        })
        .sum()
}

/// Log likelihood of a linear model `temp = m*depth + b` for the profile.
#[must_use]
pub fn linear_log_likelihood(profile: &DepthProfile, m: f64, b: f64) -> f64 {
    gaussian_log_likelihood(profile, |depth| m * depth + b)
}

/// Likelihood of a linear model `temp = m*depth + b` for the profile.
///
/// This is the product over all points of the Gaussian density of the
/// residual, with each point's own temperature error as the standard
/// deviation.
#[must_use]
pub fn linear_likelihood(profile: &DepthProfile, m: f64, b: f64) -> f64 {
    linear_log_likelihood(profile, m, b).exp()
}

/// Log likelihood of a quadratic model `temp = q*depth^2 + m*depth + b`
/// for the profile.
#[must_use]
pub fn quadratic_log_likelihood(profile: &DepthProfile, q: f64, m: f64, b: f64) -> f64 {
    gaussian_log_likelihood(profile, |depth| q * depth * depth + m * depth + b)
}

/// Likelihood of a quadratic model `temp = q*depth^2 + m*depth + b` for
/// the profile.
///
/// See [`linear_likelihood`] for the exact form.
#[must_use]
pub fn quadratic_likelihood(profile: &DepthProfile, q: f64, m: f64, b: f64) -> f64 {
    quadratic_log_likelihood(profile, q, m, b).exp()
}
