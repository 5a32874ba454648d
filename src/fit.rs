//! Closed-form weighted least-squares quadratic fit
//!
//! Fits `temperature = q*depth^2 + m*depth + b` to a [`DepthProfile`]
//! under independent Gaussian measurement noise on temperature only
//! (depth is assumed exact), using generalized least squares. This is the
//! standard linear-Gaussian closed-form solution of Hogg, Bovy and Lang,
//! section 1 (<https://arxiv.org/abs/1008.4686>).

use nalgebra::{DVector, Matrix3, Matrix3xX, MatrixXx3, Vector3};

use crate::{
    data::DepthProfile,
    error::{Error, Result},
};

/// Number of free parameters in the quadratic model.
const K: usize = 3;

/// Maximum-likelihood quadratic fit of a temperature-vs-depth profile,
/// with the full parameter covariance.
///
/// The model is `temperature = q*depth^2 + m*depth + b`. Parameters and
/// covariance are ordered `(q, m, b)` throughout. The result is immutable
/// once computed.
///
/// # How it works
/// - Builds the N×3 design matrix `A` with rows `(depth^2, depth, 1)`.
/// - The noise covariance `C` is diagonal in the squared temperature
///   errors, so its inverse is taken elementwise rather than through a
///   dense inversion.
/// - Computes `cov = (A^T C^-1 A)^-1` (a dense 3×3 inversion) and
///   `params = cov * (A^T C^-1 * temperature)`.
///
/// The computation is pure and deterministic: identical inputs always
/// produce identical outputs.
///
/// # Example
/// ```
/// # use icetemp::{DepthProfile, QuadraticFit};
/// // Exactly temp = depth^2 + 2*depth + 1
/// let profile = DepthProfile::new(
///     vec![0.0, 1.0, 2.0, 3.0],
///     vec![1.0, 4.0, 9.0, 16.0],
///     vec![1.0, 1.0, 1.0, 1.0],
/// ).unwrap();
/// let fit = QuadraticFit::new(&profile).unwrap();
/// assert!((fit.q() - 1.0).abs() < 1e-9);
/// assert!((fit.m() - 2.0).abs() < 1e-9);
/// assert!((fit.b() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticFit {
    params: Vector3<f64>,
    covariance: Matrix3<f64>,
}

impl QuadraticFit {
    /// Computes the generalized least-squares fit for the given profile.
    ///
    /// # Errors
    /// - [`Error::SingularMatrix`]: the weighted normal matrix
    ///   `A^T C^-1 A` is not invertible. This happens with fewer than 3
    ///   distinct depth values, or depth values that are linearly
    ///   dependent in the quadratic basis.
    ///
    /// Shape and noise validation happen at [`DepthProfile::new`]; a
    /// constructed profile cannot fail those checks here.
    pub fn new(profile: &DepthProfile) -> Result<Self> {
        let n = profile.len();

        let mut design = MatrixXx3::zeros(n);
        let mut weighted = MatrixXx3::zeros(n);
        let mut weighted_y = DVector::zeros(n);
        for (i, (depth, temp, sigma)) in profile.iter().enumerate() {
            let row = [depth * depth, depth, 1.0];
            // C^-1 is diagonal, so weighting is a per-row scale.
            let inv_var = 1.0 / (sigma * sigma);
            for (j, basis) in row.iter().enumerate() {
                design[(i, j)] = *basis;
                weighted[(i, j)] = basis * inv_var;
            }
            weighted_y[i] = temp * inv_var;
        }

        let design_t: Matrix3xX<f64> = design.transpose();
        let normal: Matrix3<f64> = &design_t * &weighted;
        let moment: Vector3<f64> = &design_t * &weighted_y;

        let covariance = normal
            .try_inverse()
            .ok_or(Error::SingularMatrix { n, k: K })?;
        let params = covariance * moment;

        // Near-singular systems can survive the inversion and surface as
        // non-finite entries instead; treat those as the same failure.
        if params.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(Error::SingularMatrix { n, k: K });
        }

        log::debug!(
            "quadratic GLS fit: q={:.6e} m={:.6e} b={:.6e} (n={n})",
            params[0],
            params[1],
            params[2],
        );

        Ok(Self { params, covariance })
    }

    /// Coefficient of the `depth^2` term.
    #[must_use]
    pub fn q(&self) -> f64 {
        self.params[0]
    }

    /// Coefficient of the `depth` term.
    #[must_use]
    pub fn m(&self) -> f64 {
        self.params[1]
    }

    /// Constant term.
    #[must_use]
    pub fn b(&self) -> f64 {
        self.params[2]
    }

    /// The parameter vector, ordered `(q, m, b)`.
    #[must_use]
    pub fn params(&self) -> &Vector3<f64> {
        &self.params
    }

    /// The 3×3 parameter covariance matrix, rows and columns ordered
    /// `(q, m, b)`.
    #[must_use]
    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.covariance
    }

    /// One-sigma uncertainties of the parameters: the square roots of the
    /// covariance diagonal, ordered `(q, m, b)`.
    #[must_use]
    pub fn parameter_errors(&self) -> Vector3<f64> {
        self.covariance.diagonal().map(f64::sqrt)
    }

    /// Evaluates the fitted model at a depth.
    #[must_use]
    pub fn predict(&self, depth: f64) -> f64 {
        self.q() * depth * depth + self.m() * depth + self.b()
    }

    /// Weighted sum of squared residuals of the fit against a profile.
    ///
    /// For the profile the fit was computed from, this is the chi-squared
    /// statistic of the fit; values far above `N - 3` suggest the
    /// quadratic model does not describe the data.
    #[must_use]
    pub fn chi_squared(&self, profile: &DepthProfile) -> f64 {
        profile
            .iter()
            .map(|(depth, temp, sigma)| {
                let r = (temp - self.predict(depth)) / sigma;
                r * r
            })
            .sum()
    }
}
