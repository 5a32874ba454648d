//! Error types for the curve-fitting routines
//!
//! This module defines the common errors encountered when validating
//! ice-core datasets or computing fits, along with a convenient `Result`
//! alias.

/// Errors that can occur while validating data or computing a fit.
///
/// Every failure is surfaced directly to the caller; no routine in this
/// crate retries, recovers, or returns partially computed results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input columns are unusable as an observation set.
    ///
    /// Either the columns have different lengths, or there are fewer
    /// points than the three free parameters of the quadratic model.
    #[error(
        "Input columns must have equal length >= 3 [lengths: {depths}, {temperatures}, {errors}]"
    )]
    ShapeMismatch {
        /// Number of depth (or year) values
        depths: usize,
        /// Number of temperature values
        temperatures: usize,
        /// Number of error values
        errors: usize,
    },

    /// A measurement error value is zero or negative.
    ///
    /// The noise covariance is diagonal in the squared errors; a
    /// non-positive entry makes it degenerate.
    #[error("Measurement error at index {index} is not strictly positive ({value})")]
    InvalidNoise {
        /// Index of the offending value
        index: usize,
        /// The offending value
        value: f64,
    },

    /// A matrix that must be inverted is singular.
    ///
    /// For the closed-form fit this is the weighted normal matrix
    /// `A^T C^-1 A`, typically caused by fewer than 3 distinct depth
    /// values. For the Gaussian process it is the kernel matrix failing
    /// its Cholesky factorization.
    #[error("Matrix is not invertible; the data may be insufficient or collinear [n: {n}, k: {k}]")]
    SingularMatrix {
        /// Number of data points
        n: usize,
        /// Dimension of the matrix being inverted
        k: usize,
    },

    /// The MCMC initial guess lies outside the prior support.
    ///
    /// All three quadratic parameters carry Uniform(-100, 100) priors;
    /// a chain started outside that box has zero posterior density.
    #[error("Initial guess for `{parameter}` ({value}) is outside the prior support [-100, 100]")]
    InvalidInitialGuess {
        /// Name of the parameter (`q`, `m`, or `b`)
        parameter: &'static str,
        /// The out-of-support value
        value: f64,
    },

    /// Failed to solve the algebraic system during fitting.
    ///
    /// Contains a static string describing the solver error.
    #[error("Failed to solve: {0}")]
    Algebra(&'static str),
}

/// Result type for the curve-fitting routines
pub type Result<T> = std::result::Result<T, Error>;
