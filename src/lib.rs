//! # Icetemp
//! ## Curve fitting for ice-core temperature records
//!
//! Borehole thermometry gives you temperature measured down an ice core,
//! with honest per-point error bars; this crate gives you the small set of
//! statistical fits usually run against that kind of data, without making
//! you re-derive the weighted normal equations or tune a sampler by hand.
//!
//! Three families of routines are provided, all operating on validated
//! column sets ([`DepthProfile`] and [`TemperatureTimeline`]):
//!
//! - **Closed-form fitting**: [`QuadraticFit`] computes the
//!   maximum-likelihood quadratic `temp = q*depth^2 + m*depth + b` by
//!   generalized least squares, with the full 3×3 parameter covariance.
//!   This is the workhorse: exact, deterministic, and cheap.
//! - **Likelihood evaluation**: [`likelihood`] has plain Gaussian
//!   likelihood (and log-likelihood) evaluators for the linear and
//!   quadratic models at caller-chosen parameter values.
//! - **Bayesian fitting**: [`QuadraticPosterior`] samples the quadratic
//!   model's posterior under uniform priors, and [`MarginalGp`] performs
//!   Gaussian-process regression of temperature against time with a
//!   sampled length-scale hyperparameter. Both are deterministic for a
//!   fixed seed and report their own convergence diagnostics.
//!
//! The simplest use-case is the closed-form fit:
//! ```rust
//! # use icetemp::{DepthProfile, QuadraticFit};
//! let profile = DepthProfile::new(
//!     vec![0.0, 1.0, 2.0, 3.0],
//!     vec![1.0, 4.0, 9.0, 16.0],
//!     vec![1.0, 1.0, 1.0, 1.0],
//! ).unwrap();
//!
//! let fit = QuadraticFit::new(&profile).unwrap();
//! assert!((fit.q() - 1.0).abs() < 1e-9);
//! ```
//!
//! # Core Concepts
//! - A [`DepthProfile`] is an ordered set of `(depth, temperature,
//!   temperature error)` observations. Construction validates shape and
//!   noise once; every fitter can then assume well-formed input.
//! - Parameters are always ordered `(q, m, b)`: in vectors, covariance
//!   rows/columns, and accessor names alike.
//! - Errors are never swallowed: a singular system, a bad noise column,
//!   or an out-of-support starting point each surface as a typed
//!   [`error::Error`] instead of NaN-filled output.
//!
//! # Implementation Details
//!
//! This crate uses the `nalgebra` library for linear algebra. Sampling
//! (`QuadraticPosterior`, `MarginalGp::fit`) is random-walk Metropolis
//! with tuning-phase step adaptation, seeded through `rand_xoshiro` so
//! results are reproducible.
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::needless_range_loop)] // The worst clippy lint
#![allow(clippy::cast_precision_loss)] // I don't care about this one
#![allow(clippy::similar_names)] //       Clippy does not get to decide what names are similar

pub mod data;
pub mod error;
pub mod gp;
pub mod likelihood;
pub mod mcmc;
pub mod statistics;

mod fit;

pub use data::{DepthProfile, TemperatureTimeline};
pub use fit::QuadraticFit;
pub use gp::{GpPrediction, MarginalGp};
pub use mcmc::{InitialGuess, QuadraticPosterior};

pub use nalgebra;
