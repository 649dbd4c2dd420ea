#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `ramboir` provides the [RAMBO] phase-space generator together with [Monte Carlo
//! integration] routines built on top of it. Given the masses of $N$ final-state particles and a
//! centre-of-mass energy, RAMBO generates momentum configurations that conserve energy and
//! momentum, together with a weight such that the weighted points are distributed uniformly in
//! Lorentz-invariant phase space. Averaging a squared matrix element over these points yields
//! decay widths, annihilation cross sections, and energy spectra.
//!
//! # Features
//!
//! This library was designed with the following features as essential in mind:
//!
//! - **Generic numeric type**. The numeric type used in this library is not fixed, but instead a
//! generic parameter, so that the routines can be used with either `f32`, `f64`, or a custom
//! numeric type that implements the `Float` trait from the `num-traits` crate.
//! - **Parallelism**. Every request is split over a configurable number of worker threads, each
//! with its own random number stream. The partial results are combined by addition, which does
//! not depend on how the work was split up.
//! - **Reproducibility**. With a fixed seed all results are completely reproducible. With the
//! [`StreamPolicy::Partitioned`] policy the generated points do not even depend on the number of
//! workers.
//! - **Failure accounting**. Points whose mass-shell solve does not converge and samples whose
//! matrix element is negative or not finite are discarded and counted, never substituted. A
//! request fails once more than a configurable fraction of its samples was discarded.
//! - **Histograms**. Energy spectra of the final-state particles are filled along with the
//! integral, without any additional matrix-element evaluations.
//!
//! # How do I get started?
//!
//! ```rust
//! use ramboir::config::RamboConfig;
//! use ramboir::core::FinalState;
//! use ramboir::integrators::compute_decay_width;
//! use ramboir::kinematics::FourMomentum;
//!
//! // a particle of mass 1 decaying into three massless particles
//! let final_state = FinalState::new(vec![0.0, 0.0, 0.0], 1.0).unwrap();
//! let config = RamboConfig::builder().workers(2).seed(42).build().unwrap();
//! let matrix_element = |momenta: &[FourMomentum<f64>]| momenta[0].dot(&momenta[1]);
//!
//! let width = compute_decay_width(&final_state, &matrix_element, 10_000, &config).unwrap();
//!
//! assert!(width.value() > 0.0);
//! assert!(width.error() < width.value());
//! ```
//!
//! # What is ...?
//!
//! This section is a dictionary of terms that are used in this documentation. Given the
//! phase-space integral
//!
//! $$ I = \int \mathrm{d}\Phi_N \, |\mathcal{M}(p_1, \ldots, p_N)|^2 $$
//!
//! we approximate $I$ with
//!
//! $$ I \approx \frac{1}{n} \sum_{j=1}^n W_j \left| \mathcal{M} \left( p_1^{(j)}, \ldots,
//! p_N^{(j)} \right) \right|^2 $$
//!
//! where each point $p^{(j)}$ with weight $W_j$ is generated by RAMBO. We use the following terms:
//!
//! - the number of *calls* or the *sample size* is $n$, the number of generated points,
//! - the *matrix element* is the function $|\mathcal{M}|^2$ that is being integrated. We assume
//! that evaluating it is the expensive operation,
//! - the *weight* $W$ of a point is its phase-space density, which for massless particles is the
//! same for every point,
//! - the *threshold* is the sum of the final-state masses, below which no point exists.
//!
//! [RAMBO]: https://doi.org/10.1016/0010-4655(86)90119-0
//! [Monte Carlo integration]: https://en.wikipedia.org/wiki/Monte_Carlo_integration
//! [`StreamPolicy::Partitioned`]: crate::config::StreamPolicy::Partitioned

pub mod callbacks;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod histograms;
pub mod integrators;
pub mod kinematics;
pub mod phase_space;
mod runner;

pub use crate::config::RamboConfig;
pub use crate::core::*;
pub use crate::engine::Rambo;
pub use crate::error::RamboError;
