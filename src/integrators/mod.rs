//! Monte Carlo integration of squared matrix elements over RAMBO phase space.
//!
//! Every integrator estimates the phase-space integral
//!
//! $$ I = \int \mathrm{d}\Phi_N \, |\mathcal{M}|^2 \approx \frac{1}{n} \sum_{j=1}^n W_j
//! |\mathcal{M}(p^{(j)})|^2 $$
//!
//! and multiplies it with a process-dependent normalization.
pub mod annihilation;
pub mod decay;

pub use annihilation::compute_annihilation_cross_section;
pub use decay::compute_decay_width;

use crate::config::RamboConfig;
use crate::core::estimators::{BasicEstimators, Estimators, MeanVar};
use crate::core::{count, FinalState, MatrixElement, Real};
use crate::error::RamboError;
use crate::histograms::{HistogramAccumulator, HistogramSpecification};
use crate::phase_space::rescaler::MassShellSolver;
use crate::phase_space::{exceeds_rate, PointGenerator};
use crate::runner;
use num_traits::Float;
use rand::distributions::{Distribution, Open01};
use serde::{Deserialize, Serialize};
use std::ops::Add;
use tracing::warn;

/// Sufficient statistics of the weighted matrix element, $W |\mathcal{M}|^2$.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WeightEstimators<T> {
    sum: T,
    sumsq: T,
    calls: usize,
    non_zero_calls: usize,
    non_converged: usize,
    invalid_matrix_elements: usize,
}

impl<T: Float> Default for WeightEstimators<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            sumsq: T::zero(),
            calls: 0,
            non_zero_calls: 0,
            non_converged: 0,
            invalid_matrix_elements: 0,
        }
    }
}

impl<T: Float> Add for WeightEstimators<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            sumsq: self.sumsq + other.sumsq,
            calls: self.calls + other.calls,
            non_zero_calls: self.non_zero_calls + other.non_zero_calls,
            non_converged: self.non_converged + other.non_converged,
            invalid_matrix_elements: self.invalid_matrix_elements + other.invalid_matrix_elements,
        }
    }
}

impl<T: Real> WeightEstimators<T> {
    /// Adds a sample with phase-space `weight` and squared matrix element `matrix_element`.
    ///
    /// Negative or non-finite matrix elements are counted and otherwise ignored. Returns the
    /// accumulated value $W |\mathcal{M}|^2$ if the sample was accepted.
    pub fn update(&mut self, weight: T, matrix_element: T) -> Option<T> {
        let value = weight * matrix_element;

        if !matrix_element.is_finite() || matrix_element < T::zero() || !value.is_finite() {
            self.invalid_matrix_elements += 1;
            return None;
        }

        self.calls += 1;

        if value != T::zero() {
            self.non_zero_calls += 1;
            self.sum += value;
            self.sumsq += value * value;
        }

        Some(value)
    }

    /// Counts a point that was discarded because its mass-shell solve failed.
    pub fn reject_point(&mut self) {
        self.non_converged += 1;
    }

    /// Returns the number of points discarded because their mass-shell solve failed.
    pub fn non_converged(&self) -> usize {
        self.non_converged
    }

    /// Returns the number of samples discarded because of an invalid matrix element.
    pub fn invalid_matrix_elements(&self) -> usize {
        self.invalid_matrix_elements
    }

    /// Returns mean and variance of the mean, or an error if fewer than two samples are valid.
    fn mean_var(&self) -> Result<MeanVar<T>, RamboError> {
        if self.calls < 2 {
            return Err(RamboError::InsufficientSamples {
                valid: self.calls,
                calls: self.calls + self.rejected_calls(),
            });
        }

        Ok(MeanVar::from_sums(self.sum, self.sumsq, count(self.calls)))
    }
}

impl<T: Real> BasicEstimators<T> for WeightEstimators<T> {
    fn mean(&self) -> T {
        self.sum / count(self.calls)
    }

    fn var(&self) -> T {
        MeanVar::from_sums(self.sum, self.sumsq, count(self.calls)).var()
    }
}

impl<T: Real> Estimators<T> for WeightEstimators<T> {
    fn calls(&self) -> usize {
        self.calls
    }

    fn rejected_calls(&self) -> usize {
        self.non_converged + self.invalid_matrix_elements
    }

    fn non_zero_calls(&self) -> usize {
        self.non_zero_calls
    }
}

/// Accumulate results from different threads.
#[derive(Clone, Debug)]
pub(crate) struct Accumulator<T> {
    pub(crate) estimators: WeightEstimators<T>,
    pub(crate) histograms: Vec<HistogramAccumulator<T>>,
}

impl<T: Real> Add for Accumulator<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            estimators: self.estimators + other.estimators,
            histograms: self
                .histograms
                .into_iter()
                .zip(other.histograms)
                .map(|(a, b)| a + b)
                .collect(),
        }
    }
}

/// Samples `calls` phase-space points of `final_state`, evaluates `matrix_element` on each, and
/// fills for every entry `(particle, specification)` of `histograms` the energy of `particle`.
///
/// Fails if too many samples had to be discarded, see [`RamboConfig::max_failure_rate`].
pub(crate) fn sample<T, M>(
    final_state: &FinalState<T>,
    matrix_element: &M,
    calls: usize,
    config: &RamboConfig,
    histograms: &[(usize, HistogramSpecification<T>)],
) -> Result<Accumulator<T>, RamboError>
where
    T: Real,
    M: MatrixElement<T> + ?Sized,
    Open01: Distribution<T>,
{
    let generator = PointGenerator::new(final_state, MassShellSolver::from_config(config));

    let accumulator = runner::run(
        config,
        calls,
        generator.draws_per_point(),
        |share, mut rng, dispatch| {
            let mut acc = Accumulator {
                estimators: WeightEstimators::default(),
                histograms: histograms
                    .iter()
                    .map(|(_, specification)| specification.get_accumulator())
                    .collect(),
            };

            for _ in 0..share.calls {
                dispatch.checkpoint()?;

                let point = match generator.generate(&mut rng) {
                    Ok(point) => point,
                    Err(RamboError::NonConvergence { .. }) => {
                        acc.estimators.reject_point();
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                let matrix_element = matrix_element.evaluate(&point.momenta);

                if let Some(value) = acc.estimators.update(point.weight, matrix_element) {
                    for (histogram, (particle, _)) in acc.histograms.iter_mut().zip(histograms) {
                        histogram.fill(point.momenta[*particle].e, value);
                    }
                }
            }

            Ok(acc)
        },
    )?;

    check_failures(&accumulator.estimators, calls, config)?;

    Ok(accumulator)
}

/// Escalates discarded samples to an error once their fraction exceeds the configured rate.
fn check_failures<T: Real>(
    estimators: &WeightEstimators<T>,
    calls: usize,
    config: &RamboConfig,
) -> Result<(), RamboError> {
    let non_converged = estimators.non_converged();
    let invalid = estimators.invalid_matrix_elements();

    if non_converged + invalid > 0 {
        warn!(
            non_converged,
            invalid_matrix_elements = invalid,
            calls,
            "discarded samples"
        );
    }

    if exceeds_rate(non_converged, calls, config.max_failure_rate()) {
        return Err(RamboError::ExcessiveNonConvergence {
            failed: non_converged,
            calls,
        });
    }

    if exceeds_rate(invalid, calls, config.max_failure_rate()) {
        return Err(RamboError::MatrixElementFailure { invalid, calls });
    }

    Ok(())
}

/// The result of an integration: the estimate, its statistical error, and how many samples were
/// used.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IntegrationResult<T> {
    value: T,
    error: T,
    calls: usize,
    valid_calls: usize,
    non_converged: usize,
    invalid_matrix_elements: usize,
}

impl<T: Real> IntegrationResult<T> {
    /// Normalizes the estimators by `normalization`. `calls` is the number of requested samples.
    pub(crate) fn new(
        estimators: &WeightEstimators<T>,
        normalization: T,
        calls: usize,
    ) -> Result<Self, RamboError> {
        let mean_var = estimators.mean_var()? * normalization;

        Ok(Self {
            value: mean_var.mean(),
            error: mean_var.std(),
            calls,
            valid_calls: estimators.calls(),
            non_converged: estimators.non_converged(),
            invalid_matrix_elements: estimators.invalid_matrix_elements(),
        })
    }

    /// Returns the estimate.
    pub fn value(&self) -> T {
        self.value
    }

    /// Returns the standard error of the estimate.
    pub fn error(&self) -> T {
        self.error
    }

    /// Returns the number of requested samples.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the number of samples that entered the estimate.
    pub fn valid_calls(&self) -> usize {
        self.valid_calls
    }

    /// Returns the number of points discarded because their mass-shell solve failed.
    pub fn non_converged(&self) -> usize {
        self.non_converged
    }

    /// Returns the number of samples discarded because of an invalid matrix element.
    pub fn invalid_matrix_elements(&self) -> usize {
        self.invalid_matrix_elements
    }

    /// Returns the fraction of requested samples that were discarded.
    pub fn failure_rate(&self) -> f64 {
        (self.non_converged + self.invalid_matrix_elements) as f64 / self.calls as f64
    }
}
