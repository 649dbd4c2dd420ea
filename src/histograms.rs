//! This module contains everything related to histograms.
use crate::config::RamboConfig;
use crate::core::estimators::Estimators;
use crate::core::{constant, FinalState, MatrixElement, Real};
use crate::error::RamboError;
use crate::integrators::{sample, Accumulator};
use rand::distributions::{Distribution, Open01};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use tracing::warn;

/// Define a one-dimensional histogram to be filled during the integration.
///
/// The histogram is given by its bin edges, which must be strictly increasing. Every bin
/// includes its left edge; the last bin also includes its right edge.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HistogramSpecification<T> {
    /// The bin edges, one more than there are bins.
    edges: Vec<T>,
    /// Store the name of the histogram.
    name: String,
}

impl<T: Real> HistogramSpecification<T> {
    /// Construct a histogram with the bin `edges` and the name `name`.
    pub fn new(edges: Vec<T>, name: String) -> Result<Self, RamboError> {
        if edges.len() < 2 {
            return Err(RamboError::invalid(
                "a histogram needs at least two bin edges",
            ));
        }

        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(RamboError::invalid(format!(
                "bin edges must be finite and strictly increasing, got {:?}",
                edges
            )));
        }

        Ok(Self { edges, name })
    }

    /// Construct a histogram in which the range from `left` to `right` is subdivided into `bins`
    /// bins of equal width.
    pub fn uniform(left: T, right: T, bins: usize, name: String) -> Result<Self, RamboError> {
        if bins == 0 {
            return Err(RamboError::invalid("a histogram needs at least one bin"));
        }

        let width = (right - left) / constant(bins as f64);
        let edges = (0..=bins)
            .map(|i| {
                if i == bins {
                    right
                } else {
                    left + width * constant(i as f64)
                }
            })
            .collect();

        Self::new(edges, name)
    }

    /// Returns the bin edges.
    pub fn edges(&self) -> &[T] {
        &self.edges
    }

    /// Returns the number of bins.
    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Returns the name of the histogram.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an accumulator for the histogram.
    /// This is supposed to be sent to a computational unit.
    /// After all units have finished computing, the different
    /// accumulators will be combined.
    pub(crate) fn get_accumulator(&self) -> HistogramAccumulator<T> {
        HistogramAccumulator {
            sums: vec![(T::zero(), T::zero()); self.bins()],
            outside: 0,
            specification: self.clone(),
        }
    }

    /// Compute the index of the bin into which `x` belongs.
    fn compute_bin(&self, x: T) -> Option<usize> {
        let last = self.edges.len() - 1;

        if x == self.edges[last] {
            return Some(last - 1);
        }

        match self.edges.iter().position(|e| x < *e) {
            Some(0) | None => None,
            Some(index) => Some(index - 1),
        }
    }
}

/// Intermediate representation of a histogram.
///
/// For each bin the sum and the sum of the squares of the values filled into it are stored. This
/// can be used to fill the histogram on different cores. After the computations on each core
/// finish, the different `HistogramAccumulator`s are combined using the `Add` trait.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HistogramAccumulator<T> {
    sums: Vec<(T, T)>,

    /// Number of non-zero values whose position lies outside every bin.
    outside: usize,

    /// Store the information about the accumulator
    specification: HistogramSpecification<T>,
}

impl<T: Real> HistogramAccumulator<T> {
    /// Add the `value` to the bin containing `x`. Zeros and non-finite values are ignored; values
    /// outside the histogram are only counted.
    pub fn fill(&mut self, x: T, value: T) {
        if !value.is_finite() || value == T::zero() {
            return;
        }

        if let Some(bin) = self.specification.compute_bin(x) {
            self.sums[bin].0 += value;
            self.sums[bin].1 += value * value;
        } else {
            self.outside += 1;
        }
    }

    /// Returns how many non-zero values fell outside the histogram.
    pub fn outside(&self) -> usize {
        self.outside
    }

    /// Returns for every bin the sum and the sum of squares of the filled values.
    pub fn sums(&self) -> &[(T, T)] {
        &self.sums
    }

    /// Returns the sum of the values filled into any bin.
    pub fn total(&self) -> T {
        self.sums.iter().fold(T::zero(), |acc, (sum, _)| acc + *sum)
    }
}

impl<T: Real> Add for HistogramAccumulator<T> {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl<T: Real> AddAssign for HistogramAccumulator<T> {
    fn add_assign(&mut self, other: Self) {
        debug_assert!(self.specification == other.specification);

        for (mine, theirs) in self.sums.iter_mut().zip(other.sums) {
            mine.0 += theirs.0;
            mine.1 += theirs.1;
        }

        self.outside += other.outside;
    }
}

/// A single bin of an [`EnergyHistogram`].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct EnergyBin<T> {
    /// The centre of the bin.
    pub center: T,
    /// The width of the bin.
    pub width: T,
    /// The probability density in this bin.
    pub value: T,
    /// The statistical error of `value`.
    pub error: T,
}

/// Normalized energy distribution $\frac{1}{\Gamma} \frac{\mathrm{d}\Gamma}{\mathrm{d}E}$ of one
/// final-state particle.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EnergyHistogram<T> {
    particle: usize,
    name: String,
    bins: Vec<EnergyBin<T>>,
    calls: usize,
    rejected_calls: usize,
    outside: usize,
}

impl<T: Real> EnergyHistogram<T> {
    fn new(
        particle: usize,
        accumulator: HistogramAccumulator<T>,
        calls: usize,
        rejected_calls: usize,
    ) -> Self {
        let total = accumulator.total();
        let outside = accumulator.outside;
        let two = constant::<T>(2.0);
        let specification = accumulator.specification;

        let bins = accumulator
            .sums
            .iter()
            .zip(specification.edges.windows(2))
            .map(|(&(sum, sumsq), edges)| {
                let width = edges[1] - edges[0];
                let (value, error) = if total > T::zero() {
                    (sum / (total * width), sumsq.sqrt() / (total * width))
                } else {
                    (T::zero(), T::zero())
                };

                EnergyBin {
                    center: (edges[0] + edges[1]) / two,
                    width,
                    value,
                    error,
                }
            })
            .collect();

        Self {
            particle,
            name: specification.name,
            bins,
            calls,
            rejected_calls,
            outside,
        }
    }

    /// Returns the index of the particle whose energy was binned.
    pub fn particle(&self) -> usize {
        self.particle
    }

    /// Returns the name of the histogram.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bins.
    pub fn bins(&self) -> &[EnergyBin<T>] {
        &self.bins
    }

    /// Returns the number of requested samples.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the number of samples that were discarded.
    pub fn rejected_calls(&self) -> usize {
        self.rejected_calls
    }

    /// Returns the number of samples with a non-zero contribution whose energy lies outside the
    /// bins. These samples do not enter the normalization.
    pub fn outside_calls(&self) -> usize {
        self.outside
    }

    /// Returns $\sum_i v_i w_i$, which is one unless the histogram is empty.
    pub fn integral(&self) -> T {
        self.bins
            .iter()
            .fold(T::zero(), |acc, bin| acc + bin.value * bin.width)
    }
}

/// Bins the energy of the final-state particle with index `particle` into the bins delimited by
/// `edges`, weighting every sample with $W |\mathcal{M}|^2$. The result is normalized to a
/// probability density.
pub fn generate_energy_histogram<T, M>(
    final_state: &FinalState<T>,
    matrix_element: &M,
    particle: usize,
    edges: Vec<T>,
    calls: usize,
    config: &RamboConfig,
) -> Result<EnergyHistogram<T>, RamboError>
where
    T: Real,
    M: MatrixElement<T> + ?Sized,
    Open01: Distribution<T>,
{
    if particle >= final_state.len() {
        return Err(RamboError::invalid(format!(
            "particle index {} out of range for {} particles",
            particle,
            final_state.len()
        )));
    }

    let specification =
        HistogramSpecification::new(edges, format!("energy of particle {}", particle))?;

    energy_histograms(
        final_state,
        matrix_element,
        vec![(particle, specification)],
        calls,
        config,
    )
    .map(|mut histograms| histograms.remove(0))
}

/// Bins the energies of all final-state particles at once, each into `bins` bins of equal width
/// spanning the kinematically allowed range given by [`FinalState::energy_limits`].
///
/// The upper end of every range is widened by the accuracy of the mass-shell solve, so that
/// energies sitting on the kinematic limit, like those of every two-body final state, are never
/// lost to rounding. This also gives the degenerate range of a final state at threshold a
/// non-zero width; its points all have weight zero and the histogram stays empty.
pub fn generate_energy_histograms<T, M>(
    final_state: &FinalState<T>,
    matrix_element: &M,
    bins: usize,
    calls: usize,
    config: &RamboConfig,
) -> Result<Vec<EnergyHistogram<T>>, RamboError>
where
    T: Real,
    M: MatrixElement<T> + ?Sized,
    Open01: Distribution<T>,
{
    let slack = (constant::<T>(config.tolerance()) + constant::<T>(16.0) * T::epsilon())
        * final_state.cme();

    let specifications = (0..final_state.len())
        .map(|particle| -> Result<_, RamboError> {
            let (left, right) = final_state.energy_limits(particle)?;
            let specification = HistogramSpecification::uniform(
                left,
                right + slack,
                bins,
                format!("energy of particle {}", particle),
            )?;

            Ok((particle, specification))
        })
        .collect::<Result<Vec<_>, _>>()?;

    energy_histograms(final_state, matrix_element, specifications, calls, config)
}

fn energy_histograms<T, M>(
    final_state: &FinalState<T>,
    matrix_element: &M,
    specifications: Vec<(usize, HistogramSpecification<T>)>,
    calls: usize,
    config: &RamboConfig,
) -> Result<Vec<EnergyHistogram<T>>, RamboError>
where
    T: Real,
    M: MatrixElement<T> + ?Sized,
    Open01: Distribution<T>,
{
    let Accumulator {
        estimators,
        histograms,
    } = sample(final_state, matrix_element, calls, config, &specifications)?;

    let outside = histograms
        .iter()
        .map(HistogramAccumulator::outside)
        .sum::<usize>();

    if outside > 0 {
        warn!(outside, calls, "samples fell outside the histogram range");
    }

    Ok(specifications
        .into_iter()
        .zip(histograms)
        .map(|((particle, _), accumulator)| {
            EnergyHistogram::new(particle, accumulator, calls, estimators.rejected_calls())
        })
        .collect())
}
