//! The core module
pub mod estimators;

use crate::error::RamboError;
use crate::kinematics::FourMomentum;
use num_traits::{Float, FloatConst, FromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Add, AddAssign};

/// Numeric types the phase-space generator and the integrators can work with.
pub trait Real: AddAssign + Debug + Float + FloatConst + FromPrimitive + Send + Sync + 'static {}

impl<T> Real for T where
    T: AddAssign + Debug + Float + FloatConst + FromPrimitive + Send + Sync + 'static
{
}

/// Converts a constant into `T`. Conversions from `f64` never fail for floating-point types.
pub(crate) fn constant<T: Real>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Converts a count into `T`.
pub(crate) fn count<T: Real>(value: usize) -> T {
    T::from_usize(value).unwrap_or_else(T::nan)
}

/// Squared matrix element, $|\mathcal{M}|^2$, of the process being integrated.
///
/// Implementations must be pure: the same momenta always give the same value. Every closure
/// `Fn(&[FourMomentum<T>]) -> T` is a matrix element.
pub trait MatrixElement<T>: Send + Sync {
    /// Evaluates $|\mathcal{M}|^2$ for the final-state `momenta`.
    fn evaluate(&self, momenta: &[FourMomentum<T>]) -> T;
}

impl<T, F> MatrixElement<T> for F
where
    F: Fn(&[FourMomentum<T>]) -> T + Send + Sync,
{
    fn evaluate(&self, momenta: &[FourMomentum<T>]) -> T {
        self(momenta)
    }
}

/// The constant matrix element $|\mathcal{M}|^2 = 1$. Integrating it gives the phase-space volume.
pub fn flat<T: Real>(_: &[FourMomentum<T>]) -> T {
    T::one()
}

/// Masses of the final-state particles together with the centre-of-mass energy.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FinalState<T> {
    masses: Vec<T>,
    cme: T,
}

impl<T: Real> FinalState<T> {
    /// Constructs a final state of `masses.len()` particles at centre-of-mass energy `cme`.
    ///
    /// Fails if there are fewer than two particles, a mass is negative or not finite, or `cme` is
    /// not positive or lies below the sum of the masses.
    pub fn new(masses: Vec<T>, cme: T) -> Result<Self, RamboError> {
        if masses.len() < 2 {
            return Err(RamboError::invalid(format!(
                "a final state needs at least two particles, got {}",
                masses.len()
            )));
        }

        if let Some(mass) = masses.iter().find(|m| !m.is_finite() || **m < T::zero()) {
            return Err(RamboError::invalid(format!(
                "final-state masses must be finite and non-negative, got {:?}",
                mass
            )));
        }

        if !cme.is_finite() || cme <= T::zero() {
            return Err(RamboError::invalid(format!(
                "the centre-of-mass energy must be positive, got {:?}",
                cme
            )));
        }

        let threshold = masses.iter().fold(T::zero(), |acc, &m| acc + m);

        if cme < threshold {
            return Err(RamboError::invalid(format!(
                "the centre-of-mass energy {:?} lies below the threshold {:?}",
                cme, threshold
            )));
        }

        Ok(Self { masses, cme })
    }

    /// Returns the masses of the final-state particles.
    pub fn masses(&self) -> &[T] {
        &self.masses
    }

    /// Returns the centre-of-mass energy.
    pub fn cme(&self) -> T {
        self.cme
    }

    /// Returns the number of final-state particles.
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    /// Always `false`, a final state has at least two particles.
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Returns the sum of all masses.
    pub fn threshold(&self) -> T {
        self.masses.iter().fold(T::zero(), |acc, &m| acc + m)
    }

    /// Returns `true` if every particle is massless.
    pub fn is_massless(&self) -> bool {
        self.masses.iter().all(|m| *m == T::zero())
    }

    /// Returns the kinematically allowed energy range of the particle with index `particle`.
    ///
    /// The lower limit is the particle's mass, the upper limit is reached when all other
    /// particles recoil together as a single body with their summed mass.
    pub fn energy_limits(&self, particle: usize) -> Result<(T, T), RamboError> {
        let mass = *self.masses.get(particle).ok_or_else(|| {
            RamboError::invalid(format!(
                "particle index {} out of range for {} particles",
                particle,
                self.len()
            ))
        })?;
        let recoil = self.threshold() - mass;
        let two = constant::<T>(2.0);
        let upper = (self.cme * self.cme + mass * mass - recoil * recoil) / (two * self.cme);

        Ok((mass, upper))
    }
}

/// A phase-space point: one four-momentum per final-state particle and its weight.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhaseSpacePoint<T> {
    /// The final-state momenta, in the order of the masses of the [`FinalState`].
    pub momenta: Vec<FourMomentum<T>>,
    /// The phase-space weight of this point.
    pub weight: T,
}

impl<T: Real> PhaseSpacePoint<T> {
    /// Returns the sum of all momenta.
    pub fn total_momentum(&self) -> FourMomentum<T> {
        self.momenta.iter().sum()
    }

    /// Returns the energies of all particles.
    pub fn energies(&self) -> Vec<T> {
        self.momenta.iter().map(|p| p.e).collect()
    }
}

/// The points generated by a single call to [`generate_phase_space`].
///
/// [`generate_phase_space`]: crate::phase_space::generate_phase_space
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PointBatch<T> {
    points: Vec<PhaseSpacePoint<T>>,
    calls: usize,
    non_converged: usize,
}

impl<T> PointBatch<T> {
    pub(crate) fn with_capacity(calls: usize) -> Self {
        Self {
            points: Vec::with_capacity(calls),
            calls,
            non_converged: 0,
        }
    }

    pub(crate) fn push(&mut self, point: PhaseSpacePoint<T>) {
        self.points.push(point);
    }

    pub(crate) fn reject(&mut self) {
        self.non_converged += 1;
    }

    /// Returns the generated points.
    pub fn points(&self) -> &[PhaseSpacePoint<T>] {
        &self.points
    }

    /// Returns the number of points that were requested.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the number of points that were discarded because their mass-shell solve failed.
    pub fn non_converged(&self) -> usize {
        self.non_converged
    }

    /// Returns the number of generated points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no point was generated.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Destructure the batch and return its points.
    pub fn into_points(self) -> Vec<PhaseSpacePoint<T>> {
        self.points
    }
}

impl<T> Add for PointBatch<T> {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.points.extend(other.points);
        self.calls += other.calls;
        self.non_converged += other.non_converged;
        self
    }
}

impl<T> IntoIterator for PointBatch<T> {
    type Item = PhaseSpacePoint<T>;
    type IntoIter = std::vec::IntoIter<PhaseSpacePoint<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

/// Compute the number of calls on a given core, given the total number of cores
/// `n_cores`, the index `core` (zero-based) of the current thread as well as the
/// total number of calls `total_calls` to perform combined on all cores.
pub(crate) fn compute_calls_for_core(core: usize, n_cores: usize, total_calls: usize) -> usize {
    debug_assert!(core < n_cores);
    let calls_per_core = calls_per_core(n_cores, total_calls);

    // the last core takes what is left, the cores before it might already have used up
    // everything
    if n_cores == core + 1 {
        total_calls.saturating_sub(core * calls_per_core)
    } else {
        calls_per_core.min(total_calls.saturating_sub(core * calls_per_core))
    }
}

/// Number of calls each core but the last one performs.
pub(crate) fn calls_per_core(n_cores: usize, total_calls: usize) -> usize {
    (total_calls + n_cores - 1) / n_cores
}
