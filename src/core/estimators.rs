//! This module contains everything related to estimators.
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul};

/// Basic estimators, like the mean, variance, and the standard deviation.
pub trait BasicEstimators<T: Float> {
    /// Returns the mean value.
    fn mean(&self) -> T;

    /// Returns the variance of the mean, $V$.
    fn var(&self) -> T;

    /// Returns the standard deviation, $\sigma = \sqrt{V}$.
    fn std(&self) -> T {
        self.var().sqrt()
    }
}

/// More estimators.
pub trait Estimators<T: Float>: BasicEstimators<T> {
    /// Returns the number of samples, $N$, that entered the estimate.
    fn calls(&self) -> usize;

    /// Returns the number of samples that were drawn but had to be discarded, either because the
    /// phase-space point could not be constructed or because the matrix element was invalid.
    fn rejected_calls(&self) -> usize;

    /// Returns the number of samples, $N_\mathrm{nz}$, with a non-zero contribution.
    fn non_zero_calls(&self) -> usize;
}

/// A struct implementing the `BasicEstimator<T>` trait.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct MeanVar<T> {
    mean: T,
    var: T,
}

impl<T: Add<Output = T>> Add for MeanVar<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            mean: self.mean + other.mean,
            var: self.var + other.var,
        }
    }
}

impl<T: Add<Output = T> + AddAssign> AddAssign for MeanVar<T> {
    fn add_assign(&mut self, other: Self) {
        self.mean += other.mean;
        self.var += other.var;
    }
}

/// Multiplying by a constant scales the mean linearly and the variance quadratically.
impl<T: Float> Mul<T> for MeanVar<T> {
    type Output = Self;

    fn mul(self, factor: T) -> Self {
        Self {
            mean: self.mean * factor,
            var: self.var * factor * factor,
        }
    }
}

impl<T> MeanVar<T> {
    /// Constructor.
    pub const fn new(mean: T, var: T) -> Self {
        Self { mean, var }
    }
}

impl<T: Float> MeanVar<T> {
    /// Mean and variance of the mean of `calls` samples with the given sum and sum of squares.
    pub fn from_sums(sum: T, sumsq: T, calls: T) -> Self {
        Self {
            mean: sum / calls,
            var: ((sumsq - sum * sum / calls) / calls / (calls - T::one())).max(T::zero()),
        }
    }
}

impl<T: Float> BasicEstimators<T> for MeanVar<T> {
    fn mean(&self) -> T {
        self.mean
    }

    fn var(&self) -> T {
        self.var
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_mean_var_add() {
        let mv_1 = MeanVar::<f64>::new(1.1, 0.5);
        let mv_2 = MeanVar::<f64>::new(5.3, 1.2);
        let sum = mv_1 + mv_2;

        assert_eq!(sum.mean(), 6.4);
        assert_eq!(sum.var(), 1.7);
        assert_eq!(sum.std(), 1.7f64.sqrt());
    }

    #[test]
    fn test_mean_var_add_assign() {
        let mut mv_1 = MeanVar::<f64>::new(1.1, 0.5);
        mv_1 += MeanVar::<f64>::new(5.3, 1.2);

        assert_eq!(mv_1.mean(), 6.4);
        assert_eq!(mv_1.var(), 1.7);
        assert_eq!(mv_1.std(), 1.7f64.sqrt());
    }

    #[test]
    fn test_mean_var_scale() {
        let mv = MeanVar::<f64>::new(2.0, 0.25) * 4.0;

        assert_eq!(mv.mean(), 8.0);
        assert_eq!(mv.var(), 4.0);
        assert_eq!(mv.std(), 2.0);
    }

    #[test]
    fn test_mean_var_from_sums() {
        // samples 1, 2, 3, 4
        let mv = MeanVar::<f64>::from_sums(10.0, 30.0, 4.0);

        assert_eq!(mv.mean(), 2.5);
        // sample variance 5/3, divided by the number of samples
        assert_approx_eq!(mv.var(), 5.0 / 12.0, 1e-15);
    }
}
