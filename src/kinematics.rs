//! Four-vector algebra.
//!
//! All dot products use the metric $g = \mathrm{diag}(+1, -1, -1, -1)$, so that
//! $p \cdot p = E^2 - |\vec{p}|^2 = m^2$.

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A relativistic four-momentum $(E, p_x, p_y, p_z)$.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct FourMomentum<T> {
    /// Energy component.
    pub e: T,
    /// Momentum along the x-axis.
    pub px: T,
    /// Momentum along the y-axis.
    pub py: T,
    /// Momentum along the z-axis.
    pub pz: T,
}

impl<T: Float> FourMomentum<T> {
    /// Constructor.
    pub const fn new(e: T, px: T, py: T, pz: T) -> Self {
        Self { e, px, py, pz }
    }

    /// The null vector.
    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero(), T::zero(), T::zero())
    }

    /// Minkowski product with `other`.
    pub fn dot(&self, other: &Self) -> T {
        self.e * other.e - self.spatial_dot(other)
    }

    /// Euclidean product of the spatial components.
    pub fn spatial_dot(&self, other: &Self) -> T {
        self.px * other.px + self.py * other.py + self.pz * other.pz
    }

    /// Returns $|\vec{p}|^2$.
    pub fn momentum_sqr(&self) -> T {
        self.spatial_dot(self)
    }

    /// Returns $|\vec{p}|$.
    pub fn momentum(&self) -> T {
        self.momentum_sqr().sqrt()
    }

    /// Returns the invariant mass squared, $p \cdot p$.
    pub fn mass_sqr(&self) -> T {
        self.dot(self)
    }

    /// Returns the invariant mass. Slightly space-like vectors, which arise from rounding, are
    /// given mass zero.
    pub fn mass(&self) -> T {
        self.mass_sqr().max(T::zero()).sqrt()
    }

    /// Scales the spatial components by `factor` and puts the result on the mass shell of `mass`.
    pub fn with_mass(&self, factor: T, mass: T) -> Self {
        let px = factor * self.px;
        let py = factor * self.py;
        let pz = factor * self.pz;
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self::new(e, px, py, pz)
    }

    /// Boosts this vector into the rest frame of `frame`, which must be time-like.
    pub fn boost_to_rest_frame_of(&self, frame: &Self) -> Self {
        let m = frame.mass();
        let b = Self::new(T::zero(), -frame.px / m, -frame.py / m, -frame.pz / m);
        let gamma = frame.e / m;
        let a = T::one() / (T::one() + gamma);
        let bq = b.spatial_dot(self);

        Self::new(
            gamma * self.e + bq,
            self.px + b.px * self.e + a * bq * b.px,
            self.py + b.py * self.e + a * bq * b.py,
            self.pz + b.pz * self.e + a * bq * b.pz,
        )
    }
}

impl<T: Float> Add for FourMomentum<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(
            self.e + other.e,
            self.px + other.px,
            self.py + other.py,
            self.pz + other.pz,
        )
    }
}

impl<T: Float> AddAssign for FourMomentum<T> {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<T: Float> Sub for FourMomentum<T> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + -other
    }
}

impl<T: Float> Neg for FourMomentum<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.e, -self.px, -self.py, -self.pz)
    }
}

impl<T: Float> Mul<T> for FourMomentum<T> {
    type Output = Self;

    fn mul(self, factor: T) -> Self {
        Self::new(
            factor * self.e,
            factor * self.px,
            factor * self.py,
            factor * self.pz,
        )
    }
}

impl<T: Float> Sum for FourMomentum<T> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

impl<'a, T: Float> Sum<&'a FourMomentum<T>> for FourMomentum<T> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + *p)
    }
}
