//! Isotropic massless momenta, the first step of RAMBO.

use crate::core::{constant, Real};
use crate::kinematics::FourMomentum;
use rand::distributions::{Distribution, Open01};
use rand::Rng;

/// Number of uniform random numbers drawn for every particle.
pub const DRAWS_PER_PARTICLE: usize = 4;

/// Draws a single massless momentum with an isotropic direction and an energy distributed
/// according to $E e^{-E}$.
///
/// The uniform numbers are consumed in a fixed order: the cosine of the polar angle, the
/// azimuth, and two numbers whose product gives the energy.
pub fn isotropic_momentum<T, R>(rng: &mut R) -> FourMomentum<T>
where
    T: Real,
    R: Rng + ?Sized,
    Open01: Distribution<T>,
{
    let r1: T = Open01.sample(rng);
    let r2: T = Open01.sample(rng);
    let r3: T = Open01.sample(rng);
    let r4: T = Open01.sample(rng);

    let two = constant::<T>(2.0);
    let c = two * r1 - T::one();
    let phi = two * T::PI() * r2;

    let s = (T::one() - c * c).max(T::zero()).sqrt();
    let e = -(r3 * r4).ln();

    FourMomentum::new(e, e * s * phi.cos(), e * s * phi.sin(), e * c)
}

/// Overwrites every element of `momenta` with a fresh isotropic massless momentum.
pub fn fill_massless<T, R>(momenta: &mut [FourMomentum<T>], rng: &mut R)
where
    T: Real,
    R: Rng + ?Sized,
    Open01: Distribution<T>,
{
    momenta
        .iter_mut()
        .for_each(|p| *p = isotropic_momentum(&mut *rng));
}

/// Returns `n` isotropic massless momenta. Their sum is not yet constrained in any way.
pub fn sample_massless<T, R>(n: usize, rng: &mut R) -> Vec<FourMomentum<T>>
where
    T: Real,
    R: Rng + ?Sized,
    Open01: Distribution<T>,
{
    (0..n).map(|_| isotropic_momentum(&mut *rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::RngCore;
    use rand_pcg::Pcg64;

    fn rng() -> Pcg64 {
        Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96)
    }

    #[test]
    fn test_massless_and_positive() {
        let momenta: Vec<FourMomentum<f64>> = sample_massless(1000, &mut rng());

        for p in momenta {
            assert!(p.e > 0.0);
            assert_approx_eq!(p.momentum(), p.e, 1e-12 * p.e);
        }
    }

    #[test]
    fn test_energy_and_direction_moments() {
        const CALLS: usize = 200_000;
        let momenta: Vec<FourMomentum<f64>> = sample_massless(CALLS, &mut rng());
        let n = CALLS as f64;

        // Gamma(2, 1) has mean 2 and variance 2
        let mean = momenta.iter().map(|p| p.e).sum::<f64>() / n;
        assert_approx_eq!(mean, 2.0, 0.02);

        // isotropy: the average direction vanishes and <cos^2> = 1/3
        let cz = momenta.iter().map(|p| p.pz / p.e).sum::<f64>() / n;
        let cx = momenta.iter().map(|p| p.px / p.e).sum::<f64>() / n;
        let cz2 = momenta.iter().map(|p| (p.pz / p.e).powi(2)).sum::<f64>() / n;
        assert_approx_eq!(cz, 0.0, 0.01);
        assert_approx_eq!(cx, 0.0, 0.01);
        assert_approx_eq!(cz2, 1.0 / 3.0, 0.01);
    }

    #[test]
    fn test_draws_per_particle() {
        let mut sampled = rng();
        let mut skipped = rng();

        let mut momenta = vec![FourMomentum::<f64>::zero(); 3];
        fill_massless(&mut momenta, &mut sampled);

        // every uniform number advances the generator by exactly one step
        for _ in 0..3 * DRAWS_PER_PARTICLE {
            skipped.next_u64();
        }

        assert_eq!(sampled.next_u64(), skipped.next_u64());
    }
}
