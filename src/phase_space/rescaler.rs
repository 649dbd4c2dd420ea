//! Maps massless momenta onto the mass shells of the final state and computes the weight.
//!
//! Given massless momenta $q_i$ with total momentum $Q$, the momenta are first boosted into the
//! rest frame of $Q$ and scaled so that they sum to $(\sqrt{s}, \vec{0})$. Then a common factor
//! $\xi$ is determined from
//!
//! $$ \sum_i \sqrt{\xi^2 |\vec{k}_i|^2 + m_i^2} = \sqrt{s} $$
//!
//! and the final momenta are $\vec{p}_i = \xi \vec{k}_i$ with $E_i = \sqrt{|\vec{p}_i|^2 + m_i^2}$.
//! The weight of the resulting point is
//!
//! $$ W = V_N \xi^{2N-3} \prod_i \frac{|\vec{p}_i|}{E_i} \frac{\sqrt{s}}{\sum_i |\vec{p}_i|^2 / E_i} $$
//!
//! with the massless volume $V_N$ given by [`massless_volume`].

use crate::config::RamboConfig;
use crate::core::{constant, count, FinalState, Real};
use crate::error::RamboError;
use crate::kinematics::FourMomentum;
use std::convert::TryFrom;

/// Bounded Newton-Raphson solver for the scaling factor $\xi$.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassShellSolver<T> {
    tolerance: T,
    max_iterations: usize,
}

impl<T: Real> MassShellSolver<T> {
    /// The solve converged once the summed energy deviates from $\sqrt{s}$ by less than
    /// `tolerance` times $\sqrt{s}$. At most `max_iterations` Newton steps are taken.
    pub fn new(tolerance: T, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Takes tolerance and iteration bound from `config`.
    pub fn from_config(config: &RamboConfig) -> Self {
        Self::new(constant(config.tolerance()), config.max_iterations())
    }

    /// Solves for $\xi$, given the squared three-momenta `momenta_sqr` of the massless momenta in
    /// the centre-of-mass frame, the `masses`, and the centre-of-mass energy `cme`.
    ///
    /// The iteration starts at $\xi_0 = \sqrt{1 - (\sum_i m_i / \sqrt{s})^2}$, where the summed
    /// energy is never too small. Since the summed energy is convex in $\xi$, the iterates then
    /// decrease monotonically towards the root.
    pub fn solve(&self, momenta_sqr: &[T], masses: &[T], cme: T) -> Result<T, RamboError> {
        debug_assert_eq!(momenta_sqr.len(), masses.len());

        let threshold = masses.iter().fold(T::zero(), |acc, &m| acc + m) / cme;
        let mut xi = (T::one() - threshold * threshold).max(T::zero()).sqrt();
        let mut residual = T::infinity();
        let mut iterations = 0;

        for iteration in 0..=self.max_iterations {
            iterations = iteration;
            let (energy, derivative) = momenta_sqr.iter().zip(masses).fold(
                (T::zero(), T::zero()),
                |(energy, derivative), (&k2, &m)| {
                    let e = (xi * xi * k2 + m * m).sqrt();
                    if e > T::zero() {
                        (energy + e, derivative + xi * k2 / e)
                    } else {
                        (energy, derivative)
                    }
                },
            );
            residual = energy - cme;

            if residual.abs() <= self.tolerance * cme {
                return Ok(xi);
            }

            if iteration == self.max_iterations || !(derivative > T::zero()) {
                break;
            }

            xi = (xi - residual / derivative).max(T::zero());
        }

        Err(RamboError::NonConvergence {
            iterations,
            residual: residual.to_f64().unwrap_or(f64::NAN),
        })
    }
}

/// Volume of the phase space of `n` massless particles at centre-of-mass energy `cme`,
///
/// $$ V_n = (2\pi)^{4-3n} \left( \frac{\pi}{2} \right)^{n-1} \frac{s^{n-2}}{(n-1)!(n-2)!} . $$
pub fn massless_volume<T: Real>(n: usize, cme: T) -> T {
    debug_assert!(n >= 2);

    let ln_factorial = |k: usize| (2..=k).fold(T::zero(), |acc, i| acc + count::<T>(i).ln());
    let n_t = count::<T>(n);
    let one = T::one();
    let two = constant::<T>(2.0);
    let three = constant::<T>(3.0);
    let four = constant::<T>(4.0);

    let ln_volume = (four - three * n_t) * (two * T::PI()).ln()
        + (n_t - one) * T::FRAC_PI_2().ln()
        + (two * n_t - four) * cme.ln()
        - ln_factorial(n - 1)
        - ln_factorial(n - 2);

    ln_volume.exp()
}

/// Boosts `momenta` into the rest frame of their sum and scales them so that their total energy
/// is `cme`. The momenta must be massless.
pub fn boost_and_scale<T: Real>(momenta: &mut [FourMomentum<T>], cme: T) {
    let total: FourMomentum<T> = momenta.iter().sum();
    let scale = cme / total.mass();

    momenta
        .iter_mut()
        .for_each(|q| *q = q.boost_to_rest_frame_of(&total) * scale);
}

/// Turns the massless momenta in `momenta` into a phase-space point of `final_state` and
/// returns its weight.
///
/// On return the momenta sum to $(\sqrt{s}, \vec{0})$ and lie on their mass shells. If the
/// mass-shell solve fails the content of `momenta` is unspecified.
pub fn rescale<T: Real>(
    momenta: &mut [FourMomentum<T>],
    final_state: &FinalState<T>,
    solver: &MassShellSolver<T>,
) -> Result<T, RamboError> {
    let cme = final_state.cme();
    let n = momenta.len();

    boost_and_scale(momenta, cme);
    let volume = massless_volume(n, cme);

    if final_state.is_massless() {
        return Ok(volume);
    }

    let momenta_sqr = momenta
        .iter()
        .map(FourMomentum::momentum_sqr)
        .collect::<Vec<_>>();
    let xi = solver.solve(&momenta_sqr, final_state.masses(), cme)?;

    let mut ratio = T::one();
    let mut sum = T::zero();

    for (k, &m) in momenta.iter_mut().zip(final_state.masses()) {
        *k = k.with_mass(xi, m);

        // a particle without mass and momentum has a ratio of one and does not contribute to
        // the sum
        if k.e > T::zero() {
            let p = k.momentum();
            ratio = ratio * p / k.e;
            sum += p * p / k.e;
        }
    }

    // exactly at threshold all momenta vanish
    if !(sum > T::zero()) {
        return Ok(T::zero());
    }

    let power = i32::try_from(2 * n - 3).unwrap_or(i32::MAX);

    Ok(volume * xi.powi(power) * ratio * cme / sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_space::sampler::sample_massless;
    use assert_approx_eq::assert_approx_eq;
    use rand_pcg::Pcg64;
    use std::f64::consts::PI;

    fn rng() -> Pcg64 {
        Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96)
    }

    fn solver() -> MassShellSolver<f64> {
        MassShellSolver::new(1e-12, 50)
    }

    #[test]
    fn test_massless_volume() {
        assert_approx_eq!(massless_volume::<f64>(2, 1.0), 1.0 / (8.0 * PI), 1e-15);

        // V_3 = s / (256 pi^3)
        assert_approx_eq!(
            massless_volume::<f64>(3, 2.0),
            4.0 / (256.0 * PI.powi(3)),
            1e-16
        );

        // V_4 = s^2 / (24576 pi^5)
        let v4: f64 = massless_volume(4, 3.0);
        assert_approx_eq!(v4 / (81.0 / (24576.0 * PI.powi(5))), 1.0, 1e-13);
    }

    #[test]
    fn test_boost_and_scale() {
        let mut momenta: Vec<FourMomentum<f64>> = sample_massless(5, &mut rng());
        boost_and_scale(&mut momenta, 7.0);

        let total: FourMomentum<f64> = momenta.iter().sum();
        assert_approx_eq!(total.e, 7.0, 1e-13);
        assert_approx_eq!(total.px, 0.0, 1e-13);
        assert_approx_eq!(total.py, 0.0, 1e-13);
        assert_approx_eq!(total.pz, 0.0, 1e-13);

        for p in &momenta {
            assert_approx_eq!(p.mass_sqr(), 0.0, 1e-12);
        }
    }

    #[test]
    fn test_solve_two_body() {
        // back-to-back momenta of magnitude 5 at sqrt(s) = 10, masses 6 and 0: the analytic
        // solution is |p| = (s - m^2) / (2 sqrt(s)) = 3.2, so xi = 0.64
        let xi = solver().solve(&[25.0, 25.0], &[6.0, 0.0], 10.0).unwrap();
        assert_approx_eq!(xi, 0.64, 1e-12);
    }

    #[test]
    fn test_solve_at_threshold() {
        let xi = solver().solve(&[1.0, 4.0], &[1.5, 1.5], 3.0).unwrap();
        assert_eq!(xi, 0.0);
    }

    #[test]
    fn test_solve_reports_non_convergence() {
        let solver = MassShellSolver::new(1e-15, 1);

        match solver.solve(&[1.0, 2.0, 3.0], &[0.5, 0.1, 1.0], 4.0) {
            Err(RamboError::NonConvergence {
                iterations,
                residual,
            }) => {
                assert_eq!(iterations, 1);
                assert!(residual > 0.0);
            }
            other => panic!("expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn test_solve_stops_without_slope() {
        // without any momentum the summed energy does not depend on xi
        match solver().solve(&[0.0, 0.0], &[0.5, 0.5], 2.0) {
            Err(RamboError::NonConvergence {
                iterations,
                residual,
            }) => {
                assert_eq!(iterations, 0);
                assert_eq!(residual, -1.0);
            }
            other => panic!("expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn test_rescale_massive() {
        let final_state = FinalState::<f64>::new(vec![0.1, 0.5, 0.0, 1.2], 5.0).unwrap();
        let mut momenta: Vec<FourMomentum<f64>> = sample_massless(4, &mut rng());

        let weight = rescale(&mut momenta, &final_state, &solver()).unwrap();
        assert!(weight > 0.0);

        let total: FourMomentum<f64> = momenta.iter().sum();
        assert_approx_eq!(total.e, 5.0, 1e-10);
        assert_approx_eq!(total.momentum(), 0.0, 1e-12);

        for (p, m) in momenta.iter().zip(final_state.masses()) {
            assert_approx_eq!(p.mass_sqr(), m * m, 1e-12);
        }
    }

    #[test]
    fn test_rescale_two_body_weight() {
        // for two bodies the weight is the analytic phase-space volume |p| / (4 pi sqrt(s))
        let (m1, m2, cme) = (1.0, 2.0, 5.0);
        let final_state = FinalState::<f64>::new(vec![m1, m2], cme).unwrap();
        let mut momenta: Vec<FourMomentum<f64>> = sample_massless(2, &mut rng());

        let weight = rescale(&mut momenta, &final_state, &solver()).unwrap();
        let p = ((cme * cme - (m1 + m2) * (m1 + m2)) * (cme * cme - (m1 - m2) * (m1 - m2))).sqrt()
            / (2.0 * cme);

        assert_approx_eq!(momenta[0].momentum(), p, 1e-10);
        assert_approx_eq!(weight / (p / (4.0 * PI * cme)), 1.0, 1e-10);
    }

    #[test]
    fn test_rescale_at_threshold() {
        let final_state = FinalState::<f64>::new(vec![1.0, 2.0], 3.0).unwrap();
        let mut momenta: Vec<FourMomentum<f64>> = sample_massless(2, &mut rng());

        assert_eq!(rescale(&mut momenta, &final_state, &solver()).unwrap(), 0.0);
    }
}
