//! RAMBO phase-space generation.
//!
//! A point is generated in two steps: [`sampler`] draws isotropic massless momenta, and
//! [`rescaler`] maps them onto the mass shells of the final state while computing the weight.
pub mod rescaler;
pub mod sampler;

use crate::config::RamboConfig;
use crate::core::{FinalState, PhaseSpacePoint, PointBatch, Real};
use crate::error::RamboError;
use crate::kinematics::FourMomentum;
use crate::runner;
use rand::distributions::{Distribution, Open01};
use rand::Rng;
use rescaler::{rescale, MassShellSolver};
use sampler::{fill_massless, DRAWS_PER_PARTICLE};
use tracing::warn;

/// Generates phase-space points of a fixed final state.
#[derive(Clone, Debug)]
pub struct PointGenerator<'a, T> {
    final_state: &'a FinalState<T>,
    solver: MassShellSolver<T>,
}

impl<'a, T: Real> PointGenerator<'a, T>
where
    Open01: Distribution<T>,
{
    /// Constructor.
    pub fn new(final_state: &'a FinalState<T>, solver: MassShellSolver<T>) -> Self {
        Self {
            final_state,
            solver,
        }
    }

    /// Returns the final state the points belong to.
    pub fn final_state(&self) -> &FinalState<T> {
        self.final_state
    }

    /// Number of uniform random numbers consumed by every call to [`generate`].
    ///
    /// [`generate`]: PointGenerator::generate
    pub fn draws_per_point(&self) -> usize {
        DRAWS_PER_PARTICLE * self.final_state.len()
    }

    /// Generates a single point. A point whose mass-shell solve fails is never returned.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PhaseSpacePoint<T>, RamboError> {
        let mut momenta = vec![FourMomentum::zero(); self.final_state.len()];
        fill_massless(&mut momenta, rng);
        let weight = rescale(&mut momenta, self.final_state, &self.solver)?;

        Ok(PhaseSpacePoint { momenta, weight })
    }
}

/// Generates a single phase-space point of `final_state` using the random numbers of `rng`.
///
/// The mass-shell solve uses the default tolerance and iteration bound of [`RamboConfig`].
pub fn generate_phase_space_point<T, R>(
    final_state: &FinalState<T>,
    rng: &mut R,
) -> Result<PhaseSpacePoint<T>, RamboError>
where
    T: Real,
    R: Rng + ?Sized,
    Open01: Distribution<T>,
{
    let solver = MassShellSolver::from_config(&RamboConfig::default());

    PointGenerator::new(final_state, solver).generate(rng)
}

/// Generates `calls` independent phase-space points of `final_state` on the workers of `config`.
///
/// Points whose mass-shell solve fails are discarded and counted. If more than the configured
/// fraction of points is discarded the whole batch fails.
pub fn generate_phase_space<T>(
    final_state: &FinalState<T>,
    calls: usize,
    config: &RamboConfig,
) -> Result<PointBatch<T>, RamboError>
where
    T: Real,
    Open01: Distribution<T>,
{
    let generator = PointGenerator::new(final_state, MassShellSolver::from_config(config));

    let batch = runner::run(
        config,
        calls,
        generator.draws_per_point(),
        |share, mut rng, dispatch| {
            let mut batch = PointBatch::with_capacity(share.calls);

            for _ in 0..share.calls {
                dispatch.checkpoint()?;

                match generator.generate(&mut rng) {
                    Ok(point) => batch.push(point),
                    Err(RamboError::NonConvergence { .. }) => batch.reject(),
                    Err(err) => return Err(err),
                }
            }

            Ok(batch)
        },
    )?;

    if batch.non_converged() > 0 {
        warn!(
            discarded = batch.non_converged(),
            calls, "discarded phase-space points whose mass-shell solve failed"
        );

        if exceeds_rate(batch.non_converged(), calls, config.max_failure_rate()) {
            return Err(RamboError::ExcessiveNonConvergence {
                failed: batch.non_converged(),
                calls,
            });
        }
    }

    Ok(batch)
}

/// Returns `true` if `failed` out of `calls` is more than the fraction `max_rate`.
pub(crate) fn exceeds_rate(failed: usize, calls: usize, max_rate: f64) -> bool {
    failed as f64 > max_rate * calls as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand_pcg::Pcg64;

    fn rng() -> Pcg64 {
        Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96)
    }

    fn config(workers: usize) -> RamboConfig {
        RamboConfig::builder()
            .workers(workers)
            .seed(0xcafef00dd15ea5e5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_single_point() {
        let final_state = FinalState::<f64>::new(vec![0.1, 0.2, 0.3], 1.0).unwrap();
        let point = generate_phase_space_point(&final_state, &mut rng()).unwrap();

        assert_eq!(point.momenta.len(), 3);
        assert!(point.weight > 0.0);

        let total = point.total_momentum();
        assert_approx_eq!(total.e, 1.0, 1e-9);
        assert_approx_eq!(total.momentum(), 0.0, 1e-12);
    }

    #[test]
    fn test_batch_size() {
        let final_state = FinalState::<f64>::new(vec![0.0, 0.5, 1.0], 3.0).unwrap();
        let batch = generate_phase_space(&final_state, 1001, &config(4)).unwrap();

        assert_eq!(batch.calls(), 1001);
        assert_eq!(batch.len(), 1001);
        assert_eq!(batch.non_converged(), 0);
    }

    #[test]
    fn test_points_are_independent() {
        let final_state = FinalState::<f64>::new(vec![0.0, 0.0, 0.0], 3.0).unwrap();
        let batch = generate_phase_space(&final_state, 100, &config(2)).unwrap();
        let points = batch.points();

        for pair in points.windows(2) {
            assert_ne!(pair[0].momenta, pair[1].momenta);
        }

        // different workers use different streams
        assert_ne!(points[0].momenta, points[50].momenta);
    }

    #[test]
    fn test_non_convergence_is_counted() {
        let config = RamboConfig::builder()
            .workers(2)
            .seed(1)
            .tolerance(1e-300)
            .max_iterations(1)
            .max_failure_rate(1.0)
            .build()
            .unwrap();
        let final_state = FinalState::<f64>::new(vec![0.3, 0.4, 0.5], 2.0).unwrap();
        let batch = generate_phase_space(&final_state, 50, &config).unwrap();

        assert_eq!(batch.calls(), 50);
        assert_eq!(batch.len() + batch.non_converged(), 50);
        assert!(batch.non_converged() > 0);

        // the same situation fails with the default failure rate
        let config = RamboConfig::builder()
            .seed(1)
            .tolerance(1e-300)
            .max_iterations(1)
            .build()
            .unwrap();

        assert!(matches!(
            generate_phase_space(&final_state, 50, &config),
            Err(RamboError::ExcessiveNonConvergence { .. })
        ));
    }

    #[test]
    fn test_exceeds_rate() {
        assert!(!exceeds_rate(10, 1000, 0.01));
        assert!(exceeds_rate(11, 1000, 0.01));
        assert!(!exceeds_rate(0, 1, 0.0));
    }
}
