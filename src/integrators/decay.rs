//! Partial decay widths.

use super::{sample, IntegrationResult};
use crate::config::RamboConfig;
use crate::core::{constant, FinalState, MatrixElement, Real};
use crate::error::RamboError;
use rand::distributions::{Distribution, Open01};

/// Computes the width of a particle with mass $M = \sqrt{s}$ decaying into `final_state`,
///
/// $$ \Gamma = \frac{1}{2M} \int \mathrm{d}\Phi_N \, |\mathcal{M}|^2 , $$
///
/// using `calls` phase-space points distributed over the workers of `config`.
pub fn compute_decay_width<T, M>(
    final_state: &FinalState<T>,
    matrix_element: &M,
    calls: usize,
    config: &RamboConfig,
) -> Result<IntegrationResult<T>, RamboError>
where
    T: Real,
    M: MatrixElement<T> + ?Sized,
    Open01: Distribution<T>,
{
    let accumulator = sample(final_state, matrix_element, calls, config, &[])?;
    let normalization = T::one() / (constant::<T>(2.0) * final_state.cme());

    IntegrationResult::new(&accumulator.estimators, normalization, calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flat;
    use crate::kinematics::FourMomentum;
    use std::f64::consts::PI;

    fn config() -> RamboConfig {
        RamboConfig::builder()
            .workers(2)
            .seed(0xcafef00dd15ea5e5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_two_body_width() {
        // Gamma = |M|^2 |p| / (8 pi M^2) for a constant matrix element
        let (m1, m2, mass) = (0.1, 0.3, 1.0);
        let final_state = FinalState::<f64>::new(vec![m1, m2], mass).unwrap();
        let constant = |_: &[FourMomentum<f64>]| 2.0;
        let result = compute_decay_width(&final_state, &constant, 1000, &config()).unwrap();

        let p = ((mass * mass - (m1 + m2) * (m1 + m2)) * (mass * mass - (m1 - m2) * (m1 - m2)))
            .sqrt()
            / (2.0 * mass);
        let expected = 2.0 * p / (8.0 * PI * mass * mass);

        // every two-body point carries the same weight
        assert!((result.value() - expected).abs() < 1e-8 * expected);
        assert!(result.error() < 1e-8 * expected);
        assert_eq!(result.valid_calls(), 1000);
    }

    #[test]
    fn test_below_threshold() {
        assert!(matches!(
            FinalState::<f64>::new(vec![0.6, 0.6], 1.0),
            Err(RamboError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_flat_three_body_width() {
        // massless three-body volume s / (256 pi^3)
        let final_state = FinalState::<f64>::new(vec![0.0, 0.0, 0.0], 2.0).unwrap();
        let result = compute_decay_width(&final_state, &flat::<f64>, 100, &config()).unwrap();

        let expected = 4.0 / (256.0 * PI.powi(3)) / 4.0;
        assert!((result.value() - expected).abs() < 1e-12 * expected);
    }
}
