//! Annihilation cross sections of two initial-state particles.

use super::{sample, IntegrationResult};
use crate::config::RamboConfig;
use crate::core::{constant, FinalState, MatrixElement, Real};
use crate::error::RamboError;
use rand::distributions::{Distribution, Open01};

/// Returns the flux factor $4 E_1 E_2 v_\mathrm{rel}$ of two particles with masses
/// `initial_masses` colliding at centre-of-mass energy `cme`.
///
/// The energies are $E_{1,2} = (s + m_{1,2}^2 - m_{2,1}^2) / (2\sqrt{s})$ and the relative
/// velocity is $v_\mathrm{rel} = |\vec{p}| / E_1 + |\vec{p}| / E_2$.
pub fn flux_factor<T: Real>(initial_masses: [T; 2], cme: T) -> Result<T, RamboError> {
    let [m1, m2] = initial_masses;

    if initial_masses
        .iter()
        .any(|m| !m.is_finite() || *m < T::zero())
    {
        return Err(RamboError::invalid(format!(
            "initial-state masses must be finite and non-negative, got {:?}",
            initial_masses
        )));
    }

    if !(cme > m1 + m2) {
        return Err(RamboError::invalid(format!(
            "the centre-of-mass energy {:?} does not exceed the initial-state threshold {:?}",
            cme,
            m1 + m2
        )));
    }

    let two = constant::<T>(2.0);
    let four = constant::<T>(4.0);
    let s = cme * cme;
    let e1 = (s + m1 * m1 - m2 * m2) / (two * cme);
    let e2 = (s + m2 * m2 - m1 * m1) / (two * cme);
    let p = ((s - (m1 + m2) * (m1 + m2)) * (s - (m1 - m2) * (m1 - m2))).sqrt() / (two * cme);
    let v_rel = p / e1 + p / e2;

    Ok(four * e1 * e2 * v_rel)
}

/// Computes the cross section for two particles with masses `initial_masses` annihilating into
/// `final_state`,
///
/// $$ \sigma = \frac{1}{4 E_1 E_2 v_\mathrm{rel}} \int \mathrm{d}\Phi_N \, |\mathcal{M}|^2 , $$
///
/// using `calls` phase-space points distributed over the workers of `config`.
pub fn compute_annihilation_cross_section<T, M>(
    initial_masses: [T; 2],
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
    // checked before anything is sampled
    let flux = flux_factor(initial_masses, final_state.cme())?;
    let accumulator = sample(final_state, matrix_element, calls, config, &[])?;

    IntegrationResult::new(&accumulator.estimators, T::one() / flux, calls)
}
