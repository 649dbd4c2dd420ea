use ramboir::callbacks::SimpleCallback;
use ramboir::config::RamboConfig;
use ramboir::core::FinalState;
use ramboir::engine::Rambo;
use ramboir::kinematics::FourMomentum;
use ramboir::RamboError;

use std::f64::consts::PI;

/// Muon decay, mu -> e nu nu, in the Fermi theory with the electron mass kept, in units of GeV.
const MUON_MASS: f64 = 0.105_658;
const ELECTRON_MASS: f64 = 0.000_511;
const FERMI_CONSTANT: f64 = 1.166_378_7e-5;

/// Spin-averaged squared matrix element $64 G_F^2 (p_\mu \cdot p_{\bar\nu_e}) (p_e \cdot p_{\nu_\mu})$,
/// with the momenta ordered as electron, electron antineutrino, muon neutrino.
fn muon_decay(momenta: &[FourMomentum<f64>]) -> f64 {
    let muon = FourMomentum::new(MUON_MASS, 0.0, 0.0, 0.0);

    64.0 * FERMI_CONSTANT.powi(2) * muon.dot(&momenta[1]) * momenta[0].dot(&momenta[2])
}

fn main() -> Result<(), RamboError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RamboConfig::builder().seed(0xcafef00dd15ea5e5).build()?;
    let rambo = Rambo::new(config).with_callback(SimpleCallback {});
    let final_state = FinalState::new(vec![ELECTRON_MASS, 0.0, 0.0], MUON_MASS)?;

    let width = rambo.decay_width(&final_state, &muon_decay, 1_000_000)?;

    // the massless-electron result, G_F^2 m^5 / (192 pi^3)
    let analytic = FERMI_CONSTANT.powi(2) * MUON_MASS.powi(5) / (192.0 * PI.powi(3));

    println!(
        "\nwidth = {:e} \u{b1} {:e} GeV, analytic = {:e} GeV",
        width.value(),
        width.error(),
        analytic
    );

    Ok(())
}
