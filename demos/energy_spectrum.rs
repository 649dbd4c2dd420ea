use ramboir::callbacks::SimpleCallback;
use ramboir::config::RamboConfig;
use ramboir::core::{flat, FinalState};
use ramboir::engine::Rambo;
use ramboir::RamboError;

fn main() -> Result<(), RamboError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // a pion-like final state at one GeV
    let final_state = FinalState::new(vec![0.135, 0.140, 0.140], 1.0)?;

    let config = RamboConfig::from_json(r#"{ "seed": 1, "workers": 4 }"#)?;
    let rambo = Rambo::new(config).with_callback(SimpleCallback {});

    let histograms = rambo.energy_histograms(&final_state, &flat::<f64>, 25, 200_000)?;

    for histogram in &histograms {
        println!("integral of {}: {}", histogram.name(), histogram.integral());
    }

    Ok(())
}
