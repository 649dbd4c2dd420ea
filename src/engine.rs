//! A phase-space engine bundling a configuration with a progress callback.
use crate::callbacks::{Callback, SinkCallback};
use crate::config::RamboConfig;
use crate::core::{FinalState, MatrixElement, PhaseSpacePoint, PointBatch, Real};
use crate::error::RamboError;
use crate::histograms::{self, EnergyHistogram};
use crate::integrators::{self, IntegrationResult};
use crate::phase_space::{self, rescaler::MassShellSolver, PointGenerator};
use crate::runner::WorkerStreams;
use rand::distributions::{Distribution, Open01};

/// The RAMBO engine. Every method is a single request that uses the configuration given at
/// construction; results of finished integrations and histograms are reported to the callback.
///
/// ```rust
/// use ramboir::config::RamboConfig;
/// use ramboir::core::{flat, FinalState};
/// use ramboir::engine::Rambo;
///
/// let config = RamboConfig::builder().workers(2).seed(1).build().unwrap();
/// let rambo = Rambo::new(config);
/// let final_state = FinalState::new(vec![0.0, 0.0], 2.0).unwrap();
///
/// let width = rambo.decay_width(&final_state, &flat::<f64>, 1_000).unwrap();
/// assert!(width.value() > 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Rambo<C = SinkCallback> {
    config: RamboConfig,
    callback: C,
}

impl Default for Rambo {
    fn default() -> Self {
        Self::new(RamboConfig::default())
    }
}

impl Rambo {
    /// Constructs a silent engine.
    pub fn new(config: RamboConfig) -> Self {
        Self {
            config,
            callback: SinkCallback {},
        }
    }
}

impl<C> Rambo<C> {
    /// Replaces the callback.
    pub fn with_callback<D>(self, callback: D) -> Rambo<D> {
        Rambo {
            config: self.config,
            callback,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RamboConfig {
        &self.config
    }

    /// Generates a single phase-space point on the calling thread, drawing from the stream of
    /// the first worker.
    pub fn phase_space_point<T>(
        &self,
        final_state: &FinalState<T>,
    ) -> Result<PhaseSpacePoint<T>, RamboError>
    where
        T: Real,
        Open01: Distribution<T>,
    {
        self.config.validate()?;

        let mut rng = WorkerStreams::new(&self.config, 1).rng(0, 0);

        PointGenerator::new(final_state, MassShellSolver::from_config(&self.config))
            .generate(&mut rng)
    }

    /// See [`phase_space::generate_phase_space`].
    pub fn phase_space<T>(
        &self,
        final_state: &FinalState<T>,
        calls: usize,
    ) -> Result<PointBatch<T>, RamboError>
    where
        T: Real,
        Open01: Distribution<T>,
    {
        phase_space::generate_phase_space(final_state, calls, &self.config)
    }

    /// See [`integrators::compute_decay_width`].
    pub fn decay_width<T, M>(
        &self,
        final_state: &FinalState<T>,
        matrix_element: &M,
        calls: usize,
    ) -> Result<IntegrationResult<T>, RamboError>
    where
        T: Real,
        M: MatrixElement<T> + ?Sized,
        C: Callback<T>,
        Open01: Distribution<T>,
    {
        let result =
            integrators::compute_decay_width(final_state, matrix_element, calls, &self.config)?;
        self.callback.print("decay width", &result);

        Ok(result)
    }

    /// See [`integrators::compute_annihilation_cross_section`].
    pub fn annihilation_cross_section<T, M>(
        &self,
        initial_masses: [T; 2],
        final_state: &FinalState<T>,
        matrix_element: &M,
        calls: usize,
    ) -> Result<IntegrationResult<T>, RamboError>
    where
        T: Real,
        M: MatrixElement<T> + ?Sized,
        C: Callback<T>,
        Open01: Distribution<T>,
    {
        let result = integrators::compute_annihilation_cross_section(
            initial_masses,
            final_state,
            matrix_element,
            calls,
            &self.config,
        )?;
        self.callback.print("annihilation cross section", &result);

        Ok(result)
    }

    /// See [`histograms::generate_energy_histogram`].
    pub fn energy_histogram<T, M>(
        &self,
        final_state: &FinalState<T>,
        matrix_element: &M,
        particle: usize,
        edges: Vec<T>,
        calls: usize,
    ) -> Result<EnergyHistogram<T>, RamboError>
    where
        T: Real,
        M: MatrixElement<T> + ?Sized,
        C: Callback<T>,
        Open01: Distribution<T>,
    {
        let histogram = histograms::generate_energy_histogram(
            final_state,
            matrix_element,
            particle,
            edges,
            calls,
            &self.config,
        )?;
        self.callback.print_histogram(&histogram);

        Ok(histogram)
    }

    /// See [`histograms::generate_energy_histograms`].
    pub fn energy_histograms<T, M>(
        &self,
        final_state: &FinalState<T>,
        matrix_element: &M,
        bins: usize,
        calls: usize,
    ) -> Result<Vec<EnergyHistogram<T>>, RamboError>
    where
        T: Real,
        M: MatrixElement<T> + ?Sized,
        C: Callback<T>,
        Open01: Distribution<T>,
    {
        let histograms = histograms::generate_energy_histograms(
            final_state,
            matrix_element,
            bins,
            calls,
            &self.config,
        )?;
        histograms
            .iter()
            .for_each(|histogram| self.callback.print_histogram(histogram));

        Ok(histograms)
    }
}
