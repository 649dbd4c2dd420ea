//! Run-time configuration of the phase-space generator and the integrators.

use crate::error::RamboError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default absolute tolerance of the mass-shell solve, relative to the centre-of-mass energy.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default maximum number of Newton steps of the mass-shell solve.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default fraction of samples that may be discarded before a request fails.
pub const DEFAULT_MAX_FAILURE_RATE: f64 = 0.01;

/// How the workers of a parallel run obtain their random numbers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StreamPolicy {
    /// Every worker draws from its own PCG stream. Without a seed the streams are unique for the
    /// lifetime of the process.
    Independent,
    /// All workers share one stream, and every worker skips ahead to the draws of its share of
    /// the points. The sampled points are then independent of the number of workers.
    Partitioned,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self::Independent
    }
}

/// Configuration of a phase-space request.
///
/// Use [`RamboConfig::builder`] to construct a validated configuration, or deserialize one with
/// [`RamboConfig::from_json`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RamboConfig {
    workers: usize,
    seed: Option<u128>,
    streams: StreamPolicy,
    tolerance: f64,
    max_iterations: usize,
    max_failure_rate: f64,
    deadline: Option<Duration>,
}

impl Default for RamboConfig {
    fn default() -> Self {
        Self {
            workers: available_workers(),
            seed: None,
            streams: StreamPolicy::default(),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_failure_rate: DEFAULT_MAX_FAILURE_RATE,
            deadline: None,
        }
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl RamboConfig {
    /// Creates a new configuration builder.
    ///
    /// ```rust
    /// use ramboir::config::RamboConfig;
    ///
    /// let config = RamboConfig::builder().workers(4).seed(42).build().unwrap();
    ///
    /// assert_eq!(config.workers(), 4);
    /// assert_eq!(config.seed(), Some(42));
    /// ```
    pub fn builder() -> RamboConfigBuilder {
        RamboConfigBuilder::default()
    }

    /// Reads a configuration from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, RamboError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| RamboError::invalid(format!("malformed configuration: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the seed, if one was set.
    pub fn seed(&self) -> Option<u128> {
        self.seed
    }

    /// Returns how the workers obtain their random numbers.
    pub fn streams(&self) -> StreamPolicy {
        self.streams
    }

    /// Returns the tolerance of the mass-shell solve.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the maximum number of Newton steps of the mass-shell solve.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the fraction of samples that may be discarded before a request fails.
    pub fn max_failure_rate(&self) -> f64 {
        self.max_failure_rate
    }

    /// Returns the wall-time budget of a request.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Checks that all parameters lie in their valid ranges.
    pub fn validate(&self) -> Result<(), RamboError> {
        if self.workers == 0 {
            return Err(RamboError::invalid("at least one worker is required"));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(RamboError::invalid(format!(
                "the tolerance must be positive, got {}",
                self.tolerance
            )));
        }

        if self.max_iterations == 0 {
            return Err(RamboError::invalid(
                "the mass-shell solve needs at least one iteration",
            ));
        }

        if !(0.0..=1.0).contains(&self.max_failure_rate) {
            return Err(RamboError::invalid(format!(
                "the maximum failure rate must lie in [0, 1], got {}",
                self.max_failure_rate
            )));
        }

        Ok(())
    }
}

/// Builder for [`RamboConfig`].
#[derive(Clone, Debug, Default)]
pub struct RamboConfigBuilder {
    config: RamboConfig,
}

impl RamboConfigBuilder {
    /// Sets the number of workers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets the seed, which makes runs reproducible.
    pub fn seed(mut self, seed: u128) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Sets how the workers obtain their random numbers.
    pub fn streams(mut self, streams: StreamPolicy) -> Self {
        self.config.streams = streams;
        self
    }

    /// Sets the tolerance of the mass-shell solve.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of Newton steps of the mass-shell solve.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Sets the fraction of samples that may be discarded before a request fails.
    pub fn max_failure_rate(mut self, max_failure_rate: f64) -> Self {
        self.config.max_failure_rate = max_failure_rate;
        self
    }

    /// Sets the wall-time budget of a request.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<RamboConfig, RamboError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
