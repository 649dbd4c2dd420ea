//! Error types shared by all phase-space and integration routines.

use thiserror::Error;

/// Everything that can go wrong while generating phase space or integrating over it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RamboError {
    /// The request is inconsistent, for example the centre-of-mass energy lies below the sum of
    /// the final-state masses. Nothing has been sampled when this is returned.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The mass-shell solve for a single phase-space point did not reach its tolerance.
    #[error("mass-shell solve did not converge after {iterations} iterations (residual {residual:e})")]
    NonConvergence {
        /// Number of Newton steps that were performed.
        iterations: usize,
        /// Energy residual of the last iterate.
        residual: f64,
    },

    /// Too many points of a batch had to be discarded because their mass-shell solve failed.
    #[error("{failed} of {calls} phase-space points did not converge")]
    ExcessiveNonConvergence {
        /// Number of discarded points.
        failed: usize,
        /// Number of requested points.
        calls: usize,
    },

    /// Too many samples were rejected because the matrix element was negative or not finite.
    #[error("matrix element returned an invalid value for {invalid} of {calls} samples")]
    MatrixElementFailure {
        /// Number of rejected samples.
        invalid: usize,
        /// Number of requested samples.
        calls: usize,
    },

    /// Not enough valid samples remained to estimate a mean and its error.
    #[error("only {valid} of {calls} samples are usable")]
    InsufficientSamples {
        /// Number of usable samples.
        valid: usize,
        /// Number of requested samples.
        calls: usize,
    },

    /// A worker thread terminated abnormally.
    #[error("worker {worker} terminated abnormally")]
    WorkerFailure {
        /// Index of the failed worker.
        worker: usize,
    },

    /// The deadline of the request passed before all workers finished.
    #[error("deadline exceeded")]
    Timeout,

    /// The request was abandoned because a sibling worker failed.
    #[error("cancelled")]
    Cancelled,
}

impl RamboError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RamboError::invalid("E_cm = 1 is below threshold 2");
        assert_eq!(
            err.to_string(),
            "invalid configuration: E_cm = 1 is below threshold 2"
        );

        let err = RamboError::MatrixElementFailure {
            invalid: 12,
            calls: 1000,
        };
        assert!(err.to_string().contains("12 of 1000"));
    }
}
