//! Implementation of different callback functions.
use crate::core::Real;
use crate::histograms::EnergyHistogram;
use crate::integrators::IntegrationResult;
use std::fmt::Display;

/// Trait for implementing callbacks that report finished computations of a [`Rambo`] engine.
///
/// [`Rambo`]: crate::engine::Rambo
pub trait Callback<T> {
    /// This method is called after each successfully finished integration of `observable` and may
    /// print information about it.
    fn print(&self, observable: &str, result: &IntegrationResult<T>);

    /// Called after a histogram has been filled. Does nothing unless overridden.
    fn print_histogram(&self, _histogram: &EnergyHistogram<T>) {}
}

/// A callback function that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct SinkCallback {}

impl<T> Callback<T> for SinkCallback {
    fn print(&self, _: &str, _: &IntegrationResult<T>) {}
}

/// A callback function that prints the result of each integration
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleCallback {}

impl<T: Display + Real> Callback<T> for SimpleCallback {
    fn print(&self, observable: &str, result: &IntegrationResult<T>) {
        println!("{} finished.", observable);
        println!(
            "N={} E={} \u{b1} {}",
            result.valid_calls(),
            result.value(),
            result.error()
        );

        if result.valid_calls() < result.calls() {
            println!(
                "discarded {} of {} samples",
                result.calls() - result.valid_calls(),
                result.calls()
            );
        }
    }

    fn print_histogram(&self, histogram: &EnergyHistogram<T>) {
        println!(
            "{}: {} bins, N={}",
            histogram.name(),
            histogram.bins().len(),
            histogram.calls() - histogram.rejected_calls()
        );

        for bin in histogram.bins() {
            println!("{} {} \u{b1} {}", bin.center, bin.value, bin.error);
        }
    }
}
