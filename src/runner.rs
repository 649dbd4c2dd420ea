//! Distributes a request over worker threads and merges their partial results.
//!
//! Every worker receives its own random number generator and a share of the requested calls.
//! Workers never communicate, except through an abort flag that is raised when one of them fails,
//! so that the others stop at their next point. Partial results are combined with `Add` in the
//! order of the workers.

use crate::config::{RamboConfig, StreamPolicy};
use crate::core::{calls_per_core, compute_calls_for_core};
use crate::error::RamboError;
use rand::{Rng, RngCore};
use rand_pcg::Pcg64;
use std::ops::Add;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crossbeam as cb;

/// Streams handed out to unseeded requests. Never reused during the lifetime of the process.
static NEXT_STREAM: AtomicU64 = AtomicU64::new(0);

/// The random number generators of a single request.
#[derive(Clone, Debug)]
pub(crate) struct WorkerStreams {
    seed: u128,
    policy: StreamPolicy,
    streams: Vec<u128>,
}

impl WorkerStreams {
    pub(crate) fn new(config: &RamboConfig, workers: usize) -> Self {
        let policy = config.streams();
        let needed = match policy {
            StreamPolicy::Independent => workers,
            StreamPolicy::Partitioned => 1,
        };

        let (seed, streams) = match config.seed() {
            Some(seed) => (seed, (0..needed).map(|s| s as u128).collect()),
            None => {
                let first = NEXT_STREAM.fetch_add(needed as u64, Ordering::Relaxed);
                (
                    rand::thread_rng().gen(),
                    (0..needed).map(|s| u128::from(first) + s as u128).collect(),
                )
            }
        };

        Self {
            seed,
            policy,
            streams,
        }
    }

    /// Returns the generator of `worker`, positioned `skip` draws into the stream for the
    /// partitioned policy.
    pub(crate) fn rng(&self, worker: usize, skip: usize) -> Pcg64 {
        match self.policy {
            StreamPolicy::Independent => Pcg64::new(self.seed, self.streams[worker]),
            StreamPolicy::Partitioned => {
                let mut rng = Pcg64::new(self.seed, self.streams[0]);

                // every uniform number, single or double precision, advances the generator by
                // exactly one step
                for _ in 0..skip {
                    rng.next_u64();
                }

                rng
            }
        }
    }
}

/// Shared state of the workers of a single request.
#[derive(Debug)]
pub(crate) struct Dispatch {
    abort: AtomicBool,
    deadline: Option<Instant>,
}

impl Dispatch {
    fn new(config: &RamboConfig) -> Self {
        Self {
            abort: AtomicBool::new(false),
            deadline: config.deadline().map(|d| Instant::now() + d),
        }
    }

    /// Called by workers before every point. Fails if a sibling gave up or the deadline passed.
    pub(crate) fn checkpoint(&self) -> Result<(), RamboError> {
        if self.abort.load(Ordering::Relaxed) {
            return Err(RamboError::Cancelled);
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.abort();
                return Err(RamboError::Timeout);
            }
        }

        Ok(())
    }

    fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}

/// The part of a request a single worker is responsible for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Share {
    /// Zero-based index of the worker.
    pub worker: usize,
    /// Number of points this worker generates.
    pub calls: usize,
}

/// Runs `task` on `min(workers, calls)` workers and adds up their results.
///
/// `draws_per_call` is the number of uniform random numbers one call consumes; it determines how
/// far workers skip ahead with [`StreamPolicy::Partitioned`].
pub(crate) fn run<A, F>(
    config: &RamboConfig,
    calls: usize,
    draws_per_call: usize,
    task: F,
) -> Result<A, RamboError>
where
    A: Add<Output = A> + Send,
    F: Fn(Share, Pcg64, &Dispatch) -> Result<A, RamboError> + Sync,
{
    config.validate()?;

    if calls == 0 {
        return Err(RamboError::invalid("at least one sample must be requested"));
    }

    let n_cores = config.workers().min(calls);
    let calls_per_core = calls_per_core(n_cores, calls);
    let streams = WorkerStreams::new(config, n_cores);
    let dispatch = Dispatch::new(config);

    debug!(workers = n_cores, calls, "dispatching workers");

    let collect_results = cb::thread::scope(|s| {
        let mut handles = Vec::with_capacity(n_cores);

        for core in 0..n_cores {
            let share = Share {
                worker: core,
                calls: compute_calls_for_core(core, n_cores, calls),
            };
            let rng = streams.rng(core, core * calls_per_core * draws_per_call);
            let task = &task;
            let dispatch = &dispatch;

            handles.push(s.spawn(move |_| {
                let result = panic::catch_unwind(AssertUnwindSafe(|| task(share, rng, dispatch)))
                    .unwrap_or(Err(RamboError::WorkerFailure { worker: core }));

                if result.is_err() {
                    dispatch.abort();
                }

                result
            }));
        }

        handles
            .into_iter()
            .enumerate()
            .map(|(core, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(RamboError::WorkerFailure { worker: core }))
            })
            .collect::<Vec<_>>()
    })
    .map_err(|_| RamboError::WorkerFailure { worker: 0 })?;

    merge(collect_results)
}

/// Adds up the partial results in worker order. If any worker failed, the first error that is not
/// a mere cancellation is returned instead.
fn merge<A: Add<Output = A>>(results: Vec<Result<A, RamboError>>) -> Result<A, RamboError> {
    let mut accumulate: Option<A> = None;
    let mut failure: Option<RamboError> = None;

    for result in results {
        match result {
            Ok(partial) => {
                accumulate = Some(match accumulate {
                    Some(acc) => acc + partial,
                    None => partial,
                });
            }
            Err(err) => {
                if failure.is_none() || failure == Some(RamboError::Cancelled) {
                    failure = Some(err);
                }
            }
        }
    }

    if let Some(err) = failure {
        warn!(%err, "request failed, discarding all partial results");
        return Err(err);
    }

    debug!("merged partial results");

    accumulate.ok_or_else(|| RamboError::invalid("no worker was dispatched"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::time::Duration;

    fn assert_ne_rng<R>(lhs: &R, rhs: &R)
    where
        R: Rng + Serialize,
    {
        assert_ne!(
            serde_json::to_string(lhs).unwrap(),
            serde_json::to_string(rhs).unwrap()
        );
    }

    /// Records the shares in worker order.
    #[derive(Debug, PartialEq)]
    struct Shares(Vec<usize>);

    impl Add for Shares {
        type Output = Self;

        fn add(mut self, other: Self) -> Self {
            self.0.extend(other.0);
            self
        }
    }

    fn config(workers: usize) -> RamboConfig {
        RamboConfig::builder()
            .workers(workers)
            .seed(0xcafef00dd15ea5e5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_shares_cover_all_calls() {
        let total = run(&config(3), 17, 1, |share, _, _| Ok(Shares(vec![share.calls]))).unwrap();

        assert_eq!(total, Shares(vec![6, 6, 5]));
    }

    #[test]
    fn test_workers_are_clamped_to_calls() {
        let total = run(&config(8), 3, 1, |share, _, _| Ok(Shares(vec![share.worker]))).unwrap();

        assert_eq!(total, Shares(vec![0, 1, 2]));
    }

    #[test]
    fn test_independent_streams_differ() {
        let streams = WorkerStreams::new(&config(4), 4);

        for (a, b) in vec![(0, 1), (1, 2), (0, 3)] {
            assert_ne_rng(&streams.rng(a, 0), &streams.rng(b, 0));
        }

        // seeded streams are reproducible
        let again = WorkerStreams::new(&config(4), 4);
        assert_eq!(
            streams.rng(2, 0).next_u64(),
            again.rng(2, 0).next_u64()
        );
    }

    #[test]
    fn test_unseeded_streams_are_never_reused() {
        let config = RamboConfig::builder().workers(2).build().unwrap();
        let first = WorkerStreams::new(&config, 2);
        let second = WorkerStreams::new(&config, 2);

        assert!(first.streams.iter().all(|s| !second.streams.contains(s)));
        assert_ne!(first.streams[0], first.streams[1]);
    }

    #[test]
    fn test_partitioned_streams_skip_ahead() {
        let config = RamboConfig::builder()
            .seed(7)
            .streams(StreamPolicy::Partitioned)
            .build()
            .unwrap();
        let streams = WorkerStreams::new(&config, 2);

        let mut sequential = streams.rng(0, 0);
        for _ in 0..10 {
            sequential.next_u64();
        }

        assert_eq!(sequential.next_u64(), streams.rng(1, 10).next_u64());
    }

    #[test]
    fn test_failing_worker_fails_request() {
        let result = run(&config(4), 100, 1, |share, _, _| {
            if share.worker == 2 {
                Err(RamboError::NonConvergence {
                    iterations: 50,
                    residual: 1.0,
                })
            } else {
                Ok(Shares(vec![share.calls]))
            }
        });

        assert!(matches!(result, Err(RamboError::NonConvergence { .. })));
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let result: Result<Shares, _> = run(&config(2), 10, 1, |share, _, _| {
            if share.worker == 1 {
                panic!("matrix element blew up");
            }
            Ok(Shares(vec![share.calls]))
        });

        assert_eq!(result, Err(RamboError::WorkerFailure { worker: 1 }));
    }

    #[test]
    fn test_deadline() {
        let config = RamboConfig::builder()
            .workers(2)
            .deadline(Duration::from_millis(0))
            .build()
            .unwrap();

        let result: Result<Shares, _> = run(&config, 10, 1, |share, _, dispatch| {
            for _ in 0..share.calls {
                dispatch.checkpoint()?;
            }
            Ok(Shares(vec![share.calls]))
        });

        assert_eq!(result, Err(RamboError::Timeout));
    }

    #[test]
    fn test_merge_prefers_real_errors() {
        let results: Vec<Result<Shares, RamboError>> = vec![
            Ok(Shares(vec![1])),
            Err(RamboError::Cancelled),
            Err(RamboError::Timeout),
        ];

        assert_eq!(merge(results), Err(RamboError::Timeout));
    }

    #[test]
    fn test_zero_calls() {
        let result: Result<Shares, _> = run(&config(2), 0, 1, |_, _, _| Ok(Shares(vec![])));

        assert!(matches!(result, Err(RamboError::InvalidConfiguration(_))));
    }
}
