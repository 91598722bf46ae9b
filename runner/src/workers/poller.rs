//! Generic bounded polling loop
//!
//! A loop ticks at a fixed interval. Each tick first checks the hard
//! timeout, then launches a probe without waiting for earlier probes to
//! finish. Probe results are classified one at a time as they complete.
//! The first terminal verdict (or the timeout) settles the outcome and
//! stops the loop; probes still in flight are dropped.

use std::future::Future;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::RunnerError;
use crate::workers::outcome::Outcome;

/// Poll loop options
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Name used in logs and timeout errors
    pub operation: String,

    /// Time between ticks
    pub interval: Duration,

    /// Hard deadline measured from the start of the loop
    pub timeout: Duration,
}

impl PollOptions {
    /// Reject options the loop cannot run with
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.interval.is_zero() {
            return Err(RunnerError::ConfigError(format!("{} interval must be non-zero", self.operation)));
        }
        if self.timeout.is_zero() {
            return Err(RunnerError::ConfigError(format!("{} timeout must be non-zero", self.operation)));
        }
        Ok(())
    }
}

/// Classification of one probe result
#[derive(Debug)]
pub enum Verdict<T> {
    Pending,
    Success(T),
    Failure(RunnerError),
}

/// Turns probe results into verdicts. Owns any per-loop counters.
pub trait Classifier<R>: Send {
    type Output: Send;

    fn classify(&mut self, observation: Result<R, RunnerError>) -> Verdict<Self::Output>;
}

/// Handle to a running poll loop
pub struct PollHandle<T> {
    operation: String,
    receiver: Option<oneshot::Receiver<Result<T, RunnerError>>>,
    task: JoinHandle<()>,
}

impl<T> PollHandle<T> {
    /// Wait for the loop to settle
    pub async fn outcome(&mut self) -> Result<T, RunnerError> {
        let receiver = self.receiver.as_mut().ok_or_else(|| {
            RunnerError::Internal(format!("{} outcome was already taken", self.operation))
        })?;
        let result = receiver.await;
        self.receiver = None;
        match result {
            Ok(result) => result,
            Err(_) => Err(RunnerError::Cancelled(format!("{} was cancelled", self.operation))),
        }
    }

    /// Stop the loop. A pending `outcome` resolves to `Cancelled`.
    pub fn cancel(&self) {
        self.task.abort();
    }

}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a poll loop on the current runtime
pub fn spawn<R, P, Fut, C>(options: PollOptions, probe: P, mut classifier: C) -> PollHandle<C::Output>
where
    R: Send + 'static,
    P: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, RunnerError>> + Send + 'static,
    C: Classifier<R> + 'static,
    C::Output: 'static,
{
    let (mut outcome, receiver) = Outcome::channel();
    let operation = options.operation.clone();

    let task = tokio::spawn(async move {
        if let Err(err) = options.validate() {
            warn!("{} not started: {}", options.operation, err);
            outcome.fail(err);
            return;
        }

        let started = Instant::now();
        let mut ticker = time::interval_at(started + options.interval, options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = FuturesUnordered::new();
        let mut ticks: u64 = 0;

        info!("{} started (interval {:?}, timeout {:?})", options.operation, options.interval, options.timeout);

        while !outcome.is_settled() {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    let elapsed = started.elapsed();
                    if elapsed > options.timeout {
                        warn!("{} timed out after {:?} ({} ticks)", options.operation, elapsed, ticks);
                        outcome.fail(RunnerError::Timeout {
                            operation: options.operation.clone(),
                            elapsed,
                        });
                        continue;
                    }
                    debug!("{} tick {} ({} probes in flight)", options.operation, ticks, in_flight.len());
                    in_flight.push(probe());
                }
                Some(observation) = in_flight.next(), if !in_flight.is_empty() => {
                    match classifier.classify(observation) {
                        Verdict::Pending => {}
                        Verdict::Success(value) => {
                            info!("{} succeeded after {:?}", options.operation, started.elapsed());
                            outcome.succeed(value);
                        }
                        Verdict::Failure(err) => {
                            warn!("{} failed after {:?}: {}", options.operation, started.elapsed(), err);
                            outcome.fail(err);
                        }
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            debug!("{} abandoning {} in-flight probes", options.operation, in_flight.len());
        }
    });

    PollHandle {
        operation,
        receiver: Some(receiver),
        task,
    }
}
