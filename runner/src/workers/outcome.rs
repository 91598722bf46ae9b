//! One-shot outcome of a poll loop

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::RunnerError;

/// Poll state. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Succeeded,
    Failed,
}

/// Settles a poll loop exactly once. Later transitions are ignored.
#[derive(Debug)]
pub struct Outcome<T> {
    state: PollState,
    sender: Option<oneshot::Sender<Result<T, RunnerError>>>,
}

impl<T> Outcome<T> {
    /// Create an outcome and the receiver its result is delivered to
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, RunnerError>>) {
        let (sender, receiver) = oneshot::channel();
        let outcome = Self {
            state: PollState::Pending,
            sender: Some(sender),
        };
        (outcome, receiver)
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state != PollState::Pending
    }

    /// Returns false if the outcome was already settled
    pub fn succeed(&mut self, value: T) -> bool {
        self.settle(PollState::Succeeded, Ok(value))
    }

    /// Returns false if the outcome was already settled
    pub fn fail(&mut self, err: RunnerError) -> bool {
        self.settle(PollState::Failed, Err(err))
    }

    fn settle(&mut self, state: PollState, result: Result<T, RunnerError>) -> bool {
        if self.is_settled() {
            debug!("Ignoring {:?} transition, already {:?}", state, self.state);
            return false;
        }
        self.state = state;
        if let Some(sender) = self.sender.take() {
            // Receiver may be gone if the handle was dropped
            let _ = sender.send(result);
        }
        true
    }
}
