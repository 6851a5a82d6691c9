//! Completion slot shared by a coordinator and its caller.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::RetryError;

/// Where a retryable task is in its lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RetryState {
    /// Not started yet.
    Idle,
    /// An attempt is executing.
    Running,
    /// The last attempt aborted; the task waits for the index to finish.
    AbortedRetryable,
    /// A result, success or failure, has been delivered.
    Completed,
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetryState::Idle => "idle",
            RetryState::Running => "running",
            RetryState::AbortedRetryable => "aborted (retryable)",
            RetryState::Completed => "completed",
        })
    }
}

struct Slot<T, E> {
    state: RetryState,
    attempts: u32,
    result: Option<Result<T, RetryError<E>>>,
}

struct Shared<T, E> {
    slot: Mutex<Slot<T, E>>,
    done: Condvar,
}

/// Caller's side of a retryable task.
///
/// The result can be taken once. After that, `try_take` and `wait_timeout`
/// see `None` and `wait` returns [`RetryError::Taken`].
pub struct RetryFuture<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> RetryFuture<T, E> {
    /// A future and the completion that fills it.
    pub(crate) fn pair() -> (Self, Completion<T, E>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                state: RetryState::Idle,
                attempts: 0,
                result: None,
            }),
            done: Condvar::new(),
        });
        let completion = Completion {
            shared: Arc::clone(&shared),
            delivered: false,
        };
        (RetryFuture { shared }, completion)
    }

    /// Block until the task completes.
    pub fn wait(self) -> Result<T, RetryError<E>> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = slot.result.take() {
                return result;
            }
            if slot.state == RetryState::Completed {
                return Err(RetryError::Taken);
            }
            self.shared.done.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, RetryError<E>>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(result) = slot.result.take() {
                return Some(result);
            }
            if slot.state == RetryState::Completed {
                return None;
            }
            if self.shared.done.wait_until(&mut slot, deadline).timed_out() {
                return slot.result.take();
            }
        }
    }

    /// The result, if the task has completed.
    pub fn try_take(&self) -> Option<Result<T, RetryError<E>>> {
        self.shared.slot.lock().result.take()
    }

    pub fn state(&self) -> RetryState {
        self.shared.slot.lock().state
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.shared.slot.lock().attempts
    }

    pub fn is_completed(&self) -> bool {
        self.state() == RetryState::Completed
    }
}

impl<T, E> fmt::Debug for RetryFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("RetryFuture")
            .field("state", &slot.state)
            .field("attempts", &slot.attempts)
            .finish_non_exhaustive()
    }
}

/// Coordinator's side of a retryable task. Travels with the task into each
/// re-registration; dropping it undelivered completes the future with
/// [`RetryError::Abandoned`].
pub(crate) struct Completion<T, E> {
    shared: Arc<Shared<T, E>>,
    delivered: bool,
}

impl<T, E> Completion<T, E> {
    /// Record the start of an attempt and return its number.
    pub(crate) fn begin_attempt(&self) -> u32 {
        let mut slot = self.shared.slot.lock();
        slot.state = RetryState::Running;
        slot.attempts += 1;
        slot.attempts
    }

    pub(crate) fn mark_aborted(&self) {
        self.shared.slot.lock().state = RetryState::AbortedRetryable;
    }

    pub(crate) fn complete(mut self, result: Result<T, RetryError<E>>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: Result<T, RetryError<E>>) {
        {
            let mut slot = self.shared.slot.lock();
            slot.state = RetryState::Completed;
            slot.result = Some(result);
        }
        self.delivered = true;
        self.shared.done.notify_all();
    }
}

impl<T, E> Drop for Completion<T, E> {
    fn drop(&mut self) {
        if !self.delivered {
            tracing::warn!("retryable task dropped before completing");
            self.deliver(Err(RetryError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests;
