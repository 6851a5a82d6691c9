//! Outcomes of a retryable task.

use std::fmt;

use tether_handle::ElementHandle;
use tether_model::memory::ContextError;
use thiserror::Error;

/// Signal that a task saw incomplete data while the index was still
/// building and should run again once it finishes.
///
/// Only a [`RetryScope`](crate::RetryScope) check mints one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RetryToken {
    element: Option<ElementHandle>,
    attempt: u32,
}

impl RetryToken {
    pub(crate) fn new(element: Option<ElementHandle>, attempt: u32) -> Self {
        RetryToken { element, attempt }
    }

    /// Declaration whose check failed, when the check was for one.
    pub fn element(&self) -> Option<&ElementHandle> {
        self.element.as_ref()
    }

    /// Attempt that was aborted, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl fmt::Display for RetryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(f, "incomplete `{element}` on attempt {}", self.attempt),
            None => write!(f, "incomplete value on attempt {}", self.attempt),
        }
    }
}

/// Early exit from a task body.
#[derive(Debug)]
pub enum Abort<E> {
    /// Discard this attempt and run again after indexing.
    Retry(RetryToken),
    /// The task failed; the failure is delivered to the caller.
    Failed(E),
}

impl<E> From<RetryToken> for Abort<E> {
    fn from(token: RetryToken) -> Self {
        Abort::Retry(token)
    }
}

/// Failure delivered through a [`RetryFuture`](crate::RetryFuture).
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("task failed: {0}")]
    Task(E),

    /// A retry signal reached a boundary that does not retry.
    #[error("retry signal escaped: {0}")]
    Escaped(RetryToken),

    #[error("could not open a compilation context: {0}")]
    ContextUnavailable(#[source] ContextError),

    /// The completion callback was dropped without running.
    #[error("task was abandoned before it completed")]
    Abandoned,

    /// The result was already taken through another call on the future.
    #[error("result was already taken")]
    Taken,
}
