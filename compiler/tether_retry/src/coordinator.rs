//! Run a task now, or abort and run it again once indexing completes.
//!
//! Each attempt opens a fresh context from the [`ContextSource`]; the aborted
//! attempt's context is dropped, so handles are the only state a task can
//! carry across attempts. A task must be free of outside side effects up to
//! the point where it may abort.

use std::sync::Arc;

use tether_model::memory::{ContextError, MemoryContext, Workspace};
use tether_model::{CompilationContext, IndexStatus};

use crate::error::{Abort, RetryError};
use crate::future::{Completion, RetryFuture};
use crate::scope::RetryScope;

/// Opens compilation contexts for attempts.
pub trait ContextSource: Send + Sync + 'static {
    type Context: CompilationContext;

    fn open(&self) -> Result<Self::Context, ContextError>;
}

impl ContextSource for Workspace {
    type Context = MemoryContext;

    fn open(&self) -> Result<MemoryContext, ContextError> {
        Workspace::open(self)
    }
}

impl<S: ContextSource> ContextSource for Arc<S> {
    type Context = S::Context;

    fn open(&self) -> Result<S::Context, ContextError> {
        S::open(self)
    }
}

/// Retry settings.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct RetryConfig {
    /// Attempts allowed before a retry signal is reported as escaped.
    /// `None` retries for as long as the index keeps aborting the task.
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

struct Inner<S> {
    source: S,
    config: RetryConfig,
}

/// Runs tasks with retry-after-indexing.
///
/// A pending retry keeps the coordinator alive until the index reports it
/// has finished, so a temporary coordinator still delivers its results.
pub struct RetryCoordinator<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for RetryCoordinator<S> {
    fn clone(&self) -> Self {
        RetryCoordinator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ContextSource> RetryCoordinator<S> {
    pub fn new(source: S) -> Self {
        RetryCoordinator::with_config(source, RetryConfig::default())
    }

    pub fn with_config(source: S, config: RetryConfig) -> Self {
        RetryCoordinator {
            inner: Arc::new(Inner { source, config }),
        }
    }

    pub fn config(&self) -> RetryConfig {
        self.inner.config
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Start `task`. The first attempt runs on the calling thread; retries
    /// run on whichever thread reports the end of indexing.
    pub fn run_retryable<T, E, F>(&self, task: F) -> RetryFuture<T, E>
    where
        F: FnMut(&RetryScope<'_, S::Context>) -> Result<T, Abort<E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (future, completion) = RetryFuture::pair();
        attempt(&self.inner, task, completion);
        future
    }
}

#[tracing::instrument(level = "debug", skip_all, fields(attempt = tracing::field::Empty))]
fn attempt<S, T, E, F>(inner: &Arc<Inner<S>>, mut task: F, completion: Completion<T, E>)
where
    S: ContextSource,
    F: FnMut(&RetryScope<'_, S::Context>) -> Result<T, Abort<E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let number = completion.begin_attempt();
    tracing::Span::current().record("attempt", number);

    let ctx = match inner.source.open() {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::debug!(%err, "no context for attempt");
            completion.complete(Err(RetryError::ContextUnavailable(err)));
            return;
        }
    };
    let outcome = task(&RetryScope::new(&ctx, true, number));

    match outcome {
        Ok(value) => completion.complete(Ok(value)),
        Err(Abort::Failed(err)) => completion.complete(Err(RetryError::Task(err))),
        Err(Abort::Retry(token)) => {
            if inner.config.max_attempts.is_some_and(|max| number >= max) {
                tracing::error!(%token, "retry limit reached");
                completion.complete(Err(RetryError::Escaped(token)));
                return;
            }
            tracing::warn!(%token, "index incomplete, retrying when it finishes");
            completion.mark_aborted();
            let inner = Arc::clone(inner);
            let registration =
                ctx.run_when_index_finished(Box::new(move || attempt(&inner, task, completion)));
            tracing::debug!(?registration, "retry registered");
        }
    }
}

/// Run `task` once against `ctx` with retry turned off.
///
/// Checks inside the task pass incomplete values through. A retry token the
/// task returns anyway is reported as [`RetryError::Escaped`].
pub fn run_once<C, T, E, F>(ctx: &C, task: F) -> Result<T, RetryError<E>>
where
    C: CompilationContext + ?Sized,
    F: FnOnce(&RetryScope<'_, C>) -> Result<T, Abort<E>>,
{
    match task(&RetryScope::new(ctx, false, 1)) {
        Ok(value) => Ok(value),
        Err(Abort::Failed(err)) => Err(RetryError::Task(err)),
        Err(Abort::Retry(token)) => {
            tracing::error!(%token, "retry signal escaped a non-retrying run");
            Err(RetryError::Escaped(token))
        }
    }
}

#[cfg(test)]
mod tests;
