//! The view a task gets of one attempt.

use std::cell::Cell;

use tether_handle::{ElementHandle, TypeHandle};
use tether_model::{CompilationContext, DeclId, DeclKind, DocId, NodeId, TypeId, TypeKind};

use crate::error::RetryToken;

/// Value whose completeness a [`RetryScope`] can judge.
pub trait Usable {
    /// Whether the value can be used as is.
    fn is_usable<C: CompilationContext + ?Sized>(&self, ctx: &C) -> bool;
}

impl<T: Usable> Usable for Option<T> {
    fn is_usable<C: CompilationContext + ?Sized>(&self, ctx: &C) -> bool {
        self.as_ref().is_some_and(|value| value.is_usable(ctx))
    }
}

impl Usable for DeclId {
    fn is_usable<C: CompilationContext + ?Sized>(&self, ctx: &C) -> bool {
        ctx.decl_kind(*self) != DeclKind::Other
    }
}

impl Usable for TypeId {
    fn is_usable<C: CompilationContext + ?Sized>(&self, ctx: &C) -> bool {
        ctx.type_kind(*self) != TypeKind::Error
    }
}

impl Usable for NodeId {
    fn is_usable<C: CompilationContext + ?Sized>(&self, _ctx: &C) -> bool {
        true
    }
}

impl Usable for DocId {
    fn is_usable<C: CompilationContext + ?Sized>(&self, _ctx: &C) -> bool {
        true
    }
}

/// One attempt of a task against one context.
///
/// A check passes its value through when the value is usable, when the
/// index is not building, or when retry is off for the scope. Otherwise it
/// returns a [`RetryToken`] for the task to propagate with `?`.
pub struct RetryScope<'ctx, C: ?Sized> {
    ctx: &'ctx C,
    retry: bool,
    suppressed: Cell<u32>,
    attempt: u32,
}

impl<'ctx, C> RetryScope<'ctx, C>
where
    C: CompilationContext + ?Sized,
{
    pub(crate) fn new(ctx: &'ctx C, retry: bool, attempt: u32) -> Self {
        RetryScope {
            ctx,
            retry,
            suppressed: Cell::new(0),
            attempt,
        }
    }

    #[inline]
    pub fn context(&self) -> &'ctx C {
        self.ctx
    }

    /// Attempt number, starting at 1.
    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether a failed check would abort the attempt right now.
    pub fn is_retry_eligible(&self) -> bool {
        self.retry && self.suppressed.get() == 0
    }

    /// Run `f` with retry turned off. Nests.
    pub fn suppressed<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore<'a>(&'a Cell<u32>);

        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get().saturating_sub(1));
            }
        }

        self.suppressed.set(self.suppressed.get() + 1);
        let _restore = Restore(&self.suppressed);
        f()
    }

    /// `value` unchanged, or a retry token when it is incomplete and the
    /// index is still building.
    pub fn check_or_signal_incomplete<V: Usable>(&self, value: V) -> Result<V, RetryToken> {
        if value.is_usable(self.ctx) || !self.should_retry() {
            return Ok(value);
        }
        Err(self.token(None))
    }

    /// Presence check for any optional value.
    pub fn check_value<T>(&self, value: Option<T>) -> Result<Option<T>, RetryToken> {
        if value.is_some() || !self.should_retry() {
            return Ok(value);
        }
        Err(self.token(None))
    }

    /// Resolve `handle`, signalling a retry if it is missing while indexing.
    pub fn check_declaration(&self, handle: &ElementHandle) -> Result<Option<DeclId>, RetryToken> {
        let decl = handle.resolve(self.ctx);
        if decl.is_usable(self.ctx) || !self.should_retry() {
            return Ok(decl);
        }
        Err(self.token(Some(handle.clone())))
    }

    /// Resolve `handle`, signalling a retry if it is missing or still an
    /// error type while indexing.
    pub fn check_type(&self, handle: &TypeHandle) -> Result<Option<TypeId>, RetryToken> {
        let ty = handle.resolve(self.ctx);
        if ty.is_usable(self.ctx) || !self.should_retry() {
            return Ok(ty);
        }
        Err(self.token(handle.element_handle().cloned()))
    }

    fn should_retry(&self) -> bool {
        self.is_retry_eligible() && self.ctx.is_background_index_in_progress()
    }

    fn token(&self, element: Option<ElementHandle>) -> RetryToken {
        tracing::debug!(attempt = self.attempt, "check found incomplete data");
        RetryToken::new(element, self.attempt)
    }
}
