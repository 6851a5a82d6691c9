//! Retry-when-indexed execution of analysis tasks.
//!
//! A task reads the current compilation context through a [`RetryScope`].
//! When a check finds a declaration or type missing while the background
//! index is still building, the task returns a [`RetryToken`] with `?`; the
//! [`RetryCoordinator`] discards the attempt and runs the task again on a
//! fresh context once the index reports it has finished. The caller waits
//! on a [`RetryFuture`].
//!
//! ```text
//! run_retryable ──► attempt ──► Ok / Failed ──► Completed
//!                     │
//!                     └─ Retry ──► AbortedRetryable ──(index finished)──► attempt
//! ```

mod coordinator;
mod error;
mod future;
mod scope;

pub use coordinator::{run_once, ContextSource, RetryConfig, RetryCoordinator};
pub use error::{Abort, RetryError, RetryToken};
pub use future::{RetryFuture, RetryState};
pub use scope::{RetryScope, Usable};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=tether_handle=debug`
/// or `RUST_LOG=tether_retry=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        }
    });
}
