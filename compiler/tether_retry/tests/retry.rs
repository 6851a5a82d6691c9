//! End-to-end retry behaviour against the in-memory workspace.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tether_handle::{ElementHandle, InternPool};
use tether_model::memory::{ContextError, Workspace};
use tether_model::{DeclKind, Symbols};
use tether_retry::{Abort, RetryConfig, RetryCoordinator, RetryError, RetryState};

const A: &str = "package p;\nclass A {}";
const B: &str = "package p;\nclass B extends A {}";

struct Fixture {
    ws: Arc<Workspace>,
    coordinator: RetryCoordinator<Arc<Workspace>>,
    missing: ElementHandle,
    runs: Arc<AtomicU32>,
}

fn fixture(config: RetryConfig) -> Fixture {
    tether_retry::init_tracing();
    let ws = Arc::new(Workspace::with_files([("p/A.java", A)]));
    ws.monitor().begin();
    let pool = InternPool::new();
    Fixture {
        coordinator: RetryCoordinator::with_config(Arc::clone(&ws), config),
        missing: ElementHandle::for_type(&pool, DeclKind::Class, "p.B")
            .unwrap_or_else(|err| panic!("bad handle: {err}")),
        runs: Arc::new(AtomicU32::new(0)),
        ws,
    }
}

impl Fixture {
    /// Qualified name of `p.B`, aborting while it is missing.
    fn start(&self) -> tether_retry::RetryFuture<Option<String>, String> {
        let missing = self.missing.clone();
        let runs = Arc::clone(&self.runs);
        self.coordinator.run_retryable(move |scope| {
            runs.fetch_add(1, Ordering::SeqCst);
            let decl = scope.check_declaration(&missing)?;
            Ok(decl.map(|d| scope.context().qualified_name(d).to_string()))
        })
    }

    fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[test]
fn test_aborts_once_then_completes_after_index() {
    let fx = fixture(RetryConfig::default());
    let future = fx.start();

    assert_eq!(fx.runs(), 1);
    assert_eq!(future.state(), RetryState::AbortedRetryable);
    assert!(future.try_take().is_none());
    assert_eq!(fx.ws.monitor().pending(), 1);

    fx.ws.set_file("p/B.java", B);
    assert_eq!(fx.ws.monitor().finish(), 1);

    assert_eq!(fx.runs(), 2);
    assert_eq!(future.attempts(), 2);
    assert_eq!(future.state(), RetryState::Completed);
    assert_eq!(future.wait().ok(), Some(Some("p.B".to_string())));
}

#[test]
fn test_retry_runs_on_the_indexer_thread() {
    let fx = fixture(RetryConfig::default());
    let future = fx.start();
    fx.ws.set_file("p/B.java", B);

    let monitor = Arc::clone(fx.ws.monitor());
    let indexer = thread::spawn(move || monitor.finish());

    let result = future.wait_timeout(Duration::from_secs(10));
    indexer.join().unwrap_or_else(|_| panic!("indexer panicked"));
    assert_eq!(result.and_then(Result::ok), Some(Some("p.B".to_string())));
}

#[test]
fn test_no_abort_when_index_is_idle() {
    let fx = fixture(RetryConfig::default());
    fx.ws.monitor().finish();
    let future = fx.start();

    assert_eq!(fx.runs(), 1);
    assert_eq!(future.state(), RetryState::Completed);
    assert_eq!(future.wait().ok(), Some(None));
}

#[test]
fn test_attempt_limit_reports_escape() {
    let fx = fixture(RetryConfig::default().with_max_attempts(1));
    let future = fx.start();

    assert_eq!(fx.runs(), 1);
    assert_eq!(fx.ws.monitor().pending(), 0);
    match future.wait() {
        Err(RetryError::Escaped(token)) => {
            assert_eq!(token.element(), Some(&fx.missing));
            assert_eq!(token.attempt(), 1);
        }
        other => panic!("expected an escaped token, got {other:?}"),
    }
}

#[test]
fn test_task_failure_is_delivered() {
    let fx = fixture(RetryConfig::default());
    let future = fx
        .coordinator
        .run_retryable(|_| Err::<(), _>(Abort::Failed("no luck".to_string())));

    match future.wait() {
        Err(RetryError::Task(message)) => assert_eq!(message, "no luck"),
        other => panic!("expected a task failure, got {other:?}"),
    }
}

#[test]
fn test_suppressed_checks_do_not_abort() {
    let fx = fixture(RetryConfig::default());
    let missing = fx.missing.clone();
    let future = fx.coordinator.run_retryable(move |scope| {
        let decl = scope.suppressed(|| scope.check_declaration(&missing))?;
        Ok::<_, Abort<()>>(decl.is_none())
    });

    assert_eq!(future.attempts(), 1);
    assert_eq!(future.wait().ok(), Some(true));
}

#[test]
fn test_closed_workspace_fails_the_retry() {
    let fx = fixture(RetryConfig::default());
    let future = fx.start();

    fx.ws.close();
    fx.ws.monitor().finish();
    assert!(matches!(
        future.wait(),
        Err(RetryError::ContextUnavailable(ContextError::Closed))
    ));
}

#[test]
fn test_temporary_coordinator_delivers_retry() {
    tether_retry::init_tracing();
    let ws = Arc::new(Workspace::with_files([("p/A.java", A)]));
    ws.monitor().begin();
    let pool = InternPool::new();
    let missing = ElementHandle::for_type(&pool, DeclKind::Class, "p.B")
        .unwrap_or_else(|err| panic!("bad handle: {err}"));

    let future = RetryCoordinator::new(Arc::clone(&ws)).run_retryable(move |scope| {
        let decl = scope.check_declaration(&missing)?;
        Ok::<_, Abort<()>>(decl.is_some())
    });
    assert_eq!(future.state(), RetryState::AbortedRetryable);

    ws.set_file("p/B.java", B);
    assert_eq!(ws.monitor().finish(), 1);
    assert_eq!(future.wait().ok(), Some(true));
}
