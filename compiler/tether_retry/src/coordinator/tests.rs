use pretty_assertions::assert_eq;
use tether_handle::{ElementHandle, InternPool};
use tether_model::memory::Workspace;
use tether_model::DeclKind;

use super::*;
use crate::error::RetryToken;

fn indexing_workspace() -> Workspace {
    let ws = Workspace::with_files([("p/A.java", "package p;\nclass A {}")]);
    ws.monitor().begin();
    ws
}

#[test]
fn test_run_once_passes_incomplete_values_through() {
    let ws = indexing_workspace();
    let ctx = ws.open().unwrap_or_else(|err| panic!("{err}"));
    let pool = InternPool::new();
    let missing = ElementHandle::for_type(&pool, DeclKind::Class, "p.B")
        .unwrap_or_else(|err| panic!("{err}"));

    let result: Result<_, RetryError<()>> = run_once(&ctx, |scope| {
        assert!(!scope.is_retry_eligible());
        Ok(scope.check_declaration(&missing)?)
    });
    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_run_once_reports_escaped_token() {
    let ws = indexing_workspace();
    let ctx = ws.open().unwrap_or_else(|err| panic!("{err}"));
    let token = RetryToken::new(None, 1);

    let result: Result<(), RetryError<()>> = run_once(&ctx, |_| Err(Abort::Retry(token.clone())));
    match result {
        Err(RetryError::Escaped(escaped)) => assert_eq!(escaped, token),
        other => panic!("expected an escaped token, got {other:?}"),
    }
}

#[test]
fn test_run_once_reports_task_failure() {
    let ws = indexing_workspace();
    let ctx = ws.open().unwrap_or_else(|err| panic!("{err}"));

    let result: Result<(), _> = run_once(&ctx, |_| Err(Abort::Failed("broken")));
    assert!(matches!(result, Err(RetryError::Task("broken"))));
}

#[test]
fn test_shared_workspace_is_a_source() {
    let ws = Arc::new(Workspace::with_files([("p/A.java", "package p;\nclass A {}")]));
    let coordinator = RetryCoordinator::new(Arc::clone(&ws));
    assert!(coordinator.source().open().is_ok());
    assert_eq!(coordinator.config(), RetryConfig::default());

    let limited = RetryConfig::default().with_max_attempts(2);
    assert_eq!(limited.max_attempts, Some(2));
}
