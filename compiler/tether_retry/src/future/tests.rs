use std::thread;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_lifecycle() {
    let (future, completion) = RetryFuture::<u32, ()>::pair();
    assert_eq!(future.state(), RetryState::Idle);

    assert_eq!(completion.begin_attempt(), 1);
    assert_eq!(future.state(), RetryState::Running);
    completion.mark_aborted();
    assert_eq!(future.state(), RetryState::AbortedRetryable);
    assert_eq!(completion.begin_attempt(), 2);
    assert!(future.try_take().is_none());

    completion.complete(Ok(7));
    assert!(future.is_completed());
    assert_eq!(future.attempts(), 2);
    assert!(matches!(future.wait(), Ok(7)));
}

#[test]
fn test_dropped_completion_abandons() {
    let (future, completion) = RetryFuture::<u32, ()>::pair();
    drop(completion);
    assert!(matches!(future.try_take(), Some(Err(RetryError::Abandoned))));
    assert_eq!(future.state(), RetryState::Completed);
}

#[test]
fn test_wait_across_threads() {
    let (future, completion) = RetryFuture::<String, ()>::pair();
    let worker = thread::spawn(move || {
        completion.begin_attempt();
        completion.complete(Ok("done".to_string()));
    });
    let result = future.wait_timeout(Duration::from_secs(10));
    assert!(matches!(result.as_ref(), Some(Ok(text)) if text == "done"));
    worker.join().unwrap_or_else(|_| panic!("worker panicked"));
}

#[test]
fn test_wait_timeout_expires() {
    let (future, _completion) = RetryFuture::<u32, ()>::pair();
    assert!(future.wait_timeout(Duration::from_millis(10)).is_none());
    assert_eq!(future.state(), RetryState::Idle);
}

#[test]
fn test_wait_after_take_returns_promptly() {
    let (future, completion) = RetryFuture::<u32, ()>::pair();
    completion.begin_attempt();
    completion.complete(Ok(3));

    assert!(matches!(future.try_take(), Some(Ok(3))));
    assert!(future.try_take().is_none());
    assert!(future.wait_timeout(Duration::from_secs(60)).is_none());
    assert!(matches!(future.wait(), Err(RetryError::Taken)));
}
