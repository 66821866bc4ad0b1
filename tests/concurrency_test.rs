//! Concurrent admission tests
//!
//! Many callers race for the last slots of one event; the ledger must never
//! admit more than the limit and the counter must match what was stored.

mod helpers;

use assert_matches::assert_matches;
use chrono::Duration;
use event_admission::models::RegistrationStatus;
use event_admission::AdmissionError;
use futures::future::join_all;

use helpers::*;

const CAPACITY: i32 = 3;
const CALLERS: i64 = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_never_oversell() {
    let ctx = TestContext::new().with_event(create_limited_event(1, CAPACITY));

    let attempts = (0..CALLERS).map(|user_id| {
        let coordinator = ctx.coordinator.clone();
        tokio::spawn(async move { coordinator.register(1, user_id).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let confirmed = results
        .iter()
        .filter(|result| matches!(result, Ok(r) if r.status == RegistrationStatus::Confirmed))
        .count();
    let waitlisted = results
        .iter()
        .filter(|result| matches!(result, Ok(r) if r.status == RegistrationStatus::Waitlisted))
        .count();

    assert_eq!(confirmed, CAPACITY as usize);
    assert_eq!(waitlisted, (CALLERS - CAPACITY as i64) as usize);
    assert_eq!(ctx.coordinator.current_attendees(1).await.unwrap(), CAPACITY as u32);

    let stored = ctx.store.snapshot(1);
    let stored_confirmed = stored
        .registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Confirmed)
        .count();
    assert_eq!(stored_confirmed, CAPACITY as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_walk_ins_never_exceed_capacity() {
    let ctx = TestContext::new().with_event(create_walk_in_event(2, Some(CAPACITY)));
    ctx.set_time(event_start() + Duration::minutes(10));

    let attempts = (0..CALLERS).map(|user_id| {
        let coordinator = ctx.coordinator.clone();
        tokio::spawn(async move { coordinator.mark_attendance(2, user_id).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(admitted, CAPACITY as usize);
    for rejected in results.iter().filter(|result| result.is_err()) {
        assert_matches!(rejected, Err(AdmissionError::CapacityExceeded));
    }

    assert_eq!(ctx.coordinator.current_attendees(2).await.unwrap(), CAPACITY as u32);
    assert_eq!(ctx.store.snapshot(2).attendance.len(), CAPACITY as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_racing_registers_once() {
    let ctx = TestContext::new().with_event(create_limited_event(3, 10));

    let attempts = (0..8).map(|_| {
        let coordinator = ctx.coordinator.clone();
        tokio::spawn(async move { coordinator.register(3, 42).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for rejected in results.iter().filter(|result| result.is_err()) {
        assert_matches!(rejected, Err(AdmissionError::AlreadyRegistered));
    }
    assert_eq!(ctx.coordinator.current_attendees(3).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_do_not_share_capacity() {
    let ctx = TestContext::new()
        .with_event(create_limited_event(10, 1))
        .with_event(create_limited_event(11, 1));

    let attempts = (0..6).map(|user_id| {
        let coordinator = ctx.coordinator.clone();
        let event_id = 10 + user_id % 2;
        tokio::spawn(async move { coordinator.register(event_id, user_id).await })
    });
    join_all(attempts).await;

    assert_eq!(ctx.coordinator.current_attendees(10).await.unwrap(), 1);
    assert_eq!(ctx.coordinator.current_attendees(11).await.unwrap(), 1);
}
