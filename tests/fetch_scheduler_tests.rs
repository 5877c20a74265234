use std::time::Duration;

use chart_domains::api::{FetchReason, FetchScheduler};
use chart_domains::core::{Domain, ItemId};
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_millis(250);

fn scheduler() -> FetchScheduler {
    FetchScheduler::new(WINDOW, WINDOW)
}

#[test]
fn first_call_fires_on_leading_edge() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let now = Instant::now();

    assert_eq!(
        scheduler.call(&id, FetchReason::Mounted, now),
        Some(FetchReason::Mounted)
    );
    assert!(!scheduler.has_pending(&id));
    assert_eq!(scheduler.next_deadline(), None);
}

#[test]
fn calls_inside_window_coalesce_with_latest_reason() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();

    scheduler.call(&id, FetchReason::Mounted, t0);
    assert_eq!(
        scheduler.call(&id, FetchReason::SubdomainChanged, t0 + Duration::from_millis(100)),
        None
    );
    assert_eq!(
        scheduler.call(&id, FetchReason::Reload, t0 + Duration::from_millis(200)),
        None
    );
    assert!(scheduler.has_pending(&id));

    let window_end = t0 + Duration::from_millis(450);
    assert_eq!(scheduler.next_deadline(), Some(window_end));
    assert!(scheduler.take_due(t0 + Duration::from_millis(300)).is_empty());
    assert_eq!(
        scheduler.take_due(window_end),
        vec![(id.clone(), FetchReason::Reload)]
    );
    assert!(!scheduler.has_pending(&id));
    assert!(scheduler.take_due(window_end + WINDOW).is_empty());
}

#[test]
fn call_after_window_fires_again() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();

    scheduler.call(&id, FetchReason::Mounted, t0);
    assert_eq!(
        scheduler.call(&id, FetchReason::SubdomainChanged, t0 + WINDOW),
        Some(FetchReason::SubdomainChanged)
    );
}

#[test]
fn items_are_debounced_independently() {
    let mut scheduler = scheduler();
    let t0 = Instant::now();

    assert!(scheduler.call(&ItemId::from("a"), FetchReason::Mounted, t0).is_some());
    assert!(scheduler.call(&ItemId::from("b"), FetchReason::Mounted, t0).is_some());
}

#[test]
fn throttle_refuses_fetches_started_too_recently() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();
    let window = Domain::new(0.0, 100.0);

    assert!(scheduler.try_begin(&id, FetchReason::SubdomainChanged, window, t0));
    assert!(!scheduler.try_begin(
        &id,
        FetchReason::SubdomainChanged,
        Domain::new(10.0, 110.0),
        t0 + Duration::from_millis(100)
    ));
    assert_eq!(
        scheduler.request(&id).map(|request| request.time_subdomain),
        Some(window)
    );

    let later = t0 + WINDOW;
    assert!(scheduler.try_begin(
        &id,
        FetchReason::SubdomainChanged,
        Domain::new(10.0, 110.0),
        later
    ));
    let record = scheduler.request(&id).expect("request record");
    assert_eq!(record.started_at, later);
    assert_eq!(record.time_subdomain.bounds(), (10.0, 110.0));
}

#[test]
fn forgetting_a_request_lifts_the_throttle() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();

    assert!(scheduler.try_begin(&id, FetchReason::SubdomainChanged, Domain::new(0.0, 1.0), t0));
    scheduler.forget_request(&id);
    assert_eq!(scheduler.request(&id), None);
    assert!(scheduler.try_begin(&id, FetchReason::SubdomainChanged, Domain::new(0.0, 1.0), t0));
}

#[test]
fn retain_drops_pending_calls_of_removed_items() {
    let mut scheduler = scheduler();
    let id = ItemId::from("gone");
    let t0 = Instant::now();

    scheduler.call(&id, FetchReason::Mounted, t0);
    scheduler.call(&id, FetchReason::SubdomainChanged, t0);
    scheduler.retain(|candidate| candidate.as_str() != "gone");

    assert!(!scheduler.has_pending(&id));
    assert!(scheduler.take_due(t0 + WINDOW).is_empty());
}

#[test]
fn throttled_call_becomes_trailing_call_when_throttle_lifts() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();

    assert!(scheduler.try_begin(&id, FetchReason::Mounted, Domain::new(0.0, 1.0), t0));
    let refused_at = t0 + Duration::from_millis(100);
    assert!(!scheduler.try_begin(
        &id,
        FetchReason::SubdomainChanged,
        Domain::new(1.0, 2.0),
        refused_at
    ));

    assert!(scheduler.has_pending(&id));
    assert_eq!(scheduler.next_deadline(), Some(t0 + WINDOW));
    assert!(scheduler.take_due(refused_at).is_empty());
    assert_eq!(
        scheduler.take_due(t0 + WINDOW),
        vec![(id.clone(), FetchReason::SubdomainChanged)]
    );
    assert!(scheduler.try_begin(
        &id,
        FetchReason::SubdomainChanged,
        Domain::new(1.0, 2.0),
        t0 + WINDOW
    ));
}

#[test]
fn throttled_call_keeps_a_later_debounce_window() {
    let mut scheduler = scheduler();
    let id = ItemId::from("s");
    let t0 = Instant::now();

    assert!(scheduler.try_begin(&id, FetchReason::Mounted, Domain::new(0.0, 1.0), t0));
    let now = t0 + Duration::from_millis(200);
    assert_eq!(
        scheduler.call(&id, FetchReason::SubdomainChanged, now),
        Some(FetchReason::SubdomainChanged)
    );
    assert!(!scheduler.try_begin(&id, FetchReason::SubdomainChanged, Domain::new(1.0, 2.0), now));

    assert_eq!(scheduler.next_deadline(), Some(now + WINDOW));
}
