use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chart_domains::ChartError;
use chart_domains::api::{
    ChartEngine, EngineConfig, EngineEvent, FetchReason, LoaderRequest, LoaderResult,
    OverrideBuilder, SeriesSpec,
};
use chart_domains::core::{Axis, AxisPatch, DataPoint, Domain, DomainPriority, ItemId};
use chart_domains::error::LoaderError;
use tokio::time::advance;

type Requests = Rc<RefCell<Vec<LoaderRequest<DataPoint>>>>;

type LoadOutcome = std::future::Ready<Result<LoaderResult<DataPoint>, LoaderError>>;

/// Loader returning three points inside the requested window.
fn recording_loader(
    requests: &Requests,
) -> impl Fn(LoaderRequest<DataPoint>) -> LoadOutcome + 'static {
    let requests = Rc::clone(requests);
    move |request: LoaderRequest<DataPoint>| {
        let start = request.time_subdomain.min;
        requests.borrow_mut().push(request);
        std::future::ready(Ok(LoaderResult::new(vec![
            DataPoint::new(start, 10.0),
            DataPoint::new(start + 100.0, 30.0),
            DataPoint::new(start + 200.0, 20.0),
        ])))
    }
}

fn engine_with_loader(requests: &Requests) -> ChartEngine {
    let mut engine =
        ChartEngine::new(EngineConfig::new(0.0, 10_000.0).with_points_per_series(500))
            .expect("engine init");
    engine
        .set_series(vec![SeriesSpec::new("s").with_loader(recording_loader(requests))])
        .expect("set series");
    engine
}

fn reasons(requests: &Requests) -> Vec<FetchReason> {
    requests.borrow().iter().map(|request| request.reason).collect()
}

fn time_pan(min: f64, max: f64) -> chart_domains::api::DomainPatch {
    chart_domains::api::DomainPatch::from([(
        ItemId::from("s"),
        AxisPatch::new().with(Axis::Time, Domain::user_generated(min, max)),
    )])
}

#[tokio::test(start_paused = true)]
async fn mount_fetch_receives_current_window() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);

    {
        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.id, ItemId::from("s"));
        assert_eq!(request.reason, FetchReason::Mounted);
        assert_eq!(request.time_domain.bounds(), (0.0, 10_000.0));
        assert_eq!(request.time_subdomain.bounds(), (0.0, 10_000.0));
        assert_eq!(request.points_per_series, 500);
        assert!(request.old_series.data.is_empty());
    }
    assert_eq!(engine.in_flight_fetches(), 1);

    let event = engine.tick().await.expect("tick");
    let merged = match event {
        Some(EngineEvent::DataLoaded(merged)) => merged,
        other => panic!("expected a merged load, got {other:?}"),
    };
    assert_eq!(merged.reason, FetchReason::Mounted);
    assert_eq!(merged.points_len, 3);

    let item = engine.item(&ItemId::from("s")).expect("item");
    assert_eq!(item.data().len(), 3);
    let y = engine.domain(&ItemId::from("s"), Axis::Y).expect("y domain");
    assert_eq!(y.priority, DomainPriority::Calculated);
    assert!((y.min - 9.5).abs() < 1e-9);
    assert!((y.max - 30.5).abs() < 1e-9);
    let y_sub = engine
        .subdomain(&ItemId::from("s"), Axis::Y)
        .expect("y subdomain");
    assert_eq!(y_sub.bounds(), y.bounds());
}

#[tokio::test(start_paused = true)]
async fn unchanged_window_does_not_refetch() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);
    engine.run_until_idle().await.expect("initial load");

    advance(Duration::from_secs(1)).await;
    engine
        .set_series(vec![SeriesSpec::new("s").with_loader(recording_loader(&requests))])
        .expect("re-set series");
    engine
        .update_domains(time_pan(0.0, 10_000.0))
        .expect("no-op update");

    assert_eq!(reasons(&requests), vec![FetchReason::Mounted]);
    assert!(engine.is_idle());
}

#[tokio::test(start_paused = true)]
async fn rapid_pans_coalesce_into_one_trailing_fetch() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);

    for offset in [100.0, 200.0, 300.0] {
        engine
            .update_domains(time_pan(offset, offset + 5_000.0))
            .expect("pan");
    }
    assert_eq!(requests.borrow().len(), 1);

    engine.run_until_idle().await.expect("drain");

    let requests = requests.borrow();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].reason, FetchReason::SubdomainChanged);
    assert_eq!(requests[1].time_subdomain.bounds(), (300.0, 5_300.0));
    assert_eq!(requests[1].old_series.data.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pan_after_quiet_period_fetches_immediately() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);
    engine.run_until_idle().await.expect("initial load");

    advance(Duration::from_secs(1)).await;
    engine
        .update_domains(time_pan(1_000.0, 2_000.0))
        .expect("pan");

    assert_eq!(
        reasons(&requests),
        vec![FetchReason::Mounted, FetchReason::SubdomainChanged]
    );
}

#[tokio::test(start_paused = true)]
async fn throttled_pan_is_fetched_once_throttle_lifts() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);
    engine.run_until_idle().await.expect("initial load");

    advance(Duration::from_secs(1)).await;
    engine.update_domains(time_pan(1_000.0, 2_000.0)).expect("pan");
    advance(Duration::from_millis(100)).await;
    engine.update_domains(time_pan(1_100.0, 2_100.0)).expect("pan");
    engine.run_until_idle().await.expect("trailing fetch");

    advance(Duration::from_millis(100)).await;
    engine.update_domains(time_pan(1_200.0, 2_200.0)).expect("pan");
    assert!(!engine.is_idle());
    assert!(engine.next_deadline().is_some());
    engine.run_until_idle().await.expect("deferred fetch");

    let windows: Vec<(f64, f64)> = requests
        .borrow()
        .iter()
        .map(|request| request.time_subdomain.bounds())
        .collect();
    assert_eq!(
        windows,
        vec![
            (0.0, 10_000.0),
            (1_000.0, 2_000.0),
            (1_100.0, 2_100.0),
            (1_200.0, 2_200.0),
        ]
    );
    assert_eq!(
        reasons(&requests).last(),
        Some(&FetchReason::SubdomainChanged)
    );
    assert!(engine.is_idle());
}

#[tokio::test(start_paused = true)]
async fn reload_refetches_same_window() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);
    engine.run_until_idle().await.expect("initial load");

    advance(Duration::from_secs(1)).await;
    engine.reload(&ItemId::from("s")).expect("reload");

    {
        let requests = requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].reason, FetchReason::Reload);
        assert_eq!(requests[1].time_subdomain.bounds(), (0.0, 10_000.0));
        assert_eq!(requests[1].old_series.data.len(), 3);
    }

    let err = engine
        .reload(&ItemId::from("ghost"))
        .expect_err("unknown item");
    assert!(matches!(err, ChartError::UnknownItem(_)));
}

#[tokio::test(start_paused = true)]
async fn loader_failure_surfaces_and_engine_recovers() {
    let mut engine =
        ChartEngine::new(EngineConfig::new(0.0, 10_000.0)).expect("engine init");
    let failing = |_request: LoaderRequest<DataPoint>| async {
        Err::<LoaderResult<DataPoint>, LoaderError>("upstream unavailable".into())
    };
    engine
        .set_series(vec![SeriesSpec::new("s").with_loader(failing)])
        .expect("set series");

    let err = engine.tick().await.expect_err("loader error");
    match err {
        ChartError::Loader { item_id, source } => {
            assert_eq!(item_id, ItemId::from("s"));
            assert_eq!(source.to_string(), "upstream unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.in_flight_fetches(), 0);
    assert!(engine.item(&ItemId::from("s")).expect("item").data().is_empty());
    assert_eq!(engine.tick().await.expect("idle"), None);
}

#[tokio::test(start_paused = true)]
async fn loads_for_removed_items_are_discarded() {
    let requests = Requests::default();
    let mut engine = engine_with_loader(&requests);
    assert!(engine.remove_item(&ItemId::from("s")));

    let event = engine.tick().await.expect("tick");
    assert_eq!(
        event,
        Some(EngineEvent::LoadDiscarded {
            item_id: ItemId::from("s")
        })
    );
    assert!(engine.items().is_empty());
}

#[tokio::test(start_paused = true)]
async fn loader_domain_override_outranks_derived_domain() {
    let mut engine =
        ChartEngine::new(EngineConfig::new(0.0, 10_000.0)).expect("engine init");
    let loader = |_request: LoaderRequest<DataPoint>| async {
        Ok::<_, LoaderError>(
            LoaderResult::new(vec![DataPoint::new(10.0, 5.0), DataPoint::new(20.0, 6.0)])
                .with_domains(AxisPatch::new().with(Axis::Y, Domain::new(0.0, 1_000.0))),
        )
    };
    engine
        .set_series(vec![SeriesSpec::new("s").with_loader(loader)])
        .expect("set series");
    engine.run_until_idle().await.expect("load");

    let y = engine.domain(&ItemId::from("s"), Axis::Y).expect("y domain");
    assert_eq!(y.bounds(), (0.0, 1_000.0));
    assert_eq!(y.priority, DomainPriority::Series);
}

#[tokio::test(start_paused = true)]
async fn collection_members_fetch_but_collections_do_not() {
    use chart_domains::api::CollectionSpec;

    let requests = Requests::default();
    let mut engine =
        ChartEngine::new(EngineConfig::new(0.0, 10_000.0)).expect("engine init");
    engine
        .set_collections(vec![
            CollectionSpec::new("group").with_loader(recording_loader(&requests)),
        ])
        .expect("set collections");
    engine
        .set_series(vec![
            SeriesSpec::new("a").in_collection("group"),
            SeriesSpec::new("b").in_collection("group"),
        ])
        .expect("set series");

    let ids: Vec<String> = requests
        .borrow()
        .iter()
        .map(|request| request.id.to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    engine.run_until_idle().await.expect("drain");
    assert_eq!(engine.snapshot().loaded_points.get(&ItemId::from("a")), Some(&3));
}
