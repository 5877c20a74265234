use std::time::Duration;

use chart_domains::ChartError;
use chart_domains::api::{
    CollectionSpec, ItemDefaults, ItemOverrides, ItemRegistry, LoaderRequest, LoaderResult,
    OverrideBuilder, SeriesSpec,
};
use chart_domains::core::{Axis, DataPoint, Domain, DomainPriority, ItemId, ItemKind, accessor};
use chart_domains::error::LoaderError;

fn registry() -> ItemRegistry<DataPoint> {
    ItemRegistry::new(ItemDefaults::default())
}

fn empty_loader(
    _request: LoaderRequest<DataPoint>,
) -> impl Future<Output = Result<LoaderResult<DataPoint>, LoaderError>> {
    async { Ok(LoaderResult::default()) }
}

#[test]
fn most_specific_domain_wins_and_is_retagged() {
    let mut registry = registry();
    registry
        .set_global(ItemOverrides::default().with_domain(Axis::Y, Domain::new(0.0, 1.0)))
        .expect("set global");
    registry
        .set_collections(vec![
            CollectionSpec::new("prices").with_domain(Axis::Y, Domain::new(0.0, 2.0)),
        ])
        .expect("set collections");
    registry
        .set_series(vec![
            SeriesSpec::new("own")
                .in_collection("prices")
                .with_domain(Axis::Y, Domain::new(0.0, 3.0)),
            SeriesSpec::new("member").in_collection("prices"),
            SeriesSpec::new("standalone"),
        ])
        .expect("set series");

    let items = registry.items();
    let y_of = |id: &str| {
        items
            .iter()
            .find(|item| item.id.as_str() == id)
            .and_then(|item| item.domain(Axis::Y))
            .expect("y domain")
    };

    assert_eq!(y_of("own"), Domain::new(0.0, 3.0).with_priority(DomainPriority::Series));
    assert_eq!(
        y_of("member"),
        Domain::new(0.0, 2.0).with_priority(DomainPriority::Collection)
    );
    assert_eq!(
        y_of("standalone"),
        Domain::new(0.0, 1.0).with_priority(DomainPriority::Global)
    );
    assert_eq!(
        y_of("prices"),
        Domain::new(0.0, 2.0).with_priority(DomainPriority::Collection)
    );
}

#[test]
fn items_list_series_before_collections() {
    let mut registry = registry();
    registry
        .set_collections(vec![CollectionSpec::new("group")])
        .expect("set collections");
    registry
        .set_series(vec![SeriesSpec::new("a").in_collection("group"), SeriesSpec::new("b")])
        .expect("set series");

    let items = registry.items();
    let kinds: Vec<(&str, ItemKind)> = items
        .iter()
        .map(|item| (item.id.as_str(), item.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("a", ItemKind::Series),
            ("b", ItemKind::Series),
            ("group", ItemKind::Collection),
        ]
    );
    assert_eq!(items[0].collection_id, Some(ItemId::from("group")));
}

#[test]
fn default_time_axis_applies_with_global_priority() {
    let mut registry = registry();
    registry.set_default_time_axis(Domain::new(0.0, 100.0), Some(Domain::new(10.0, 20.0)));
    registry
        .set_series(vec![SeriesSpec::new("s")])
        .expect("set series");

    let item = &registry.items()[0];
    assert_eq!(
        item.domain(Axis::Time),
        Some(Domain::new(0.0, 100.0).with_priority(DomainPriority::Global))
    );
    assert_eq!(
        item.subdomain(Axis::Time),
        Some(Domain::new(10.0, 20.0).with_priority(DomainPriority::Global))
    );
    assert_eq!(item.domain(Axis::Y), None);
}

#[test]
fn accessors_and_attributes_fall_through_layers() {
    let mut registry = registry();
    registry
        .set_global(
            ItemOverrides::default()
                .with_y_accessor(accessor(|point: &DataPoint| point.value * 2.0))
                .with_update_interval(Duration::from_secs(5)),
        )
        .expect("set global");
    registry
        .set_collections(vec![CollectionSpec::new("group").with_loader(empty_loader)])
        .expect("set collections");
    registry
        .set_series(vec![
            SeriesSpec::new("member").in_collection("group"),
            SeriesSpec::new("custom")
                .with_y_accessor(accessor(|point: &DataPoint| point.value * 10.0))
                .with_update_interval(Duration::ZERO),
        ])
        .expect("set series");

    let items = registry.items();
    let point = DataPoint::new(0.0, 3.0);

    let member = &items[0];
    assert!(((member.accessors.y)(&point) - 6.0).abs() < 1e-12);
    assert!(member.loader.is_some());
    assert_eq!(member.live_interval(), Some(Duration::from_secs(5)));

    let custom = &items[1];
    assert!(((custom.accessors.y)(&point) - 30.0).abs() < 1e-12);
    assert!(custom.loader.is_none());
    assert_eq!(custom.live_interval(), None);
    assert!(((custom.accessors.time)(&DataPoint::new(42.0, 0.0)) - 42.0).abs() < 1e-12);
}

#[test]
fn unknown_collection_is_treated_as_standalone() {
    let mut registry = registry();
    registry
        .set_series(vec![SeriesSpec::new("orphan").in_collection("missing")])
        .expect("set series");

    let items = registry.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].collection_id, None);
}

#[test]
fn duplicate_ids_are_rejected_without_changes() {
    let mut registry = registry();
    registry
        .set_series(vec![SeriesSpec::new("a")])
        .expect("set series");

    let err = registry
        .set_series(vec![SeriesSpec::new("b"), SeriesSpec::new("b")])
        .expect_err("duplicate series");
    assert!(matches!(err, ChartError::DuplicateItem(id) if id.as_str() == "b"));
    assert!(registry.contains(&ItemId::from("a")));
    assert!(!registry.contains(&ItemId::from("b")));

    let err = registry
        .set_collections(vec![CollectionSpec::new("a")])
        .expect_err("collection id clashes with series");
    assert!(matches!(err, ChartError::DuplicateItem(_)));
}

#[test]
fn invalid_domain_overrides_are_rejected() {
    let mut registry = registry();
    let err = registry
        .set_series(vec![SeriesSpec::new("bad").with_domain(Axis::Y, Domain::new(5.0, 1.0))])
        .expect_err("inverted domain");
    assert!(matches!(err, ChartError::InvalidData(_)));
    assert!(registry.is_empty());
}

#[test]
fn upsert_and_remove_keep_order() {
    let mut registry = registry();
    registry
        .set_series(vec![SeriesSpec::new("a"), SeriesSpec::new("b")])
        .expect("set series");
    registry
        .upsert_series(SeriesSpec::new("a").with_domain(Axis::Y, Domain::new(0.0, 9.0)))
        .expect("upsert");
    registry
        .upsert_series(SeriesSpec::new("c"))
        .expect("insert");

    let ids: Vec<String> = registry
        .items()
        .iter()
        .map(|item| item.id.to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    assert!(registry.remove(&ItemId::from("b")));
    assert!(!registry.remove(&ItemId::from("b")));
    assert_eq!(registry.len(), 2);
}
