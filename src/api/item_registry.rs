use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::{
    Accessor, Accessors, Axis, AxisPatch, DataPoint, Domain, DomainPriority, ItemId, ItemKind,
    copy_domain,
};
use crate::error::{ChartError, ChartResult};

use super::{Item, Loader};

/// Optional per-item attributes contributed by one layer of the merge.
pub struct ItemOverrides<D> {
    pub time_accessor: Option<Accessor<D>>,
    pub x_accessor: Option<Accessor<D>>,
    pub x0_accessor: Option<Accessor<D>>,
    pub x1_accessor: Option<Accessor<D>>,
    pub y_accessor: Option<Accessor<D>>,
    pub y0_accessor: Option<Accessor<D>>,
    pub y1_accessor: Option<Accessor<D>>,
    pub loader: Option<Rc<dyn Loader<D>>>,
    pub update_interval: Option<Duration>,
    pub domains: AxisPatch,
    pub subdomains: AxisPatch,
}

impl<D> Default for ItemOverrides<D> {
    fn default() -> Self {
        Self {
            time_accessor: None,
            x_accessor: None,
            x0_accessor: None,
            x1_accessor: None,
            y_accessor: None,
            y0_accessor: None,
            y1_accessor: None,
            loader: None,
            update_interval: None,
            domains: AxisPatch::default(),
            subdomains: AxisPatch::default(),
        }
    }
}

impl<D> Clone for ItemOverrides<D> {
    fn clone(&self) -> Self {
        Self {
            time_accessor: self.time_accessor.clone(),
            x_accessor: self.x_accessor.clone(),
            x0_accessor: self.x0_accessor.clone(),
            x1_accessor: self.x1_accessor.clone(),
            y_accessor: self.y_accessor.clone(),
            y0_accessor: self.y0_accessor.clone(),
            y1_accessor: self.y1_accessor.clone(),
            loader: self.loader.clone(),
            update_interval: self.update_interval,
            domains: self.domains,
            subdomains: self.subdomains,
        }
    }
}

impl<D> ItemOverrides<D> {
    fn validate(&self, id: &ItemId) -> ChartResult<()> {
        for (axis, domain) in self.domains.iter().chain(self.subdomains.iter()) {
            domain.validate().map_err(|err| {
                ChartError::InvalidData(format!("item `{id}` {axis} domain: {err}"))
            })?;
        }
        Ok(())
    }
}

/// Builder methods shared by every override layer.
pub trait OverrideBuilder<D>: Sized {
    fn overrides_mut(&mut self) -> &mut ItemOverrides<D>;

    #[must_use]
    fn with_loader<L>(mut self, loader: L) -> Self
    where
        L: Loader<D> + 'static,
    {
        self.overrides_mut().loader = Some(Rc::new(loader));
        self
    }

    #[must_use]
    fn with_update_interval(mut self, interval: Duration) -> Self {
        self.overrides_mut().update_interval = Some(interval);
        self
    }

    #[must_use]
    fn with_domain(mut self, axis: Axis, domain: Domain) -> Self {
        self.overrides_mut().domains.set(axis, Some(domain));
        self
    }

    #[must_use]
    fn with_subdomain(mut self, axis: Axis, domain: Domain) -> Self {
        self.overrides_mut().subdomains.set(axis, Some(domain));
        self
    }

    #[must_use]
    fn with_time_accessor(mut self, accessor: Accessor<D>) -> Self {
        self.overrides_mut().time_accessor = Some(accessor);
        self
    }

    #[must_use]
    fn with_x_accessor(mut self, accessor: Accessor<D>) -> Self {
        self.overrides_mut().x_accessor = Some(accessor);
        self
    }

    #[must_use]
    fn with_y_accessor(mut self, accessor: Accessor<D>) -> Self {
        self.overrides_mut().y_accessor = Some(accessor);
        self
    }

    #[must_use]
    fn with_x_band(mut self, x0: Accessor<D>, x1: Accessor<D>) -> Self {
        let overrides = self.overrides_mut();
        overrides.x0_accessor = Some(x0);
        overrides.x1_accessor = Some(x1);
        self
    }

    #[must_use]
    fn with_y_band(mut self, y0: Accessor<D>, y1: Accessor<D>) -> Self {
        let overrides = self.overrides_mut();
        overrides.y0_accessor = Some(y0);
        overrides.y1_accessor = Some(y1);
        self
    }
}

impl<D> OverrideBuilder<D> for ItemOverrides<D> {
    fn overrides_mut(&mut self) -> &mut ItemOverrides<D> {
        self
    }
}

pub struct SeriesSpec<D> {
    pub id: ItemId,
    pub collection_id: Option<ItemId>,
    pub overrides: ItemOverrides<D>,
}

impl<D> SeriesSpec<D> {
    #[must_use]
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            collection_id: None,
            overrides: ItemOverrides::default(),
        }
    }

    #[must_use]
    pub fn in_collection(mut self, collection_id: impl Into<ItemId>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }
}

impl<D> OverrideBuilder<D> for SeriesSpec<D> {
    fn overrides_mut(&mut self) -> &mut ItemOverrides<D> {
        &mut self.overrides
    }
}

pub struct CollectionSpec<D> {
    pub id: ItemId,
    pub overrides: ItemOverrides<D>,
}

impl<D> CollectionSpec<D> {
    #[must_use]
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            overrides: ItemOverrides::default(),
        }
    }
}

impl<D> OverrideBuilder<D> for CollectionSpec<D> {
    fn overrides_mut(&mut self) -> &mut ItemOverrides<D> {
        &mut self.overrides
    }
}

/// Least specific layer: always-defined accessors plus engine-wide axes.
pub struct ItemDefaults<D> {
    pub accessors: Accessors<D>,
    pub update_interval: Option<Duration>,
    pub domains: AxisPatch,
    pub subdomains: AxisPatch,
}

impl<D> ItemDefaults<D> {
    #[must_use]
    pub fn new(accessors: Accessors<D>) -> Self {
        Self {
            accessors,
            update_interval: None,
            domains: AxisPatch::default(),
            subdomains: AxisPatch::default(),
        }
    }
}

impl Default for ItemDefaults<DataPoint> {
    fn default() -> Self {
        Self::new(Accessors::default())
    }
}

/// One merge layer and the priority its domains are tagged with.
struct Layer<'a, D> {
    overrides: &'a ItemOverrides<D>,
    priority: DomainPriority,
}

/// Most specific defined value across layers ordered most-specific first.
fn most_specific<'a, D, T, F>(layers: &[Layer<'a, D>], field: F) -> Option<T>
where
    T: Clone + 'a,
    F: Fn(&'a ItemOverrides<D>) -> &'a Option<T>,
{
    layers
        .iter()
        .find_map(|layer| field(layer.overrides).as_ref())
        .cloned()
}

fn most_specific_domain<D, F>(
    layers: &[Layer<'_, D>],
    axis: Axis,
    field: F,
    fallback: Option<Domain>,
) -> Option<Domain>
where
    F: Fn(&ItemOverrides<D>) -> &AxisPatch,
{
    layers
        .iter()
        .find_map(|layer| {
            field(layer.overrides)
                .get(axis)
                .map(|domain| copy_domain(domain, Some(layer.priority)))
        })
        .or_else(|| fallback.map(|domain| copy_domain(domain, Some(DomainPriority::Global))))
}

fn combine_item<D>(
    id: &ItemId,
    kind: ItemKind,
    collection_id: Option<&ItemId>,
    layers: &[Layer<'_, D>],
    defaults: &ItemDefaults<D>,
) -> Item<D> {
    let base = &defaults.accessors;
    let accessors = Accessors {
        time: most_specific(layers, |o| &o.time_accessor).unwrap_or_else(|| Rc::clone(&base.time)),
        x: most_specific(layers, |o| &o.x_accessor).unwrap_or_else(|| Rc::clone(&base.x)),
        x0: most_specific(layers, |o| &o.x0_accessor).or_else(|| base.x0.clone()),
        x1: most_specific(layers, |o| &o.x1_accessor).or_else(|| base.x1.clone()),
        y: most_specific(layers, |o| &o.y_accessor).unwrap_or_else(|| Rc::clone(&base.y)),
        y0: most_specific(layers, |o| &o.y0_accessor).or_else(|| base.y0.clone()),
        y1: most_specific(layers, |o| &o.y1_accessor).or_else(|| base.y1.clone()),
    };

    let mut domains = AxisPatch::default();
    let mut subdomains = AxisPatch::default();
    for axis in Axis::ALL {
        domains.set(
            axis,
            most_specific_domain(layers, axis, |o| &o.domains, defaults.domains.get(axis)),
        );
        subdomains.set(
            axis,
            most_specific_domain(layers, axis, |o| &o.subdomains, defaults.subdomains.get(axis)),
        );
    }

    Item {
        id: id.clone(),
        kind,
        collection_id: collection_id.cloned(),
        accessors,
        loader: most_specific(layers, |o| &o.loader),
        update_interval: most_specific(layers, |o| &o.update_interval)
            .or(defaults.update_interval),
        domains,
        subdomains,
        loaded: None,
    }
}

/// Registered series/collection specs and the layers they merge over.
pub struct ItemRegistry<D> {
    defaults: ItemDefaults<D>,
    global: ItemOverrides<D>,
    collections: IndexMap<ItemId, CollectionSpec<D>>,
    series: IndexMap<ItemId, SeriesSpec<D>>,
}

impl<D> ItemRegistry<D> {
    #[must_use]
    pub fn new(defaults: ItemDefaults<D>) -> Self {
        Self {
            defaults,
            global: ItemOverrides::default(),
            collections: IndexMap::new(),
            series: IndexMap::new(),
        }
    }

    pub fn set_global(&mut self, overrides: ItemOverrides<D>) -> ChartResult<()> {
        overrides.validate(&ItemId::from("<global>"))?;
        self.global = overrides;
        Ok(())
    }

    pub fn set_default_time_axis(&mut self, domain: Domain, subdomain: Option<Domain>) {
        self.defaults.domains.time = Some(domain);
        self.defaults.subdomains.time = subdomain;
    }

    /// Replaces all series. Nothing changes when validation fails.
    pub fn set_series(&mut self, specs: Vec<SeriesSpec<D>>) -> ChartResult<()> {
        let mut series = IndexMap::with_capacity(specs.len());
        for spec in specs {
            spec.overrides.validate(&spec.id)?;
            if self.collections.contains_key(&spec.id) || series.contains_key(&spec.id) {
                return Err(ChartError::DuplicateItem(spec.id));
            }
            series.insert(spec.id.clone(), spec);
        }
        debug!(count = series.len(), "set series");
        self.series = series;
        Ok(())
    }

    /// Replaces all collections. Nothing changes when validation fails.
    pub fn set_collections(&mut self, specs: Vec<CollectionSpec<D>>) -> ChartResult<()> {
        let mut collections = IndexMap::with_capacity(specs.len());
        for spec in specs {
            spec.overrides.validate(&spec.id)?;
            if self.series.contains_key(&spec.id) || collections.contains_key(&spec.id) {
                return Err(ChartError::DuplicateItem(spec.id));
            }
            collections.insert(spec.id.clone(), spec);
        }
        debug!(count = collections.len(), "set collections");
        self.collections = collections;
        Ok(())
    }

    /// Inserts or replaces one series in place.
    pub fn upsert_series(&mut self, spec: SeriesSpec<D>) -> ChartResult<()> {
        spec.overrides.validate(&spec.id)?;
        if self.collections.contains_key(&spec.id) {
            return Err(ChartError::DuplicateItem(spec.id));
        }
        self.series.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Removes a series or collection. Returns `true` when something was removed.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.series.shift_remove(id).is_some() || self.collections.shift_remove(id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.series.contains_key(id) || self.collections.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len() + self.collections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merges every registered spec into a fully-populated item.
    ///
    /// Series come first in registration order, followed by collections.
    #[must_use]
    pub fn items(&self) -> Vec<Item<D>> {
        let mut items = Vec::with_capacity(self.len());
        for spec in self.series.values() {
            let collection = spec
                .collection_id
                .as_ref()
                .and_then(|collection_id| match self.collections.get(collection_id) {
                    Some(collection) => Some(collection),
                    None => {
                        warn!(
                            series = %spec.id,
                            collection = %collection_id,
                            "series references an unknown collection; treating it as standalone"
                        );
                        None
                    }
                });

            let mut layers = vec![Layer {
                overrides: &spec.overrides,
                priority: DomainPriority::Series,
            }];
            if let Some(collection) = collection {
                layers.push(Layer {
                    overrides: &collection.overrides,
                    priority: DomainPriority::Collection,
                });
            }
            layers.push(Layer {
                overrides: &self.global,
                priority: DomainPriority::Global,
            });

            items.push(combine_item(
                &spec.id,
                ItemKind::Series,
                collection.map(|collection| &collection.id),
                &layers,
                &self.defaults,
            ));
        }

        for collection in self.collections.values() {
            let layers = [
                Layer {
                    overrides: &collection.overrides,
                    priority: DomainPriority::Collection,
                },
                Layer {
                    overrides: &self.global,
                    priority: DomainPriority::Global,
                },
            ];
            items.push(combine_item(
                &collection.id,
                ItemKind::Collection,
                None,
                &layers,
                &self.defaults,
            ));
        }
        items
    }
}
