use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::core::{Accessors, Axis, AxisPatch, Domain, ItemId, ItemKind};

use super::{Loader, LoaderResult};

/// Loader output stored per item together with the domains derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries<D> {
    pub result: Rc<LoaderResult<D>>,
    pub data_domains: AxisPatch,
}

/// Fully-populated series or collection descriptor.
///
/// Items handed out by [`super::ChartEngine::items`] carry the reconciled
/// domain and subdomain of every axis.
pub struct Item<D> {
    pub id: ItemId,
    pub kind: ItemKind,
    pub collection_id: Option<ItemId>,
    pub accessors: Accessors<D>,
    pub loader: Option<Rc<dyn Loader<D>>>,
    pub update_interval: Option<Duration>,
    pub domains: AxisPatch,
    pub subdomains: AxisPatch,
    pub loaded: Option<Rc<LoadedSeries<D>>>,
}

impl<D> Item<D> {
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.kind == ItemKind::Collection
    }

    /// Loaded data, empty until the first load completes.
    #[must_use]
    pub fn data(&self) -> &[D] {
        self.loaded
            .as_deref()
            .map_or(&[], |loaded| loaded.result.data.as_slice())
    }

    #[must_use]
    pub fn domain(&self, axis: Axis) -> Option<Domain> {
        self.domains.get(axis)
    }

    #[must_use]
    pub fn subdomain(&self, axis: Axis) -> Option<Domain> {
        self.subdomains.get(axis)
    }

    /// Live-update period; zero means static.
    #[must_use]
    pub fn live_interval(&self) -> Option<Duration> {
        self.update_interval.filter(|interval| !interval.is_zero())
    }
}

impl<D> Clone for Item<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            kind: self.kind,
            collection_id: self.collection_id.clone(),
            accessors: self.accessors.clone(),
            loader: self.loader.clone(),
            update_interval: self.update_interval,
            domains: self.domains,
            subdomains: self.subdomains,
            loaded: self.loaded.clone(),
        }
    }
}

impl<D> fmt::Debug for Item<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("collection_id", &self.collection_id)
            .field("has_loader", &self.loader.is_some())
            .field("update_interval", &self.update_interval)
            .field("domains", &self.domains)
            .field("subdomains", &self.subdomains)
            .field("data_len", &self.data().len())
            .finish()
    }
}
