use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::{IndexMap, IndexSet};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::core::{
    Accessors, Axis, AxisPatch, DomainPriority, ItemId, calculate_domains, copy_domain,
    highest_priority_domain,
};
use crate::error::{ChartError, ChartResult, LoaderError};

use super::{
    FetchReason, FetchScheduler, Item, LoadedSeries, LoaderRequest, LoaderResult,
};

/// A loader future that has resolved, waiting to be merged.
pub struct FetchCompletion<D> {
    pub item_id: ItemId,
    pub reason: FetchReason,
    accessors: Accessors<D>,
    outcome: Result<LoaderResult<D>, LoaderError>,
}

/// Outcome of merging one [`FetchCompletion`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLoad {
    pub item_id: ItemId,
    pub reason: FetchReason,
    pub points_len: usize,
}

/// Decides when each item's loader runs and folds the results back in.
pub struct DataProvider<D> {
    scheduler: FetchScheduler,
    points_per_series: usize,
    known: IndexSet<ItemId>,
    loaded: IndexMap<ItemId, Rc<LoadedSeries<D>>>,
    reload_requested: IndexSet<ItemId>,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, FetchCompletion<D>>>,
}

impl<D: 'static> DataProvider<D> {
    #[must_use]
    pub fn new(scheduler: FetchScheduler, points_per_series: usize) -> Self {
        Self {
            scheduler,
            points_per_series,
            known: IndexSet::new(),
            loaded: IndexMap::new(),
            reload_requested: IndexSet::new(),
            in_flight: FuturesUnordered::new(),
        }
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn scheduler(&self) -> &FetchScheduler {
        &self.scheduler
    }

    /// Merges stored loader results over registry items.
    ///
    /// Per axis the registry domain, the loader's override and the domain
    /// derived from the data compete by priority. The registry is untouched.
    #[must_use]
    pub fn assemble(&self, mut items: Vec<Item<D>>) -> Vec<Item<D>> {
        for item in items.iter_mut().filter(|item| !item.is_collection()) {
            let Some(loaded) = self.loaded.get(&item.id) else {
                continue;
            };
            for axis in Axis::ALL {
                let candidate = highest_priority_domain([
                    item.domains.get(axis),
                    loaded.result.domains.get(axis),
                    loaded.data_domains.get(axis),
                ]);
                item.domains.set(axis, candidate);
            }
            item.loaded = Some(Rc::clone(loaded));
        }
        items
    }

    /// Why the item needs a fetch, if it does.
    #[must_use]
    pub fn fetch_reason(&self, item: &Item<D>) -> Option<FetchReason> {
        let time_subdomain = item
            .subdomain(Axis::Time)
            .filter(|subdomain| !subdomain.is_placeholder())?;
        if self.reload_requested.contains(&item.id) {
            return Some(FetchReason::Reload);
        }
        match self.scheduler.request(&item.id) {
            None => Some(FetchReason::Mounted),
            Some(request) if !request.time_subdomain.same_bounds(time_subdomain) => {
                Some(FetchReason::SubdomainChanged)
            }
            Some(_) => None,
        }
    }

    /// Runs the per-pass fetch decision for every reconciled item.
    pub fn request_fetches(&mut self, items: &[Item<D>], now: Instant) {
        self.known = items
            .iter()
            .filter(|item| !item.is_collection())
            .map(|item| item.id.clone())
            .collect();
        let known = &self.known;
        self.scheduler.retain(|id| known.contains(id));
        self.loaded.retain(|id, _| known.contains(id));
        self.reload_requested.retain(|id| known.contains(id));

        for item in items
            .iter()
            .filter(|item| !item.is_collection() && item.loader.is_some())
        {
            let Some(reason) = self.fetch_reason(item) else {
                continue;
            };
            if let Some(reason) = self.scheduler.call(&item.id, reason, now) {
                self.fetch(item, reason, now);
            }
        }
    }

    /// Fires trailing debounce edges that have come due.
    pub fn fire_due(&mut self, items: &[Item<D>], now: Instant) {
        for (id, reason) in self.scheduler.take_due(now) {
            if let Some(item) = items.iter().find(|item| item.id == id) {
                self.fetch(item, reason, now);
            }
        }
    }

    fn fetch(&mut self, item: &Item<D>, reason: FetchReason, now: Instant) {
        let Some(loader) = item.loader.as_ref() else {
            return;
        };
        let (Some(time_domain), Some(time_subdomain)) =
            (item.domain(Axis::Time), item.subdomain(Axis::Time))
        else {
            trace!(item = %item.id, "skipping fetch without a time axis");
            return;
        };
        if !self.scheduler.try_begin(&item.id, reason, time_subdomain, now) {
            return;
        }
        self.reload_requested.shift_remove(&item.id);

        let old_series = self
            .loaded
            .get(&item.id)
            .map_or_else(|| Rc::new(LoaderResult::default()), |loaded| {
                Rc::clone(&loaded.result)
            });
        let request = LoaderRequest {
            id: item.id.clone(),
            time_domain,
            time_subdomain,
            points_per_series: self.points_per_series,
            old_series,
            reason,
        };
        debug!(item = %item.id, ?reason, %time_subdomain, "starting fetch");

        let pending = loader.load(request);
        let item_id = item.id.clone();
        let accessors = item.accessors.clone();
        self.in_flight.push(
            async move {
                FetchCompletion {
                    item_id,
                    reason,
                    accessors,
                    outcome: pending.await,
                }
            }
            .boxed_local(),
        );
    }

    /// Marks an item for an explicit re-fetch on the next pass.
    pub fn reload(&mut self, id: &ItemId) {
        self.scheduler.forget_request(id);
        self.reload_requested.insert(id.clone());
    }

    /// Waits for the next in-flight loader to resolve.
    pub async fn next_completion(&mut self) -> Option<FetchCompletion<D>> {
        self.in_flight.next().await
    }

    /// Stores a resolved load with its derived domains.
    ///
    /// A rejected loader surfaces as [`ChartError::Loader`]. Results for items
    /// removed while in flight are dropped. Last write wins.
    pub fn merge(&mut self, completion: FetchCompletion<D>) -> ChartResult<Option<MergedLoad>> {
        let FetchCompletion {
            item_id,
            reason,
            accessors,
            outcome,
        } = completion;
        let result = outcome.map_err(|source| ChartError::Loader {
            item_id: item_id.clone(),
            source,
        })?;
        if !self.known.contains(&item_id) {
            debug!(item = %item_id, "dropping load for unregistered item");
            return Ok(None);
        }

        let data_domains = calculate_domains(&result.data, &accessors);
        let mut domains = AxisPatch::default();
        for (axis, domain) in result.domains.iter() {
            let priority = (domain.priority == DomainPriority::Unspecified)
                .then_some(DomainPriority::Series);
            domains.set(axis, Some(copy_domain(domain, priority)));
        }
        let points_len = result.data.len();
        debug!(item = %item_id, ?reason, points_len, "merged loader result");
        self.loaded.insert(
            item_id.clone(),
            Rc::new(LoadedSeries {
                result: Rc::new(LoaderResult {
                    data: result.data,
                    domains,
                }),
                data_domains,
            }),
        );
        Ok(Some(MergedLoad {
            item_id,
            reason,
            points_len,
        }))
    }
}
