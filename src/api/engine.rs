use std::rc::Rc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::core::{
    Axis, AxisPatch, AxisScale, DataPoint, Domain, ItemId, LinearScalerFactory, ScalerFactory,
};
use crate::error::{ChartError, ChartResult};
use crate::extensions::{ChartPlugin, PluginEvent};
use crate::interaction::{pan_proposal, zoom_proposal};

use super::data_provider::FetchCompletion;
use super::{
    CollectionSpec, DataProvider, DomainPatch, DomainsById, EngineConfig, FetchScheduler, Item,
    ItemDefaults, ItemOverrides, ItemRegistry, LiveUpdateScheduler, MergedLoad, Scaler,
    SeriesSpec, TimeSubdomainLimiter, min_span_limiter,
};

/// What a call to [`ChartEngine::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    DataLoaded(MergedLoad),
    /// A load finished for an item that was removed meanwhile.
    LoadDiscarded { item_id: ItemId },
    TimersFired { live_ticks: usize },
}

enum Wake<D> {
    Loaded(FetchCompletion<D>),
    Timers,
    Idle,
}

/// Main orchestration facade consumed by host applications.
///
/// `ChartEngine` owns the item registry, the domain reconciler, the live-update
/// timers and the fetch coordinator. Every mutation runs one reconciliation
/// pass; asynchronous work (timers and loaders) is driven by [`Self::tick`].
pub struct ChartEngine<D: 'static = DataPoint> {
    pub(super) config: EngineConfig,
    pub(super) registry: ItemRegistry<D>,
    pub(super) scaler: Scaler,
    pub(super) live: LiveUpdateScheduler,
    pub(super) provider: DataProvider<D>,
    pub(super) scaler_factory: Rc<dyn ScalerFactory>,
    pub(super) plugins: Vec<Box<dyn ChartPlugin>>,
    pub(super) items: Vec<Item<D>>,
}

impl ChartEngine<DataPoint> {
    pub fn new(config: EngineConfig) -> ChartResult<Self> {
        Self::with_defaults(config, ItemDefaults::default())
    }
}

impl<D: 'static> ChartEngine<D> {
    /// Creates an engine for a custom datapoint type.
    pub fn with_defaults(config: EngineConfig, defaults: ItemDefaults<D>) -> ChartResult<Self> {
        let config = config.validate()?;
        let mut registry = ItemRegistry::new(defaults);
        registry.set_default_time_axis(config.time_domain, config.time_subdomain);
        let scheduler = FetchScheduler::new(
            config.fetch_behavior.debounce(),
            config.fetch_behavior.throttle(),
        );

        Ok(Self {
            config,
            registry,
            scaler: Scaler::new(min_span_limiter(config.time_subdomain_limits.min_span_ms)),
            live: LiveUpdateScheduler::new(),
            provider: DataProvider::new(scheduler, config.points_per_series),
            scaler_factory: Rc::new(LinearScalerFactory),
            plugins: Vec::new(),
            items: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn set_global_overrides(&mut self, overrides: ItemOverrides<D>) -> ChartResult<()> {
        self.registry.set_global(overrides)?;
        self.reconcile(Instant::now());
        Ok(())
    }

    /// Replaces every series; unknown ids are seeded, missing ones removed.
    pub fn set_series(&mut self, specs: Vec<SeriesSpec<D>>) -> ChartResult<()> {
        self.registry.set_series(specs)?;
        self.reconcile(Instant::now());
        Ok(())
    }

    pub fn set_collections(&mut self, specs: Vec<CollectionSpec<D>>) -> ChartResult<()> {
        self.registry.set_collections(specs)?;
        self.reconcile(Instant::now());
        Ok(())
    }

    pub fn upsert_series(&mut self, spec: SeriesSpec<D>) -> ChartResult<()> {
        self.registry.upsert_series(spec)?;
        self.reconcile(Instant::now());
        Ok(())
    }

    /// Unregisters an item, dropping its domains and timers.
    ///
    /// Loads already in flight are not cancelled; their results are discarded.
    pub fn remove_item(&mut self, id: &ItemId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            self.reconcile(Instant::now());
        }
        removed
    }

    /// Replaces the default minimum-span constraint on time subdomains.
    pub fn set_time_subdomain_limiter(&mut self, limiter: TimeSubdomainLimiter) {
        self.scaler.set_time_subdomain_limiter(limiter);
    }

    pub fn set_scaler_factory(&mut self, factory: Rc<dyn ScalerFactory>) {
        self.scaler_factory = factory;
    }

    #[must_use]
    pub fn items(&self) -> &[Item<D>] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&Item<D>> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn domains(&self) -> &DomainsById {
        self.scaler.domains()
    }

    #[must_use]
    pub fn subdomains(&self) -> &DomainsById {
        self.scaler.subdomains()
    }

    #[must_use]
    pub fn domain(&self, id: &ItemId, axis: Axis) -> Option<Domain> {
        self.scaler.domain(id, axis)
    }

    #[must_use]
    pub fn subdomain(&self, id: &ItemId, axis: Axis) -> Option<Domain> {
        self.scaler.subdomain(id, axis)
    }

    /// Applies proposed subdomains.
    ///
    /// Returns the patch with collection ids expanded into member series. Each
    /// proposal must out-rank the current subdomain to take effect, so
    /// gesture code should propose [`Domain::user_generated`] values.
    pub fn update_domains(&mut self, patch: DomainPatch) -> ChartResult<DomainPatch> {
        self.update_domains_with(patch, |_| {})
    }

    /// Like [`Self::update_domains`], invoking `callback` with the expanded
    /// patch once it is committed and before plugins are notified.
    pub fn update_domains_with<F>(
        &mut self,
        patch: DomainPatch,
        callback: F,
    ) -> ChartResult<DomainPatch>
    where
        F: FnOnce(&DomainPatch),
    {
        let expanded = self.scaler.update_domains(patch)?;
        self.reconcile(Instant::now());
        callback(&expanded);
        let context = self.plugin_context();
        super::plugin_dispatch::emit(
            &mut self.plugins,
            &PluginEvent::DomainsUpdated {
                subdomains: self.scaler.subdomains(),
            },
            context,
        );
        Ok(expanded)
    }

    /// Scale over an item's current subdomain for the rendering layer.
    pub fn scale_for(
        &self,
        id: &ItemId,
        axis: Axis,
        pixel_extent: f64,
    ) -> ChartResult<Box<dyn AxisScale>> {
        let subdomain = self
            .scaler
            .subdomain(id, axis)
            .ok_or_else(|| ChartError::UnknownItem(id.clone()))?;
        self.scaler_factory.create(axis, subdomain, pixel_extent)
    }

    /// Pans an item (or every member of a collection) by a pixel delta.
    pub fn pan(
        &mut self,
        id: &ItemId,
        axis: Axis,
        delta_px: f64,
        pixel_extent: f64,
    ) -> ChartResult<DomainPatch> {
        let scale = self.scale_for(id, axis, pixel_extent)?;
        let subdomain = self
            .scaler
            .subdomain(id, axis)
            .ok_or_else(|| ChartError::UnknownItem(id.clone()))?;
        let proposal = pan_proposal(subdomain, delta_px, scale.as_ref())?;
        self.update_domains(DomainPatch::from([(
            id.clone(),
            AxisPatch::new().with(axis, proposal),
        )]))
    }

    /// Zooms an item around a pixel anchor; `factor < 1` zooms in.
    pub fn zoom(
        &mut self,
        id: &ItemId,
        axis: Axis,
        factor: f64,
        anchor_px: f64,
        pixel_extent: f64,
    ) -> ChartResult<DomainPatch> {
        let scale = self.scale_for(id, axis, pixel_extent)?;
        let subdomain = self
            .scaler
            .subdomain(id, axis)
            .ok_or_else(|| ChartError::UnknownItem(id.clone()))?;
        let proposal = zoom_proposal(subdomain, factor, anchor_px, scale.as_ref())?;
        self.update_domains(DomainPatch::from([(
            id.clone(),
            AxisPatch::new().with(axis, proposal),
        )]))
    }

    /// Requests a fresh load for an item regardless of its subdomain.
    pub fn reload(&mut self, id: &ItemId) -> ChartResult<()> {
        if !self.registry.contains(id) {
            return Err(ChartError::UnknownItem(id.clone()));
        }
        self.provider.reload(id);
        self.reconcile(Instant::now());
        Ok(())
    }

    /// Earliest pending timer: a live-update tick or a trailing fetch.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (
            self.live.next_deadline(),
            self.provider.scheduler().next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn in_flight_fetches(&self) -> usize {
        self.provider.in_flight_len()
    }

    /// `true` when no timer is pending and no loader is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.next_deadline().is_none() && self.provider.in_flight_len() == 0
    }

    /// Fires every timer due at `now`.
    ///
    /// Live ticks move time windows first; the following pass lets the fetch
    /// coordinator see them as ordinary subdomain changes. Trailing debounce
    /// edges fire afterwards.
    pub fn process_timers(&mut self, now: Instant) -> usize {
        let ticks = self.live.take_due(now);
        if !ticks.is_empty() {
            for tick in &ticks {
                self.scaler.advance_time(&tick.item_id, tick.delta_ms);
            }
            self.scaler.refresh_aggregates();
            let context = self.plugin_context();
            for tick in &ticks {
                super::plugin_dispatch::emit(
                    &mut self.plugins,
                    &PluginEvent::LiveTick {
                        item_id: &tick.item_id,
                        delta_ms: tick.delta_ms,
                    },
                    context,
                );
            }
            self.reconcile(now);
        }
        self.provider.fire_due(&self.items, now);
        ticks.len()
    }

    /// Waits for the next timer or loader completion and applies it.
    ///
    /// Returns `Ok(None)` when there is nothing left to wait for. A rejected
    /// loader is returned as [`ChartError::Loader`]; the engine stays usable.
    pub async fn tick(&mut self) -> ChartResult<Option<EngineEvent>> {
        let deadline = self.next_deadline();
        let has_in_flight = self.provider.in_flight_len() > 0;
        if deadline.is_none() && !has_in_flight {
            return Ok(None);
        }
        let sleep_target =
            deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));

        let wake = tokio::select! {
            biased;
            Some(completion) = self.provider.next_completion(), if has_in_flight => {
                Wake::Loaded(completion)
            }
            () = sleep_until(sleep_target), if deadline.is_some() => Wake::Timers,
            else => Wake::Idle,
        };

        match wake {
            Wake::Loaded(completion) => {
                let item_id = completion.item_id.clone();
                let Some(merged) = self.provider.merge(completion)? else {
                    return Ok(Some(EngineEvent::LoadDiscarded { item_id }));
                };
                self.reconcile(Instant::now());
                let context = self.plugin_context();
                super::plugin_dispatch::emit(
                    &mut self.plugins,
                    &PluginEvent::DataLoaded {
                        item_id: &merged.item_id,
                        reason: merged.reason,
                        points_len: merged.points_len,
                    },
                    context,
                );
                Ok(Some(EngineEvent::DataLoaded(merged)))
            }
            Wake::Timers => {
                let live_ticks = self.process_timers(Instant::now());
                Ok(Some(EngineEvent::TimersFired { live_ticks }))
            }
            Wake::Idle => Ok(None),
        }
    }

    /// Ticks until no timer or loader is pending.
    ///
    /// Never returns while a live-updating item is registered.
    pub async fn run_until_idle(&mut self) -> ChartResult<()> {
        while self.tick().await?.is_some() {}
        Ok(())
    }

    /// One reconciliation pass over the current registry.
    fn reconcile(&mut self, now: Instant) {
        let items = self.provider.assemble(self.registry.items());
        self.scaler.observe(&items);
        self.live.sync(&items, now);

        let mut reconciled = items;
        for item in &mut reconciled {
            for axis in Axis::ALL {
                item.domains.set(axis, self.scaler.domain(&item.id, axis));
                item.subdomains.set(axis, self.scaler.subdomain(&item.id, axis));
            }
        }
        self.items = reconciled;
        debug!(items = self.items.len(), "reconciled items");
        self.provider.request_fetches(&self.items, now);
    }
}
