use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::{
    Axis, AxisDomains, AxisPatch, Domain, DomainPriority, ItemId, copy_domain,
    highest_priority_domain,
};
use crate::error::{ChartError, ChartResult};

use super::Item;

/// Per-item domains for every axis.
pub type DomainsById = IndexMap<ItemId, AxisDomains>;
/// Sparse per-item, per-axis domain changes.
pub type DomainPatch = IndexMap<ItemId, AxisPatch>;
/// Constrains a proposed time subdomain before it is clamped.
pub type TimeSubdomainLimiter = Box<dyn Fn(Domain) -> Domain>;

pub const MIN_SAFE_INTEGER: f64 = -9_007_199_254_740_991.0;
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const SPAN_EPSILON: f64 = 1e-9;

/// Limits used when an item has no known domain yet.
#[must_use]
pub fn unbounded_limits() -> Domain {
    Domain::new(MIN_SAFE_INTEGER, MAX_SAFE_INTEGER)
}

/// Widens subdomains narrower than `min_span` symmetrically around their center.
#[must_use]
pub fn min_span_limiter(min_span: f64) -> TimeSubdomainLimiter {
    Box::new(move |subdomain: Domain| {
        let span = subdomain.span();
        if span >= min_span {
            return subdomain;
        }
        let pad = (min_span - span) / 2.0;
        Domain {
            min: subdomain.min - pad,
            max: subdomain.max + pad,
            priority: subdomain.priority,
        }
    })
}

/// Slides `proposal` back inside `limits` without changing its span.
///
/// A window wider than the limits is cut down to them.
#[must_use]
pub fn translate_within(proposal: Domain, limits: Domain) -> Domain {
    let shifted = if proposal.min < limits.min {
        proposal.shifted(limits.min - proposal.min)
    } else if proposal.max > limits.max {
        proposal.shifted(limits.max - proposal.max)
    } else {
        proposal
    };
    rescale_within(shifted, limits)
}

/// Clamps each bound of `proposal` into `limits` independently.
#[must_use]
pub fn rescale_within(proposal: Domain, limits: Domain) -> Domain {
    Domain {
        min: proposal.min.max(limits.min).min(limits.max),
        max: proposal.max.min(limits.max).max(limits.min),
        priority: proposal.priority,
    }
}

fn spans_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= SPAN_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Union of every non-placeholder entry of `members` at `axis`.
fn aggregate(members: &[ItemId], map: &DomainsById, axis: Axis) -> Option<Domain> {
    members
        .iter()
        .filter_map(|member| map.get(member))
        .map(|domains| domains.get(axis))
        .filter(|domain| !domain.is_placeholder())
        .reduce(Domain::union)
}

/// External domains an item supplied on the previous pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Supplied {
    domains: AxisPatch,
    subdomains: AxisPatch,
}

/// Owns the per-item domain and subdomain maps and every rule that mutates them.
pub struct Scaler {
    domains_by_id: DomainsById,
    subdomains_by_id: DomainsById,
    supplied: IndexMap<ItemId, Supplied>,
    /// Subdomains supplied by the host or committed through
    /// [`Scaler::update_domains`]; the others track their domain.
    chosen: IndexSet<(ItemId, Axis)>,
    collection_members: IndexMap<ItemId, SmallVec<[ItemId; 4]>>,
    member_collection: IndexMap<ItemId, ItemId>,
    limit_time_subdomain: TimeSubdomainLimiter,
}

impl Scaler {
    #[must_use]
    pub fn new(limit_time_subdomain: TimeSubdomainLimiter) -> Self {
        Self {
            domains_by_id: IndexMap::new(),
            subdomains_by_id: IndexMap::new(),
            supplied: IndexMap::new(),
            chosen: IndexSet::new(),
            collection_members: IndexMap::new(),
            member_collection: IndexMap::new(),
            limit_time_subdomain,
        }
    }

    pub fn set_time_subdomain_limiter(&mut self, limiter: TimeSubdomainLimiter) {
        self.limit_time_subdomain = limiter;
    }

    #[must_use]
    pub fn domains(&self) -> &DomainsById {
        &self.domains_by_id
    }

    #[must_use]
    pub fn subdomains(&self) -> &DomainsById {
        &self.subdomains_by_id
    }

    #[must_use]
    pub fn domain(&self, id: &ItemId, axis: Axis) -> Option<Domain> {
        self.domains_by_id.get(id).map(|domains| domains.get(axis))
    }

    #[must_use]
    pub fn subdomain(&self, id: &ItemId, axis: Axis) -> Option<Domain> {
        self.subdomains_by_id.get(id).map(|domains| domains.get(axis))
    }

    #[must_use]
    pub fn members(&self, collection_id: &ItemId) -> Option<&[ItemId]> {
        self.collection_members
            .get(collection_id)
            .map(SmallVec::as_slice)
    }

    /// Synchronizes tracked state with the current item list.
    ///
    /// New items are seeded, vanished items are dropped, and external domain
    /// changes overwrite the tracked domain. A subdomain someone chose survives
    /// domain changes and is only clamped back inside.
    pub fn observe<D>(&mut self, items: &[Item<D>]) {
        let live: IndexSet<&ItemId> = items.iter().map(|item| &item.id).collect();
        let before = self.domains_by_id.len();
        self.domains_by_id.retain(|id, _| live.contains(id));
        self.subdomains_by_id.retain(|id, _| live.contains(id));
        self.supplied.retain(|id, _| live.contains(id));
        self.chosen.retain(|(id, _)| live.contains(id));
        if self.domains_by_id.len() != before {
            debug!(
                removed = before - self.domains_by_id.len(),
                "dropped domains of unregistered items"
            );
        }

        self.collection_members.clear();
        self.member_collection.clear();
        for item in items.iter().filter(|item| item.is_collection()) {
            self.collection_members
                .insert(item.id.clone(), SmallVec::new());
        }
        for item in items.iter().filter(|item| !item.is_collection()) {
            if let Some(collection_id) = &item.collection_id {
                if let Some(members) = self.collection_members.get_mut(collection_id) {
                    members.push(item.id.clone());
                    self.member_collection
                        .insert(item.id.clone(), collection_id.clone());
                }
            }
        }

        for item in items.iter().filter(|item| !item.is_collection()) {
            let supplied = Supplied {
                domains: item.domains,
                subdomains: item.subdomains,
            };
            match self.supplied.insert(item.id.clone(), supplied) {
                None => self.seed(&item.id, supplied),
                Some(previous) if previous != supplied => {
                    self.apply_external_change(&item.id, previous, supplied);
                }
                Some(_) => {}
            }
        }

        for item in items.iter().filter(|item| item.is_collection()) {
            self.supplied.insert(
                item.id.clone(),
                Supplied {
                    domains: item.domains,
                    subdomains: item.subdomains,
                },
            );
        }

        let series_ids: Vec<ItemId> = items
            .iter()
            .filter(|item| !item.is_collection())
            .map(|item| item.id.clone())
            .collect();
        for id in &series_ids {
            self.normalize_subdomains(id);
        }
        self.refresh_collections();
    }

    fn seed(&mut self, id: &ItemId, supplied: Supplied) {
        let mut domains = AxisDomains::placeholder();
        let mut subdomains = AxisDomains::placeholder();
        for axis in Axis::ALL {
            let domain = supplied
                .domains
                .get(axis)
                .unwrap_or_else(Domain::placeholder);
            domains.set(axis, domain);
            let subdomain = match supplied.subdomains.get(axis) {
                Some(subdomain) => {
                    self.chosen.insert((id.clone(), axis));
                    subdomain
                }
                None => copy_domain(domain, None),
            };
            subdomains.set(axis, subdomain);
        }
        debug!(item = %id, time = %domains.time, y = %domains.y, "seeded item domains");
        self.domains_by_id.insert(id.clone(), domains);
        self.subdomains_by_id.insert(id.clone(), subdomains);
    }

    fn apply_external_change(&mut self, id: &ItemId, previous: Supplied, supplied: Supplied) {
        for axis in Axis::ALL {
            let domain = supplied.domains.get(axis);
            if previous.domains.get(axis) != domain {
                let domain = domain.unwrap_or_else(Domain::placeholder);
                if let Some(tracked) = self.domains_by_id.get_mut(id) {
                    debug!(item = %id, %axis, %domain, "external domain changed");
                    tracked.set(axis, domain);
                }
            }
            let subdomain = supplied.subdomains.get(axis);
            if previous.subdomains.get(axis) == subdomain {
                continue;
            }
            match subdomain {
                Some(subdomain) => {
                    if let Some(tracked) = self.subdomains_by_id.get_mut(id) {
                        debug!(item = %id, %axis, %subdomain, "external subdomain changed");
                        tracked.set(axis, subdomain);
                    }
                    self.chosen.insert((id.clone(), axis));
                }
                None => {
                    debug!(item = %id, %axis, "external subdomain withdrawn");
                    self.chosen.shift_remove(&(id.clone(), axis));
                }
            }
        }
    }

    /// Whether the subdomain still mirrors its domain rather than a choice.
    fn follows_domain(&self, id: &ItemId, axis: Axis, current: Domain) -> bool {
        current.priority <= DomainPriority::Calculated
            || !self.chosen.contains(&(id.clone(), axis))
    }

    /// Re-seeds subdomains nobody chose from their domain and clamps the rest.
    fn normalize_subdomains(&mut self, id: &ItemId) {
        for axis in Axis::ALL {
            let (Some(own_domain), Some(current)) =
                (self.domain(id, axis), self.subdomain(id, axis))
            else {
                continue;
            };
            let next = if self.follows_domain(id, axis, current) {
                copy_domain(own_domain, None)
            } else {
                let Some(limits) = self.limits(id, axis) else {
                    trace!(item = %id, %axis, "no domain yet; leaving subdomain untouched");
                    continue;
                };
                let clamped = rescale_within(current, limits);
                if clamped.span() > 0.0 || current.span() == 0.0 {
                    clamped
                } else {
                    copy_domain(limits, Some(current.priority))
                }
            };
            if next != current {
                if let Some(subdomains) = self.subdomains_by_id.get_mut(id) {
                    subdomains.set(axis, next);
                }
            }
        }
    }

    /// Domain a subdomain must stay inside: the collection's for members.
    fn limits(&self, id: &ItemId, axis: Axis) -> Option<Domain> {
        match self.member_collection.get(id) {
            Some(collection_id) => self
                .collection_members
                .get(collection_id)
                .and_then(|members| aggregate(members, &self.domains_by_id, axis)),
            None => self
                .domain(id, axis)
                .filter(|domain| !domain.is_placeholder()),
        }
    }

    fn refresh_collections(&mut self) {
        for (collection_id, members) in &self.collection_members {
            let own = self
                .supplied
                .get(collection_id)
                .copied()
                .unwrap_or_default();
            let mut domains = AxisDomains::placeholder();
            let mut subdomains = AxisDomains::placeholder();
            for axis in Axis::ALL {
                let domain = aggregate(members, &self.domains_by_id, axis)
                    .or(own.domains.get(axis))
                    .unwrap_or_else(Domain::placeholder);
                let subdomain = aggregate(members, &self.subdomains_by_id, axis)
                    .or(own.subdomains.get(axis))
                    .unwrap_or(domain);
                domains.set(axis, domain);
                subdomains.set(axis, subdomain);
            }
            self.domains_by_id.insert(collection_id.clone(), domains);
            self.subdomains_by_id
                .insert(collection_id.clone(), subdomains);
        }
    }

    /// Replaces collection ids with their members, duplicating the change.
    ///
    /// Entries naming a series directly win over ones inherited from its
    /// collection. Unknown ids are dropped.
    fn expand(&self, patch: DomainPatch) -> DomainPatch {
        let mut expanded = DomainPatch::with_capacity(patch.len());
        let mut inherited: Vec<(ItemId, AxisPatch)> = Vec::new();
        for (id, axes) in patch {
            if let Some(members) = self.collection_members.get(&id) {
                inherited.extend(members.iter().map(|member| (member.clone(), axes)));
            } else if self.subdomains_by_id.contains_key(&id) {
                expanded.insert(id, axes);
            } else {
                trace!(item = %id, "ignoring domain change for unknown item");
            }
        }
        for (member, axes) in inherited {
            let entry = expanded.entry(member).or_default();
            for (axis, domain) in axes.iter() {
                if entry.get(axis).is_none() {
                    entry.set(axis, Some(domain));
                }
            }
        }
        expanded
    }

    /// Applies proposed subdomains and returns the expanded patch.
    ///
    /// Proposals compete with the current subdomain by priority. A change with
    /// the current span is a pan and slides back inside the limits; any other
    /// span is a zoom and is clamped bound by bound.
    pub fn update_domains(&mut self, patch: DomainPatch) -> ChartResult<DomainPatch> {
        for (id, axes) in &patch {
            for (axis, domain) in axes.iter() {
                if !domain.min.is_finite() || !domain.max.is_finite() || domain.min > domain.max {
                    return Err(ChartError::InvalidData(format!(
                        "proposed {axis} subdomain {domain} for item `{id}` is not a finite ordered range"
                    )));
                }
            }
        }

        let expanded = self.expand(patch);
        for (id, axes) in &expanded {
            for (axis, proposal) in axes.iter() {
                let Some(existing) = self.subdomain(id, axis) else {
                    continue;
                };
                let Some(mut next) = highest_priority_domain([Some(proposal), Some(existing)])
                else {
                    continue;
                };
                if axis == Axis::Time {
                    next = (self.limit_time_subdomain)(next);
                }
                let limits = self.limits(id, axis).unwrap_or_else(unbounded_limits);
                let committed = if spans_equal(next.span(), existing.span()) {
                    translate_within(next, limits)
                } else {
                    rescale_within(next, limits)
                };
                trace!(item = %id, %axis, %existing, %committed, "commit subdomain");
                if proposal.priority >= existing.priority {
                    self.chosen.insert((id.clone(), axis));
                }
                if let Some(subdomains) = self.subdomains_by_id.get_mut(id) {
                    subdomains.set(axis, committed);
                }
            }
        }
        self.refresh_collections();
        Ok(expanded)
    }

    /// Moves an item's time domain and time subdomain forward by `delta`.
    pub fn advance_time(&mut self, id: &ItemId, delta: f64) -> bool {
        let (Some(domains), Some(subdomains)) = (
            self.domains_by_id.get_mut(id),
            self.subdomains_by_id.get_mut(id),
        ) else {
            return false;
        };
        domains.time = domains.time.shifted(delta);
        subdomains.time = subdomains.time.shifted(delta);
        trace!(item = %id, delta, time = %domains.time, "advanced live window");
        true
    }

    /// Call after a batch of [`Self::advance_time`].
    pub fn refresh_aggregates(&mut self) {
        self.refresh_collections();
    }
}
