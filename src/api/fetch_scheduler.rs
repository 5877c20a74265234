use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::trace;

use crate::core::{Domain, ItemId};

use super::FetchReason;

/// Start of the most recent fetch for an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestRecord {
    pub started_at: Instant,
    pub time_subdomain: Domain,
}

/// Explicit debounce/throttle state of one item.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FetchSlot {
    /// End of the current debounce window, if one is open.
    window_ends: Option<Instant>,
    /// Reason of the latest call swallowed inside the window.
    trailing: Option<FetchReason>,
    request: Option<RequestRecord>,
}

/// Per-item leading-edge debounce plus a hard wall-clock throttle.
///
/// The first call outside a window fires immediately and opens a window of
/// `debounce`. Calls inside the window push its end out and coalesce into
/// a single trailing call when it closes. Independently, a fetch is refused
/// while the previous one started less than `throttle` ago; the refused call
/// becomes the trailing call of a window that ends when the throttle lifts.
#[derive(Debug)]
pub struct FetchScheduler {
    debounce: Duration,
    throttle: Duration,
    slots: IndexMap<ItemId, FetchSlot>,
}

impl FetchScheduler {
    #[must_use]
    pub fn new(debounce: Duration, throttle: Duration) -> Self {
        Self {
            debounce,
            throttle,
            slots: IndexMap::new(),
        }
    }

    /// Routes a fetch request through the debouncer.
    ///
    /// Returns the reason when the call should be invoked right away.
    pub fn call(&mut self, id: &ItemId, reason: FetchReason, now: Instant) -> Option<FetchReason> {
        let slot = self.slots.entry(id.clone()).or_default();
        match slot.window_ends {
            Some(ends) if ends > now => {
                slot.window_ends = Some(now + self.debounce);
                slot.trailing = Some(reason);
                trace!(item = %id, ?reason, "coalesced fetch into trailing edge");
                None
            }
            _ => {
                slot.window_ends = Some(now + self.debounce);
                slot.trailing = None;
                Some(reason)
            }
        }
    }

    /// Closes elapsed windows and returns their trailing calls.
    pub fn take_due(&mut self, now: Instant) -> Vec<(ItemId, FetchReason)> {
        let mut due = Vec::new();
        for (id, slot) in &mut self.slots {
            let Some(ends) = slot.window_ends else {
                continue;
            };
            if ends > now {
                continue;
            }
            slot.window_ends = None;
            if let Some(reason) = slot.trailing.take() {
                due.push((id.clone(), reason));
            }
        }
        due
    }

    /// Applies the throttle and, when allowed, records the fetch start.
    ///
    /// A refused call is kept as the slot's trailing call, due once the
    /// throttle has elapsed, so the latest window is always fetched.
    pub fn try_begin(
        &mut self,
        id: &ItemId,
        reason: FetchReason,
        time_subdomain: Domain,
        now: Instant,
    ) -> bool {
        let slot = self.slots.entry(id.clone()).or_default();
        if let Some(request) = slot.request {
            let allowed_at = request.started_at + self.throttle;
            if now < allowed_at {
                slot.trailing = Some(reason);
                slot.window_ends = Some(
                    slot.window_ends
                        .map_or(allowed_at, |ends| ends.max(allowed_at)),
                );
                trace!(item = %id, ?reason, "fetch throttled, deferred to trailing edge");
                return false;
            }
        }
        slot.request = Some(RequestRecord {
            started_at: now,
            time_subdomain,
        });
        true
    }

    #[must_use]
    pub fn request(&self, id: &ItemId) -> Option<RequestRecord> {
        self.slots.get(id).and_then(|slot| slot.request)
    }

    /// Drops the request record so the next fetch is neither throttled nor
    /// considered a repeat.
    pub fn forget_request(&mut self, id: &ItemId) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.request = None;
        }
    }

    /// Cancels pending windows and records of items no longer registered.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&ItemId) -> bool,
    {
        self.slots.retain(|id, _| keep(id));
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .filter(|slot| slot.trailing.is_some())
            .filter_map(|slot| slot.window_ends)
            .min()
    }

    #[must_use]
    pub fn has_pending(&self, id: &ItemId) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| slot.trailing.is_some())
    }
}
