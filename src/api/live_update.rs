use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::debug;

use crate::core::ItemId;

use super::Item;

#[derive(Debug, Clone, Copy, PartialEq)]
struct LiveTimer {
    interval: Duration,
    next_tick: Instant,
}

/// Advance owed to one item after [`LiveUpdateScheduler::take_due`].
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTick {
    pub item_id: ItemId,
    pub ticks: u32,
    /// Total time-axis shift in milliseconds.
    pub delta_ms: f64,
}

/// One repeating timer per live-updating series.
#[derive(Debug, Default)]
pub struct LiveUpdateScheduler {
    timers: IndexMap<ItemId, LiveTimer>,
}

impl LiveUpdateScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates, recreates or clears timers to match the item list.
    ///
    /// A changed interval restarts the timer from `now`.
    pub fn sync<D>(&mut self, items: &[Item<D>], now: Instant) {
        let mut next = IndexMap::with_capacity(self.timers.len());
        for item in items.iter().filter(|item| !item.is_collection()) {
            let Some(interval) = item.live_interval() else {
                continue;
            };
            let timer = match self.timers.get(&item.id) {
                Some(existing) if existing.interval == interval => *existing,
                Some(_) | None => {
                    debug!(
                        item = %item.id,
                        interval_ms = interval_ms(interval),
                        "started live-update timer"
                    );
                    LiveTimer {
                        interval,
                        next_tick: now + interval,
                    }
                }
            };
            next.insert(item.id.clone(), timer);
        }
        for id in self.timers.keys().filter(|id| !next.contains_key(*id)) {
            debug!(item = %id, "cleared live-update timer");
        }
        self.timers = next;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    #[must_use]
    pub fn interval(&self, id: &ItemId) -> Option<Duration> {
        self.timers.get(id).map(|timer| timer.interval)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.next_tick).min()
    }

    /// Collects every elapsed tick up to `now` and reschedules the timers.
    pub fn take_due(&mut self, now: Instant) -> Vec<LiveTick> {
        let mut due = Vec::new();
        for (id, timer) in &mut self.timers {
            let mut ticks = 0_u32;
            while timer.next_tick <= now {
                timer.next_tick += timer.interval;
                ticks += 1;
            }
            if ticks > 0 {
                due.push(LiveTick {
                    item_id: id.clone(),
                    ticks,
                    delta_ms: interval_ms(timer.interval) * f64::from(ticks),
                });
            }
        }
        due
    }
}

fn interval_ms(interval: Duration) -> f64 {
    interval.as_nanos() as f64 / 1_000_000.0
}
