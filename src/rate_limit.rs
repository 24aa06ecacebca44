use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Per-client submission counter for one fixed window.
#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    window_start: i64,
}

/// Fixed-window rate limiter keyed by client identifier.
///
/// A denied client stays denied until its original window expires; denial
/// never extends or resets the window. Entries for idle clients are removed
/// by the sweep, and absence of an entry is a normal state.
#[derive(Debug)]
pub struct RateLimiter {
    records: DashMap<String, RateLimitRecord>,
    window_secs: i64,
    max_per_window: u32,
}

impl RateLimiter {
    pub fn new(window_secs: i64, max_per_window: u32) -> Self {
        Self {
            records: DashMap::new(),
            window_secs,
            max_per_window,
        }
    }

    pub fn check(&self, client_id: &str) -> bool {
        self.check_at(client_id, Utc::now().timestamp())
    }

    /// Record a submission attempt at `now` (epoch seconds) and report
    /// whether it is allowed. The entry guard keeps read-modify-write on a
    /// single client atomic without blocking other clients.
    pub fn check_at(&self, client_id: &str, now: i64) -> bool {
        match self.records.entry(client_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitRecord {
                    count: 1,
                    window_start: now,
                });
                true
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if now - record.window_start > self.window_secs {
                    *record = RateLimitRecord {
                        count: 1,
                        window_start: now,
                    };
                    true
                } else if record.count >= self.max_per_window {
                    false
                } else {
                    record.count += 1;
                    true
                }
            }
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp())
    }

    /// Drop every record whose window has expired, returning how many were
    /// removed. Concurrent checks may insert while the sweep runs.
    pub fn sweep_at(&self, now: i64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| now - record.window_start <= self.window_secs);
        before.saturating_sub(self.records.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Spawn the periodic eviction task. The handle must be kept and shut
    /// down when the server stops.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(removed, "evicted expired rate-limit windows");
                }
            }
        });
        SweeperHandle { task }
    }
}

pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }
}
