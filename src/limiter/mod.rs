//! Per-client fixed-window rate limiting.
//!
//! [`RateLimitTracker`] keeps one [`RateLimitWindow`] per [`ClientIdentity`] in
//! a sharded [`DashMap`]. Every check runs under the entry lock for its key, so
//! concurrent checks for the same client cannot lose updates, while checks for
//! different clients proceed independently.
//!
//! A window opens on a client's first request (or the first request after the
//! previous window elapsed) and admits up to `limit` requests. Rejected
//! requests do not advance the counter.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

mod identity;

pub use identity::ClientIdentity;

/// Limit and window length applied to every client of a tracker check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }
}

/// Outcome of a single admission check.
///
/// `remaining` is always within `[0, limit]`; `reset_seconds` counts down to
/// the start of the next window and is never an absolute timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_seconds: u64,
}

/// Accounting state for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub client_id: ClientIdentity,
    pub window_start: Instant,
    pub count: u32,
    pub limit: u32,
    pub window_duration_seconds: u64,
}

impl RateLimitWindow {
    // Opens a window with the current request already counted. A zero limit
    // admits nothing, so the count stays at zero.
    fn open(
        client_id: ClientIdentity,
        now: Instant,
        limit: u32,
        window_seconds: u64,
    ) -> (Self, RateLimitResult) {
        let count = limit.min(1);
        let window = Self {
            client_id,
            window_start: now,
            count,
            limit,
            window_duration_seconds: window_seconds,
        };
        let result = RateLimitResult {
            admitted: count == 1,
            limit,
            remaining: limit - count,
            reset_seconds: window_seconds,
        };
        (window, result)
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(self.window_duration_seconds)
    }

    /// Returns `true` once `now` has reached `window_start + duration`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.duration()
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn reset_seconds(&self, now: Instant) -> u64 {
        let left = self
            .duration()
            .saturating_sub(now.saturating_duration_since(self.window_start));
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }

    fn record(&mut self, now: Instant, limit: u32) -> RateLimitResult {
        self.limit = limit;
        let admitted = self.count < limit;
        if admitted {
            self.count += 1;
        } else {
            self.count = self.count.min(limit);
        }
        RateLimitResult {
            admitted,
            limit,
            remaining: limit.saturating_sub(self.count),
            reset_seconds: self.reset_seconds(now),
        }
    }
}

/// Keyed store of rate-limit windows.
///
/// `C` is the time source used by [`check_now`](Self::check_now) and
/// [`evict_expired`](Self::evict_expired); [`check`](Self::check) takes the
/// instant explicitly.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use rttp_guard::{ClientIdentity, RateLimitTracker};
///
/// let tracker = RateLimitTracker::default();
/// let client = ClientIdentity::new("token:abc");
/// let t0 = Instant::now();
///
/// let admitted: Vec<bool> = [0, 10, 20, 70]
///     .into_iter()
///     .map(|s| tracker.check(&client, 2, 60, t0 + Duration::from_secs(s)).admitted)
///     .collect();
/// assert_eq!(admitted, [true, true, false, true]);
/// ```
#[derive(Debug)]
pub struct RateLimitTracker<C = SystemClock>
where
    C: Clock,
{
    windows: DashMap<ClientIdentity, RateLimitWindow>,
    clock: C,
}

impl Default for RateLimitTracker<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C> RateLimitTracker<C>
where
    C: Clock,
{
    pub fn new(clock: C) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
        }
    }

    /// Records a request from `client` at `now` and decides whether to admit it.
    ///
    /// Never fails: a missing or elapsed window simply opens a new one.
    pub fn check(
        &self,
        client: &ClientIdentity,
        limit: u32,
        window_seconds: u64,
        now: Instant,
    ) -> RateLimitResult {
        match self.windows.entry(client.clone()) {
            Entry::Vacant(slot) => {
                let (window, result) =
                    RateLimitWindow::open(client.clone(), now, limit, window_seconds);
                debug!(client = %client, limit, window_seconds, "opened rate-limit window");
                slot.insert(window);
                result
            }
            Entry::Occupied(mut slot) => {
                let window = slot.get_mut();
                window.window_duration_seconds = window_seconds;
                if window.is_expired(now) {
                    let (fresh, result) =
                        RateLimitWindow::open(client.clone(), now, limit, window_seconds);
                    debug!(client = %client, previous = window.count, "rate-limit window reset");
                    *window = fresh;
                    result
                } else {
                    window.record(now, limit)
                }
            }
        }
    }

    /// [`check`](Self::check) at the tracker clock's current instant.
    pub fn check_now(&self, client: &ClientIdentity, policy: &RateLimitPolicy) -> RateLimitResult {
        self.check(client, policy.limit, policy.window_seconds, self.clock.now())
    }

    /// Snapshot of the stored window for `client`, if one exists.
    pub fn window(&self, client: &ClientIdentity) -> Option<RateLimitWindow> {
        self.windows.get(client).map(|entry| entry.value().clone())
    }

    /// Drops every window that has elapsed. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.is_expired(now));
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "evicted expired rate-limit windows");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl<C> RateLimitTracker<C>
where
    C: Clock + 'static,
{
    /// Spawns a tokio task that calls [`evict_expired`](Self::evict_expired)
    /// every `every`. The task holds only a weak reference and exits once the
    /// tracker is dropped.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `every` is zero. [`ThrottleConfig::eviction_interval`]
    /// never yields a zero period.
    ///
    /// [`ThrottleConfig::eviction_interval`]: crate::ThrottleConfig::eviction_interval
    pub fn spawn_evictor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        assert!(!every.is_zero(), "eviction period must be non-zero");
        let tracker: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(tracker) = tracker.upgrade() else {
                    debug!("rate-limit tracker dropped; evictor exiting");
                    break;
                };
                tracker.evict_expired();
            }
        })
    }
}
