use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;
use tokio::task::JoinHandle;

/// Time source for the limiter, injectable so window expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.origin + offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in: Duration,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// RateLimiter
///
/// Fixed-window counter per client key. The first request from a key opens a
/// window of `window` length; once `max_requests` have been admitted, further
/// requests are refused until the window ends.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window,
            clock,
            windows: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        let reset_in = entry.reset_at.saturating_duration_since(now);
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            reset_in,
        }
    }

    /// Drops expired windows. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        // Counted inside the predicate: `check` may insert keys while this runs.
        self.windows.retain(|_, w| {
            let keep = w.reset_at > now;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Runs `sweep` every `every` for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "rate limit windows swept");
                }
            }
        })
    }
}

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Client identity for rate limiting: first `x-forwarded-for` hop, then
/// `x-real-ip`, then a shared `"unknown"` bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return first.to_string();
        }
    }
    header("x-real-ip")
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

pub type RateLimiterState = Arc<RateLimiter>;
