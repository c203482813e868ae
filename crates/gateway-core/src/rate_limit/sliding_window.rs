use crate::rate_limit::{LimitOutcome, LimitPrimitive};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Sliding-window counter keyed by client identity.
///
/// Each key keeps the count of the current fixed window and the previous one; the estimate is
/// the current count plus the previous count weighted by how much of it still overlaps the
/// sliding window. Refused calls are not counted.
///
/// **Security**: Limits maximum tracked keys to prevent OOM from spoofed identities. New keys
/// beyond the bound are refused.
pub struct SlidingWindowLimiter {
    windows: Arc<DashMap<String, WindowState>>,
    limit: u32,
    period: Duration,
    epoch: Instant,
    cleanup_interval: Duration,
    max_keys: usize,
}

#[derive(Debug, Clone)]
struct WindowState {
    window_index: u64,
    current: u32,
    previous: u32,
    last_access: Instant,
}

impl SlidingWindowLimiter {
    const DEFAULT_MAX_KEYS: usize = 100_000;

    #[must_use]
    pub fn new(limit: u32, period: Duration) -> Self {
        Self::with_max_keys(limit, period, Self::DEFAULT_MAX_KEYS)
    }

    #[must_use]
    pub fn with_max_keys(limit: u32, period: Duration, max_keys: usize) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            windows: Arc::new(DashMap::new()),
            limit,
            period,
            epoch: Instant::now(),
            cleanup_interval: period.min(Duration::from_secs(300)),
            max_keys,
        }
    }

    /// Periodically drops keys idle for two full windows; they no longer affect any estimate.
    pub fn start_cleanup_task(&self) {
        let cleanup_interval = self.cleanup_interval;
        let idle_ttl = self.period * 2;
        let windows = self.windows.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                interval.tick().await;

                let now = Instant::now();
                windows.retain(|_, state| now.duration_since(state.last_access) < idle_ttl);
            }
        });
    }

    /// Counts one call for `key`. Returns false when the call exceeds the window budget or the
    /// key cannot be tracked.
    #[must_use]
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let (window_index, progress) = self.position(now);

        if let Some(mut state) = self.windows.get_mut(key) {
            return Self::process_existing_window(
                &mut state,
                now,
                window_index,
                progress,
                self.limit,
            );
        }

        if self.windows.len() >= self.max_keys {
            return false;
        }

        let mut state = self.windows.entry(key.to_string()).or_insert_with(|| WindowState {
            window_index,
            current: 0,
            previous: 0,
            last_access: now,
        });

        Self::process_existing_window(&mut state, now, window_index, progress, self.limit)
    }

    /// Index of the fixed window containing `now`, and the fraction of it already elapsed.
    fn position(&self, now: Instant) -> (u64, f64) {
        let elapsed = now.duration_since(self.epoch).as_nanos();
        let period = self.period.as_nanos();
        let index = u64::try_from(elapsed / period).unwrap_or(u64::MAX);
        #[allow(clippy::cast_precision_loss)]
        let progress = (elapsed % period) as f64 / period as f64;
        (index, progress)
    }

    fn process_existing_window(
        state: &mut WindowState,
        now: Instant,
        window_index: u64,
        progress: f64,
        limit: u32,
    ) -> bool {
        state.last_access = now;

        if window_index > state.window_index {
            state.previous =
                if window_index == state.window_index + 1 { state.current } else { 0 };
            state.current = 0;
            state.window_index = window_index;
        }

        let estimate = f64::from(state.previous) * (1.0 - progress) + f64::from(state.current);
        if estimate + 1.0 > f64::from(limit) {
            return false;
        }

        state.current += 1;
        true
    }

    #[must_use]
    pub fn cleanup_idle_keys(&self) -> usize {
        let now = Instant::now();
        let idle_ttl = self.period * 2;
        let before_count = self.windows.len();

        self.windows.retain(|_, state| now.duration_since(state.last_access) < idle_ttl);

        before_count - self.windows.len()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl LimitPrimitive for SlidingWindowLimiter {
    async fn limit(&self, identity: &str) -> LimitOutcome {
        LimitOutcome { success: self.check(identity) }
    }
}
