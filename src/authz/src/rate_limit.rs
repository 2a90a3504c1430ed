//! Fixed-window per-client rate limiter
//!
//! Lock-free counters: the window start is reset with a compare-exchange and
//! increments use `fetch_add`, so concurrent requests for one key never lose
//! updates while unrelated keys proceed independently.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-key counter with its window-start timestamp (unix seconds)
#[derive(Debug)]
struct ClientWindow {
    count: AtomicU32,
    window_start: AtomicU64,
}

impl ClientWindow {
    fn new(now: u64) -> Self {
        Self {
            count: AtomicU32::new(0),
            window_start: AtomicU64::new(now),
        }
    }

    fn try_acquire(&self, now: u64, limit: u32, window_seconds: u64) -> bool {
        loop {
            let start = self.window_start.load(Ordering::Relaxed);
            let elapsed = now.saturating_sub(start);

            if elapsed >= window_seconds {
                // Window boundary crossed: whoever wins the CAS resets the counter
                if self
                    .window_start
                    .compare_exchange(start, now, Ordering::SeqCst, Ordering::Relaxed)
                    .is_ok()
                {
                    self.count.store(0, Ordering::SeqCst);
                }
                continue;
            }

            let taken = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            return taken <= limit;
        }
    }
}

/// Fixed-window request counter keyed by client (caller IP or equivalent)
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window_seconds: u64,
    windows: DashMap<String, Arc<ClientWindow>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window_seconds: window.as_secs().max(1),
            windows: DashMap::new(),
        }
    }

    /// Count one request for `key`; false once the window's limit is exceeded
    pub fn allow(&self, key: &str) -> bool {
        let now = unix_now();
        let window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(ClientWindow::new(now)))
            .clone();
        window.try_acquire(now, self.limit, self.window_seconds)
    }

    /// Drop counters unseen for two full windows; bounds memory by active
    /// client count. Called from the periodic sweep.
    pub fn evict_stale(&self) {
        let now = unix_now();
        let horizon = self.window_seconds * 2;
        self.windows.retain(|_, window| {
            now.saturating_sub(window.window_start.load(Ordering::Relaxed)) < horizon
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_enforced_within_window() {
        let window = ClientWindow::new(1_000);
        for i in 0..60 {
            assert!(window.try_acquire(1_000, 60, 60), "request {} rejected", i);
        }
        assert!(!window.try_acquire(1_000, 60, 60));
        assert!(!window.try_acquire(1_030, 60, 60));
    }

    #[test]
    fn test_next_window_resets_counter() {
        let window = ClientWindow::new(1_000);
        for _ in 0..60 {
            assert!(window.try_acquire(1_000, 60, 60));
        }
        assert!(!window.try_acquire(1_059, 60, 60));
        assert!(window.try_acquire(1_060, 60, 60));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));

        assert!(limiter.allow("10.0.0.2"));
        assert!(limiter.allow("10.0.0.2"));
        assert!(!limiter.allow("10.0.0.2"));
    }

    #[test]
    fn test_concurrent_increments_do_not_lose_updates() {
        let window = Arc::new(ClientWindow::new(unix_now()));
        let now = unix_now();
        let allowed = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let window = Arc::clone(&window);
                let allowed = Arc::clone(&allowed);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        if window.try_acquire(now, 100, 60) {
                            allowed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 attempts against a limit of 100: exactly 100 admitted
        assert_eq!(allowed.load(Ordering::SeqCst), 100);
        assert_eq!(window.count.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn test_evict_stale_drops_idle_keys() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1"));
        assert_eq!(limiter.tracked_clients(), 1);

        limiter
            .windows
            .get("10.0.0.1")
            .unwrap()
            .window_start
            .store(unix_now() - 500, Ordering::SeqCst);
        limiter.evict_stale();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_zero_limit_clamped_to_one() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
    }
}
