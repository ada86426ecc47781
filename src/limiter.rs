// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for contact submissions.
//!
//! Each client address keeps the timestamps of its accepted requests inside
//! the current window. A request is admitted while fewer than
//! `max_requests` timestamps are live; rejected requests are not recorded,
//! so quota returns as old entries slide out of the window.

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until the oldest recorded request leaves the window
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Accepted request timestamps for one address, oldest first.
#[derive(Debug, Default)]
struct Window {
    hits: VecDeque<Instant>,
}

impl Window {
    /// Drop timestamps that are no longer inside the window ending at `now`.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn reset_in(&self, now: Instant, window: Duration) -> Duration {
        self.hits
            .front()
            .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(window)
    }
}

/// Thread-safe per-address rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: RwLock<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and record a request from `ip`.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now()).await
    }

    /// Check and record a request from `ip` as if it arrived at `now`.
    ///
    /// Pruning, counting and recording happen under a single write lock.
    pub async fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let window = self.config.window_duration();
        let max = self.config.max_requests as usize;

        let mut windows = self.windows.write().await;
        let entry = windows.entry(ip).or_default();
        entry.prune(now, window);

        if entry.hits.len() < max {
            entry.hits.push_back(now);
            let remaining = (max - entry.hits.len()) as u32;
            RateLimitResult::Allowed {
                remaining,
                reset_in: entry.reset_in(now, window),
            }
        } else {
            let retry_after = entry.reset_in(now, window);
            debug!(%ip, ?retry_after, "Contact rate limit exceeded");
            RateLimitResult::Limited { retry_after }
        }
    }

    /// Number of addresses currently tracked.
    pub async fn tracked(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self) {
        self.cleanup_at(Instant::now()).await
    }

    pub async fn cleanup_at(&self, now: Instant) {
        let window = self.config.window_duration();
        let mut windows = self.windows.write().await;
        windows.retain(|_, entry| {
            entry.prune(now, window);
            !entry.hits.is_empty()
        });
    }
}
