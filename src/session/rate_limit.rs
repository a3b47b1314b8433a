//! Sliding-window rate limiter
//!
//! Each user has a window of recent request instants. A request is admitted
//! when fewer than `max_requests` instants remain after expired ones are
//! dropped; denied requests are not recorded.

use crate::store::{Clock, Entry, Retention, TtlKeyedStore};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RateDecision {
    Allowed { remaining: usize },
    Denied { retry_after_secs: i64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

pub struct RateLimiter {
    requests: TtlKeyedStore<String, ()>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: TtlKeyedStore::new("rate_limit", Retention::Window(window), clock),
            max_requests,
            window,
        }
    }

    /// Admit or deny one request for `user_id`
    ///
    /// The prune, count and append run atomically under the user's lock.
    pub fn check(&self, user_id: &str) -> RateDecision {
        let (max_requests, window) = (self.max_requests, self.window);
        let decision = self.requests.update(user_id.to_string(), |entries, now| {
            if entries.len() >= max_requests {
                let oldest = entries.iter().map(|e| e.timestamp).min().unwrap_or(now);
                let wait = oldest + window - now;
                // Round partial seconds up so a retry at that point succeeds
                let retry_after_secs = (wait.num_milliseconds() + 999) / 1000;
                return RateDecision::Denied {
                    retry_after_secs: retry_after_secs.max(0),
                };
            }

            entries.push(Entry {
                timestamp: now,
                value: (),
            });
            RateDecision::Allowed {
                remaining: max_requests - entries.len(),
            }
        });

        if let RateDecision::Denied { retry_after_secs } = decision {
            tracing::warn!(user_id = %user_id, retry_after_secs, "Rate limit exceeded");
        }
        decision
    }

    /// Requests currently counted against `user_id`
    pub fn in_window(&self, user_id: &str) -> usize {
        self.requests.len(user_id)
    }

    pub fn sweep(&self) -> usize {
        self.requests.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::thread;

    fn limiter(max: usize) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap(),
        ));
        let limiter = RateLimiter::new(max, Duration::seconds(60), clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_fourth_request_in_window_is_denied() {
        let (clock, limiter) = limiter(3);

        assert_eq!(limiter.check("alice"), RateDecision::Allowed { remaining: 2 });
        clock.advance(Duration::seconds(10));
        assert_eq!(limiter.check("alice"), RateDecision::Allowed { remaining: 1 });
        clock.advance(Duration::seconds(10));
        assert_eq!(limiter.check("alice"), RateDecision::Allowed { remaining: 0 });

        clock.advance(Duration::seconds(10));
        assert_eq!(
            limiter.check("alice"),
            RateDecision::Denied { retry_after_secs: 30 }
        );
        assert_eq!(limiter.in_window("alice"), 3);

        clock.advance(Duration::seconds(61));
        assert!(limiter.check("alice").is_allowed());
    }

    #[test]
    fn test_users_are_limited_independently() {
        let (_, limiter) = limiter(1);
        assert!(limiter.check("alice").is_allowed());
        assert!(!limiter.check("alice").is_allowed());
        assert!(limiter.check("bob").is_allowed());
    }

    #[test]
    fn test_concurrent_checks_never_overadmit() {
        let (_, limiter) = limiter(50);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || (0..20).filter(|_| limiter.check("hive").is_allowed()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
