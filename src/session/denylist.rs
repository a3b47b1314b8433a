//! Token Denylist
//!
//! Revoked tokens, each held until its own expiry. Entries are stamped with
//! the expiry instant and the store keeps them under zero retention, so a
//! token is denied iff `now < expires_at`.

use crate::error::{CoreError, CoreResult};
use crate::store::{Clock, Entry, Retention, TtlKeyedStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub struct TokenDenylist {
    tokens: TtlKeyedStore<String, ()>,
    default_ttl: Duration,
}

impl TokenDenylist {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: TtlKeyedStore::new("denylist", Retention::Window(Duration::zero()), clock),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Deny `token` for `ttl` from now
    pub fn deny(&self, token: &str, ttl: Duration) -> CoreResult<DateTime<Utc>> {
        let expires_at = self.tokens.now() + ttl;
        self.deny_until(token, expires_at)?;
        Ok(expires_at)
    }

    /// Deny `token` until `expires_at`
    ///
    /// Returns false when `expires_at` has already passed; nothing is stored.
    /// A later expiry replaces an earlier one and vice versa.
    pub fn deny_until(&self, token: &str, expires_at: DateTime<Utc>) -> CoreResult<bool> {
        if token.trim().is_empty() {
            return Err(CoreError::validation("token must not be empty"));
        }

        let stored = self.tokens.update(token.to_string(), |entries, now| {
            entries.clear();
            if now < expires_at {
                entries.push(Entry {
                    timestamp: expires_at,
                    value: (),
                });
                true
            } else {
                false
            }
        });

        tracing::debug!(%expires_at, stored, "Token denied");
        Ok(stored)
    }

    /// Whether `token` is currently denied; expired entries are dropped
    pub fn is_denied(&self, token: &str) -> bool {
        self.tokens.len(token) > 0
    }

    /// Expiry instant of a denied token
    pub fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        self.tokens
            .entries(token, None)
            .into_iter()
            .map(|entry| entry.timestamp)
            .max()
    }

    pub fn sweep(&self) -> usize {
        self.tokens.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;
    use chrono::TimeZone;

    fn denylist() -> (Arc<ManualClock>, TokenDenylist) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap(),
        ));
        let denylist = TokenDenylist::new(Duration::days(30), clock.clone());
        (clock, denylist)
    }

    #[test]
    fn test_token_denied_until_expiry() {
        let (clock, denylist) = denylist();
        let expires_at = denylist.deny("tok-1", Duration::hours(2)).unwrap();

        assert!(denylist.is_denied("tok-1"));
        assert_eq!(denylist.expires_at("tok-1"), Some(expires_at));

        clock.advance(Duration::hours(2) - Duration::seconds(1));
        assert!(denylist.is_denied("tok-1"));

        clock.advance(Duration::seconds(1));
        assert!(!denylist.is_denied("tok-1"));
        assert_eq!(denylist.expires_at("tok-1"), None);
    }

    #[test]
    fn test_past_expiry_is_not_stored() {
        let (clock, denylist) = denylist();
        let stored = denylist
            .deny_until("tok-2", clock.now() - Duration::minutes(1))
            .unwrap();
        assert!(!stored);
        assert!(!denylist.is_denied("tok-2"));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let (_, denylist) = denylist();
        assert!(matches!(
            denylist.deny("  ", Duration::days(1)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_sweep_removes_expired_tokens() {
        let (clock, denylist) = denylist();
        denylist.deny("short", Duration::minutes(5)).unwrap();
        denylist.deny("long", denylist.default_ttl()).unwrap();

        clock.advance(Duration::minutes(10));
        assert_eq!(denylist.sweep(), 1);
        assert!(denylist.is_denied("long"));
    }
}
