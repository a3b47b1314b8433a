//! Session Registry
//!
//! One session per user, expiring after a period of inactivity. Every access
//! through the registry refreshes `last_activity`; the first access after the
//! timeout finds nothing and the expired session is dropped.

use crate::error::{CoreError, CoreResult};
use crate::store::{Clock, Entry, Retention, TtlKeyedStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded exchange with the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub kind: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A completed analysis attached to the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub summary: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub connection_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub history: Vec<Interaction>,
    pub context: BTreeMap<String, serde_json::Value>,
    pub analysis_results: Vec<AnalysisRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub duration_secs: i64,
    pub interaction_count: usize,
    pub media_analyses: usize,
    pub last_activity: DateTime<Utc>,
}

pub struct SessionRegistry {
    sessions: TtlKeyedStore<String, Session>,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: TtlKeyedStore::new("sessions", Retention::Window(timeout), clock),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a session, replacing any existing one for the user
    pub fn create_session(&self, user_id: &str, connection_id: impl Into<String>) -> Session {
        let now = self.sessions.now();
        let session = Session {
            user_id: user_id.to_string(),
            connection_id: connection_id.into(),
            created_at: now,
            last_activity: now,
            history: Vec::new(),
            context: BTreeMap::new(),
            analysis_results: Vec::new(),
        };
        self.sessions
            .replace(user_id.to_string(), session.clone(), now);

        tracing::info!(user_id = %user_id, connection_id = %session.connection_id, "Session created");
        session
    }

    /// Current session, refreshing its activity
    pub fn get_session(&self, user_id: &str) -> CoreResult<Session> {
        self.touch(user_id, |session, _| session.clone())
    }

    /// End the session; false if there was no live session
    pub fn end_session(&self, user_id: &str) -> bool {
        let ended = !self.sessions.remove(user_id).is_empty();
        if ended {
            tracing::info!(user_id = %user_id, "Session ended");
        }
        ended
    }

    pub fn add_to_history(
        &self,
        user_id: &str,
        kind: impl Into<String>,
        content: impl Into<String>,
    ) -> CoreResult<()> {
        let (kind, content) = (kind.into(), content.into());
        self.touch(user_id, |session, now| {
            session.history.push(Interaction {
                kind,
                content,
                timestamp: now,
            })
        })
    }

    pub fn add_analysis_result(
        &self,
        user_id: &str,
        analysis_id: impl Into<String>,
        summary: serde_json::Value,
    ) -> CoreResult<()> {
        let analysis_id = analysis_id.into();
        self.touch(user_id, |session, now| {
            session.analysis_results.push(AnalysisRecord {
                analysis_id,
                summary,
                timestamp: now,
            })
        })
    }

    pub fn update_context(
        &self,
        user_id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> CoreResult<()> {
        let key = key.into();
        self.touch(user_id, |session, _| {
            session.context.insert(key, value);
        })
    }

    pub fn session_summary(&self, user_id: &str) -> CoreResult<SessionSummary> {
        self.touch(user_id, |session, now| SessionSummary {
            duration_secs: (now - session.created_at).num_seconds(),
            interaction_count: session.history.len(),
            media_analyses: session.analysis_results.len(),
            last_activity: session.last_activity,
        })
    }

    /// Drop every expired session; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.sessions.sweep();
        if removed > 0 {
            tracing::info!(removed, "Expired sessions cleaned up");
        }
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.key_count()
    }

    /// Run `f` on the live session, refreshing `last_activity` first
    fn touch<R>(&self, user_id: &str, f: impl FnOnce(&mut Session, DateTime<Utc>) -> R) -> CoreResult<R> {
        self.sessions
            .update_existing(user_id, |entries: &mut Vec<Entry<Session>>, now| {
                let entry = entries.last_mut()?;
                entry.timestamp = now;
                entry.value.last_activity = now;
                Some(f(&mut entry.value, now))
            })
            .flatten()
            .ok_or_else(|| CoreError::not_found("session", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;
    use chrono::TimeZone;

    fn registry() -> (Arc<ManualClock>, SessionRegistry) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
        ));
        let registry = SessionRegistry::new(Duration::minutes(60), clock.clone());
        (clock, registry)
    }

    #[test]
    fn test_session_expires_after_timeout() {
        let (clock, registry) = registry();
        registry.create_session("alice", "conn-1");

        clock.advance(Duration::minutes(61));
        assert_eq!(
            registry.get_session("alice").unwrap_err(),
            CoreError::not_found("session", "alice")
        );
        assert_eq!(registry.active_sessions(), 0);
    }

    #[test]
    fn test_access_refreshes_activity() {
        let (clock, registry) = registry();
        registry.create_session("alice", "conn-1");

        clock.advance(Duration::minutes(45));
        registry.add_to_history("alice", "question", "How is my hive?").unwrap();

        clock.advance(Duration::minutes(45));
        let session = registry.get_session("alice").unwrap();
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.last_activity, clock.now());
    }

    #[test]
    fn test_create_replaces_existing_session() {
        let (_, registry) = registry();
        registry.create_session("alice", "conn-1");
        registry.add_to_history("alice", "question", "hello").unwrap();

        registry.create_session("alice", "conn-2");
        let session = registry.get_session("alice").unwrap();
        assert_eq!(session.connection_id, "conn-2");
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let (clock, registry) = registry();
        registry.create_session("bob", "conn-9");
        registry.add_to_history("bob", "question", "a").unwrap();
        registry.add_to_history("bob", "answer", "b").unwrap();
        registry
            .add_analysis_result("bob", "job-1", serde_json::json!({"bee_count": 31}))
            .unwrap();
        registry
            .update_context("bob", "hive_type", serde_json::json!("modern"))
            .unwrap();

        clock.advance(Duration::minutes(5));
        let summary = registry.session_summary("bob").unwrap();
        assert_eq!(summary.duration_secs, 300);
        assert_eq!(summary.interaction_count, 2);
        assert_eq!(summary.media_analyses, 1);

        let session = registry.get_session("bob").unwrap();
        assert_eq!(session.context["hive_type"], "modern");
    }

    #[test]
    fn test_operations_on_missing_session() {
        let (_, registry) = registry();
        assert!(registry.add_to_history("nobody", "q", "x").is_err());
        assert!(registry.session_summary("nobody").is_err());
        assert!(!registry.end_session("nobody"));
    }

    #[test]
    fn test_cleanup_expired() {
        let (clock, registry) = registry();
        registry.create_session("alice", "conn-1");
        registry.create_session("bob", "conn-2");

        clock.advance(Duration::minutes(30));
        registry.get_session("bob").unwrap();
        clock.advance(Duration::minutes(31));

        assert_eq!(registry.cleanup_expired(), 1);
        assert!(registry.get_session("bob").is_ok());
        assert!(registry.end_session("bob"));
    }
}
