//! Progress Event Types
//!
//! Notifications emitted on every progress-job transition. The transport
//! layer serializes these as-is to whatever channel it uses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// A progress-job transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Job moved to in_progress
    Started {
        analysis_id: String,
        total_steps: u32,
        started_at: DateTime<Utc>,
    },
    /// A step was reported
    Progress {
        analysis_id: String,
        step: u32,
        total_steps: u32,
        /// `step / total_steps * 100`
        progress: f64,
        message: String,
    },
    /// Job finished successfully
    Completed {
        analysis_id: String,
        duration_secs: f64,
        result: serde_json::Value,
    },
    /// Job failed
    Failed { analysis_id: String, error: String },
}

impl ProgressEvent {
    pub fn analysis_id(&self) -> &str {
        match self {
            ProgressEvent::Started { analysis_id, .. }
            | ProgressEvent::Progress { analysis_id, .. }
            | ProgressEvent::Completed { analysis_id, .. }
            | ProgressEvent::Failed { analysis_id, .. } => analysis_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::Failed { .. }
        )
    }
}

/// Receives every progress event, synchronously, in transition order per job
///
/// Called while the job is locked: an observer must not call back into the
/// tracker for the same job.
pub trait ProgressObserver: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// Forwards events into an unbounded channel
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }

    /// Observer plus the receiving end for the transport layer
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ProgressObserver for ChannelObserver {
    fn notify(&self, event: &ProgressEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(
                analysis_id = %event.analysis_id(),
                "Progress receiver dropped, event discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::Progress {
            analysis_id: "job-1".to_string(),
            step: 1,
            total_steps: 4,
            progress: 25.0,
            message: "Counting bees".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"progress\""));
        assert!(json.contains("\"progress\":25.0"));
    }

    #[test]
    fn test_failed_event_is_terminal() {
        let event = ProgressEvent::Failed {
            analysis_id: "job-2".to_string(),
            error: "decoder crashed".to_string(),
        };
        assert!(event.is_terminal());
        assert_eq!(event.analysis_id(), "job-2");
    }

    #[tokio::test]
    async fn test_channel_observer_forwards() {
        let (observer, mut receiver) = ChannelObserver::channel();
        let event = ProgressEvent::Failed {
            analysis_id: "job-3".to_string(),
            error: "timeout".to_string(),
        };

        observer.notify(&event);
        assert_eq!(receiver.recv().await, Some(event));
    }
}
