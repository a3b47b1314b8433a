//! Progress Tracker
//!
//! Per-job state machine for long-running analyses:
//!
//! ```text
//! pending ──start──▶ in_progress ──complete──▶ completed
//!                         │
//!                         └────────fail──────▶ failed
//! ```
//!
//! Completed and failed are terminal; completing or failing a terminal job
//! is a no-op, while starting it again begins a fresh run. Step numbers are recorded as given, so an out-of-order
//! update simply overwrites the current step.
//!
//! Jobs are never evicted by age. [`ProgressTracker::purge_finished`] drops
//! terminal jobs explicitly.

use super::events::{ProgressEvent, ProgressObserver};
use crate::error::{CoreError, CoreResult};
use crate::store::{Clock, Entry, Retention, TtlKeyedStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressMessage {
    pub step: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressJob {
    pub analysis_id: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub current_step: u32,
    pub total_steps: u32,
    pub status: JobStatus,
    pub messages: Vec<ProgressMessage>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressJob {
    fn new(analysis_id: &str, total_steps: u32, now: DateTime<Utc>) -> Self {
        Self {
            analysis_id: analysis_id.to_string(),
            created_at: now,
            started_at: None,
            current_step: 0,
            total_steps,
            status: JobStatus::Pending,
            messages: Vec::new(),
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.current_step, self.total_steps)
    }

    fn duration_secs(&self, now: DateTime<Utc>) -> f64 {
        let since = self.started_at.unwrap_or(self.created_at);
        (now - since).num_milliseconds() as f64 / 1000.0
    }
}

fn percentage(step: u32, total_steps: u32) -> f64 {
    step as f64 / total_steps as f64 * 100.0
}

pub struct ProgressTracker {
    jobs: TtlKeyedStore<String, ProgressJob>,
    observers: RwLock<Vec<Arc<dyn ProgressObserver>>>,
}

impl ProgressTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: TtlKeyedStore::new("progress", Retention::Forever, clock),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn ProgressObserver>) {
        self.observers.write().push(observer);
    }

    /// Register a job that has not started yet
    pub fn enqueue(&self, analysis_id: &str, total_steps: u32) -> CoreResult<ProgressJob> {
        validate_steps(total_steps)?;
        self.jobs.update(analysis_id.to_string(), |entries, now| {
            if !entries.is_empty() {
                return Err(CoreError::validation(format!(
                    "analysis '{}' is already tracked",
                    analysis_id
                )));
            }
            let job = ProgressJob::new(analysis_id, total_steps, now);
            entries.push(Entry {
                timestamp: now,
                value: job.clone(),
            });
            Ok(job)
        })
    }

    /// Start a pending job, or create and start a new one
    ///
    /// A finished job is replaced by a fresh run under the same id.
    pub fn start(&self, analysis_id: &str, total_steps: u32) -> CoreResult<ProgressJob> {
        validate_steps(total_steps)?;
        let job = self.jobs.update(analysis_id.to_string(), |entries, now| {
            let restart = entries
                .last()
                .map_or(true, |entry| entry.value.status.is_terminal());
            if restart {
                entries.clear();
                entries.push(Entry {
                    timestamp: now,
                    value: ProgressJob::new(analysis_id, total_steps, now),
                });
            }
            let job = &mut job_slot(entries)?.value;
            if job.status != JobStatus::Pending {
                return Err(CoreError::validation(format!(
                    "analysis '{}' has already started",
                    analysis_id
                )));
            }

            job.status = JobStatus::InProgress;
            job.started_at = Some(now);
            job.current_step = 0;
            job.total_steps = total_steps;

            self.notify(&ProgressEvent::Started {
                analysis_id: job.analysis_id.clone(),
                total_steps,
                started_at: now,
            });
            Ok(job.clone())
        })?;

        tracing::info!(analysis_id = %analysis_id, total_steps, "Analysis started");
        Ok(job)
    }

    /// Record a step; returns the new percentage
    pub fn update(&self, analysis_id: &str, step: u32, message: impl Into<String>) -> CoreResult<f64> {
        let message = message.into();
        let progress = self.with_job(analysis_id, |job, now| {
            if job.status != JobStatus::InProgress {
                return Err(CoreError::validation(format!(
                    "analysis '{}' is not in progress",
                    analysis_id
                )));
            }

            job.current_step = step;
            job.messages.push(ProgressMessage {
                step,
                message: message.clone(),
                timestamp: now,
            });
            let progress = job.percentage();
            let event = ProgressEvent::Progress {
                analysis_id: analysis_id.to_string(),
                step,
                total_steps: job.total_steps,
                progress,
                message,
            };
            Ok((progress, Some(event)))
        })?;

        tracing::debug!(analysis_id = %analysis_id, step, progress, "Analysis progress");
        Ok(progress)
    }

    /// Mark the job completed; false if it was already terminal
    pub fn complete(&self, analysis_id: &str, result: serde_json::Value) -> CoreResult<bool> {
        let finished = self.with_job(analysis_id, |job, now| {
            if job.status.is_terminal() {
                return Ok((false, None));
            }
            job.status = JobStatus::Completed;
            job.finished_at = Some(now);
            job.result = Some(result.clone());
            let event = ProgressEvent::Completed {
                analysis_id: analysis_id.to_string(),
                duration_secs: job.duration_secs(now),
                result,
            };
            Ok((true, Some(event)))
        })?;

        log_finish(analysis_id, finished);
        Ok(finished)
    }

    /// Mark the job failed; false if it was already terminal
    pub fn fail(&self, analysis_id: &str, error: impl Into<String>) -> CoreResult<bool> {
        let error = error.into();
        let finished = self.with_job(analysis_id, |job, now| {
            if job.status.is_terminal() {
                return Ok((false, None));
            }
            job.status = JobStatus::Failed;
            job.finished_at = Some(now);
            job.error = Some(error.clone());
            let event = ProgressEvent::Failed {
                analysis_id: analysis_id.to_string(),
                error,
            };
            Ok((true, Some(event)))
        })?;

        log_finish(analysis_id, finished);
        Ok(finished)
    }

    pub fn get(&self, analysis_id: &str) -> CoreResult<ProgressJob> {
        self.jobs
            .entries(analysis_id, None)
            .pop()
            .map(|entry| entry.value)
            .ok_or_else(|| CoreError::not_found("analysis", analysis_id))
    }

    /// Drop terminal jobs that finished before `cutoff`
    pub fn purge_finished(&self, cutoff: DateTime<Utc>) -> usize {
        let mut purged = 0;
        for key in self.jobs.keys() {
            purged += self
                .jobs
                .update_existing(&key, |entries, _| {
                    let before = entries.len();
                    entries.retain(|entry| {
                        !(entry.value.status.is_terminal()
                            && entry.value.finished_at.is_some_and(|at| at < cutoff))
                    });
                    before - entries.len()
                })
                .unwrap_or(0);
        }

        if purged > 0 {
            tracing::debug!(purged, "Purged finished analyses");
        }
        purged
    }

    pub fn tracked(&self) -> usize {
        self.jobs.key_count()
    }

    /// Apply `f` to the job under its key lock and notify observers of the
    /// resulting event before the lock is released
    fn with_job<R>(
        &self,
        analysis_id: &str,
        f: impl FnOnce(&mut ProgressJob, DateTime<Utc>) -> CoreResult<(R, Option<ProgressEvent>)>,
    ) -> CoreResult<R> {
        self.jobs
            .update_existing(analysis_id, |entries, now| {
                let (value, event) = job_slot(entries).and_then(|entry| f(&mut entry.value, now))?;
                if let Some(event) = event {
                    self.notify(&event);
                }
                Ok(value)
            })
            .unwrap_or_else(|| Err(CoreError::not_found("analysis", analysis_id)))
    }

    /// Runs while the job's key is locked, so events for one job are
    /// delivered in transition order
    fn notify(&self, event: &ProgressEvent) {
        for observer in self.observers.read().iter() {
            observer.notify(event);
        }
    }
}

fn log_finish(analysis_id: &str, finished: bool) {
    if finished {
        tracing::info!(analysis_id = %analysis_id, "Analysis finished");
    } else {
        tracing::debug!(analysis_id = %analysis_id, "Analysis already finished, ignoring");
    }
}

fn job_slot(entries: &mut [Entry<ProgressJob>]) -> CoreResult<&mut Entry<ProgressJob>> {
    entries
        .last_mut()
        .ok_or_else(|| CoreError::Internal("progress slot without a job".to_string()))
}

fn validate_steps(total_steps: u32) -> CoreResult<()> {
    if total_steps == 0 {
        return Err(CoreError::validation("total_steps must be at least 1"));
    }
    Ok(())
}
