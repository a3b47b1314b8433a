//! Hive Core Service
//!
//! The single entry point the transport layer talks to. `HiveCore` owns one
//! instance of every store and engine, validates inbound payloads once, and
//! returns either a success payload or a tagged [`CoreError`].
//!
//! Two observation stores back the analyses:
//!
//! - the long-horizon trend history, shared by the trend and correlation
//!   engines and fed by report generation
//! - the short-horizon data cache behind historical analysis and forecasts
//!
//! Reading both while another request for the same user appends is not
//! atomic across the two stores; the later append simply wins.

use crate::analysis::{
    CorrelationEngine, EnvironmentalReading, Forecast, HistoricalAnalysis, HistoryAnalyzer,
    KnowledgeBase, TrendEngine,
};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::progress::{ProgressJob, ProgressObserver, ProgressTracker};
use crate::report::{MediaAnalysis, Report, ReportSynthesizer};
use crate::session::{RateDecision, RateLimiter, Session, SessionRegistry, TokenDenylist};
use crate::store::{Clock, Observation, Retention, TimeRange, TtlKeyedStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::interval;

/// Entries removed by one housekeeping pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub trend_history: usize,
    pub data_cache: usize,
    pub sessions: usize,
    pub rate_windows: usize,
    pub denied_tokens: usize,
    pub progress_jobs: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.trend_history
            + self.data_cache
            + self.sessions
            + self.rate_windows
            + self.denied_tokens
            + self.progress_jobs
    }
}

pub struct HiveCore {
    config: Config,
    clock: Arc<dyn Clock>,
    trends: Arc<TrendEngine>,
    correlations: Arc<CorrelationEngine>,
    history: HistoryAnalyzer,
    synthesizer: ReportSynthesizer,
    sessions: SessionRegistry,
    rate_limiter: RateLimiter,
    denylist: TokenDenylist,
    progress: ProgressTracker,
    shutdown: AtomicBool,
}

impl HiveCore {
    /// Build every store and engine from `config`
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        config
            .validate()
            .map_err(|e| CoreError::validation(e.to_string()))?;

        let knowledge = Arc::new(config.knowledge.clone());

        let trend_history = Arc::new(TtlKeyedStore::new(
            "trend_history",
            Retention::days(config.retention.trend_history_days),
            clock.clone(),
        ));
        let data_cache = Arc::new(TtlKeyedStore::new(
            "data_cache",
            Retention::days(config.retention.data_cache_days),
            clock.clone(),
        ));

        let trends = Arc::new(TrendEngine::new(
            trend_history.clone(),
            config.trends.clone(),
            knowledge.clone(),
        ));
        let correlations = Arc::new(CorrelationEngine::new(
            trend_history,
            config.correlation.metrics.clone(),
        ));
        let history = HistoryAnalyzer::new(
            data_cache,
            config.trends.clone(),
            config.correlation.metrics.clone(),
            knowledge.clone(),
        );
        let synthesizer = ReportSynthesizer::new(
            trends.clone(),
            correlations.clone(),
            knowledge,
            config.report.id_prefix.clone(),
        );

        let sessions = SessionRegistry::new(config.session.timeout(), clock.clone());
        let rate_limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
            clock.clone(),
        );
        let denylist = TokenDenylist::new(config.denylist.default_ttl(), clock.clone());
        let progress = ProgressTracker::new(clock.clone());

        tracing::info!(
            trend_history_days = config.retention.trend_history_days,
            data_cache_days = config.retention.data_cache_days,
            "Hive core initialized"
        );

        Ok(Self {
            config,
            clock,
            trends,
            correlations,
            history,
            synthesizer,
            sessions,
            rate_limiter,
            denylist,
            progress,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.config.knowledge
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn trends(&self) -> &TrendEngine {
        &self.trends
    }

    pub fn correlations(&self) -> &CorrelationEngine {
        &self.correlations
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    // ---- Observations and reports ----

    /// Store an observation in both the trend history and the data cache
    ///
    /// Returns false when the observation is already too old for either.
    pub fn record_observation(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        metrics: BTreeMap<String, f64>,
        environmental: BTreeMap<String, f64>,
    ) -> CoreResult<bool> {
        let observation = Observation {
            user_id: user_id.to_string(),
            timestamp,
            metrics,
            environmental,
        };
        self.record(observation)
    }

    /// Store an already-built observation, keyed by its `user_id`
    pub fn record(&self, observation: Observation) -> CoreResult<bool> {
        observation.validate()?;

        let user_id = observation.user_id.clone();
        let cached = self.history.record(&user_id, observation.clone());
        let retained = self.trends.add_observation(&user_id, observation);
        Ok(cached || retained)
    }

    /// Record the current metrics and synthesize a report
    ///
    /// Only malformed input fails; missing history degrades sections of the
    /// report instead.
    pub fn generate_report(
        &self,
        user_id: &str,
        metrics: BTreeMap<String, f64>,
        media: Option<&MediaAnalysis>,
        environment: Option<&EnvironmentalReading>,
    ) -> CoreResult<Report> {
        if let Some(media) = media {
            media.validate()?;
        }
        if let Some(environment) = environment {
            environment.validate()?;
        }

        let observation = Observation {
            user_id: user_id.to_string(),
            timestamp: self.clock.now(),
            metrics,
            environmental: environment.map(|e| e.numeric()).unwrap_or_default(),
        };
        observation.validate()?;

        self.history.record(user_id, observation.clone());
        let report = self
            .synthesizer
            .generate_report(user_id, observation, media, environment);

        // Attach to a live session, if there is one
        let summary = serde_json::json!({
            "report_id": report.report_id,
            "status": report.summary.status,
            "media": media.is_some(),
        });
        if self
            .sessions
            .add_analysis_result(user_id, report.report_id.clone(), summary)
            .is_ok()
        {
            tracing::debug!(user_id = %user_id, report_id = %report.report_id, "Report attached to session");
        }

        Ok(report)
    }

    /// Summarize cached observations between `start` and `end`
    ///
    /// Open bounds default to the retained data-cache window.
    pub fn get_historical_analysis(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> CoreResult<HistoricalAnalysis> {
        validate_user(user_id)?;

        let window = TimeRange::last_days(self.clock.now(), self.config.retention.data_cache_days);
        let range = TimeRange::try_new(start.unwrap_or(window.start), end.unwrap_or(window.end))
            .ok_or_else(|| CoreError::validation("start must be earlier than end"))?;

        self.history.historical_analysis(user_id, range)
    }

    pub fn get_forecast(&self, user_id: &str) -> CoreResult<Forecast> {
        validate_user(user_id)?;
        self.history.forecast(user_id)
    }

    // ---- Admission ----

    pub fn check_rate_limit(&self, user_id: &str) -> CoreResult<RateDecision> {
        validate_user(user_id)?;
        Ok(self.rate_limiter.check(user_id))
    }

    /// Revoke `token` for `ttl`, or the configured default
    pub fn deny_token(&self, token: &str, ttl: Option<Duration>) -> CoreResult<DateTime<Utc>> {
        self.denylist
            .deny(token, ttl.unwrap_or_else(|| self.denylist.default_ttl()))
    }

    pub fn is_token_denied(&self, token: &str) -> bool {
        self.denylist.is_denied(token)
    }

    // ---- Sessions ----

    /// Start a session; a connection id is generated when none is given
    pub fn create_session(&self, user_id: &str, connection_id: Option<String>) -> CoreResult<Session> {
        validate_user(user_id)?;
        let connection_id = connection_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(self.sessions.create_session(user_id, connection_id))
    }

    pub fn get_session(&self, user_id: &str) -> CoreResult<Session> {
        self.sessions.get_session(user_id)
    }

    pub fn end_session(&self, user_id: &str) -> CoreResult<()> {
        if self.sessions.end_session(user_id) {
            Ok(())
        } else {
            Err(CoreError::not_found("session", user_id))
        }
    }

    // ---- Progress ----

    pub fn subscribe_progress(&self, observer: Arc<dyn ProgressObserver>) {
        self.progress.subscribe(observer);
    }

    pub fn track_progress(&self, analysis_id: &str, total_steps: u32) -> CoreResult<ProgressJob> {
        self.progress.start(analysis_id, total_steps)
    }

    pub fn update_progress(
        &self,
        analysis_id: &str,
        step: u32,
        message: impl Into<String>,
    ) -> CoreResult<f64> {
        self.progress.update(analysis_id, step, message)
    }

    pub fn complete_progress(&self, analysis_id: &str, result: serde_json::Value) -> CoreResult<bool> {
        self.progress.complete(analysis_id, result)
    }

    pub fn fail_progress(&self, analysis_id: &str, error: impl Into<String>) -> CoreResult<bool> {
        self.progress.fail(analysis_id, error)
    }

    pub fn get_progress(&self, analysis_id: &str) -> CoreResult<ProgressJob> {
        self.progress.get(analysis_id)
    }

    // ---- Housekeeping ----

    /// Evict expired entries from every store
    pub fn sweep(&self) -> SweepStats {
        let cutoff = self.clock.now() - self.config.progress.finished_retention();
        let stats = SweepStats {
            trend_history: self.trends.history().sweep(),
            data_cache: self.history.cache().sweep(),
            sessions: self.sessions.cleanup_expired(),
            rate_windows: self.rate_limiter.sweep(),
            denied_tokens: self.denylist.sweep(),
            progress_jobs: self.progress.purge_finished(cutoff),
        };

        if stats.total() > 0 {
            tracing::debug!(?stats, "Housekeeping sweep");
        }
        stats
    }

    /// Start the background housekeeping task
    pub fn start_housekeeping(self: &Arc<Self>, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let core = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(every);

            loop {
                ticker.tick().await;

                if core.shutdown.load(Ordering::Acquire) {
                    break;
                }

                core.sweep();
            }

            tracing::info!("Housekeeping stopped");
        })
    }

    /// Stop the housekeeping task after its next tick
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn validate_user(user_id: &str) -> CoreResult<()> {
    if user_id.trim().is_empty() {
        return Err(CoreError::validation("user_id must not be empty"));
    }
    Ok(())
}
