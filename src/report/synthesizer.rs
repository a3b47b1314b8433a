//! Report Synthesizer
//!
//! Orchestrates one report request: records the observation, runs the trend
//! and correlation engines, folds in external findings, and merges every
//! recommendation source into a single ranked list.
//!
//! Reading the history and recording the new observation are separate store
//! operations; a concurrent request for the same user may interleave between
//! them. The report is still complete, it just may or may not include the
//! other request's observation.

use super::types::{DegradedSection, MediaAnalysis, MediaSection, Report, ReportSummary, TrendSection};
use crate::analysis::correlations::CorrelationEngine;
use crate::analysis::environment::{analyze_environment, EnvironmentalReading};
use crate::analysis::knowledge::KnowledgeBase;
use crate::analysis::recommendations::{merge, Priority, Recommendation};
use crate::analysis::trends::{summarize, StatusSummary, TrendEngine};
use crate::error::InsufficientData;
use crate::store::Observation;
use std::sync::Arc;

/// Number of high-priority actions carried in the report summary
pub const SUMMARY_PRIORITY_ACTIONS: usize = 3;

pub struct ReportSynthesizer {
    trends: Arc<TrendEngine>,
    correlations: Arc<CorrelationEngine>,
    knowledge: Arc<KnowledgeBase>,
    id_prefix: String,
}

impl ReportSynthesizer {
    pub fn new(
        trends: Arc<TrendEngine>,
        correlations: Arc<CorrelationEngine>,
        knowledge: Arc<KnowledgeBase>,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            trends,
            correlations,
            knowledge,
            id_prefix: id_prefix.into(),
        }
    }

    /// Generate a report for `user_id`
    ///
    /// Insufficient history never fails the report; the affected sections
    /// are left empty and listed in `Report::degraded`.
    pub fn generate_report(
        &self,
        user_id: &str,
        observation: Observation,
        media: Option<&MediaAnalysis>,
        environment: Option<&EnvironmentalReading>,
    ) -> Report {
        self.trends.add_observation(user_id, observation);

        let now = self.trends.history().now();
        let mut degraded = Vec::new();
        let mut trend_section = TrendSection {
            correlations: self.correlations.correlate(user_id),
            ..TrendSection::default()
        };
        let mut trend_recommendations = Vec::new();

        let status_summary = match self.trends.analyze_trends(user_id) {
            Ok(analysis) => {
                let summary = summarize(&analysis);
                for gap in &analysis.gaps {
                    degraded.push(DegradedSection::new(gap_section(gap), gap));
                }
                trend_recommendations.extend(analysis.recommendations.iter().cloned());

                match self.trends.correlate_with_environment(user_id) {
                    Ok(env) => {
                        trend_recommendations.extend(env.recommendations.iter().cloned());
                        trend_section.environmental_correlations = Some(env);
                    }
                    Err(err) => {
                        degraded.push(DegradedSection::new("environmental_correlations", err))
                    }
                }

                trend_section.activity = analysis.activity;
                trend_section.productivity = analysis.productivity;
                trend_section.seasonal = analysis.seasonal;
                trend_section.gaps = analysis.gaps;
                summary
            }
            Err(err) => {
                degraded.push(DegradedSection::new("trend_analysis", &err));
                StatusSummary::unknown()
            }
        };

        let media_section = media.map(|m| MediaSection::from_analysis(m, &self.knowledge));
        let environmental_section = environment.map(|e| analyze_environment(e, &self.knowledge));

        let recommendations = merge([
            status_summary.prioritized_actions.clone(),
            trend_recommendations,
            media_section
                .as_ref()
                .map(|m| m.recommendations.clone())
                .unwrap_or_default(),
            environmental_section
                .as_ref()
                .map(|e| e.recommendations.clone())
                .unwrap_or_default(),
        ]);

        let mut key_findings = vec![format!("Hive status is {}", status_summary.overall_status)];
        if let Some(activity) = &trend_section.activity {
            key_findings.push(format!("Activity is {}", activity.trend.direction));
        }
        if let Some(env) = &environmental_section {
            key_findings.push(env.impact_assessment.clone());
        }

        let summary = ReportSummary {
            status: status_summary.overall_status,
            outlook: status_summary.outlook,
            key_findings,
            priority_actions: high_priority_actions(&recommendations),
        };

        for section in &degraded {
            tracing::warn!(
                user_id = %user_id,
                section = %section.section,
                reason = %section.reason,
                "Report section degraded"
            );
        }

        let report = Report {
            report_id: format!("{}-{}-{}", self.id_prefix, user_id, now.format("%Y%m%d%H%M")),
            generated_at: now,
            status_summary,
            trend_analysis: trend_section,
            media_analysis: media_section,
            environmental_analysis: environmental_section,
            recommendations,
            summary,
            degraded,
        };

        tracing::info!(
            user_id = %user_id,
            report_id = %report.report_id,
            recommendations = report.recommendations.len(),
            degraded = report.degraded.len(),
            "Generated report"
        );

        report
    }
}

fn gap_section(gap: &InsufficientData) -> &'static str {
    match gap {
        InsufficientData::ActivityData => "activity_trend",
        InsufficientData::ProductivityData => "productivity_trend",
        InsufficientData::SeasonalData { .. } => "seasonal_pattern",
        InsufficientData::Observations { .. } | InsufficientData::History => "trend_analysis",
    }
}

fn high_priority_actions(recommendations: &[Recommendation]) -> Vec<String> {
    recommendations
        .iter()
        .filter(|rec| rec.priority == Priority::High)
        .take(SUMMARY_PRIORITY_ACTIONS)
        .map(|rec| rec.text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trends::{OverallStatus, Outlook, TrendDirection};
    use crate::config::TrendsConfig;
    use crate::store::{ManualClock, Retention, TtlKeyedStore, BEE_COUNT, HONEY_YIELD, TEMPERATURE};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap() + Duration::days(n - 1)
    }

    fn synthesizer(clock: Arc<ManualClock>) -> ReportSynthesizer {
        let history = Arc::new(TtlKeyedStore::new("trend_history", Retention::days(365), clock));
        let knowledge = Arc::new(KnowledgeBase::default());
        let trends = Arc::new(TrendEngine::new(
            history.clone(),
            TrendsConfig::default(),
            knowledge.clone(),
        ));
        let correlations = Arc::new(CorrelationEngine::new(
            history,
            vec![BEE_COUNT.to_string(), HONEY_YIELD.to_string(), TEMPERATURE.to_string()],
        ));
        ReportSynthesizer::new(trends, correlations, knowledge, "BEE")
    }

    #[test]
    fn test_first_report_degrades_gracefully() {
        let clock = Arc::new(ManualClock::new(day(1)));
        let synthesizer = synthesizer(clock);

        let report = synthesizer.generate_report(
            "alice",
            Observation::new("alice", day(1)).metric(BEE_COUNT, 30.0),
            None,
            None,
        );

        assert_eq!(report.report_id, "BEE-alice-202405010930");
        assert_eq!(report.status_summary, StatusSummary::unknown());
        assert_eq!(report.summary.status, OverallStatus::Unknown);
        assert_eq!(report.summary.outlook, Outlook::InsufficientData);
        assert!(report.trend_analysis.activity.is_none());
        assert_eq!(report.degraded.len(), 1);
        assert_eq!(report.degraded[0].section, "trend_analysis");
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_report_merges_all_sources() {
        let clock = Arc::new(ManualClock::new(day(1)));
        let synthesizer = synthesizer(clock.clone());

        let mut report = None;
        let readings = [
            (1, 40.0, 12.0),
            (8, 35.0, 11.0),
            (15, 30.0, 10.0),
            (22, 25.0, 9.0),
            (29, 20.0, 8.0),
        ];
        for (d, bees, kg) in readings {
            clock.set(day(d));
            report = Some(synthesizer.generate_report(
                "alice",
                Observation::new("alice", day(d))
                    .metric(BEE_COUNT, bees)
                    .metric(HONEY_YIELD, kg),
                None,
                None,
            ));
        }
        assert!(report.unwrap().is_degraded());

        clock.set(day(30));
        let media = MediaAnalysis {
            recommendations: vec!["Immediate inspection for queen cells".to_string()],
            ..MediaAnalysis::image(18.0)
        };
        let environment = EnvironmentalReading {
            temperature: Some(12.0),
            ..Default::default()
        };
        let report = synthesizer.generate_report(
            "alice",
            Observation::new("alice", day(30))
                .metric(BEE_COUNT, 18.0)
                .metric(HONEY_YIELD, 8.0),
            Some(&media),
            Some(&environment),
        );

        assert_eq!(report.summary.status, OverallStatus::NeedsAttention);
        assert_eq!(
            report.trend_analysis.activity.as_ref().unwrap().trend.direction,
            TrendDirection::Decreasing
        );
        assert_eq!(
            report.summary.priority_actions,
            vec!["Immediate inspection for queen cells"]
        );
        assert_eq!(report.recommendations[0].priority, Priority::High);
        assert_eq!(
            report.summary.key_findings,
            vec![
                "Hive status is needs_attention",
                "Activity is decreasing",
                "Temperature below optimal foraging range",
            ]
        );

        let texts: Vec<&str> = report.recommendations.iter().map(|r| r.text.as_str()).collect();
        assert!(texts.contains(&"Temperature too low for optimal foraging"));
        assert!(texts.contains(&"Assess food source availability"));
        // Status actions duplicate trend recommendations; each appears once
        let reviews = texts
            .iter()
            .filter(|t| **t == "Review recent changes in environment or management")
            .count();
        assert_eq!(reviews, 1);
        assert!(report.media_analysis.is_some());
    }
}
