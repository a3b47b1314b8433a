//! Report Types
//!
//! The report handed back to the transport layer, and the already-computed
//! media findings it folds in. Reports are immutable once returned.

use crate::analysis::correlations::CorrelationReport;
use crate::analysis::environment::EnvironmentalAnalysis;
use crate::analysis::knowledge::{ActivityLevel, KnowledgeBase};
use crate::analysis::recommendations::Recommendation;
use crate::analysis::trends::{
    ActivityTrend, EnvironmentalCorrelation, OverallStatus, Outlook, ProductivityTrend,
    SeasonalPattern, StatusSummary,
};
use crate::error::{CoreError, CoreResult, InsufficientData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// MEDIA INPUT
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Findings for a single analyzed video frame
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FrameFinding {
    pub bee_count: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
}

/// Scalar results from the external media-analysis collaborator
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MediaAnalysis {
    pub analysis_type: MediaKind,
    /// Bees counted in a still image
    #[serde(default)]
    pub bee_count: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    /// Per-frame findings for a video
    #[serde(default)]
    pub frames: Vec<FrameFinding>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl MediaAnalysis {
    pub fn image(bee_count: f64) -> Self {
        Self {
            analysis_type: MediaKind::Image,
            bee_count: Some(bee_count),
            activity_level: None,
            frames: Vec::new(),
            issues: Vec::new(),
            alerts: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        let counts = self
            .bee_count
            .iter()
            .chain(self.frames.iter().map(|frame| &frame.bee_count));
        for count in counts {
            if !count.is_finite() || *count < 0.0 {
                return Err(CoreError::validation(
                    "media bee_count must be a finite, non-negative number",
                ));
            }
        }
        Ok(())
    }
}

// ============================================
// REPORT SECTIONS
// ============================================

/// Aggregate over a video's frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSummary {
    pub frames: usize,
    pub average_bee_count: f64,
    pub peak_bee_count: f64,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaActivity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_activity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_summary: Option<FrameSummary>,
}

/// The media section of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSection {
    pub analysis_type: MediaKind,
    pub activity: MediaActivity,
    /// Issues followed by alerts
    pub identified_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl MediaSection {
    /// Fold media findings into a section, deriving missing activity levels
    pub fn from_analysis(media: &MediaAnalysis, kb: &KnowledgeBase) -> Self {
        let frame_summary = if media.frames.is_empty() {
            None
        } else {
            let counts: Vec<f64> = media.frames.iter().map(|f| f.bee_count).collect();
            let average = counts.iter().sum::<f64>() / counts.len() as f64;
            Some(FrameSummary {
                frames: counts.len(),
                average_bee_count: average,
                peak_bee_count: counts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                activity_level: kb.activity_level(average),
            })
        };

        let activity_level = media
            .activity_level
            .or_else(|| media.bee_count.map(|count| kb.activity_level(count)))
            .or(frame_summary.map(|summary| summary.activity_level));

        Self {
            analysis_type: media.analysis_type,
            activity: MediaActivity {
                instant_activity: media.bee_count,
                activity_level,
                frame_summary,
            },
            identified_issues: media
                .issues
                .iter()
                .chain(media.alerts.iter())
                .cloned()
                .collect(),
            recommendations: media.recommendations.clone(),
        }
    }
}

/// Trend signals; sections that could not be computed are absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSection {
    pub activity: Option<ActivityTrend>,
    pub productivity: Option<ProductivityTrend>,
    pub seasonal: Option<SeasonalPattern>,
    pub correlations: CorrelationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environmental_correlations: Option<EnvironmentalCorrelation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<InsufficientData>,
}

/// A section left empty because its analysis failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedSection {
    pub section: String,
    pub reason: String,
}

impl DegradedSection {
    pub fn new(section: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            section: section.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<DegradedSection> for CoreError {
    fn from(degraded: DegradedSection) -> Self {
        CoreError::ComputationDegraded {
            section: degraded.section,
            reason: degraded.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub status: OverallStatus,
    pub outlook: Outlook,
    pub key_findings: Vec<String>,
    /// Up to three high-priority recommendation texts
    pub priority_actions: Vec<String>,
}

/// A synthesized hive report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub status_summary: StatusSummary,
    pub trend_analysis: TrendSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_analysis: Option<MediaSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environmental_analysis: Option<EnvironmentalAnalysis>,
    pub recommendations: Vec<Recommendation>,
    pub summary: ReportSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedSection>,
}

impl Report {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Degraded sections as tagged errors
    pub fn degradations(&self) -> Vec<CoreError> {
        self.degraded.iter().cloned().map(CoreError::from).collect()
    }
}
