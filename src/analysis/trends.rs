//! Trend Engine
//!
//! Derives activity, productivity and seasonal signals from a user's retained
//! observation history, and rolls them up into a status summary.
//!
//! Results are recomputed on every call; nothing is cached between queries.

use super::correlations::{correlate_observations, Correlation, CorrelationStrength};
use super::knowledge::{KnowledgeBase, YieldComparison};
use super::recommendations::prioritize_actions;
use crate::config::TrendsConfig;
use crate::error::{CoreResult, InsufficientData};
use crate::store::{Entry, Observation, TtlKeyedStore};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Maximum number of prioritized actions in a status summary
pub const MAX_PRIORITIZED_ACTIONS: usize = 5;

/// Coarse classification of relative change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    /// +1 / 0 / -1
    pub fn indicator(&self) -> i8 {
        match self {
            TrendDirection::Increasing => 1,
            TrendDirection::Stable => 0,
            TrendDirection::Decreasing => -1,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Coefficient-of-variation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    VeryConsistent,
    Consistent,
    ModeratelyVariable,
    HighlyVariable,
}

/// Direction, size and steadiness of a metric's movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// Signed relative change between first and last sample
    pub magnitude: f64,
    pub consistency: Consistency,
}

/// Bee activity over the activity window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTrend {
    pub average_activity: f64,
    pub samples: usize,
    #[serde(flatten)]
    pub trend: TrendResult,
}

/// Honey yield over the full retained window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityTrend {
    pub average_yield: f64,
    pub samples: usize,
    #[serde(flatten)]
    pub trend: TrendResult,
    pub comparison_to_optimal: YieldComparison,
}

/// Per-month activity profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPattern {
    pub peak_month: u32,
    pub low_month: u32,
    pub seasonal_variation: f64,
    pub monthly_averages: BTreeMap<u32, f64>,
}

/// Everything derived from one user's history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub observations: usize,
    pub activity: Option<ActivityTrend>,
    pub productivity: Option<ProductivityTrend>,
    pub seasonal: Option<SeasonalPattern>,
    /// Sections that could not be computed, and why
    pub gaps: Vec<InsufficientData>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
    Unknown,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Excellent => write!(f, "excellent"),
            OverallStatus::Good => write!(f, "good"),
            OverallStatus::Fair => write!(f, "fair"),
            OverallStatus::NeedsAttention => write!(f, "needs_attention"),
            OverallStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outlook {
    Positive,
    Stable,
    Cautious,
    Uncertain,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivityMetric {
    pub level: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductivityMetric {
    pub level: f64,
    pub status: YieldComparison,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productivity: Option<ProductivityMetric>,
}

/// Rolled-up status of one hive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub overall_status: OverallStatus,
    pub outlook: Outlook,
    pub key_metrics: KeyMetrics,
    pub prioritized_actions: Vec<String>,
}

impl StatusSummary {
    /// Summary for a user whose trends could not be computed
    pub fn unknown() -> Self {
        Self {
            overall_status: OverallStatus::Unknown,
            outlook: Outlook::InsufficientData,
            key_metrics: KeyMetrics::default(),
            prioritized_actions: Vec::new(),
        }
    }
}

/// Correlations between hive metrics and environmental readings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentalCorrelation {
    pub activity_correlations: Vec<Correlation>,
    pub productivity_correlations: Vec<Correlation>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Trend analysis over a long-horizon observation history
pub struct TrendEngine {
    history: Arc<TtlKeyedStore<String, Observation>>,
    config: TrendsConfig,
    knowledge: Arc<KnowledgeBase>,
}

impl TrendEngine {
    pub fn new(
        history: Arc<TtlKeyedStore<String, Observation>>,
        config: TrendsConfig,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            history,
            config,
            knowledge,
        }
    }

    pub fn config(&self) -> &TrendsConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<TtlKeyedStore<String, Observation>> {
        &self.history
    }

    /// Append an observation to the user's history
    ///
    /// Returns false if the observation is already outside the retention
    /// window.
    pub fn add_observation(&self, user_id: &str, observation: Observation) -> bool {
        let timestamp = observation.timestamp;
        let retained = self
            .history
            .append(user_id.to_string(), observation, timestamp);

        tracing::debug!(user_id = %user_id, %timestamp, retained, "Recorded trend observation");
        retained
    }

    /// Analyze trends for a user
    ///
    /// Fails with `InsufficientData::Observations` below the minimum number
    /// of retained observations; never returns a partial result in that
    /// case. Individual sections that cannot be computed are listed in
    /// `gaps` instead.
    pub fn analyze_trends(&self, user_id: &str) -> CoreResult<TrendAnalysis> {
        let mut entries = self.history.entries(user_id, None);
        if entries.len() < self.config.minimum_observations {
            return Err(InsufficientData::Observations {
                have: entries.len(),
                need: self.config.minimum_observations,
            }
            .into());
        }

        // Out-of-order arrivals are ordered by timestamp, ties by arrival
        entries.sort_by_key(|entry| entry.timestamp);
        let now = self.history.now();

        let mut gaps = Vec::new();
        let activity = activity_trend(&entries, now, &self.config)
            .map_err(|gap| gaps.push(gap))
            .ok();
        let productivity = productivity_trend(&entries, &self.config, &self.knowledge)
            .map_err(|gap| gaps.push(gap))
            .ok();
        let seasonal = seasonal_pattern(&entries, &self.config.activity_metric)
            .map_err(|gap| gaps.push(gap))
            .ok();

        let recommendations = trend_recommendations(
            activity.as_ref(),
            productivity.as_ref(),
            seasonal.as_ref(),
            self.config.seasonal_variation_alert,
        );

        tracing::debug!(
            user_id = %user_id,
            observations = entries.len(),
            gaps = gaps.len(),
            "Analyzed trends"
        );

        Ok(TrendAnalysis {
            observations: entries.len(),
            activity,
            productivity,
            seasonal,
            gaps,
            recommendations,
        })
    }

    /// Current status summary for a user
    pub fn get_status_summary(&self, user_id: &str) -> StatusSummary {
        match self.analyze_trends(user_id) {
            Ok(analysis) => summarize(&analysis),
            Err(_) => StatusSummary::unknown(),
        }
    }

    /// Correlate the activity and yield metrics with environmental readings
    pub fn correlate_with_environment(&self, user_id: &str) -> CoreResult<EnvironmentalCorrelation> {
        let observations = self.history.get(user_id, None);
        if observations.len() < self.config.minimum_observations {
            return Err(InsufficientData::Observations {
                have: observations.len(),
                need: self.config.minimum_observations,
            }
            .into());
        }

        let factors: BTreeSet<String> = observations
            .iter()
            .flat_map(|obs| obs.environmental.keys().cloned())
            .collect();

        let against = |metric: &str| -> Vec<Correlation> {
            factors
                .iter()
                .filter(|factor| factor.as_str() != metric)
                .flat_map(|factor| {
                    correlate_observations(&observations, &[metric.to_string(), factor.clone()])
                })
                .collect()
        };

        let activity_correlations = against(&self.config.activity_metric);
        let productivity_correlations = against(&self.config.yield_metric);

        let mut insights = Vec::new();
        let mut recommendations = Vec::new();
        for (label, correlations) in [
            ("activity", &activity_correlations),
            ("productivity", &productivity_correlations),
        ] {
            let by_strength = |strength: CorrelationStrength| -> Vec<&str> {
                correlations
                    .iter()
                    .filter(|c| c.strength == strength)
                    .map(|c| c.metric_b.as_str())
                    .collect()
            };

            let strong = by_strength(CorrelationStrength::Strong);
            if !strong.is_empty() {
                insights.push(format!(
                    "Strong {} correlations found with: {}",
                    label,
                    strong.join(", ")
                ));
            }
            let moderate = by_strength(CorrelationStrength::Moderate);
            if !moderate.is_empty() {
                insights.push(format!(
                    "Moderate {} correlations found with: {}",
                    label,
                    moderate.join(", ")
                ));
            }

            for c in correlations
                .iter()
                .filter(|c| c.strength == CorrelationStrength::Strong)
            {
                if c.coefficient > 0.0 {
                    recommendations.push(format!(
                        "Maintain favorable {} conditions to optimize {}",
                        c.metric_b, label
                    ));
                } else {
                    recommendations.push(format!(
                        "Consider mitigation strategies for negative {} impact on {}",
                        c.metric_b, label
                    ));
                }
            }
        }

        Ok(EnvironmentalCorrelation {
            activity_correlations,
            productivity_correlations,
            insights,
            recommendations,
        })
    }
}

/// Roll trend sections up into a status summary
pub fn summarize(analysis: &TrendAnalysis) -> StatusSummary {
    let mut indicators: Vec<i8> = Vec::new();
    let mut key_metrics = KeyMetrics::default();

    if let Some(activity) = &analysis.activity {
        indicators.push(activity.trend.direction.indicator());
        key_metrics.activity = Some(ActivityMetric {
            level: activity.average_activity,
            trend: activity.trend.direction,
        });
    }

    if let Some(productivity) = &analysis.productivity {
        indicators.push(match productivity.comparison_to_optimal {
            YieldComparison::AboveOptimal => 1,
            YieldComparison::Optimal => 0,
            YieldComparison::BelowOptimal => -1,
        });
        key_metrics.productivity = Some(ProductivityMetric {
            level: productivity.average_yield,
            status: productivity.comparison_to_optimal,
        });
    }

    let mean_indicator = if indicators.is_empty() {
        0.0
    } else {
        indicators.iter().map(|&i| i as f64).sum::<f64>() / indicators.len() as f64
    };

    let overall_status = if mean_indicator > 0.3 {
        OverallStatus::Excellent
    } else if mean_indicator > 0.0 {
        OverallStatus::Good
    } else if mean_indicator > -0.3 {
        OverallStatus::Fair
    } else {
        OverallStatus::NeedsAttention
    };

    let outlook = if indicators.is_empty() {
        Outlook::Uncertain
    } else {
        let non_negative = indicators.iter().filter(|&&i| i >= 0).count();
        let score = non_negative as f64 / indicators.len() as f64;
        if score > 0.7 {
            Outlook::Positive
        } else if score > 0.3 {
            Outlook::Stable
        } else {
            Outlook::Cautious
        }
    };

    StatusSummary {
        overall_status,
        outlook,
        key_metrics,
        prioritized_actions: prioritize_actions(&analysis.recommendations, MAX_PRIORITIZED_ACTIONS),
    }
}

/// Activity trend over the configured recent window
pub fn activity_trend(
    entries: &[Entry<Observation>],
    now: DateTime<Utc>,
    config: &TrendsConfig,
) -> Result<ActivityTrend, InsufficientData> {
    let window = Duration::days(config.activity_window_days);
    let values: Vec<f64> = entries
        .iter()
        .filter(|entry| now - entry.timestamp < window)
        .filter_map(|entry| entry.value.value(&config.activity_metric))
        .collect();

    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return Err(InsufficientData::ActivityData);
    };

    Ok(ActivityTrend {
        average_activity: mean(&values),
        samples: values.len(),
        trend: trend_result(first, last, &values, config.significant_change),
    })
}

/// Yield trend over the full window, compared to the optimal band
pub fn productivity_trend(
    entries: &[Entry<Observation>],
    config: &TrendsConfig,
    knowledge: &KnowledgeBase,
) -> Result<ProductivityTrend, InsufficientData> {
    let values: Vec<f64> = entries
        .iter()
        .filter_map(|entry| entry.value.value(&config.yield_metric))
        .collect();

    if values.len() < 2 {
        return Err(InsufficientData::ProductivityData);
    }

    let average_yield = mean(&values);
    Ok(ProductivityTrend {
        average_yield,
        samples: values.len(),
        trend: trend_result(
            values[0],
            values[values.len() - 1],
            &values,
            config.significant_change,
        ),
        comparison_to_optimal: knowledge.compare_yield(average_yield, config.hive_type),
    })
}

/// Per-calendar-month means of `metric`
pub fn seasonal_pattern(
    entries: &[Entry<Observation>],
    metric: &str,
) -> Result<SeasonalPattern, InsufficientData> {
    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        if let Some(value) = entry.value.value(metric) {
            by_month
                .entry(entry.timestamp.month())
                .or_default()
                .push(value);
        }
    }

    if by_month.len() < 2 {
        return Err(InsufficientData::SeasonalData {
            months: by_month.len(),
        });
    }

    let monthly_averages: BTreeMap<u32, f64> = by_month
        .into_iter()
        .map(|(month, values)| (month, mean(&values)))
        .collect();

    // Ties resolve to the earliest month
    let mut peak = (0, f64::NEG_INFINITY);
    let mut low = (0, f64::INFINITY);
    for (&month, &avg) in &monthly_averages {
        if avg > peak.1 {
            peak = (month, avg);
        }
        if avg < low.1 {
            low = (month, avg);
        }
    }

    let averages: Vec<f64> = monthly_averages.values().copied().collect();
    Ok(SeasonalPattern {
        peak_month: peak.0,
        low_month: low.0,
        seasonal_variation: coefficient_of_variation(&averages),
        monthly_averages,
    })
}

fn trend_recommendations(
    activity: Option<&ActivityTrend>,
    productivity: Option<&ProductivityTrend>,
    seasonal: Option<&SeasonalPattern>,
    seasonal_alert: f64,
) -> Vec<String> {
    let mut recommendations: Vec<&str> = Vec::new();

    if let Some(activity) = activity {
        if activity.trend.direction == TrendDirection::Decreasing {
            recommendations.extend([
                "Review recent changes in environment or management",
                "Check for potential stressors affecting foraging",
                "Consider supplementary feeding if needed",
            ]);
        } else if activity.trend.consistency == Consistency::HighlyVariable {
            recommendations.push("Investigate causes of variable activity levels");
        }
    }

    if let Some(productivity) = productivity {
        if productivity.comparison_to_optimal == YieldComparison::BelowOptimal {
            recommendations.extend([
                "Review hive management practices",
                "Assess food source availability",
                "Consider colony strength assessment",
            ]);
        }
    }

    if let Some(seasonal) = seasonal {
        if seasonal.seasonal_variation > seasonal_alert {
            recommendations.extend([
                "Plan for seasonal variations in foraging conditions",
                "Prepare supplementary feeding for low activity periods",
                "Consider seasonal hive management adjustments",
            ]);
        }
    }

    recommendations.into_iter().map(String::from).collect()
}

fn trend_result(first: f64, last: f64, values: &[f64], threshold: f64) -> TrendResult {
    TrendResult {
        direction: change_direction(first, last, threshold),
        magnitude: relative_change(first, last),
        consistency: consistency(values),
    }
}

/// `(last - first) / first`; a zero baseline yields the absolute change
pub fn relative_change(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        last - first
    } else {
        (last - first) / first
    }
}

/// Direction of the move from `first` to `last`
///
/// A positive baseline is judged by relative change against `threshold`.
/// A zero or negative baseline has no meaningful ratio, so the sign of
/// `last - first` decides.
pub fn change_direction(first: f64, last: f64, threshold: f64) -> TrendDirection {
    if first > 0.0 {
        trend_direction(relative_change(first, last), threshold)
    } else {
        trend_direction(last - first, 0.0)
    }
}

pub fn trend_direction(change: f64, threshold: f64) -> TrendDirection {
    if change > threshold {
        TrendDirection::Increasing
    } else if change < -threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Bucket the coefficient of variation at 0.1 / 0.2 / 0.3
pub fn consistency(values: &[f64]) -> Consistency {
    let cv = coefficient_of_variation(values);
    if cv < 0.1 {
        Consistency::VeryConsistent
    } else if cv < 0.2 {
        Consistency::Consistent
    } else if cv < 0.3 {
        Consistency::ModeratelyVariable
    } else {
        Consistency::HighlyVariable
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); zero for fewer than two values
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// `stdev / |mean|`; zero spread is 0, spread around a zero mean is infinite
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let stdev = sample_stdev(values);
    if stdev == 0.0 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        f64::INFINITY
    } else {
        stdev / m.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::{ManualClock, Retention, BEE_COUNT, HONEY_YIELD, TEMPERATURE};
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::days(n - 1)
    }

    fn engine_at(now: DateTime<Utc>) -> (Arc<ManualClock>, TrendEngine) {
        let clock = Arc::new(ManualClock::new(now));
        let history = Arc::new(TtlKeyedStore::new(
            "trend_history",
            Retention::days(365),
            clock.clone(),
        ));
        let engine = TrendEngine::new(
            history,
            TrendsConfig::default(),
            Arc::new(KnowledgeBase::default()),
        );
        (clock, engine)
    }

    fn record(engine: &TrendEngine, at: DateTime<Utc>, metrics: &[(&str, f64)]) {
        let obs = metrics
            .iter()
            .fold(Observation::new("hive-1", at), |obs, (name, value)| obs.metric(*name, *value));
        engine.add_observation("hive-1", obs);
    }

    fn entries(points: &[(i64, f64)], metric: &str) -> Vec<Entry<Observation>> {
        points
            .iter()
            .map(|&(d, v)| Entry {
                timestamp: day(d),
                value: Observation::new("hive-1", day(d)).metric(metric, v),
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_five_observations_is_insufficient() {
        let (_, engine) = engine_at(day(10));
        for d in 1..=4 {
            record(&engine, day(d), &[(BEE_COUNT, 20.0)]);
        }

        let err = engine.analyze_trends("hive-1").unwrap_err();
        assert_eq!(
            err,
            CoreError::from(InsufficientData::Observations { have: 4, need: 5 })
        );
        assert_eq!(engine.get_status_summary("hive-1"), StatusSummary::unknown());
    }

    #[test]
    fn test_activity_trend_increasing_over_month() {
        let config = TrendsConfig::default();
        let trend = activity_trend(&entries(&[(1, 10.0), (30, 25.0)], BEE_COUNT), day(30), &config)
            .unwrap();

        assert_eq!(trend.trend.direction, TrendDirection::Increasing);
        assert!((trend.trend.magnitude - 1.5).abs() < 1e-9);
        assert_eq!(trend.average_activity, 17.5);
    }

    #[test]
    fn test_activity_trend_ignores_samples_outside_window() {
        let config = TrendsConfig::default();
        let points = entries(&[(1, 100.0), (40, 20.0), (45, 21.0), (50, 20.5)], BEE_COUNT);
        let trend = activity_trend(&points, day(50), &config).unwrap();

        assert_eq!(trend.samples, 3);
        assert_eq!(trend.trend.direction, TrendDirection::Stable);
        assert_eq!(trend.trend.consistency, Consistency::VeryConsistent);
    }

    #[test]
    fn test_activity_trend_without_metric() {
        let config = TrendsConfig::default();
        let points = entries(&[(1, 18.0), (2, 19.0)], HONEY_YIELD);
        assert_eq!(
            activity_trend(&points, day(2), &config).unwrap_err(),
            InsufficientData::ActivityData
        );
    }

    #[test]
    fn test_zero_baseline_never_produces_nan() {
        assert_eq!(relative_change(0.0, 12.0), 12.0);
        assert_eq!(relative_change(0.0, 0.0), 0.0);

        // Any movement off a zero baseline counts
        let result = trend_result(0.0, 0.1, &[0.0, 0.1], 0.2);
        assert_eq!(result.direction, TrendDirection::Increasing);
        assert!((result.magnitude - 0.1).abs() < 1e-12);

        let flat = trend_result(0.0, 0.0, &[0.0, 0.0], 0.2);
        assert_eq!(flat.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_change_direction_off_non_positive_baseline() {
        assert_eq!(change_direction(0.0, 0.1, 0.2), TrendDirection::Increasing);
        assert_eq!(change_direction(-6.0, -69.0, 0.2), TrendDirection::Decreasing);
        assert_eq!(change_direction(-6.0, 1.0, 0.2), TrendDirection::Increasing);
        assert_eq!(change_direction(-6.0, -6.0, 0.2), TrendDirection::Stable);

        // Positive baselines still respect the threshold
        assert_eq!(change_direction(10.0, 11.0, 0.2), TrendDirection::Stable);
        assert_eq!(change_direction(10.0, 13.0, 0.2), TrendDirection::Increasing);
    }

    #[test]
    fn test_productivity_trend_compares_to_optimal() {
        let config = TrendsConfig::default();
        let kb = KnowledgeBase::default();

        let below = productivity_trend(&entries(&[(1, 12.0), (60, 9.0)], HONEY_YIELD), &config, &kb)
            .unwrap();
        assert_eq!(below.comparison_to_optimal, YieldComparison::BelowOptimal);
        assert_eq!(below.trend.direction, TrendDirection::Decreasing);

        let optimal =
            productivity_trend(&entries(&[(1, 18.0), (200, 20.0)], HONEY_YIELD), &config, &kb)
                .unwrap();
        assert_eq!(optimal.comparison_to_optimal, YieldComparison::Optimal);

        assert_eq!(
            productivity_trend(&entries(&[(1, 18.0)], HONEY_YIELD), &config, &kb).unwrap_err(),
            InsufficientData::ProductivityData
        );
    }

    #[test]
    fn test_seasonal_pattern_peak_and_low() {
        // January ~10 bees, February ~30, March ~20
        let points = entries(
            &[(5, 8.0), (10, 12.0), (35, 28.0), (40, 32.0), (65, 20.0)],
            BEE_COUNT,
        );
        let pattern = seasonal_pattern(&points, BEE_COUNT).unwrap();

        assert_eq!(pattern.peak_month, 2);
        assert_eq!(pattern.low_month, 1);
        assert_eq!(pattern.monthly_averages.len(), 3);
        // means 10, 30, 20 → stdev 10, mean 20
        assert!((pattern.seasonal_variation - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_seasonal_pattern_requires_two_months() {
        let points = entries(&[(1, 8.0), (2, 12.0)], BEE_COUNT);
        assert_eq!(
            seasonal_pattern(&points, BEE_COUNT).unwrap_err(),
            InsufficientData::SeasonalData { months: 1 }
        );
    }

    #[test]
    fn test_consistency_buckets() {
        assert_eq!(consistency(&[10.0, 10.0, 10.0]), Consistency::VeryConsistent);
        assert_eq!(consistency(&[9.0, 11.0, 10.0, 12.0, 8.0]), Consistency::Consistent);
        assert_eq!(consistency(&[5.0, 25.0]), Consistency::HighlyVariable);
        assert_eq!(consistency(&[-1.0, 1.0]), Consistency::HighlyVariable);
        assert_eq!(consistency(&[0.0, 0.0]), Consistency::VeryConsistent);
    }

    #[test]
    fn test_analyze_trends_tolerates_out_of_order_arrival() {
        let (_, engine) = engine_at(day(30));
        record(&engine, day(30), &[(BEE_COUNT, 25.0)]);
        record(&engine, day(1), &[(BEE_COUNT, 10.0)]);
        record(&engine, day(20), &[(BEE_COUNT, 20.0)]);
        record(&engine, day(10), &[(BEE_COUNT, 15.0)]);
        record(&engine, day(25), &[(BEE_COUNT, 22.0)]);

        let analysis = engine.analyze_trends("hive-1").unwrap();
        let activity = analysis.activity.unwrap();
        assert_eq!(activity.trend.direction, TrendDirection::Increasing);
        assert!((activity.trend.magnitude - 1.5).abs() < 1e-9);
        assert_eq!(
            analysis.gaps,
            vec![
                InsufficientData::ProductivityData,
                InsufficientData::SeasonalData { months: 1 },
            ]
        );
    }

    #[test]
    fn test_declining_hive_needs_attention() {
        let (_, engine) = engine_at(day(29));
        let readings = [(1, 40.0, 14.0), (8, 35.0, 12.0), (15, 30.0, 11.0), (22, 25.0, 10.0), (29, 20.0, 9.0)];
        for (d, bees, kg) in readings {
            record(&engine, day(d), &[(BEE_COUNT, bees), (HONEY_YIELD, kg)]);
        }

        let summary = engine.get_status_summary("hive-1");
        assert_eq!(summary.overall_status, OverallStatus::NeedsAttention);
        assert_eq!(summary.outlook, Outlook::Cautious);
        assert_eq!(summary.prioritized_actions.len(), MAX_PRIORITIZED_ACTIONS);
        assert_eq!(
            summary.prioritized_actions[0],
            "Review recent changes in environment or management"
        );
        assert_eq!(
            summary.key_metrics.productivity.unwrap().status,
            YieldComparison::BelowOptimal
        );
    }

    #[test]
    fn test_thriving_hive_is_excellent() {
        let (_, engine) = engine_at(day(29));
        let readings = [(1, 20.0, 24.0), (8, 24.0, 26.0), (15, 28.0, 27.0), (22, 31.0, 28.0), (29, 34.0, 30.0)];
        for (d, bees, kg) in readings {
            record(&engine, day(d), &[(BEE_COUNT, bees), (HONEY_YIELD, kg)]);
        }

        let summary = engine.get_status_summary("hive-1");
        assert_eq!(summary.overall_status, OverallStatus::Excellent);
        assert_eq!(summary.outlook, Outlook::Positive);
    }

    #[test]
    fn test_summary_without_indicators_is_uncertain() {
        let analysis = TrendAnalysis {
            observations: 5,
            activity: None,
            productivity: None,
            seasonal: None,
            gaps: vec![InsufficientData::ActivityData, InsufficientData::ProductivityData],
            recommendations: Vec::new(),
        };
        let summary = summarize(&analysis);
        assert_eq!(summary.overall_status, OverallStatus::Fair);
        assert_eq!(summary.outlook, Outlook::Uncertain);
    }

    #[test]
    fn test_correlate_with_environment() {
        let (_, engine) = engine_at(day(10));
        for d in 1..=6 {
            let t = d as f64;
            let obs = Observation::new("hive-1", day(d))
                .metric(BEE_COUNT, 10.0 + 3.0 * t)
                .environmental(TEMPERATURE, 15.0 + t);
            engine.add_observation("hive-1", obs);
        }

        let result = engine.correlate_with_environment("hive-1").unwrap();
        assert_eq!(result.activity_correlations.len(), 1);
        assert!(result.productivity_correlations.is_empty());
        assert_eq!(
            result.insights,
            vec!["Strong activity correlations found with: temperature"]
        );
        assert_eq!(
            result.recommendations,
            vec!["Maintain favorable temperature conditions to optimize activity"]
        );
    }
}
