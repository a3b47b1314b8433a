//! Historical Analysis and Forecasting
//!
//! Summaries over an arbitrary slice of the short-horizon data cache, plus a
//! one-week linear projection of the activity and yield metrics.

use super::correlations::{correlate_observations, Correlation, CorrelationStrength};
use super::knowledge::KnowledgeBase;
use super::trends::{change_direction, mean, TrendDirection};
use crate::config::TrendsConfig;
use crate::error::{CoreResult, InsufficientData};
use crate::store::{Entry, Observation, TimeRange, TtlKeyedStore, HUMIDITY, TEMPERATURE};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// How far past the latest sample a forecast projects
pub const FORECAST_HORIZON_DAYS: i64 = 7;

/// Average temperature above which cooling is advised
const HOT_AVERAGE_TEMPERATURE: f64 = 35.0;

/// Average temperature below which winter preparation is advised
const COLD_AVERAGE_TEMPERATURE: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalActivity {
    pub average: f64,
    pub peak: f64,
    pub direction: TrendDirection,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalProductivity {
    pub total: f64,
    pub average: f64,
    pub direction: TrendDirection,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl ValueRange {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg: mean(values),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentalRanges {
    pub temperature: Option<ValueRange>,
    pub humidity: Option<ValueRange>,
}

/// Summary of one user's cached observations over a time range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalAnalysis {
    pub range: TimeRange,
    pub observations: usize,
    pub activity: Option<HistoricalActivity>,
    pub productivity: Option<HistoricalProductivity>,
    pub environmental: EnvironmentalRanges,
    pub correlations: Vec<Correlation>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Least-squares projection of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricForecast {
    /// Fitted value at the latest sample
    pub current: f64,
    /// Fitted value `FORECAST_HORIZON_DAYS` after the latest sample
    pub projected: f64,
    pub slope_per_day: f64,
    pub direction: TrendDirection,
    /// Coefficient of determination of the fit
    pub confidence: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentalForecast {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub horizon_days: i64,
    pub activity: Option<MetricForecast>,
    pub productivity: Option<MetricForecast>,
    pub environmental: EnvironmentalForecast,
    pub recommendations: Vec<String>,
}

/// Analysis over the short-horizon data cache
pub struct HistoryAnalyzer {
    cache: Arc<TtlKeyedStore<String, Observation>>,
    trends: TrendsConfig,
    correlation_metrics: Vec<String>,
    knowledge: Arc<KnowledgeBase>,
}

impl HistoryAnalyzer {
    pub fn new(
        cache: Arc<TtlKeyedStore<String, Observation>>,
        trends: TrendsConfig,
        correlation_metrics: Vec<String>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            cache,
            trends,
            correlation_metrics,
            knowledge,
        }
    }

    pub fn cache(&self) -> &Arc<TtlKeyedStore<String, Observation>> {
        &self.cache
    }

    /// Cache an observation; false if already outside the cache window
    pub fn record(&self, user_id: &str, observation: Observation) -> bool {
        let timestamp = observation.timestamp;
        self.cache.append(user_id.to_string(), observation, timestamp)
    }

    /// Summarize the cached observations that fall in `range`
    pub fn historical_analysis(&self, user_id: &str, range: TimeRange) -> CoreResult<HistoricalAnalysis> {
        let entries = self.sorted_entries(user_id, Some(range));
        if entries.is_empty() {
            return Err(InsufficientData::History.into());
        }

        let activity_values = series(&entries, &self.trends.activity_metric);
        let activity = match (activity_values.first(), activity_values.last()) {
            (Some(&first), Some(&last)) => Some(HistoricalActivity {
                average: mean(&activity_values),
                peak: activity_values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                direction: self.direction(first, last),
                samples: activity_values.len(),
            }),
            _ => None,
        };

        let yield_values = series(&entries, &self.trends.yield_metric);
        let productivity = match (yield_values.first(), yield_values.last()) {
            (Some(&first), Some(&last)) => Some(HistoricalProductivity {
                total: yield_values.iter().sum(),
                average: mean(&yield_values),
                direction: self.direction(first, last),
                samples: yield_values.len(),
            }),
            _ => None,
        };

        let environmental = EnvironmentalRanges {
            temperature: ValueRange::of(&series(&entries, TEMPERATURE)),
            humidity: ValueRange::of(&series(&entries, HUMIDITY)),
        };

        let observations: Vec<Observation> = entries.into_iter().map(|e| e.value).collect();
        let correlations = correlate_observations(&observations, &self.correlation_metrics);

        let mut insights = Vec::new();
        if let Some(activity) = &activity {
            insights.push(format!("Bee activity shows {} trend", activity.direction));
        }
        if let Some(productivity) = &productivity {
            insights.push(format!("Honey yield shows {} trend", productivity.direction));
        }
        for c in correlations
            .iter()
            .filter(|c| c.strength == CorrelationStrength::Strong)
        {
            insights.push(format!(
                "Strong correlation found between {} and {}",
                c.metric_a, c.metric_b
            ));
        }

        let recommendations = historical_recommendations(
            activity.as_ref().map(|a| a.direction),
            productivity.as_ref().map(|p| p.direction),
            environmental.temperature.map(|t| t.avg),
        );

        tracing::debug!(
            user_id = %user_id,
            observations = observations.len(),
            correlations = correlations.len(),
            "Analyzed history"
        );

        Ok(HistoricalAnalysis {
            range,
            observations: observations.len(),
            activity,
            productivity,
            environmental,
            correlations,
            insights,
            recommendations,
        })
    }

    /// Project the activity and yield metrics one week ahead
    pub fn forecast(&self, user_id: &str) -> CoreResult<Forecast> {
        let entries = self.sorted_entries(user_id, None);
        if entries.is_empty() {
            return Err(InsufficientData::History.into());
        }

        let activity = self.project(&entries, &self.trends.activity_metric);
        let productivity = self.project(&entries, &self.trends.yield_metric);

        let temperatures = series(&entries, TEMPERATURE);
        let humidities = series(&entries, HUMIDITY);
        let environmental = EnvironmentalForecast {
            temperature: (!temperatures.is_empty()).then(|| mean(&temperatures)),
            humidity: (!humidities.is_empty()).then(|| mean(&humidities)),
        };

        let mut recommendations = Vec::new();
        if activity.is_some_and(|f| f.direction == TrendDirection::Decreasing) {
            recommendations.push("Monitor colony activity closely over the coming week".to_string());
        }
        if productivity.is_some_and(|f| f.direction == TrendDirection::Decreasing) {
            recommendations.push("Review forage availability before the next harvest".to_string());
        }
        if let Some(temp) = environmental.temperature {
            if !self.knowledge.temperature_optimal.contains(temp) {
                recommendations.push("Prepare temperature mitigation for the coming week".to_string());
            }
        }

        tracing::debug!(
            user_id = %user_id,
            samples = entries.len(),
            activity = activity.is_some(),
            productivity = productivity.is_some(),
            "Generated forecast"
        );

        Ok(Forecast {
            horizon_days: FORECAST_HORIZON_DAYS,
            activity,
            productivity,
            environmental,
            recommendations,
        })
    }

    fn sorted_entries(&self, user_id: &str, range: Option<TimeRange>) -> Vec<Entry<Observation>> {
        let mut entries = self.cache.entries(user_id, range);
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    fn direction(&self, first: f64, last: f64) -> TrendDirection {
        change_direction(first, last, self.trends.significant_change)
    }

    fn project(&self, entries: &[Entry<Observation>], metric: &str) -> Option<MetricForecast> {
        let points: Vec<(DateTime<Utc>, f64)> = entries
            .iter()
            .filter_map(|entry| Some((entry.timestamp, entry.value.value(metric)?)))
            .collect();
        let &(origin, _) = points.first()?;
        let &(latest, _) = points.last()?;

        let xs: Vec<f64> = points.iter().map(|&(ts, _)| days_between(origin, ts)).collect();
        let ys: Vec<f64> = points.iter().map(|&(_, v)| v).collect();
        let fit = LinearFit::least_squares(&xs, &ys)?;

        let latest_x = days_between(origin, latest);
        let current = fit.at(latest_x);
        let projected = fit.at(latest_x + FORECAST_HORIZON_DAYS as f64);

        Some(MetricForecast {
            current,
            projected,
            slope_per_day: fit.slope,
            direction: self.direction(current, projected),
            confidence: fit.r_squared,
            samples: points.len(),
        })
    }
}

fn series(entries: &[Entry<Observation>], metric: &str) -> Vec<f64> {
    entries
        .iter()
        .filter_map(|entry| entry.value.value(metric))
        .collect()
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / Duration::days(1).num_milliseconds() as f64
}

fn historical_recommendations(
    activity: Option<TrendDirection>,
    productivity: Option<TrendDirection>,
    average_temperature: Option<f64>,
) -> Vec<String> {
    let mut recommendations: Vec<&str> = Vec::new();

    if activity == Some(TrendDirection::Decreasing) {
        recommendations.extend([
            "Review and optimize hive placement",
            "Check for environmental stressors",
            "Consider supplementary feeding",
        ]);
    }

    if productivity == Some(TrendDirection::Decreasing) {
        recommendations.extend([
            "Evaluate queen performance",
            "Review disease prevention measures",
            "Assess nectar source availability",
        ]);
    }

    match average_temperature {
        Some(avg) if avg > HOT_AVERAGE_TEMPERATURE => {
            recommendations.push("Consider additional cooling measures")
        }
        Some(avg) if avg < COLD_AVERAGE_TEMPERATURE => {
            recommendations.push("Implement winter preparation measures")
        }
        _ => {}
    }

    recommendations.into_iter().map(String::from).collect()
}

/// Ordinary least-squares line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearFit {
    slope: f64,
    intercept: f64,
    r_squared: f64,
}

impl LinearFit {
    /// None for fewer than two points or when every x is identical
    fn least_squares(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }

        let mean_x = mean(xs);
        let mean_y = mean(ys);
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            sxx += (x - mean_x).powi(2);
            sxy += (x - mean_x) * (y - mean_y);
            syy += (y - mean_y).powi(2);
        }

        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        // A flat series is fitted exactly
        let r_squared = if syy == 0.0 {
            1.0
        } else {
            ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::{ManualClock, Retention, BEE_COUNT, HONEY_YIELD};
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::days(n - 1)
    }

    fn analyzer(now: DateTime<Utc>) -> HistoryAnalyzer {
        let clock = Arc::new(ManualClock::new(now));
        let cache = Arc::new(TtlKeyedStore::new("data_cache", Retention::days(30), clock));
        HistoryAnalyzer::new(
            cache,
            TrendsConfig::default(),
            vec![BEE_COUNT.to_string(), HONEY_YIELD.to_string(), TEMPERATURE.to_string()],
            Arc::new(KnowledgeBase::default()),
        )
    }

    fn observe(analyzer: &HistoryAnalyzer, d: i64, bees: f64, kg: f64, temp: f64) {
        analyzer.record(
            "hive-1",
            Observation::new("hive-1", day(d))
                .metric(BEE_COUNT, bees)
                .metric(HONEY_YIELD, kg)
                .environmental(TEMPERATURE, temp),
        );
    }

    #[test]
    fn test_empty_history_is_insufficient() {
        let analyzer = analyzer(day(1));
        let range = TimeRange::last_days(day(1), 30);

        assert_eq!(
            analyzer.historical_analysis("hive-1", range).unwrap_err(),
            CoreError::from(InsufficientData::History)
        );
        assert_eq!(
            analyzer.forecast("hive-1").unwrap_err(),
            CoreError::from(InsufficientData::History)
        );
    }

    #[test]
    fn test_historical_analysis_of_declining_hive() {
        let analyzer = analyzer(day(10));
        observe(&analyzer, 1, 40.0, 6.0, 38.0);
        observe(&analyzer, 4, 32.0, 5.0, 37.0);
        observe(&analyzer, 7, 25.0, 4.0, 36.0);
        observe(&analyzer, 10, 20.0, 3.0, 36.5);

        let range = TimeRange::from_bounds(None, None).unwrap();
        let analysis = analyzer.historical_analysis("hive-1", range).unwrap();

        let activity = analysis.activity.unwrap();
        assert_eq!(activity.peak, 40.0);
        assert_eq!(activity.direction, TrendDirection::Decreasing);

        let productivity = analysis.productivity.unwrap();
        assert_eq!(productivity.total, 18.0);
        assert_eq!(productivity.direction, TrendDirection::Decreasing);

        let temperature = analysis.environmental.temperature.unwrap();
        assert_eq!((temperature.min, temperature.max), (36.0, 38.0));
        assert!(analysis.environmental.humidity.is_none());

        assert_eq!(analysis.insights[0], "Bee activity shows decreasing trend");
        assert!(analysis
            .insights
            .contains(&"Strong correlation found between bee_count and honey_yield".to_string()));
        assert_eq!(analysis.recommendations.len(), 7);
        assert_eq!(
            analysis.recommendations.last().unwrap(),
            "Consider additional cooling measures"
        );
    }

    #[test]
    fn test_historical_range_is_half_open() {
        let analyzer = analyzer(day(10));
        observe(&analyzer, 2, 20.0, 3.0, 22.0);
        observe(&analyzer, 5, 21.0, 3.0, 23.0);

        let range = TimeRange::try_new(day(2), day(5)).unwrap();
        let analysis = analyzer.historical_analysis("hive-1", range).unwrap();
        assert_eq!(analysis.observations, 1);

        let empty = TimeRange::try_new(day(6), day(9)).unwrap();
        assert!(analyzer.historical_analysis("hive-1", empty).is_err());
    }

    #[test]
    fn test_forecast_projects_linear_growth() {
        let analyzer = analyzer(day(10));
        for d in 1..=5 {
            observe(&analyzer, d, 10.0 + 2.0 * d as f64, 5.0, 25.0);
        }

        let forecast = analyzer.forecast("hive-1").unwrap();
        let activity = forecast.activity.unwrap();
        assert!((activity.slope_per_day - 2.0).abs() < 1e-9);
        assert!((activity.current - 20.0).abs() < 1e-9);
        assert!((activity.projected - 34.0).abs() < 1e-9);
        assert_eq!(activity.direction, TrendDirection::Increasing);
        assert!((activity.confidence - 1.0).abs() < 1e-9);

        let productivity = forecast.productivity.unwrap();
        assert_eq!(productivity.direction, TrendDirection::Stable);
        assert_eq!(forecast.environmental.temperature, Some(25.0));
        assert!(forecast.recommendations.is_empty());
    }

    #[test]
    fn test_forecast_of_collapsing_colony_is_decreasing() {
        let analyzer = analyzer(day(4));
        for (d, bees) in [(1, 30.0), (2, 0.0), (3, 0.0), (4, 0.0)] {
            observe(&analyzer, d, bees, 5.0, 25.0);
        }

        let forecast = analyzer.forecast("hive-1").unwrap();
        let activity = forecast.activity.unwrap();
        assert!((activity.slope_per_day + 9.0).abs() < 1e-9);
        assert!(activity.current < 0.0);
        assert!(activity.projected < activity.current);
        assert_eq!(activity.direction, TrendDirection::Decreasing);
        assert_eq!(
            forecast.recommendations,
            vec!["Monitor colony activity closely over the coming week"]
        );
    }

    #[test]
    fn test_historical_direction_off_zero_baseline() {
        let analyzer = analyzer(day(3));
        observe(&analyzer, 1, 0.0, 0.0, 25.0);
        observe(&analyzer, 3, 0.1, 0.0, 25.0);

        let range = TimeRange::from_bounds(None, None).unwrap();
        let analysis = analyzer.historical_analysis("hive-1", range).unwrap();
        assert_eq!(analysis.activity.unwrap().direction, TrendDirection::Increasing);
        assert_eq!(analysis.productivity.unwrap().direction, TrendDirection::Stable);
    }

    #[test]
    fn test_forecast_needs_two_distinct_timestamps() {
        let analyzer = analyzer(day(3));
        observe(&analyzer, 2, 30.0, 5.0, 12.0);
        observe(&analyzer, 2, 28.0, 5.0, 12.0);

        let forecast = analyzer.forecast("hive-1").unwrap();
        assert!(forecast.activity.is_none());
        assert_eq!(
            forecast.recommendations,
            vec!["Prepare temperature mitigation for the coming week"]
        );
    }

    #[test]
    fn test_least_squares_fit() {
        let fit = LinearFit::least_squares(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 2.0, 4.0]).unwrap();
        assert!((fit.slope - 0.8).abs() < 1e-9);
        assert!((fit.intercept - 1.3).abs() < 1e-9);
        assert!((fit.r_squared - 0.64).abs() < 1e-9);
        assert!(LinearFit::least_squares(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }
}
