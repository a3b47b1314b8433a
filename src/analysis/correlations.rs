//! Correlation Engine
//!
//! Calculates Pearson correlation coefficients between every unordered pair
//! of a fixed set of metrics, pairing samples observation-by-observation.

use crate::store::{Observation, TtlKeyedStore};
use serde::Serialize;
use std::sync::Arc;

/// Calculate correlations between metrics
pub struct CorrelationEngine {
    history: Arc<TtlKeyedStore<String, Observation>>,
    metrics: Vec<String>,
}

/// How strongly two metrics move together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

/// Sign of the relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

/// A correlation between two metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    /// First metric name
    pub metric_a: String,
    /// Second metric name
    pub metric_b: String,
    /// Pearson correlation coefficient (-1 to 1)
    pub coefficient: f64,
    pub strength: CorrelationStrength,
    pub direction: CorrelationDirection,
    /// Number of paired samples used
    pub sample_size: usize,
}

/// Correlations for one user plus the insights worth reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub correlations: Vec<Correlation>,
    pub insights: Vec<String>,
}

impl CorrelationEngine {
    pub fn new(history: Arc<TtlKeyedStore<String, Observation>>, metrics: Vec<String>) -> Self {
        Self { history, metrics }
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Correlate every metric pair over the user's retained history
    pub fn correlate(&self, user_id: &str) -> CorrelationReport {
        let observations = self.history.get(user_id, None);
        let report = correlation_report(&observations, &self.metrics);

        tracing::debug!(
            user_id = %user_id,
            observations = observations.len(),
            pairs = report.correlations.len(),
            "Calculated correlations"
        );
        report
    }
}

/// Pairwise correlations over `observations`
///
/// Pairs with undefined correlation (fewer than two samples, or zero
/// variance in either series) are omitted.
pub fn correlate_observations(observations: &[Observation], metrics: &[String]) -> Vec<Correlation> {
    let mut correlations = Vec::new();

    for i in 0..metrics.len() {
        for j in (i + 1)..metrics.len() {
            let (a_name, b_name) = (&metrics[i], &metrics[j]);
            let (xs, ys) = paired_samples(observations, a_name, b_name);

            let Some(r) = pearson_correlation(&xs, &ys) else {
                continue;
            };

            correlations.push(Correlation {
                metric_a: a_name.clone(),
                metric_b: b_name.clone(),
                coefficient: r,
                strength: correlation_strength(r),
                direction: if r >= 0.0 {
                    CorrelationDirection::Positive
                } else {
                    CorrelationDirection::Negative
                },
                sample_size: xs.len(),
            });
        }
    }

    correlations
}

/// Correlations plus one insight line per strong or moderate pair
pub fn correlation_report(observations: &[Observation], metrics: &[String]) -> CorrelationReport {
    let correlations = correlate_observations(observations, metrics);
    let insights = correlations
        .iter()
        .filter_map(|c| match c.strength {
            CorrelationStrength::Strong => Some(format!(
                "Strong {} correlation between {} and {} (r={:.2})",
                direction_label(c.direction),
                c.metric_a,
                c.metric_b,
                c.coefficient
            )),
            CorrelationStrength::Moderate => Some(format!(
                "Moderate {} correlation between {} and {} (r={:.2})",
                direction_label(c.direction),
                c.metric_a,
                c.metric_b,
                c.coefficient
            )),
            CorrelationStrength::Weak => None,
        })
        .collect();

    CorrelationReport {
        correlations,
        insights,
    }
}

fn direction_label(direction: CorrelationDirection) -> &'static str {
    match direction {
        CorrelationDirection::Positive => "positive",
        CorrelationDirection::Negative => "negative",
    }
}

/// Samples from observations carrying both metrics; others are dropped
fn paired_samples(observations: &[Observation], a: &str, b: &str) -> (Vec<f64>, Vec<f64>) {
    observations
        .iter()
        .filter_map(|obs| Some((obs.value(a)?, obs.value(b)?)))
        .unzip()
}

/// Calculate Pearson correlation coefficient
///
/// Returns `None` when the coefficient is undefined: mismatched lengths,
/// fewer than two samples, or zero variance in either series.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Strength bucket: |r| > 0.7 strong, 0.4 ≤ |r| ≤ 0.7 moderate, else weak
pub fn correlation_strength(r: f64) -> CorrelationStrength {
    let abs_r = r.abs();
    if abs_r > 0.7 {
        CorrelationStrength::Strong
    } else if abs_r >= 0.4 {
        CorrelationStrength::Moderate
    } else {
        CorrelationStrength::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ManualClock, Retention, BEE_COUNT, HONEY_YIELD, TEMPERATURE};
    use chrono::{Duration, TimeZone, Utc};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pearson_correlation_perfect_positive() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_correlation_perfect_negative() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![10.0, 8.0, 6.0, 4.0, 2.0];
        let r = pearson_correlation(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_correlation_zero_variance_is_undefined() {
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
    }

    #[test]
    fn test_pearson_correlation_too_few_samples() {
        assert_eq!(pearson_correlation(&[], &[]), None);
        assert_eq!(pearson_correlation(&[1.0], &[2.0]), None);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[2.0]), None);
    }

    #[test]
    fn test_correlation_strength() {
        assert_eq!(correlation_strength(0.8), CorrelationStrength::Strong);
        assert_eq!(correlation_strength(-0.75), CorrelationStrength::Strong);
        assert_eq!(correlation_strength(0.7), CorrelationStrength::Moderate);
        assert_eq!(correlation_strength(-0.4), CorrelationStrength::Moderate);
        assert_eq!(correlation_strength(0.39), CorrelationStrength::Weak);
    }

    #[test]
    fn test_pairs_drop_incomplete_observations() {
        let t = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        let observations = vec![
            Observation::new("u", t).metric(BEE_COUNT, 1.0).environmental(TEMPERATURE, 2.0),
            Observation::new("u", t).metric(BEE_COUNT, 2.0),
            Observation::new("u", t).metric(BEE_COUNT, 3.0).environmental(TEMPERATURE, 6.0),
            Observation::new("u", t).environmental(TEMPERATURE, 100.0),
            Observation::new("u", t).metric(BEE_COUNT, 4.0).environmental(TEMPERATURE, 8.0),
        ];

        let correlations = correlate_observations(&observations, &names(&[BEE_COUNT, TEMPERATURE]));
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].sample_size, 3);
        assert_eq!(correlations[0].strength, CorrelationStrength::Strong);
    }

    #[test]
    fn test_undefined_pairs_are_omitted() {
        let t = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        let observations: Vec<Observation> = (1..=3)
            .map(|i| {
                Observation::new("u", t)
                    .metric(BEE_COUNT, i as f64)
                    .metric(HONEY_YIELD, 5.0)
            })
            .collect();

        let report = correlation_report(&observations, &names(&[BEE_COUNT, HONEY_YIELD]));
        assert!(report.correlations.is_empty());
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_engine_reads_retained_history() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start + Duration::days(4)));
        let history = Arc::new(TtlKeyedStore::new("history", Retention::days(365), clock));

        for (i, (bees, yield_kg)) in [(10.0, 12.0), (20.0, 14.0), (30.0, 19.0), (40.0, 21.0)]
            .into_iter()
            .enumerate()
        {
            let ts = start + Duration::days(i as i64);
            history.append(
                "hive-1".to_string(),
                Observation::new("hive-1", ts)
                    .metric(BEE_COUNT, bees)
                    .metric(HONEY_YIELD, yield_kg),
                ts,
            );
        }

        let engine = CorrelationEngine::new(history, names(&[BEE_COUNT, HONEY_YIELD, TEMPERATURE]));
        let report = engine.correlate("hive-1");

        assert_eq!(report.correlations.len(), 1);
        assert_eq!(report.correlations[0].direction, CorrelationDirection::Positive);
        assert_eq!(report.insights.len(), 1);
        assert!(report.insights[0].starts_with("Strong positive correlation between bee_count and honey_yield"));
    }

    #[test]
    fn test_correlation_serializes() {
        let corr = Correlation {
            metric_a: "bee_count".to_string(),
            metric_b: "temperature".to_string(),
            coefficient: 0.72,
            strength: CorrelationStrength::Strong,
            direction: CorrelationDirection::Positive,
            sample_size: 30,
        };

        let json = serde_json::to_string(&corr).unwrap();
        assert!(json.contains("\"coefficient\":0.72"));
        assert!(json.contains("\"strength\":\"strong\""));
    }
}
