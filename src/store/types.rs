//! Core data types for observation storage
//!
//! - `Observation`: one timestamped record of metrics and environmental readings
//! - `TimeRange`: a half-open interval used to slice retained history
//! - metric name constants shared by the analysis engines

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bees counted at the hive entrance
pub const BEE_COUNT: &str = "bee_count";
/// Honey harvested, in kg
pub const HONEY_YIELD: &str = "honey_yield";
/// Ambient temperature, in Celsius
pub const TEMPERATURE: &str = "temperature";
/// Relative humidity, in percent
pub const HUMIDITY: &str = "humidity";
/// Rainfall, in mm
pub const RAINFALL: &str = "rainfall";
/// Distance from hive to nearest water, in metres
pub const WATER_DISTANCE: &str = "water_distance";

/// A single timestamped observation for one user
///
/// Immutable once stored; the stores hand out clones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub environmental: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp,
            metrics: BTreeMap::new(),
            environmental: BTreeMap::new(),
        }
    }

    /// Builder method: add a metric reading
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Builder method: add an environmental reading
    pub fn environmental(mut self, name: impl Into<String>, value: f64) -> Self {
        self.environmental.insert(name.into(), value);
        self
    }

    /// Look a value up by name, metrics first, then environmental readings
    pub fn value(&self, name: &str) -> Option<f64> {
        self.metrics
            .get(name)
            .or_else(|| self.environmental.get(name))
            .copied()
    }

    /// Boundary validation, done once when the observation enters the core
    pub fn validate(&self) -> CoreResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(CoreError::validation("user_id must not be empty"));
        }

        for (name, value) in self.metrics.iter().chain(self.environmental.iter()) {
            if name.trim().is_empty() {
                return Err(CoreError::validation("metric names must not be empty"));
            }
            if !value.is_finite() {
                return Err(CoreError::validation(format!(
                    "metric '{}' must be a finite number",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Time range for queries (half-open interval: [start, end))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, returning None if start >= end
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Range covering the `days` days before `now`, `now` included
    ///
    /// A lookback reaching past the earliest representable instant is
    /// clamped to it.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            start,
            end: now + Duration::milliseconds(1),
        }
    }

    /// Build from optional bounds; open ends stretch to the widest instants
    pub fn from_bounds(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> CoreResult<Self> {
        let start = start.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::try_new(start, end)
            .ok_or_else(|| CoreError::validation("start must be earlier than end"))
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
