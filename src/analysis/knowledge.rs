//! Knowledge Base
//!
//! Static beekeeping thresholds consulted by the analysis engines. Loaded
//! from the `[knowledge]` config section; never computed by the core.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::environment::EnvironmentalReading;

/// Inclusive numeric band
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Hive construction, which determines the expected yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HiveType {
    #[default]
    Modern,
    Traditional,
}

/// Mean yield compared to the optimal band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldComparison {
    BelowOptimal,
    Optimal,
    AboveOptimal,
}

impl fmt::Display for YieldComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldComparison::BelowOptimal => write!(f, "below_optimal"),
            YieldComparison::Optimal => write!(f, "optimal"),
            YieldComparison::AboveOptimal => write!(f, "above_optimal"),
        }
    }
}

/// Forager activity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

/// Read-only thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeBase {
    /// Temperature band for optimal foraging, Celsius
    #[serde(default = "default_temperature_optimal")]
    pub temperature_optimal: Band,

    /// Below this foraging stops entirely
    #[serde(default = "default_too_cold")]
    pub temperature_too_cold: f64,

    /// Above this foraging stops entirely
    #[serde(default = "default_too_hot")]
    pub temperature_too_hot: f64,

    /// Weather conditions considered good for foraging
    #[serde(default = "default_weather_conditions")]
    pub favorable_weather: Vec<String>,

    /// Optimal honey yield per harvest for modern hives, kg
    #[serde(default = "default_modern_yield")]
    pub modern_hive_yield: Band,

    /// Optimal honey yield per harvest for traditional hives, kg
    #[serde(default = "default_traditional_yield")]
    pub traditional_hive_yield: Band,

    /// Bees per minute above which activity is high
    #[serde(default = "default_activity_high")]
    pub activity_high: f64,

    /// Bees per minute above which activity is medium
    #[serde(default = "default_activity_medium")]
    pub activity_medium: f64,

    /// Comfortable relative humidity, percent
    #[serde(default = "default_humidity_band")]
    pub humidity_comfort: Band,

    /// Furthest acceptable distance to water, metres
    #[serde(default = "default_max_water_distance")]
    pub max_water_distance: f64,
}

fn default_temperature_optimal() -> Band {
    Band::new(20.0, 35.0)
}

fn default_too_cold() -> f64 {
    10.0
}

fn default_too_hot() -> f64 {
    40.0
}

fn default_weather_conditions() -> Vec<String> {
    ["clear_sky", "partial_clouds", "light_wind", "no_rain"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_modern_yield() -> Band {
    Band::new(15.0, 25.0)
}

fn default_traditional_yield() -> Band {
    Band::new(8.0, 15.0)
}

fn default_activity_high() -> f64 {
    40.0
}

fn default_activity_medium() -> f64 {
    20.0
}

fn default_humidity_band() -> Band {
    Band::new(30.0, 80.0)
}

fn default_max_water_distance() -> f64 {
    3000.0
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            temperature_optimal: default_temperature_optimal(),
            temperature_too_cold: default_too_cold(),
            temperature_too_hot: default_too_hot(),
            favorable_weather: default_weather_conditions(),
            modern_hive_yield: default_modern_yield(),
            traditional_hive_yield: default_traditional_yield(),
            activity_high: default_activity_high(),
            activity_medium: default_activity_medium(),
            humidity_comfort: default_humidity_band(),
            max_water_distance: default_max_water_distance(),
        }
    }
}

impl KnowledgeBase {
    pub fn yield_band(&self, hive_type: HiveType) -> Band {
        match hive_type {
            HiveType::Modern => self.modern_hive_yield,
            HiveType::Traditional => self.traditional_hive_yield,
        }
    }

    /// Classify a mean yield against the optimal band for the hive type
    pub fn compare_yield(&self, mean: f64, hive_type: HiveType) -> YieldComparison {
        let band = self.yield_band(hive_type);
        if mean >= band.max {
            YieldComparison::AboveOptimal
        } else if mean >= band.min {
            YieldComparison::Optimal
        } else {
            YieldComparison::BelowOptimal
        }
    }

    pub fn activity_level(&self, bee_count: f64) -> ActivityLevel {
        if bee_count > self.activity_high {
            ActivityLevel::High
        } else if bee_count > self.activity_medium {
            ActivityLevel::Medium
        } else {
            ActivityLevel::Low
        }
    }

    pub fn is_favorable_weather(&self, condition: &str) -> bool {
        self.favorable_weather.iter().any(|c| c == condition)
    }

    /// Alerts and management advice for the current conditions
    pub fn foraging_recommendations(&self, reading: &EnvironmentalReading) -> Vec<String> {
        let mut recommendations = Vec::new();

        if let Some(temp) = reading.temperature {
            if temp < self.temperature_optimal.min {
                recommendations.push("Temperature too low for optimal foraging".to_string());
            } else if temp > self.temperature_optimal.max {
                recommendations.push("Temperature too high for optimal foraging".to_string());
            }
        }

        if let Some(distance) = reading.water_distance {
            if distance > self.max_water_distance {
                recommendations.push("Consider providing closer water sources".to_string());
            }
        }

        recommendations
    }

    /// One-line assessment; temperature outranks weather
    pub fn assess_impact(&self, reading: &EnvironmentalReading) -> String {
        if let Some(temp) = reading.temperature {
            if temp < self.temperature_optimal.min {
                return "Temperature below optimal foraging range".to_string();
            }
            if temp > self.temperature_optimal.max {
                return "Temperature above optimal foraging range".to_string();
            }
        }

        if let Some(condition) = reading.weather_condition.as_deref() {
            if !self.is_favorable_weather(condition) {
                return "Sub-optimal weather conditions for foraging".to_string();
            }
        }

        "Environmental conditions within acceptable range".to_string()
    }
}
