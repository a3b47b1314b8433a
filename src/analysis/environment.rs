//! Environmental Analysis
//!
//! Turns an externally supplied environmental reading into the typed
//! environmental section of a report.

use super::knowledge::KnowledgeBase;
use crate::error::{CoreError, CoreResult};
use crate::store::{HUMIDITY, RAINFALL, TEMPERATURE, WATER_DISTANCE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current conditions at the apiary
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EnvironmentalReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_distance: Option<f64>,
}

impl EnvironmentalReading {
    /// Numeric readings keyed by metric name, for storing on an observation
    pub fn numeric(&self) -> BTreeMap<String, f64> {
        [
            (TEMPERATURE, self.temperature),
            (HUMIDITY, self.humidity),
            (RAINFALL, self.rainfall),
            (WATER_DISTANCE, self.water_distance),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect()
    }

    pub fn validate(&self) -> CoreResult<()> {
        for (name, value) in self.numeric() {
            if !value.is_finite() {
                return Err(CoreError::validation(format!(
                    "environmental reading '{}' must be a finite number",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Overall foraging outlook given the conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForagingConditions {
    Optimal,
    Suboptimal,
    Limited,
}

/// Risks and opportunities found in the reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactAnalysis {
    pub foraging_conditions: ForagingConditions,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
}

/// The environmental section of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentalAnalysis {
    pub conditions: EnvironmentalReading,
    pub impact_assessment: String,
    pub impact: ImpactAnalysis,
    pub recommendations: Vec<String>,
}

/// Assess a reading against the knowledge base
pub fn analyze_environment(reading: &EnvironmentalReading, kb: &KnowledgeBase) -> EnvironmentalAnalysis {
    let mut impact = ImpactAnalysis {
        foraging_conditions: ForagingConditions::Optimal,
        risks: Vec::new(),
        opportunities: Vec::new(),
    };

    if let Some(temp) = reading.temperature {
        if temp < kb.temperature_optimal.min {
            impact
                .risks
                .push("Temperature too low for optimal foraging".to_string());
            impact.foraging_conditions = ForagingConditions::Suboptimal;
        } else if temp > kb.temperature_optimal.max {
            impact
                .risks
                .push("Temperature too high for optimal foraging".to_string());
            impact.foraging_conditions = ForagingConditions::Suboptimal;
        } else {
            impact
                .opportunities
                .push("Temperature within optimal range".to_string());
        }
    }

    if let Some(humidity) = reading.humidity {
        if humidity > kb.humidity_comfort.max {
            impact
                .risks
                .push("High humidity may affect nectar concentration".to_string());
        } else if humidity < kb.humidity_comfort.min {
            impact
                .risks
                .push("Low humidity may affect nectar availability".to_string());
        }
    }

    if let Some(rainfall) = reading.rainfall {
        if rainfall > 0.0 {
            impact
                .risks
                .push("Active rainfall may limit foraging activity".to_string());
            impact.foraging_conditions = ForagingConditions::Limited;
        }
    }

    EnvironmentalAnalysis {
        conditions: reading.clone(),
        impact_assessment: kb.assess_impact(reading),
        impact,
        recommendations: kb.foraging_recommendations(reading),
    }
}
