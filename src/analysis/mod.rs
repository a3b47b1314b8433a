//! Hive Analysis
//!
//! Derived signals computed from retained observations. Nothing here is
//! cached; every query recomputes from the stores.
//!
//! ## Components
//!
//! - **TrendEngine**: activity, productivity and seasonal trends plus status
//! - **CorrelationEngine**: pairwise Pearson correlations between metrics
//! - **HistoryAnalyzer**: range summaries and one-week forecasts
//! - **recommendations**: merging, ranking and de-duplication
//! - **KnowledgeBase**: static beekeeping thresholds
//! - **environment**: the environmental section of a report

pub mod correlations;
pub mod environment;
pub mod history;
pub mod knowledge;
pub mod recommendations;
pub mod trends;

pub use correlations::{
    pearson_correlation, Correlation, CorrelationDirection, CorrelationEngine, CorrelationReport,
    CorrelationStrength,
};
pub use environment::{analyze_environment, EnvironmentalAnalysis, EnvironmentalReading};
pub use history::{Forecast, HistoricalAnalysis, HistoryAnalyzer, MetricForecast};
pub use knowledge::{ActivityLevel, HiveType, KnowledgeBase, YieldComparison};
pub use recommendations::{merge, Priority, RawRecommendation, Recommendation, RecommendationCategory};
pub use trends::{
    EnvironmentalCorrelation, OverallStatus, Outlook, StatusSummary, TrendAnalysis, TrendDirection,
    TrendEngine, TrendResult,
};
