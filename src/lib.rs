//! # Hivesight
//!
//! Hive intelligence core: ingests per-user, timestamped apiary observations
//! and derives trend, seasonality, correlation and status signals, merged
//! into prioritized recommendation reports.
//!
//! ## Modules
//!
//! - [`store`]: Retention-bounded per-key stores and the injected clock
//! - [`analysis`]: Trend, correlation, history and recommendation engines
//! - [`report`]: Report synthesis
//! - [`session`]: Sessions, rate limiting and the token denylist
//! - [`progress`]: Long-running analysis jobs
//! - [`service`]: The `HiveCore` facade tying it all together
//!
//! ## Quick Start
//!
//! ```rust
//! use hivesight::{Config, HiveCore, SystemClock, BEE_COUNT};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let core = HiveCore::new(Config::default(), Arc::new(SystemClock)).unwrap();
//!
//! let metrics = BTreeMap::from([(BEE_COUNT.to_string(), 32.0)]);
//! let report = core.generate_report("hive-1", metrics, None, None).unwrap();
//!
//! // Not enough history yet: the trend sections are degraded, not failed
//! assert!(report.is_degraded());
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod import;
pub mod progress;
pub mod report;
pub mod service;
pub mod session;
pub mod store;

// Re-export top-level types for convenience
pub use store::{
    Clock, Entry, ManualClock, Observation, Retention, SystemClock, TimeRange, TtlKeyedStore,
    BEE_COUNT, HONEY_YIELD, HUMIDITY, RAINFALL, TEMPERATURE, WATER_DISTANCE,
};

pub use analysis::{
    CorrelationEngine, EnvironmentalReading, Forecast, HistoricalAnalysis, HistoryAnalyzer,
    KnowledgeBase, Recommendation, StatusSummary, TrendAnalysis, TrendEngine,
};

pub use report::{MediaAnalysis, Report, ReportSynthesizer};

pub use session::{RateDecision, RateLimiter, Session, SessionRegistry, TokenDenylist};

pub use progress::{ChannelObserver, ProgressEvent, ProgressJob, ProgressObserver, ProgressTracker};

pub use service::{HiveCore, SweepStats};

pub use error::{CoreError, CoreResult, ErrorResponse, InsufficientData};

pub use config::{Config, ConfigError, LoggingConfig};

pub use import::{CsvImportResult, ImportError, ObservationCsvImporter};
