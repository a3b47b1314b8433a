//! Hive Reports
//!
//! - **types**: the report and the media findings it folds in
//! - **synthesizer**: orchestration of a single report request

pub mod synthesizer;
pub mod types;

pub use synthesizer::ReportSynthesizer;
pub use types::{
    DegradedSection, FrameFinding, MediaAnalysis, MediaKind, MediaSection, Report, ReportSummary,
    TrendSection,
};
