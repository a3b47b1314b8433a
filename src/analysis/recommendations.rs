//! Recommendation Aggregator
//!
//! Merges recommendation text from every analysis source into one ranked,
//! de-duplicated, categorized list. Priority and category inference are
//! ordered keyword tables evaluated first-match-wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// How soon a recommendation should be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high(0) < medium(1) < low(2)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Area of hive management a recommendation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Foraging,
    Health,
    Management,
    Environment,
    General,
}

/// A prioritized, categorized actionable suggestion
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recommendation {
    pub text: String,
    pub priority: Priority,
    pub category: RecommendationCategory,
}

impl Recommendation {
    /// Infer priority and category from the text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        Self {
            priority: infer_priority(&text),
            category: infer_category(&text),
            text,
        }
    }

    /// De-duplication key: lower-cased, trimmed text
    pub fn normalized(&self) -> String {
        normalize(&self.text)
    }
}

/// Input to [`merge`]: free text or an already-structured recommendation
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecommendation {
    Text(String),
    Structured(Recommendation),
}

impl RawRecommendation {
    fn into_recommendation(self) -> Recommendation {
        match self {
            RawRecommendation::Text(text) => Recommendation::from_text(text),
            RawRecommendation::Structured(rec) => rec,
        }
    }
}

impl From<String> for RawRecommendation {
    fn from(text: String) -> Self {
        RawRecommendation::Text(text)
    }
}

impl From<&str> for RawRecommendation {
    fn from(text: &str) -> Self {
        RawRecommendation::Text(text.to_string())
    }
}

impl From<Recommendation> for RawRecommendation {
    fn from(rec: Recommendation) -> Self {
        RawRecommendation::Structured(rec)
    }
}

/// Priority rules; anything unmatched is low
const PRIORITY_RULES: &[(Priority, &[&str])] = &[
    (Priority::High, &["immediate", "critical", "urgent"]),
    (Priority::Medium, &["important", "necessary", "should"]),
];

/// Category rules; anything unmatched is general
const CATEGORY_RULES: &[(RecommendationCategory, &[&str])] = &[
    (RecommendationCategory::Foraging, &["forage", "food", "nectar", "pollen"]),
    (RecommendationCategory::Health, &["disease", "pest", "health", "infection"]),
    (RecommendationCategory::Management, &["hive", "maintenance", "clean", "inspect"]),
    (RecommendationCategory::Environment, &["weather", "temperature", "rain", "shade"]),
];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn first_match<T: Copy>(text: &str, rules: &[(T, &[&str])]) -> Option<T> {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(tag, _)| *tag)
}

pub fn infer_priority(text: &str) -> Priority {
    first_match(text, PRIORITY_RULES).unwrap_or(Priority::Low)
}

pub fn infer_category(text: &str) -> RecommendationCategory {
    first_match(text, CATEGORY_RULES).unwrap_or(RecommendationCategory::General)
}

/// Merge recommendation sources into one ranked list
///
/// Duplicates (by normalized text) keep the first occurrence's priority and
/// category. The result is stably sorted by priority rank, so equal
/// priorities keep their input order. Blank entries are dropped.
pub fn merge<S, I, R>(sources: S) -> Vec<Recommendation>
where
    S: IntoIterator<Item = I>,
    I: IntoIterator<Item = R>,
    R: Into<RawRecommendation>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for source in sources {
        for raw in source {
            let rec = raw.into().into_recommendation();
            let key = rec.normalized();
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            merged.push(rec);
        }
    }

    merged.sort_by_key(|rec| rec.priority.rank());
    merged
}

/// Urgency tag used when ranking a single source's actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Urgent,
    Important,
    Normal,
}

const URGENCY_RULES: &[(Urgency, &[&str])] = &[
    (Urgency::Urgent, &["immediate", "critical", "urgent", "required"]),
    (Urgency::Important, &["review", "consider", "assess", "monitor"]),
];

pub fn infer_urgency(text: &str) -> Urgency {
    first_match(text, URGENCY_RULES).unwrap_or(Urgency::Normal)
}

/// Stable-sort actions urgent-first and keep at most `limit`
pub fn prioritize_actions(actions: &[String], limit: usize) -> Vec<String> {
    let mut tagged: Vec<(Urgency, &String)> =
        actions.iter().map(|a| (infer_urgency(a), a)).collect();
    tagged.sort_by_key(|(urgency, _)| *urgency);
    tagged
        .into_iter()
        .take(limit)
        .map(|(_, action)| action.clone())
        .collect()
}
