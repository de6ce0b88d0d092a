//! Scalar summaries derived from aggregated statistics and raw page state.
//!
//! Everything here is a pure projection, recomputed on demand; nothing is
//! cached between pipeline runs.

use serde::{Deserialize, Serialize};

use crate::{AggregatedStat, SurveyDocument};

/// User-tunable report parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportSettings {
    /// How many consecutive processed pages make up one respondent.
    /// Values below 1 are treated as 1.
    pub pages_per_person: u32,
    /// Planned audience size for the participation rate. 0 means unknown.
    pub target_audience: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            pages_per_person: 1,
            target_audience: 0,
        }
    }
}

impl ReportSettings {
    /// `pages_per_person` with the ≥ 1 clamp applied.
    pub fn effective_pages_per_person(&self) -> u32 {
        self.pages_per_person.max(1)
    }
}

/// Mean score over every bucket, `0.0` when no completed items exist.
pub fn overall_satisfaction(stats: &[AggregatedStat]) -> f64 {
    weighted_mean(stats.iter())
}

/// Mean score over the buckets of one category, `0.0` when the category has
/// no data.
pub fn category_satisfaction(stats: &[AggregatedStat], category: &str) -> f64 {
    weighted_mean(stats.iter().filter(|s| s.category == category))
}

fn weighted_mean<'a>(stats: impl Iterator<Item = &'a AggregatedStat>) -> f64 {
    let (total, count) = stats.fold((0u64, 0u64), |(t, c), s| {
        (t + s.total_score, c + u64::from(s.count))
    });
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Pages-to-respondents floor division. Applied separately to completed and
/// errored page counts by the report layer.
pub fn respondents_from_pages(page_count: usize, pages_per_person: u32) -> usize {
    page_count / pages_per_person.max(1) as usize
}

/// Percentage of the target audience that responded. `None` when the target
/// is unknown (0).
pub fn participation_rate(completed_respondents: usize, target_audience: u32) -> Option<f64> {
    if target_audience == 0 {
        return None;
    }
    Some(completed_respondents as f64 / f64::from(target_audience) * 100.0)
}

/// First non-empty title scanning documents then pages in stored order,
/// with surrounding whitespace removed.
pub fn resolved_title(documents: &[SurveyDocument]) -> Option<String> {
    documents
        .iter()
        .flat_map(|d| d.responses.iter())
        .filter_map(|r| r.title.as_deref().map(str::trim))
        .find(|t| !t.is_empty())
        .map(String::from)
}
