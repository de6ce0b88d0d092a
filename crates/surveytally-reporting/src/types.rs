use std::str::FromStr;

use serde::Serialize;

use surveytally_core::labels::CATEGORIES;
use surveytally_core::rollup::{
    ReportSettings, category_satisfaction, overall_satisfaction, participation_rate,
    resolved_title, respondents_from_pages,
};
use surveytally_core::{AggregatedStat, SurveyDocument};

/// Title used whenever no legible title was extracted from any page.
pub const FALLBACK_TITLE: &str = "교육명 미상";

const FALLBACK_FILE_STEM: &str = "교육만족도";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// One row of the per-category satisfaction table.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub score: f64,
}

/// The complete report view: rollups plus the sorted per-question statistics.
///
/// A pure snapshot — building it never mutates the batch, so it can be
/// rebuilt mid-run over partially processed data.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Extracted education title; `None` falls back to [`FALLBACK_TITLE`]
    /// at render time.
    pub title: Option<String>,
    pub overall_satisfaction: f64,
    pub completed_respondents: usize,
    pub error_respondents: usize,
    pub target_audience: u32,
    /// Percent of the target audience that responded; `None` when the
    /// target is unknown.
    pub participation_rate: Option<f64>,
    pub file_count: usize,
    /// The four specific categories, fixed order; the catch-all is omitted
    /// from this table (its questions still appear in `stats`).
    pub categories: Vec<CategoryRow>,
    pub stats: Vec<AggregatedStat>,
}

impl Report {
    pub fn build(
        documents: &[SurveyDocument],
        stats: Vec<AggregatedStat>,
        settings: &ReportSettings,
    ) -> Self {
        let ppp = settings.effective_pages_per_person();
        let completed_pages: usize = documents.iter().map(|d| d.completed_page_count()).sum();
        let error_pages: usize = documents.iter().map(|d| d.error_page_count()).sum();
        let completed_respondents = respondents_from_pages(completed_pages, ppp);
        let error_respondents = respondents_from_pages(error_pages, ppp);

        let categories = CATEGORIES[..CATEGORIES.len() - 1]
            .iter()
            .map(|&category| CategoryRow {
                category: category.to_string(),
                score: category_satisfaction(&stats, category),
            })
            .collect();

        Self {
            title: resolved_title(documents),
            overall_satisfaction: overall_satisfaction(&stats),
            completed_respondents,
            error_respondents,
            target_audience: settings.target_audience,
            participation_rate: participation_rate(
                completed_respondents,
                settings.target_audience,
            ),
            file_count: documents.len(),
            categories,
            stats,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(FALLBACK_TITLE)
    }

    /// Filename stem derived from the title: Hangul, ASCII alphanumerics,
    /// spaces, hyphens, and underscores survive, everything else is dropped.
    pub fn sanitized_file_stem(&self) -> String {
        let stem: String = self
            .display_title()
            .chars()
            .filter(|c| {
                matches!(c, '가'..='힣') || c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_')
            })
            .collect();
        let stem = stem.trim();
        if stem.is_empty() {
            FALLBACK_FILE_STEM.to_string()
        } else {
            stem.to_string()
        }
    }
}
