use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod backend;
pub mod config_file;
pub mod labels;
pub mod matching;
pub mod pipeline;
pub mod rollup;

// Re-export for convenience
pub use aggregate::{AggregatedStat, LabelDistribution, MERGE_THRESHOLD, aggregate_stats};
pub use backend::{AnalyzeError, Analyzer, PageAnalysis, PageImage, RasterizeError, Rasterizer};
pub use matching::{raw_question_key, similarity};
pub use pipeline::{ProgressEvent, run_pipeline};
pub use rollup::ReportSettings;

/// One marked answer extracted from a survey page.
///
/// `label` and `category` are kept as free text on purpose: the analyzer is
/// prompted with the closed vocabularies in [`labels`], but anything it
/// returns outside them still flows through aggregation (see
/// [`AggregatedStat::distribution`] for the consequences).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyItem {
    pub question: String,
    /// 5 (very satisfied) down to 1 (very dissatisfied).
    pub score: u32,
    pub label: String,
    pub category: String,
}

/// Processing state of a single rasterized page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Per-page analysis record, created when rasterization succeeds.
///
/// `items` is non-empty only when `status == Completed`. An `Error` page is
/// reattempted when its document is resumed on a later run; a `Completed`
/// page is never reprocessed. Once every page is terminal the document is
/// settled and skipped entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    pub page_index: usize,
    pub status: PageStatus,
    pub items: Vec<SurveyItem>,
    /// Survey/program title extracted from this page, if any.
    pub title: Option<String>,
    pub error: Option<String>,
}

impl PageResponse {
    pub fn pending(page_index: usize) -> Self {
        Self {
            page_index,
            status: PageStatus::Pending,
            items: Vec::new(),
            title: None,
            error: None,
        }
    }
}

/// One intake document (a scanned PDF or single image) and its per-page state.
///
/// Owned and mutated exclusively by the pipeline; everything else reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDocument {
    /// Opaque id assigned at intake.
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    /// Raw file bytes, kept so a partially processed document can be
    /// re-rasterized on a later run (page images are never cached).
    #[serde(skip)]
    pub data: Vec<u8>,
    /// 0 means the document has not been rasterized yet.
    pub total_pages: usize,
    pub responses: Vec<PageResponse>,
}

impl SurveyDocument {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let id: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(9)
            .collect();
        Self {
            id,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
            total_pages: 0,
            responses: Vec::new(),
        }
    }

    /// Whether every page has reached a terminal status. A settled document
    /// is skipped by the pipeline.
    pub fn is_settled(&self) -> bool {
        self.total_pages > 0
            && self
                .responses
                .iter()
                .all(|r| matches!(r.status, PageStatus::Completed | PageStatus::Error))
    }

    pub fn completed_page_count(&self) -> usize {
        self.responses
            .iter()
            .filter(|r| r.status == PageStatus::Completed)
            .count()
    }

    pub fn error_page_count(&self) -> usize {
        self.responses
            .iter()
            .filter(|r| r.status == PageStatus::Error)
            .count()
    }
}

/// Global pipeline status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Idle,
    Processing,
}

/// The source-of-truth collection of intake documents.
///
/// Passed by mutable reference to [`run_pipeline`]; the aggregation engine
/// and rollup calculator only borrow it and tolerate partially-updated state
/// (they see whatever has completed so far).
#[derive(Debug, Default)]
pub struct SurveyBatch {
    pub documents: Vec<SurveyDocument>,
    pub status: RunStatus,
}

impl SurveyBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw file for processing. Returns the assigned document id.
    pub fn add_document(
        &mut self,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> String {
        let doc = SurveyDocument::new(file_name, mime_type, data);
        let id = doc.id.clone();
        self.documents.push(doc);
        id
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop all documents and return to the initial state.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.status = RunStatus::Idle;
    }

    pub fn completed_page_count(&self) -> usize {
        self.documents.iter().map(|d| d.completed_page_count()).sum()
    }

    pub fn error_page_count(&self) -> usize {
        self.documents.iter().map(|d| d.error_page_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_page(index: usize) -> PageResponse {
        PageResponse {
            status: PageStatus::Completed,
            ..PageResponse::pending(index)
        }
    }

    #[test]
    fn new_document_is_unrasterized() {
        let doc = SurveyDocument::new("scan.pdf", "application/pdf", vec![1, 2, 3]);
        assert_eq!(doc.total_pages, 0);
        assert!(doc.responses.is_empty());
        assert!(!doc.is_settled());
        assert_eq!(doc.id.len(), 9);
    }

    #[test]
    fn settled_requires_terminal_pages() {
        let mut doc = SurveyDocument::new("scan.pdf", "application/pdf", vec![]);
        doc.total_pages = 2;
        doc.responses = vec![completed_page(0), PageResponse::pending(1)];
        assert!(!doc.is_settled());

        doc.responses[1].status = PageStatus::Error;
        assert!(doc.is_settled());

        doc.responses[1].status = PageStatus::Completed;
        assert!(doc.is_settled());
    }

    #[test]
    fn batch_page_counts() {
        let mut batch = SurveyBatch::new();
        batch.add_document("a.pdf", "application/pdf", vec![]);
        batch.documents[0].total_pages = 3;
        batch.documents[0].responses = vec![completed_page(0), completed_page(1), {
            let mut p = PageResponse::pending(2);
            p.status = PageStatus::Error;
            p
        }];

        assert_eq!(batch.completed_page_count(), 2);
        assert_eq!(batch.error_page_count(), 1);
    }

    #[test]
    fn clear_resets_batch() {
        let mut batch = SurveyBatch::new();
        batch.add_document("a.pdf", "application/pdf", vec![]);
        batch.status = RunStatus::Processing;
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.status, RunStatus::Idle);
    }
}
