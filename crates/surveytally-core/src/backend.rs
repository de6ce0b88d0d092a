use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::SurveyItem;

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("failed to render page {page}: {message}")]
    Render { page: usize, message: String },
}

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("invalid analyzer response: {0}")]
    InvalidResponse(String),
}

/// One rendered page, ready to be sent to an analyzer.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// What the analyzer extracted from one page image.
#[derive(Debug, Clone, Default)]
pub struct PageAnalysis {
    /// The survey/program title, when legible on the page.
    pub title: Option<String>,
    pub items: Vec<SurveyItem>,
}

/// Converts a raw document into an ordered list of page images.
///
/// Implementors must preserve page order and return single-page image
/// inputs as a one-element list. Results are not cached by the pipeline;
/// a resumed document is rasterized again.
pub trait Rasterizer: Send + Sync {
    fn rasterize<'a>(
        &'a self,
        data: &'a [u8],
        mime_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PageImage>, RasterizeError>> + Send + 'a>>;
}

/// Extracts survey marks from one page image.
///
/// Called once per page; the pipeline never batches pages into one call.
pub trait Analyzer: Send + Sync {
    fn analyze<'a>(
        &'a self,
        image: &'a PageImage,
    ) -> Pin<Box<dyn Future<Output = Result<PageAnalysis, AnalyzeError>> + Send + 'a>>;
}
