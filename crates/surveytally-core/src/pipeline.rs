//! The processing pipeline: drives every intake document through
//! rasterization and per-page analysis, sequentially and cancellably.
//!
//! Documents are visited strictly in collection order and pages strictly in
//! index order. The two collaborator calls are the only suspension points;
//! cancellation is checked cooperatively before each document and before
//! each page, so an in-flight call always runs to completion.

use tokio_util::sync::CancellationToken;

use crate::backend::{Analyzer, Rasterizer};
use crate::{PageResponse, PageStatus, RunStatus, SurveyBatch};

/// Progress events emitted while the pipeline runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Rasterizing {
        file_name: String,
    },
    Rasterized {
        file_name: String,
        total_pages: usize,
    },
    /// Rasterization failed on a document that had never been rasterized;
    /// the document has been removed from the batch.
    DocumentDropped {
        file_name: String,
        message: String,
    },
    /// Re-rasterization of a partially processed document failed; the
    /// document keeps its existing page state and is skipped this run.
    RasterizeFailed {
        file_name: String,
        message: String,
    },
    AnalyzingPage {
        file_name: String,
        page_index: usize,
        total_pages: usize,
    },
    PageCompleted {
        file_name: String,
        page_index: usize,
        item_count: usize,
    },
    PageFailed {
        file_name: String,
        page_index: usize,
        message: String,
    },
    Cancelled,
}

/// Run the pipeline over every unsettled document in the batch.
///
/// Mutates `batch` in place and emits [`ProgressEvent`]s through the
/// callback. Collaborator failures are local: a rasterization failure costs
/// the affected document, an analysis failure costs the affected page, and
/// the run always continues with the next unit of work. Cancellation stops
/// the run at the next loop boundary, leaving untouched documents with
/// `total_pages == 0`.
///
/// Pass a fresh [`CancellationToken`] per run. On a later run, documents
/// with pages still in `Pending` are resumed and their `Pending`/`Error`
/// pages reattempted; `Completed` pages never are, and a settled document
/// (every page terminal) is skipped wholesale even if some pages errored.
pub async fn run_pipeline(
    batch: &mut SurveyBatch,
    rasterizer: &dyn Rasterizer,
    analyzer: &dyn Analyzer,
    progress: impl Fn(ProgressEvent),
    cancel: CancellationToken,
) {
    if batch.documents.is_empty() {
        return;
    }
    batch.status = RunStatus::Processing;

    let mut i = 0;
    'documents: while i < batch.documents.len() {
        if cancel.is_cancelled() {
            progress(ProgressEvent::Cancelled);
            break;
        }

        if batch.documents[i].is_settled() {
            i += 1;
            continue;
        }

        let file_name = batch.documents[i].file_name.clone();
        let fresh = batch.documents[i].total_pages == 0;
        progress(ProgressEvent::Rasterizing {
            file_name: file_name.clone(),
        });

        // Page images are never cached: a resumed document is rasterized
        // again from its raw bytes.
        let doc = &batch.documents[i];
        let images = match rasterizer.rasterize(&doc.data, &doc.mime_type).await {
            Ok(images) => images,
            Err(e) if fresh => {
                tracing::warn!(file = %file_name, error = %e, "rasterization failed, dropping document");
                progress(ProgressEvent::DocumentDropped {
                    file_name,
                    message: e.to_string(),
                });
                batch.documents.remove(i);
                continue;
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "re-rasterization failed, keeping page state");
                progress(ProgressEvent::RasterizeFailed {
                    file_name,
                    message: e.to_string(),
                });
                i += 1;
                continue;
            }
        };

        if fresh {
            let doc = &mut batch.documents[i];
            doc.total_pages = images.len();
            doc.responses = (0..images.len()).map(PageResponse::pending).collect();
            progress(ProgressEvent::Rasterized {
                file_name: file_name.clone(),
                total_pages: images.len(),
            });
        }

        let total_pages = batch.documents[i].total_pages;
        for (page_index, image) in images.iter().enumerate() {
            if cancel.is_cancelled() {
                progress(ProgressEvent::Cancelled);
                break 'documents;
            }

            let Some(response) = batch.documents[i].responses.get_mut(page_index) else {
                break;
            };
            if response.status == PageStatus::Completed {
                continue;
            }
            response.status = PageStatus::Processing;
            progress(ProgressEvent::AnalyzingPage {
                file_name: file_name.clone(),
                page_index,
                total_pages,
            });

            match analyzer.analyze(image).await {
                Ok(analysis) => {
                    let response = &mut batch.documents[i].responses[page_index];
                    response.status = PageStatus::Completed;
                    response.title = analysis.title;
                    let item_count = analysis.items.len();
                    response.items = analysis.items;
                    response.error = None;
                    progress(ProgressEvent::PageCompleted {
                        file_name: file_name.clone(),
                        page_index,
                        item_count,
                    });
                }
                Err(e) => {
                    tracing::debug!(file = %file_name, page = page_index, error = %e, "page analysis failed");
                    let response = &mut batch.documents[i].responses[page_index];
                    response.status = PageStatus::Error;
                    response.error = Some(e.to_string());
                    progress(ProgressEvent::PageFailed {
                        file_name: file_name.clone(),
                        page_index,
                        message: e.to_string(),
                    });
                }
            }
        }

        i += 1;
    }

    batch.status = RunStatus::Idle;
}
