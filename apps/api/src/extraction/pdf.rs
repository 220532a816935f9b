//! PDF text extraction using lopdf.
//!
//! Pages are discovered from the document's page tree and visited strictly in
//! ascending order. Each page's text is split into fragments (one per non-blank
//! line), and fragments and pages alike are joined with a single space.

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::Document;

use crate::extraction::{run_blocking, BoxError, DocumentExtractor, DocumentKind, ExtractError};

/// A document that can be walked page by page.
pub trait PagedDocument {
    /// 1-based page numbers present in the document.
    fn page_numbers(&self) -> Vec<u32>;

    fn page_text(&self, page_number: u32) -> Result<String, BoxError>;
}

impl PagedDocument for Document {
    fn page_numbers(&self) -> Vec<u32> {
        self.get_pages().keys().copied().collect()
    }

    fn page_text(&self, page_number: u32) -> Result<String, BoxError> {
        Ok(self.extract_text(&[page_number])?)
    }
}

/// Concatenates the text of every page, in page order, each page visited once.
pub fn join_pages<D: PagedDocument>(doc: &D) -> Result<String, ExtractError> {
    let mut page_numbers = doc.page_numbers();
    page_numbers.sort_unstable();
    page_numbers.dedup();

    let mut fragments: Vec<String> = Vec::new();
    for page_number in page_numbers {
        let text = doc
            .page_text(page_number)
            .map_err(|e| ExtractError::parse(DocumentKind::Pdf, e))?;
        fragments.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
    }

    Ok(fragments.join(" "))
}

#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    fn extract_sync(content: Bytes) -> Result<String, ExtractError> {
        let doc = Document::load_mem(&content)
            .map_err(|e| ExtractError::parse(DocumentKind::Pdf, e))?;
        join_pages(&doc)
    }
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    async fn extract(&self, content: Bytes) -> Result<String, ExtractError> {
        run_blocking(DocumentKind::Pdf, move || Self::extract_sync(content)).await
    }
}
