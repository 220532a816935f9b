//! DOCX raw-text extraction using docx-rs.
//!
//! Formatting is dropped: only run text survives, with tabs and breaks kept as
//! whitespace. Paragraphs (top-level and inside table cells) are separated by a
//! newline.

use async_trait::async_trait;
use bytes::Bytes;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use crate::extraction::{run_blocking, DocumentExtractor, DocumentKind, ExtractError};

#[derive(Debug, Clone, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    fn extract_sync(content: Bytes) -> Result<String, ExtractError> {
        let docx = docx_rs::read_docx(&content)
            .map_err(|e| ExtractError::parse(DocumentKind::Docx, e))?;

        let mut paragraphs: Vec<String> = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => paragraphs.push(paragraph_text(p)),
                DocumentChild::Table(t) => collect_table_text(t, &mut paragraphs),
                _ => {}
            }
        }

        Ok(paragraphs
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        match child {
            ParagraphChild::Run(r) => push_run_text(&r.children, &mut text),
            ParagraphChild::Hyperlink(h) => {
                for child in &h.children {
                    if let ParagraphChild::Run(r) = child {
                        push_run_text(&r.children, &mut text);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run_text(children: &[RunChild], text: &mut String) {
    for child in children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

fn collect_table_text(t: &Table, paragraphs: &mut Vec<String>) {
    for row in &t.rows {
        let TableChild::TableRow(r) = row;
        for cell in &r.cells {
            let TableRowChild::TableCell(c) = cell;
            for content in &c.children {
                if let TableCellContent::Paragraph(p) = content {
                    paragraphs.push(paragraph_text(p));
                }
            }
        }
    }
}

#[async_trait]
impl DocumentExtractor for DocxExtractor {
    async fn extract(&self, content: Bytes) -> Result<String, ExtractError> {
        run_blocking(DocumentKind::Docx, move || Self::extract_sync(content)).await
    }
}
