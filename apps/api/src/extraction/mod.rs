//! Content Extractor — turns an uploaded PDF or DOCX job description into plain text.
//!
//! Uploads arrive spooled to a temp file. The MIME type is checked before the spool
//! is read, so an unsupported upload never reaches the document parsers. Every call
//! re-reads and re-parses; nothing is cached between submissions.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;
use thiserror::Error;
use tracing::debug;

pub mod docx;
pub mod pdf;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Extensions offered by the upload picker. Checked alongside the MIME type.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx"];

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse {kind} document: {source}")]
    Parse {
        kind: DocumentKind,
        #[source]
        source: BoxError,
    },
}

impl ExtractError {
    pub fn parse(kind: DocumentKind, source: impl Into<BoxError>) -> Self {
        ExtractError::Parse {
            kind,
            source: source.into(),
        }
    }
}

/// The two document formats the intake flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Resolves a MIME type, ignoring case and any `; charset=...` style parameters.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            PDF_MIME => Some(DocumentKind::Pdf),
            DOCX_MIME => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("PDF"),
            DocumentKind::Docx => f.write_str("DOCX"),
        }
    }
}

/// A user-selected file together with the MIME type the client reported for it.
///
/// The bytes live in a spooled temp file, removed when the last clone drops.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub file_name: String,
    pub mime_type: String,
    path: Arc<TempPath>,
}

impl SubmittedFile {
    pub fn spooled(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        path: TempPath,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            path: Arc::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_mime(&self.mime_type)
    }

    /// Mirrors the `.pdf,.docx` filter of the upload picker.
    pub fn has_allowed_extension(&self) -> bool {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| {
                ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }

    /// Reads the whole payload.
    pub async fn read(&self) -> Result<Bytes, ExtractError> {
        Ok(Bytes::from(tokio::fs::read(self.path()).await?))
    }
}

#[cfg(test)]
impl SubmittedFile {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl AsRef<[u8]>,
    ) -> Self {
        use std::io::Write;

        let mut spool = tempfile::NamedTempFile::new().unwrap();
        spool.write_all(bytes.as_ref()).unwrap();
        Self::spooled(file_name, mime_type, spool.into_temp_path())
    }
}

/// A single-format extractor. `ContentExtractor` routes to one of these by MIME type.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, content: Bytes) -> Result<String, ExtractError>;
}

/// Routes a submitted file to the PDF or DOCX extractor.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    pdf: PdfExtractor,
    docx: DocxExtractor,
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn extract(&self, file: &SubmittedFile) -> Result<String, ExtractError> {
        let kind = file
            .kind()
            .ok_or_else(|| ExtractError::UnsupportedFormat(file.mime_type.clone()))?;

        let content = file.read().await?;
        debug!(
            file_name = %file.file_name,
            %kind,
            bytes = content.len(),
            "extracting job description text"
        );

        self.extractor_for(kind).extract(content).await
    }

    fn extractor_for(&self, kind: DocumentKind) -> &dyn DocumentExtractor {
        match kind {
            DocumentKind::Pdf => &self.pdf,
            DocumentKind::Docx => &self.docx,
        }
    }
}

/// Runs a synchronous parser on the blocking pool, reporting a panicked or
/// cancelled worker as a parse failure of the given kind.
pub(crate) async fn run_blocking<F>(kind: DocumentKind, parse: F) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, ExtractError> + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| ExtractError::parse(kind, e))?
}
