// Job-description intake: upload / write / skip, then hand off to interview setup.
// Remote parsing goes through parser_client; document text through extraction.

pub mod flow;
pub mod handlers;
pub mod models;
pub mod navigator;
pub mod session;

use thiserror::Error;
use uuid::Uuid;

use crate::extraction::ExtractError;

/// Failures of an intake action that keep the user on the intake screen.
///
/// The user-input variants carry the inline message shown next to the form.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Intake session {0} not found")]
    SessionNotFound(Uuid),

    #[error("A job description is already being processed. Please wait.")]
    Busy,

    #[error("Please select a file to upload.")]
    NoFileSelected,

    #[error("Please upload a PDF or DOCX file.")]
    UnsupportedFile,

    #[error("Please enter a job description.")]
    EmptyText,

    #[error("The document does not contain any readable text.")]
    EmptyDocument,

    #[error("Could not read the document: {0}")]
    Extraction(#[from] ExtractError),
}
