//! Intake flow — validates a user action, runs extraction and the remote parse,
//! and settles the session through the Navigator.
//!
//! User-input errors are rejected before the session enters `Submitting`.
//! Extraction failures abort before any network call. Once `Submitting` begins
//! the work runs on its own task, so a dropped request still settles the session.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::extraction::{ContentExtractor, SubmittedFile};
use crate::intake::models::{IntakeOutcome, SubmissionInput};
use crate::intake::navigator::Navigator;
use crate::intake::session::{resolve_bearer_token, SessionStore};
use crate::intake::IntakeError;
use crate::parser_client::messages::GENERIC_FAILURE;
use crate::parser_client::JobParser;

/// The services one intake action needs. Cheap to clone.
#[derive(Clone)]
pub struct IntakeFlow {
    extractor: Arc<ContentExtractor>,
    parser: Arc<dyn JobParser>,
    sessions: SessionStore,
}

impl IntakeFlow {
    pub fn new(
        extractor: Arc<ContentExtractor>,
        parser: Arc<dyn JobParser>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            extractor,
            parser,
            sessions,
        }
    }

    pub async fn submit_file(
        &self,
        session_id: Uuid,
        file: Option<SubmittedFile>,
        selected_interviewer: Value,
        persistent_token: Option<&str>,
    ) -> Result<IntakeOutcome, IntakeError> {
        self.sessions.begin_action(session_id).await?;

        let file = file.ok_or(IntakeError::NoFileSelected)?;
        // Re-checked here even though the picker filters by extension: a renamed
        // file can carry the right extension and the wrong content type.
        if !file.has_allowed_extension() || file.kind().is_none() {
            warn!(
                %session_id,
                file_name = %file.file_name,
                mime_type = %file.mime_type,
                "rejected upload with unsupported type"
            );
            return Err(IntakeError::UnsupportedFile);
        }

        self.run(
            session_id,
            SubmissionInput::File(file),
            selected_interviewer,
            persistent_token,
        )
        .await
    }

    pub async fn submit_text(
        &self,
        session_id: Uuid,
        content: &str,
        selected_interviewer: Value,
        persistent_token: Option<&str>,
    ) -> Result<IntakeOutcome, IntakeError> {
        self.sessions.begin_action(session_id).await?;

        if content.trim().is_empty() {
            return Err(IntakeError::EmptyText);
        }

        self.run(
            session_id,
            SubmissionInput::Text(content.to_string()),
            selected_interviewer,
            persistent_token,
        )
        .await
    }

    /// Bypasses extraction and parsing entirely.
    pub async fn skip(
        &self,
        session_id: Uuid,
        selected_interviewer: Value,
    ) -> Result<IntakeOutcome, IntakeError> {
        self.sessions.begin_action(session_id).await?;
        Navigator::new(&self.sessions)
            .skip(session_id, selected_interviewer)
            .await
    }

    async fn run(
        &self,
        session_id: Uuid,
        input: SubmissionInput,
        selected_interviewer: Value,
        persistent_token: Option<&str>,
    ) -> Result<IntakeOutcome, IntakeError> {
        let submission = self.sessions.begin_submission(session_id).await?;
        let attempt = submission.attempt;
        info!(%session_id, attempt, kind = input.kind(), "intake submission started");

        let token = resolve_bearer_token(persistent_token, submission.session_token.as_deref());
        let flow = self.clone();
        let work = tokio::spawn(async move {
            flow.process(session_id, attempt, input, selected_interviewer, token)
                .await
        });

        match work.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%session_id, attempt, "intake submission task failed: {e}");
                self.sessions
                    .fail(session_id, attempt, GENERIC_FAILURE)
                    .await?;
                Ok(IntakeOutcome::Failed {
                    message: GENERIC_FAILURE.to_string(),
                })
            }
        }
    }

    async fn process(
        &self,
        session_id: Uuid,
        attempt: u64,
        input: SubmissionInput,
        selected_interviewer: Value,
        token: Option<String>,
    ) -> Result<IntakeOutcome, IntakeError> {
        let text = match self.text_of(input).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%session_id, "intake submission aborted: {e}");
                self.sessions.fail(session_id, attempt, e.to_string()).await?;
                return Err(e);
            }
        };

        let result = self.parser.submit(&text, token.as_deref()).await;

        Navigator::new(&self.sessions)
            .settle(session_id, attempt, result, selected_interviewer, text)
            .await
    }

    async fn text_of(&self, input: SubmissionInput) -> Result<String, IntakeError> {
        match input {
            SubmissionInput::Text(content) => Ok(content),
            SubmissionInput::File(file) => {
                let text = self.extractor.extract(&file).await?;
                if text.trim().is_empty() {
                    return Err(IntakeError::EmptyDocument);
                }
                Ok(text)
            }
        }
    }
}
