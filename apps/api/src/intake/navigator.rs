//! Navigator — moves a finished intake on to the interview setup step.
//!
//! On success the derived tags, the untouched interviewer selection and the raw
//! job description travel with the outcome, and `jobName` lands in the session
//! for the setup step to read. On failure the message is recorded and the user
//! stays on the intake screen.

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::intake::models::{IntakeOutcome, NavigationPayload};
use crate::intake::session::SessionStore;
use crate::intake::IntakeError;
use crate::parser_client::ParseResult;

/// Route of the step that consumes the navigation payload.
pub const NEXT_STEP: &str = "/interview/setup";

pub struct Navigator<'a> {
    sessions: &'a SessionStore,
}

impl<'a> Navigator<'a> {
    pub fn new(sessions: &'a SessionStore) -> Self {
        Self { sessions }
    }

    /// Settles submission `attempt` from its parse result.
    pub async fn settle(
        &self,
        session_id: Uuid,
        attempt: u64,
        result: ParseResult,
        selected_interviewer: Value,
        job_description: String,
    ) -> Result<IntakeOutcome, IntakeError> {
        if !result.success {
            self.sessions
                .fail(session_id, attempt, result.message.clone())
                .await?;
            return Ok(IntakeOutcome::Failed {
                message: result.message,
            });
        }

        self.sessions
            .complete(session_id, attempt, Some(result.job_name.clone()))
            .await?;
        info!(
            %session_id,
            job_name = %result.job_name,
            tags = result.tags.len(),
            "intake handed off to interview setup"
        );

        Ok(IntakeOutcome::Navigated {
            next_step: NEXT_STEP.to_string(),
            job_name: result.job_name,
            navigation: NavigationPayload {
                tags: result.tags,
                selected_interviewer,
                job_description,
            },
        })
    }

    /// Hands off without a job description. Any job name cached by an earlier
    /// attempt in this session is dropped.
    pub async fn skip(
        &self,
        session_id: Uuid,
        selected_interviewer: Value,
    ) -> Result<IntakeOutcome, IntakeError> {
        let submission = self.sessions.begin_submission(session_id).await?;
        self.sessions
            .complete(session_id, submission.attempt, None)
            .await?;
        info!(%session_id, "intake skipped");

        Ok(IntakeOutcome::Navigated {
            next_step: NEXT_STEP.to_string(),
            job_name: String::new(),
            navigation: NavigationPayload {
                tags: Vec::new(),
                selected_interviewer,
                job_description: String::new(),
            },
        })
    }
}
