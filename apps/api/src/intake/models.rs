use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extraction::SubmittedFile;

/// What the user handed in on one submission attempt.
#[derive(Debug, Clone)]
pub enum SubmissionInput {
    File(SubmittedFile),
    Text(String),
}

impl SubmissionInput {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionInput::File(_) => "file",
            SubmissionInput::Text(_) => "text",
        }
    }
}

/// State carried to the interview setup step. Transient: never stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPayload {
    pub tags: Vec<String>,
    /// Opaque to this service; passed through exactly as received.
    pub selected_interviewer: Value,
    pub job_description: String,
}

/// Result of a submit or skip action, as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Navigated {
        next_step: String,
        job_name: String,
        navigation: NavigationPayload,
    },
    Failed {
        message: String,
    },
}

#[cfg(test)]
impl IntakeOutcome {
    pub fn navigation(&self) -> Option<&NavigationPayload> {
        match self {
            IntakeOutcome::Navigated { navigation, .. } => Some(navigation),
            IntakeOutcome::Failed { .. } => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Restart an existing session instead of creating a new one.
    pub session_id: Option<uuid::Uuid>,
    /// Session-scoped bearer token for the remote parser.
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: uuid::Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTextRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub selected_interviewer: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkipRequest {
    #[serde(default)]
    pub selected_interviewer: Value,
}
