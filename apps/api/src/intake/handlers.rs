//! Axum route handlers for the Intake API.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::SubmittedFile;
use crate::intake::models::{
    IntakeOutcome, SkipRequest, StartSessionRequest, StartSessionResponse, SubmitTextRequest,
};
use crate::intake::session::IntakeSession;
use crate::state::AppState;

/// Bearer token the client holds in persistent storage, forwarded on each request.
fn persistent_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// An empty body means "use the defaults"; anything else must be valid JSON.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
}

/// POST /api/v1/intake/sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartSessionResponse>), AppError> {
    let req: StartSessionRequest = optional_json(&body)?;
    let session_id = state.sessions.start(req.session_id, req.token).await;
    Ok((StatusCode::CREATED, Json(StartSessionResponse { session_id })))
}

/// GET /api/v1/intake/sessions/:id
///
/// The interview setup step reads the cached `job_name` from here.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IntakeSession>, AppError> {
    Ok(Json(state.sessions.get(id).await?))
}

/// POST /api/v1/intake/sessions/:id/text
pub async fn handle_submit_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<SubmitTextRequest>,
) -> Result<Json<IntakeOutcome>, AppError> {
    let outcome = state
        .intake_flow()
        .submit_text(
            id,
            &req.content,
            req.selected_interviewer,
            persistent_token(&headers),
        )
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/intake/sessions/:id/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<IntakeOutcome>, AppError> {
    let req: SkipRequest = optional_json(&body)?;
    let outcome = state
        .intake_flow()
        .skip(id, req.selected_interviewer)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/intake/sessions/:id/file
///
/// Multipart fields: `file` (the document) and optional `selected_interviewer`
/// (JSON text; anything that is not valid JSON is passed through as a string).
pub async fn handle_submit_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<IntakeOutcome>, AppError> {
    let mut file: Option<SubmittedFile> = None;
    let mut selected_interviewer = Value::Null;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => file = read_file_field(field).await?,
            Some("selected_interviewer") => {
                let raw = field.text().await.map_err(multipart_error)?;
                selected_interviewer =
                    serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw));
            }
            _ => {}
        }
    }

    let outcome = state
        .intake_flow()
        .submit_file(id, file, selected_interviewer, persistent_token(&headers))
        .await?;
    Ok(Json(outcome))
}

/// Streams the `file` part into a temp file. An empty, unnamed part is how
/// browsers send "no file chosen".
async fn read_file_field(mut field: Field<'_>) -> Result<Option<SubmittedFile>, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field.content_type().unwrap_or_default().to_string();

    let spool = NamedTempFile::new().context("Failed to create upload spool file")?;
    let mut out = tokio::fs::File::from_std(
        spool
            .as_file()
            .try_clone()
            .context("Failed to open upload spool file")?,
    );
    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        out.write_all(&chunk)
            .await
            .context("Failed to write upload spool file")?;
        size += chunk.len();
    }
    out.flush().await.context("Failed to write upload spool file")?;

    if file_name.is_empty() && size == 0 {
        return Ok(None);
    }
    debug!(%file_name, size, "upload spooled");
    Ok(Some(SubmittedFile::spooled(
        file_name,
        mime_type,
        spool.into_temp_path(),
    )))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistent_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(persistent_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(persistent_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, "Basic dXNlcjpw".parse().unwrap());
        assert_eq!(persistent_token(&headers), None);
    }

    #[test]
    fn test_empty_body_uses_defaults() {
        let req: SkipRequest = optional_json(b"").unwrap();
        assert_eq!(req.selected_interviewer, Value::Null);

        let req: StartSessionRequest = optional_json(b" \n").unwrap();
        assert!(req.session_id.is_none());
        assert!(req.token.is_none());
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let err = optional_json::<StartSessionRequest>(br#"{"token": "#).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.starts_with("Invalid JSON body")));

        let err = optional_json::<StartSessionRequest>(br#"{"session_id": "not-a-uuid"}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
