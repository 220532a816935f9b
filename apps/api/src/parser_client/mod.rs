/// Parsing Client — sends job-description text to the remote parser and normalizes
/// the reply into a `ParseResult`.
///
/// One attempt per call: no retry, no per-request timeout, no idempotency key.
/// Every failure is converted into `RemoteParseError`, which in turn maps onto the
/// uniform `{jobName, tags, success, message}` shape. Nothing escapes this module
/// as a panic or a foreign error type.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod messages;

use messages::{GENERIC_FAILURE, NO_RESPONSE, REJECTED_FALLBACK};

const PARSE_ENDPOINT: &str = "/jobs/parse";

#[derive(Debug, Error)]
pub enum RemoteParseError {
    /// The parser answered with a non-2xx status.
    #[error("Parser rejected the request (status {status})")]
    Rejected { status: u16, message: Option<String> },

    /// The request went out but no response came back.
    #[error("No response from parser: {0}")]
    NoResponse(#[source] reqwest::Error),

    /// The request could not be built or sent.
    #[error("Could not send parse request: {0}")]
    Request(#[source] reqwest::Error),
}

impl RemoteParseError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            RemoteParseError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            RemoteParseError::Rejected { message: None, .. } => REJECTED_FALLBACK.to_string(),
            RemoteParseError::NoResponse(_) => NO_RESPONSE.to_string(),
            RemoteParseError::Request(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Job metadata derived by the remote parser. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedJob {
    pub job_name: String,
    pub tags: Vec<String>,
}

impl ParsedJob {
    /// Reads `jobName` and `tags` out of a 2xx body, tolerating their absence.
    pub fn from_body(body: &Value) -> Self {
        let job_name = body
            .get("jobName")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let tags = body
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Self { job_name, tags }
    }
}

/// Uniform outcome of one parse request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub job_name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub message: String,
}

impl From<Result<ParsedJob, RemoteParseError>> for ParseResult {
    fn from(result: Result<ParsedJob, RemoteParseError>) -> Self {
        match result {
            Ok(job) => ParseResult {
                job_name: job.job_name,
                tags: job.tags,
                success: true,
                message: String::new(),
            },
            Err(e) => ParseResult {
                message: e.user_message(),
                ..ParseResult::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    prompt: &'a str,
}

/// Anything that can turn job-description text into job metadata.
///
/// Carried in `AppState` as `Arc<dyn JobParser>`.
#[async_trait]
pub trait JobParser: Send + Sync {
    async fn parse_job(
        &self,
        text: &str,
        bearer_token: Option<&str>,
    ) -> Result<ParsedJob, RemoteParseError>;

    /// Submits `text` and always returns a `ParseResult`.
    async fn submit(&self, text: &str, bearer_token: Option<&str>) -> ParseResult {
        self.parse_job(text, bearer_token).await.into()
    }
}

/// HTTP client for the remote job parser. Built once at startup and shared.
#[derive(Clone)]
pub struct ParsingClient {
    client: Client,
    base_url: String,
}

impl ParsingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), PARSE_ENDPOINT)
    }
}

#[async_trait]
impl JobParser for ParsingClient {
    async fn parse_job(
        &self,
        text: &str,
        bearer_token: Option<&str>,
    ) -> Result<ParsedJob, RemoteParseError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&ParseRequest { prompt: text });
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                warn!("Parse request could not be built: {e}");
                RemoteParseError::Request(e)
            } else {
                warn!("Parse request got no response: {e}");
                RemoteParseError::NoResponse(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Parser returned {}: {}", status, body);
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .filter(|m| !m.trim().is_empty());
            return Err(RemoteParseError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Parser response body was cut off: {e}");
            RemoteParseError::NoResponse(e)
        })?;

        let value = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
            warn!("Parser returned {} with a non-JSON body: {e}", status);
            Value::Null
        });
        let job = ParsedJob::from_body(&value);

        debug!(
            "Parse succeeded: job_name={:?}, tags={}",
            job.job_name,
            job.tags.len()
        );

        Ok(job)
    }
}
