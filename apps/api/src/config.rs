use anyhow::{Context, Result};

use crate::intake::session::DEFAULT_SESSION_TTL_SECS;

pub const DEFAULT_PARSER_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if a numeric variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote job parser; requests go to `{base}/jobs/parse`.
    pub parser_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    /// Intake sessions idle for longer than this are dropped.
    pub session_ttl_secs: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            parser_base_url: parser_base_url(std::env::var("PARSER_BASE_URL").ok()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: match std::env::var("MAX_UPLOAD_BYTES") {
                Ok(v) => v
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
            },
            session_ttl_secs: match std::env::var("SESSION_TTL_SECS") {
                Ok(v) => v
                    .parse::<u32>()
                    .context("SESSION_TTL_SECS must be a number of seconds")?,
                Err(_) => DEFAULT_SESSION_TTL_SECS,
            },
        })
    }
}

fn parser_base_url(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PARSER_BASE_URL.to_string())
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            parser_base_url: DEFAULT_PARSER_BASE_URL.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}
