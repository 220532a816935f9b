//! Session-scoped intake state: the Idle/Submitting/Navigated/Failed state machine
//! plus the cached `jobName` the setup step reads back.
//!
//! The lock is only held for the short state transitions, never across extraction
//! or the network call. The `Submitting` state itself is what keeps a second
//! submission out while one is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::intake::IntakeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IntakeState {
    Idle,
    Submitting,
    SuccessNavigated,
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeSession {
    #[serde(rename = "session_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub state: IntakeState,
    pub job_name: Option<String>,
    #[serde(skip)]
    pub session_token: Option<String>,
    /// Bumped on every submission and restart. Only the latest attempt may settle.
    #[serde(skip)]
    attempt: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntakeSession {
    fn new(id: Uuid, session_token: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: IntakeState::Idle,
            job_name: None,
            session_token,
            attempt: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn set_state(&mut self, state: IntakeState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Handle on one in-flight submission, returned by `begin_submission`.
#[derive(Debug, Clone)]
pub struct Submission {
    pub attempt: u64,
    pub session_token: Option<String>,
}

/// First non-blank token wins: the persistent one, then the session-scoped one.
pub fn resolve_bearer_token(persistent: Option<&str>, session: Option<&str>) -> Option<String> {
    [persistent, session]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(String::from)
}

pub const DEFAULT_SESSION_TTL_SECS: u32 = 60 * 60;

/// In-memory store of intake sessions, shared across handlers.
///
/// Sessions untouched for longer than the TTL are dropped by `evict_expired`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, IntakeSession>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(i64::from(DEFAULT_SESSION_TTL_SECS)))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Opens an intake session. Restarting a known session clears its cached job
    /// name and state, and supersedes any submission still in flight. An unknown
    /// or absent id gets a fresh session.
    pub async fn start(&self, existing: Option<Uuid>, token: Option<String>) -> Uuid {
        let token = token.filter(|t| !t.trim().is_empty());
        let mut sessions = self.sessions.write().await;

        if let Some(session) = existing.and_then(|id| sessions.get_mut(&id)) {
            if session.state == IntakeState::Submitting {
                warn!(session_id = %session.id, "restart supersedes an in-flight submission");
            }
            session.attempt += 1;
            session.job_name = None;
            session.set_state(IntakeState::Idle);
            if token.is_some() {
                session.session_token = token;
            }
            info!(session_id = %session.id, "intake session restarted");
            return session.id;
        }

        let id = Uuid::new_v4();
        sessions.insert(id, IntakeSession::new(id, token));
        info!(session_id = %id, "intake session started");
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<IntakeSession, IntakeError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(IntakeError::SessionNotFound(id))
    }

    /// Registers a user action: rejects it while a submission is in flight and
    /// returns a `Failed` session to `Idle`.
    pub async fn begin_action(&self, id: Uuid) -> Result<(), IntakeError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(IntakeError::SessionNotFound(id))?;
        match session.state {
            IntakeState::Submitting => Err(IntakeError::Busy),
            IntakeState::Failed { .. } => {
                session.set_state(IntakeState::Idle);
                Ok(())
            }
            IntakeState::Idle | IntakeState::SuccessNavigated => Ok(()),
        }
    }

    /// Moves the session into `Submitting` and opens a new attempt.
    pub async fn begin_submission(&self, id: Uuid) -> Result<Submission, IntakeError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(IntakeError::SessionNotFound(id))?;
        if session.state == IntakeState::Submitting {
            return Err(IntakeError::Busy);
        }
        session.attempt += 1;
        session.set_state(IntakeState::Submitting);
        debug!(session_id = %id, attempt = session.attempt, "submission started");
        Ok(Submission {
            attempt: session.attempt,
            session_token: session.session_token.clone(),
        })
    }

    /// Marks the attempt navigated, overwriting the cached job name.
    /// A superseded attempt leaves the session untouched.
    pub async fn complete(
        &self,
        id: Uuid,
        attempt: u64,
        job_name: Option<String>,
    ) -> Result<(), IntakeError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(IntakeError::SessionNotFound(id))?;
        if session.attempt != attempt {
            debug!(session_id = %id, attempt, "ignoring superseded attempt");
            return Ok(());
        }
        session.job_name = job_name;
        session.set_state(IntakeState::SuccessNavigated);
        Ok(())
    }

    pub async fn fail(
        &self,
        id: Uuid,
        attempt: u64,
        message: impl Into<String>,
    ) -> Result<(), IntakeError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(IntakeError::SessionNotFound(id))?;
        if session.attempt != attempt {
            debug!(session_id = %id, attempt, "ignoring superseded attempt");
            return Ok(());
        }
        session.set_state(IntakeState::Failed {
            message: message.into(),
        });
        Ok(())
    }

    /// Drops every session idle for longer than the TTL. Returns how many went.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        before - sessions.len()
    }

    /// Runs `evict_expired` on a fixed period for the life of the process.
    pub fn spawn_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    info!(evicted, "expired intake sessions dropped");
                }
            }
        })
    }
}
