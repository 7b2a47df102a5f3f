//! Session Manager Agent
//!
//! Server-side session storage owned by an acton-reactive agent. The session
//! middleware loads and saves sessions by message; handlers never touch the
//! map directly.

use acton_reactive::prelude::*;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tokio::sync::oneshot;

use super::default_agent_config;
use super::request_reply::{create_request_reply, send_response, ResponseChannel};
use crate::auth::session::{SessionData, SessionId};

/// Session manager agent model
#[derive(Debug, Clone)]
pub struct SessionManagerAgent {
    /// In-memory session storage
    sessions: HashMap<SessionId, SessionData>,
    /// Expiry queue for cleanup (min-heap by expiration time)
    expiry_queue: BinaryHeap<Reverse<(DateTime<Utc>, SessionId)>>,
    /// Sessions with an entry in `expiry_queue`, at most one each
    queued: HashSet<SessionId>,
    /// Idle lifetime granted on every load
    max_age: Duration,
}

impl Default for SessionManagerAgent {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            expiry_queue: BinaryHeap::new(),
            queued: HashSet::new(),
            max_age: Duration::hours(24),
        }
    }
}

impl SessionManagerAgent {
    fn remember(&mut self, session_id: SessionId, data: SessionData) {
        if self.queued.insert(session_id.clone()) {
            self.expiry_queue
                .push(Reverse((data.expires_at, session_id.clone())));
        }
        self.sessions.insert(session_id, data);
    }

    /// Touch and return a live session, dropping it if it has expired
    fn load(&mut self, session_id: &SessionId) -> Option<SessionData> {
        let max_age = self.max_age;
        let data = self.sessions.get_mut(session_id)?;

        if data.validate_and_touch(max_age) {
            return Some(data.clone());
        }

        self.sessions.remove(session_id);
        None
    }

    /// Drop sessions whose expiry has passed, returning how many were removed
    ///
    /// A queue entry whose session was touched since it was queued is pushed
    /// back with the session's current expiry.
    fn cleanup_expired(&mut self) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        while self
            .expiry_queue
            .peek()
            .is_some_and(|Reverse((expiry, _))| *expiry <= now)
        {
            let Some(Reverse((_, session_id))) = self.expiry_queue.pop() else {
                break;
            };

            match self.sessions.get(&session_id).map(|data| data.expires_at) {
                Some(expires_at) if expires_at > now => {
                    self.expiry_queue.push(Reverse((expires_at, session_id)));
                }
                Some(_) => {
                    self.sessions.remove(&session_id);
                    self.queued.remove(&session_id);
                    removed += 1;
                }
                None => {
                    self.queued.remove(&session_id);
                }
            }
        }

        removed
    }
}

/// Load a session by ID, extending its lifetime
#[derive(Clone, Debug)]
pub struct LoadSession {
    /// The session ID to load
    pub session_id: SessionId,
    /// Optional response channel for web handlers
    pub response_tx: Option<ResponseChannel<Option<SessionData>>>,
}

impl LoadSession {
    /// Create a load request with response channel
    #[must_use]
    pub fn with_response(session_id: SessionId) -> (Self, oneshot::Receiver<Option<SessionData>>) {
        let (response_tx, rx) = create_request_reply();
        let request = Self {
            session_id,
            response_tx: Some(response_tx),
        };
        (request, rx)
    }
}

/// Save session data
#[derive(Clone, Debug)]
pub struct SaveSession {
    /// The session ID to save
    pub session_id: SessionId,
    /// The session data to persist
    pub data: SessionData,
    /// Optional response channel for confirmation
    pub response_tx: Option<ResponseChannel<bool>>,
}

impl SaveSession {
    /// Create a save message (fire-and-forget)
    #[must_use]
    pub const fn new(session_id: SessionId, data: SessionData) -> Self {
        Self {
            session_id,
            data,
            response_tx: None,
        }
    }

    /// Create a save request with confirmation
    #[must_use]
    pub fn with_confirmation(
        session_id: SessionId,
        data: SessionData,
    ) -> (Self, oneshot::Receiver<bool>) {
        let (response_tx, rx) = create_request_reply();
        let request = Self {
            session_id,
            data,
            response_tx: Some(response_tx),
        };
        (request, rx)
    }
}

/// Delete a session by ID
#[derive(Clone, Debug)]
pub struct DeleteSession {
    /// The session ID to delete
    pub session_id: SessionId,
}

/// Remove expired sessions
#[derive(Clone, Debug)]
pub struct CleanupExpired;

impl SessionManagerAgent {
    /// Spawn the session manager
    ///
    /// `max_age` is the idle lifetime: every successful load pushes expiry
    /// `max_age` into the future.
    ///
    /// # Errors
    ///
    /// Returns error if agent initialization fails
    pub async fn spawn(runtime: &mut AgentRuntime, max_age: Duration) -> anyhow::Result<AgentHandle> {
        let config = default_agent_config("session_manager")?;
        let mut builder = runtime.new_agent_with_config::<Self>(config).await;
        builder.model.max_age = max_age;

        builder
            .mutate_on::<LoadSession>(|agent, envelope| {
                let session_id = envelope.message().session_id.clone();
                let response_tx = envelope.message().response_tx.clone();
                let result = agent.model.load(&session_id);

                AgentReply::from_async(async move {
                    if let Some(tx) = response_tx {
                        let _ = send_response(tx, result).await;
                    }
                })
            })
            .mutate_on::<SaveSession>(|agent, envelope| {
                let session_id = envelope.message().session_id.clone();
                let data = envelope.message().data.clone();
                let response_tx = envelope.message().response_tx.clone();

                agent.model.remember(session_id, data);

                AgentReply::from_async(async move {
                    if let Some(tx) = response_tx {
                        let _ = send_response(tx, true).await;
                    }
                })
            })
            .mutate_on::<DeleteSession>(|agent, envelope| {
                agent.model.sessions.remove(&envelope.message().session_id);
                AgentReply::immediate()
            })
            .mutate_on::<CleanupExpired>(|agent, _envelope| {
                let removed = agent.model.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = agent.model.sessions.len(),
                        "Cleaned up expired sessions"
                    );
                }
                AgentReply::immediate()
            })
            .after_start(|_agent| async {
                tracing::info!("Session manager agent started");
            })
            .after_stop(|agent| {
                let sessions = agent.model.sessions.len();
                async move {
                    tracing::info!(sessions, "Session manager agent stopped");
                }
            });

        Ok(builder.start().await)
    }
}
