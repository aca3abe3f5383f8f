use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, SessionError};

/// Privileged view re-entered after a fresh login.
pub const DEFAULT_RESTORE_TARGET: &str = "admin-dashboard";

/// Upper bound on the startup verification call. A persisted token is a
/// hint, not a fact; the gate must resolve even if the backend hangs.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// The three entries kept in durable storage. Always written and
/// cleared as one record; a partial session is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_target: Option<String>,
}

/// Durable client-side key-value storage for the session record. The
/// Session Manager is the sole writer; everything else reads through
/// the manager's projections.
pub trait SessionStore {
    type Error: std::fmt::Display;

    fn load_session(&self) -> Result<Option<PersistedSession>, Self::Error>;
    fn persist_session(&self, session: &PersistedSession) -> Result<(), Self::Error>;
    fn clear_session(&self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub expires_at: Option<String>,
}

/// Backend admin-auth endpoints, kept behind a trait so tests can drive
/// the manager without a network.
#[async_trait]
pub trait AdminTransport {
    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, ApiError>;
    async fn logout(&self, token: &str, username: &str) -> Result<(), ApiError>;
    async fn verify(&self, token: &str) -> Result<bool, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Verifying,
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Anonymous,
    Authenticated {
        username: String,
        restore_target: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { username: String },
    Rejected { reason: String },
}

/// Owns the admin credential lifecycle: token acquisition, persistence,
/// startup verification, and invalidation. Callers must block privileged
/// rendering on [`SessionManager::restore`] resolving.
pub struct SessionManager<S, T> {
    store: S,
    transport: T,
    verify_timeout: Duration,
    phase: SessionPhase,
    username: Option<String>,
    token: Option<String>,
    restore_target: Option<String>,
}

impl<S, T> SessionManager<S, T>
where
    S: SessionStore,
    T: AdminTransport,
{
    pub fn new(store: S, transport: T) -> Self {
        Self {
            store,
            transport,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            phase: SessionPhase::Uninitialized,
            username: None,
            token: None,
            restore_target: None,
        }
    }

    #[must_use]
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Restores a previously persisted session. No persisted credential
    /// resolves immediately to anonymous with zero network calls; a
    /// persisted credential is verified against the backend exactly
    /// once. Any failure on that path (invalid, transport error, store
    /// error, timeout) clears storage and resolves anonymous — validity
    /// is only ever confirmed, never assumed. Idempotent: later calls
    /// return the already-resolved projection.
    pub async fn restore(&mut self) -> RestoreOutcome {
        if self.phase != SessionPhase::Uninitialized {
            return self.projection();
        }

        let persisted = match self.store.load_session() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                self.phase = SessionPhase::Anonymous;
                return RestoreOutcome::Anonymous;
            }
            Err(err) => {
                tracing::warn!(error = %err, "session store unreadable; starting anonymous");
                self.clear_storage();
                self.phase = SessionPhase::Anonymous;
                return RestoreOutcome::Anonymous;
            }
        };

        self.phase = SessionPhase::Verifying;
        let verified =
            tokio::time::timeout(self.verify_timeout, self.transport.verify(&persisted.token))
                .await;

        match verified {
            Ok(Ok(true)) => {
                self.username = Some(persisted.username.clone());
                self.token = Some(persisted.token);
                self.restore_target = persisted.restore_target.clone();
                self.phase = SessionPhase::Authenticated;
                RestoreOutcome::Authenticated {
                    username: persisted.username,
                    restore_target: persisted.restore_target,
                }
            }
            Ok(Ok(false)) => {
                tracing::info!("persisted token no longer valid; clearing session");
                self.drop_to_anonymous();
                RestoreOutcome::Anonymous
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "token verification failed; clearing session");
                self.drop_to_anonymous();
                RestoreOutcome::Anonymous
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.verify_timeout.as_millis() as u64,
                    "token verification timed out; clearing session"
                );
                self.drop_to_anonymous();
                RestoreOutcome::Anonymous
            }
        }
    }

    /// Exchanges credentials for a bearer token. A backend rejection is
    /// returned as [`LoginOutcome::Rejected`] with the backend's reason
    /// and leaves persisted state untouched.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, SessionError> {
        let grant = match self.transport.login(username, password).await {
            Ok(grant) => grant,
            Err(ApiError::Rejected { reason }) => return Ok(LoginOutcome::Rejected { reason }),
            Err(ApiError::Unauthorized) => {
                return Ok(LoginOutcome::Rejected {
                    reason: "invalid username or password".to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let persisted = PersistedSession {
            token: grant.token,
            username: username.to_string(),
            restore_target: Some(DEFAULT_RESTORE_TARGET.to_string()),
        };
        self.store
            .persist_session(&persisted)
            .map_err(SessionError::store)?;

        self.username = Some(persisted.username);
        self.token = Some(persisted.token);
        self.restore_target = persisted.restore_target;
        self.phase = SessionPhase::Authenticated;
        tracing::info!(username = %username, "admin session established");
        Ok(LoginOutcome::Authenticated {
            username: username.to_string(),
        })
    }

    /// Notifies the backend best-effort, then unconditionally clears
    /// persisted and in-memory state. Local state is authoritative for
    /// the UI, so this always resolves anonymous.
    pub async fn logout(&mut self) {
        if let (Some(token), Some(username)) = (self.token.clone(), self.username.clone()) {
            if let Err(err) = self.transport.logout(&token, &username).await {
                tracing::warn!(error = %err, "logout notify failed; clearing local session anyway");
            }
        }
        self.drop_to_anonymous();
    }

    /// Drops the session after a 401-class rejection from any
    /// privileged call.
    pub fn mark_unauthorized(&mut self) {
        if self.phase == SessionPhase::Authenticated {
            tracing::warn!("privileged call rejected; dropping session");
        }
        self.drop_to_anonymous();
    }

    /// Pure predicate over in-memory state; never triggers I/O.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn restore_target(&self) -> Option<&str> {
        self.restore_target.as_deref()
    }

    /// The credential for the outbound-request interceptor. No other
    /// code path should read the token.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn projection(&self) -> RestoreOutcome {
        match (&self.phase, &self.username) {
            (SessionPhase::Authenticated, Some(username)) => RestoreOutcome::Authenticated {
                username: username.clone(),
                restore_target: self.restore_target.clone(),
            },
            _ => RestoreOutcome::Anonymous,
        }
    }

    fn drop_to_anonymous(&mut self) {
        self.clear_storage();
        self.username = None;
        self.token = None;
        self.restore_target = None;
        self.phase = SessionPhase::Anonymous;
    }

    fn clear_storage(&mut self) {
        if let Err(err) = self.store.clear_session() {
            tracing::warn!(error = %err, "failed to clear session store");
        }
    }
}
