use thiserror::Error;

/// Client-side input problems caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("review url must not be empty")]
    EmptyInput,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Failures reported by an API transport. Raw transport errors never
/// cross this boundary; every reqwest/serde failure is folded into one
/// of these at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Credential rejected (401/403-class). Forces a session clear.
    #[error("unauthorized")]
    Unauthorized,
    /// The backend handled the request but declined it; the reason is
    /// surfaced to the user verbatim.
    #[error("rejected: {reason}")]
    Rejected { reason: String },
    /// Network failure, non-success HTTP status, or a request that hit
    /// its transport timeout.
    #[error("transport failed: {message}")]
    Transport { message: String },
    /// The backend answered but the payload did not match the expected
    /// schema.
    #[error("malformed response: {message}")]
    Malformed { message: String },
}

impl ApiError {
    /// User-facing message; transport-level detail is collapsed into a
    /// generic phrase while rejection reasons pass through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "session expired, please log in again".to_string(),
            Self::Rejected { reason } => reason.clone(),
            Self::Transport { .. } | Self::Malformed { .. } => {
                "the analysis server could not be reached".to_string()
            }
        }
    }
}

/// Session Manager failures that are not part of the normal
/// authenticated/anonymous outcome space.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session store failed: {message}")]
    Store { message: String },
}

impl SessionError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}
