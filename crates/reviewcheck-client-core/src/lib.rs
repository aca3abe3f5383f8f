//! Core state machines for the ReviewCheck client: the admin session
//! lifecycle and the bounded analysis polling loop. No I/O lives here;
//! transports and storage are trait seams supplied by
//! `reviewcheck-api-client` (or by test fakes).

pub mod analysis;
pub mod error;
pub mod session;

pub use analysis::{
    AnalysisReport, AnalysisSnapshot, AnalysisTracker, AnalysisTransport, JobOutcome, JobUpdate,
    JobWatch, MAX_POLL_ATTEMPTS, POLL_INTERVAL,
};
pub use error::{ApiError, InputError, SessionError};
pub use session::{
    AdminTransport, DEFAULT_RESTORE_TARGET, LoginGrant, LoginOutcome, PersistedSession,
    RestoreOutcome, SessionManager, SessionPhase, SessionStore,
};
