//! Typed failures for session operations.
//!
//! None of these is fatal to the process, and none leaves the transcript
//! partially appended: `Generation` failures abort an operation before any
//! state is committed.

use crate::gateway::GenerationUnavailable;
use crate::session::Phase;
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the orchestrator and session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires a session that does not exist. Recoverable by
    /// starting one.
    #[error("no active session with id {0}")]
    NoActiveSession(Uuid),

    /// The session has reached its terminal state. Recoverable only by
    /// starting a new session.
    #[error("session has already ended")]
    SessionEnded,

    /// The generation service failed. Recoverable by retrying the same
    /// input; no session state was mutated.
    #[error(transparent)]
    Generation(#[from] GenerationUnavailable),

    /// An event was applied in a phase that cannot accept it. Indicates a
    /// driver bug, not a caller mistake.
    #[error("event `{event}` is not valid in phase `{phase:?}`")]
    InvalidTransition { phase: Phase, event: &'static str },
}
