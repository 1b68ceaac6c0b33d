//! Engine error types

use crate::recognition::RecognitionError;
use crate::scheduler::SchedulerError;
use crate::session::SessionId;

/// Errors returned by [`crate::engine::CookingEngine`] operations
///
/// Missing capabilities and unparseable durations are not errors; they
/// degrade to spoken feedback.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Recipe {0} has no steps")]
    EmptyRecipe(String),

    #[error("Unknown cooking session: {0}")]
    UnknownSession(SessionId),

    #[error("No cooking session is active")]
    NoActiveSession,

    #[error("Session {session} has no step {step}")]
    StepOutOfRange { session: SessionId, step: usize },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}
