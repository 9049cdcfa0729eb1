use thiserror::Error;

use crate::gateway::GatewayError;

/// Failures surfaced by the task and session operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// No session where one is required.
    #[error("you must be signed in to do that")]
    Unauthenticated,

    /// A required field is missing. Raised before any gateway call.
    #[error("{0}")]
    Validation(String),

    /// The task belongs to somebody else.
    #[error("you can only update your own tasks")]
    NotOwner,

    #[error("no task matches '{0}'")]
    TaskNotFound(String),

    /// The gateway call failed: transport, storage, or policy rejection.
    #[error(transparent)]
    Remote(#[from] GatewayError),
}
