//! The remote auth + table service the tracker is built on.
//!
//! Everything the rest of the crate knows about the backend goes through
//! [`Gateway`]. [`SqliteGateway`] is the embedded implementation: it keeps
//! users, sessions and tasks in one SQLite file and applies the row-level
//! policy itself.

use thiserror::Error;

use crate::listeners::Subscription;
use crate::model::{NewTask, Session, Task, TaskChanges, User};

mod sqlite;

pub use sqlite::{init_schema, SqliteGateway, MIN_PASSWORD_LEN};

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl SessionEvent {
    /// The user the event leaves signed in, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionEvent::SignedIn(session) | SessionEvent::TokenRefreshed(session) => {
                Some(&session.user)
            }
            SessionEvent::SignedOut => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credential or session failures, with a message fit for the user.
    #[error("{0}")]
    Auth(String),

    #[error("row-level policy rejected {operation} on task {id}")]
    RowPolicy { operation: &'static str, id: String },

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Row filter for task selects. The row-level policy is always applied
/// on top of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub id: Option<String>,
    pub status: Option<bool>,
}

impl TaskFilter {
    pub fn by_id(id: &str) -> Self {
        TaskFilter {
            id: Some(id.to_string()),
            status: None,
        }
    }
}

pub trait Gateway {
    /// The user owning the current session, if the session is still valid.
    fn current_user(&self) -> Result<Option<User>, GatewayError>;

    /// Rotate the current session token when it is close to expiring.
    /// Returns the new session when a rotation happened.
    fn refresh_session(&self) -> Result<Option<Session>, GatewayError>;

    fn on_session_change(&self, callback: Box<dyn Fn(&SessionEvent)>) -> Subscription;

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    fn sign_up(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    fn sign_out(&self) -> Result<(), GatewayError>;

    /// Tasks visible to the current session, newest first.
    fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, GatewayError>;

    fn select_task(&self, id: &str) -> Result<Option<Task>, GatewayError> {
        Ok(self.select_tasks(&TaskFilter::by_id(id))?.into_iter().next())
    }

    fn insert_task(&self, fields: &NewTask) -> Result<(), GatewayError>;

    fn update_task(&self, id: &str, fields: &TaskChanges) -> Result<(), GatewayError>;

    fn delete_task(&self, id: &str) -> Result<(), GatewayError>;
}
