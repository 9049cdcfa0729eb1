use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity, as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A signed-in visit: the user plus the access token that proves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A single task, saved as a row in the tasks table. The id and both
/// timestamps are assigned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: bool,
    pub completion_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the client sends when inserting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: bool,
    pub completion_date: Option<NaiveDate>,
}

/// What the client sends when updating a task. Every editable field is
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: String,
    pub description: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub status: bool,
}

/// The editable copy of a task held by the detail view while editing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub completion_date: Option<NaiveDate>,
    pub status: bool,
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            completion_date: task.completion_date,
            status: task.status,
        }
    }

    /// Convert into the update payload. Blank descriptions become absent.
    pub fn to_changes(&self) -> TaskChanges {
        TaskChanges {
            title: self.title.trim().to_string(),
            description: non_blank(&self.description),
            completion_date: self.completion_date,
            status: self.status,
        }
    }
}

/// Trimmed text, or None when nothing is left.
pub fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The badge shown on a task card. A completed task is never shown as
/// overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Completed,
    Overdue,
    Pending,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Completed => "Completed",
            Badge::Overdue => "Overdue",
            Badge::Pending => "Pending",
        }
    }
}

/// Return whether a task with the given due date and status is overdue
/// on `today`. Only the calendar date is compared.
pub fn is_overdue(completion_date: Option<NaiveDate>, status: bool, today: NaiveDate) -> bool {
    match completion_date {
        Some(due) => !status && due < today,
        None => false,
    }
}

/// Aggregate counts over the task collection, recomputed on every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.status).count();
        TaskStats {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }
}

/// Traits
pub trait TaskExtra {
    fn is_overdue(&self, today: NaiveDate) -> bool;
    fn badge(&self, today: NaiveDate) -> Badge;
    fn short_id(&self, len: usize) -> String;
}

impl TaskExtra for Task {
    fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.completion_date, self.status, today)
    }

    fn badge(&self, today: NaiveDate) -> Badge {
        if self.status {
            Badge::Completed
        } else if self.is_overdue(today) {
            Badge::Overdue
        } else {
            Badge::Pending
        }
    }

    fn short_id(&self, len: usize) -> String {
        let short: String = self.id.chars().take(len).collect();
        format!("#{}...", short)
    }
}
