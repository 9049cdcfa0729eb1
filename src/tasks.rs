use std::cell::Cell;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::error::AppError;
use crate::gateway::{Gateway, TaskFilter};
use crate::model::{non_blank, NewTask, Task, TaskDraft, TaskStats};

/// Where blocking, user-visible alerts go.
pub trait AlertSink {
    fn alert(&self, message: &str);
}

impl<A: AlertSink + ?Sized> AlertSink for &A {
    fn alert(&self, message: &str) {
        (**self).alert(message)
    }
}

/// Input of the create form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub completion_date: Option<NaiveDate>,
}

/// One flag per operation, raised while its gateway call is in flight.
#[derive(Debug, Default)]
pub struct LoadingFlags {
    refreshing: Cell<bool>,
    creating: Cell<bool>,
    updating: Cell<bool>,
    deleting: Cell<bool>,
}

impl LoadingFlags {
    pub fn refreshing(&self) -> bool {
        self.refreshing.get()
    }

    pub fn creating(&self) -> bool {
        self.creating.get()
    }

    pub fn updating(&self) -> bool {
        self.updating.get()
    }

    pub fn deleting(&self) -> bool {
        self.deleting.get()
    }

    pub fn any(&self) -> bool {
        self.refreshing() || self.creating() || self.updating() || self.deleting()
    }
}

struct Busy<'a>(&'a Cell<bool>);

impl<'a> Busy<'a> {
    fn start(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Busy(flag)
    }
}

impl<'a> Drop for Busy<'a> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owns the signed-in user's task list.
///
/// Every mutation is a single gateway call followed by a full refresh;
/// the local list is never changed ahead of the server.
pub struct TaskController<'g, G: Gateway + ?Sized, A: AlertSink> {
    gateway: &'g G,
    alerts: A,
    tasks: Vec<Task>,
    flags: Rc<LoadingFlags>,
}

impl<'g, G: Gateway + ?Sized, A: AlertSink> TaskController<'g, G, A> {
    pub fn new(gateway: &'g G, alerts: A, initial: Vec<Task>) -> Self {
        TaskController {
            gateway,
            alerts,
            tasks: initial,
            flags: Rc::default(),
        }
    }

    /// Seed the list with one fetch. A failed fetch leaves it empty.
    pub fn load(gateway: &'g G, alerts: A) -> Self {
        let mut controller = Self::new(gateway, alerts, Vec::new());
        controller.refresh().ok();
        controller
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn flags(&self) -> &LoadingFlags {
        &self.flags
    }

    /// A shared handle on the loading flags, for whoever renders progress
    /// while a call is in flight.
    pub fn watch_flags(&self) -> Rc<LoadingFlags> {
        Rc::clone(&self.flags)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Find a task by its full id or by an unambiguous id prefix.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<&Task, AppError> {
        if let Some(task) = self.find(id_or_prefix) {
            return Ok(task);
        }
        let needle = id_or_prefix.trim_start_matches('#');
        let mut matches = self
            .tasks
            .iter()
            .filter(|task| !needle.is_empty() && task.id.starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => Err(AppError::Validation(format!(
                "'{}' matches more than one task, use a longer id",
                id_or_prefix
            ))),
            _ => Err(AppError::TaskNotFound(id_or_prefix.to_string())),
        }
    }

    /// Re-fetch every row the session may see. On failure the previous
    /// list is kept.
    pub fn refresh(&mut self) -> Result<(), AppError> {
        let fetched = {
            let _busy = Busy::start(&self.flags.refreshing);
            self.gateway.select_tasks(&TaskFilter::default())
        };

        match fetched {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                error!(%err, "Error fetching tasks");
                Err(err.into())
            }
        }
    }

    pub fn create(&mut self, input: TaskInput) -> Result<(), AppError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Task title is required".to_string()));
        }

        let outcome = {
            let _busy = Busy::start(&self.flags.creating);
            self.insert(NewTask {
                user_id: String::new(),
                title: title.to_string(),
                description: input.description.as_deref().and_then(non_blank),
                status: false,
                completion_date: input.completion_date,
            })
        };
        outcome?;

        info!(title, "task created");
        self.refresh().ok();
        Ok(())
    }

    fn insert(&self, mut fields: NewTask) -> Result<(), AppError> {
        let user = match self.gateway.current_user() {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.alerts.alert("Please sign in to create tasks");
                return Err(AppError::Unauthenticated);
            }
            Err(err) => {
                error!(%err, "Error creating task");
                self.alerts.alert("Failed to create task. Please try again.");
                return Err(err.into());
            }
        };

        fields.user_id = user.id;
        self.gateway.insert_task(&fields).map_err(|err| {
            error!(%err, "Error creating task");
            self.alerts.alert("Failed to create task. Please try again.");
            AppError::from(err)
        })
    }

    /// Replace the editable fields of task `id` with `draft`.
    pub fn update(&mut self, id: &str, draft: &TaskDraft) -> Result<(), AppError> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation("Task title is required".to_string()));
        }

        let outcome = {
            let _busy = Busy::start(&self.flags.updating);
            self.send_update(id, draft)
        };
        outcome?;

        info!(task = id, "task updated");
        self.refresh().ok();
        Ok(())
    }

    fn send_update(&self, id: &str, draft: &TaskDraft) -> Result<(), AppError> {
        let user = match self.gateway.current_user() {
            Ok(Some(user)) => user,
            Ok(None) => {
                error!("Authentication error: no session");
                self.alerts.alert("You must be logged in to update tasks.");
                return Err(AppError::Unauthenticated);
            }
            Err(err) => {
                error!(%err, "Authentication error");
                self.alerts.alert("You must be logged in to update tasks.");
                return Err(err.into());
            }
        };

        // the gateway policy is authoritative; this only avoids a doomed call
        let task = self
            .find(id)
            .ok_or_else(|| AppError::TaskNotFound(id.to_string()))?;
        if task.user_id != user.id {
            error!(task = id, "Task does not belong to current user");
            self.alerts.alert("You can only update your own tasks.");
            return Err(AppError::NotOwner);
        }

        self.gateway
            .update_task(id, &draft.to_changes())
            .map_err(|err| {
                error!(%err, "Error updating task");
                self.alerts
                    .alert(&format!("Failed to update task: {}", err));
                AppError::from(err)
            })
    }

    /// Delete task `id`. Confirmation is the caller's business.
    pub fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let outcome = {
            let _busy = Busy::start(&self.flags.deleting);
            self.gateway.delete_task(id)
        };

        if let Err(err) = outcome {
            error!(%err, "Error deleting task");
            self.alerts.alert("Failed to delete task. Please try again.");
            return Err(err.into());
        }

        info!(task = id, "task deleted");
        self.refresh().ok();
        Ok(())
    }
}
