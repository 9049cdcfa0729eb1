//! The create form, the detail/edit view and the delete confirmation.
//!
//! Each is a small state machine over a [`TaskController`]; they hold no
//! task state of their own beyond what is being shown or edited.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::gateway::Gateway;
use crate::model::{Task, TaskDraft};
use crate::tasks::{AlertSink, TaskController, TaskInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailModal {
    Closed,
    Viewing(Task),
    Editing { task: Task, draft: TaskDraft },
    Saving { task: Task, draft: TaskDraft },
}

impl Default for DetailModal {
    fn default() -> Self {
        DetailModal::Closed
    }
}

impl DetailModal {
    pub fn open(task: Task) -> Self {
        DetailModal::Viewing(task)
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, DetailModal::Closed)
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            DetailModal::Closed => None,
            DetailModal::Viewing(task)
            | DetailModal::Editing { task, .. }
            | DetailModal::Saving { task, .. } => Some(task),
        }
    }

    pub fn draft(&self) -> Option<&TaskDraft> {
        match self {
            DetailModal::Editing { draft, .. } | DetailModal::Saving { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn begin_edit(&mut self) {
        if let DetailModal::Viewing(task) = self {
            let draft = TaskDraft::from_task(task);
            *self = DetailModal::Editing {
                task: task.clone(),
                draft,
            };
        }
    }

    /// Change the draft. Does nothing unless editing.
    pub fn edit<F: FnOnce(&mut TaskDraft)>(&mut self, change: F) {
        if let DetailModal::Editing { draft, .. } = self {
            change(draft);
        }
    }

    /// Throw the edits away and go back to viewing.
    pub fn cancel_edit(&mut self) {
        if let DetailModal::Editing { task, .. } = self {
            *self = DetailModal::Viewing(task.clone());
        }
    }

    pub fn can_save(&self) -> bool {
        match self {
            DetailModal::Editing { draft, .. } => !draft.title.trim().is_empty(),
            _ => false,
        }
    }

    pub fn close(&mut self) {
        *self = DetailModal::Closed;
    }

    /// Send the draft. Closes on success; on failure stays in the editor
    /// with the draft untouched.
    pub fn save<G, A>(&mut self, controller: &mut TaskController<G, A>) -> Result<(), AppError>
    where
        G: Gateway + ?Sized,
        A: AlertSink,
    {
        let (task, draft) = match std::mem::take(self) {
            DetailModal::Editing { task, draft } => (task, draft),
            other => {
                *self = other;
                return Ok(());
            }
        };

        *self = DetailModal::Saving {
            task: task.clone(),
            draft: draft.clone(),
        };
        match controller.update(&task.id, &draft) {
            Ok(()) => {
                *self = DetailModal::Closed;
                Ok(())
            }
            Err(err) => {
                *self = DetailModal::Editing { task, draft };
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteModal {
    Closed,
    Confirming(Task),
}

impl Default for DeleteModal {
    fn default() -> Self {
        DeleteModal::Closed
    }
}

impl DeleteModal {
    pub fn open(task: Task) -> Self {
        DeleteModal::Confirming(task)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DeleteModal::Confirming(_))
    }

    pub fn task_title(&self) -> &str {
        match self {
            DeleteModal::Confirming(task) => &task.title,
            DeleteModal::Closed => "",
        }
    }

    pub fn cancel(&mut self) {
        *self = DeleteModal::Closed;
    }

    pub fn confirm<G, A>(&mut self, controller: &mut TaskController<G, A>) -> Result<(), AppError>
    where
        G: Gateway + ?Sized,
        A: AlertSink,
    {
        let id = match self {
            DeleteModal::Confirming(task) => task.id.clone(),
            DeleteModal::Closed => return Ok(()),
        };
        controller.delete(&id)?;
        *self = DeleteModal::Closed;
        Ok(())
    }
}

/// The create-task form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub open: bool,
    pub title: String,
    pub description: String,
    pub completion_date: Option<NaiveDate>,
}

impl CreateForm {
    pub fn open() -> Self {
        CreateForm {
            open: true,
            ..CreateForm::default()
        }
    }

    pub fn can_submit(&self) -> bool {
        self.open && !self.title.trim().is_empty()
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Create the task. On success the form is cleared and closed; on
    /// failure everything typed is kept.
    pub fn submit<G, A>(&mut self, controller: &mut TaskController<G, A>) -> Result<(), AppError>
    where
        G: Gateway + ?Sized,
        A: AlertSink,
    {
        if !self.can_submit() {
            return Err(AppError::Validation("Task title is required".to_string()));
        }

        controller.create(TaskInput {
            title: self.title.clone(),
            description: Some(self.description.clone()),
            completion_date: self.completion_date,
        })?;

        *self = CreateForm::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqliteGateway;
    use crate::tasks::testing::{CountingGateway, RecordedAlerts};
    use chrono::Duration;

    fn signed_in() -> CountingGateway {
        let gateway = SqliteGateway::open_in_memory(Duration::hours(1)).unwrap();
        gateway.sign_up("ada@example.com", "hunter22").unwrap();
        CountingGateway::new(gateway)
    }

    fn with_one_task<'g>(
        gateway: &'g CountingGateway,
        alerts: &'g RecordedAlerts,
    ) -> TaskController<'g, CountingGateway, &'g RecordedAlerts> {
        let mut controller = TaskController::load(gateway, alerts);
        let mut form = CreateForm::open();
        form.title = "Buy milk".to_string();
        form.submit(&mut controller).unwrap();
        assert_eq!(form, CreateForm::default());
        controller
    }

    #[test]
    fn edit_save_closes_on_success() {
        let gateway = signed_in();
        let alerts = RecordedAlerts::default();
        let mut controller = with_one_task(&gateway, &alerts);

        let mut modal = DetailModal::open(controller.tasks()[0].clone());
        modal.edit(|draft| draft.title = "ignored while viewing".to_string());
        assert_eq!(modal.draft(), None);

        modal.begin_edit();
        modal.edit(|draft| draft.status = true);
        assert!(modal.can_save());
        modal.save(&mut controller).unwrap();

        assert_eq!(modal, DetailModal::Closed);
        assert!(controller.tasks()[0].status);
    }

    #[test]
    fn failed_save_keeps_the_draft() {
        let gateway = signed_in();
        let alerts = RecordedAlerts::default();
        let mut controller = with_one_task(&gateway, &alerts);

        let mut modal = DetailModal::open(controller.tasks()[0].clone());
        modal.begin_edit();
        modal.edit(|draft| draft.title = "Buy oat milk".to_string());

        gateway.fail_mutations.set(true);
        assert!(modal.save(&mut controller).is_err());
        assert!(matches!(modal, DetailModal::Editing { .. }));
        assert_eq!(modal.draft().unwrap().title, "Buy oat milk");
        assert_eq!(controller.tasks()[0].title, "Buy milk");
    }

    #[test]
    fn cancel_edit_restores_the_task() {
        let gateway = signed_in();
        let alerts = RecordedAlerts::default();
        let controller = with_one_task(&gateway, &alerts);
        let task = controller.tasks()[0].clone();

        let mut modal = DetailModal::open(task.clone());
        modal.begin_edit();
        modal.edit(|draft| draft.title.clear());
        assert!(!modal.can_save());
        modal.cancel_edit();
        assert_eq!(modal, DetailModal::Viewing(task.clone()));

        modal.begin_edit();
        assert_eq!(modal.draft(), Some(&TaskDraft::from_task(&task)));
        modal.close();
        assert!(!modal.is_open());
    }

    #[test]
    fn delete_confirmation_gates_the_delete() {
        let gateway = signed_in();
        let alerts = RecordedAlerts::default();
        let mut controller = with_one_task(&gateway, &alerts);
        let task = controller.tasks()[0].clone();

        let mut modal = DeleteModal::open(task.clone());
        assert_eq!(modal.task_title(), "Buy milk");
        modal.cancel();
        assert_eq!(controller.tasks().len(), 1);

        let mut modal = DeleteModal::open(task.clone());
        gateway.fail_mutations.set(true);
        assert!(modal.confirm(&mut controller).is_err());
        assert!(modal.is_open());

        gateway.fail_mutations.set(false);
        modal.confirm(&mut controller).unwrap();
        assert!(!modal.is_open());
        assert!(controller.tasks().is_empty());
    }

    #[test]
    fn create_form_refuses_blank_titles_and_keeps_input_on_failure() {
        let gateway = signed_in();
        let alerts = RecordedAlerts::default();
        let mut controller = TaskController::load(&gateway, &alerts);

        let mut form = CreateForm::open();
        form.title = "   ".to_string();
        assert!(!form.can_submit());
        assert!(form.submit(&mut controller).is_err());

        form.title = "Buy milk".to_string();
        form.description = "semi-skimmed".to_string();
        gateway.fail_mutations.set(true);
        assert!(form.submit(&mut controller).is_err());
        assert!(form.open);
        assert_eq!(form.description, "semi-skimmed");
        assert!(controller.tasks().is_empty());
    }
}
