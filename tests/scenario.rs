use std::cell::RefCell;

use chrono::{Duration, NaiveDate};

use lifesync::cookies::CookieJar;
use lifesync::gateway::{Gateway, SqliteGateway};
use lifesync::guard::{Decision, RouteGuard};
use lifesync::modal::{CreateForm, DeleteModal, DetailModal};
use lifesync::model::{Badge, TaskExtra};
use lifesync::tasks::{AlertSink, TaskController};
use lifesync::theme::Theme;
use lifesync::view::{TaskListView, NO_TASKS_TITLE};

#[derive(Default)]
struct Alerts(RefCell<Vec<String>>);

impl AlertSink for Alerts {
    fn alert(&self, message: &str) {
        self.0.borrow_mut().push(message.to_string());
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn buy_milk_from_creation_to_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = SqliteGateway::open(&dir.path().join("db.sqlite"), Duration::hours(1)).unwrap();
    gateway.sign_up("ada@example.com", "hunter22").unwrap();

    let today = date(2024, 3, 10);
    let alerts = Alerts::default();
    let mut controller = TaskController::load(&gateway, &alerts);
    assert!(controller.tasks().is_empty());

    let mut form = CreateForm::open();
    form.title = "Buy milk".to_string();
    form.submit(&mut controller).unwrap();

    assert_eq!(controller.tasks().len(), 1);
    let task = controller.tasks()[0].clone();
    assert!(!task.status);
    assert_eq!(task.badge(today), Badge::Pending);
    assert!(!task.is_overdue(today));

    let mut modal = DetailModal::open(task.clone());
    modal.begin_edit();
    modal.edit(|draft| draft.status = true);
    modal.save(&mut controller).unwrap();
    assert_eq!(controller.tasks()[0].badge(today), Badge::Completed);

    let mut modal = DetailModal::open(controller.tasks()[0].clone());
    modal.begin_edit();
    modal.edit(|draft| draft.completion_date = Some(date(2024, 1, 1)));
    modal.save(&mut controller).unwrap();
    let completed = &controller.tasks()[0];
    assert_eq!(completed.completion_date, Some(date(2024, 1, 1)));
    assert!(!completed.is_overdue(today));
    assert_eq!(completed.badge(today), Badge::Completed);

    let mut confirm = DeleteModal::open(completed.clone());
    confirm.confirm(&mut controller).unwrap();
    assert!(controller.tasks().is_empty());
    assert!(gateway.select_task(&task.id).unwrap().is_none());

    let view = TaskListView::new(controller.tasks(), today, Theme::Light);
    assert!(view.is_empty());
    assert!(view.to_string().starts_with(NO_TASKS_TITLE));
    assert!(alerts.0.borrow().is_empty());
}

#[test]
fn saved_session_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db.sqlite");
    let jar = CookieJar::new(dir.path().join("session.json"));

    {
        let gateway = SqliteGateway::open(&db_path, Duration::hours(1)).unwrap();
        let _cookie = jar.attach(&gateway);
        gateway.sign_up("ada@example.com", "hunter22").unwrap();
    }

    let gateway = SqliteGateway::open(&db_path, Duration::hours(1)).unwrap();
    gateway.set_access_token(jar.load().unwrap());
    let guard = RouteGuard::new(&gateway);
    assert_eq!(guard.check("/tasks").decision, Decision::Allow);
    assert_eq!(guard.check("/login").decision, Decision::RedirectToDashboard);

    let _cookie = jar.attach(&gateway);
    gateway.sign_out().unwrap();
    assert_eq!(jar.load().unwrap(), None);
    assert_eq!(guard.check("/tasks").decision, Decision::RedirectToLogin);
    assert_eq!(guard.check("/").decision, Decision::Allow);
}

#[test]
fn another_user_never_sees_or_touches_my_tasks() {
    let gateway = SqliteGateway::open_in_memory(Duration::hours(1)).unwrap();
    gateway.sign_up("ada@example.com", "hunter22").unwrap();

    let alerts = Alerts::default();
    let mut controller = TaskController::load(&gateway, &alerts);
    let mut form = CreateForm::open();
    form.title = "Pay rent".to_string();
    form.submit(&mut controller).unwrap();
    let mine = controller.tasks()[0].id.clone();
    drop(controller);

    gateway.sign_up("bob@example.com", "hunter22").unwrap();
    let mut controller = TaskController::load(&gateway, &alerts);
    assert!(controller.tasks().is_empty());
    assert!(gateway.delete_task(&mine).is_err());
    assert!(controller.delete(&mine).is_err());
    assert_eq!(
        alerts.0.borrow().last().map(String::as_str),
        Some("Failed to delete task. Please try again.")
    );
}
