use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use lifesync::auth;
use lifesync::config::Config;
use lifesync::cookies::CookieJar;
use lifesync::error::AppError;
use lifesync::gateway::SqliteGateway;
use lifesync::guard::{Route, RouteGuard, LOGIN_PATH, TASKS_PATH};
use lifesync::listeners::Subscription;
use lifesync::modal::{CreateForm, DeleteModal, DetailModal};
use lifesync::nav::NavBar;
use lifesync::session::SessionStore;
use lifesync::tasks::{AlertSink, TaskController};
use lifesync::theme::{Theme, ThemeStore};
use lifesync::view::{self, TaskListView};

const MAX_REDIRECTS: usize = 4;

/// Alerts are printed to stderr, like a blocking dialog would interrupt.
pub struct StderrAlerts;

impl AlertSink for StderrAlerts {
    fn alert(&self, message: &str) {
        eprintln!("! {}", message);
    }
}

type Controller<'g> = TaskController<'g, SqliteGateway, StderrAlerts>;

/// Changes requested by `edit`. `None` keeps the current value.
#[derive(Debug, Default)]
pub struct Edits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub clear_due: bool,
    pub done: bool,
    pub undone: bool,
}

pub struct App {
    gateway: SqliteGateway,
    theme: ThemeStore,
    _cookie: Subscription,
}

impl App {
    /// Open the database, restore the saved session token and start
    /// persisting token changes.
    pub fn open(config: &Config) -> Result<App> {
        let gateway = SqliteGateway::open(&config.database_path(), config.session_ttl())
            .with_context(|| {
                format!("Failed to open database {}.", config.database_path().display())
            })?;

        let jar = CookieJar::new(config.session_path());
        let token = jar.load().unwrap_or_else(|err| {
            warn!(%err, "discarding unreadable session");
            None
        });
        gateway.set_access_token(token);
        let cookie = jar.attach(&gateway);

        Ok(App {
            gateway,
            theme: ThemeStore::load(config.theme_path()),
            _cookie: cookie,
        })
    }

    fn tasks(&self) -> Controller<'_> {
        TaskController::load(&self.gateway, StderrAlerts)
    }

    /// Go to `path` through the route guard, following redirects, and
    /// render whatever page is reached.
    pub fn navigate(&self, path: &str) -> Result<()> {
        let guard = RouteGuard::new(&self.gateway);
        let mut path = path.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let verdict = guard.check(&path);
            if let Some(session) = &verdict.refreshed {
                debug!(expires_at = %session.expires_at, "session refreshed");
            }
            match verdict.decision.location() {
                Some(location) => {
                    debug!(from = %path, to = location, "redirect");
                    path = location.to_string();
                }
                None => return self.render(&verdict.route),
            }
        }
        Err(anyhow!("Too many redirects while opening {}.", path))
    }

    /// Run the route guard for `path` ahead of a command that works on it.
    /// On a redirect the target page is rendered and false is returned.
    fn guarded(&self, path: &str) -> Result<bool> {
        let verdict = RouteGuard::new(&self.gateway).check(path);
        match verdict.decision.location() {
            Some(location) => {
                debug!(from = path, to = location, "command redirected");
                self.navigate(location)?;
                Ok(false)
            }
            None => Ok(true),
        }
    }

    fn render(&self, route: &Route) -> Result<()> {
        let mut store = SessionStore::new(&self.gateway);
        store.mount();
        if let Some(line) = view::nav_line(&NavBar::for_path(&route.pathname(), &store)) {
            println!("{}\n", line);
        }

        let theme = self.theme.theme();
        let today = view::today();
        match route {
            Route::Home => {
                println!("Welcome to your Todo App!");
                println!("Sign in to keep track of your tasks.");
            }
            Route::Login => {
                println!("Sign in with `lifesync login <email>`,");
                println!("or create an account with `lifesync signup <email>`.");
            }
            Route::Error { message } => {
                println!("Error");
                println!("{}", message);
                println!("Try Again: {}", LOGIN_PATH);
            }
            Route::Account => match store.user() {
                Some(user) => {
                    println!("Account");
                    println!("Email:   {}", user.email);
                    println!("User id: {}", user.id);
                    println!("Joined:  {}", view::format_timestamp_long(user.created_at));
                }
                None => return self.navigate(LOGIN_PATH),
            },
            Route::Dashboard => {
                let controller = self.tasks();
                println!("Dashboard");
                view::stats_table(controller.stats()).printstd();
            }
            Route::Tasks => {
                let controller = self.tasks();
                println!("My Tasks\n");
                TaskListView::new(controller.tasks(), today, theme).print();
            }
            Route::Task(id) => {
                let controller = self.tasks();
                match controller.resolve(id) {
                    Ok(task) => {
                        view::task_detail(task, today, theme).printstd();
                    }
                    Err(AppError::TaskNotFound(_)) => {
                        println!("Task not found");
                        println!("Back to Tasks: {}", TASKS_PATH);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Route::Recipes => println!("Recipes\nNothing here yet."),
            Route::Profile => println!("Profile\nNothing here yet."),
            Route::Other(path) => println!("Page not found: {}", path),
        }
        Ok(())
    }

    pub fn signup(&self, email: &str, password: Option<String>) -> Result<()> {
        let password = password_or_prompt(password)?;
        let route = auth::signup(&self.gateway, email, &password);
        self.navigate(&route.to_string())
    }

    pub fn login(&self, email: &str, password: Option<String>) -> Result<()> {
        let password = password_or_prompt(password)?;
        let route = auth::login(&self.gateway, email, &password);
        self.navigate(&route.to_string())
    }

    pub fn logout(&self) -> Result<()> {
        let route = auth::sign_out(&self.gateway);
        self.navigate(&route.to_string())
    }

    pub fn list(&self) -> Result<()> {
        self.navigate(TASKS_PATH)
    }

    pub fn show(&self, id: &str) -> Result<()> {
        self.navigate(&format!("{}/{}", TASKS_PATH, id))
    }

    pub fn add(
        &self,
        title: String,
        description: Option<String>,
        due: Option<NaiveDate>,
    ) -> Result<()> {
        if !self.guarded(TASKS_PATH)? {
            return Ok(());
        }
        let mut controller = self.tasks();
        let mut form = CreateForm::open();
        form.title = title;
        form.description = description.unwrap_or_default();
        form.completion_date = due;
        form.submit(&mut controller)
            .context("Failed to create task.")?;

        TaskListView::new(controller.tasks(), view::today(), self.theme.theme()).print();
        Ok(())
    }

    pub fn edit(&self, id: &str, edits: Edits) -> Result<()> {
        if !self.guarded(TASKS_PATH)? {
            return Ok(());
        }
        let mut controller = self.tasks();
        let task = controller.resolve(id)?.clone();
        let id = task.id.clone();

        let mut modal = DetailModal::open(task);
        modal.begin_edit();
        modal.edit(|draft| {
            if let Some(title) = edits.title {
                draft.title = title;
            }
            if let Some(description) = edits.description {
                draft.description = description;
            }
            if edits.clear_due {
                draft.completion_date = None;
            } else if edits.due.is_some() {
                draft.completion_date = edits.due;
            }
            if edits.done {
                draft.status = true;
            }
            if edits.undone {
                draft.status = false;
            }
        });
        if !modal.can_save() {
            return Err(anyhow!("Task title is required."));
        }
        modal.save(&mut controller)
            .context("Failed to update task.")?;

        if let Some(task) = controller.find(&id) {
            view::task_detail(task, view::today(), self.theme.theme()).printstd();
        }
        Ok(())
    }

    pub fn remove(&self, id: &str, yes: bool) -> Result<()> {
        if !self.guarded(TASKS_PATH)? {
            return Ok(());
        }
        let mut controller = self.tasks();
        let task = controller.resolve(id)?.clone();

        let mut modal = DeleteModal::open(task);
        if !yes {
            let question = format!(
                "Are you sure you want to delete \"{}\"? This action cannot be undone. [y/N] ",
                modal.task_title()
            );
            let answer = prompt(&question)?;
            if !matches!(answer.trim(), "y" | "Y" | "yes") {
                modal.cancel();
                println!("Cancelled.");
                return Ok(());
            }
        }
        modal.confirm(&mut controller)
            .context("Failed to delete task.")?;

        println!("Task deleted.\n");
        TaskListView::new(controller.tasks(), view::today(), self.theme.theme()).print();
        Ok(())
    }

    pub fn theme(&mut self, choice: Option<String>) -> Result<()> {
        let theme = match choice.as_deref() {
            None => self.theme.theme(),
            Some("toggle") => self.theme.toggle()?,
            Some(name) => {
                let theme: Theme = name.parse()?;
                self.theme.set(theme)?;
                theme
            }
        };
        println!("Theme: {}", theme);
        Ok(())
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt("Password: "),
    }
}

/// Ask on stdout and read one line from stdin, without its line ending.
fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush().context("Failed to write to stdout.")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read from stdin.")?;
    Ok(answer.trim_end_matches(&['\r', '\n'][..]).to_string())
}
