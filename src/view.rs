//! Text rendering of the task views.
//!
//! Tables carry terminal style specs; printing them with `print` applies
//! colors, formatting them with `Display` gives plain text.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use prettytable::{format, Cell, Row, Table};

use crate::model::{Badge, Task, TaskExtra, TaskStats};
use crate::nav::{NavBar, NAV_ITEMS};
use crate::theme::Theme;

pub const NO_TASKS_TITLE: &str = "No tasks yet";
pub const NO_TASKS_HINT: &str =
    "Create your first task to get started with your productivity journey!";

const DESCRIPTION_WIDTH: usize = 40;

/// Card color schemes, cycled by card position.
const SCHEMES: [(&str, char); 5] = [
    ("blue", 'b'),
    ("purple", 'm'),
    ("green", 'g'),
    ("orange", 'y'),
    ("teal", 'c'),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardColors {
    pub scheme: &'static str,
    /// Style spec for the card accent (id, title).
    pub accent: String,
    /// Style spec for the status badge.
    pub badge: String,
}

/// Colors for the card at `index`. Completed badges are always green and
/// overdue ones red; dark theme uses the bright variants.
pub fn card_colors(index: usize, badge: Badge, theme: Theme) -> CardColors {
    let (scheme, color) = SCHEMES[index % SCHEMES.len()];
    let badge_color = match badge {
        Badge::Completed => 'g',
        Badge::Overdue => 'r',
        Badge::Pending => color,
    };
    CardColors {
        scheme,
        accent: format!("F{}", shade(color, theme)),
        badge: format!("F{}b", shade(badge_color, theme)),
    }
}

fn shade(color: char, theme: Theme) -> char {
    match theme {
        Theme::Light => color,
        Theme::Dark => color.to_ascii_uppercase(),
    }
}

pub fn today() -> NaiveDate {
    Local::now().naive_local().date()
}

/// Numeric date, as on the task cards: 3/9/2024.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Long date, as in the detail view: March 9, 2024.
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn format_timestamp_long(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%B %-d, %Y %I:%M %p")
        .to_string()
}

fn local_date(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).naive_local().date()
}

pub fn stats_table(stats: TaskStats) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["Total Tasks", "Completed", "Pending"]);
    table.add_row(row![c->stats.total, c->stats.completed, c->stats.pending]);
    table
}

/// One row per task card, in list order.
pub fn task_cards(tasks: &[Task], today: NaiveDate, theme: Theme) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["", "id", "task", "status", "date"]);

    for (index, task) in tasks.iter().enumerate() {
        let badge = task.badge(today);
        let colors = card_colors(index, badge, theme);

        let mut text = task.title.clone();
        if let Some(description) = &task.description {
            text.push('\n');
            text.push_str(&textwrap::fill(description, DESCRIPTION_WIDTH));
        }

        let date = match task.completion_date {
            Some(due) => format!("Due: {}", format_date(due)),
            None => format!("Created: {}", format_date(local_date(task.created_at))),
        };
        let date_style = if task.is_overdue(today) { "Fr" } else { "" };

        table.add_row(Row::new(vec![
            Cell::new(if task.status { "[x]" } else { "[ ]" }),
            Cell::new(&task.short_id(6)).style_spec(&colors.accent),
            Cell::new(&text),
            Cell::new(badge.label()).style_spec(&colors.badge),
            Cell::new(&date).style_spec(date_style),
        ]));
    }
    table
}

/// The list page: stats and cards, or the empty state.
pub enum TaskListView {
    NoTasksYet,
    Cards { stats: Table, cards: Table },
}

impl TaskListView {
    pub fn new(tasks: &[Task], today: NaiveDate, theme: Theme) -> Self {
        if tasks.is_empty() {
            return TaskListView::NoTasksYet;
        }
        TaskListView::Cards {
            stats: stats_table(TaskStats::from_tasks(tasks)),
            cards: task_cards(tasks, today, theme),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TaskListView::NoTasksYet)
    }

    pub fn print(&self) {
        match self {
            TaskListView::NoTasksYet => print!("{}", self),
            TaskListView::Cards { stats, cards } => {
                stats.printstd();
                println!();
                cards.printstd();
            }
        }
    }
}

impl fmt::Display for TaskListView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskListView::NoTasksYet => writeln!(f, "{}\n{}", NO_TASKS_TITLE, NO_TASKS_HINT),
            TaskListView::Cards { stats, cards } => write!(f, "{}\n{}", stats, cards),
        }
    }
}

/// The detail view of one task.
pub fn task_detail(task: &Task, today: NaiveDate, theme: Theme) -> Table {
    let badge = task.badge(today);
    let colors = card_colors(0, badge, theme);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.add_row(Row::new(vec![
        Cell::new("Task Details").style_spec("b"),
        Cell::new(&task.short_id(8)).style_spec(&colors.accent),
    ]));
    table.add_row(row![b->"Task Title", task.title]);
    table.add_row(row![
        b->"Description",
        task.description
            .as_deref()
            .map(|d| textwrap::fill(d, DESCRIPTION_WIDTH))
            .unwrap_or_else(|| "No description provided".to_string())
    ]);
    table.add_row(row![
        b->"Completion Date",
        task.completion_date
            .map(format_date_long)
            .unwrap_or_else(|| "No due date set".to_string())
    ]);
    table.add_row(Row::new(vec![
        Cell::new("Status").style_spec("b"),
        Cell::new(badge.label()).style_spec(&colors.badge),
    ]));
    table.add_row(row![b->"Created", format_timestamp_long(task.created_at)]);
    table.add_row(row![b->"Last Updated", format_timestamp_long(task.updated_at)]);
    table
}

/// The navigation bar as one line, or None when nothing is drawn.
pub fn nav_line(nav: &NavBar) -> Option<String> {
    let (active, account) = match nav {
        NavBar::Hidden | NavBar::Loading => return None,
        NavBar::SignedIn {
            active,
            email,
            avatar,
        } => (active, format!("({}) {}  Sign Out", avatar, email)),
        NavBar::SignedOut { active } => (active, "Sign In".to_string()),
    };

    let items: Vec<String> = NAV_ITEMS
        .iter()
        .map(|item| {
            if Some(*item) == *active {
                format!("[{}]", item.label)
            } else {
                item.label.to_string()
            }
        })
        .collect();
    Some(format!("TodoApp  {}  |  {}", items.join(" "), account))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(title: &str, status: bool, completion_date: Option<NaiveDate>) -> Task {
        let now = Utc::now();
        Task {
            id: "abcdef0123456789".to_string(),
            user_id: "u1".to_string(),
            title: title.to_string(),
            description: Some("a fairly long description that should be wrapped onto more than one line".to_string()),
            status,
            completion_date,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn schemes_cycle_and_badges_override() {
        assert_eq!(card_colors(0, Badge::Pending, Theme::Light).scheme, "blue");
        assert_eq!(card_colors(5, Badge::Pending, Theme::Light).scheme, "blue");
        assert_eq!(card_colors(3, Badge::Pending, Theme::Light).badge, "Fyb");
        assert_eq!(card_colors(3, Badge::Completed, Theme::Light).badge, "Fgb");
        assert_eq!(card_colors(1, Badge::Overdue, Theme::Dark).badge, "FRb");
        assert_eq!(card_colors(4, Badge::Pending, Theme::Dark).accent, "FC");
    }

    #[test]
    fn dates_are_formatted_like_the_cards() {
        assert_eq!(format_date(date(2024, 3, 9)), "3/9/2024");
        assert_eq!(format_date_long(date(2024, 3, 9)), "March 9, 2024");
    }

    #[test]
    fn empty_list_shows_the_empty_state() {
        let view = TaskListView::new(&[], date(2024, 3, 10), Theme::Light);
        assert!(view.is_empty());
        assert!(view.to_string().contains(NO_TASKS_TITLE));
    }

    #[test]
    fn cards_show_badges_and_dates() {
        let today = date(2024, 3, 10);
        let tasks = vec![
            task("Pay rent", false, Some(date(2024, 3, 1))),
            task("Buy milk", true, Some(date(2024, 3, 1))),
            task("Plan trip", false, Some(date(2024, 4, 1))),
        ];
        let text = TaskListView::new(&tasks, today, Theme::Light).to_string();
        assert!(text.contains("Total Tasks"));
        assert!(text.contains("Overdue"));
        assert!(text.contains("Completed"));
        assert!(text.contains("Pending"));
        assert!(text.contains("Due: 3/1/2024"));
        assert!(text.contains("#abcdef..."));
    }

    #[test]
    fn detail_shows_placeholders() {
        let mut bare = task("Buy milk", false, None);
        bare.description = None;
        let text = task_detail(&bare, date(2024, 3, 10), Theme::Dark).to_string();
        assert!(text.contains("No description provided"));
        assert!(text.contains("No due date set"));
        assert!(text.contains("#abcdef01..."));
    }

    #[test]
    fn nav_line_marks_the_active_item() {
        assert_eq!(nav_line(&NavBar::Loading), None);
        let line = nav_line(&NavBar::SignedIn {
            active: Some(NAV_ITEMS[1]),
            email: "ada@example.com".to_string(),
            avatar: 'A',
        })
        .unwrap();
        assert!(line.contains("[Tasks]"));
        assert!(line.contains("(A) ada@example.com"));
        assert!(nav_line(&NavBar::SignedOut { active: None })
            .unwrap()
            .ends_with("Sign In"));
    }
}
