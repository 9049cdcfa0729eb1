use std::path::PathBuf;

use chrono::NaiveDate;
use structopt::StructOpt;

fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Create an account and sign in.
    Signup {
        email: String,

        /// Read from stdin when omitted.
        #[structopt(short, long)]
        password: Option<String>,
    },
    /// Sign in with an existing account.
    Login {
        email: String,

        /// Read from stdin when omitted.
        #[structopt(short, long)]
        password: Option<String>,
    },
    /// Sign out.
    Logout,
    /// Open a page, e.g. /dashboard or /tasks/<id>.
    Visit {
        path: String,
    },
    /// List your tasks.
    List,
    /// Show one task.
    Show {
        /// Task id or a unique prefix of it.
        id: String,
    },
    /// Create a task.
    Add {
        title: String,

        #[structopt(short, long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD).
        #[structopt(long, parse(try_from_str = parse_date))]
        due: Option<NaiveDate>,
    },
    /// Edit a task.
    Edit {
        id: String,

        #[structopt(long)]
        title: Option<String>,

        #[structopt(long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD).
        #[structopt(long, parse(try_from_str = parse_date), conflicts_with = "clear-due")]
        due: Option<NaiveDate>,

        /// Remove the due date.
        #[structopt(long)]
        clear_due: bool,

        /// Mark as completed.
        #[structopt(long, conflicts_with = "undone")]
        done: bool,

        /// Mark as not completed.
        #[structopt(long)]
        undone: bool,
    },
    /// Delete a task.
    Rm {
        id: String,

        /// Skip the confirmation prompt.
        #[structopt(short, long)]
        yes: bool,
    },
    /// Show or change the color theme.
    Theme {
        /// light, dark or toggle.
        choice: Option<String>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "lifesync",
    about = "Your tasks, behind a login."
)]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different data directory.
    #[structopt(parse(from_os_str), long)]
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_due_date() {
        let args = CommandLineArgs::from_iter(vec![
            "lifesync", "add", "Buy milk", "--due", "2024-03-09",
        ]);
        match args.action {
            Command::Add { title, due, description } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(due, NaiveDate::from_ymd_opt(2024, 3, 9));
                assert_eq!(description, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        let result = CommandLineArgs::from_iter_safe(vec!["lifesync", "add", "x", "--due", "9/3/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn done_and_undone_conflict() {
        let result =
            CommandLineArgs::from_iter_safe(vec!["lifesync", "edit", "abc", "--done", "--undone"]);
        assert!(result.is_err());
    }
}
