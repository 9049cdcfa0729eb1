use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use lifesync::config::Config;

mod cli;
mod interface;

use cli::{Command::*, CommandLineArgs};
use interface::{App, Edits};

/// Log to stderr, filtered by RUST_LOG. Only warnings and errors by
/// default, so page output stays clean.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    // Get the command-line arguments.
    let CommandLineArgs { action, data_dir } = CommandLineArgs::from_args();

    let config = Config::load(data_dir)?;
    let mut app = App::open(&config)?;

    // Perform the action.
    match action {
        Signup { email, password } => app.signup(&email, password),
        Login { email, password } => app.login(&email, password),
        Logout => app.logout(),
        Visit { path } => app.navigate(&path),
        List => app.list(),
        Show { id } => app.show(&id),
        Add {
            title,
            description,
            due,
        } => app.add(title, description, due),
        Edit {
            id,
            title,
            description,
            due,
            clear_due,
            done,
            undone,
        } => app.edit(
            &id,
            Edits {
                title,
                description,
                due,
                clear_due,
                done,
                undone,
            },
        ),
        Rm { id, yes } => app.remove(&id, yes),
        Theme { choice } => app.theme(choice),
    }?;
    Ok(())
}
