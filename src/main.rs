use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod view;

use commands::{
    AdjustCommand, ClassCommand, ConfigCommand, DayCommand, ShowCommand, StudentCommand,
    SyncCommand, WarnCommand,
};
use config::Config;
use roster_core::{HttpRemoteStore, LocalStore, RosterSession, SyncEngine};
use view::TerminalView;

/// The session type every command works against.
pub type Session = RosterSession<HttpRemoteStore, TerminalView>;

#[derive(Parser)]
#[command(name = "roster")]
#[command(version)]
#[command(about = "Classroom roster and behavior tracker", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Class to act on (defaults to the last selected class)
    #[arg(long, global = true)]
    class: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the students of a class
    Show(ShowCommand),

    /// Manage classes
    Class(ClassCommand),

    /// Add or remove students
    Student(StudentCommand),

    /// Add to or subtract from a student's counter
    Adjust(AdjustCommand),

    /// Toggle a student's warning flag
    Warn(WarnCommand),

    /// Fold today's marks into the weekly totals
    EndDay,

    /// Clear the weekly totals
    ResetWeek,

    /// Clear every student's dots
    ResetDots,

    /// Sync with the remote roster
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=warn,roster_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for config init
    let cli_config_path = cli.config.clone();

    // Load configuration
    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli_config_path),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    // The sync command does its own pull
    let explicit_sync = matches!(command, Commands::Sync(_));
    let mut session = open_session(&config, explicit_sync, cli.class.clone())?;
    if !explicit_sync {
        // Local roster first, then whatever the remote has
        session.start().await?;
    }

    let class = cli
        .class
        .unwrap_or_else(|| session.current_class().to_string());

    let result = execute_command(&command, &mut session, &config, &class).await;

    // Give background pushes a chance to land before the process exits
    let abandoned = session.flush(config.sync.timeout()).await;
    if abandoned > 0 {
        eprintln!("Warning: {} change(s) not yet sent to the remote", abandoned);
    }

    result
}

async fn execute_command(
    command: &Commands,
    session: &mut Session,
    config: &Config,
    class: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Show(cmd) => cmd.run(session, config, class)?,
        Commands::Class(cmd) => cmd.run(session).await?,
        Commands::Student(cmd) => cmd.run(session, class)?,
        Commands::Adjust(cmd) => cmd.run(session, config, class)?,
        Commands::Warn(cmd) => cmd.run(session, class)?,
        Commands::EndDay => DayCommand::EndDay.run(session, class)?,
        Commands::ResetWeek => DayCommand::ResetWeek.run(session, class)?,
        Commands::ResetDots => DayCommand::ResetDots.run(session, class)?,
        Commands::Sync(cmd) => cmd.run(session, config).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

/// Builds the session, going online only when a remote is configured and
/// either auto-sync is on or the user asked to sync.
fn open_session(
    config: &Config,
    explicit_sync: bool,
    focus: Option<String>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let store = LocalStore::new(config.data_dir.value.clone());
    let policy = config.sync.merge_policy;

    let engine = match &config.sync.remote_url {
        Some(url) if config.sync.auto_sync || explicit_sync => {
            SyncEngine::new(HttpRemoteStore::new(url, config.sync.timeout())?, policy)
        }
        _ => SyncEngine::offline(policy),
    };

    Ok(RosterSession::new(
        store,
        engine,
        TerminalView::new(config.mode.value, focus),
    ))
}
